//! Error types surfaced by the library.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendKind;
use crate::config::ConfigError;

/// Boxed underlying failure reported by a backend client.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A single lookup against a backend failed.
///
/// The originating SDK error is kept untranslated as the [`source`](StdError::source),
/// so callers can downcast it (for example to
/// `aws_sdk_ssm::error::SdkError<GetParameterError>`) and tell a missing
/// parameter apart from an access-denied or transport failure.
#[derive(Debug, Error)]
#[error("{backend} lookup failed for '{key}'")]
pub struct BackendError {
    pub backend: BackendKind,
    pub key: String,
    #[source]
    pub source: BoxError,
}

impl BackendError {
    pub fn new(backend: BackendKind, key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            backend,
            key: key.into(),
            source: source.into(),
        }
    }

    /// Returns the underlying failure if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

/// The backend answered but the entry carries no string value
/// (a binary secret, or a parameter without a value).
#[derive(Debug, Error)]
#[error("entry exists but has no string value")]
pub struct MissingValue;

/// Everything that can make [`fetch`](crate::fetch::fetch) fail.
///
/// Any variant means no credentials were resolved by that call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid configuration")]
    ConfigInvalid(#[from] ConfigError),

    #[error("unable to initialize AWS client: {0}")]
    ClientInitFailed(String),

    #[error("unable to retrieve credential '{name}'")]
    RetrievalFailed {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("credential fetch did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

pub type FetchResult<T> = Result<T, FetchError>;
