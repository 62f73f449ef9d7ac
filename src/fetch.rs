//! Credential fetch orchestration.
//!
//! [`fetch`] resolves the backend named by a [`RetrieverConfig`], builds one
//! fully-qualified key per credential name and looks each one up in order.
//! The first failure aborts the whole call; a successful call returns a map
//! built fresh for the caller.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::backend::{self, SecretBackend};
use crate::config::RetrieverConfig;
use crate::error::{FetchError, FetchResult};

/// Credential name to resolved value.
pub type CredentialMap = HashMap<String, String>;

/// Separator placed between the prefix and a credential name.
pub const KEY_SEPARATOR: char = '/';

/// Builds the key sent to the backend for `name`.
///
/// `prefix + "/" + name` when a non-empty prefix is set, otherwise `name`
/// unchanged.
pub fn qualified_key(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}{KEY_SEPARATOR}{name}"),
        _ => name.to_string(),
    }
}

/// Fetches every configured credential from the configured backend.
///
/// The backend type is validated before any AWS client is built, so an
/// unrecognized type never results in a network call. An empty credential
/// list returns an empty map without touching AWS at all.
///
/// # Errors
///
/// - [`FetchError::ConfigInvalid`] if the type is missing or unrecognized
/// - [`FetchError::ClientInitFailed`] if no AWS client can be built
/// - [`FetchError::RetrievalFailed`] for the first credential that fails
/// - [`FetchError::DeadlineExceeded`] if `timeout_secs` elapses first
#[tracing::instrument(skip_all, fields(backend_type = ?config.backend_type, prefix = ?config.prefix()))]
pub async fn fetch(config: &RetrieverConfig) -> FetchResult<CredentialMap> {
    let kind = config.backend_kind()?;
    if config.credentials.is_empty() {
        debug!(backend = %kind, "No credentials configured");
        return Ok(CredentialMap::new());
    }

    let sdk_config = backend::load_sdk_config(config.region.as_deref()).await?;
    let backend = backend::connect(kind, &sdk_config);

    fetch_from(backend.as_ref(), config).await
}

/// Runs the lookups for `config` against an already constructed backend,
/// applying the configured deadline.
///
/// The backend type in `config` is not consulted; `backend` is used as given.
pub async fn fetch_from<B>(backend: &B, config: &RetrieverConfig) -> FetchResult<CredentialMap>
where
    B: SecretBackend + ?Sized,
{
    let lookups = fetch_with(backend, config.prefix(), &config.credentials);
    match config.timeout() {
        Some(deadline) => tokio::time::timeout(deadline, lookups)
            .await
            .map_err(|_| FetchError::DeadlineExceeded(deadline))?,
        None => lookups.await,
    }
}

/// Looks up `names` one at a time through `backend`.
///
/// Hosts that build their own clients call this (or [`fetch_from`]) directly.
pub async fn fetch_with<B>(
    backend: &B,
    prefix: Option<&str>,
    names: &[String],
) -> FetchResult<CredentialMap>
where
    B: SecretBackend + ?Sized,
{
    let mut creds = CredentialMap::with_capacity(names.len());

    for name in names {
        let key = qualified_key(prefix, name);
        debug!(backend = %backend.kind(), name = %name, key = %key, "Retrieving credential");

        let value = backend
            .get(&key)
            .await
            .map_err(|source| FetchError::RetrievalFailed {
                name: name.clone(),
                source,
            })?;
        creds.insert(name.clone(), value);
    }

    info!(backend = %backend.kind(), count = creds.len(), "Credentials retrieved");
    Ok(creds)
}
