pub mod backend;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;

pub use backend::{BackendKind, SecretBackend};
pub use config::{ConfigError, ConfigLoader, RetrieverConfig};
pub use error::{BackendError, FetchError};
pub use fetch::{CredentialMap, fetch, fetch_from, fetch_with, qualified_key};
