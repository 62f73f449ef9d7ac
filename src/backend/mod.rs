//! Backend client adapters.
//!
//! [`BackendKind`] names the two supported services.
//! [`SecretBackend`] is the async trait the orchestrator resolves keys through.
//! [`ParameterStore`] and [`SecretsManager`] implement it on top of the AWS SDK.

mod parameter_store;
mod secrets_manager;

pub use parameter_store::{ParameterStore, get_parameter};
pub use secrets_manager::{SecretsManager, get_secret};

use std::fmt;
use std::str::FromStr;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use serde::Serialize;
use tracing::debug;

use crate::config::ConfigError;
use crate::error::{BackendError, FetchError, FetchResult};

/// The secret store a configuration points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// AWS Systems Manager Parameter Store.
    Parameter,
    /// AWS Secrets Manager.
    Secret,
}

impl BackendKind {
    /// The configuration spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Parameter => "parameter",
            BackendKind::Secret => "secret",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Parameter => f.write_str("parameter store"),
            BackendKind::Secret => f.write_str("secrets manager"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    /// Matches `"parameter"` or `"secret"`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("parameter") {
            Ok(BackendKind::Parameter)
        } else if s.eq_ignore_ascii_case("secret") {
            Ok(BackendKind::Secret)
        } else {
            Err(ConfigError::UnknownBackendType(s.to_string()))
        }
    }
}

/// Resolves a fully-qualified key into its plaintext value.
#[async_trait::async_trait]
pub trait SecretBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn get(&self, key: &str) -> Result<String, BackendError>;
}

/// Loads the ambient AWS configuration (env vars, profile, instance role).
///
/// `region` overrides whatever region the default chain would pick.
///
/// # Errors
///
/// Returns [`FetchError::ClientInitFailed`] if no region can be resolved, since
/// no client call could succeed without one.
pub async fn load_sdk_config(region: Option<&str>) -> FetchResult<SdkConfig> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }

    let sdk_config = loader.load().await;
    match sdk_config.region() {
        Some(region) => {
            debug!(region = %region, "AWS configuration loaded");
            Ok(sdk_config)
        }
        None => Err(FetchError::ClientInitFailed(
            "no AWS region configured (set AWS_REGION or the `region` option)".to_string(),
        )),
    }
}

/// Builds the adapter for `kind` from an already loaded AWS configuration.
pub fn connect(kind: BackendKind, sdk_config: &SdkConfig) -> Box<dyn SecretBackend> {
    match kind {
        BackendKind::Parameter => Box::new(ParameterStore::new(sdk_config)),
        BackendKind::Secret => Box::new(SecretsManager::new(sdk_config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_ignores_case() {
        for input in ["parameter", "Parameter", "PARAMETER", "pArAmEtEr"] {
            assert_eq!(input.parse::<BackendKind>().unwrap(), BackendKind::Parameter);
        }
        for input in ["secret", "Secret", "SECRET"] {
            assert_eq!(input.parse::<BackendKind>().unwrap(), BackendKind::Secret);
        }
    }

    #[test]
    fn test_kind_parse_rejects_other_values() {
        for input in ["keychain", "", "secrets", " parameter", "ssm"] {
            let err = input.parse::<BackendKind>().unwrap_err();
            assert!(
                matches!(err, ConfigError::UnknownBackendType(ref v) if v == input),
                "unexpected error for {input:?}: {err:?}"
            );
        }
    }

    #[test]
    fn test_kind_spellings() {
        assert_eq!(BackendKind::Parameter.as_str(), "parameter");
        assert_eq!(BackendKind::Secret.as_str(), "secret");
        assert_eq!(BackendKind::Secret.to_string(), "secrets manager");
        assert_eq!(
            serde_json::to_string(&BackendKind::Parameter).unwrap(),
            "\"parameter\""
        );
    }
}
