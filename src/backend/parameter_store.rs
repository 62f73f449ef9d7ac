use aws_config::SdkConfig;

use super::{BackendKind, SecretBackend};
use crate::error::{BackendError, MissingValue};

/// Fetches the parameter at `key` with decryption enabled and returns its value.
///
/// `SecureString` parameters come back as plaintext as long as the caller has
/// `ssm:GetParameter` and the matching KMS permissions.
pub async fn get_parameter(client: &aws_sdk_ssm::Client, key: &str) -> Result<String, BackendError> {
    let resp = client
        .get_parameter()
        .name(key)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| BackendError::new(BackendKind::Parameter, key, e))?;

    resp.parameter
        .and_then(|p| p.value)
        .ok_or_else(|| BackendError::new(BackendKind::Parameter, key, MissingValue))
}

/// Resolves credentials from AWS SSM Parameter Store.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    client: aws_sdk_ssm::Client,
}

impl ParameterStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }

    pub fn from_client(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretBackend for ParameterStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Parameter
    }

    async fn get(&self, key: &str) -> Result<String, BackendError> {
        get_parameter(&self.client, key).await
    }
}
