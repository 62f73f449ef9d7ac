use aws_config::SdkConfig;

use super::{BackendKind, SecretBackend};
use crate::error::{BackendError, MissingValue};

/// Fetches the current `SecretString` stored under `key`.
///
/// JSON payloads are returned exactly as stored; nothing is decoded.
pub async fn get_secret(
    client: &aws_sdk_secretsmanager::Client,
    key: &str,
) -> Result<String, BackendError> {
    let resp = client
        .get_secret_value()
        .secret_id(key)
        .send()
        .await
        .map_err(|e| BackendError::new(BackendKind::Secret, key, e))?;

    // Binary secrets only populate `secret_binary`.
    resp.secret_string
        .ok_or_else(|| BackendError::new(BackendKind::Secret, key, MissingValue))
}

/// Resolves credentials from AWS Secrets Manager.
#[derive(Debug, Clone)]
pub struct SecretsManager {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManager {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }

    pub fn from_client(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretBackend for SecretsManager {
    fn kind(&self) -> BackendKind {
        BackendKind::Secret
    }

    async fn get(&self, key: &str) -> Result<String, BackendError> {
        get_secret(&self.client, key).await
    }
}
