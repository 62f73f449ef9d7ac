//! Retriever configuration.
//!
//! Values come from a YAML file (`retriever.yaml` in the working directory, or
//! the path named by `RTVR_CONF`) overlaid with `RTVR_`-prefixed environment
//! variables:
//!
//! ```yaml
//! type: parameter        # or "secret", case-insensitive
//! prefix: /myapp/prod    # optional
//! credentials:
//!   - db_password
//!   - api_token
//! ```
//!
//! The loaded [`RetrieverConfig`] is a plain value handed to
//! [`fetch`](crate::fetch::fetch); nothing is kept in process-wide state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::BackendKind;

/// Prefix for environment variables that override file values.
pub const ENV_PREFIX: &str = "RTVR_";

/// Environment variable naming an explicit config file.
pub const CONF_ENV: &str = "RTVR_CONF";

/// Config file looked up in the working directory when `RTVR_CONF` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "retriever.yaml";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("secret type is not set (expected \"parameter\" or \"secret\")")]
    MissingBackendType,

    #[error("unknown secret type \"{0}\" (expected \"parameter\" or \"secret\")")]
    UnknownBackendType(String),

    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to load configuration")]
    Load(#[from] figment::Error),
}

/// Which credentials to fetch and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetrieverConfig {
    /// Raw backend selector; parsed by [`RetrieverConfig::backend_kind`].
    #[serde(rename = "type", default, deserialize_with = "optional_text")]
    pub backend_type: Option<String>,

    #[serde(default, deserialize_with = "optional_text")]
    pub prefix: Option<String>,

    /// Credential names in lookup order.
    #[serde(deserialize_with = "credential_list")]
    pub credentials: Vec<String>,

    /// Overrides the region from the ambient AWS configuration.
    #[serde(default, deserialize_with = "optional_text")]
    pub region: Option<String>,

    /// Deadline for a whole fetch, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RetrieverConfig {
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: Some(backend_type.into()),
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_credentials<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.credentials = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Parses the configured backend selector, ignoring case.
    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        self.backend_type
            .as_deref()
            .ok_or(ConfigError::MissingBackendType)?
            .parse()
    }

    /// The key prefix, treating an empty string as no prefix.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref().filter(|p| !p.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration loader with file + environment merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration the way the CLI does when no path is given.
    ///
    /// Precedence (lowest to highest):
    /// 1. The file named by `RTVR_CONF`, else `./retriever.yaml` if present
    /// 2. `RTVR_*` environment variables
    pub fn load() -> Result<RetrieverConfig, ConfigError> {
        let conf = std::env::var_os(CONF_ENV).map(PathBuf::from);
        Self::load_with(conf.as_deref())
    }

    /// Loads `conf` if given, otherwise the default file. An empty path counts
    /// as not given.
    pub fn load_with(conf: Option<&Path>) -> Result<RetrieverConfig, ConfigError> {
        match conf.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => Self::load_from(path),
            None => Self::load_default(),
        }
    }

    /// Loads `./retriever.yaml` (if it exists) overlaid with the environment.
    pub fn load_default() -> Result<RetrieverConfig, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if !path.is_file() {
            info!(path = DEFAULT_CONFIG_FILE, "Retriever config not found; using environment");
        }
        Self::extract(Self::figment(path))
    }

    /// Loads an explicitly named file overlaid with the environment.
    ///
    /// Unlike the default file, a named file must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<RetrieverConfig, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Self::extract(Self::figment(path))
    }

    /// The provider stack used by the loaders, exposed for hosts that want to
    /// merge in their own layers.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["conf"]))
    }

    fn extract(figment: Figment) -> Result<RetrieverConfig, ConfigError> {
        let config: RetrieverConfig = figment.extract()?;
        debug!(
            backend_type = ?config.backend_type,
            prefix = ?config.prefix,
            credentials = config.credentials.len(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Splits a single configured string into names, as happens when the list
/// arrives through an environment variable.
fn split_names(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads an optional scalar as text.
///
/// Environment values such as `2024` or `true` arrive typed; they are kept as
/// the text that was written.
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OptionalText;

    impl<'de> Visitor<'de> for OptionalText {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(OptionalText)
}

/// Accepts a sequence of names or one whitespace/comma separated string.
fn credential_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CredentialList;

    impl<'de> Visitor<'de> for CredentialList {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of credential names or a separated string of names")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(split_names(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut names = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(CredentialName(name)) = seq.next_element()? {
                names.push(name);
            }
            Ok(names)
        }
    }

    deserializer.deserialize_any(CredentialList)
}

/// One list element; numeric-looking names are kept as their text.
struct CredentialName(String);

impl<'de> Deserialize<'de> for CredentialName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameVisitor;

        impl Visitor<'_> for NameVisitor {
            type Value = CredentialName;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a credential name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(CredentialName(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(CredentialName(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(CredentialName(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(CredentialName(v.to_string()))
            }
        }

        deserializer.deserialize_any(NameVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load_in_jail() -> figment::error::Result<RetrieverConfig> {
        ConfigLoader::load().map_err(|e| format!("{e:?}").into())
    }

    #[test]
    fn test_loads_default_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                "type: parameter\nprefix: /abc123\ncredentials:\n  - xyz789\n  - other\n",
            )?;

            let config = load_in_jail()?;
            assert_eq!(config.backend_kind().unwrap(), BackendKind::Parameter);
            assert_eq!(config.prefix(), Some("/abc123"));
            assert_eq!(config.credentials, vec!["xyz789", "other"]);
            assert_eq!(config.timeout(), None);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                "type: parameter\nprefix: /abc123\ncredentials: [xyz789]\n",
            )?;
            jail.set_env("RTVR_TYPE", "Secret");
            jail.set_env("RTVR_PREFIX", "/other");

            let config = load_in_jail()?;
            assert_eq!(config.backend_kind().unwrap(), BackendKind::Secret);
            assert_eq!(config.prefix(), Some("/other"));
            assert_eq!(config.credentials, vec!["xyz789"]);
            Ok(())
        });
    }

    #[test]
    fn test_environment_only() {
        Jail::expect_with(|jail| {
            jail.set_env("RTVR_TYPE", "parameter");
            jail.set_env("RTVR_CREDENTIALS", "db_password api_token,smtp");
            jail.set_env("RTVR_TIMEOUT_SECS", "30");

            let config = load_in_jail()?;
            assert_eq!(config.prefix(), None);
            assert_eq!(config.credentials, vec!["db_password", "api_token", "smtp"]);
            assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
            Ok(())
        });
    }

    #[test]
    fn test_environment_list_syntax() {
        Jail::expect_with(|jail| {
            jail.set_env("RTVR_TYPE", "secret");
            jail.set_env("RTVR_CREDENTIALS", r#"["alpha", "beta"]"#);

            let config = load_in_jail()?;
            assert_eq!(config.credentials, vec!["alpha", "beta"]);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_conf_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.yaml", "type: secret\ncredentials: []\n")?;
            jail.set_env(CONF_ENV, "custom.yaml");

            let config = load_in_jail()?;
            assert_eq!(config.backend_kind().unwrap(), BackendKind::Secret);
            assert!(config.credentials.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_explicit_conf_path_must_exist() {
        Jail::expect_with(|_jail| {
            let err = ConfigLoader::load_from("missing.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::FileNotFound(ref p) if p == Path::new("missing.yaml")));
            Ok(())
        });
    }

    #[test]
    fn test_credentials_are_required() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "type: parameter\n")?;

            let err = ConfigLoader::load().unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
            Ok(())
        });
    }

    #[test]
    fn test_numeric_names_kept_as_text() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                "type: parameter\ncredentials:\n  - 123\n  - name\n",
            )?;

            let config = load_in_jail()?;
            assert_eq!(config.credentials, vec!["123", "name"]);
            Ok(())
        });
    }

    #[test]
    fn test_numeric_and_boolean_env_values_kept_as_text() {
        Jail::expect_with(|jail| {
            jail.set_env("RTVR_TYPE", "parameter");
            jail.set_env("RTVR_PREFIX", "2024");
            jail.set_env("RTVR_CREDENTIALS", "true");

            let config = load_in_jail()?;
            assert_eq!(config.prefix(), Some("2024"));
            assert_eq!(config.credentials, vec!["true"]);
            Ok(())
        });
    }

    #[test]
    fn test_scalar_list_entries_kept_as_text() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                "type: secret\nprefix: 42\ncredentials:\n  - false\n  - 7\n",
            )?;

            let config = load_in_jail()?;
            assert_eq!(config.prefix(), Some("42"));
            assert_eq!(config.credentials, vec!["false", "7"]);
            Ok(())
        });
    }

    #[test]
    fn test_empty_conf_path_falls_back_to_default_file() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "type: secret\ncredentials: [db]\n")?;

            let config = ConfigLoader::load_with(Some(Path::new("")))
                .map_err(|e| format!("{e:?}"))?;
            assert_eq!(config.credentials, vec!["db"]);

            jail.set_env(CONF_ENV, "");
            let config = load_in_jail()?;
            assert_eq!(config.credentials, vec!["db"]);
            Ok(())
        });
    }

    #[test]
    fn test_timeout_in_whole_seconds() {
        let config = RetrieverConfig::new("parameter").with_timeout_secs(1);
        assert_eq!(config.timeout(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_backend_kind_errors() {
        let missing = RetrieverConfig::default();
        assert!(matches!(
            missing.backend_kind(),
            Err(ConfigError::MissingBackendType)
        ));

        let unknown = RetrieverConfig::new("keychain");
        assert!(matches!(
            unknown.backend_kind(),
            Err(ConfigError::UnknownBackendType(ref t)) if t == "keychain"
        ));
    }

    #[test]
    fn test_empty_prefix_is_no_prefix() {
        let config = RetrieverConfig::new("parameter").with_prefix("");
        assert_eq!(config.prefix(), None);
    }

    #[test]
    fn test_split_names() {
        assert_eq!(split_names("  a  b,c,,d "), vec!["a", "b", "c", "d"]);
        assert!(split_names("").is_empty());
    }
}
