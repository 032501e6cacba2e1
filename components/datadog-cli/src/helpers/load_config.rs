// Local crates
use crate::helpers::paths::{ensure_exclusive_permissions, expand_path};

// External crates
use serde::Deserialize;
#[cfg(test)]
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::instrument;

/// Environment variable holding the Datadog API key.
pub const API_KEY_VAR: &str = "API_KEY";
/// Environment variable holding the Datadog application key.
pub const APP_KEY_VAR: &str = "APP_KEY";
/// Credentials file read when `--conf` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "~/.datadogrc";

/// Credential resolution error handling
/// - Clearly separates "could not get at the file" from "the file is not
/// trustworthy" from "the keys are not there", so the message on stderr
/// tells the user what to fix.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot expand '~': home directory of the current user is unknown")]
    HomeDirUnavailable,
    #[error("datadog configuration missing or inaccessible at {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to read datadog configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsafe permissions: {path} must have mode 600, found {mode:o}")]
    UnsafePermissions { path: PathBuf, mode: u32 },
    #[error("malformed datadog configuration at {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Datadog API key missing.")]
    MissingApiKey,
    #[error("Datadog app key missing.")]
    MissingAppKey,
}

/// API and application keys used to authenticate against Datadog.
///
/// Immutable once resolved. `Debug` never prints the keys themselves.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    app_key: String,
}

impl Credentials {
    /// Build credentials, rejecting empty keys.
    pub fn new(api_key: impl Into<String>, app_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        let app_key = app_key.into();

        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if app_key.is_empty() {
            return Err(ConfigError::MissingAppKey);
        }

        Ok(Self { api_key, app_key })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("app_key", &"<redacted>")
            .finish()
    }
}

/// Read-only view of environment variables.
///
/// Resolution takes the environment as an argument instead of reaching for
/// process globals, which keeps it testable without mutating `std::env`.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[cfg(test)]
impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// On-disk layout of the credentials file.
///
/// ```json
/// { "api_key": "YOUR API KEY", "app_key": "YOUR APP KEY" }
/// ```
#[derive(Debug, Default, Deserialize)]
struct KeysFile {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    app_key: String,
}

/// Resolves [`Credentials`] from the environment, falling back to a
/// permission-checked JSON file.
#[derive(Debug, Clone)]
pub struct CredentialResolver<E: EnvSource = ProcessEnv> {
    config_path: String,
    env: E,
}

impl<E: EnvSource> CredentialResolver<E> {
    pub fn new(config_path: impl Into<String>, env: E) -> Self {
        Self {
            config_path: config_path.into(),
            env,
        }
    }

    /// Resolve the keys for this invocation.
    ///
    /// - `API_KEY` and `APP_KEY` are used as-is when both are set and non-empty;
    /// the credentials file is not touched in that case.
    /// - Otherwise the file at `config_path` is opened, checked for `0600`
    /// permissions and decoded. A non-empty environment value still wins over
    /// the file value for the same key.
    #[instrument(
        name = "datadog_credentials::resolve",
        target = "helpers::load_config",
        level = "debug",
        skip_all
    )]
    pub fn resolve(&self) -> Result<Credentials, ConfigError> {
        let env_api_key = self.non_empty_var(API_KEY_VAR);
        let env_app_key = self.non_empty_var(APP_KEY_VAR);

        if let (Some(api_key), Some(app_key)) = (&env_api_key, &env_app_key) {
            tracing::debug!("Using Datadog keys from environment");
            return Credentials::new(api_key.as_str(), app_key.as_str());
        }

        tracing::debug!(
            config_path = %self.config_path,
            api_key_in_env = env_api_key.is_some(),
            app_key_in_env = env_app_key.is_some(),
            "Datadog keys incomplete in environment, reading configuration file"
        );
        let file_keys = self.read_keys_file()?;

        Credentials::new(
            env_api_key.unwrap_or(file_keys.api_key),
            env_app_key.unwrap_or(file_keys.app_key),
        )
        .inspect_err(|e| tracing::error!(error = %e, "Datadog keys unresolved"))
    }

    fn non_empty_var(&self, key: &str) -> Option<String> {
        self.env.var(key).filter(|value| !value.is_empty())
    }

    fn read_keys_file(&self) -> Result<KeysFile, ConfigError> {
        let path = expand_path(&self.config_path)?;

        let mut file = File::open(&path).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "Failed to open configuration file");
            ConfigError::Open {
                path: path.clone(),
                source,
            }
        })?;

        ensure_exclusive_permissions(&file, &path)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;

        let keys = serde_json::from_str::<KeysFile>(&contents).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "Failed to parse JSON configuration");
            ConfigError::Malformed {
                path: path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %path.display(), "Datadog configuration file loaded successfully");
        Ok(keys)
    }
}
