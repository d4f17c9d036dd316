//! Client configuration and its resolution.
//!
//! The endpoint and service key are resolved once, at construction, with
//! the precedence: explicit argument > environment variable > config file >
//! built-in default. There is no built-in service key; a missing key is a
//! [`ClientError::Config`].
//!
//! # Example YAML
//!
//! ```yaml
//! url: "http://db.internal:8000"
//! service_role_key: "<service role JWT>"
//! timeout_secs: 30
//! settle_delay_ms: 3000
//! batch_size: 1000
//! ```

use std::fmt;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Environment variable holding the base URL.
pub const URL_ENV: &str = "SUPABASE_URL";
/// Secondary environment variable consulted for the base URL.
pub const URL_ENV_FALLBACK: &str = "NEXT_PUBLIC_SUPABASE_URL";
/// Environment variable holding the service role key.
pub const KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Base URL used when nothing else is configured.
pub const DEFAULT_URL: &str = "http://localhost:8000";
/// Per-request timeout ceiling.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after DDL so the data API's schema cache can refresh.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);
/// Rows per insert request during import.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// On-disk configuration, every field optional.
///
/// # Examples
///
/// ```
/// use supa_admin_client::ConfigFile;
///
/// let file: ConfigFile = serde_yaml::from_str("url: http://db:8000\nbatch_size: 500\n").unwrap();
/// assert_eq!(file.url.as_deref(), Some("http://db:8000"));
/// assert_eq!(file.batch_size, Some(500));
/// assert!(file.service_role_key.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Base URL of the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Service role key sent as `apikey` and bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_role_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Post-DDL settle delay in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    /// Rows per insert request during import.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

impl ConfigFile {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file cannot be read, or
    /// [`ClientError::Config`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file cannot be written, or
    /// [`ClientError::Config`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

/// Values given explicitly by the caller (e.g. command-line flags).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Resolved, immutable client configuration.
///
/// The service key is redacted from the `Debug` output.
#[derive(Clone)]
pub struct ClientConfig {
    url: String,
    service_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause after executing DDL.
    pub settle_delay: Duration,
    /// Rows per insert request during import.
    pub batch_size: usize,
}

impl ClientConfig {
    /// Creates a configuration with default timeout, settle delay and
    /// batch size. Trailing slashes are stripped from `url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use supa_admin_client::ClientConfig;
    ///
    /// let config = ClientConfig::new("http://localhost:8000/", "key");
    /// assert_eq!(config.url(), "http://localhost:8000");
    /// assert_eq!(config.meta_url("/tables"), "http://localhost:8000/pg/tables");
    /// ```
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            timeout: DEFAULT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the post-DDL settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the import batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Resolves configuration from overrides, the process environment, the
    /// optional config file, and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if no service key is available or
    /// the config file cannot be read or parsed.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let file = match &overrides.config_file {
            Some(path) => Some(ConfigFile::load(path).map_err(|e| {
                ClientError::Config(format!("failed to load '{}': {e}", path.display()))
            })?),
            None => None,
        };
        Self::resolve_with(overrides, file.as_ref(), |name| std::env::var(name).ok())
    }

    /// Resolves configuration with an injected environment lookup.
    ///
    /// Empty values are treated as unset at every level.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if no service key is available.
    pub fn resolve_with<F>(
        overrides: &ConfigOverrides,
        file: Option<&ConfigFile>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |name: &str| env(name).and_then(non_empty);
        let file_url = file.and_then(|f| f.url.clone()).and_then(non_empty);
        let file_key = file
            .and_then(|f| f.service_role_key.clone())
            .and_then(non_empty);

        let url = overrides
            .url
            .clone()
            .and_then(non_empty)
            .or_else(|| env_value(URL_ENV))
            .or_else(|| env_value(URL_ENV_FALLBACK))
            .or(file_url)
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let service_key = overrides
            .service_key
            .clone()
            .and_then(non_empty)
            .or_else(|| env_value(KEY_ENV))
            .or(file_key)
            .ok_or_else(|| {
                ClientError::Config(format!(
                    "no service key configured; pass --key, set {KEY_ENV}, or add service_role_key to the config file"
                ))
            })?;

        let mut config = Self::new(url, service_key);
        if let Some(file) = file {
            if let Some(secs) = file.timeout_secs {
                config.timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = file.settle_delay_ms {
                config.settle_delay = Duration::from_millis(ms);
            }
            if let Some(batch_size) = file.batch_size {
                config.batch_size = batch_size;
            }
        }
        Ok(config)
    }

    /// Base URL without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Service role key.
    pub fn service_key(&self) -> &str {
        &self.service_key
    }

    /// Absolute URL of a metadata-API path (e.g. `/tables`).
    pub fn meta_url(&self, path: &str) -> String {
        format!("{}/pg{path}", self.url)
    }

    /// Absolute URL of a data-API path (e.g. `/products`).
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1{path}", self.url)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("settle_delay", &self.settle_delay)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}
