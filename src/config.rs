//! Provider configuration.
//!
//! Settings come from the environment, optionally seeded from `.env`
//! files. Variables already present in the process environment always
//! win over values in a file.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "DASHSCOPE_API_KEY";

/// Environment variable overriding the endpoint base URL.
pub const BASE_URL_VAR: &str = "DEVTOOLS_BASE_URL";

/// Environment variable overriding the model name.
pub const MODEL_VAR: &str = "DEVTOOLS_MODEL";

/// Environment variable setting the request timeout in seconds.
pub const TIMEOUT_VAR: &str = "DEVTOOLS_TIMEOUT_SECS";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "qwen-plus";

/// Application directory name under the user config directory.
const APP_DIR: &str = "devtools-rs";

/// Connection settings for a chat-completion provider.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    /// API key; required for remote calls only.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Endpoint base URL.
    pub base_url: String,

    /// Model name.
    pub model: String,

    /// Bound on the initial request and on each wait for the next chunk.
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout variable is not a whole number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout value is not a whole number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let timeout = non_empty(TIMEOUT_VAR)
            .map(|raw| parse_timeout(&raw))
            .transpose()?
            .flatten();

        Ok(Self {
            api_key: non_empty(API_KEY_VAR),
            base_url: non_empty(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: non_empty(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout,
        })
    }

    /// Sets the timeout from whole seconds; zero disables it.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout = match secs {
            Some(0) | None => None,
            Some(s) => Some(Duration::from_secs(s)),
        };
        self
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Parses a timeout in whole seconds; `0` means no timeout.
///
/// # Errors
///
/// Returns [`Error::Config`] if `raw` is not a non-negative integer.
pub fn parse_timeout(raw: &str) -> Result<Option<Duration>> {
    let secs: u64 = raw.trim().parse().map_err(|_| Error::Config {
        message: format!("{TIMEOUT_VAR} must be a whole number of seconds, got '{raw}'"),
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

/// Returns the per-user env file path (`<config dir>/devtools-rs/.env`).
#[must_use]
pub fn user_env_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(".env"))
}

/// Loads `.env` from the working directory, then the per-user env file.
///
/// Missing files are not an error. Returns the files that were loaded.
pub fn load_env_files() -> Vec<PathBuf> {
    let mut loaded = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded env file");
        loaded.push(path);
    }

    if let Some(path) = user_env_path()
        && path.is_file()
    {
        match dotenvy::from_path(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "loaded env file");
                loaded.push(path);
            }
            Err(e) => debug!(path = %path.display(), error = %e, "skipped env file"),
        }
    }

    loaded
}
