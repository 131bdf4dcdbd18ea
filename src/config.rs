//! Configuration resolved from the environment at startup.

use crate::edit::GeminiModel;
use crate::error::{Result, SwapError};

/// Primary API key variable.
pub const API_KEY_ENV: &str = "API_KEY";
/// Fallback API key variable.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Optional model id override.
pub const MODEL_ENV: &str = "PRODUCTSWAP_MODEL";
/// Optional API root override.
pub const BASE_URL_ENV: &str = "PRODUCTSWAP_BASE_URL";

/// Settings needed to talk to the model.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Static API credential.
    pub api_key: String,
    /// Model to call.
    pub model: GeminiModel,
    /// API root, if not the default.
    pub base_url: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through a lookup function.
    ///
    /// Empty values count as unset. Fails if no API key is available.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_ENV)
            .or_else(|| get(GOOGLE_API_KEY_ENV))
            .ok_or_else(missing_key)?;
        let model = get(MODEL_ENV)
            .map(|id| GeminiModel::from_id(id.trim()))
            .unwrap_or_default();
        let base_url = get(BASE_URL_ENV);

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }

    /// Resolves only the API key from the environment.
    pub fn api_key_from_env() -> Result<String> {
        Self::from_env().map(|config| config.api_key)
    }
}

fn missing_key() -> SwapError {
    SwapError::Auth(format!(
        "{API_KEY_ENV} environment variable not set (or {GOOGLE_API_KEY_ENV})"
    ))
}
