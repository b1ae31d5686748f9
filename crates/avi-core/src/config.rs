//! Agent Configuration
//!
//! Layered with the `config` crate, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional YAML/TOML file (`config.yaml` unless given on the CLI)
//! 3. prefixed variables: `AVI_AGENT__SECTION__KEY`
//! 4. well-known variables: `AVI_HOST`, `AVI_USERNAME`, `AVI_PASSWORD`,
//!    `OLLAMA_HOST`, `MISTRAL_API_KEY`, `LLM_PROVIDER`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use avi_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().file("config.yaml").load()?;
//! println!("provider = {}", config.provider_kind()?);
//! # Ok::<(), avi_core::Error>(())
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ProviderKind;

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "AVI_AGENT";

/// Well-known variables mapped onto config keys
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("AVI_HOST", "avi.host"),
    ("AVI_USERNAME", "avi.username"),
    ("AVI_PASSWORD", "avi.password"),
    ("OLLAMA_HOST", "ollama.host"),
    ("MISTRAL_API_KEY", "mistral.api_key"),
    ("LLM_PROVIDER", "provider"),
];

// =============================================================================
// CONFIG STRUCTURES
// =============================================================================

/// Complete agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub server: ServerConfig,
    pub avi: AviConfig,
    pub ollama: OllamaConfig,
    pub mistral: MistralConfig,
    pub log: LogConfig,
    /// Model backend name; checked by [`AgentConfig::provider_kind`]
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load-balancer controller connection
#[derive(Clone, Deserialize)]
pub struct AviConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub version: String,
    pub tenant: String,
    pub timeout_secs: u64,
    pub insecure: bool,
    /// List-response cache lifetime; 0 disables caching
    pub cache_ttl_secs: u64,
}

impl AviConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl std::fmt::Debug for AviConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AviConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("version", &self.version)
            .field("tenant", &self.tenant)
            .field("timeout_secs", &self.timeout_secs)
            .field("insecure", &self.insecure)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

/// Defaults applied to a model call when the caller leaves them out
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Local model service
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl OllamaConfig {
    pub fn defaults(&self) -> ModelDefaults {
        ModelDefaults {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Cloud model service
#[derive(Clone, Deserialize)]
pub struct MistralConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl MistralConfig {
    pub fn defaults(&self) -> ModelDefaults {
        ModelDefaults {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl std::fmt::Debug for MistralConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

// =============================================================================
// LOADING
// =============================================================================

/// Builder for [`AgentConfig`]
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config file to layer over the defaults. A missing file is not an error.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use `vars` instead of the process environment.
    pub fn env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn load(self) -> Result<AgentConfig> {
        let env = self.env.unwrap_or_else(|| std::env::vars().collect());

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.request_timeout_secs", 120_i64)?
            .set_default("avi.host", "")?
            .set_default("avi.username", "")?
            .set_default("avi.password", "")?
            .set_default("avi.version", "31.2.1")?
            .set_default("avi.tenant", "admin")?
            .set_default("avi.timeout_secs", 30_i64)?
            .set_default("avi.insecure", false)?
            .set_default("avi.cache_ttl_secs", 30_i64)?
            .set_default("ollama.host", "http://localhost:11434")?
            .set_default("ollama.default_model", "llama3.2")?
            .set_default("ollama.temperature", 0.7)?
            .set_default("ollama.max_tokens", 2048_i64)?
            .set_default("ollama.timeout_secs", 60_i64)?
            .set_default("mistral.api_base_url", "https://api.mistral.ai")?
            .set_default("mistral.default_model", "mistral-tiny")?
            .set_default("mistral.temperature", 0.7)?
            .set_default("mistral.max_tokens", 2048_i64)?
            .set_default("mistral.timeout_secs", 60_i64)?
            .set_default("provider", "ollama")?
            .set_default("log.level", "info")?
            .set_default("log.format", "json")?;

        if let Some(path) = &self.file {
            debug!("Layering config file {}", path.display());
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = env.get(*var).filter(|v| !v.is_empty()) {
                builder = builder.set_override(*key, value.as_str())?;
            }
        }

        let config: AgentConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

impl AgentConfig {
    /// Load from an optional file and the process environment.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = path {
            loader = loader.file(path);
        }
        loader.load()
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider.parse()
    }

    /// Defaults of the selected model backend
    pub fn model_defaults(&self) -> Result<ModelDefaults> {
        Ok(match self.provider_kind()? {
            ProviderKind::Ollama => self.ollama.defaults(),
            ProviderKind::Mistral => self.mistral.defaults(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        require(&self.avi.host, "avi.host")?;
        require(&self.avi.username, "avi.username")?;
        require(&self.avi.password, "avi.password")?;

        match self.provider_kind()? {
            ProviderKind::Ollama => {
                require(&self.ollama.host, "ollama.host")?;
                require(&self.ollama.default_model, "ollama.default_model")?;
            }
            ProviderKind::Mistral => {
                require(&self.mistral.api_base_url, "mistral.api_base_url")?;
                require(
                    self.mistral.api_key.as_deref().unwrap_or_default(),
                    "mistral.api_key",
                )?;
                require(&self.mistral.default_model, "mistral.default_model")?;
            }
        }

        let defaults = self.model_defaults()?;
        if !(0.0..=2.0).contains(&defaults.temperature) {
            return Err(Error::config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                defaults.temperature
            )));
        }
        if defaults.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(Error::config("server.request_timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

fn require(value: &str, key: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("{} is required", key)));
    }
    Ok(())
}
