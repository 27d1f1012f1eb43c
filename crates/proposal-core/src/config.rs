use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{ProposalError, SecretValue, require_env};

const DEFAULT_CONFIG_PATH: &str = "proposal.toml";
const CONFIG_PATH_ENV: &str = "PROPOSAL_CONFIG";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve the configured model secret (from environment only).
    pub fn llm_api_key(&self) -> Result<SecretValue, ProposalError> {
        require_env(&self.llm.api_key_env)
    }

    /// Resolve the configured search-provider secret (from environment only).
    pub fn search_api_key(&self) -> Result<SecretValue, ProposalError> {
        require_env(&self.search.api_key_env)
    }
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `PROPOSAL_CONFIG` environment variable.
    /// 3. `proposal.toml` in the current working directory.
    ///
    /// Built-in defaults apply only when the file in step 3 does not exist.
    pub fn load(path: Option<PathBuf>) -> Result<Config, ProposalError> {
        let config = match resolve_path(path) {
            Resolved::Explicit(candidate) => Self::read(&candidate)?,
            Resolved::Default(candidate) if candidate.exists() => Self::read(&candidate)?,
            Resolved::Default(_) => Config::default(),
        };

        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(raw: &str) -> Result<Config, ProposalError> {
        let config: Config = toml::from_str(raw)
            .map_err(|err| ProposalError::InvalidConfiguration(err.to_string()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn read(candidate: &Path) -> Result<Config, ProposalError> {
        let raw = fs::read_to_string(candidate)
            .map_err(|err| ProposalError::config_io(candidate.to_path_buf(), err))?;
        toml::from_str(&raw).map_err(|err| ProposalError::InvalidConfiguration(err.to_string()))
    }

    fn validate(config: &Config) -> Result<(), ProposalError> {
        if config.llm.api_key_env.trim().is_empty() {
            return Err(ProposalError::InvalidConfiguration(
                "llm.api_key_env must reference an environment variable".into(),
            ));
        }
        if config.search.api_key_env.trim().is_empty() {
            return Err(ProposalError::InvalidConfiguration(
                "search.api_key_env must reference an environment variable".into(),
            ));
        }
        if config.llm.model.trim().is_empty() {
            return Err(ProposalError::InvalidConfiguration(
                "llm.model must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ProposalError::InvalidConfiguration(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                config.llm.temperature
            )));
        }
        if config.llm.max_turns == 0 {
            return Err(ProposalError::InvalidConfiguration(
                "llm.max_turns must be greater than zero".into(),
            ));
        }

        // Both secrets must be present at load time.
        require_env(&config.llm.api_key_env)?;
        require_env(&config.search.api_key_env)?;
        Ok(())
    }
}

enum Resolved {
    Explicit(PathBuf),
    Default(PathBuf),
}

fn resolve_path(path: Option<PathBuf>) -> Resolved {
    if let Some(path) = path {
        return Resolved::Explicit(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV)
        && !from_env.trim().is_empty()
    {
        return Resolved::Explicit(PathBuf::from(from_env));
    }

    Resolved::Default(Path::new(DEFAULT_CONFIG_PATH).to_path_buf())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "LlmConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "LlmConfig::default_model")]
    pub model: String,
    #[serde(default = "LlmConfig::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "LlmConfig::default_temperature")]
    pub temperature: f64,
    #[serde(default = "LlmConfig::default_max_turns")]
    pub max_turns: usize,
}

impl LlmConfig {
    fn default_base_url() -> String {
        "https://api.cerebras.ai/v1".into()
    }

    fn default_model() -> String {
        "llama-3.3-70b".into()
    }

    fn default_api_key_env() -> String {
        "CEREBRAS_API_KEY".into()
    }

    const fn default_temperature() -> f64 {
        0.7
    }

    const fn default_max_turns() -> usize {
        12
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key_env: Self::default_api_key_env(),
            temperature: Self::default_temperature(),
            max_turns: Self::default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "SearchConfig::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "SearchConfig::default_search_depth")]
    pub search_depth: String,
    #[serde(default)]
    pub max_results: Option<u8>,
}

impl SearchConfig {
    fn default_base_url() -> String {
        "https://api.tavily.com".into()
    }

    fn default_api_key_env() -> String {
        "TAVILY_API_KEY".into()
    }

    fn default_search_depth() -> String {
        "advanced".into()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key_env: Self::default_api_key_env(),
            search_depth: Self::default_search_depth(),
            max_results: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_dir")]
    pub dir: PathBuf,
}

impl OutputConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".into()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}
