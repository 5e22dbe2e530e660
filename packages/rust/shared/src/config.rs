//! Application configuration for PromptEval.
//!
//! User config lives at `~/.prompteval/prompteval.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override the built-in provider presets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PromptEvalError, Result};
use crate::types::{BackendKind, LlmConfig, TokenPrice};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prompteval.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prompteval";

/// Placeholder key sent to local Ollama, which ignores it.
const OLLAMA_API_KEY: &str = "ollama";

/// Env var overriding the sampling temperature.
const TEMPERATURE_ENV: &str = "TEMPERATURE";
/// Env var overriding the request timeout (seconds).
const TIMEOUT_ENV: &str = "TIMEOUT";
/// Env var overriding the local Ollama base URL.
const OLLAMA_BASE_URL_ENV: &str = "OLLAMA_BASE_URL";

/// Environment lookup, injectable so resolution is testable.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// ---------------------------------------------------------------------------
// Config structs (matching prompteval.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Per-provider presets.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Sampling temperature for every stage.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `auto` picks the first provider with a key; otherwise a backend name.
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            backend: default_backend(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_backend() -> String {
    "auto".into()
}

/// `[providers]` section.
///
/// Each `[providers.<name>]` table is merged field by field over that
/// provider's preset, so a partial table only changes what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ProvidersFile")]
pub struct ProvidersConfig {
    pub groq: ProviderConfig,
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
    pub ollama: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            groq: ProviderConfig::preset(BackendKind::Groq),
            openai: ProviderConfig::preset(BackendKind::OpenAi),
            anthropic: ProviderConfig::preset(BackendKind::Anthropic),
            ollama: ProviderConfig::preset(BackendKind::Ollama),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: BackendKind) -> &ProviderConfig {
        match kind {
            BackendKind::Groq => &self.groq,
            BackendKind::OpenAi => &self.openai,
            BackendKind::Anthropic => &self.anthropic,
            BackendKind::Ollama => &self.ollama,
        }
    }
}

/// `[providers]` as written on disk; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ProvidersFile {
    #[serde(default)]
    groq: ProviderOverride,
    #[serde(default)]
    openai: ProviderOverride,
    #[serde(default)]
    anthropic: ProviderOverride,
    #[serde(default)]
    ollama: ProviderOverride,
}

impl From<ProvidersFile> for ProvidersConfig {
    fn from(file: ProvidersFile) -> Self {
        Self {
            groq: file.groq.over(BackendKind::Groq),
            openai: file.openai.over(BackendKind::OpenAi),
            anthropic: file.anthropic.over(BackendKind::Anthropic),
            ollama: file.ollama.over(BackendKind::Ollama),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProviderOverride {
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    price: Option<TokenPrice>,
}

impl ProviderOverride {
    fn over(self, kind: BackendKind) -> ProviderConfig {
        let preset = ProviderConfig::preset(kind);
        ProviderConfig {
            model: self.model.unwrap_or(preset.model),
            base_url: self.base_url.unwrap_or(preset.base_url),
            api_key_env: self.api_key_env.or(preset.api_key_env),
            price: self.price.unwrap_or(preset.price),
        }
    }
}

/// `[providers.<name>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Name of the env var holding the API key (never store the key itself).
    /// Only Ollama may leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// USD per 1k `[prompt, completion]` tokens.
    #[serde(default)]
    pub price: TokenPrice,
}

impl ProviderConfig {
    /// Built-in settings for `kind`.
    pub fn preset(kind: BackendKind) -> Self {
        let (model, base_url, api_key_env, price) = match kind {
            BackendKind::Groq => (
                "llama3-70b-8192",
                "https://api.groq.com/openai/v1",
                Some("GROQ_API_KEY"),
                TokenPrice(0.0, 0.0),
            ),
            BackendKind::OpenAi => (
                "gpt-4",
                "https://api.openai.com/v1",
                Some("OPENAI_API_KEY"),
                TokenPrice(0.03, 0.06),
            ),
            BackendKind::Anthropic => (
                "claude-3-opus-20240229",
                "https://api.anthropic.com/v1",
                Some("ANTHROPIC_API_KEY"),
                TokenPrice(0.015, 0.015),
            ),
            BackendKind::Ollama => (
                "llama2",
                "http://localhost:11434/v1",
                None,
                TokenPrice(0.0, 0.0),
            ),
        };
        Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key_env: api_key_env.map(Into::into),
            price,
        }
    }
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// The backend choices offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedModel {
    /// Groq if keyed, else whatever `auto` resolves to.
    Default,
    Gpt4,
    Claude,
    OtherOllama,
}

impl SupportedModel {
    pub const ALL: [SupportedModel; 4] = [Self::Default, Self::Gpt4, Self::Claude, Self::OtherOllama];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "Mixtral (Groq/Ollama - Default)",
            Self::Gpt4 => "GPT-4 (OpenAI)",
            Self::Claude => "Claude (Anthropic)",
            Self::OtherOllama => "Other Ollama Model",
        }
    }

    /// Short id used on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Gpt4 => "gpt4",
            Self::Claude => "claude",
            Self::OtherOllama => "ollama",
        }
    }
}

impl std::str::FromStr for SupportedModel {
    type Err = PromptEvalError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(needle) || m.label() == needle)
            .ok_or_else(|| {
                PromptEvalError::config(format!(
                    "unknown model selection '{needle}': expected default, gpt4, claude, or ollama"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Backend resolution
// ---------------------------------------------------------------------------

/// Non-empty value of `name`, if set.
fn lookup_key(env: EnvLookup<'_>, name: &str) -> Option<String> {
    env(name).filter(|v| !v.trim().is_empty())
}

/// Env var holding the key for `kind`. `None` only for Ollama, which needs no key.
fn key_var(config: &AppConfig, kind: BackendKind) -> Option<String> {
    match kind {
        BackendKind::Ollama => None,
        _ => config
            .providers
            .get(kind)
            .api_key_env
            .clone()
            .or_else(|| ProviderConfig::preset(kind).api_key_env),
    }
}

fn has_key(config: &AppConfig, kind: BackendKind, env: EnvLookup<'_>) -> bool {
    match key_var(config, kind) {
        Some(var) => lookup_key(env, &var).is_some(),
        None => true,
    }
}

fn temperature(config: &AppConfig, env: EnvLookup<'_>) -> Result<f32> {
    match env(TEMPERATURE_ENV) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            PromptEvalError::config(format!("invalid {TEMPERATURE_ENV} '{raw}': {e}"))
        }),
        None => Ok(config.defaults.temperature),
    }
}

fn timeout_secs(config: &AppConfig, env: EnvLookup<'_>) -> Result<u64> {
    match env(TIMEOUT_ENV) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PromptEvalError::config(format!("invalid {TIMEOUT_ENV} '{raw}': {e}"))),
        None => Ok(config.defaults.timeout_secs),
    }
}

/// Build the configuration for a specific backend.
///
/// Fails if the backend needs an API key and its env var is unset.
pub fn resolve_backend(
    config: &AppConfig,
    kind: BackendKind,
    env: EnvLookup<'_>,
) -> Result<LlmConfig> {
    let provider = config.providers.get(kind);

    let api_key = match key_var(config, kind) {
        Some(var) => lookup_key(env, &var).ok_or_else(|| {
            PromptEvalError::config(format!(
                "{kind} API key not found. Set the {var} environment variable."
            ))
        })?,
        None => OLLAMA_API_KEY.to_string(),
    };

    let raw_url = match kind {
        BackendKind::Ollama => {
            lookup_key(env, OLLAMA_BASE_URL_ENV).unwrap_or_else(|| provider.base_url.clone())
        }
        _ => provider.base_url.clone(),
    };
    let base_url = Url::parse(&raw_url).map_err(|e| {
        PromptEvalError::config(format!("invalid base_url '{raw_url}' for {kind}: {e}"))
    })?;

    Ok(LlmConfig {
        kind,
        model: provider.model.clone(),
        base_url,
        api_key,
        temperature: temperature(config, env)?,
        timeout_secs: timeout_secs(config, env)?,
        price: provider.price,
    })
}

/// Resolve the default backend.
///
/// With `backend = "auto"`, the first of Groq, OpenAI, Anthropic whose key
/// is present wins; local Ollama is the fallback.
pub fn resolve_default(config: &AppConfig, env: EnvLookup<'_>) -> Result<LlmConfig> {
    if !config.defaults.backend.eq_ignore_ascii_case("auto") {
        let kind: BackendKind = config.defaults.backend.parse()?;
        return resolve_backend(config, kind, env);
    }

    // Ollama is last in priority order and needs no key.
    let kind = BackendKind::ALL
        .into_iter()
        .find(|kind| has_key(config, *kind, env))
        .unwrap_or(BackendKind::Ollama);

    tracing::debug!(backend = %kind, "resolved default backend");
    resolve_backend(config, kind, env)
}

/// Resolve the backend for a user selection.
///
/// A keyed provider selection without its key falls back to the default.
pub fn resolve_for_selection(
    config: &AppConfig,
    selection: SupportedModel,
    env: EnvLookup<'_>,
) -> Result<LlmConfig> {
    match selection {
        SupportedModel::Gpt4 if has_key(config, BackendKind::OpenAi, env) => {
            resolve_backend(config, BackendKind::OpenAi, env)
        }
        SupportedModel::Claude if has_key(config, BackendKind::Anthropic, env) => {
            resolve_backend(config, BackendKind::Anthropic, env)
        }
        SupportedModel::OtherOllama => resolve_backend(config, BackendKind::Ollama, env),
        _ => {
            if selection != SupportedModel::Default {
                tracing::warn!(
                    selection = selection.label(),
                    "selected provider has no API key, falling back to default backend"
                );
            }
            resolve_default(config, env)
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prompteval/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PromptEvalError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prompteval/prompteval.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PromptEvalError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PromptEvalError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PromptEvalError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PromptEvalError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PromptEvalError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
