//! Shared types, error model, and configuration for PromptEval.
//!
//! This crate is the foundation depended on by all other PromptEval crates.
//! It provides:
//! - [`PromptEvalError`]: the unified error type
//! - Domain types ([`LlmConfig`], [`EvaluationReport`], [`RunId`], [`TokenUsage`])
//! - Configuration ([`AppConfig`], backend resolution, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EnvLookup, ProviderConfig, ProvidersConfig, SupportedModel, config_dir,
    config_file_path, init_config, load_config, load_config_from, process_env, resolve_backend,
    resolve_default, resolve_for_selection,
};
pub use error::{PromptEvalError, Result};
pub use types::{
    BackendKind, EvaluationReport, LlmConfig, RunId, StageUsage, TokenPrice, TokenUsage,
    WireDialect,
};
