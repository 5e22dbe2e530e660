//! Core pipeline orchestration for PromptEval.
//!
//! This crate ties the four agents (critic, fixer, generator, comparator)
//! and the bullet-selection glue into one evaluate → rewrite → regenerate →
//! compare run (see [`pipeline::PromptEvaluator`]).

pub mod agents;
pub mod bullets;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{
    COMPARISON_SKIPPED, EvaluateOptions, ProgressReporter, PromptEvaluator, SilentProgress,
    choose_prompt,
};
