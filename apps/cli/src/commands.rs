//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use prompteval_core::{EvaluateOptions, ProgressReporter, PromptEvaluator};
use prompteval_shared::{
    AppConfig, EnvLookup, EvaluationReport, LlmConfig, SupportedModel, init_config,
    load_config, process_env, resolve_for_selection,
};
use tracing::info;

use crate::render;

/// Canned demo prompt.
const DEMO_PROMPT: &str = "What is Python?";
/// Canned demo answer.
const DEMO_ANSWER: &str = "Python is a programming language.";

/// Default file name for `--output` without a path.
const DEFAULT_EXPORT_FILE: &str = "evaluation_results.json";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PromptEval: critique an answer, improve its prompt, and compare.
#[derive(Parser)]
#[command(
    name = "prompteval",
    version,
    about = "Evaluate an LLM answer, rewrite its prompt, regenerate, and compare.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Backend and sampling flags shared by `run` and `demo`.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct BackendArgs {
    /// Model selection: default, gpt4, claude, or ollama.
    #[arg(short, long, default_value = "default")]
    pub model: SupportedModel,

    /// Override the sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Override the per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Report output flags shared by `run` and `demo`.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct OutputArgs {
    /// Print the report as JSON instead of text sections.
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to a file.
    #[arg(short, long, num_args = 0..=1, default_missing_value = DEFAULT_EXPORT_FILE)]
    pub output: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full evaluation pipeline on a prompt and its existing answer.
    Run {
        /// The prompt text.
        #[arg(short, long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
        prompt: Option<String>,

        /// Read the prompt from a file.
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Answer A (the existing LLM output).
        #[arg(short, long, conflicts_with = "answer_file", required_unless_present = "answer_file")]
        answer: Option<String>,

        /// Read Answer A from a file.
        #[arg(long)]
        answer_file: Option<PathBuf>,

        /// Use this rewritten prompt for Answer B if the fixer produces it.
        #[arg(long)]
        choose: Option<String>,

        /// Fail if the fixer returns fewer than two bullet lines.
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        backend: BackendArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run the pipeline on a built-in example.
    Demo {
        #[command(flatten)]
        backend: BackendArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the selectable models and what each resolves to.
    Models,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// stays clean for reports.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prompteval=info",
        1 => "prompteval=debug",
        _ => "prompteval=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            prompt,
            prompt_file,
            answer,
            answer_file,
            choose,
            strict,
            backend,
            output,
        } => {
            let prompt = read_input(prompt, prompt_file.as_deref(), "prompt")?;
            let answer = read_input(answer, answer_file.as_deref(), "answer")?;
            let options = EvaluateOptions {
                chosen_prompt: choose,
                strict,
            };
            cmd_run(&prompt, &answer, &options, &backend, &output).await
        }
        Command::Demo { backend, output } => {
            let options = EvaluateOptions {
                chosen_prompt: None,
                strict: true,
            };
            cmd_run(DEMO_PROMPT, DEMO_ANSWER, &options, &backend, &output).await
        }
        Command::Models => cmd_models().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Take inline text, or read it from `file`.
fn read_input(inline: Option<String>, file: Option<&Path>, what: &str) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {what} from {}", path.display())),
        (None, None) => Err(eyre!("no {what} given")),
    }
}

/// Resolve the backend for a selection and apply CLI overrides.
fn resolve_llm_config(config: &AppConfig, args: &BackendArgs) -> Result<LlmConfig> {
    resolve_llm_config_with(config, args, &process_env)
}

/// Resolve the selection against `env`, then apply CLI flag overrides.
fn resolve_llm_config_with(
    config: &AppConfig,
    args: &BackendArgs,
    env: EnvLookup<'_>,
) -> Result<LlmConfig> {
    let mut llm = resolve_for_selection(config, args.model, env)?;
    if let Some(temperature) = args.temperature {
        llm.temperature = temperature;
    }
    if let Some(timeout) = args.timeout {
        llm.timeout_secs = timeout;
    }
    Ok(llm)
}

async fn cmd_run(
    prompt: &str,
    answer: &str,
    options: &EvaluateOptions,
    backend: &BackendArgs,
    output: &OutputArgs,
) -> Result<()> {
    let config = load_config()?;
    let llm = resolve_llm_config(&config, backend)?;

    info!(
        selection = backend.model.label(),
        backend = %llm.kind,
        model = %llm.model,
        strict = options.strict,
        "running evaluation"
    );

    let evaluator = PromptEvaluator::new(llm)?;
    let reporter = CliProgress::new();

    let result = evaluator
        .evaluate_prompt_response(prompt, answer, options, &reporter)
        .await;
    reporter.finish();
    let report = result?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::report_text(&report));
    }

    if let Some(path) = &output.output {
        write_report(&report, path)?;
        eprintln!("Results written to {}", path.display());
    }

    Ok(())
}

/// Write the pretty-printed JSON report to `path`.
fn write_report(report: &EvaluationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).wrap_err_with(|| format!("failed to write {}", path.display()))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, name: &str) {
        self.spinner.set_message(format!("Running {name} …"));
    }

    fn done(&self, _report: &EvaluationReport) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_models() -> Result<()> {
    let config = load_config()?;

    println!();
    for selection in SupportedModel::ALL {
        let resolved = match resolve_for_selection(&config, selection, &process_env) {
            Ok(llm) => format!("{} / {}", llm.kind, llm.model),
            Err(e) => format!("unavailable ({e})"),
        };
        println!("  {:<8} {:<34} -> {resolved}", selection.id(), selection.label());
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_inline_text() {
        let cli = Cli::try_parse_from([
            "prompteval",
            "run",
            "--prompt",
            "What is Python?",
            "--answer",
            "A language.",
            "--model",
            "gpt4",
            "--strict",
            "--output",
        ])
        .expect("parse");

        match cli.command {
            Command::Run {
                prompt,
                answer,
                strict,
                backend,
                output,
                ..
            } => {
                assert_eq!(prompt.as_deref(), Some("What is Python?"));
                assert_eq!(answer.as_deref(), Some("A language."));
                assert!(strict);
                assert_eq!(backend.model, SupportedModel::Gpt4);
                assert_eq!(output.output, Some(PathBuf::from(DEFAULT_EXPORT_FILE)));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn cli_requires_prompt_and_answer() {
        assert!(Cli::try_parse_from(["prompteval", "run", "--answer", "x"]).is_err());
        assert!(Cli::try_parse_from(["prompteval", "run", "--prompt", "x"]).is_err());
        assert!(
            Cli::try_parse_from(["prompteval", "run", "-p", "x", "-a", "y", "--model", "bard"])
                .is_err()
        );
    }

    #[test]
    fn read_input_prefers_inline_then_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "from file").expect("write");

        assert_eq!(
            read_input(Some("inline".into()), None, "prompt").unwrap(),
            "inline"
        );
        assert_eq!(read_input(None, Some(&path), "prompt").unwrap(), "from file");
        assert!(read_input(None, Some(&dir.path().join("missing")), "prompt").is_err());
    }

    #[test]
    fn backend_overrides_apply() {
        let args = BackendArgs {
            model: SupportedModel::OtherOllama,
            temperature: Some(0.0),
            timeout: Some(5),
        };
        let env = |name: &str| match name {
            "TEMPERATURE" => Some("0.9".to_string()),
            "TIMEOUT" => Some("120".to_string()),
            _ => None,
        };
        let llm = resolve_llm_config_with(&AppConfig::default(), &args, &env).expect("resolve");
        assert_eq!(llm.temperature, 0.0);
        assert_eq!(llm.timeout_secs, 5);
        assert_eq!(llm.model, "llama2");

        let args = BackendArgs {
            temperature: None,
            timeout: None,
            ..args
        };
        let llm = resolve_llm_config_with(&AppConfig::default(), &args, &env).expect("resolve");
        assert_eq!(llm.temperature, 0.9);
        assert_eq!(llm.timeout_secs, 120);
    }
}
