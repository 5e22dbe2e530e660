//! End-to-end evaluation pipeline: critic → fixer → generator → comparator.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use prompteval_llm::{ChatBackend, ChatReply, HttpChatBackend};
use prompteval_shared::{
    EvaluationReport, LlmConfig, PromptEvalError, Result, RunId, StageUsage,
};

use crate::agents::{ComparatorAgent, CriticAgent, GeneratorAgent, PromptFixerAgent};
use crate::bullets::MAX_IMPROVED_PROMPTS;

/// Verdict recorded when Answer B is too short to be worth comparing.
pub const COMPARISON_SKIPPED: &str = "Comparison skipped – new answer not meaningful.";

/// Answer B must be longer than this many characters to be compared.
pub const MIN_ANSWER_CHARS: usize = 10;

/// Per-run options for [`PromptEvaluator::evaluate_prompt_response`].
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    /// Prompt to use for Answer B. Honored only if it exactly matches one
    /// of the rewritten prompts.
    pub chosen_prompt: Option<String>,
    /// Fail instead of falling back when the rewriter returns fewer than
    /// two usable bullet lines.
    pub strict: bool,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before each stage starts.
    fn stage(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &EvaluationReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _name: &str) {}
    fn done(&self, _report: &EvaluationReport) {}
}

/// Pick the prompt that will produce Answer B.
///
/// The override wins if it is one of `improved`; otherwise the first
/// improved prompt; otherwise the original prompt.
pub fn choose_prompt(improved: &[String], chosen: Option<&str>, original: &str) -> String {
    if let Some(chosen) = chosen {
        if improved.iter().any(|p| p == chosen) {
            return chosen.to_string();
        }
        warn!(chosen, "chosen prompt is not among the rewrites, ignoring");
    }

    improved
        .first()
        .cloned()
        .unwrap_or_else(|| original.to_string())
}

/// Runs the four agents against one shared backend.
pub struct PromptEvaluator {
    config: LlmConfig,
    backend: Arc<dyn ChatBackend>,
    critic: CriticAgent,
    fixer: PromptFixerAgent,
    generator: GeneratorAgent,
    comparator: ComparatorAgent,
}

impl PromptEvaluator {
    /// Build an evaluator talking HTTP to the backend described by `config`.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let backend = Arc::new(HttpChatBackend::new(config.clone())?);
        Ok(Self::with_backend(config, backend))
    }

    /// Build an evaluator over an arbitrary backend.
    pub fn with_backend(config: LlmConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend,
            critic: CriticAgent::default(),
            fixer: PromptFixerAgent::default(),
            generator: GeneratorAgent::default(),
            comparator: ComparatorAgent::default(),
        }
    }

    /// Replace the default agents (e.g. to use custom system prompts).
    pub fn with_agents(
        mut self,
        critic: CriticAgent,
        fixer: PromptFixerAgent,
        generator: GeneratorAgent,
        comparator: ComparatorAgent,
    ) -> Self {
        self.critic = critic;
        self.fixer = fixer;
        self.generator = generator;
        self.comparator = comparator;
        self
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    /// Swap the model configuration for all four agents at once.
    pub fn update_llm_config(&mut self, config: LlmConfig) -> Result<()> {
        let backend: Arc<dyn ChatBackend> = Arc::new(HttpChatBackend::new(config.clone())?);
        info!(backend = %config.kind, model = %config.model, "switched LLM backend");
        self.config = config;
        self.backend = backend;
        Ok(())
    }

    /// Run the full pipeline.
    ///
    /// 1. Critic evaluates Answer A
    /// 2. Fixer rewrites the prompt
    /// 3. Pick the prompt for Answer B (override, first rewrite, or original)
    /// 4. Generator produces Answer B
    /// 5. Comparator judges A vs B, unless B is too short
    #[instrument(skip_all, fields(backend = %self.config.kind, model = %self.config.model))]
    pub async fn evaluate_prompt_response(
        &self,
        prompt: &str,
        answer_a: &str,
        options: &EvaluateOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<EvaluationReport> {
        if prompt.trim().is_empty() || answer_a.trim().is_empty() {
            return Err(PromptEvalError::validation(
                "Please fill in both the prompt and Answer A.",
            ));
        }

        let run_id = RunId::new();
        let backend = self.backend.as_ref();
        let mut usage = Vec::with_capacity(4);

        info!(%run_id, "starting evaluation");

        // --- Stage 1: Critic ---
        progress.stage("Critic");
        let reply = self.critic.evaluate(backend, answer_a).await?;
        let critic_analysis = reply.text.trim().to_string();
        usage.push(stage_usage("critic", &reply));

        // --- Stage 2: Fixer ---
        progress.stage("Prompt fixer");
        let rewrite = self.fixer.fix(backend, prompt).await?;
        usage.push(stage_usage("fixer", &rewrite.reply));
        let improved = rewrite.prompts;

        if options.strict && rewrite.raw_bullets < MAX_IMPROVED_PROMPTS {
            return Err(PromptEvalError::Rewrite(format!(
                "fixer returned {} bullet line(s), expected {MAX_IMPROVED_PROMPTS}. \
                 Try a different model if this happens.",
                rewrite.raw_bullets
            )));
        }
        if improved.len() < MAX_IMPROVED_PROMPTS {
            warn!(
                raw = rewrite.raw_bullets,
                kept = improved.len(),
                "fixer returned fewer usable bullet lines than requested"
            );
        }

        let chosen_prompt = choose_prompt(&improved, options.chosen_prompt.as_deref(), prompt);

        // --- Stage 3: Generator ---
        progress.stage("Generator");
        let reply = self.generator.generate(backend, &chosen_prompt).await?;
        let new_response = reply.text.trim().to_string();
        usage.push(stage_usage("generator", &reply));

        // --- Stage 4: Comparator ---
        let comparison_analysis = if new_response.chars().count() > MIN_ANSWER_CHARS {
            progress.stage("Comparator");
            let reply = self
                .comparator
                .compare(backend, answer_a, &new_response)
                .await?;
            usage.push(stage_usage("comparator", &reply));
            reply.text.trim().to_string()
        } else {
            warn!(
                chars = new_response.chars().count(),
                "new answer too short, skipping comparison"
            );
            COMPARISON_SKIPPED.to_string()
        };

        let mut report = EvaluationReport {
            original_prompt: prompt.to_string(),
            original_response: answer_a.to_string(),
            critic_analysis,
            improved_prompts: improved,
            chosen_prompt,
            new_response,
            comparison_analysis,
            run_id,
            created_at: Utc::now(),
            backend: self.config.kind,
            model: self.config.model.clone(),
            usage,
            estimated_cost_usd: 0.0,
        };
        let total = report.total_usage();
        report.estimated_cost_usd = self.config.price.cost(&total);

        info!(
            run_id = %report.run_id,
            improved = report.improved_prompts.len(),
            tokens = total.total(),
            cost_usd = report.estimated_cost_usd,
            "evaluation complete"
        );

        progress.done(&report);
        Ok(report)
    }
}

fn stage_usage(stage: &str, reply: &ChatReply) -> StageUsage {
    StageUsage {
        stage: stage.to_string(),
        model: reply.model.clone(),
        tokens: reply.usage,
        latency_ms: reply.latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use prompteval_shared::{BackendKind, TokenPrice};
    use url::Url;

    use super::*;
    use crate::prompts::{COMPARATOR_SYSTEM_PROMPT, GENERATOR_SYSTEM_PROMPT};
    use crate::testing::ScriptedBackend;

    const PROMPT: &str = "What is Python?";
    const ANSWER_A: &str = "Python is a programming language.";
    const CRITIC_REPLY: &str = "  Correctness: High – accurate\nHallucination: Low – none\nTone: High – neutral\nRelevance: High – on topic\n";
    const FIXER_REPLY: &str = "• What is the Python programming language and what is it used for?\n• Explain what Python is in two sentences.";

    fn config() -> LlmConfig {
        LlmConfig {
            kind: BackendKind::Groq,
            model: "llama3-70b-8192".into(),
            base_url: Url::parse("https://api.groq.com/openai/v1").unwrap(),
            api_key: "gsk-test".into(),
            temperature: 0.7,
            timeout_secs: 600,
            price: TokenPrice(1.0, 2.0),
        }
    }

    fn evaluator(replies: &[&str]) -> (PromptEvaluator, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new(replies.iter().copied()));
        let evaluator = PromptEvaluator::with_backend(config(), backend.clone());
        (evaluator, backend)
    }

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<String>>,
        done: Mutex<bool>,
    }

    impl ProgressReporter for RecordingProgress {
        fn stage(&self, name: &str) {
            self.stages.lock().unwrap().push(name.to_string());
        }
        fn done(&self, _report: &EvaluationReport) {
            *self.done.lock().unwrap() = true;
        }
    }

    #[tokio::test]
    async fn full_pipeline_uses_first_bullet() {
        let (evaluator, backend) = evaluator(&[
            CRITIC_REPLY,
            FIXER_REPLY,
            "  Python is a high-level, general-purpose programming language.  ",
            "\nB is better: it is more complete.\n",
        ]);
        let progress = RecordingProgress::default();

        let report = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &EvaluateOptions::default(), &progress)
            .await
            .expect("pipeline");

        assert!(report.critic_analysis.starts_with("Correctness: High"));
        assert!(report.critic_analysis.ends_with("on topic"));
        assert_eq!(report.improved_prompts.len(), 2);
        assert_eq!(
            report.chosen_prompt,
            "What is the Python programming language and what is it used for?"
        );
        assert_eq!(
            report.new_response,
            "Python is a high-level, general-purpose programming language."
        );
        assert_eq!(report.comparison_analysis, "B is better: it is more complete.");
        assert_eq!(report.original_prompt, PROMPT);
        assert_eq!(report.original_response, ANSWER_A);
        assert_eq!(report.backend, BackendKind::Groq);

        let sent = backend.requests();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[2].system, GENERATOR_SYSTEM_PROMPT);
        assert_eq!(sent[2].user, report.chosen_prompt);
        assert_eq!(sent[3].system, COMPARATOR_SYSTEM_PROMPT);
        assert_eq!(
            sent[3].user,
            format!("A:\n{ANSWER_A}\n\nB:\n{}", report.new_response)
        );

        assert_eq!(
            *progress.stages.lock().unwrap(),
            vec!["Critic", "Prompt fixer", "Generator", "Comparator"]
        );
        assert!(*progress.done.lock().unwrap());

        let stages: Vec<&str> = report.usage.iter().map(|u| u.stage.as_str()).collect();
        assert_eq!(stages, vec!["critic", "fixer", "generator", "comparator"]);
        let total = report.total_usage();
        let expected = total.prompt_tokens as f64 / 1000.0 + total.completion_tokens as f64 / 500.0;
        assert!((report.estimated_cost_usd - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn chosen_prompt_override_is_honored() {
        let (evaluator, backend) = evaluator(&[
            CRITIC_REPLY,
            FIXER_REPLY,
            "Python is an interpreted language. It is popular.",
            "A is worse.",
        ]);
        let options = EvaluateOptions {
            chosen_prompt: Some("Explain what Python is in two sentences.".into()),
            strict: false,
        };

        let report = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &options, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.chosen_prompt, "Explain what Python is in two sentences.");
        assert_eq!(backend.requests()[2].user, report.chosen_prompt);
    }

    #[tokio::test]
    async fn no_bullets_falls_back_to_original_prompt() {
        let (evaluator, backend) = evaluator(&[
            CRITIC_REPLY,
            "Sure! What would you like to know?",
            "Python is a programming language created by Guido van Rossum.",
            "B adds useful detail.",
        ]);

        let report = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &EvaluateOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert!(report.improved_prompts.is_empty());
        assert_eq!(report.chosen_prompt, PROMPT);
        assert_eq!(backend.requests()[2].user, PROMPT);
    }

    #[tokio::test]
    async fn strict_mode_rejects_short_rewrite() {
        let (evaluator, backend) = evaluator(&[
            CRITIC_REPLY,
            "• What is the Python programming language?",
        ]);
        let options = EvaluateOptions {
            chosen_prompt: None,
            strict: true,
        };

        let err = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &options, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PromptEvalError::Rewrite(_)));
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn strict_mode_counts_bullets_before_keyword_filter() {
        let (evaluator, backend) = evaluator(&[
            CRITIC_REPLY,
            "• What is the Python programming language?\n• Tell me about snakes.",
            "Python is a general-purpose programming language.",
            "B is more specific.",
        ]);
        let options = EvaluateOptions {
            chosen_prompt: None,
            strict: true,
        };

        let report = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &options, &SilentProgress)
            .await
            .expect("two raw bullets satisfy strict mode");

        assert_eq!(
            report.improved_prompts,
            vec!["What is the Python programming language?"]
        );
        assert_eq!(report.chosen_prompt, "What is the Python programming language?");
        assert_eq!(backend.requests().len(), 4);
    }

    #[tokio::test]
    async fn short_answer_skips_comparison() {
        let (evaluator, backend) = evaluator(&[CRITIC_REPLY, FIXER_REPLY, "  Python.  "]);

        let report = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &EvaluateOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.new_response, "Python.");
        assert_eq!(report.comparison_analysis, COMPARISON_SKIPPED);
        assert_eq!(backend.requests().len(), 3);
        assert_eq!(report.usage.len(), 3);
    }

    #[tokio::test]
    async fn exactly_ten_chars_is_skipped() {
        let (evaluator, backend) = evaluator(&[CRITIC_REPLY, FIXER_REPLY, "0123456789"]);

        let report = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &EvaluateOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.comparison_analysis, COMPARISON_SKIPPED);
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected_before_any_call() {
        let (evaluator, backend) = evaluator(&[]);

        let err = evaluator
            .evaluate_prompt_response("   ", ANSWER_A, &EvaluateOptions::default(), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PromptEvalError::Validation { .. }));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let (evaluator, _backend) = evaluator(&[CRITIC_REPLY]);

        let err = evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &EvaluateOptions::default(), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PromptEvalError::Network(_)));
    }

    #[tokio::test]
    async fn custom_agents_are_used() {
        let backend = Arc::new(ScriptedBackend::new([
            CRITIC_REPLY,
            FIXER_REPLY,
            "short",
        ]));
        let evaluator = PromptEvaluator::with_backend(config(), backend.clone()).with_agents(
            CriticAgent::with_system_message("Grade harshly."),
            PromptFixerAgent::default(),
            GeneratorAgent::with_system_message("Answer in French."),
            ComparatorAgent::default(),
        );

        evaluator
            .evaluate_prompt_response(PROMPT, ANSWER_A, &EvaluateOptions::default(), &SilentProgress)
            .await
            .unwrap();

        let sent = backend.requests();
        assert_eq!(sent[0].system, "Grade harshly.");
        assert_eq!(sent[2].system, "Answer in French.");
    }

    #[test]
    fn choose_prompt_rules() {
        let improved = vec!["first".to_string(), "second".to_string()];
        assert_eq!(choose_prompt(&improved, None, "orig"), "first");
        assert_eq!(choose_prompt(&improved, Some("second"), "orig"), "second");
        assert_eq!(choose_prompt(&improved, Some("other"), "orig"), "first");
        assert_eq!(choose_prompt(&[], Some("other"), "orig"), "orig");
        assert_eq!(choose_prompt(&[], None, "orig"), "orig");
    }

    #[test]
    fn update_llm_config_swaps_backend() {
        let (mut evaluator, _backend) = evaluator(&[]);
        assert_eq!(evaluator.backend().model(), "scripted");

        let mut next = config();
        next.kind = BackendKind::Ollama;
        next.model = "llama2".into();
        next.base_url = Url::parse("http://localhost:11434/v1").unwrap();

        evaluator.update_llm_config(next).expect("swap");
        assert_eq!(evaluator.config().kind, BackendKind::Ollama);
        assert_eq!(evaluator.backend().model(), "llama2");
    }
}
