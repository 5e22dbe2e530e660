//! Plain-text rendering of an [`EvaluationReport`].

use std::fmt::Write as _;

use prompteval_shared::EvaluationReport;

fn section(out: &mut String, title: &str, body: &str) {
    let _ = writeln!(out, "== {title} ==");
    let _ = writeln!(out, "{}", body.trim_end());
    out.push('\n');
}

/// Render the report as titled sections, in pipeline order.
pub(crate) fn report_text(report: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push('\n');

    section(&mut out, "Critic Analysis", &report.critic_analysis);

    let _ = writeln!(out, "== Improved Prompts (first one was used) ==");
    if report.improved_prompts.is_empty() {
        let _ = writeln!(out, "(none; the original prompt was used)");
    }
    for (i, prompt) in report.improved_prompts.iter().enumerate() {
        let _ = writeln!(out, "Version {}: {prompt}", i + 1);
    }
    out.push('\n');

    section(&mut out, "Comparator Verdict", &report.comparison_analysis);
    section(&mut out, "Answer A", &report.original_response);
    section(&mut out, "Prompt used for Answer B", &report.chosen_prompt);
    section(&mut out, "Answer B", &report.new_response);

    let usage = report.total_usage();
    let _ = writeln!(
        out,
        "{} / {} · run {} · {} tokens · ~${:.4}",
        report.backend,
        report.model,
        report.run_id,
        usage.total(),
        report.estimated_cost_usd
    );

    out
}
