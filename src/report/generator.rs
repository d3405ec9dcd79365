//! Batch report generation.
//!
//! Renders the outcome of a batch run as Markdown, JSON, or a short console
//! summary.

use crate::models::{BatchMetadata, BatchReport, GroupReport, StageStatus};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &BatchReport) -> String {
    let mut output = String::new();

    output.push_str("# hdspin-eval Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_groups_section(&report.groups));
    output.push_str(&generate_failures_section(report));

    output
}

fn generate_metadata_section(metadata: &BatchMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Cache Root:** `{}`\n",
        metadata.cache_root.display()
    ));
    section.push_str(&format!(
        "- **Run Date:** {}\n",
        metadata.run_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if metadata.dry_run {
        section.push_str("- **Mode:** dry run (nothing written)\n");
    }
    section.push_str(&format!("- **Groups:** {}\n", metadata.groups_total));
    section.push_str(&format!(
        "- **Stages Succeeded:** {}\n",
        metadata.stages_succeeded
    ));
    if metadata.stages_failed > 0 {
        section.push_str(&format!("- **Stages Failed:** {}\n", metadata.stages_failed));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn format_shape(shape: Option<(usize, usize)>) -> String {
    match shape {
        Some((rows, cols)) => format!("{} x {}", rows, cols),
        None => "-".to_string(),
    }
}

/// One table row per stage.
fn generate_groups_section(groups: &[GroupReport]) -> String {
    let mut section = String::new();

    section.push_str("## Groups\n\n");
    if groups.is_empty() {
        section.push_str("No trial groups found.\n\n");
        return section;
    }

    section.push_str("| Group | Pipeline | Status | Trials | Shape |\n");
    section.push_str("|-------|----------|:------:|-------:|------:|\n");
    for group in groups {
        for stage in &group.stages {
            section.push_str(&format!(
                "| `{}` | {} | {} | {} | {} |\n",
                group.name,
                stage.pipeline,
                stage.status.emoji(),
                stage.trials,
                format_shape(stage.shape)
            ));
        }
    }
    section.push('\n');

    section
}

fn generate_failures_section(report: &BatchReport) -> String {
    let failures = report.failures();
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Failures\n\n");
    for (group, stage) in failures {
        section.push_str(&format!(
            "- **{}** / {} (`{}`): {}\n",
            group.name,
            stage.pipeline,
            stage.error_kind.as_deref().unwrap_or("unknown"),
            stage.error.as_deref().unwrap_or("")
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Short multi-line summary for the terminal.
pub fn console_summary(report: &BatchReport) -> String {
    let meta = &report.metadata;
    let mut lines = Vec::new();

    lines.push("📊 Evaluation Summary:".to_string());
    lines.push(format!("   Groups: {}", meta.groups_total));
    if meta.dry_run {
        let planned = report
            .groups
            .iter()
            .flat_map(|g| &g.stages)
            .filter(|s| s.status == StageStatus::Planned)
            .count();
        lines.push(format!("   Planned stages: {}", planned));
    } else {
        lines.push(format!(
            "   {} Succeeded: {} | {} Failed: {}",
            StageStatus::Succeeded.emoji(),
            meta.stages_succeeded,
            StageStatus::Failed.emoji(),
            meta.stages_failed
        ));
    }
    for (group, stage) in report.failures() {
        lines.push(format!(
            "   - {} / {}: {}",
            group.name,
            stage.pipeline,
            stage.error.as_deref().unwrap_or("")
        ));
    }
    lines.push(format!("   Duration: {:.1}s", meta.duration_seconds));

    lines.join("\n")
}
