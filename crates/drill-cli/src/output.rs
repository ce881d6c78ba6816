//! Output formatting utilities

use std::time::Duration;

use colored::*;
use drill_types::{KindResult, RunSummary};
use tabled::{Table, Tabled};

use crate::error::CliResult;

/// Output format for a run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table and per-kind verdicts
    #[default]
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Stages")]
    stages: String,
    #[tabled(rename = "RTO")]
    rto: String,
    #[tabled(rename = "Objective")]
    objective: String,
}

impl KindRow {
    fn from_result(result: &KindResult) -> Self {
        let stages = result
            .stages()
            .iter()
            .map(|s| format!("{}:{}", s.stage, s.outcome))
            .collect::<Vec<_>>()
            .join(" ");
        let objective = match (result.rto_objective(), result.objective_met()) {
            (Some(target), Some(true)) => format!("met ({})", format_duration(target)),
            (Some(target), Some(false)) => format!("missed ({})", format_duration(target)),
            (Some(target), None) => format!("n/a ({})", format_duration(target)),
            (None, _) => "-".to_string(),
        };

        Self {
            kind: result.kind().to_string(),
            result: if result.passed() { "PASS" } else { "FAIL" }.to_string(),
            stages,
            rto: result.rto().map(format_duration).unwrap_or_else(|| "-".to_string()),
            objective,
        }
    }
}

/// Render a duration as `1h 2m`, `4m 30s`, `12s` or `350ms`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return format!("{}ms", duration.as_millis());
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Render a run summary in the requested format
pub fn render_summary(summary: &RunSummary, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(summary)?),
        OutputFormat::Text => Ok(render_text(summary)),
    }
}

fn render_text(summary: &RunSummary) -> String {
    if summary.kind_results().is_empty() {
        return format!("{}\n", "No resource kinds were drilled".dimmed());
    }

    let rows: Vec<KindRow> = summary
        .kind_results()
        .values()
        .map(KindRow::from_result)
        .collect();
    let mut out = Table::new(rows).to_string();
    out.push('\n');

    for result in summary.kind_results().values() {
        if let Some(failed) = result.failed_stage() {
            out.push_str(&format!(
                "{} {} failed at {}: {}\n",
                "✗".red(),
                result.kind(),
                failed.stage,
                failed.detail
            ));
        }
    }

    let elapsed = drill_core::clock::elapsed_between(summary.started_at(), summary.finished_at());
    let verdict = if summary.overall_pass() {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    out.push_str(&format!("Overall: {} in {}\n", verdict, format_duration(elapsed)));
    out
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use drill_types::{ResourceKind, Stage, StageResult};

    fn summary() -> RunSummary {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let database = KindResult::new(
            ResourceKind::Database,
            vec![
                StageResult::ok(Stage::Locate, "rp-1", Duration::ZERO),
                StageResult::ok(Stage::Restore, "h-1", Duration::ZERO),
                StageResult::ok(Stage::Wait, "available", Duration::from_secs(540)),
                StageResult::ok(Stage::Validate, "endpoint db.example.com", Duration::ZERO),
            ],
            Some(Duration::from_secs(540)),
            Some(Duration::from_secs(600)),
        );
        let volume = KindResult::new(
            ResourceKind::Volume,
            vec![StageResult::failed(Stage::Locate, "no recovery point", Duration::ZERO)],
            None,
            Some(Duration::from_secs(120)),
        );
        RunSummary::new(vec![database, volume], start, start + chrono::Duration::seconds(545))
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(350)), "350ms");
        assert_eq!(format_duration(Duration::from_secs(12)), "12s");
        assert_eq!(format_duration(Duration::from_secs(270)), "4m 30s");
        assert_eq!(format_duration(Duration::from_secs(3720)), "1h 2m");
    }

    #[test]
    fn test_text_lists_failed_stage_and_verdict() {
        let text = render_summary(&summary(), OutputFormat::Text).unwrap();
        assert!(text.contains("9m 0s"));
        assert!(text.contains("met (10m 0s)"));
        assert!(text.contains("volume failed at locate: no recovery point"));
        assert!(text.contains("FAIL"));
    }

    #[test]
    fn test_json_carries_overall_flag() {
        let json = render_summary(&summary(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["overall_pass"], false);
        assert_eq!(value["kind_results"]["database"]["rto_ms"], 540_000);
    }

    #[test]
    fn test_yaml_parses_back() {
        let yaml = render_summary(&summary(), OutputFormat::Yaml).unwrap();
        let parsed: RunSummary = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, summary());
    }
}
