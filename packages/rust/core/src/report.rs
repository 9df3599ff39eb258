//! Rendering of analysis results for people (text) and programs (JSON).

use serde::{Deserialize, Serialize};

use fallacydetector_shared::{AnalysisReport, AnalysisResult, FallacyDetectorError, Result, Stage};

const RULE_WIDTH: usize = 50;

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Section heading and empty-placeholder for a stage.
fn section(stage: Stage) -> (&'static str, &'static str) {
    match stage {
        Stage::Summarize => ("ARTICLE SUMMARY", "No summary available"),
        Stage::DetectFallacies => ("LOGICAL FALLACY ANALYSIS", "No analysis available"),
        Stage::Explain => ("EDUCATIONAL EXPLANATIONS", "No explanations available"),
        Stage::Synthesize => ("SYNTHESIS REPORT", "No synthesis available"),
    }
}

/// Render one result as the fixed-layout text report.
///
/// An error-shaped result renders as a single `Error: <message>` line. A
/// success always has every stage section, with a placeholder for any stage
/// that recorded nothing.
pub fn render(result: &AnalysisResult) -> String {
    match result {
        AnalysisResult::Failure(failure) => format!("Error: {}", failure.error),
        AnalysisResult::Success(report) => render_report(report),
    }
}

fn render_report(report: &AnalysisReport) -> String {
    let mut out = format!(
        "ARTICLE ANALYSIS RESULTS\n{rule}\n\n\
         Title: {title}\n\
         URL: {url}\n\
         Timestamp: {timestamp}\n\
         Processing time: {time:.2}s\n\
         Model: {model}\n\
         Run ID: {run_id}\n",
        rule = "=".repeat(RULE_WIDTH),
        title = or_unknown(&report.title),
        url = or_unknown(&report.url),
        timestamp = report.timestamp.to_rfc3339(),
        time = report.processing_time,
        model = report.model,
        run_id = report.run_id,
    );

    for stage in Stage::ALL {
        let (heading, placeholder) = section(stage);
        let body = report
            .stage_outputs
            .get(stage)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(placeholder);

        out.push('\n');
        out.push_str(heading);
        out.push_str(":\n");
        out.push_str(&"-".repeat(heading.len() + 1));
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }

    out
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "Unknown" } else { value }
}

/// Render one result as pretty JSON.
pub fn render_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result)
        .map_err(|e| FallacyDetectorError::validation(format!("failed to serialize result: {e}")))
}

/// Render a batch of results in `format`.
///
/// Text reports are separated by a blank line; JSON is a single object for one
/// result and an array otherwise.
pub fn render_all(results: &[AnalysisResult], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(results
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join("\n\n")),
        ReportFormat::Json => match results {
            [single] => render_json(single),
            many => serde_json::to_string_pretty(many).map_err(|e| {
                FallacyDetectorError::validation(format!("failed to serialize results: {e}"))
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fallacydetector_shared::{FailureKind, RunId, StageOutputs};

    fn report(outputs: StageOutputs) -> AnalysisResult {
        AnalysisResult::Success(AnalysisReport {
            run_id: RunId::new(),
            title: "New Emissions Targets".into(),
            url: "https://www.whitehouse.gov/briefing/1".into(),
            model: "gpt-4.1-nano".into(),
            content_hash: "ab".repeat(32),
            stage_outputs: outputs,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
            processing_time: 4.5,
        })
    }

    fn all_stages() -> StageOutputs {
        let mut outputs = StageOutputs::new();
        for stage in Stage::ALL {
            outputs.record(stage, format!("{stage} text"));
        }
        outputs
    }

    #[test]
    fn error_renders_single_line() {
        let result = AnalysisResult::failed(&FallacyDetectorError::Search("boom".into()));
        let text = render(&result);
        assert_eq!(text, "Error: search failed: boom");
        assert!(!text.contains('\n'));
    }

    #[test]
    fn success_renders_header_and_sections_in_order() {
        let text = render(&report(all_stages()));

        let rule = "=".repeat(50);
        assert!(text.starts_with(&format!("ARTICLE ANALYSIS RESULTS\n{rule}\n\nTitle: ")));
        assert!(text.contains("Title: New Emissions Targets"));
        assert!(text.contains("URL: https://www.whitehouse.gov/briefing/1"));
        assert!(text.contains("Timestamp: 2025-03-14T09:30:00+00:00"));
        assert!(text.contains("Processing time: 4.50s"));

        let positions: Vec<_> = [
            "ARTICLE SUMMARY:\n----------------\nsummary text",
            "LOGICAL FALLACY ANALYSIS:",
            "EDUCATIONAL EXPLANATIONS:",
            "SYNTHESIS REPORT:",
        ]
        .iter()
        .map(|needle| text.find(needle).expect(needle))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_stages_render_placeholders() {
        let mut outputs = StageOutputs::new();
        outputs.record(Stage::DetectFallacies, "No logical fallacies detected.");
        outputs.record(Stage::Explain, "   ");

        let text = render(&report(outputs));
        assert!(text.contains("No summary available"));
        assert!(text.contains("No logical fallacies detected."));
        assert!(text.contains("No explanations available"));
        assert!(text.contains("No synthesis available"));
    }

    #[test]
    fn report_shape_is_stable() {
        let full = render(&report(all_stages()));
        let empty = render(&report(StageOutputs::new()));
        assert_eq!(full.lines().count(), empty.lines().count());
    }

    #[test]
    fn json_uses_result_shapes() {
        let json = render_json(&report(all_stages())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stage_outputs"]["summary"], "summary text");
        assert_eq!(value["stage_outputs"]["synthesized_result"], "synthesized_result text");
        assert!(value.get("error").is_none());

        let failed = AnalysisResult::failed(&FallacyDetectorError::NoResults { query: "q".into() });
        let json = render_json(&failed).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("no articles found"));
        assert_eq!(value["kind"], "no_results");
        assert!(value.get("stage_outputs").is_none());
    }

    #[test]
    fn render_all_joins_batches() {
        let results = vec![
            report(all_stages()),
            AnalysisResult::Failure(fallacydetector_shared::AnalysisFailure {
                error: "article fetch failed".into(),
                kind: FailureKind::Fetch,
            }),
        ];

        let text = render_all(&results, ReportFormat::Text).unwrap();
        assert!(text.ends_with("\n\nError: article fetch failed"));

        let json = render_all(&results, ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));

        let single = render_all(&results[..1], ReportFormat::Json).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&single).unwrap().is_object());
    }
}
