//! Result export: JSON, CSV, and an SVG status badge.
//!
//! These writers consume the serializable result/summary structures from
//! `minder-core`; nothing here reaches back into the evaluation path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use minder_core::{ScoreSummary, SuiteResult};

/// Write the full result tree plus summary and run metadata as JSON.
pub fn write_json(
    path: &Path,
    result: &SuiteResult,
    summary: &ScoreSummary,
    provider: &str,
    model: &str,
) -> Result<PathBuf> {
    let document = serde_json::json!({
        "metadata": {
            "provider": provider,
            "model": model,
            "generated_at": result.generated_at,
            "minder_version": env!("CARGO_PKG_VERSION"),
        },
        "suite": result,
        "summary": summary,
    });

    fs::write(path, serde_json::to_vec_pretty(&document)?)
        .with_context(|| format!("writing JSON report to {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Write one CSV row per case with a digest of its failed rules.
pub fn write_csv(path: &Path, result: &SuiteResult) -> Result<PathBuf> {
    let mut out = String::from(
        "case_id,category,passed,provider_error,latency_ms,rules_passed,rules_total,failed_rules\n",
    );

    for case in &result.case_results {
        let rules_passed = case.rule_outcomes.iter().filter(|o| o.passed).count();
        let failed_rules = case
            .rule_outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(|o| format!("{}: {}", o.rule, o.detail))
            .collect::<Vec<_>>()
            .join("; ");
        let provider_error = case
            .provider_error
            .as_ref()
            .map(|f| f.kind.to_string())
            .unwrap_or_default();
        let latency = case
            .latency_ms
            .map(|ms| ms.to_string())
            .unwrap_or_default();

        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_escape(&case.case_id),
            csv_escape(&case.category),
            case.case_passed,
            provider_error,
            latency,
            rules_passed,
            case.rule_outcomes.len(),
            csv_escape(&failed_rules),
        ));
    }

    fs::write(path, out).with_context(|| format!("writing CSV report to {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Render a flat SVG badge colored by the verdict band.
pub fn write_badge(path: &Path, summary: &ScoreSummary) -> Result<PathBuf> {
    let percent = (summary.overall_pass_rate * 100.0).round() as u32;
    let status = format!("{percent}% pass");
    let color = summary.verdict_band.badge_color();

    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="140" height="20" role="img" aria-label="minder: {status}">
  <rect width="60" height="20" fill="#555"/>
  <rect x="60" width="80" height="20" fill="{color}"/>
  <g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11">
    <text x="30" y="14">minder</text>
    <text x="100" y="14">{status}</text>
  </g>
</svg>
"##
    );

    fs::write(path, svg).with_context(|| format!("writing badge to {}", path.display()))?;
    Ok(path.to_path_buf())
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minder_core::{summarize, CaseResult, RuleOutcome};

    fn sample_result() -> SuiteResult {
        SuiteResult::new(
            "demo",
            "4-6",
            vec![
                CaseResult::scored(
                    "c1",
                    "math",
                    "7",
                    Some(3),
                    vec![RuleOutcome::pass("numeric answer 7 (tolerance 0)", "extracted 7")],
                ),
                CaseResult::scored(
                    "c2",
                    "safety",
                    "a story, with commas",
                    Some(5),
                    vec![RuleOutcome::fail("contains \"bunny\"", "\"bunny\" not found in response")],
                ),
            ],
        )
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("minder_report_test_{}_{name}", std::process::id()))
    }

    #[test]
    fn csv_escape_quotes_fields_with_commas() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn json_export_round_trips_summary_figures() {
        let result = sample_result();
        let summary = summarize(&result);
        let path = temp_path("out.json");

        write_json(&path, &result, &summary, "dummy", "dummy-small").unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

        assert_eq!(value["metadata"]["provider"], "dummy");
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["passed"], 1);
        assert_eq!(value["suite"]["case_results"][0]["case_id"], "c1");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn csv_export_has_one_row_per_case() {
        let result = sample_result();
        let path = temp_path("out.csv");

        write_csv(&path, &result).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("case_id,"));
        assert!(lines[1].starts_with("c1,math,true"));
        assert!(lines[2].starts_with("c2,safety,false"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn badge_uses_band_color_and_percent() {
        let result = sample_result();
        let summary = summarize(&result);
        let path = temp_path("badge.svg");

        write_badge(&path, &summary).unwrap();
        let svg = fs::read_to_string(&path).unwrap();

        assert!(svg.contains("50% pass"));
        assert!(svg.contains(summary.verdict_band.badge_color()));

        let _ = fs::remove_file(path);
    }
}
