//! Rendering of run summaries.

use crate::models::{RunSummary, TestResult};
use colored::Colorize;
use std::fmt::Write as _;

/// Renders a summary as a table, one row per scenario followed by the
/// failing assertions of each failed scenario.
pub fn render_table(summary: &RunSummary, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<22} {:<15} {:>8}  {}", "", "SCENARIO", "TIER", "TIME", "DESCRIPTION");
    for result in &summary.results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        let _ = writeln!(
            out,
            "{status:<6} {:<22} {:<15} {:>6}ms  {}",
            result.scenario_id,
            result.tier,
            result.duration.as_millis(),
            result.scenario_description.dimmed()
        );
        if !result.passed || verbose {
            write_details(&mut out, result, verbose);
        }
    }

    let totals = format!(
        "{} scenarios, {} passed, {} failed",
        summary.total(),
        summary.passed,
        summary.failed
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        if summary.all_passed() {
            totals.green()
        } else {
            totals.red()
        }
    );
    out
}

fn write_details(out: &mut String, result: &TestResult, verbose: bool) {
    if let Some(error) = &result.error {
        let _ = writeln!(out, "       {} {}", "error:".red(), error);
    }
    for assertion in &result.assertions {
        if assertion.passed && !verbose {
            continue;
        }
        let mark = if assertion.passed { "✓".green() } else { "✗".red() };
        let _ = writeln!(out, "       {mark} {}", assertion.name);
        if !assertion.passed {
            let _ = writeln!(out, "           expected: {}", assertion.expected);
            let _ = writeln!(out, "           actual:   {}", assertion.actual);
        }
    }
}

/// Renders a summary as pretty-printed JSON.
pub fn render_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

/// Renders the scenario list for `mimic-e2e list`.
pub fn render_list<'a>(scenarios: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (id, tier, description) in scenarios {
        let _ = writeln!(out, "{:<22} {:<15} {}", id.bold(), tier, description);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Assertion;
    use chrono::Utc;
    use std::time::Duration;

    fn summary() -> RunSummary {
        let failing = TestResult {
            scenario_id: "capture-args".to_string(),
            scenario_description: "capture".to_string(),
            tier: "verification".to_string(),
            passed: false,
            assertions: vec![
                Assertion {
                    name: "slot holds the last argument".to_string(),
                    passed: false,
                    expected: "\"good bye\"".to_string(),
                    actual: "Ok(\"hello world\")".to_string(),
                },
                Assertion {
                    name: "both calls accepted".to_string(),
                    passed: true,
                    expected: "no error".to_string(),
                    actual: "Ok(())".to_string(),
                },
            ],
            duration: Duration::from_millis(2),
            error: None,
        };
        let passing = TestResult {
            scenario_id: "basic".to_string(),
            scenario_description: "basic".to_string(),
            tier: "stubbing".to_string(),
            passed: true,
            assertions: vec![],
            duration: Duration::from_millis(1),
            error: None,
        };
        RunSummary::new(Utc::now(), vec![passing, failing])
    }

    #[test]
    fn test_table_lists_failures_only() {
        colored::control::set_override(false);
        let table = render_table(&summary(), false);
        assert!(table.contains("PASS   basic"));
        assert!(table.contains("FAIL   capture-args"));
        assert!(table.contains("✗ slot holds the last argument"));
        assert!(table.contains("expected: \"good bye\""));
        assert!(!table.contains("both calls accepted"));
        assert!(table.contains("2 scenarios, 1 passed, 1 failed"));
    }

    #[test]
    fn test_verbose_table_lists_passing_assertions() {
        colored::control::set_override(false);
        let table = render_table(&summary(), true);
        assert!(table.contains("✓ both calls accepted"));
    }

    #[test]
    fn test_json_output() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&summary()).unwrap()).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["results"][1]["scenario_id"], "capture-args");
        assert_eq!(json["results"][1]["assertions"][0]["passed"], false);
    }

    #[test]
    fn test_list() {
        colored::control::set_override(false);
        let list = render_list([("basic", "stubbing", "Stubbed hello()")]);
        assert!(list.starts_with("basic"));
        assert!(list.contains("Stubbed hello()"));
    }
}
