//! Run reports.
//!
//! Every planned scenario ends up as exactly one [`ScenarioReport`] with an
//! independent verdict. Failures carry a [`FailureKind`] so a reader can tell
//! a broken setup apart from a failed assertion. An unreachable application
//! is recorded once on the [`RunReport`] instead of per scenario.
//!
//! ```text
//! RunReport
//! ├── environment_error: Option<String>   (pre-flight probe failed)
//! └── results
//!     ├── Blog app > Login form is shown                 Passed
//!     ├── Blog app > Login > fails with wrong password   Failed(Assertion)
//!     └── ...                                            Skipped (fail-fast)
//! ```

use crate::result::{HarnessError, HarnessResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

/// Final status of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Setup and body completed
    Passed,
    /// Setup or body failed, panicked or timed out
    Failed,
    /// Not started because the run stopped early
    Skipped,
}

impl ScenarioStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Why a scenario failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A setup step failed before the body ran
    Setup,
    /// An expected condition did not hold
    Assertion,
    /// An action never found its target
    ElementNotFound,
    /// The scenario deadline fired
    Timeout,
    /// The application or browser could not be reached
    Environment,
    /// Anything else (driver errors, panics)
    Other,
}

impl FailureKind {
    /// Classify a harness error
    #[must_use]
    pub fn classify(error: &HarnessError) -> Self {
        if error.is_environment() {
            return Self::Environment;
        }
        match error {
            HarnessError::SetupFailure { .. } => Self::Setup,
            HarnessError::AssertionTimeout { .. }
            | HarnessError::AssertionFailed { .. }
            | HarnessError::StrictModeViolation { .. } => Self::Assertion,
            HarnessError::ElementNotFound { .. } => Self::ElementNotFound,
            HarnessError::ScenarioTimeout { .. } => Self::Timeout,
            _ => Self::Other,
        }
    }

    /// Short label for text output
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Assertion => "assertion",
            Self::ElementNotFound => "element not found",
            Self::Timeout => "timeout",
            Self::Environment => "environment",
            Self::Other => "error",
        }
    }
}

/// Classified failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Classification
    pub kind: FailureKind,
    /// Human-readable error
    pub message: String,
}

impl Failure {
    /// Build from a harness error
    #[must_use]
    pub fn from_error(error: &HarnessError) -> Self {
        Self {
            kind: FailureKind::classify(error),
            message: error.to_string(),
        }
    }
}

/// Verdict of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Full path, groups joined by " > "
    pub name: String,
    /// Final status
    pub status: ScenarioStatus,
    /// Wall time including setup and teardown
    pub duration_ms: u64,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl ScenarioReport {
    /// Create a passing report
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Passed,
            duration_ms: millis(duration),
            failure: None,
        }
    }

    /// Create a failing report
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, failure: Failure) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Failed,
            duration_ms: millis(duration),
            failure: Some(failure),
        }
    }

    /// Create a skipped report
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Skipped,
            duration_ms: 0,
            failure: None,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Suite name
    pub suite_name: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Total wall time
    pub duration_ms: u64,
    /// Set when the application could not be reached; no scenario ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_error: Option<String>,
    /// One entry per planned scenario, in plan order
    pub results: Vec<ScenarioReport>,
}

impl RunReport {
    /// Create an empty report
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            environment_error: None,
            results: Vec::new(),
        }
    }

    /// Set total duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = millis(duration);
        self
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Count skipped scenarios
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ScenarioStatus::Skipped)
            .count()
    }

    /// Total scenario count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Whether the run reached the application and every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.environment_error.is_none() && self.results.iter().all(|r| r.status.is_passed())
    }

    /// Failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.results.iter().filter(|r| r.status.is_failed()).collect()
    }

    /// Process exit code: 0 all passed, 1 scenario failures, 2 environment failure
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.environment_error.is_some() {
            2
        } else if self.all_passed() {
            0
        } else {
            1
        }
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        if let Some(err) = &self.environment_error {
            return format!("{}: environment failure: {err}", self.suite_name);
        }
        format!(
            "{}: {} passed, {} failed, {} skipped ({} total) in {:.2}s",
            self.suite_name,
            self.passed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.total_count(),
            self.duration_ms as f64 / 1000.0
        )
    }

    /// Plain-text report, one line per scenario
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for r in &self.results {
            let mark = match r.status {
                ScenarioStatus::Passed => "ok",
                ScenarioStatus::Failed => "FAILED",
                ScenarioStatus::Skipped => "skipped",
            };
            let _ = writeln!(out, "{mark:>7}  {} ({}ms)", r.name, r.duration_ms);
            if let Some(failure) = &r.failure {
                let _ = writeln!(out, "         [{}] {}", failure.kind.label(), failure.message);
            }
        }
        let _ = writeln!(out, "{}", self.summary());
        out
    }

    /// Pretty JSON report
    ///
    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JUnit XML report
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" errors="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.skipped_count(),
            usize::from(self.environment_error.is_some()),
            self.duration_ms as f64 / 1000.0
        );
        for r in &self.results {
            let _ = write!(
                xml,
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&r.name),
                r.duration_ms as f64 / 1000.0
            );
            match (&r.status, &r.failure) {
                (ScenarioStatus::Failed, Some(f)) => {
                    let _ = write!(
                        xml,
                        r#"<failure type="{}" message="{}"/>"#,
                        f.kind.label(),
                        escape_xml(&f.message)
                    );
                }
                (ScenarioStatus::Skipped, _) => xml.push_str("<skipped/>"),
                _ => {}
            }
            xml.push_str("</testcase>\n");
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write the report in the given format
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error.
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> HarnessResult<()> {
        let body = match format {
            ReportFormat::Text => self.render_text(),
            ReportFormat::Json => self.to_json()?,
            ReportFormat::Junit => self.render_junit(),
        };
        std::fs::write(path, body)?;
        Ok(())
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty JSON
    Json,
    /// JUnit XML
    Junit,
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> RunReport {
        let mut report = RunReport::new("Blog app").with_duration(Duration::from_millis(1500));
        report.results = vec![
            ScenarioReport::passed("Blog app > Login form is shown", Duration::from_millis(10)),
            ScenarioReport::failed(
                "Blog app > Login > fails",
                Duration::from_millis(20),
                Failure::from_error(&HarnessError::AssertionTimeout {
                    locator: ".error".into(),
                    expected: "to contain text \"wrong\"".into(),
                    observed: "no matches".into(),
                    waited_ms: 5000,
                }),
            ),
            ScenarioReport::skipped("Blog app > Login > succeeds"),
        ];
        report
    }

    mod classify_tests {
        use super::*;

        #[test]
        fn test_classification() {
            let unreachable = HarnessError::Unreachable {
                url: "http://x".into(),
                message: "refused".into(),
            };
            assert_eq!(FailureKind::classify(&unreachable), FailureKind::Environment);
            assert_eq!(
                FailureKind::classify(&HarnessError::setup("reset state", unreachable)),
                FailureKind::Environment
            );
            assert_eq!(
                FailureKind::classify(&HarnessError::setup(
                    "log in",
                    HarnessError::assertion("x")
                )),
                FailureKind::Setup
            );
            assert_eq!(
                FailureKind::classify(&HarnessError::ScenarioTimeout { ms: 10 }),
                FailureKind::Timeout
            );
            assert_eq!(
                FailureKind::classify(&HarnessError::ElementNotFound {
                    locator: "x".into(),
                    waited_ms: 1,
                    observed: "no matches".into()
                }),
                FailureKind::ElementNotFound
            );
            assert_eq!(
                FailureKind::classify(&HarnessError::browser("crash")),
                FailureKind::Other
            );
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_counts_and_exit_code() {
            let report = sample();
            assert_eq!(report.passed_count(), 1);
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.skipped_count(), 1);
            assert!(!report.all_passed());
            assert_eq!(report.exit_code(), 1);
            assert_eq!(report.failures()[0].name, "Blog app > Login > fails");
        }

        #[test]
        fn test_environment_failure_exit_code() {
            let mut report = RunReport::new("Blog app");
            report.environment_error = Some("refused".into());
            assert_eq!(report.exit_code(), 2);
            assert!(report.summary().contains("environment failure"));
        }

        #[test]
        fn test_empty_run_passes() {
            let report = RunReport::new("Blog app");
            assert!(report.all_passed());
            assert_eq!(report.exit_code(), 0);
        }

        #[test]
        fn test_text_rendering() {
            let text = sample().render_text();
            assert!(text.contains("ok  Blog app > Login form is shown"));
            assert!(text.contains("[assertion]"));
            assert!(text.contains("1 passed, 1 failed, 1 skipped (3 total) in 1.50s"));
        }

        #[test]
        fn test_json_shape() {
            let json: serde_json::Value =
                serde_json::from_str(&sample().to_json().unwrap()).unwrap();
            assert_eq!(json["results"][1]["status"], "failed");
            assert_eq!(json["results"][1]["failure"]["kind"], "assertion");
            assert!(json["results"][0].get("failure").is_none());
        }

        #[test]
        fn test_junit_escapes_messages() {
            let xml = sample().render_junit();
            assert!(xml.contains(r#"tests="3" failures="1" skipped="1""#));
            assert!(xml.contains("&quot;wrong&quot;"));
            assert!(xml.contains("<skipped/>"));
        }

        #[test]
        fn test_write_to_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("report.json");
            sample().write_to(&path, ReportFormat::Json).unwrap();
            let body = std::fs::read_to_string(path).unwrap();
            assert!(body.contains("\"suite_name\": \"Blog app\""));
        }
    }
}
