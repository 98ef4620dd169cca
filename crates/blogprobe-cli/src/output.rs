//! Output formatting and progress reporting

use blogprobe::{RunObserver, RunReport, ScenarioReport, ScenarioStatus};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Live progress for a run: a bar on stderr plus one line per verdict.
#[derive(Debug)]
pub struct ProgressReporter {
    bar: ProgressBar,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode: only failures are printed
    pub quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            bar,
            use_color,
            quiet,
        }
    }

    /// Stop drawing the bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn line(&self, report: &ScenarioReport) -> String {
        let mark = match (report.status, self.use_color) {
            (ScenarioStatus::Passed, true) => style("✓").green().bold().to_string(),
            (ScenarioStatus::Failed, true) => style("✗").red().bold().to_string(),
            (ScenarioStatus::Skipped, true) => style("-").yellow().to_string(),
            (ScenarioStatus::Passed, false) => "PASS".to_string(),
            (ScenarioStatus::Failed, false) => "FAIL".to_string(),
            (ScenarioStatus::Skipped, false) => "SKIP".to_string(),
        };
        let mut line = format!("{mark} {} ({}ms)", report.name, report.duration_ms);
        if let Some(failure) = &report.failure {
            let detail = format!("    [{}] {}", failure.kind.label(), failure.message);
            line.push('\n');
            if self.use_color {
                line.push_str(&style(detail).dim().to_string());
            } else {
                line.push_str(&detail);
            }
        }
        line
    }
}

impl RunObserver for ProgressReporter {
    fn run_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("running");
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        self.bar.inc(1);
        // Failures are printed even in quiet mode
        if report.status.is_failed() || !self.quiet {
            let line = self.line(report);
            if self.quiet {
                eprintln!("{line}");
            } else {
                self.bar.println(line);
            }
        }
    }
}

/// Coloured one-line summary for the end of a run
#[must_use]
pub fn styled_summary(report: &RunReport, use_color: bool) -> String {
    let summary = report.summary();
    if !use_color {
        return summary;
    }
    match report.exit_code() {
        0 => style(summary).green().bold().to_string(),
        2 => style(summary).yellow().bold().to_string(),
        _ => style(summary).red().bold().to_string(),
    }
}
