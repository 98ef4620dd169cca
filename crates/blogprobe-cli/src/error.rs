//! Error types for the CLI

use blogprobe::HarnessError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The browser could not be started
    #[error("Browser launch failed: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness error
    #[error("{0}")]
    Harness(#[from] HarnessError),

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a browser launch error
    #[must_use]
    pub fn browser_launch(message: impl Into<String>) -> Self {
        Self::BrowserLaunch {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }

    /// Process exit code for this error: 2 when the environment is at fault
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BrowserLaunch { .. } => 2,
            Self::Harness(e) if e.is_environment() => 2,
            _ => 1,
        }
    }
}
