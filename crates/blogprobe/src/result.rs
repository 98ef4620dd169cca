//! Result and error types for blogprobe.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while preparing or running a scenario
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A required element never matched within the wait window
    #[error("Element not found: {locator} (waited {waited_ms}ms, last observed: {observed})")]
    ElementNotFound {
        /// Locator description
        locator: String,
        /// How long the harness waited
        waited_ms: u64,
        /// Last observed state
        observed: String,
    },

    /// An expected condition never became true
    #[error("Assertion timed out after {waited_ms}ms: expected {locator} {expected}, observed {observed}")]
    AssertionTimeout {
        /// Locator description
        locator: String,
        /// Expected condition
        expected: String,
        /// Last observed state
        observed: String,
        /// How long the harness waited
        waited_ms: u64,
    },

    /// A value assertion failed outright (no polling involved)
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// A setup step failed before the scenario body ran
    #[error("Setup step '{step}' failed: {source}")]
    SetupFailure {
        /// Name of the failing step
        step: String,
        /// Underlying error
        #[source]
        source: Box<HarnessError>,
    },

    /// An action targeted a locator that matched several elements
    #[error("Strict mode violation: {locator} resolved to {count} elements")]
    StrictModeViolation {
        /// Locator description
        locator: String,
        /// Number of matches
        count: usize,
    },

    /// Scenario exceeded its global deadline
    #[error("Scenario timed out after {ms}ms")]
    ScenarioTimeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The application under test could not be reached at all
    #[error("Application unreachable at {url}: {message}")]
    Unreachable {
        /// URL that was probed
        url: String,
        /// Error message
        message: String,
    },

    /// Backend call returned a non-success status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Request URL
        url: String,
        /// Status code
        status: u16,
    },

    /// Browser launch or protocol error
    #[error("Browser error: {message}")]
    Browser {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Native dialog was not observed or could not be answered
    #[error("Dialog error: {message}")]
    Dialog {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create a browser error
    #[must_use]
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    /// Create a dialog error
    #[must_use]
    pub fn dialog(message: impl Into<String>) -> Self {
        Self::Dialog {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an outright assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Wrap an error as the failure of a named setup step
    #[must_use]
    pub fn setup(step: impl Into<String>, source: Self) -> Self {
        Self::SetupFailure {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error means the application itself is not reachable
    #[must_use]
    pub fn is_environment(&self) -> bool {
        match self {
            Self::Unreachable { .. } => true,
            Self::SetupFailure { source, .. } => source.is_environment(),
            _ => false,
        }
    }
}
