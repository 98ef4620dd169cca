//! CLI command definitions using clap

use crate::config::{ColorChoice, LogFormat};
use blogprobe::{HarnessConfig, ReportFormat};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Blogprobe: end-to-end scenarios for the blog app, driven through a real browser
#[derive(Parser, Debug)]
#[command(name = "blogprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures and summary only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the blog suite in a browser
    Run(RunArgs),

    /// List planned scenarios
    List(ListArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Options shared by every command that resolves a configuration
#[derive(Parser, Debug, Default)]
pub struct ConfigSource {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Application root URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Backend API root URL
    #[arg(long)]
    pub api_url: Option<String>,
}

impl ConfigSource {
    /// Load the file (or defaults), then environment variables, then flags
    ///
    /// # Errors
    ///
    /// Returns a harness error if the file or an override is invalid.
    pub fn load(&self) -> blogprobe::HarnessResult<HarnessConfig> {
        let config = match &self.config {
            Some(path) => HarnessConfig::from_yaml_file(path)?,
            None => HarnessConfig::default(),
        };
        let mut config = config.apply_env()?;
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.clone());
        }
        Ok(config)
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration source
    #[command(flatten)]
    pub source: ConfigSource,

    /// Only run scenarios whose full name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Scenarios in flight at once
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Per-scenario deadline in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Skip remaining scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format on stdout
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// Apply run-specific flags on top of a loaded configuration
    #[must_use]
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(ms) = self.timeout {
            config = config.with_scenario_timeout(ms);
        }
        if self.headed {
            config = config.with_headless(false);
        }
        if self.fail_fast {
            config = config.with_fail_fast(true);
        }
        config
    }
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list scenarios whose full name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration source
    #[command(flatten)]
    pub source: ConfigSource,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty JSON
    Json,
    /// JUnit XML
    Junit,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
            FormatArg::Junit => Self::Junit,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Compact text
    #[default]
    Text,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "blogprobe",
            "-vv",
            "run",
            "--base-url",
            "http://127.0.0.1:8080",
            "--filter",
            "Login",
            "-j",
            "2",
            "--headed",
            "--format",
            "junit",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.filter.as_deref(), Some("Login"));
        assert!(matches!(args.format, FormatArg::Junit));

        let config = args.apply(HarnessConfig::default().with_base_url("http://127.0.0.1:8080"));
        assert_eq!(config.workers, 2);
        assert!(!config.headless);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_config_source_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.yaml");
        std::fs::write(&path, "base_url: http://file.local\napi_url: http://file.local/api\n")
            .unwrap();

        let source = ConfigSource {
            config: Some(path),
            base_url: None,
            api_url: Some("http://flag.local/api".to_string()),
        };
        let config = source.load().unwrap();
        assert_eq!(config.api_url, "http://flag.local/api");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["blogprobe", "list", "--color", "never", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.color, ColorArg::Never));
    }
}
