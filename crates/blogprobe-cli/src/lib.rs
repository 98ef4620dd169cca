//! Blogprobe CLI Library
//!
//! Command-line front end and the blog app suite built on the `blogprobe`
//! harness.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod helpers;
mod logging;
mod output;
pub mod suite;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ConfigSource, FormatArg, ListArgs, LogFormatArg, RunArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_tracing;
pub use output::{styled_summary, ProgressReporter};
