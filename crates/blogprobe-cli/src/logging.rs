//! Tracing subscriber setup

use crate::config::{CliConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber: `RUST_LOG` wins, otherwise the verbosity decides.
pub fn init_tracing(config: &CliConfig) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.verbosity.default_log_level().into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbosity.is_verbose());

    // A second init (e.g. in tests) is harmless.
    let _ = match config.log_format {
        LogFormat::Text => builder
            .compact()
            .with_ansi(config.color.should_color())
            .try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
