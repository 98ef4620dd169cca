//! Blogprobe CLI: run the blog app end-to-end suite
//!
//! ## Usage
//!
//! ```bash
//! blogprobe run                              # Run every scenario headless
//! blogprobe run --filter "Login" --headed    # Watch a subset run
//! blogprobe run --format junit -o report.xml # CI report
//! blogprobe list                             # Show planned scenarios
//! blogprobe config -c probe.yaml             # Show resolved configuration
//! ```

use blogprobe_cli::suite::blog_suite;
use blogprobe_cli::{
    init_tracing, Cli, CliConfig, CliError, CliResult, Commands, ConfigArgs, ListArgs, RunArgs,
    Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config);

    let result = match cli.command {
        Commands::Run(args) => run_suite(&config, &args),
        Commands::List(args) => {
            list_scenarios(&args);
            Ok(0)
        }
        Commands::Config(args) => show_config(&args).map(|()| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

fn list_scenarios(args: &ListArgs) {
    for planned in blog_suite().plan_filtered(args.filter.as_deref()) {
        println!("{}", planned.name());
    }
}

fn show_config(args: &ConfigArgs) -> CliResult<()> {
    let config = args.source.load()?;
    config.validate()?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

#[cfg(not(feature = "browser"))]
fn run_suite(_config: &CliConfig, _args: &RunArgs) -> CliResult<u8> {
    Err(CliError::config(
        "built without browser support; rebuild with --features browser",
    ))
}

#[cfg(feature = "browser")]
fn run_suite(cli_config: &CliConfig, args: &RunArgs) -> CliResult<u8> {
    use blogprobe::{ApiClient, Browser, BrowserConfig, Runner};
    use blogprobe_cli::{styled_summary, ProgressReporter};
    use std::sync::Arc;

    let harness = args.apply(args.source.load()?);
    harness.validate()?;
    tracing::info!(base_url = %harness.base_url, workers = harness.workers, "starting run");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let use_color = cli_config.color.should_color();
    let quiet = cli_config.verbosity.is_quiet();

    let report = runtime.block_on(async {
        let browser = Browser::launch(BrowserConfig::from_harness(&harness))
            .await
            .map_err(|e| CliError::browser_launch(e.to_string()))?;
        let browser = Arc::new(browser);

        let api = Arc::new(ApiClient::new(&harness.base_url, &harness.api_url)?);
        let progress = Arc::new(ProgressReporter::new(use_color, quiet));
        let runner = Runner::new(harness, browser.clone(), api)
            .with_filter(args.filter.clone())
            .with_observer(progress.clone());

        let report = runner.run(&blog_suite()).await;
        progress.finish();
        drop(runner);

        match Arc::try_unwrap(browser) {
            Ok(browser) => {
                if let Err(e) = browser.close().await {
                    tracing::warn!(error = %e, "browser did not shut down cleanly");
                }
            }
            Err(_) => tracing::warn!("browser still in use at shutdown"),
        }
        Ok::<_, CliError>(report)
    })?;

    let format = args.format.into();
    match format {
        blogprobe::ReportFormat::Text => {
            if !quiet {
                print!("{}", report.render_text());
            }
        }
        blogprobe::ReportFormat::Json => println!("{}", report.to_json()?),
        blogprobe::ReportFormat::Junit => print!("{}", report.render_junit()),
    }
    if let Some(path) = &args.output {
        report
            .write_to(path, format)
            .map_err(|e| CliError::report_generation(format!("{}: {e}", path.display())))?;
    }
    eprintln!("{}", styled_summary(&report, use_color));

    Ok(report.exit_code())
}
