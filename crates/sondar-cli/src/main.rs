//! Sondeador: command-line runner for Sondar scenarios
//!
//! ## Usage
//!
//! ```bash
//! sondeador run login.yaml views.yaml   # Run scenarios
//! sondeador run flows/*.yaml --format json
//! sondeador config show                 # Effective configuration
//! sondeador config check sondar.yaml    # Validate a config file
//! ```

use clap::Parser;
use sondar::logging::{init_tracing, LogFormat};
use sondar::ResilienceConfig;
use sondeador::{
    load_resilience_config, Cli, CliConfig, CliResult, ColorChoice, Commands, ConfigAction,
    ScenarioRunner, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    let format = if config.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(config.verbosity.log_directive(), format)?;

    let resilience = load_resilience_config(config.config_path.as_deref(), std::env::vars())?;

    match cli.command {
        Commands::Run(args) => {
            let runner = ScenarioRunner::new(config, resilience);
            runner.run_files(&args.scenarios, args.format, args.fail_fast)?;
            Ok(())
        }
        Commands::Config(args) => match args.action {
            ConfigAction::Show => {
                print!("{}", resilience.to_yaml()?);
                Ok(())
            }
            ConfigAction::Check { path } => {
                ResilienceConfig::from_file(&path)?;
                if !config.verbosity.is_quiet() {
                    println!("{}: ok", path.display());
                }
                Ok(())
            }
        },
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_json_logs(cli.json_logs)
        .with_config_path(cli.config.clone())
}
