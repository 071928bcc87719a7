//! Sondar CLI Library
//!
//! Command-line interface for running scripted Sondar scenarios and
//! inspecting resilience configuration.

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigAction, ConfigArgs, ReportFormat, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_report, render_summary, Palette};
pub use runner::{load_resilience_config, ScenarioRunner};
