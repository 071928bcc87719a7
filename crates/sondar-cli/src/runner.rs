//! Scenario runner

use crate::commands::ReportFormat;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_report, render_summary, Palette};
use sondar::{ResilienceConfig, Scenario, ScenarioReport};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolve the effective resilience config: file (if any), then environment.
pub fn load_resilience_config(
    path: Option<&Path>,
    env: impl IntoIterator<Item = (String, String)>,
) -> CliResult<ResilienceConfig> {
    let base = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading resilience config");
            ResilienceConfig::from_file(path)?
        }
        None => ResilienceConfig::default(),
    };
    Ok(base.apply_env(env)?)
}

/// Runs scenario files and renders their reports
#[derive(Debug)]
pub struct ScenarioRunner {
    config: CliConfig,
    resilience: ResilienceConfig,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub const fn new(config: CliConfig, resilience: ResilienceConfig) -> Self {
        Self { config, resilience }
    }

    /// Run every scenario, printing reports to stdout
    pub fn run_files(
        &self,
        paths: &[PathBuf],
        format: ReportFormat,
        fail_fast: bool,
    ) -> CliResult<Vec<ScenarioReport>> {
        if paths.is_empty() {
            return Err(CliError::invalid_argument("no scenario files given"));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let palette = Palette::new(self.config.color.should_color());

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let scenario = Scenario::from_file(path).map_err(|err| {
                CliError::invalid_argument(format!("{}: {err}", path.display()))
            })?;
            info!(scenario = %scenario.name, path = %path.display(), "running");
            let report = runtime.block_on(scenario.run(&self.resilience))?;
            if format == ReportFormat::Text && !self.config.verbosity.is_quiet() {
                print!("{}", render_report(&report, &palette));
            }
            let failed = !report.passed();
            reports.push(report);
            if failed && fail_fast {
                break;
            }
        }

        let passed = reports.iter().filter(|r| r.passed()).count();
        match format {
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            ReportFormat::Text => {
                if !self.config.verbosity.is_quiet() {
                    println!("{}", render_summary(passed, reports.len(), &palette));
                }
            }
        }

        let failed = reports.len() - passed;
        if failed > 0 {
            return Err(CliError::ScenarioFailed {
                failed,
                skipped: paths.len() - reports.len(),
                total: paths.len(),
            });
        }
        Ok(reports)
    }
}
