//! Report rendering

use console::Style;
use sondar::{ScenarioReport, StepOutcome};
use std::fmt::Write;

/// Styles for report lines; all plain when color is off
#[derive(Debug, Clone)]
pub struct Palette {
    pass: Style,
    fail: Style,
    dim: Style,
    bold: Style,
}

impl Palette {
    /// Build the palette
    #[must_use]
    pub fn new(use_color: bool) -> Self {
        let base = Style::new().force_styling(use_color);
        Self {
            pass: base.clone().green(),
            fail: base.clone().red().bold(),
            dim: base.clone().dim(),
            bold: base.bold(),
        }
    }
}

/// Render one scenario report as text
#[must_use]
pub fn render_report(report: &ScenarioReport, palette: &Palette) -> String {
    let mut out = String::new();
    let verdict = if report.passed() {
        palette.pass.apply_to("PASS")
    } else {
        palette.fail.apply_to("FAIL")
    };
    let _ = writeln!(out, "{verdict} {}", palette.bold.apply_to(&report.name));

    for step in &report.steps {
        let (mark, text) = match &step.outcome {
            StepOutcome::Passed { detail } => (palette.pass.apply_to("ok"), detail.clone()),
            StepOutcome::Failed { error } => (palette.fail.apply_to("!!"), error.clone()),
        };
        let _ = writeln!(
            out,
            "  {mark} {:>2}. {:<20} {text} {}",
            step.index + 1,
            step.action,
            palette.dim.apply_to(format!("({}ms)", step.elapsed_ms))
        );
    }
    if report.skipped > 0 {
        let _ = writeln!(
            out,
            "  {}",
            palette.dim.apply_to(format!("{} step(s) skipped", report.skipped))
        );
    }
    out
}

/// Summary line after all scenarios
#[must_use]
pub fn render_summary(passed: usize, total: usize, palette: &Palette) -> String {
    let style = if passed == total { &palette.pass } else { &palette.fail };
    format!("{}", style.apply_to(format!("{passed}/{total} scenario(s) passed")))
}
