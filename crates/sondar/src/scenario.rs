//! Scripted scenarios
//!
//! A scenario pairs a scripted [`MockScreen`] with an ordered list of steps
//! and runs them through the same locator, wait and convergence code that
//! page objects use. Loaded from YAML:
//!
//! ```yaml
//! name: login falls back to resource id
//! screen:
//!   elements:
//!     - selector: 'id=com.example.app:id/login_btn'
//! steps:
//!   - action: click
//!     target:
//!       name: login button
//!       strategies:
//!         - accessibility_id: login_button
//!         - resource_id: com.example.app:id/login_btn
//! ```
//!
//! Execution stops at the first failing step.

use crate::config::ResilienceConfig;
use crate::driver::{MockDriver, MockScreen, SondarDriver};
use crate::locator::TargetDescriptor;
use crate::page_object::Actions;
use crate::result::{SondarError, SondarResult};
use crate::scroll::ScrollDirection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Instant;
use tracing::{info, warn};

/// One scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Resolve once, without waiting
    Resolve {
        /// Target to resolve
        target: TargetDescriptor,
    },
    /// Wait until the target is displayed
    WaitVisible {
        /// Target to wait for
        target: TargetDescriptor,
    },
    /// Wait until the target is gone or hidden
    WaitHidden {
        /// Target to wait for
        target: TargetDescriptor,
    },
    /// Wait for the target and tap it
    Click {
        /// Target to tap
        target: TargetDescriptor,
    },
    /// Wait for an input, clear it and type
    Fill {
        /// Input to fill
        target: TargetDescriptor,
        /// Text to type
        value: String,
    },
    /// Read the target's text and compare
    ExpectText {
        /// Target to read
        target: TargetDescriptor,
        /// Exact expected text
        expected: String,
    },
    /// Scroll until the content stops changing
    ScrollUntilStable {
        /// Scroll direction
        direction: ScrollDirection,
        /// Fail unless the outcome matches
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_converged: Option<bool>,
    },
    /// Scroll until the target is displayed
    ScrollIntoView {
        /// Target to reveal
        target: TargetDescriptor,
        /// Scroll direction
        direction: ScrollDirection,
    },
    /// Tap a transient control and wait the settle delay
    TapAndSettle {
        /// Target to tap
        target: TargetDescriptor,
    },
}

impl Step {
    /// Action name as written in YAML
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Resolve { .. } => "resolve",
            Self::WaitVisible { .. } => "wait_visible",
            Self::WaitHidden { .. } => "wait_hidden",
            Self::Click { .. } => "click",
            Self::Fill { .. } => "fill",
            Self::ExpectText { .. } => "expect_text",
            Self::ScrollUntilStable { .. } => "scroll_until_stable",
            Self::ScrollIntoView { .. } => "scroll_into_view",
            Self::TapAndSettle { .. } => "tap_and_settle",
        }
    }

    async fn execute(&self, actions: &Actions<'_>) -> SondarResult<String> {
        let driver = actions.driver();
        match self {
            Self::Resolve { target } => {
                let handle = actions.locator(target.clone()).resolve(driver).await?;
                Ok(format!("resolved via {}", handle.selector))
            }
            Self::WaitVisible { target } => {
                let handle = actions.locator(target.clone()).wait_for_visible(driver).await?;
                Ok(format!("visible via {}", handle.selector))
            }
            Self::WaitHidden { target } => {
                let outcome = actions.locator(target.clone()).wait_for_hidden(driver).await?;
                Ok(format!("hidden after {} polls", outcome.polls))
            }
            Self::Click { target } => {
                actions.click(&actions.locator(target.clone())).await?;
                Ok("clicked".to_string())
            }
            Self::Fill { target, value } => {
                actions.fill(&actions.locator(target.clone()), value).await?;
                Ok(format!("typed {} chars", value.chars().count()))
            }
            Self::ExpectText { target, expected } => {
                let actual = actions.read_text(&actions.locator(target.clone())).await?;
                if actual == *expected {
                    Ok(format!("text is {actual:?}"))
                } else {
                    Err(SondarError::assertion(format!(
                        "{target}: expected text {expected:?}, found {actual:?}"
                    )))
                }
            }
            Self::ScrollUntilStable {
                direction,
                expect_converged,
            } => {
                let report = actions.scroll_until_stable(*direction).await?;
                if let Some(expected) = expect_converged {
                    if report.converged() != *expected {
                        return Err(SondarError::assertion(format!(
                            "scroll {direction}: expected converged={expected}, got {:?} after {} gestures",
                            report.outcome, report.attempts
                        )));
                    }
                }
                Ok(format!("{:?} after {} gestures", report.outcome, report.attempts))
            }
            Self::ScrollIntoView { target, direction } => {
                let handle = actions
                    .scroll_into_view(&actions.locator(target.clone()), *direction)
                    .await?;
                Ok(format!("revealed {}", handle.selector))
            }
            Self::TapAndSettle { target } => {
                actions.tap_and_settle(&actions.locator(target.clone())).await?;
                Ok("tapped and settled".to_string())
            }
        }
    }
}

/// A named screen plus steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Optional configuration override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ResilienceConfig>,
    /// Scripted screen the steps run against
    #[serde(default)]
    pub screen: MockScreen,
    /// Steps in order
    pub steps: Vec<Step>,
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Step succeeded
    Passed {
        /// What happened
        detail: String,
    },
    /// Step failed; later steps were not run
    Failed {
        /// Error message
        error: String,
    },
}

/// Report line for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Zero-based position in the scenario
    pub index: usize,
    /// Action name
    pub action: String,
    /// Result
    pub outcome: StepOutcome,
    /// Wall time spent
    pub elapsed_ms: u64,
}

/// Report of a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Steps that ran
    pub steps: Vec<StepReport>,
    /// Steps never reached
    pub skipped: usize,
}

impl ScenarioReport {
    /// Every step ran and passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.skipped == 0
            && self
                .steps
                .iter()
                .all(|s| matches!(s.outcome, StepOutcome::Passed { .. }))
    }

    /// The failing step, if any
    #[must_use]
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
    }
}

impl Scenario {
    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> SondarResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> SondarResult<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    /// Serialize to YAML in the same grammar `from_yaml_str` reads
    pub fn to_yaml(&self) -> SondarResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Scenario config if present, otherwise `fallback`
    pub fn effective_config(&self, fallback: &ResilienceConfig) -> SondarResult<ResilienceConfig> {
        let config = self.config.clone().unwrap_or_else(|| fallback.clone());
        config.validate()?;
        Ok(config)
    }

    /// Run against a fresh driver for the scripted screen
    pub async fn run(&self, fallback: &ResilienceConfig) -> SondarResult<ScenarioReport> {
        let config = self.effective_config(fallback)?;
        let driver = MockDriver::from_screen(self.screen.clone());
        Ok(self.run_on(&driver, config).await)
    }

    /// Run against any driver
    pub async fn run_on(&self, driver: &dyn SondarDriver, config: ResilienceConfig) -> ScenarioReport {
        let actions = Actions::new(driver, config);
        let mut steps = Vec::with_capacity(self.steps.len());
        info!(scenario = %self.name, steps = self.steps.len(), "running scenario");

        for (index, step) in self.steps.iter().enumerate() {
            let start = Instant::now();
            let result = step.execute(&actions).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let failed = result.is_err();
            let outcome = match result {
                Ok(detail) => StepOutcome::Passed { detail },
                Err(err) => {
                    warn!(scenario = %self.name, index, action = step.action(), error = %err, "step failed");
                    StepOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            steps.push(StepReport {
                index,
                action: step.action().to_string(),
                outcome,
                elapsed_ms,
            });
            if failed {
                break;
            }
        }

        let skipped = self.steps.len() - steps.len();
        ScenarioReport {
            name: self.name.clone(),
            steps,
            skipped,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const LOGIN: &str = r#"
name: login with fallbacks
config:
  element_timeout_ms: 200
  poll_interval_ms: 50
  settle_delay_ms: 1
  tap_settle_ms: 1
screen:
  elements:
    - selector: '~email_input'
    - selector: 'id=com.example.app:id/login_btn'
      reveals_on_click: ['~home_title']
    - selector: '~home_title'
      visible: false
      text: Home
steps:
  - action: fill
    target:
      strategies:
        - accessibility_id: email_input
    value: qa@example.com
  - action: click
    target:
      name: login button
      strategies:
        - accessibility_id: login_button
        - resource_id: com.example.app:id/login_btn
        - text: Login
  - action: expect_text
    target:
      strategies:
        - accessibility_id: home_title
    expected: Home
"#;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_yaml_str(LOGIN).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[1].action(), "click");
        match &scenario.steps[1] {
            Step::Click { target } => assert_eq!(target.strategies().len(), 3),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_yaml_output_reloads() {
        let scenario = Scenario::from_yaml_str(LOGIN).unwrap();
        let yaml = scenario.to_yaml().unwrap();
        assert!(yaml.contains("- resource_id: com.example.app:id/login_btn"), "{yaml}");
        let reloaded = Scenario::from_yaml_str(&yaml).unwrap();
        assert_eq!(reloaded, scenario);
    }

    #[test]
    fn test_scroll_steps_reload() {
        let scenario = Scenario {
            name: "scroll".to_string(),
            config: None,
            screen: MockScreen::default(),
            steps: vec![
                Step::ScrollUntilStable {
                    direction: ScrollDirection::Up,
                    expect_converged: Some(true),
                },
                Step::ScrollIntoView {
                    target: TargetDescriptor::of(crate::locator::Strategy::text_contains(
                        "WebView3",
                    )),
                    direction: ScrollDirection::Down,
                },
            ],
        };
        let reloaded = Scenario::from_yaml_str(&scenario.to_yaml().unwrap()).unwrap();
        assert_eq!(reloaded, scenario);
    }

    #[test]
    fn test_empty_target_rejected() {
        let yaml = "name: x\nsteps:\n  - action: click\n    target:\n      strategies: []\n";
        assert!(Scenario::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = "name: x\nsteps:\n  - action: teleport\n";
        assert!(Scenario::from_yaml_str(yaml).is_err());
    }

    #[tokio::test]
    async fn test_login_scenario_passes() {
        let scenario = Scenario::from_yaml_str(LOGIN).unwrap();
        let report = scenario.run(&ResilienceConfig::default()).await.unwrap();
        assert!(report.passed(), "{report:?}");
        assert_eq!(report.steps.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_stops_execution() {
        let yaml = r"
name: missing button
config:
  element_timeout_ms: 100
  poll_interval_ms: 50
steps:
  - action: click
    target:
      strategies:
        - accessibility_id: nowhere
  - action: resolve
    target:
      strategies:
        - accessibility_id: nowhere
";
        let report = Scenario::from_yaml_str(yaml)
            .unwrap()
            .run(&ResilienceConfig::default())
            .await
            .unwrap();
        assert!(!report.passed());
        assert_eq!(report.skipped, 1);
        let failure = report.failure().unwrap();
        assert_eq!(failure.index, 0);
        match &failure.outcome {
            StepOutcome::Failed { error } => assert!(error.contains("timed out")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expect_converged_mismatch_fails() {
        let yaml = r"
name: endless feed
config:
  settle_delay_ms: 1
  max_scroll_attempts: 3
screen:
  snapshots: ['a', 'b', 'c', 'd', 'e']
steps:
  - action: scroll_until_stable
    direction: down
    expect_converged: true
";
        let report = Scenario::from_yaml_str(yaml)
            .unwrap()
            .run(&ResilienceConfig::default())
            .await
            .unwrap();
        let failure = report.failure().unwrap();
        match &failure.outcome {
            StepOutcome::Failed { error } => assert!(error.starts_with("Assertion failed")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_running() {
        let yaml = "name: x\nconfig:\n  poll_interval_ms: 1\nsteps: []\n";
        let scenario = Scenario::from_yaml_str(yaml).unwrap();
        assert!(scenario.run(&ResilienceConfig::default()).await.is_err());
    }
}
