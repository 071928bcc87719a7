//! Sondar: resilience layer for mobile UI automation
//!
//! Sondar (Spanish: "to probe/sound out") sits between test flows and a
//! device instrumentation driver. Mobile UIs are slow and unpredictable, so
//! instead of single-shot lookups and fixed sleeps every interaction goes
//! through three mechanisms:
//!
//! - **Locator strategy chain**: one logical element, several addressing
//!   schemes tried most stable first ([`locator`]).
//! - **Condition poller**: evaluate, sleep, re-evaluate until true or the
//!   budget is spent ([`wait`]).
//! - **Convergence scroller**: gesture, settle, snapshot until two
//!   consecutive view trees match or the gesture bound is hit ([`scroll`]).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     SONDAR Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────────┐    ┌────────────────┐    │
//! │   │ Page       │    │ Locator chain  │    │ SondarDriver   │    │
//! │   │ objects /  │───►│ Poller         │───►│ (device or     │    │
//! │   │ scenarios  │    │ Convergence    │    │  MockDriver)   │    │
//! │   └────────────┘    └────────────────┘    └────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only [`SondarError::SessionLost`] escapes a retry loop early; every other
//! driver fault counts as one failed attempt.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
#[allow(clippy::missing_errors_doc)]
pub mod driver;
pub mod locator;
pub mod logging;
#[allow(clippy::missing_errors_doc)]
pub mod page_object;
#[allow(clippy::missing_errors_doc)]
pub mod pages;
mod result;
pub mod scenario;
pub mod scroll;
pub mod wait;

pub use config::ResilienceConfig;
pub use driver::{
    DriverCall, ElementHandle, MockDriver, MockElement, MockScreen, Point, PointerPath,
    SondarDriver, Viewport,
};
pub use locator::{resolve_target, Locator, LocatorOptions, Strategy, StrategyKind, TargetDescriptor};
pub use page_object::{Actions, PageObject};
pub use result::{SondarError, SondarResult};
pub use scenario::{Scenario, ScenarioReport, Step, StepOutcome, StepReport};
pub use scroll::{
    run_until_stable, scroll_into_view, scroll_until_stable, tap_and_settle, ConvergenceOptions,
    ConvergenceOutcome, ConvergenceReport, Gesture, ScrollDirection, SnapshotDiffState,
    SwipeProfile,
};
pub use wait::{pause, wait_for_value, wait_until, ConditionSpec, WaitOutcome};

/// Prelude for writing flows
pub mod prelude {
    pub use super::config::ResilienceConfig;
    pub use super::driver::{MockDriver, MockElement, SondarDriver};
    pub use super::locator::{Locator, Strategy, TargetDescriptor};
    pub use super::page_object::{Actions, PageObject};
    pub use super::pages::{AccessibilityPage, AnimationsPage, HomePage, LoginPage, ViewsPage};
    pub use super::result::{SondarError, SondarResult};
    pub use super::scroll::{ConvergenceOptions, ScrollDirection};
    pub use super::wait::{wait_until, ConditionSpec};
}
