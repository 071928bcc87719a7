//! Convergence-Driven Scroller / Gesture Runner
//!
//! The driver never says when a scroll has finished, nor whether a list has
//! more rows. Instead the runner gestures, waits a settle delay, takes a
//! fresh view-tree snapshot and compares it with the previous one:
//!
//! ```text
//! snapshot ─► gesture ─► settle ─► snapshot ─► equal? ──yes──► Converged
//!                ▲                                │
//!                └──────── attempts < max ◄───no──┘──► Exhausted
//! ```
//!
//! Equality is plain string equality over the whole serialized tree, so any
//! visual change (even a transient highlight) counts as "still moving".
//! The loop always ends after at most `max_attempts` gestures.
//!
//! The initial "previous" snapshot is empty, so a screen that never changes
//! costs exactly one gesture before convergence is detected.

use crate::driver::{ElementHandle, PointerPath, SondarDriver, Viewport};
use crate::locator::Locator;
use crate::result::{SondarError, SondarResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on gestures per session
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default pause after each gesture before re-snapshotting (300ms)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

/// Default pause after tapping a transient control (500ms)
pub const DEFAULT_TAP_SETTLE_MS: u64 = 500;

/// Direction the content moves toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    /// Reveal content above (finger moves down)
    Up,
    /// Reveal content below (finger moves up)
    Down,
    /// Reveal content to the left (finger moves right)
    Left,
    /// Reveal content to the right (finger moves left)
    Right,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// Where a swipe starts and ends, as fractions of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwipeProfile {
    /// Fraction of the scrolled axis where the finger lands
    pub start_ratio: f64,
    /// Fraction of the scrolled axis where the finger lifts
    pub end_ratio: f64,
    /// Hold before moving
    pub hold: Duration,
}

impl Default for SwipeProfile {
    fn default() -> Self {
        Self {
            start_ratio: 0.8,
            end_ratio: 0.2,
            hold: Duration::ZERO,
        }
    }
}

impl ScrollDirection {
    /// Pointer path for this direction on `viewport`.
    ///
    /// `Down` drags from `start_ratio` to `end_ratio` of the height along the
    /// vertical center line; the other directions mirror or rotate that.
    #[must_use]
    pub fn path(self, viewport: Viewport, profile: &SwipeProfile) -> PointerPath {
        let (from, to) = (profile.start_ratio, profile.end_ratio);
        let (start, end) = match self {
            Self::Down => (viewport.at_ratio(0.5, from), viewport.at_ratio(0.5, to)),
            Self::Up => (viewport.at_ratio(0.5, to), viewport.at_ratio(0.5, from)),
            Self::Right => (viewport.at_ratio(from, 0.5), viewport.at_ratio(to, 0.5)),
            Self::Left => (viewport.at_ratio(to, 0.5), viewport.at_ratio(from, 0.5)),
        };
        PointerPath::new(start, end).with_hold(profile.hold)
    }
}

type PathFn = dyn Fn(Viewport) -> PointerPath + Send + Sync;

/// The gesture repeated by a convergence session
#[derive(Clone)]
pub enum Gesture {
    /// A directional swipe built from the session's [`SwipeProfile`]
    Scroll(ScrollDirection),
    /// Arbitrary path computed from the current viewport
    Custom(Arc<PathFn>),
}

impl Gesture {
    /// Wrap a path generator
    pub fn custom(generator: impl Fn(Viewport) -> PointerPath + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(generator))
    }

    fn path(&self, viewport: Viewport, profile: &SwipeProfile) -> PointerPath {
        match self {
            Self::Scroll(direction) => direction.path(viewport, profile),
            Self::Custom(generator) => generator(viewport),
        }
    }
}

impl fmt::Debug for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scroll(direction) => f.debug_tuple("Scroll").field(direction).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<ScrollDirection> for Gesture {
    fn from(direction: ScrollDirection) -> Self {
        Self::Scroll(direction)
    }
}

/// Bounds and timing for a convergence session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceOptions {
    /// Maximum gestures before giving up
    pub max_attempts: u32,
    /// Pause after each gesture
    pub settle_delay: Duration,
    /// Swipe geometry for directional gestures
    pub swipe: SwipeProfile,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            swipe: SwipeProfile::default(),
        }
    }
}

impl ConvergenceOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gesture bound
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the settle delay
    #[must_use]
    pub const fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Set the swipe geometry
    #[must_use]
    pub const fn with_swipe(mut self, swipe: SwipeProfile) -> Self {
        self.swipe = swipe;
        self
    }
}

/// Snapshot comparison state for one session.
///
/// A `None` snapshot means "not captured" and never equals anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDiffState {
    previous: Option<String>,
    current: Option<String>,
    attempts: u32,
    max_attempts: u32,
}

impl SnapshotDiffState {
    /// Start a session from the first capture
    #[must_use]
    pub const fn new(initial: Option<String>, max_attempts: u32) -> Self {
        Self {
            previous: None,
            current: initial,
            attempts: 0,
            max_attempts,
        }
    }

    /// The last two captures are present and identical
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!((&self.previous, &self.current), (Some(p), Some(c)) if p == c)
    }

    /// The gesture bound is reached
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Neither converged nor exhausted
    #[must_use]
    pub fn should_continue(&self) -> bool {
        !self.is_converged() && !self.is_exhausted()
    }

    /// Record the capture taken after one more gesture
    pub fn advance(&mut self, next: Option<String>) {
        self.previous = std::mem::replace(&mut self.current, next);
        self.attempts += 1;
    }

    /// Gestures performed so far
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Most recent capture
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// How a convergence session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceOutcome {
    /// Two consecutive snapshots were identical
    Converged,
    /// The gesture bound was hit first
    Exhausted,
}

/// Summary of a finished convergence session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// How the session ended
    pub outcome: ConvergenceOutcome,
    /// Gestures attempted
    pub attempts: u32,
    /// Gestures the driver rejected
    pub failed_gestures: u32,
}

impl ConvergenceReport {
    /// Whether the content stopped changing
    #[must_use]
    pub const fn converged(&self) -> bool {
        matches!(self.outcome, ConvergenceOutcome::Converged)
    }
}

/// Capture a snapshot, mapping transient failures to `None`.
async fn capture<D: SondarDriver + ?Sized>(driver: &D) -> SondarResult<Option<String>> {
    match driver.snapshot().await {
        Ok(tree) => Ok(Some(tree)),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            debug!(error = %err, "snapshot failed, treating as changed");
            Ok(None)
        }
    }
}

async fn perform<D: SondarDriver + ?Sized>(
    driver: &D,
    gesture: &Gesture,
    profile: &SwipeProfile,
) -> SondarResult<()> {
    let viewport = driver.viewport_size().await?;
    driver.perform_gesture(&gesture.path(viewport, profile)).await
}

/// One gesture, settle, capture step. Returns whether the gesture failed.
async fn step<D: SondarDriver + ?Sized>(
    driver: &D,
    gesture: &Gesture,
    options: &ConvergenceOptions,
    state: &mut SnapshotDiffState,
) -> SondarResult<bool> {
    let failed = match perform(driver, gesture, &options.swipe).await {
        Ok(()) => false,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            debug!(?gesture, attempt = state.attempts() + 1, error = %err, "gesture failed");
            true
        }
    };
    tokio::time::sleep(options.settle_delay).await;
    state.advance(capture(driver).await?);
    Ok(failed)
}

/// Repeat `gesture` until two consecutive snapshots match or the bound is hit.
///
/// Only a lost session is reported as an error; everything else ends in a
/// [`ConvergenceReport`], and the caller verifies whatever it was looking for.
pub async fn run_until_stable<D: SondarDriver + ?Sized>(
    driver: &D,
    gesture: &Gesture,
    options: &ConvergenceOptions,
) -> SondarResult<ConvergenceReport> {
    let mut state = SnapshotDiffState::new(capture(driver).await?, options.max_attempts);
    let mut failed_gestures = 0;

    while state.should_continue() {
        if step(driver, gesture, options, &mut state).await? {
            failed_gestures += 1;
        }
    }

    let outcome = if state.is_converged() {
        ConvergenceOutcome::Converged
    } else {
        warn!(?gesture, attempts = state.attempts(), "content still changing at gesture bound");
        ConvergenceOutcome::Exhausted
    };
    debug!(?gesture, ?outcome, attempts = state.attempts(), "convergence session finished");
    Ok(ConvergenceReport {
        outcome,
        attempts: state.attempts(),
        failed_gestures,
    })
}

/// Scroll in `direction` until the content stops changing.
pub async fn scroll_until_stable<D: SondarDriver + ?Sized>(
    driver: &D,
    direction: ScrollDirection,
    options: &ConvergenceOptions,
) -> SondarResult<ConvergenceReport> {
    run_until_stable(driver, &Gesture::Scroll(direction), options).await
}

/// Scroll in `direction` until `locator` is visible.
///
/// Checks before every gesture and stops early once the content converges
/// without the target appearing. Fails with
/// [`SondarError::ElementNotFound`] in that case.
pub async fn scroll_into_view<D: SondarDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    direction: ScrollDirection,
    options: &ConvergenceOptions,
) -> SondarResult<ElementHandle> {
    let gesture = Gesture::Scroll(direction);
    let mut state = SnapshotDiffState::new(capture(driver).await?, options.max_attempts);

    loop {
        match locator.visible_handle(driver).await {
            Ok(Some(handle)) => {
                debug!(target = %locator.descriptor(), attempts = state.attempts(), "target scrolled into view");
                return Ok(handle);
            }
            Ok(None) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => debug!(error = %err, "visibility check failed"),
        }
        if !state.should_continue() {
            break;
        }
        step(driver, &gesture, options, &mut state).await?;
    }

    Err(SondarError::ElementNotFound {
        descriptor: locator.descriptor().clone(),
    })
}

/// Tap a transient control and give its effect a fixed time to apply.
///
/// Use this only where there is nothing concrete to poll for; prefer a
/// [`crate::wait::wait_until`] on the expected state otherwise.
pub async fn tap_and_settle<D: SondarDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    settle: Duration,
) -> SondarResult<()> {
    locator.click(driver).await?;
    tokio::time::sleep(settle).await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, MockDriver, MockElement, Point};
    use crate::locator::{Strategy, TargetDescriptor};
    use proptest::prelude::*;

    fn fast() -> ConvergenceOptions {
        ConvergenceOptions::new().with_settle_delay(Duration::from_millis(1))
    }

    mod geometry_tests {
        use super::*;

        #[test]
        fn test_down_drags_from_80_to_20_percent() {
            let path = ScrollDirection::Down.path(Viewport::new(1000, 2000), &SwipeProfile::default());
            assert_eq!(path.start, Point::new(500, 1600));
            assert_eq!(path.end, Point::new(500, 400));
        }

        #[test]
        fn test_up_mirrors_down() {
            let path = ScrollDirection::Up.path(Viewport::new(1000, 2000), &SwipeProfile::default());
            assert_eq!(path.start, Point::new(500, 400));
            assert_eq!(path.end, Point::new(500, 1600));
        }

        #[test]
        fn test_horizontal_paths() {
            let viewport = Viewport::new(1000, 2000);
            let right = ScrollDirection::Right.path(viewport, &SwipeProfile::default());
            assert_eq!(right.start, Point::new(800, 1000));
            assert_eq!(right.end, Point::new(200, 1000));
            let left = ScrollDirection::Left.path(viewport, &SwipeProfile::default());
            assert_eq!(left.start, Point::new(200, 1000));
        }
    }

    mod diff_state_tests {
        use super::*;

        #[test]
        fn test_fresh_state_is_not_converged() {
            let state = SnapshotDiffState::new(Some("tree".into()), 20);
            assert!(!state.is_converged());
            assert!(state.should_continue());
        }

        #[test]
        fn test_equal_captures_converge() {
            let mut state = SnapshotDiffState::new(Some("tree".into()), 20);
            state.advance(Some("tree".into()));
            assert!(state.is_converged());
            assert_eq!(state.attempts(), 1);
        }

        #[test]
        fn test_missing_capture_never_converges() {
            let mut state = SnapshotDiffState::new(None, 20);
            state.advance(None);
            assert!(!state.is_converged());
        }

        #[test]
        fn test_zero_bound_is_immediately_exhausted() {
            let state = SnapshotDiffState::new(Some("tree".into()), 0);
            assert!(state.is_exhausted());
            assert!(!state.should_continue());
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_static_screen_costs_exactly_one_gesture() {
            let driver = MockDriver::new().with_snapshots(["<list/>"]);
            let report = scroll_until_stable(&driver, ScrollDirection::Down, &fast())
                .await
                .unwrap();
            assert!(report.converged());
            assert_eq!(report.attempts, 1);
            assert_eq!(driver.gesture_count(), 1);
        }

        #[tokio::test]
        async fn test_stops_exactly_at_convergence() {
            let driver = MockDriver::new().with_snapshots(["a", "b", "c", "d", "d"]);
            let report = scroll_until_stable(&driver, ScrollDirection::Down, &fast())
                .await
                .unwrap();
            assert!(report.converged());
            assert_eq!(report.attempts, 4);
            assert_eq!(driver.gesture_count(), 4);
        }

        #[tokio::test]
        async fn test_ever_changing_content_hits_bound() {
            let snapshots: Vec<String> = (0..100).map(|i| format!("row-{i}")).collect();
            let driver = MockDriver::new().with_snapshots(snapshots);
            let options = fast().with_max_attempts(5);
            let report = scroll_until_stable(&driver, ScrollDirection::Up, &options)
                .await
                .unwrap();
            assert_eq!(report.outcome, ConvergenceOutcome::Exhausted);
            assert_eq!(driver.gesture_count(), 5);
        }

        #[tokio::test]
        async fn test_failed_gestures_are_absorbed() {
            let driver = MockDriver::new()
                .with_snapshots(["a", "b", "b"])
                .with_failing_gestures(1);
            let report = scroll_until_stable(&driver, ScrollDirection::Down, &fast())
                .await
                .unwrap();
            assert!(report.converged());
            assert_eq!(report.failed_gestures, 1);
            assert_eq!(report.attempts, 2);
        }

        #[tokio::test]
        async fn test_lost_session_propagates() {
            let driver = MockDriver::new().with_snapshots(["a"]);
            driver.lose_session();
            let err = scroll_until_stable(&driver, ScrollDirection::Down, &fast())
                .await
                .unwrap_err();
            assert!(err.is_fatal());
        }

        #[tokio::test]
        async fn test_custom_gesture_uses_viewport() {
            let driver = MockDriver::new()
                .with_viewport(Viewport::new(400, 800))
                .with_snapshots(["same"]);
            let gesture = Gesture::custom(|v| {
                PointerPath::new(
                    Point::new(v.width as i32 - 1, 0),
                    Point::new(0, v.height as i32 - 1),
                )
            });
            run_until_stable(&driver, &gesture, &fast()).await.unwrap();
            let gestures: Vec<_> = driver
                .history()
                .into_iter()
                .filter_map(|c| match c {
                    DriverCall::Gesture(p) => Some(p),
                    _ => None,
                })
                .collect();
            assert_eq!(gestures[0].start, Point::new(399, 0));
            assert_eq!(gestures[0].end, Point::new(0, 799));
        }
    }

    mod scroll_into_view_tests {
        use super::*;

        fn webview3() -> Locator {
            Locator::new(TargetDescriptor::of(Strategy::text_contains("WebView3")))
        }

        #[tokio::test]
        async fn test_already_visible_needs_no_gesture() {
            let driver = MockDriver::new().with_element(MockElement::new(
                "android=new UiSelector().textContains(\"WebView3\")",
            ));
            scroll_into_view(&driver, &webview3(), ScrollDirection::Down, &fast())
                .await
                .unwrap();
            assert_eq!(driver.gesture_count(), 0);
        }

        #[tokio::test]
        async fn test_revealed_after_gestures() {
            let driver = MockDriver::new()
                .with_snapshots(["page-0", "page-1", "page-2", "page-3"])
                .with_element(MockElement::new("~Animation"))
                .with_element(
                    MockElement::new("android=new UiSelector().textContains(\"WebView3\")")
                        .visible_after_gestures(3),
                );
            let handle = scroll_into_view(&driver, &webview3(), ScrollDirection::Down, &fast())
                .await
                .unwrap();
            assert!(handle.selector.contains("WebView3"));
            assert_eq!(driver.gesture_count(), 3);
        }

        #[tokio::test]
        async fn test_converged_without_target_fails() {
            let driver = MockDriver::new().with_snapshots(["end-of-list"]);
            let err = scroll_into_view(&driver, &webview3(), ScrollDirection::Down, &fast())
                .await
                .unwrap_err();
            assert!(matches!(err, SondarError::ElementNotFound { .. }));
            assert_eq!(driver.gesture_count(), 1);
        }
    }

    mod tap_tests {
        use super::*;

        #[tokio::test]
        async fn test_tap_and_settle_clicks_once_and_waits() {
            let driver = MockDriver::new().with_element(MockElement::new("~Show Buttons"));
            let locator = Locator::new(TargetDescriptor::of(Strategy::accessibility_id(
                "Show Buttons",
            )));
            let start = tokio::time::Instant::now();
            tap_and_settle(&driver, &locator, Duration::from_millis(20))
                .await
                .unwrap();
            assert!(start.elapsed() >= Duration::from_millis(20));
            assert_eq!(driver.clicks_on("~Show Buttons"), 1);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_gestures_never_exceed_bound(
            snapshots in prop::collection::vec("[ab]{1,2}", 1..30),
            max_attempts in 0_u32..12,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let driver = MockDriver::new().with_snapshots(snapshots);
            let options = ConvergenceOptions::new()
                .with_max_attempts(max_attempts)
                .with_settle_delay(Duration::ZERO);
            let report = runtime
                .block_on(scroll_until_stable(&driver, ScrollDirection::Down, &options))
                .unwrap();
            prop_assert!(report.attempts <= max_attempts);
            prop_assert_eq!(driver.gesture_count() as u32, report.attempts);
            if report.outcome == ConvergenceOutcome::Exhausted {
                prop_assert_eq!(report.attempts, max_attempts);
            }
        }
    }
}
