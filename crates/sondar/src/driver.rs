//! SondarDriver - Abstract Instrumentation Facade
//!
//! Everything Sondar does against a device goes through this trait. The
//! facade is deliberately coarse: single-selector lookup, element queries,
//! a serialized view-tree snapshot and raw pointer gestures.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  SondarDriver (Abstract Trait)                                │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐   │
//! │  │  Instrumentation    │        │  MockDriver             │   │
//! │  │  client (external)  │        │  (scripted screens)     │   │
//! │  └─────────────────────┘        └─────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handles are only valid until the next UI transition. Nothing in this
//! crate stores one beyond the call that resolved it.

use crate::result::{SondarError, SondarResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// A point on the device screen in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Device viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a new viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Point at the given fractions of width and height
    #[must_use]
    pub fn at_ratio(&self, x_ratio: f64, y_ratio: f64) -> Point {
        Point::new(
            (f64::from(self.width) * x_ratio).round() as i32,
            (f64::from(self.height) * y_ratio).round() as i32,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        // Pixel 4 class emulator
        Self::new(1080, 2280)
    }
}

/// A single-finger press, hold, move, release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPath {
    /// Press location
    pub start: Point,
    /// Release location
    pub end: Point,
    /// How long the finger is held before moving
    pub hold: Duration,
}

impl PointerPath {
    /// Create a drag from `start` to `end`
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            hold: Duration::ZERO,
        }
    }

    /// Set the hold duration before moving
    #[must_use]
    pub const fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

/// Element handle returned by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element id
    pub id: String,
    /// Selector that produced this handle
    pub selector: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selector: selector.into(),
        }
    }
}

/// Abstract driver trait for device automation
///
/// Selector strings are opaque here; the implementation decides what
/// `~login_button` or `android=new UiSelector()...` means.
///
/// Implementations signal a dead session with [`SondarError::SessionLost`].
/// Any other error is treated by the retry loops as a failed attempt.
#[async_trait]
pub trait SondarDriver: Send + Sync {
    /// Look up one element by selector
    async fn resolve(&self, selector: &str) -> SondarResult<Option<ElementHandle>>;

    /// Whether the element is still attached to the view tree
    async fn exists(&self, element: &ElementHandle) -> SondarResult<bool>;

    /// Whether the element is displayed on screen
    async fn is_visible(&self, element: &ElementHandle) -> SondarResult<bool>;

    /// Whether the element accepts input
    async fn is_enabled(&self, element: &ElementHandle) -> SondarResult<bool>;

    /// Tap the element
    async fn click(&self, element: &ElementHandle) -> SondarResult<()>;

    /// Clear an input element
    async fn clear_text(&self, element: &ElementHandle) -> SondarResult<()>;

    /// Type into an input element
    async fn set_text(&self, element: &ElementHandle, value: &str) -> SondarResult<()>;

    /// Read the element's visible text
    async fn get_text(&self, element: &ElementHandle) -> SondarResult<String>;

    /// Serialized view tree of the current screen
    async fn snapshot(&self) -> SondarResult<String>;

    /// Perform a pointer gesture
    async fn perform_gesture(&self, path: &PointerPath) -> SondarResult<()>;

    /// Current viewport size
    async fn viewport_size(&self) -> SondarResult<Viewport>;

    /// Dismiss the soft keyboard
    async fn hide_keyboard(&self) -> SondarResult<()>;

    /// Press the system back button
    async fn back(&self) -> SondarResult<()>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

fn default_true() -> bool {
    true
}

/// One element on a scripted screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockElement {
    /// Selector the element answers to
    pub selector: String,
    /// Whether a resolved handle reports `exists`
    #[serde(default = "default_true")]
    pub exists: bool,
    /// Whether the element is displayed
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Whether the element is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Visible text
    #[serde(default)]
    pub text: String,
    /// Element disappears after being clicked
    #[serde(default)]
    pub hides_on_click: bool,
    /// Selectors of elements that become visible when this one is clicked
    #[serde(default)]
    pub reveals_on_click: Vec<String>,
    /// Element scrolls into view after this many gestures
    #[serde(default)]
    pub visible_after_gestures: Option<u32>,
    /// Element becomes visible after this many visibility checks
    #[serde(default)]
    pub visible_after_polls: Option<u32>,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            exists: true,
            visible: true,
            enabled: true,
            text: String::new(),
            hides_on_click: false,
            reveals_on_click: Vec::new(),
            visible_after_gestures: None,
            visible_after_polls: None,
        }
    }

    /// Set the element's text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Resolve to a handle whose `exists` is false
    #[must_use]
    pub const fn detached(mut self) -> Self {
        self.exists = false;
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Hide after a click
    #[must_use]
    pub const fn hides_on_click(mut self) -> Self {
        self.hides_on_click = true;
        self
    }

    /// Reveal another element after a click
    #[must_use]
    pub fn reveals_on_click(mut self, selector: impl Into<String>) -> Self {
        self.reveals_on_click.push(selector.into());
        self
    }

    /// Hidden until `gestures` gestures have been performed
    #[must_use]
    pub const fn visible_after_gestures(mut self, gestures: u32) -> Self {
        self.visible = false;
        self.visible_after_gestures = Some(gestures);
        self
    }

    /// Hidden until checked `polls` times
    #[must_use]
    pub const fn visible_after_polls(mut self, polls: u32) -> Self {
        self.visible = false;
        self.visible_after_polls = Some(polls);
        self
    }
}

/// Scripted screen definition, loadable from YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockScreen {
    /// Reported viewport
    pub viewport: Viewport,
    /// Elements by selector
    pub elements: Vec<MockElement>,
    /// Selectors whose lookup raises a driver error
    pub failing_selectors: Vec<String>,
    /// Snapshot sequence; the last entry repeats. Empty means derive the
    /// snapshot from element state.
    pub snapshots: Vec<String>,
    /// Number of leading gestures that fail
    pub failing_gestures: u32,
}

/// A recorded driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `resolve(selector)`
    Resolve(String),
    /// `exists` on the element with this selector
    Exists(String),
    /// `is_visible` on the element with this selector
    IsVisible(String),
    /// `is_enabled` on the element with this selector
    IsEnabled(String),
    /// `click` on the element with this selector
    Click(String),
    /// `clear_text` on the element with this selector
    ClearText(String),
    /// `set_text` on the element with this selector
    SetText(String, String),
    /// `get_text` on the element with this selector
    GetText(String),
    /// `snapshot`
    Snapshot,
    /// `perform_gesture`
    Gesture(PointerPath),
    /// `viewport_size`
    ViewportSize,
    /// `hide_keyboard`
    HideKeyboard,
    /// `back`
    Back,
}

#[derive(Debug, Default)]
struct MockState {
    screen: MockScreen,
    snapshot_cursor: usize,
    gestures: u32,
    polls: HashMap<String, u32>,
    session_lost: bool,
    calls: Vec<DriverCall>,
}

impl MockState {
    fn element_mut(&mut self, selector: &str) -> SondarResult<&mut MockElement> {
        self.screen
            .elements
            .iter_mut()
            .find(|e| e.selector == selector)
            .ok_or_else(|| SondarError::driver(format!("stale element: {selector}")))
    }

    fn derived_snapshot(&self) -> String {
        let mut tree = String::from("<hierarchy>");
        for element in self.screen.elements.iter().filter(|e| e.exists && e.visible) {
            tree.push_str(&format!(
                "<node selector={:?} text={:?} enabled=\"{}\"/>",
                element.selector, element.text, element.enabled
            ));
        }
        tree.push_str("</hierarchy>");
        tree
    }
}

/// Mock driver for unit testing and scripted scenarios
///
/// Behaviour is table-driven by a [`MockScreen`]; every call is recorded so
/// tests can assert on exactly what the resilience layer asked for.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create an empty mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock driver for a scripted screen
    #[must_use]
    pub fn from_screen(screen: MockScreen) -> Self {
        Self {
            state: Mutex::new(MockState {
                screen,
                ..MockState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an element
    #[must_use]
    pub fn with_element(self, element: MockElement) -> Self {
        self.state().screen.elements.push(element);
        self
    }

    /// Make lookups of `selector` raise a driver error
    #[must_use]
    pub fn with_failing_selector(self, selector: impl Into<String>) -> Self {
        self.state().screen.failing_selectors.push(selector.into());
        self
    }

    /// Script the snapshot sequence
    #[must_use]
    pub fn with_snapshots<I, S>(self, snapshots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().screen.snapshots = snapshots.into_iter().map(Into::into).collect();
        self
    }

    /// Fail the first `count` gestures
    #[must_use]
    pub fn with_failing_gestures(self, count: u32) -> Self {
        self.state().screen.failing_gestures = count;
        self
    }

    /// Set the reported viewport
    #[must_use]
    pub fn with_viewport(self, viewport: Viewport) -> Self {
        self.state().screen.viewport = viewport;
        self
    }

    /// Drop the session: every later call fails with `SessionLost`
    pub fn lose_session(&self) {
        self.state().session_lost = true;
    }

    /// Recorded calls, in order
    #[must_use]
    pub fn history(&self) -> Vec<DriverCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    #[must_use]
    pub fn count_calls(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Selectors passed to `resolve`, in order
    #[must_use]
    pub fn resolved_selectors(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                DriverCall::Resolve(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of clicks on the element with `selector`
    #[must_use]
    pub fn clicks_on(&self, selector: &str) -> usize {
        self.count_calls(|c| matches!(c, DriverCall::Click(s) if s == selector))
    }

    /// Number of gestures performed, including failed ones
    #[must_use]
    pub fn gesture_count(&self) -> usize {
        self.count_calls(|c| matches!(c, DriverCall::Gesture(_)))
    }

    /// Text currently held by the element with `selector`
    #[must_use]
    pub fn text_of(&self, selector: &str) -> Option<String> {
        self.state()
            .screen
            .elements
            .iter()
            .find(|e| e.selector == selector)
            .map(|e| e.text.clone())
    }

    fn record(&self, call: DriverCall) -> SondarResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.session_lost {
            return Err(SondarError::session_lost("mock session closed"));
        }
        Ok(state)
    }
}

#[async_trait]
impl SondarDriver for MockDriver {
    async fn resolve(&self, selector: &str) -> SondarResult<Option<ElementHandle>> {
        let state = self.record(DriverCall::Resolve(selector.to_string()))?;
        if state.screen.failing_selectors.iter().any(|s| s == selector) {
            return Err(SondarError::driver(format!(
                "selector rejected by driver: {selector}"
            )));
        }
        Ok(state
            .screen
            .elements
            .iter()
            .find(|e| e.selector == selector)
            .map(|e| ElementHandle::new(format!("element-{}", Uuid::new_v4()), &e.selector)))
    }

    async fn exists(&self, element: &ElementHandle) -> SondarResult<bool> {
        let state = self.record(DriverCall::Exists(element.selector.clone()))?;
        Ok(state
            .screen
            .elements
            .iter()
            .any(|e| e.selector == element.selector && e.exists))
    }

    async fn is_visible(&self, element: &ElementHandle) -> SondarResult<bool> {
        let mut state = self.record(DriverCall::IsVisible(element.selector.clone()))?;
        let polls = {
            let count = state.polls.entry(element.selector.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let gestures = state.gestures;
        let mock = state.element_mut(&element.selector)?;
        if mock.visible_after_polls.is_some_and(|after| polls > after) {
            mock.visible = true;
        }
        if mock.visible_after_gestures.is_some_and(|after| gestures >= after) {
            mock.visible = true;
        }
        Ok(mock.exists && mock.visible)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> SondarResult<bool> {
        let mut state = self.record(DriverCall::IsEnabled(element.selector.clone()))?;
        let mock = state.element_mut(&element.selector)?;
        Ok(mock.exists && mock.enabled)
    }

    async fn click(&self, element: &ElementHandle) -> SondarResult<()> {
        let mut state = self.record(DriverCall::Click(element.selector.clone()))?;
        let mock = state.element_mut(&element.selector)?;
        if mock.hides_on_click {
            mock.visible = false;
        }
        let reveals = mock.reveals_on_click.clone();
        for selector in reveals {
            if let Ok(target) = state.element_mut(&selector) {
                target.visible = true;
            }
        }
        Ok(())
    }

    async fn clear_text(&self, element: &ElementHandle) -> SondarResult<()> {
        let mut state = self.record(DriverCall::ClearText(element.selector.clone()))?;
        state.element_mut(&element.selector)?.text.clear();
        Ok(())
    }

    async fn set_text(&self, element: &ElementHandle, value: &str) -> SondarResult<()> {
        let mut state = self.record(DriverCall::SetText(
            element.selector.clone(),
            value.to_string(),
        ))?;
        state.element_mut(&element.selector)?.text.push_str(value);
        Ok(())
    }

    async fn get_text(&self, element: &ElementHandle) -> SondarResult<String> {
        let mut state = self.record(DriverCall::GetText(element.selector.clone()))?;
        Ok(state.element_mut(&element.selector)?.text.clone())
    }

    async fn snapshot(&self) -> SondarResult<String> {
        let mut state = self.record(DriverCall::Snapshot)?;
        if state.screen.snapshots.is_empty() {
            return Ok(state.derived_snapshot());
        }
        let last = state.screen.snapshots.len() - 1;
        let index = state.snapshot_cursor.min(last);
        state.snapshot_cursor += 1;
        Ok(state.screen.snapshots[index].clone())
    }

    async fn perform_gesture(&self, path: &PointerPath) -> SondarResult<()> {
        let mut state = self.record(DriverCall::Gesture(*path))?;
        if state.screen.failing_gestures > 0 {
            state.screen.failing_gestures -= 1;
            return Err(SondarError::driver("gesture was not dispatched"));
        }
        state.gestures += 1;
        let gestures = state.gestures;
        for element in &mut state.screen.elements {
            if element.visible_after_gestures.is_some_and(|after| gestures >= after) {
                element.visible = true;
            }
        }
        Ok(())
    }

    async fn viewport_size(&self) -> SondarResult<Viewport> {
        let state = self.record(DriverCall::ViewportSize)?;
        Ok(state.screen.viewport)
    }

    async fn hide_keyboard(&self) -> SondarResult<()> {
        let _state = self.record(DriverCall::HideKeyboard)?;
        Ok(())
    }

    async fn back(&self) -> SondarResult<()> {
        let _state = self.record(DriverCall::Back)?;
        Ok(())
    }
}
