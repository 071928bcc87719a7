//! Page Object Model Support
//!
//! A page object bundles the [`Locator`]s of one screen with the flows that
//! use them. Pages borrow a driver through [`Actions`], which applies the
//! shared [`ResilienceConfig`] to every wait, lookup and gesture.
//!
//! ```ignore
//! let driver = MockDriver::from_screen(screen);
//! let actions = Actions::new(&driver, ResilienceConfig::default());
//! let login = LoginPage::new(actions.clone());
//! login.login("qa@example.com", "hunter2").await?;
//! HomePage::new(actions).wait_for_home_page(None).await?;
//! ```

use crate::config::ResilienceConfig;
use crate::driver::{ElementHandle, PointerPath, SondarDriver};
use crate::locator::{Locator, TargetDescriptor};
use crate::result::SondarResult;
use crate::scroll::{self, ConvergenceReport, ScrollDirection};
use crate::wait;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Trait for page objects representing one screen of the app under test.
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logging
    fn page_name(&self) -> &'static str;

    /// Element whose visibility means the page is showing
    fn anchor(&self) -> &Locator;

    /// Driver access for default methods
    fn actions(&self) -> &Actions<'_>;

    /// Whether the anchor is currently displayed
    async fn is_displayed(&self) -> SondarResult<bool> {
        self.actions().is_displayed(self.anchor()).await
    }

    /// Wait for the anchor with a custom budget
    async fn wait_until_loaded(&self, timeout: Duration) -> SondarResult<ElementHandle> {
        debug!(page = self.page_name(), timeout_ms = timeout.as_millis() as u64, "waiting for page");
        self.anchor()
            .clone()
            .with_timeout(timeout)
            .wait_for_visible(self.actions().driver())
            .await
    }
}

/// Driver plus configuration, shared by all pages of a session
#[derive(Clone)]
pub struct Actions<'d> {
    driver: &'d dyn SondarDriver,
    config: ResilienceConfig,
}

impl fmt::Debug for Actions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'d> Actions<'d> {
    /// Bind a driver and configuration
    #[must_use]
    pub fn new(driver: &'d dyn SondarDriver, config: ResilienceConfig) -> Self {
        Self { driver, config }
    }

    /// The bound driver
    #[must_use]
    pub fn driver(&self) -> &'d dyn SondarDriver {
        self.driver
    }

    /// The active configuration
    #[must_use]
    pub const fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Build a locator with the configured element wait options
    #[must_use]
    pub fn locator(&self, descriptor: TargetDescriptor) -> Locator {
        Locator::new(descriptor).with_options(self.config.locator_options())
    }

    /// Wait for an element and tap it
    pub async fn click(&self, locator: &Locator) -> SondarResult<()> {
        locator.click(self.driver).await
    }

    /// Wait for an input, clear it and type `value`
    pub async fn fill(&self, locator: &Locator, value: &str) -> SondarResult<()> {
        locator.fill(self.driver, value).await
    }

    /// Wait for an element and read its text
    pub async fn read_text(&self, locator: &Locator) -> SondarResult<String> {
        locator.text(self.driver).await
    }

    /// Whether an element is displayed right now
    pub async fn is_displayed(&self, locator: &Locator) -> SondarResult<bool> {
        locator.is_visible(self.driver).await
    }

    /// Whether an element is attached to the view tree, shown or not
    pub async fn exists(&self, locator: &Locator) -> SondarResult<bool> {
        locator.exists(self.driver).await
    }

    /// Whether the serialized view tree mentions `text`; a failed capture reads as `false`
    pub async fn page_source_contains(&self, text: &str) -> SondarResult<bool> {
        match self.driver.snapshot().await {
            Ok(tree) => Ok(tree.contains(text)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!(error = %err, "page source unavailable");
                Ok(false)
            }
        }
    }

    /// Dismiss the soft keyboard if it is showing
    pub async fn hide_keyboard(&self) -> SondarResult<()> {
        match self.driver.hide_keyboard().await {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!(error = %err, "keyboard not visible or already hidden");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Press, hold, drag and release with the configured hold time
    pub async fn swipe(&self, path: PointerPath) -> SondarResult<()> {
        let path = path.with_hold(self.config.swipe_profile().hold);
        self.driver.perform_gesture(&path).await
    }

    async fn swipe_toward(&self, direction: ScrollDirection) -> SondarResult<()> {
        let viewport = self.driver.viewport_size().await?;
        let path = direction.path(viewport, &self.config.swipe_profile());
        self.driver.perform_gesture(&path).await
    }

    /// Finger moves up the screen, revealing content below
    pub async fn swipe_up(&self) -> SondarResult<()> {
        self.swipe_toward(ScrollDirection::Down).await
    }

    /// Finger moves down the screen, revealing content above
    pub async fn swipe_down(&self) -> SondarResult<()> {
        self.swipe_toward(ScrollDirection::Up).await
    }

    /// Fixed sleep; prefer a locator wait wherever there is state to poll
    pub async fn pause(&self, duration: Duration) {
        wait::pause(duration).await;
    }

    /// Press the system back button
    pub async fn go_back(&self) -> SondarResult<()> {
        self.driver.back().await
    }

    /// Scroll until the content stops changing
    pub async fn scroll_until_stable(
        &self,
        direction: ScrollDirection,
    ) -> SondarResult<ConvergenceReport> {
        scroll::scroll_until_stable(self.driver, direction, &self.config.convergence()).await
    }

    /// Scroll until `locator` is visible
    pub async fn scroll_into_view(
        &self,
        locator: &Locator,
        direction: ScrollDirection,
    ) -> SondarResult<ElementHandle> {
        scroll::scroll_into_view(self.driver, locator, direction, &self.config.convergence()).await
    }

    /// Tap a transient control and wait the configured settle delay
    pub async fn tap_and_settle(&self, locator: &Locator) -> SondarResult<()> {
        scroll::tap_and_settle(self.driver, locator, self.config.tap_settle()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, MockDriver, MockElement, Point, Viewport};
    use crate::locator::Strategy;

    fn quick_config() -> ResilienceConfig {
        ResilienceConfig::new()
            .with_element_timeout_ms(200)
            .with_poll_interval_ms(50)
            .with_settle_delay_ms(1)
            .with_tap_settle_ms(1)
    }

    struct SettingsPage<'d> {
        actions: Actions<'d>,
        title: Locator,
    }

    impl PageObject for SettingsPage<'_> {
        fn page_name(&self) -> &'static str {
            "settings"
        }

        fn anchor(&self) -> &Locator {
            &self.title
        }

        fn actions(&self) -> &Actions<'_> {
            &self.actions
        }
    }

    fn settings(driver: &MockDriver) -> SettingsPage<'_> {
        let actions = Actions::new(driver, quick_config());
        let title = actions.locator(TargetDescriptor::of(Strategy::accessibility_id("settings")));
        SettingsPage { actions, title }
    }

    mod page_object_tests {
        use super::*;

        #[tokio::test]
        async fn test_is_displayed_uses_anchor() {
            let driver = MockDriver::new().with_element(MockElement::new("~settings"));
            assert!(settings(&driver).is_displayed().await.unwrap());
        }

        #[tokio::test]
        async fn test_missing_anchor_is_not_displayed() {
            let driver = MockDriver::new();
            assert!(!settings(&driver).is_displayed().await.unwrap());
        }

        #[tokio::test]
        async fn test_wait_until_loaded_honours_timeout() {
            let driver = MockDriver::new().with_element(MockElement::new("~settings").hidden());
            let start = tokio::time::Instant::now();
            let err = settings(&driver)
                .wait_until_loaded(Duration::from_millis(100))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("to be visible"));
            assert!(start.elapsed() < Duration::from_millis(200));
        }
    }

    mod actions_tests {
        use super::*;

        #[tokio::test]
        async fn test_locator_uses_config_options() {
            let driver = MockDriver::new();
            let actions = Actions::new(&driver, quick_config());
            let locator = actions.locator(TargetDescriptor::of(Strategy::text("Views")));
            assert_eq!(locator.options().timeout, Duration::from_millis(200));
            assert_eq!(locator.options().poll_interval, Duration::from_millis(50));
        }

        #[tokio::test]
        async fn test_swipe_up_drags_finger_upward() {
            let driver = MockDriver::new().with_viewport(Viewport::new(1000, 2000));
            Actions::new(&driver, quick_config()).swipe_up().await.unwrap();
            let history = driver.history();
            let path = history
                .iter()
                .find_map(|c| match c {
                    DriverCall::Gesture(p) => Some(*p),
                    _ => None,
                })
                .unwrap();
            assert_eq!(path.start, Point::new(500, 1600));
            assert_eq!(path.end, Point::new(500, 400));
            assert_eq!(path.hold, Duration::from_millis(1000));
        }

        #[tokio::test]
        async fn test_swipe_applies_hold() {
            let driver = MockDriver::new();
            Actions::new(&driver, quick_config())
                .swipe(PointerPath::new(Point::new(1, 2), Point::new(3, 4)))
                .await
                .unwrap();
            assert!(driver.history().iter().any(
                |c| matches!(c, DriverCall::Gesture(p) if p.hold == Duration::from_millis(1000))
            ));
        }

        #[tokio::test]
        async fn test_hide_keyboard_swallows_transient_errors_only() {
            let driver = MockDriver::new();
            let actions = Actions::new(&driver, quick_config());
            actions.hide_keyboard().await.unwrap();
            driver.lose_session();
            assert!(actions.hide_keyboard().await.unwrap_err().is_fatal());
        }

        #[tokio::test]
        async fn test_page_source_contains() {
            let driver = MockDriver::new().with_snapshots(["<node text=\"Custom View\"/>"]);
            let actions = Actions::new(&driver, quick_config());
            assert!(actions.page_source_contains("Custom View").await.unwrap());
            assert!(!actions.page_source_contains("TalkBack").await.unwrap());
            driver.lose_session();
            assert!(actions.page_source_contains("Custom View").await.is_err());
        }

        #[tokio::test]
        async fn test_exists_sees_hidden_elements() {
            let driver = MockDriver::new().with_element(MockElement::new("~settings").hidden());
            let page = settings(&driver);
            assert!(page.actions.exists(&page.title).await.unwrap());
            assert!(!page.is_displayed().await.unwrap());
        }

        #[tokio::test]
        async fn test_go_back() {
            let driver = MockDriver::new();
            Actions::new(&driver, quick_config()).go_back().await.unwrap();
            assert_eq!(driver.history(), vec![DriverCall::Back]);
        }
    }
}
