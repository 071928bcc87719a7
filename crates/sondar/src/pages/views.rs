use crate::locator::{Locator, Strategy, TargetDescriptor};
use crate::page_object::Actions;
use crate::result::SondarResult;
use crate::scroll::{ConvergenceReport, ScrollDirection};
use std::time::Duration;
use tracing::info;

/// Pause after opening the Views list
const VIEWS_OPEN_PAUSE_MS: u64 = 1000;

/// The long "Views" list of the API demos app
#[derive(Debug, Clone)]
pub struct ViewsPage<'d> {
    actions: Actions<'d>,
    views_entry: Locator,
}

impl<'d> ViewsPage<'d> {
    /// Build the page's locators
    #[must_use]
    pub fn new(actions: Actions<'d>) -> Self {
        let views_entry =
            actions.locator(TargetDescriptor::of(Strategy::text("Views")).named("views entry"));
        Self {
            actions,
            views_entry,
        }
    }

    /// Open the Views list from the main menu
    pub async fn tap_views(&self) -> SondarResult<()> {
        self.actions.click(&self.views_entry).await?;
        self.actions
            .pause(Duration::from_millis(VIEWS_OPEN_PAUSE_MS))
            .await;
        Ok(())
    }

    /// Scroll down until the list stops moving
    pub async fn scroll_to_bottom(&self) -> SondarResult<ConvergenceReport> {
        let report = self.actions.scroll_until_stable(ScrollDirection::Down).await?;
        info!(attempts = report.attempts, converged = report.converged(), "scrolled to bottom");
        Ok(report)
    }

    /// Scroll up until the list stops moving
    pub async fn scroll_to_top(&self) -> SondarResult<ConvergenceReport> {
        let report = self.actions.scroll_until_stable(ScrollDirection::Up).await?;
        info!(attempts = report.attempts, converged = report.converged(), "scrolled to top");
        Ok(report)
    }

    /// Whether a row containing `text` is displayed
    pub async fn is_text_visible(&self, text: &str) -> SondarResult<bool> {
        let row = self
            .actions
            .locator(TargetDescriptor::of(Strategy::text_contains(text)));
        self.actions.is_displayed(&row).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ResilienceConfig;
    use crate::driver::{MockDriver, MockElement};

    fn config() -> ResilienceConfig {
        ResilienceConfig::new()
            .with_element_timeout_ms(150)
            .with_poll_interval_ms(50)
            .with_settle_delay_ms(1)
    }

    #[tokio::test]
    async fn test_scroll_to_bottom_stops_when_list_ends() {
        let driver = MockDriver::new().with_snapshots(["rows 1-10", "rows 8-18", "rows 15-24", "rows 15-24"]);
        let page = ViewsPage::new(Actions::new(&driver, config()));
        let report = page.scroll_to_bottom().await.unwrap();
        assert!(report.converged());
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn test_scroll_to_top_bounded() {
        let snapshots: Vec<String> = (0..50).map(|i| format!("frame {i}")).collect();
        let driver = MockDriver::new().with_snapshots(snapshots);
        let page = ViewsPage::new(Actions::new(&driver, config().with_max_scroll_attempts(4)));
        let report = page.scroll_to_top().await.unwrap();
        assert!(!report.converged());
        assert_eq!(driver.gesture_count(), 4);
    }

    #[tokio::test]
    async fn test_is_text_visible() {
        let driver = MockDriver::new().with_element(MockElement::new(
            "android=new UiSelector().textContains(\"WebView3\")",
        ));
        let page = ViewsPage::new(Actions::new(&driver, config()));
        assert!(page.is_text_visible("WebView3").await.unwrap());
        assert!(!page.is_text_visible("Animation").await.unwrap());
    }
}
