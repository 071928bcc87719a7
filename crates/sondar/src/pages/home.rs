use crate::driver::ElementHandle;
use crate::locator::{Locator, Strategy, TargetDescriptor};
use crate::page_object::{Actions, PageObject};
use crate::result::SondarResult;
use std::time::Duration;
use tracing::{info, warn};

/// Default budget for the post-login transition (15 seconds)
pub const HOME_PAGE_TIMEOUT_MS: u64 = 15_000;

/// Home screen shown after a successful login
#[derive(Debug, Clone)]
pub struct HomePage<'d> {
    actions: Actions<'d>,
    home_title: Locator,
    welcome_message: Locator,
    menu_button: Locator,
    logout_button: Locator,
}

impl<'d> HomePage<'d> {
    /// Build the page's locators
    #[must_use]
    pub fn new(actions: Actions<'d>) -> Self {
        let home_title = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("home_title"))
                .or(Strategy::resource_id("com.example.app:id/home_title"))
                .or(Strategy::text("Home"))
                .named("home title"),
        );
        let welcome_message = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("welcome_message"))
                .or(Strategy::resource_id("com.example.app:id/welcome_text"))
                .or(Strategy::text_contains("Welcome"))
                .named("welcome message"),
        );
        let menu_button = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("menu_button"))
                .or(Strategy::resource_id("com.example.app:id/menu_btn"))
                .or(Strategy::ui_automator("new UiSelector().description(\"Menu\")"))
                .named("menu button"),
        );
        let logout_button = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("logout_button"))
                .or(Strategy::resource_id("com.example.app:id/logout_btn"))
                .or(Strategy::text("Logout"))
                .named("logout button"),
        );
        Self {
            actions,
            home_title,
            welcome_message,
            menu_button,
            logout_button,
        }
    }

    /// Whether the title is showing
    pub async fn is_home_page_displayed(&self) -> SondarResult<bool> {
        self.actions.is_displayed(&self.home_title).await
    }

    /// Title text
    pub async fn title_text(&self) -> SondarResult<String> {
        self.actions.read_text(&self.home_title).await
    }

    /// Welcome banner text
    pub async fn welcome_text(&self) -> SondarResult<String> {
        self.actions.read_text(&self.welcome_message).await
    }

    /// Wait for the title; `None` uses [`HOME_PAGE_TIMEOUT_MS`]
    pub async fn wait_for_home_page(&self, timeout: Option<Duration>) -> SondarResult<ElementHandle> {
        info!("waiting for home page to load");
        let timeout = timeout.unwrap_or(Duration::from_millis(HOME_PAGE_TIMEOUT_MS));
        let handle = self.wait_until_loaded(timeout).await?;
        info!("home page loaded");
        Ok(handle)
    }

    /// Open the side menu
    pub async fn open_menu(&self) -> SondarResult<()> {
        self.actions.click(&self.menu_button).await?;
        info!("clicked menu button");
        Ok(())
    }

    /// Open the menu and tap logout
    pub async fn logout(&self) -> SondarResult<()> {
        info!("performing logout");
        self.open_menu().await?;
        self.actions.click(&self.logout_button).await?;
        info!("logout completed");
        Ok(())
    }

    /// Like [`Self::is_home_page_displayed`], logging the verdict
    pub async fn verify_user_logged_in(&self) -> SondarResult<bool> {
        let displayed = self.is_home_page_displayed().await?;
        if displayed {
            info!("user logged in, home page displayed");
        } else {
            warn!("user not logged in, home page not displayed");
        }
        Ok(displayed)
    }
}

impl PageObject for HomePage<'_> {
    fn page_name(&self) -> &'static str {
        "home"
    }

    fn anchor(&self) -> &Locator {
        &self.home_title
    }

    fn actions(&self) -> &Actions<'_> {
        &self.actions
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ResilienceConfig;
    use crate::driver::{MockDriver, MockElement};
    use crate::result::SondarError;

    fn config() -> ResilienceConfig {
        ResilienceConfig::new()
            .with_element_timeout_ms(150)
            .with_poll_interval_ms(50)
    }

    #[tokio::test]
    async fn test_wait_for_home_page_after_transition() {
        let driver = MockDriver::new().with_element(
            MockElement::new("id=com.example.app:id/home_title")
                .with_text("Home")
                .visible_after_polls(2),
        );
        let page = HomePage::new(Actions::new(&driver, config()));
        page.wait_for_home_page(Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert_eq!(page.title_text().await.unwrap(), "Home");
        assert!(page.verify_user_logged_in().await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_home_page_times_out() {
        let driver = MockDriver::new();
        let page = HomePage::new(Actions::new(&driver, config()));
        let err = page
            .wait_for_home_page(Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, SondarError::ConditionTimeout { .. }));
    }

    #[tokio::test]
    async fn test_logout_opens_menu_first() {
        let driver = MockDriver::new()
            .with_element(
                MockElement::new("android=new UiSelector().description(\"Menu\")")
                    .reveals_on_click("~logout_button"),
            )
            .with_element(MockElement::new("~logout_button").hidden());
        let page = HomePage::new(Actions::new(&driver, config()));
        page.logout().await.unwrap();
        assert_eq!(driver.clicks_on("~logout_button"), 1);
    }

    #[tokio::test]
    async fn test_welcome_text_by_partial_text() {
        let driver = MockDriver::new().with_element(
            MockElement::new("android=new UiSelector().textContains(\"Welcome\")")
                .with_text("Welcome back, QA"),
        );
        let page = HomePage::new(Actions::new(&driver, config()));
        assert_eq!(page.welcome_text().await.unwrap(), "Welcome back, QA");
    }
}
