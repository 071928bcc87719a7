use crate::locator::{Locator, Strategy, TargetDescriptor};
use crate::page_object::Actions;
use crate::result::SondarResult;
use tracing::info;

/// "Animation" > "Hide-Show Animations" demo with four numbered buttons
#[derive(Debug, Clone)]
pub struct AnimationsPage<'d> {
    actions: Actions<'d>,
    animation_menu: Locator,
    hide_show_menu: Locator,
    show_buttons: Locator,
}

impl<'d> AnimationsPage<'d> {
    /// Build the page's locators
    #[must_use]
    pub fn new(actions: Actions<'d>) -> Self {
        let animation_menu = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("Animation"))
                .or(Strategy::text("Animation"))
                .named("animation menu"),
        );
        let hide_show_menu = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("Hide-Show Animations"))
                .or(Strategy::text("Hide-Show Animations"))
                .named("hide-show animations menu"),
        );
        let show_buttons =
            actions.locator(TargetDescriptor::of(Strategy::text("Show Buttons")).named("show buttons"));
        Self {
            actions,
            animation_menu,
            hide_show_menu,
            show_buttons,
        }
    }

    /// Numbered buttons are labelled with their index only
    fn button(&self, index: u8) -> Locator {
        self.actions.locator(
            TargetDescriptor::of(Strategy::text(index.to_string())).named(format!("button {index}")),
        )
    }

    /// Open the Animation menu
    pub async fn tap_animation(&self) -> SondarResult<()> {
        self.actions.click(&self.animation_menu).await?;
        info!("tapped animation menu");
        Ok(())
    }

    /// Open the Hide-Show Animations demo
    pub async fn tap_hide_show_animations(&self) -> SondarResult<()> {
        self.actions.click(&self.hide_show_menu).await?;
        info!("tapped hide-show animations menu");
        Ok(())
    }

    /// Tap button `index` and let its hide animation run
    pub async fn tap_button(&self, index: u8) -> SondarResult<()> {
        self.actions.tap_and_settle(&self.button(index)).await?;
        info!(index, "tapped button");
        Ok(())
    }

    /// Tap "Show Buttons" and let the buttons reappear
    pub async fn tap_show_buttons(&self) -> SondarResult<()> {
        self.actions.tap_and_settle(&self.show_buttons).await?;
        info!("tapped show buttons");
        Ok(())
    }

    /// Whether button `index` is displayed
    pub async fn is_button_displayed(&self, index: u8) -> SondarResult<bool> {
        self.actions.is_displayed(&self.button(index)).await
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
            .with_tap_settle_ms(1)
    }

    #[tokio::test]
    async fn test_animation_menu_falls_back_to_text() {
        let driver = MockDriver::new()
            .with_element(MockElement::new("android=new UiSelector().text(\"Animation\")"));
        let page = AnimationsPage::new(Actions::new(&driver, config()));
        page.tap_animation().await.unwrap();
        assert_eq!(driver.clicks_on("android=new UiSelector().text(\"Animation\")"), 1);
    }

    #[tokio::test]
    async fn test_button_hides_then_shows() {
        let driver = MockDriver::new()
            .with_element(MockElement::new("android=new UiSelector().text(\"2\")").hides_on_click())
            .with_element(
                MockElement::new("android=new UiSelector().text(\"Show Buttons\")")
                    .reveals_on_click("android=new UiSelector().text(\"2\")"),
            );
        let page = AnimationsPage::new(Actions::new(&driver, config()));

        assert!(page.is_button_displayed(2).await.unwrap());
        page.tap_button(2).await.unwrap();
        assert!(!page.is_button_displayed(2).await.unwrap());
        page.tap_show_buttons().await.unwrap();
        assert!(page.is_button_displayed(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_button_not_displayed() {
        let driver = MockDriver::new();
        let page = AnimationsPage::new(Actions::new(&driver, config()));
        assert!(!page.is_button_displayed(3).await.unwrap());
    }
}
