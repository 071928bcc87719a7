use crate::locator::{Locator, Strategy, TargetDescriptor};
use crate::page_object::Actions;
use crate::result::SondarResult;
use crate::wait::{wait_for_value, ConditionSpec};
use tracing::{info, warn};

/// Instructions shown on the Accessibility > Custom View screen
pub const TALKBACK_INSTRUCTIONS: &str = "1. Enable TalkBack (Settings -> Accessibility -> TalkBack). \n\n2. Enable Explore-by-Touch (Settings -> Accessibility -> Explore by Touch). \n\n3. Touch explore/poke the buttons.";

const TALKBACK_MARKER: &str = "Enable TalkBack";

/// Where the TalkBack instructions were found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TalkbackText {
    /// Read from a resolved element
    Element(String),
    /// Only the serialized view tree mentions them; no element text available
    PageSourceOnly,
}

impl TalkbackText {
    /// The element text, if one was read
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Element(text) => Some(text),
            Self::PageSourceOnly => None,
        }
    }
}

/// "Accessibility" > "Custom View" demo
#[derive(Debug, Clone)]
pub struct AccessibilityPage<'d> {
    actions: Actions<'d>,
    accessibility_menu: Locator,
    custom_view_menu: Locator,
    talkback_text: Locator,
}

impl<'d> AccessibilityPage<'d> {
    /// Build the page's locators
    #[must_use]
    pub fn new(actions: Actions<'d>) -> Self {
        let accessibility_menu = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("Accessibility"))
                .or(Strategy::text("Accessibility"))
                .named("accessibility menu"),
        );
        let custom_view_menu = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("Custom View"))
                .or(Strategy::text("Custom View"))
                .named("custom view menu"),
        );
        let talkback_text = actions.locator(
            TargetDescriptor::of(Strategy::text_contains(TALKBACK_MARKER))
                .or(Strategy::text_contains("TalkBack"))
                .named("talkback instructions"),
        );
        Self {
            actions,
            accessibility_menu,
            custom_view_menu,
            talkback_text,
        }
    }

    /// Whether the Accessibility entry is in the view tree
    pub async fn is_accessibility_listed(&self) -> SondarResult<bool> {
        self.actions.exists(&self.accessibility_menu).await
    }

    /// Open the Accessibility menu
    pub async fn tap_accessibility(&self) -> SondarResult<()> {
        self.actions.click(&self.accessibility_menu).await?;
        info!("tapped accessibility menu");
        Ok(())
    }

    /// Open the Custom View demo
    pub async fn tap_custom_view(&self) -> SondarResult<()> {
        self.actions.click(&self.custom_view_menu).await?;
        info!("tapped custom view menu");
        Ok(())
    }

    /// Accessibility, then Custom View
    pub async fn open_custom_view(&self) -> SondarResult<()> {
        self.tap_accessibility().await?;
        self.tap_custom_view().await
    }

    async fn read_talkback_once(&self) -> SondarResult<Option<TalkbackText>> {
        let driver = self.actions.driver();
        match self.talkback_text.resolve(driver).await {
            Ok(handle) => return Ok(Some(TalkbackText::Element(driver.get_text(&handle).await?))),
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => {}
        }
        if self.actions.page_source_contains(TALKBACK_MARKER).await? {
            warn!("talkback instructions only found in page source");
            return Ok(Some(TalkbackText::PageSourceOnly));
        }
        Ok(None)
    }

    /// Wait for the TalkBack instructions, falling back to the page source
    /// when no strategy resolves an element.
    pub async fn talkback_text(&self) -> SondarResult<TalkbackText> {
        let config = self.actions.config();
        let spec = ConditionSpec::from_millis(config.element_timeout_ms, config.poll_interval_ms)?
            .with_description("talkback instructions shown");
        let (text, _) = wait_for_value(&spec, || self.read_talkback_once()).await?;
        Ok(text)
    }
}
