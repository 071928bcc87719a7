//! Locator Strategy Chain
//!
//! A [`TargetDescriptor`] names one logical UI target through several
//! independent addressing schemes, most stable first:
//!
//! 1. accessibility id (survives localization and redesigns)
//! 2. platform resource id (survives localization, not id churn)
//! 3. UiAutomator structural query
//! 4. literal or partial visible text
//!
//! [`resolve_target`] tries them in order and returns the first handle that
//! actually exists. Per-strategy failures are misses, never errors; only the
//! exhausted chain is reported. Handles are never cached: each call resolves
//! again because the screen may have changed in between.

use crate::driver::{ElementHandle, SondarDriver};
use crate::result::{SondarError, SondarResult};
use crate::wait::{wait_for_value, ConditionSpec, WaitOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default timeout for element waits (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval for element waits (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Addressing scheme of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Accessibility id / content description
    AccessibilityId,
    /// Android resource id (`package:id/name`)
    ResourceId,
    /// Raw UiAutomator selector expression
    UiAutomator,
    /// Exact visible text
    Text,
    /// Partial visible text
    TextContains,
}

impl StrategyKind {
    /// Human-readable name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccessibilityId => "accessibility_id",
            Self::ResourceId => "resource_id",
            Self::UiAutomator => "ui_automator",
            Self::Text => "text",
            Self::TextContains => "text_contains",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (kind, value) addressing pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Accessibility id (e.g. `login_button`)
    AccessibilityId(String),
    /// Resource id (e.g. `com.example.app:id/login_btn`)
    ResourceId(String),
    /// UiAutomator expression (e.g. `new UiSelector().className("android.widget.EditText").instance(0)`)
    UiAutomator(String),
    /// Exact text
    Text(String),
    /// Partial text
    TextContains(String),
}

impl Strategy {
    /// Create an accessibility id strategy
    #[must_use]
    pub fn accessibility_id(id: impl Into<String>) -> Self {
        Self::AccessibilityId(id.into())
    }

    /// Create a resource id strategy
    #[must_use]
    pub fn resource_id(id: impl Into<String>) -> Self {
        Self::ResourceId(id.into())
    }

    /// Create a UiAutomator strategy
    #[must_use]
    pub fn ui_automator(expression: impl Into<String>) -> Self {
        Self::UiAutomator(expression.into())
    }

    /// Create an exact text strategy
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a partial text strategy
    #[must_use]
    pub fn text_contains(text: impl Into<String>) -> Self {
        Self::TextContains(text.into())
    }

    /// The addressing scheme
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::AccessibilityId(_) => StrategyKind::AccessibilityId,
            Self::ResourceId(_) => StrategyKind::ResourceId,
            Self::UiAutomator(_) => StrategyKind::UiAutomator,
            Self::Text(_) => StrategyKind::Text,
            Self::TextContains(_) => StrategyKind::TextContains,
        }
    }

    /// The raw value
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::AccessibilityId(v)
            | Self::ResourceId(v)
            | Self::UiAutomator(v)
            | Self::Text(v)
            | Self::TextContains(v) => v,
        }
    }

    /// Encode as a driver selector string
    #[must_use]
    pub fn to_selector(&self) -> String {
        match self {
            Self::AccessibilityId(id) => format!("~{id}"),
            Self::ResourceId(id) => format!("id={id}"),
            Self::UiAutomator(expr) => format!("android={expr}"),
            Self::Text(t) => format!("android=new UiSelector().text({t:?})"),
            Self::TextContains(t) => format!("android=new UiSelector().textContains({t:?})"),
        }
    }
}

// Strategies are written as single-key maps (`- resource_id: ...`) in every
// YAML context, including inside internally tagged scenario steps.
#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(deserialize_with = "serde_yaml_ng::with::singleton_map_recursive::deserialize")]
    strategies: Vec<Strategy>,
}

/// Ordered, non-empty list of strategies for one logical target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct TargetDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(serialize_with = "serde_yaml_ng::with::singleton_map_recursive::serialize")]
    strategies: Vec<Strategy>,
}

impl TryFrom<RawDescriptor> for TargetDescriptor {
    type Error = SondarError;

    fn try_from(raw: RawDescriptor) -> SondarResult<Self> {
        let descriptor = Self::new(raw.strategies)?;
        Ok(match raw.name {
            Some(name) => descriptor.named(name),
            None => descriptor,
        })
    }
}

impl TargetDescriptor {
    /// Create a descriptor from strategies in priority order
    pub fn new(strategies: Vec<Strategy>) -> SondarResult<Self> {
        if strategies.is_empty() {
            return Err(SondarError::InvalidDescriptor {
                message: "a target needs at least one strategy".to_string(),
            });
        }
        Ok(Self {
            name: None,
            strategies,
        })
    }

    /// Start a descriptor with its highest-priority strategy
    #[must_use]
    pub fn of(primary: Strategy) -> Self {
        Self {
            name: None,
            strategies: vec![primary],
        }
    }

    /// Append a lower-priority fallback
    #[must_use]
    pub fn or(mut self, fallback: Strategy) -> Self {
        self.strategies.push(fallback);
        self
    }

    /// Attach a name for diagnostics
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Diagnostic name, if any
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Strategies in priority order
    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name} ")?;
        }
        f.write_str("[")?;
        for (i, strategy) in self.strategies.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(&strategy.to_selector())?;
        }
        f.write_str("]")
    }
}

/// Resolve one selector and keep the handle only if it exists.
async fn probe<D: SondarDriver + ?Sized>(
    driver: &D,
    selector: &str,
) -> SondarResult<Option<ElementHandle>> {
    let Some(handle) = driver.resolve(selector).await? else {
        return Ok(None);
    };
    Ok(driver.exists(&handle).await?.then_some(handle))
}

/// Resolve a target by trying its strategies in priority order.
///
/// Returns the first existing element. Strategies after the first hit are
/// never invoked. Fails with [`SondarError::ElementNotFound`] when every
/// strategy misses; a lost session propagates as-is.
pub async fn resolve_target<D: SondarDriver + ?Sized>(
    driver: &D,
    descriptor: &TargetDescriptor,
) -> SondarResult<ElementHandle> {
    for (priority, strategy) in descriptor.strategies().iter().enumerate() {
        let selector = strategy.to_selector();
        match probe(driver, &selector).await {
            Ok(Some(handle)) => {
                debug!(target = %descriptor, %selector, priority, "strategy matched");
                return Ok(handle);
            }
            Ok(None) => {
                debug!(%selector, kind = %strategy.kind(), "strategy missed");
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(%selector, kind = %strategy.kind(), error = %err, "strategy failed");
            }
        }
    }
    Err(SondarError::ElementNotFound {
        descriptor: descriptor.clone(),
    })
}

/// Locator options for element waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for waits
    pub timeout: Duration,
    /// Polling interval for waits
    pub poll_interval: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// A target descriptor plus wait options.
///
/// Query methods (`is_visible`, `is_enabled`) answer `false` when the
/// element cannot be found; action methods wait for visibility first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    descriptor: TargetDescriptor,
    options: LocatorOptions,
}

impl From<TargetDescriptor> for Locator {
    fn from(descriptor: TargetDescriptor) -> Self {
        Self::new(descriptor)
    }
}

impl Locator {
    /// Create a locator with default options
    #[must_use]
    pub fn new(descriptor: TargetDescriptor) -> Self {
        Self {
            descriptor,
            options: LocatorOptions::default(),
        }
    }

    /// Set a custom timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Set a custom poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Replace all options
    #[must_use]
    pub const fn with_options(mut self, options: LocatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the descriptor
    #[must_use]
    pub const fn descriptor(&self) -> &TargetDescriptor {
        &self.descriptor
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    fn condition(&self, what: &str) -> SondarResult<ConditionSpec> {
        Ok(
            ConditionSpec::new(self.options.timeout, self.options.poll_interval)?
                .with_description(format!("{} {what}", self.descriptor)),
        )
    }

    /// Resolve once, without waiting
    pub async fn resolve<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<ElementHandle> {
        resolve_target(driver, &self.descriptor).await
    }

    /// Resolve and return the handle only if it is displayed
    pub async fn visible_handle<D: SondarDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> SondarResult<Option<ElementHandle>> {
        let handle = match self.resolve(driver).await {
            Ok(handle) => handle,
            Err(SondarError::ElementNotFound { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(driver.is_visible(&handle).await?.then_some(handle))
    }

    async fn enabled_handle<D: SondarDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> SondarResult<Option<ElementHandle>> {
        let Some(handle) = self.visible_handle(driver).await? else {
            return Ok(None);
        };
        Ok(driver.is_enabled(&handle).await?.then_some(handle))
    }

    async fn hidden_marker<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<Option<()>> {
        Ok(self.visible_handle(driver).await?.is_none().then_some(()))
    }

    /// Whether any strategy resolves to an attached element; lookup failures read as `false`
    pub async fn exists<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<bool> {
        match self.resolve(driver).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_fatal() => Err(err),
            Err(_) => Ok(false),
        }
    }

    /// Whether the target is currently displayed; lookup failures read as `false`
    pub async fn is_visible<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<bool> {
        match self.visible_handle(driver).await {
            Ok(handle) => Ok(handle.is_some()),
            Err(err) if err.is_fatal() => Err(err),
            Err(_) => Ok(false),
        }
    }

    /// Whether the target is currently enabled; lookup failures read as `false`
    pub async fn is_enabled<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<bool> {
        let handle = match self.resolve(driver).await {
            Ok(handle) => handle,
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => return Ok(false),
        };
        match driver.is_enabled(&handle).await {
            Err(err) if !err.is_fatal() => Ok(false),
            other => other,
        }
    }

    /// Wait until the target is displayed and return its handle
    pub async fn wait_for_visible<D: SondarDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> SondarResult<ElementHandle> {
        let spec = self.condition("to be visible")?;
        let (handle, _) = wait_for_value(&spec, move || self.visible_handle(driver)).await?;
        Ok(handle)
    }

    /// Wait until the target is displayed and enabled
    pub async fn wait_for_enabled<D: SondarDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> SondarResult<ElementHandle> {
        let spec = self.condition("to be enabled")?;
        let (handle, _) = wait_for_value(&spec, move || self.enabled_handle(driver)).await?;
        Ok(handle)
    }

    /// Wait until the target is gone or hidden
    pub async fn wait_for_hidden<D: SondarDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> SondarResult<WaitOutcome> {
        let spec = self.condition("to be hidden")?;
        let (_, outcome) = wait_for_value(&spec, move || self.hidden_marker(driver)).await?;
        Ok(outcome)
    }

    /// Wait for the target, then tap it
    pub async fn click<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<()> {
        let handle = self.wait_for_visible(driver).await?;
        driver.click(&handle).await
    }

    /// Wait for the target, clear it and type `value`
    pub async fn fill<D: SondarDriver + ?Sized>(&self, driver: &D, value: &str) -> SondarResult<()> {
        let handle = self.wait_for_visible(driver).await?;
        driver.clear_text(&handle).await?;
        driver.set_text(&handle, value).await
    }

    /// Wait for the target and read its text
    pub async fn text<D: SondarDriver + ?Sized>(&self, driver: &D) -> SondarResult<String> {
        let handle = self.wait_for_visible(driver).await?;
        driver.get_text(&handle).await
    }
}
