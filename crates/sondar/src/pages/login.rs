use crate::locator::{Locator, Strategy, TargetDescriptor};
use crate::page_object::{Actions, PageObject};
use crate::result::{SondarError, SondarResult};
use tracing::info;

/// Login screen: email, password, login button and inline error
#[derive(Debug, Clone)]
pub struct LoginPage<'d> {
    actions: Actions<'d>,
    email_input: Locator,
    password_input: Locator,
    login_button: Locator,
    error_message: Locator,
}

impl<'d> LoginPage<'d> {
    /// Build the page's locators
    #[must_use]
    pub fn new(actions: Actions<'d>) -> Self {
        let email_input = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("email_input"))
                .or(Strategy::resource_id("com.example.app:id/email_field"))
                .or(Strategy::ui_automator(
                    "new UiSelector().className(\"android.widget.EditText\").instance(0)",
                ))
                .named("email input"),
        );
        let password_input = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("password_input"))
                .or(Strategy::resource_id("com.example.app:id/password_field"))
                .or(Strategy::ui_automator(
                    "new UiSelector().className(\"android.widget.EditText\").instance(1)",
                ))
                .named("password input"),
        );
        let login_button = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("login_button"))
                .or(Strategy::resource_id("com.example.app:id/login_btn"))
                .or(Strategy::text("Login"))
                .named("login button"),
        );
        let error_message = actions.locator(
            TargetDescriptor::of(Strategy::accessibility_id("error_message"))
                .or(Strategy::resource_id("com.example.app:id/error_text"))
                .or(Strategy::ui_automator(
                    "new UiSelector().className(\"android.widget.TextView\").textContains(\"Error\")",
                ))
                .named("error message"),
        );
        Self {
            actions,
            email_input,
            password_input,
            login_button,
            error_message,
        }
    }

    /// Type the email address
    pub async fn enter_email(&self, email: &str) -> SondarResult<()> {
        self.actions.fill(&self.email_input, email).await?;
        info!(email, "entered email");
        Ok(())
    }

    /// Type the password
    pub async fn enter_password(&self, password: &str) -> SondarResult<()> {
        self.actions.fill(&self.password_input, password).await?;
        info!("entered password");
        Ok(())
    }

    /// Tap the login button
    pub async fn click_login(&self) -> SondarResult<()> {
        self.actions.click(&self.login_button).await?;
        info!("clicked login button");
        Ok(())
    }

    /// Fill both fields, dismiss the keyboard and submit
    pub async fn login(&self, email: &str, password: &str) -> SondarResult<()> {
        info!("performing login");
        self.enter_email(email).await?;
        self.enter_password(password).await?;
        self.actions.hide_keyboard().await?;
        self.click_login().await?;
        info!("login action completed");
        Ok(())
    }

    /// Whether the inline error is showing
    pub async fn is_error_displayed(&self) -> SondarResult<bool> {
        self.actions.is_displayed(&self.error_message).await
    }

    /// Text of the inline error
    pub async fn error_text(&self) -> SondarResult<String> {
        self.actions.read_text(&self.error_message).await
    }

    /// Whether both inputs and the login button are showing
    pub async fn is_login_page_displayed(&self) -> SondarResult<bool> {
        for locator in [&self.email_input, &self.password_input, &self.login_button] {
            if !self.actions.is_displayed(locator).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check the page and fail with the missing element otherwise
    pub async fn ensure_displayed(&self) -> SondarResult<()> {
        if self.is_login_page_displayed().await? {
            return Ok(());
        }
        Err(SondarError::ElementNotFound {
            descriptor: self.login_button.descriptor().clone(),
        })
    }
}

impl PageObject for LoginPage<'_> {
    fn page_name(&self) -> &'static str {
        "login"
    }

    fn anchor(&self) -> &Locator {
        &self.login_button
    }

    fn actions(&self) -> &Actions<'_> {
        &self.actions
    }
}
