//! Page objects for the demo app screens.
//!
//! Each page keeps one [`TargetDescriptor`](crate::locator::TargetDescriptor)
//! per element, with strategies listed most stable first.

mod accessibility;
mod animations;
mod home;
mod login;
mod views;

pub use accessibility::{AccessibilityPage, TalkbackText, TALKBACK_INSTRUCTIONS};
pub use animations::AnimationsPage;
pub use home::{HomePage, HOME_PAGE_TIMEOUT_MS};
pub use login::LoginPage;
pub use views::ViewsPage;
