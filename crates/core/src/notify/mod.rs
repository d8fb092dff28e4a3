//! Operator notifications.
//!
//! Services emit [`Notification`]s through a [`NotificationHandle`] after their
//! storage work has committed. A [`NotificationDispatcher`] running in the
//! background delivers each one to every configured [`Notifier`]; delivery
//! errors are logged and never reach the emitting request.

mod dispatcher;
mod email;
mod notifier;
mod push;
mod tokens;
mod types;

pub use dispatcher::*;
pub use email::EmailNotifier;
pub use notifier::*;
pub use push::PushNotifier;
pub use tokens::*;
pub use types::*;
