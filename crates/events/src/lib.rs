//! Outbound notifications for expiring Service Principal secrets.
//!
//! - [`delivery`]: SMTP delivery and the [`EmailNotifier`] the reconciler
//!   sends through.
//! - [`templates`]: subject and HTML body for every message this service
//!   sends.

pub mod delivery;
pub mod templates;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use delivery::notifier::EmailNotifier;
pub use templates::RenderedEmail;
