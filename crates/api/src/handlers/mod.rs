pub mod applications;
pub mod notifications;
pub mod reports;
