//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod tracked_application_repo;

pub use tracked_application_repo::TrackedApplicationRepo;
