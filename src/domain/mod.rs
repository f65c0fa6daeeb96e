//! Domain types and DTOs
//!
//! These types mirror the dashboard backend's JSON payloads.

pub mod semesters;
pub mod tasks;
pub mod units;
pub mod users;
pub mod weeks;

// Re-export commonly used types
pub use semesters::*;
pub use tasks::*;
pub use units::*;
pub use users::*;
pub use weeks::*;
