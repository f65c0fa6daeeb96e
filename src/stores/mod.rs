//! Client-side state containers.
//!
//! Each store holds fetched server state behind a lock and exposes the
//! actions that refresh or mutate it. Stores are constructed explicitly and
//! passed around, so tests can build isolated instances.

pub mod task_runs;
pub mod units;
pub mod users;

pub use task_runs::TaskRunStore;
pub use units::UnitStore;
pub use users::UserStore;
