//! Client-side orchestration for the unit dashboard: semester week calendars,
//! report task submission and polling, and stores over the dashboard backend.

pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod services;
pub mod stores;

pub use error::{ApiError, ApiResult};
