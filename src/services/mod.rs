//! Service layer modules for backend integration.
//!
//! Contains the dashboard REST client, the durable task checkpoint, the task
//! poll controller and the report workflow built on top of them.

pub mod api_client;
pub mod checkpoint;
pub mod poller;
pub mod reports;

pub use api_client::{ApiClient, TaskApi};
pub use checkpoint::{Checkpoint, FileCheckpoint, MemoryCheckpoint};
pub use poller::{HistoryRefresh, PollConfig, PollState, TaskPoller};
pub use reports::ReportRunner;
