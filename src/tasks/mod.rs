//! Background task system.
//!
//! Core components:
//! - `state`: Task state machine (Pending → Running → Completed) and poll outcomes
//! - `registry`: Spawns work, tracks completion, delivers each result once
//! - `poller`: Client-side bounded polling loop

pub mod poller;
pub mod registry;
pub mod state;

pub use poller::{PollReport, StatusPoller};
pub use registry::{TaskId, TaskRegistry};
pub use state::{PollOutcome, TaskState};
