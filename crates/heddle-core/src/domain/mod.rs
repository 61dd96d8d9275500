//! Domain model: task definitions, run records, ids and scheduler state.

pub mod ids;
pub mod record;
pub mod state;
pub mod task;

pub use ids::{Id, IdMarker, RunId};
pub use record::{RunFailure, RunOutcome, RunRecord};
pub use state::SchedulerState;
pub use task::{TaskArgs, TaskDefinition, TaskName, TaskOutput};
