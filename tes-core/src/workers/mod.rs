//! Worker pool: pre-spawned OS child processes, their state machine, and the
//! registry that serves `/api/workers/*`.

mod pool;
mod registry;
mod snapshot;

pub use pool::{Worker, WorkerId, WorkerPool, WorkerState, WorkerSummary};
pub use registry::{RegistrySource, WorkerRegistry, WorkerRegistryView};
pub use snapshot::fetch_heap_snapshot;
