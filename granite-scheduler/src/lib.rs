//! Dependency-graph task scheduler.
//!
//! [`Task`]s are wired into a dependency graph (`set_as_predecessor_of`),
//! scheduled exactly once and executed when their predecessor counter hits
//! zero. Execution happens either inline on the scheduling thread (the
//! default, null-object [`ExecutionContext`]) or on a fixed pool of worker
//! threads draining node-local priority queues
//! ([`NodeQueueScheduler`]).
//!
//! There is no global "current scheduler": the context is passed explicitly
//! to `schedule`, and a task remembers the context it was scheduled with so
//! completion paths can route newly ready successors without process-wide
//! state.
//!
//! No cancellation, no timeouts, no retries. Lifecycle violations (double
//! scheduling, wiring dependencies after scheduling, joining an unscheduled
//! task) surface as contract-violation errors, never as silent no-ops.

pub mod context;
pub mod node_queue_scheduler;
pub mod task;
pub mod task_queue;
pub mod topology;
pub mod worker;

pub use context::ExecutionContext;
pub use node_queue_scheduler::NodeQueueScheduler;
pub use task::{Task, TaskId};
pub use task_queue::TaskQueue;
pub use topology::Topology;
pub use worker::{Worker, WorkerId};

/// Index of a compute node; each node owns one task queue and a fixed set of
/// workers.
pub type NodeId = u32;

/// Sentinel: "no placement preference, use the scheduling thread's node".
pub const ANY_NODE_ID: NodeId = NodeId::MAX;

/// Queue priority of a task. Ready successors are re-enqueued at the
/// priority their scheduling requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulePriority {
    #[default]
    Default,
    High,
}
