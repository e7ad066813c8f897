//! The execution context handed to `schedule`.
//!
//! The source of this design kept a process-wide "current scheduler"
//! singleton; here the handle is explicit. The default context is a
//! null-object inline executor reproducing the no-scheduler fallback: a
//! ready task executes synchronously inside `schedule`, and tasks becoming
//! ready later run on their last predecessor's completion path.

use std::fmt;
use std::sync::Arc;

use crate::node_queue_scheduler::NodeQueueScheduler;

#[derive(Clone, Default)]
pub struct ExecutionContext {
    scheduler: Option<Arc<NodeQueueScheduler>>,
}

impl ExecutionContext {
    /// The null-object context: synchronous inline execution.
    pub fn inline() -> ExecutionContext {
        ExecutionContext::default()
    }

    pub fn with_scheduler(scheduler: Arc<NodeQueueScheduler>) -> ExecutionContext {
        ExecutionContext {
            scheduler: Some(scheduler),
        }
    }

    pub fn scheduler(&self) -> Option<&Arc<NodeQueueScheduler>> {
        self.scheduler.as_ref()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheduler {
            Some(s) => write!(f, "ExecutionContext(node-queue, {} nodes)", s.node_count()),
            None => f.write_str("ExecutionContext(inline)"),
        }
    }
}
