//! Node-local two-level priority queue of ready tasks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::task::Task;
use crate::{NodeId, SchedulePriority};

#[derive(Default)]
struct QueueLevels {
    high: VecDeque<Arc<Task>>,
    default: VecDeque<Arc<Task>>,
}

impl QueueLevels {
    fn is_empty(&self) -> bool {
        self.high.is_empty() && self.default.is_empty()
    }
}

/// Only ready tasks are ever pushed here; workers pull and execute without
/// re-checking readiness.
pub struct TaskQueue {
    node_id: NodeId,
    levels: Mutex<QueueLevels>,
    work_available: Condvar,
}

impl TaskQueue {
    pub(crate) fn new(node_id: NodeId) -> Arc<TaskQueue> {
        Arc::new(TaskQueue {
            node_id,
            levels: Mutex::new(QueueLevels::default()),
            work_available: Condvar::new(),
        })
    }

    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn len(&self) -> usize {
        let levels = self.levels.lock();
        levels.high.len() + levels.default.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.lock().is_empty()
    }

    pub(crate) fn push(&self, task: Arc<Task>, priority: SchedulePriority) {
        {
            let mut levels = self.levels.lock();
            match priority {
                SchedulePriority::High => levels.high.push_back(task),
                SchedulePriority::Default => levels.default.push_back(task),
            }
        }
        self.work_available.notify_one();
    }

    /// Non-blocking pull; high priority drains first.
    pub(crate) fn try_pull(&self) -> Option<Arc<Task>> {
        let mut levels = self.levels.lock();
        levels.high.pop_front().or_else(|| levels.default.pop_front())
    }

    /// Park until a push arrives or `timeout` elapses. Re-checks emptiness
    /// under the lock, so a push between a failed pull and this call is
    /// never slept through.
    pub(crate) fn wait_for_work(&self, timeout: Duration) {
        let mut levels = self.levels.lock();
        if levels.is_empty() {
            self.work_available.wait_for(&mut levels, timeout);
        }
    }

    /// Wake every parked worker (shutdown path).
    pub(crate) fn notify_all(&self) {
        self.work_available.notify_all();
    }
}
