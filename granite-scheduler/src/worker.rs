//! Worker threads: each drains its node-local queue, stealing from other
//! nodes when idle.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::node_queue_scheduler::NodeQueueScheduler;
use crate::task::Task;
use crate::task_queue::TaskQueue;
use crate::NodeId;

pub type WorkerId = u32;

thread_local! {
    static CURRENT_WORKER: RefCell<Option<Arc<Worker>>> = const { RefCell::new(None) };
}

/// How long an idle worker parks before re-checking for stealable work.
const IDLE_PARK: Duration = Duration::from_millis(1);

pub struct Worker {
    id: WorkerId,
    node_id: NodeId,
    queue: Arc<TaskQueue>,
    /// Every queue in the topology, for stealing.
    all_queues: Vec<Arc<TaskQueue>>,
    shutdown: Arc<AtomicBool>,
    scheduler: Weak<NodeQueueScheduler>,
}

impl Worker {
    pub(crate) fn new(
        id: WorkerId,
        node_id: NodeId,
        queue: Arc<TaskQueue>,
        all_queues: Vec<Arc<TaskQueue>>,
        shutdown: Arc<AtomicBool>,
        scheduler: Weak<NodeQueueScheduler>,
    ) -> Arc<Worker> {
        Arc::new(Worker {
            id,
            node_id,
            queue,
            all_queues,
            shutdown,
            scheduler,
        })
    }

    /// The worker owning the calling thread, if the thread is part of a pool.
    pub fn current() -> Option<Arc<Worker>> {
        CURRENT_WORKER.with(|worker| worker.borrow().clone())
    }

    #[inline]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Thread main loop.
    pub(crate) fn operate(self: &Arc<Self>) {
        CURRENT_WORKER.with(|worker| *worker.borrow_mut() = Some(Arc::clone(self)));
        debug!(worker = self.id, node = self.node_id, "worker started");
        while !self.shutdown.load(Ordering::Acquire) {
            match self.next_task() {
                Some(task) => self.run(task),
                None => self.queue.wait_for_work(IDLE_PARK),
            }
        }
        debug!(worker = self.id, "worker stopped");
    }

    fn next_task(&self) -> Option<Arc<Task>> {
        if let Some(task) = self.queue.try_pull() {
            return Some(task);
        }
        for queue in &self.all_queues {
            if queue.node_id() != self.node_id
                && let Some(task) = queue.try_pull()
            {
                return Some(task);
            }
        }
        None
    }

    fn run(&self, task: Arc<Task>) {
        task.execute();
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.note_task_completed();
        }
    }

    /// `join` on a worker thread funnels here: keep executing queued work
    /// until the awaited tasks are done, so the pool never starves itself.
    pub(crate) fn wait_for_tasks(&self, tasks: &[Arc<Task>]) {
        while !tasks.iter().all(|task| task.is_done()) {
            match self.next_task() {
                Some(task) => self.run(task),
                None => std::thread::yield_now(),
            }
        }
    }
}
