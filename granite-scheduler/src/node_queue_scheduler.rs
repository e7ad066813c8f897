//! The multi-worker scheduler: one ready-queue per node, a fixed worker pool
//! draining them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use granite_result::{Error, Result};

use crate::task::Task;
use crate::task_queue::TaskQueue;
use crate::topology::Topology;
use crate::worker::Worker;
use crate::{ANY_NODE_ID, NodeId, SchedulePriority};

pub struct NodeQueueScheduler {
    queues: Vec<Arc<TaskQueue>>,
    workers: Vec<Arc<Worker>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    /// Scheduled-but-unfinished tasks; `wait_for_all_tasks` blocks on zero.
    active_tasks: AtomicUsize,
    idle_lock: Mutex<()>,
    idle_cv: Condvar,
}

impl NodeQueueScheduler {
    /// Build queues and spawn the worker pool described by `topology`.
    pub fn new(topology: Topology) -> Arc<NodeQueueScheduler> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let queues: Vec<Arc<TaskQueue>> = (0..topology.node_count())
            .map(|node| TaskQueue::new(node as NodeId))
            .collect();

        let scheduler = Arc::new_cyclic(|weak| {
            let mut workers = Vec::with_capacity(topology.total_workers());
            let mut worker_id = 0;
            for (node, &count) in topology.nodes().iter().enumerate() {
                for _ in 0..count {
                    workers.push(Worker::new(
                        worker_id,
                        node as NodeId,
                        Arc::clone(&queues[node]),
                        queues.clone(),
                        Arc::clone(&shutdown),
                        weak.clone(),
                    ));
                    worker_id += 1;
                }
            }
            NodeQueueScheduler {
                queues,
                workers,
                threads: Mutex::new(Vec::new()),
                shutdown,
                active_tasks: AtomicUsize::new(0),
                idle_lock: Mutex::new(()),
                idle_cv: Condvar::new(),
            }
        });

        let mut threads = scheduler.threads.lock();
        for worker in &scheduler.workers {
            let worker = Arc::clone(worker);
            let handle = std::thread::Builder::new()
                .name(format!("granite-worker-{}", worker.id()))
                .spawn(move || worker.operate())
                .expect("failed to spawn worker thread");
            threads.push(handle);
        }
        drop(threads);
        debug!(
            nodes = scheduler.queues.len(),
            workers = scheduler.workers.len(),
            "scheduler started"
        );
        scheduler
    }

    pub fn node_count(&self) -> usize {
        self.queues.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn queue(&self, node_id: NodeId) -> Result<&Arc<TaskQueue>> {
        self.queues.get(node_id as usize).ok_or_else(|| {
            Error::contract_violation(
                "NodeQueueScheduler::queue",
                format!("node id {node_id} outside topology with {} nodes", self.queues.len()),
            )
        })
    }

    /// Account for a freshly scheduled task. Rejected once the pool is shut
    /// down — a task queued after `finish` would never run.
    pub(crate) fn note_task_scheduled(&self) -> Result<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::contract_violation(
                "NodeQueueScheduler::schedule",
                "scheduler was already finished",
            ));
        }
        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn note_task_completed(&self) {
        if self.active_tasks.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.idle_lock.lock();
            self.idle_cv.notify_all();
        }
    }

    /// Hand a ready task to a queue. `ANY_NODE_ID` resolves to the calling
    /// worker's node (locality for successor chains) or node 0 from outside
    /// the pool.
    pub(crate) fn enqueue(&self, task: Arc<Task>, preferred_node: NodeId, priority: SchedulePriority) {
        let node = if preferred_node == ANY_NODE_ID {
            // The calling worker may belong to a different pool; fall back
            // to node 0 rather than indexing out of this one.
            Worker::current()
                .map_or(0, |worker| worker.node_id() as usize)
                .min(self.queues.len() - 1)
        } else {
            preferred_node as usize
        };
        self.queues[node].push(task, priority);
    }

    /// Block until every scheduled task has completed.
    pub fn wait_for_all_tasks(&self) {
        let mut guard = self.idle_lock.lock();
        while self.active_tasks.load(Ordering::Acquire) != 0 {
            self.idle_cv.wait(&mut guard);
        }
    }

    /// Drain outstanding work, stop the workers and join their threads.
    /// Scheduling onto a finished scheduler is a contract violation.
    pub fn finish(&self) {
        self.wait_for_all_tasks();
        self.shutdown.store(true, Ordering::Release);
        for queue in &self.queues {
            queue.notify_all();
        }
        let threads: Vec<JoinHandle<()>> = std::mem::take(&mut *self.threads.lock());
        for handle in threads {
            let _ = handle.join();
        }
        debug!("scheduler finished");
    }
}

impl Drop for NodeQueueScheduler {
    fn drop(&mut self) {
        self.finish();
    }
}
