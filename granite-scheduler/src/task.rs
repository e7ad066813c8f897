//! The schedulable unit and its lifecycle state machine.
//!
//! Lifecycle: Created → dependencies wired → Scheduled (exactly once) →
//! Ready (predecessor counter reaches zero) → Executing → Done. A task that
//! is never scheduled never executes, even if it becomes ready.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use granite_result::{Error, Result};

use crate::context::ExecutionContext;
use crate::worker::Worker;
use crate::{ANY_NODE_ID, NodeId, SchedulePriority};

/// Process-unique task identity, assigned at construction.
pub type TaskId = u64;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Placement captured at `schedule` time. Successor-completion paths read it
/// to route the task without consulting any global state.
#[derive(Clone)]
pub(crate) struct ScheduleState {
    pub(crate) context: ExecutionContext,
    pub(crate) preferred_node: NodeId,
    pub(crate) priority: SchedulePriority,
}

type WorkFn = Box<dyn FnOnce() + Send + 'static>;

pub struct Task {
    id: TaskId,
    description: Mutex<String>,
    /// The payload; taken exactly once by `execute`.
    work: Mutex<Option<WorkFn>>,
    done_callback: Mutex<Option<WorkFn>>,
    /// Number of unfinished predecessors; the task is ready at zero.
    predecessor_counter: AtomicU32,
    /// Successors do not own their predecessors (and vice versa): edges hold
    /// weak handles so finished graphs release their tasks.
    successors: Mutex<Vec<Weak<Task>>>,
    is_scheduled: AtomicBool,
    /// Guards the single hand-off to a queue or inline execution.
    is_enqueued: AtomicBool,
    started: AtomicBool,
    done: Mutex<bool>,
    done_cv: Condvar,
    schedule_state: Mutex<Option<ScheduleState>>,
}

impl Task {
    pub fn new<F>(work: F) -> Arc<Task>
    where
        F: FnOnce() + Send + 'static,
    {
        Arc::new(Task {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            description: Mutex::new(String::new()),
            work: Mutex::new(Some(Box::new(work))),
            done_callback: Mutex::new(None),
            predecessor_counter: AtomicU32::new(0),
            successors: Mutex::new(Vec::new()),
            is_scheduled: AtomicBool::new(false),
            is_enqueued: AtomicBool::new(false),
            started: AtomicBool::new(false),
            done: Mutex::new(false),
            done_cv: Condvar::new(),
            schedule_state: Mutex::new(None),
        })
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn description(&self) -> String {
        let description = self.description.lock();
        if description.is_empty() {
            format!("{{Task with id: {}}}", self.id)
        } else {
            description.clone()
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.predecessor_counter.load(Ordering::Acquire) == 0
    }

    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.is_scheduled.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock()
    }

    /// Mutating the description after scheduling races the executing worker.
    pub fn set_description<S: Into<String>>(&self, description: S) -> Result<()> {
        if self.is_scheduled() {
            return Err(Error::contract_violation(
                "Task::set_description",
                format!("task {} was already scheduled", self.id),
            ));
        }
        *self.description.lock() = description.into();
        Ok(())
    }

    /// Invoked on completion, after successors were notified.
    pub fn set_done_callback<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_scheduled() {
            return Err(Error::contract_violation(
                "Task::set_done_callback",
                format!("task {} was already scheduled", self.id),
            ));
        }
        *self.done_callback.lock() = Some(Box::new(callback));
        Ok(())
    }

    /// Wire a dependency edge: `successor` must not start before `self`
    /// finished. Only legal before `self` is scheduled.
    pub fn set_as_predecessor_of(self: &Arc<Self>, successor: &Arc<Task>) -> Result<()> {
        if self.is_scheduled() {
            return Err(Error::contract_violation(
                "Task::set_as_predecessor_of",
                format!("task {} was already scheduled", self.id),
            ));
        }
        successor.on_predecessor_added();
        self.successors
            .lock()
            .push(Arc::downgrade(successor));
        Ok(())
    }

    /// Schedule with no placement preference at default priority.
    pub fn schedule(self: &Arc<Self>, context: &ExecutionContext) -> Result<()> {
        self.schedule_on(context, ANY_NODE_ID, SchedulePriority::Default)
    }

    /// Schedule onto a preferred node. Exactly one `schedule` call is legal
    /// per task instance.
    ///
    /// Without a worker-pool scheduler in `context`, the task executes
    /// synchronously right here iff it is already ready; a task that becomes
    /// ready later is executed by the completion path of its last
    /// predecessor. A task that became ready *before* being scheduled is
    /// only executed by this call — scheduling order, not readiness order,
    /// drives the inline fallback.
    pub fn schedule_on(
        self: &Arc<Self>,
        context: &ExecutionContext,
        preferred_node: NodeId,
        priority: SchedulePriority,
    ) -> Result<()> {
        if self.is_scheduled.swap(true, Ordering::AcqRel) {
            return Err(Error::contract_violation(
                "Task::schedule",
                format!("task {} was already scheduled", self.id),
            ));
        }
        if let Some(scheduler) = context.scheduler() {
            if preferred_node != ANY_NODE_ID && preferred_node as usize >= scheduler.node_count() {
                return Err(Error::contract_violation(
                    "Task::schedule",
                    format!(
                        "preferred node {preferred_node} outside topology with {} nodes",
                        scheduler.node_count()
                    ),
                ));
            }
            scheduler.note_task_scheduled()?;
        }
        trace!(task = self.id, preferred_node, "scheduled");
        *self.schedule_state.lock() = Some(ScheduleState {
            context: context.clone(),
            preferred_node,
            priority,
        });
        self.try_dispatch();
        Ok(())
    }

    /// Block until the task is done.
    ///
    /// On a worker thread this delegates to the worker's own wait loop, which
    /// keeps draining queues instead of parking the thread — otherwise the
    /// pool could starve itself out of the thread needed to finish the task.
    pub fn join(self: &Arc<Self>) -> Result<()> {
        if !self.is_scheduled() {
            return Err(Error::contract_violation(
                "Task::join",
                format!("task {} must be scheduled before it can be joined", self.id),
            ));
        }
        if let Some(worker) = Worker::current() {
            worker.wait_for_tasks(std::slice::from_ref(self));
        } else {
            let mut done = self.done.lock();
            while !*done {
                self.done_cv.wait(&mut done);
            }
        }
        Ok(())
    }

    pub(crate) fn on_predecessor_added(&self) {
        self.predecessor_counter.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn on_predecessor_done(self: &Arc<Self>) {
        let remaining = self.predecessor_counter.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            self.try_dispatch();
        }
    }

    /// Hand the task over for execution if — and only if — it is scheduled,
    /// ready and not yet handed over. Both the `schedule` call and the last
    /// predecessor's completion race into this; the `is_enqueued` exchange
    /// picks exactly one winner.
    fn try_dispatch(self: &Arc<Self>) {
        let state = self.schedule_state.lock().clone();
        let Some(state) = state else {
            // Ready but not scheduled: nothing happens until `schedule`.
            return;
        };
        if !self.is_ready() {
            return;
        }
        if self.is_enqueued.swap(true, Ordering::AcqRel) {
            return;
        }
        match state.context.scheduler() {
            Some(scheduler) => scheduler.enqueue(
                Arc::clone(self),
                state.preferred_node,
                state.priority,
            ),
            None => self.execute(),
        }
    }

    /// Run the payload, notify successors, fire the callback, flip the done
    /// flag. Exactly-once execution is debug-checked; both violations are
    /// internal bugs, not caller errors.
    pub(crate) fn execute(self: &Arc<Self>) {
        let already_started = self.started.swap(true, Ordering::AcqRel);
        debug_assert!(!already_started, "task {} executed twice", self.id);
        debug_assert!(
            self.is_ready(),
            "task {} executed before its predecessors finished",
            self.id
        );
        trace!(task = self.id, "executing");

        let work = self.work.lock().take();
        if let Some(work) = work {
            work();
        }

        let successors = self.successors.lock().clone();
        for successor in successors {
            if let Some(successor) = successor.upgrade() {
                successor.on_predecessor_done();
            }
        }

        let callback = self.done_callback.lock().take();
        if let Some(callback) = callback {
            callback();
        }

        {
            let mut done = self.done.lock();
            *done = true;
        }
        self.done_cv.notify_all();
        trace!(task = self.id, "done");
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .field("scheduled", &self.is_scheduled())
            .field("done", &self.is_done())
            .finish()
    }
}
