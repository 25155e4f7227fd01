// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative single-threaded task scheduler.
//!
//! The boxed workflow/signal/query futures are `!Send` — they close over
//! `Rc`-based engine state — so they live in a plain, single-threaded task
//! slab. Waking a task only needs to push its id onto a ready queue, which
//! *is* safely `Send + Sync`, so [`WakeSignal`] is the only part of this
//! module that touches `std::task::Wake`; everything that actually holds a
//! future stays on the one thread that owns the `Executor`.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// The only part of the scheduler that crosses the `Send + Sync` boundary
/// `Waker` demands: a task id and a handle to the ready queue.
struct WakeSignal {
    task: TaskId,
    ready: Arc<Mutex<VecDeque<TaskId>>>,
}

impl Wake for WakeSignal {
    fn wake(self: Arc<Self>) {
        self.ready.lock().unwrap_or_else(|e| e.into_inner()).push_back(self.task);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.ready.lock().unwrap_or_else(|e| e.into_inner()).push_back(self.task);
    }
}

type BoxedTask = Pin<Box<dyn Future<Output = ()>>>;

/// FIFO-scheduled pool of `!Send` tasks, drained to quiescence between
/// `activate` calls and before `conclude`.
#[derive(Default)]
pub struct Executor {
    tasks: RefCell<HashMap<TaskId, BoxedTask>>,
    ready: Arc<Mutex<VecDeque<TaskId>>>,
    next_id: RefCell<u64>,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            tasks: RefCell::new(HashMap::new()),
            ready: Arc::new(Mutex::new(VecDeque::new())),
            next_id: RefCell::new(0),
        }
    }

    /// Spawn a task. Queued to run on the very next drain.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) -> TaskId {
        let id = {
            let mut next = self.next_id.borrow_mut();
            let id = TaskId(*next);
            *next += 1;
            id
        };
        self.tasks.borrow_mut().insert(id, Box::pin(future));
        self.ready.lock().unwrap_or_else(|e| e.into_inner()).push_back(id);
        id
    }

    pub fn task_count(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Drain the ready queue, polling each task at most once per pass, and
    /// repeating until nothing is ready — the "run microtasks to
    /// quiescence" step bracketing every `activate`/`conclude` call.
    pub fn run_until_quiescent(&self) {
        loop {
            let id = {
                let mut ready = self.ready.lock().unwrap_or_else(|e| e.into_inner());
                ready.pop_front()
            };
            let Some(id) = id else { break };

            // A task can be woken more than once before it is polled, or
            // after it has already completed and been removed.
            let mut future = match self.tasks.borrow_mut().remove(&id) {
                Some(f) => f,
                None => continue,
            };

            let waker = Waker::from(Arc::new(WakeSignal { task: id, ready: self.ready.clone() }));
            let mut cx = Context::from_waker(&waker);

            match future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {}
                Poll::Pending => {
                    self.tasks.borrow_mut().insert(id, future);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::{new_shared, resolve_shared, CompletionFuture};
    use std::rc::Rc;

    #[test]
    fn spawned_task_runs_to_completion_once_resolved() {
        let exec = Executor::new();
        let shared = new_shared::<u32>();
        let seen = Rc::new(RefCell::new(None));
        let seen2 = seen.clone();
        let shared2 = shared.clone();

        exec.spawn(async move {
            let value = CompletionFuture::new(shared2).await;
            *seen2.borrow_mut() = Some(value);
        });

        exec.run_until_quiescent();
        assert!(seen.borrow().is_none(), "task should be parked on the pending completion");
        assert_eq!(exec.task_count(), 1);

        resolve_shared(&shared, 42);
        exec.run_until_quiescent();
        assert_eq!(*seen.borrow(), Some(42));
        assert_eq!(exec.task_count(), 0);
    }

    #[test]
    fn multiple_tasks_run_in_fifo_order() {
        let exec = Executor::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            exec.spawn(async move {
                order.borrow_mut().push(i);
            });
        }

        exec.run_until_quiescent();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
