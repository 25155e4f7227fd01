// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interceptor pipeline: chain-of-responsibility, right-fold
//! composed, around the workflow entry point and signal dispatch, plus an
//! outbound chain around the commands user code emits (timer starts,
//! activity scheduling).
//!
//! No reflection or registration-by-name: a chain is just a `Vec` of boxed
//! wrappers folded once at init time.

use async_trait::async_trait;
use std::rc::Rc;
use wf_core::{Payload, SeqNum, WfError};
use wf_wire::Headers;

// ---- Inbound: workflow entry ----------------------------------------

#[derive(Debug, Clone)]
pub struct ExecuteInput {
    pub headers: Headers,
    pub arguments: Vec<Payload>,
}

#[async_trait(?Send)]
pub trait ExecuteNext {
    async fn call(&self, input: ExecuteInput) -> Result<Payload, WfError>;
}

#[async_trait(?Send)]
pub trait InboundInterceptor {
    async fn execute(&self, input: ExecuteInput, next: &dyn ExecuteNext) -> Result<Payload, WfError>;
    async fn handle_signal(&self, input: SignalInput, next: &dyn HandleSignalNext) -> Result<(), WfError>;
}

struct ExecuteLink {
    interceptor: Rc<dyn InboundInterceptor>,
    next: Rc<dyn ExecuteNext>,
}

#[async_trait(?Send)]
impl ExecuteNext for ExecuteLink {
    async fn call(&self, input: ExecuteInput) -> Result<Payload, WfError> {
        self.interceptor.execute(input, self.next.as_ref()).await
    }
}

/// Right-fold `interceptors` around `base`: the last interceptor wraps
/// `base` directly, each earlier one wraps the previous wrapper.
pub fn compose_execute(interceptors: &[Rc<dyn InboundInterceptor>], base: Rc<dyn ExecuteNext>) -> Rc<dyn ExecuteNext> {
    interceptors.iter().rev().cloned().fold(base, |next, interceptor| Rc::new(ExecuteLink { interceptor, next }))
}

// ---- Inbound: signal dispatch -----------------------------------------

#[derive(Debug, Clone)]
pub struct SignalInput {
    pub signal_name: String,
    pub input: Vec<Payload>,
}

#[async_trait(?Send)]
pub trait HandleSignalNext {
    async fn call(&self, input: SignalInput) -> Result<(), WfError>;
}

struct SignalLink {
    interceptor: Rc<dyn InboundInterceptor>,
    next: Rc<dyn HandleSignalNext>,
}

#[async_trait(?Send)]
impl HandleSignalNext for SignalLink {
    async fn call(&self, input: SignalInput) -> Result<(), WfError> {
        self.interceptor.handle_signal(input, self.next.as_ref()).await
    }
}

pub fn compose_handle_signal(
    interceptors: &[Rc<dyn InboundInterceptor>],
    base: Rc<dyn HandleSignalNext>,
) -> Rc<dyn HandleSignalNext> {
    interceptors.iter().rev().cloned().fold(base, |next, interceptor| Rc::new(SignalLink { interceptor, next }))
}

// ---- Outbound: commands leaving user code ------------------------------

#[derive(Debug, Clone, Copy)]
pub struct StartTimerInput {
    pub start_to_fire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScheduleActivityInput {
    pub activity_type: String,
    pub arguments: Vec<Payload>,
    pub headers: Headers,
}

pub trait StartTimerNext {
    fn call(&self, input: StartTimerInput) -> Result<SeqNum, WfError>;
}

pub trait ScheduleActivityNext {
    fn call(&self, input: ScheduleActivityInput) -> Result<SeqNum, WfError>;
}

/// Outbound hooks around commands leaving user code. Synchronous: emitting
/// a command is a pure engine-state mutation, never a suspension point.
pub trait OutboundInterceptor {
    fn start_timer(&self, input: StartTimerInput, next: &dyn StartTimerNext) -> Result<SeqNum, WfError> {
        next.call(input)
    }

    fn schedule_activity(
        &self,
        input: ScheduleActivityInput,
        next: &dyn ScheduleActivityNext,
    ) -> Result<SeqNum, WfError> {
        next.call(input)
    }
}

struct StartTimerLink {
    interceptor: Rc<dyn OutboundInterceptor>,
    next: Rc<dyn StartTimerNext>,
}

impl StartTimerNext for StartTimerLink {
    fn call(&self, input: StartTimerInput) -> Result<SeqNum, WfError> {
        self.interceptor.start_timer(input, self.next.as_ref())
    }
}

pub fn compose_start_timer(interceptors: &[Rc<dyn OutboundInterceptor>], base: Rc<dyn StartTimerNext>) -> Rc<dyn StartTimerNext> {
    interceptors.iter().rev().cloned().fold(base, |next, interceptor| Rc::new(StartTimerLink { interceptor, next }))
}

struct ScheduleActivityLink {
    interceptor: Rc<dyn OutboundInterceptor>,
    next: Rc<dyn ScheduleActivityNext>,
}

impl ScheduleActivityNext for ScheduleActivityLink {
    fn call(&self, input: ScheduleActivityInput) -> Result<SeqNum, WfError> {
        self.interceptor.schedule_activity(input, self.next.as_ref())
    }
}

pub fn compose_schedule_activity(
    interceptors: &[Rc<dyn OutboundInterceptor>],
    base: Rc<dyn ScheduleActivityNext>,
) -> Rc<dyn ScheduleActivityNext> {
    interceptors
        .iter()
        .rev()
        .cloned()
        .fold(base, |next, interceptor| Rc::new(ScheduleActivityLink { interceptor, next }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll, Wake, Waker};

    struct NoopWake;
    impl Wake for NoopWake {
        fn wake(self: Arc<Self>) {}
        fn wake_by_ref(self: &Arc<Self>) {}
    }

    /// Every future in this chain resolves on its first poll — nothing
    /// here actually suspends — so a single poll is sufficient to drive it
    /// to completion without pulling in an async runtime.
    fn block_on<T>(mut fut: Pin<Box<dyn Future<Output = T>>>) -> T {
        let waker = Waker::from(Arc::new(NoopWake));
        let mut cx = Context::from_waker(&waker);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(value) => value,
            Poll::Pending => panic!("test future unexpectedly suspended"),
        }
    }

    struct RecordingInterceptor {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    #[async_trait(?Send)]
    impl InboundInterceptor for RecordingInterceptor {
        async fn execute(&self, input: ExecuteInput, next: &dyn ExecuteNext) -> Result<Payload, WfError> {
            self.log.borrow_mut().push("before");
            let result = next.call(input).await;
            self.log.borrow_mut().push("after");
            result
        }

        async fn handle_signal(&self, input: SignalInput, next: &dyn HandleSignalNext) -> Result<(), WfError> {
            next.call(input).await
        }
    }

    struct BaseExecute;

    #[async_trait(?Send)]
    impl ExecuteNext for BaseExecute {
        async fn call(&self, _input: ExecuteInput) -> Result<Payload, WfError> {
            Ok(Payload::binary_null())
        }
    }

    #[test]
    fn chain_wraps_base_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(RecordingInterceptor { log: log.clone() });
        let b = Rc::new(RecordingInterceptor { log: log.clone() });
        let chain: Vec<Rc<dyn InboundInterceptor>> = vec![a, b];
        let composed = compose_execute(&chain, Rc::new(BaseExecute));

        let input = ExecuteInput { headers: Headers::new(), arguments: vec![] };
        let result = block_on(Box::pin(async move { composed.call(input).await }));
        assert!(result.is_ok());
        assert_eq!(*log.borrow(), vec!["before", "before", "after", "after"]);
    }
}
