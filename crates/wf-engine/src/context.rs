// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkflowContext`: the handle user code
//! actually calls — timers, activities, external dependencies, and
//! cancellable scopes, all routed through the engine these futures close
//! over. Cloned cheaply (an `Rc` and a scope index) whenever a handler
//! spawns a nested continuation.

use crate::engine::Engine;
use crate::future::{Cancellable, WithScope};
use crate::info::WorkflowInfo;
use crate::interceptor::{ScheduleActivityInput, StartTimerInput};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use wf_core::{Payload, ScopeIdx, WfError};
use wf_wire::Headers;

#[derive(Clone)]
pub struct WorkflowContext {
    engine: Rc<Engine>,
    scope: ScopeIdx,
}

impl WorkflowContext {
    pub(crate) fn new(engine: Rc<Engine>, scope: ScopeIdx) -> Self {
        Self { engine, scope }
    }

    // ---- ambient shims --------------------------------

    pub fn now_ms(&self) -> Result<i64, WfError> {
        self.engine.now_ms()
    }

    pub fn random(&self) -> f64 {
        self.engine.random()
    }

    pub fn info(&self) -> Result<WorkflowInfo, WfError> {
        self.engine.info()
    }

    /// Always fails: workflow code may not hold weak references.
    pub fn weak_ref(&self) -> Result<std::convert::Infallible, WfError> {
        crate::shims::weak_ref_banned()
    }

    // ---- timers ----------------------------------------------

    pub fn start_timer(&self, start_to_fire_timeout_ms: u64) -> Result<TimerHandle, WfError> {
        let seq = self.engine.start_timer_chain().call(StartTimerInput { start_to_fire_timeout_ms })?;
        let scope = self.engine.scope_of(seq)?;
        let fut = self.engine.timer_future(seq)?;
        let slot = self.engine.cancel_slot_for(scope)?;
        let cancellable = Cancellable::new(async move { Ok(fut.await) }, slot);
        Ok(TimerHandle {
            engine: self.engine.clone(),
            scope,
            inner: WithScope::new(scope, self.engine.scope_stack(), cancellable),
        })
    }

    pub async fn sleep(&self, ms: u64) -> Result<(), WfError> {
        self.start_timer(ms)?.await
    }

    // ---- activities ------------------------------------------

    pub fn schedule_activity(
        &self,
        activity_type: impl Into<String>,
        arguments: Vec<Payload>,
        headers: Headers,
    ) -> Result<ActivityHandle, WfError> {
        let input = ScheduleActivityInput { activity_type: activity_type.into(), arguments, headers };
        let seq = self.engine.schedule_activity_chain().call(input)?;
        let scope = self.engine.scope_of(seq)?;
        let fut = self.engine.activity_future(seq)?;
        let slot = self.engine.cancel_slot_for(scope)?;
        let cancellable = Cancellable::new(async move { fut.await }, slot);
        Ok(ActivityHandle {
            engine: self.engine.clone(),
            scope,
            inner: WithScope::new(scope, self.engine.scope_stack(), cancellable),
        })
    }

    // ---- cancellable scopes -----------------------------------

    /// Open a new cancellation scope under the current one, run `body`
    /// inside it, and return a handle that can `requestCancel` it alongside
    /// the future that resolves (or rejects with `Cancellation`) when the
    /// body does.
    pub fn cancellable_scope<Fut, T>(
        &self,
        body: impl FnOnce(WorkflowContext) -> Fut,
    ) -> Result<(CancelHandle, impl Future<Output = Result<T, WfError>>), WfError>
    where
        Fut: Future<Output = Result<T, WfError>> + 'static,
        T: 'static,
    {
        let scope = self.engine.open_user_scope(self.scope)?;
        let slot = self.engine.cancel_slot_for(scope)?;
        let child_ctx = WorkflowContext::new(self.engine.clone(), scope);
        let wrapped = WithScope::new(scope, self.engine.scope_stack(), Cancellable::new(body(child_ctx), slot));
        let handle = CancelHandle { engine: self.engine.clone(), scope };
        let engine = self.engine.clone();
        let fut = async move {
            let result = wrapped.await;
            engine.detach_scope(scope);
            result
        };
        Ok((handle, fut))
    }

    // ---- external dependencies --------------------------------

    pub fn call_external_sync(&self, iface_name: &str, fn_name: &str, args: &[Payload]) -> Result<Payload, WfError> {
        self.engine.call_sync(iface_name, fn_name, args)
    }

    pub fn call_external_ignored(&self, iface_name: &str, fn_name: &str, args: Vec<Payload>) -> Result<(), WfError> {
        self.engine.call_async_ignored(iface_name, fn_name, args)
    }

    pub async fn call_external_awaited(
        &self,
        iface_name: &str,
        fn_name: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, WfError> {
        let (seq, fut) = self.engine.call_async_awaited(iface_name, fn_name, args)?;
        let scope = self.engine.scope_of(seq)?;
        WithScope::new(scope, self.engine.scope_stack(), fut).await
    }
}

/// A started timer. `await` it to suspend until it fires (or rejects with
/// `Cancellation` if a `completeCancel` fan-out reaches its scope first);
/// `cancel` it to emit `cancelTimer` directly — clearing a timer is a
/// synchronous wire action, not a completeCancel-style rejection.
pub struct TimerHandle {
    engine: Rc<Engine>,
    scope: ScopeIdx,
    inner: WithScope<Result<(), WfError>>,
}

impl TimerHandle {
    pub fn cancel(self) -> Result<(), WfError> {
        let seq = self.engine.scope_seq(self.scope)?;
        self.engine.clear_timer(seq)
    }
}

impl Future for TimerHandle {
    type Output = Result<(), WfError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WfError>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll(cx);
        if poll.is_ready() {
            this.engine.detach_scope(this.scope);
        }
        poll
    }
}

/// A scheduled activity. `await` it to suspend until it
/// resolves; `cancel` it to requestCancel its scope, which the next poll
/// observes as `Err(WfError::Cancellation)`.
pub struct ActivityHandle {
    engine: Rc<Engine>,
    scope: ScopeIdx,
    inner: WithScope<Result<Payload, WfError>>,
}

impl ActivityHandle {
    pub fn cancel(&self) -> Result<(), WfError> {
        self.engine.request_cancel(self.scope)
    }
}

impl Future for ActivityHandle {
    type Output = Result<Payload, WfError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Payload, WfError>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll(cx);
        if poll.is_ready() {
            this.engine.detach_scope(this.scope);
        }
        poll
    }
}

/// Handle returned by [`WorkflowContext::cancellable_scope`]: the only way
/// to `requestCancel` a scope opened this way.
pub struct CancelHandle {
    engine: Rc<Engine>,
    scope: ScopeIdx,
}

impl CancelHandle {
    pub fn cancel(&self) -> Result<(), WfError> {
        self.engine.request_cancel(self.scope)
    }
}
