// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scope-tracking future wrapper.
//!
//! The target runtime has no promise-lifecycle hook to intercept, so the
//! core instruments its own awaitable primitive instead: [`WithScope`]
//! threads `currentScope` through every suspension by pushing it onto the
//! [`ScopeStack`] before each poll and popping it after, regardless of
//! whether that poll returns `Ready` or `Pending`. Every engine-exposed
//! async operation (timer, activity, external call) is built on top of
//! this and [`CompletionFuture`]; user code has no other way to suspend.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use wf_core::{ScopeIdx, WfError};

/// The active-scope stack. Top of stack is the scope that owns whichever
/// continuation is currently running; it is never empty once the engine
/// has been initialized (the root scope sits at the bottom).
#[derive(Debug, Clone)]
pub struct ScopeStack(Rc<RefCell<Vec<ScopeIdx>>>);

impl ScopeStack {
    pub fn new(root: ScopeIdx) -> Self {
        Self(Rc::new(RefCell::new(vec![root])))
    }

    pub fn push(&self, scope: ScopeIdx) {
        self.0.borrow_mut().push(scope);
    }

    /// Pop the top of the stack. A no-op past the root — callers only pop
    /// what they pushed, so this should never actually fire in practice,
    /// but popping the sentinel root would violate the "never empty"
    /// invariant other code relies on.
    pub fn pop(&self) {
        let mut stack = self.0.borrow_mut();
        if stack.len() > 1 {
            stack.pop();
        }
    }

    pub fn current(&self) -> Result<ScopeIdx, WfError> {
        self.0
            .borrow()
            .last()
            .copied()
            .ok_or_else(|| WfError::illegal_state("scope stack is empty"))
    }

    /// Depth, for the "scope balance" invariant test: after a
    /// `conclude`, this must be exactly 1 (just the root).
    pub fn depth(&self) -> usize {
        self.0.borrow().len()
    }
}

/// Shared cell between a [`CompletionFuture`] and whatever resolves it —
/// the dispatcher, on `fireTimer`/`resolveActivity`/an external result.
#[derive(Debug)]
struct SharedState<T> {
    value: Option<T>,
    waker: Option<Waker>,
}

pub type Shared<T> = Rc<RefCell<SharedState<T>>>;

pub fn new_shared<T>() -> Shared<T> {
    Rc::new(RefCell::new(SharedState { value: None, waker: None }))
}

/// Deliver `value` to a pending [`CompletionFuture`], waking it if it has
/// already been polled.
pub fn resolve_shared<T>(shared: &Shared<T>, value: T) {
    let waker = {
        let mut state = shared.borrow_mut();
        state.value = Some(value);
        state.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// The leaf future every suspension in this engine eventually bottoms out
/// on: a cell that some dispatcher call fills in later.
#[derive(Debug)]
pub struct CompletionFuture<T> {
    shared: Shared<T>,
}

impl<T> CompletionFuture<T> {
    pub fn new(shared: Shared<T>) -> Self {
        Self { shared }
    }
}

impl<T: Unpin> Future for CompletionFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.shared.borrow_mut();
        if let Some(value) = state.value.take() {
            return Poll::Ready(value);
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Wraps any future so that every poll is bracketed by a scope-stack
/// push/pop, matching the `before`/`after` hook semantics of the original
/// promise-lifecycle hook this wrapper replaces.
pub struct WithScope<T> {
    inner: Pin<Box<dyn Future<Output = T>>>,
    scope: ScopeIdx,
    stack: ScopeStack,
}

impl<T> WithScope<T> {
    pub fn new(scope: ScopeIdx, stack: ScopeStack, inner: impl Future<Output = T> + 'static) -> Self {
        Self { inner: Box::pin(inner), scope, stack }
    }
}

impl<T> Future for WithScope<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        // `Pin<Box<dyn Future>>` is always `Unpin`, and every other field
        // is `Copy`/`Rc`-backed, so `WithScope<T>` is `Unpin` too — no
        // projection, no `unsafe`.
        let this = self.get_mut();
        this.stack.push(this.scope);
        let poll = this.inner.as_mut().poll(cx);
        this.stack.pop();
        poll
    }
}

/// A one-shot, externally-triggerable rejection slot shared between a
/// scope and every [`Cancellable`] future bound to it. Standing in for the
/// "reject the scope's bound promise" half of `completeCancel` (spec
/// §4.4): Rust futures can't be rejected from the outside the way a JS
/// promise can, so the wrapper checks this slot on every poll instead.
///
/// Mirrors [`SharedState`]'s waker bookkeeping: a bare "armed" flag isn't
/// enough, since arming it doesn't by itself cause the parked task's
/// executor to look at it again. [`Cancellable`] registers its waker here
/// on every pending poll so [`CancelSlot::trigger`] can wake it.
#[derive(Debug)]
struct CancelSlotState {
    error: Option<WfError>,
    waker: Option<Waker>,
}

#[derive(Debug, Clone)]
pub struct CancelSlot(Rc<RefCell<CancelSlotState>>);

impl CancelSlot {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(CancelSlotState { error: None, waker: None })))
    }

    /// Arm the slot with the cancellation error to deliver on the next
    /// poll, and wake whatever task last parked on it. Idempotent past the
    /// first call — a scope is only cancelled once.
    pub fn trigger(&self, err: WfError) {
        let waker = {
            let mut state = self.0.borrow_mut();
            if state.error.is_none() {
                state.error = Some(err);
            }
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn take(&self) -> Option<WfError> {
        self.0.borrow_mut().error.take()
    }

    fn register(&self, waker: &Waker) {
        self.0.borrow_mut().waker = Some(waker.clone());
    }
}

impl Default for CancelSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a fallible future so that an armed [`CancelSlot`] short-circuits
/// the next poll with `Err(WfError::Cancellation)` instead of delegating
/// to the inner future. Not observable until that next scheduling point —
/// cancellation is never visible mid-poll.
pub struct Cancellable<T> {
    inner: Pin<Box<dyn Future<Output = Result<T, WfError>>>>,
    slot: CancelSlot,
}

impl<T> Cancellable<T> {
    pub fn new(inner: impl Future<Output = Result<T, WfError>> + 'static, slot: CancelSlot) -> Self {
        Self { inner: Box::pin(inner), slot }
    }
}

impl<T> Future for Cancellable<T> {
    type Output = Result<T, WfError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T, WfError>> {
        let this = self.get_mut();
        if let Some(err) = this.slot.take() {
            return Poll::Ready(Err(err));
        }
        this.slot.register(cx.waker());
        this.inner.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::task::Wake;
    use wf_core::CancellationSource;

    struct NoopWake;
    impl Wake for NoopWake {
        fn wake(self: Arc<Self>) {}
        fn wake_by_ref(self: &Arc<Self>) {}
    }

    fn noop_waker() -> Waker {
        Waker::from(Arc::new(NoopWake))
    }

    #[test]
    fn completion_future_is_pending_until_resolved() {
        let shared = new_shared::<u32>();
        let mut fut = CompletionFuture::new(shared.clone());
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Pending);
        resolve_shared(&shared, 7);
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Ready(7));
    }

    #[test]
    fn with_scope_pushes_and_pops_around_poll() {
        let stack = ScopeStack::new(ScopeIdx::ROOT);
        let shared = new_shared::<()>();
        let child = ScopeIdx::ROOT.next();
        let mut fut = WithScope::new(child, stack.clone(), CompletionFuture::new(shared.clone()));

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(stack.depth(), 1);
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Pending);
        // popped back down after the poll returns
        assert_eq!(stack.depth(), 1);

        resolve_shared(&shared, ());
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Ready(()));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn cancellable_short_circuits_on_next_poll_once_triggered() {
        let shared = new_shared::<u32>();
        let slot = CancelSlot::new();
        let mut fut = Cancellable::new(
            {
                let shared = shared.clone();
                async move { Ok(CompletionFuture::new(shared).await) }
            },
            slot.clone(),
        );
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Pending);

        slot.trigger(WfError::cancellation(CancellationSource::Internal));
        match Pin::new(&mut fut).poll(&mut cx) {
            Poll::Ready(Err(WfError::Cancellation { source: CancellationSource::Internal })) => {}
            other => panic!("expected immediate cancellation, got {other:?}"),
        }
    }

    #[test]
    fn cancellable_passes_through_when_never_triggered() {
        let slot = CancelSlot::new();
        let mut fut = Cancellable::new(async { Ok::<u32, WfError>(9) }, slot);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Ready(Ok(9)));
    }
}
