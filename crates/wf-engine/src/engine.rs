// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine singleton: one instance per workflow
//! run, owning every piece of mutable state the rest of this crate only
//! describes the shape of. Ties together the scope tree, completion table,
//! command buffer, external-dependency bridge, and interceptor chains into
//! the activation dispatcher and concluder.
//!
//! Built with [`Rc::new_cyclic`] so the outbound/inbound interceptor chains
//! — which need to call back into the engine to actually start a timer or
//! run the workflow entry point — can hold a [`Weak`] reference instead of
//! needing a second init phase.

use crate::bridge::{Dependency, DependencyRegistry, PendingExternalCall};
use crate::context::WorkflowContext;
use crate::executor::Executor;
use crate::future::{new_shared, resolve_shared, CancelSlot, CompletionFuture, Shared};
use crate::info::WorkflowInfo;
use crate::interceptor::{
    compose_execute, compose_handle_signal, compose_schedule_activity, compose_start_timer, ExecuteInput,
    ExecuteNext, HandleSignalNext, InboundInterceptor, OutboundInterceptor, ScheduleActivityInput,
    ScheduleActivityNext, SignalInput, StartTimerInput, StartTimerNext,
};
use crate::workflow::{Workflow, WorkflowHandlers};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use wf_core::{
    ActivityId, CancellationSource, Command, CommandBuffer, CompletionKind, CompletionTable, DataConverter,
    JsonConverter, Payload, RunId, ScopeIdx, ScopeKind, ScopeTree, SeqNum, TimerId, WfError, WorkflowClock,
};
use wf_wire::{
    Activation, ActivationCompletion, ActivationJob, ActivityResolution, ExternalDependencyResult, ExternalOutcome,
    Headers,
};

/// What a pending sequence number's resolver actually does when fired.
/// Parallel to [`wf_core::CompletionTable`], which only tracks the owning
/// scope and kind — this is the half that lives in `wf-engine` because it
/// closes over futures.
enum Resolver {
    Timer(Shared<()>),
    Activity(Shared<Result<Payload, WfError>>),
    External(Shared<Result<Payload, WfError>>),
}

/// Tunables and collaborators an embedding host supplies at run start,
/// passed as an explicit struct rather than ambient globals.
pub struct EngineInit {
    pub run_id: RunId,
    pub workflow_id: String,
    pub workflow_type: String,
    pub task_queue: String,
    pub start_time_ms: i64,
    pub randomness_seed: Vec<u8>,
    pub workflow: Rc<dyn Workflow>,
    pub handlers: WorkflowHandlers,
    pub dependencies: DependencyRegistry,
    pub inbound_interceptors: Vec<Rc<dyn InboundInterceptor>>,
    pub outbound_interceptors: Vec<Rc<dyn OutboundInterceptor>>,
}

/// Result of [`Engine::conclude`].
#[derive(Debug)]
pub enum Conclusion {
    /// Drained external-dependency requests; the host must deliver results
    /// via [`Engine::resolve_external_dependencies`] before the run can
    /// conclude successfully.
    Pending(Vec<PendingExternalCall>),
    /// Length-delimited-ready encoded `WFActivationCompletion` bytes.
    Complete(Vec<u8>),
}

/// Outcome of dispatching a single job`).
#[derive(Debug)]
pub struct ActivateOutcome {
    pub processed: bool,
    pub pending_external_calls: Vec<PendingExternalCall>,
}

pub struct Engine {
    run_id: RunId,
    scopes: RefCell<ScopeTree>,
    scope_stack: crate::future::ScopeStack,
    completions: RefCell<CompletionTable>,
    resolvers: RefCell<HashMap<SeqNum, Resolver>>,
    cancel_slots: RefCell<HashMap<ScopeIdx, CancelSlot>>,
    commands: RefCell<CommandBuffer>,
    pending_external: RefCell<Vec<PendingExternalCall>>,
    dependencies: DependencyRegistry,
    clock: WorkflowClock,
    rng: RefCell<wf_core::AleaRng>,
    next_seq: Cell<SeqNum>,
    completed: Cell<bool>,
    cancelled: Cell<bool>,
    info: RefCell<Option<WorkflowInfo>>,
    handlers: WorkflowHandlers,
    workflow: Rc<dyn Workflow>,
    executor: Executor,
    converter: JsonConverter,
    start_timer_chain: Rc<dyn StartTimerNext>,
    schedule_activity_chain: Rc<dyn ScheduleActivityNext>,
    execute_chain: Rc<dyn ExecuteNext>,
    handle_signal_chain: Rc<dyn HandleSignalNext>,
}

struct TimerBase {
    engine: Weak<Engine>,
}

impl StartTimerNext for TimerBase {
    fn call(&self, input: StartTimerInput) -> Result<SeqNum, WfError> {
        let engine = self.engine.upgrade().ok_or_else(|| WfError::illegal_state("engine dropped"))?;
        engine.emit_start_timer(input.start_to_fire_timeout_ms)
    }
}

struct ActivityBase {
    engine: Weak<Engine>,
}

impl ScheduleActivityNext for ActivityBase {
    fn call(&self, input: ScheduleActivityInput) -> Result<SeqNum, WfError> {
        let engine = self.engine.upgrade().ok_or_else(|| WfError::illegal_state("engine dropped"))?;
        engine.emit_schedule_activity(input)
    }
}

struct ExecuteBase {
    engine: Weak<Engine>,
}

#[async_trait(?Send)]
impl ExecuteNext for ExecuteBase {
    async fn call(&self, input: ExecuteInput) -> Result<Payload, WfError> {
        let engine = self.engine.upgrade().ok_or_else(|| WfError::illegal_state("engine dropped"))?;
        let root = engine.scopes.borrow().root();
        let ctx = WorkflowContext::new(engine.clone(), root);
        engine.workflow.main(ctx, input.arguments).await
    }
}

struct SignalBase {
    engine: Weak<Engine>,
}

#[async_trait(?Send)]
impl HandleSignalNext for SignalBase {
    async fn call(&self, input: SignalInput) -> Result<(), WfError> {
        let engine = self.engine.upgrade().ok_or_else(|| WfError::illegal_state("engine dropped"))?;
        let handler = engine
            .handlers
            .signal(&input.signal_name)
            .ok_or_else(|| WfError::user_code(format!("no signal handler registered for '{}'", input.signal_name)))?;
        let root = engine.scopes.borrow().root();
        let ctx = WorkflowContext::new(engine.clone(), root);
        handler(ctx, input.input).await
    }
}

/// Converts a caught error into the message carried on `failWorkflowExecution`
/// / `respondToQuery.failedWithMessage`.
fn failure_message(err: &WfError) -> String {
    match err {
        WfError::UserCodeFailure { message } => message.clone(),
        WfError::Cancellation { source } => format!("workflow cancelled ({source})"),
        WfError::DeterminismViolation(msg) => format!("determinism violation: {msg}"),
        WfError::IllegalState(msg) => format!("illegal state: {msg}"),
    }
}

impl Engine {
    pub fn init(init: EngineInit) -> Rc<Engine> {
        Rc::new_cyclic(|weak| {
            let scopes = ScopeTree::new();
            let root = scopes.root();
            let scope_stack = crate::future::ScopeStack::new(root);
            let info = WorkflowInfo::new(
                init.workflow_id,
                init.run_id.clone(),
                init.workflow_type,
                init.task_queue,
                init.start_time_ms,
            );

            let start_timer_chain =
                compose_start_timer(&init.outbound_interceptors, Rc::new(TimerBase { engine: weak.clone() }));
            let schedule_activity_chain = compose_schedule_activity(
                &init.outbound_interceptors,
                Rc::new(ActivityBase { engine: weak.clone() }),
            );
            let execute_chain =
                compose_execute(&init.inbound_interceptors, Rc::new(ExecuteBase { engine: weak.clone() }));
            let handle_signal_chain =
                compose_handle_signal(&init.inbound_interceptors, Rc::new(SignalBase { engine: weak.clone() }));

            Engine {
                run_id: init.run_id,
                scopes: RefCell::new(scopes),
                scope_stack,
                completions: RefCell::new(CompletionTable::new()),
                resolvers: RefCell::new(HashMap::new()),
                cancel_slots: RefCell::new(HashMap::new()),
                commands: RefCell::new(CommandBuffer::new()),
                pending_external: RefCell::new(Vec::new()),
                dependencies: init.dependencies,
                clock: WorkflowClock::new(),
                rng: RefCell::new(wf_core::AleaRng::seeded(&init.randomness_seed)),
                next_seq: Cell::new(SeqNum::ZERO),
                completed: Cell::new(false),
                cancelled: Cell::new(false),
                info: RefCell::new(Some(info)),
                handlers: init.handlers,
                workflow: init.workflow,
                executor: Executor::new(),
                converter: JsonConverter,
                start_timer_chain,
                schedule_activity_chain,
                execute_chain,
                handle_signal_chain,
            }
        })
    }

    // ---- ambient shims --------------------------------

    pub fn now_ms(&self) -> Result<i64, WfError> {
        self.clock.now_ms()
    }

    pub fn random(&self) -> f64 {
        self.rng.borrow_mut().next()
    }

    pub fn info(&self) -> Result<WorkflowInfo, WfError> {
        self.info.borrow().clone().ok_or_else(|| WfError::illegal_state("workflow info not initialized"))
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub fn scope_stack_depth(&self) -> usize {
        self.scope_stack.depth()
    }

    pub fn completion_table_len(&self) -> usize {
        self.completions.borrow().len()
    }

    pub fn commands_snapshot(&self) -> Vec<Command> {
        self.commands.borrow().as_slice().to_vec()
    }

    fn alloc_seq(&self) -> SeqNum {
        let seq = self.next_seq.get();
        self.next_seq.set(seq.next());
        seq
    }

    pub(crate) fn current_scope(&self) -> Result<ScopeIdx, WfError> {
        self.scope_stack.current()
    }

    pub(crate) fn scope_stack(&self) -> crate::future::ScopeStack {
        self.scope_stack.clone()
    }

    pub(crate) fn push_command(&self, command: Command) {
        tracing::debug!(command = command.name(), "emit command");
        self.commands.borrow_mut().push(command);
    }

    pub(crate) fn scope_of(&self, seq: SeqNum) -> Result<ScopeIdx, WfError> {
        self.completions
            .borrow()
            .get(seq)
            .map(|slot| slot.scope)
            .ok_or_else(|| WfError::illegal_state(format!("no completion for seq {seq}")))
    }

    /// The pending sequence number owned by `scope`, for the direct
    /// `clearTimeout` path where the caller only has a
    /// [`ScopeIdx`] in hand.
    pub(crate) fn scope_seq(&self, scope: ScopeIdx) -> Result<SeqNum, WfError> {
        self.completions
            .borrow()
            .pending_for_scope(scope)
            .into_iter()
            .next()
            .ok_or_else(|| WfError::illegal_state(format!("no pending completion for {scope}")))
    }

    pub(crate) fn timer_future(&self, seq: SeqNum) -> Result<CompletionFuture<()>, WfError> {
        match self.resolvers.borrow().get(&seq) {
            Some(Resolver::Timer(shared)) => Ok(CompletionFuture::new(shared.clone())),
            _ => Err(WfError::illegal_state(format!("no timer resolver for seq {seq}"))),
        }
    }

    pub(crate) fn activity_future(&self, seq: SeqNum) -> Result<CompletionFuture<Result<Payload, WfError>>, WfError> {
        match self.resolvers.borrow().get(&seq) {
            Some(Resolver::Activity(shared)) => Ok(CompletionFuture::new(shared.clone())),
            _ => Err(WfError::illegal_state(format!("no activity resolver for seq {seq}"))),
        }
    }

    pub(crate) fn cancel_slot_for(&self, scope: ScopeIdx) -> Result<CancelSlot, WfError> {
        self.cancel_slots
            .borrow()
            .get(&scope)
            .cloned()
            .ok_or_else(|| WfError::illegal_state(format!("no cancel slot registered for {scope}")))
    }

    pub(crate) fn detach_scope(&self, idx: ScopeIdx) {
        if let Ok(Some(parent)) = self.scopes.borrow().parent_of(idx) {
            let _ = self.scopes.borrow_mut().detach(parent, idx);
        }
    }

    pub(crate) fn open_user_scope(&self, parent: ScopeIdx) -> Result<ScopeIdx, WfError> {
        let scope = self.scopes.borrow_mut().open(ScopeKind::Scope, parent)?;
        self.scopes.borrow_mut().mark_associated(scope)?;
        self.cancel_slots.borrow_mut().insert(scope, CancelSlot::new());
        Ok(scope)
    }

    // ---- outbound-chain terminal actions --------------

    fn emit_start_timer(&self, ms: u64) -> Result<SeqNum, WfError> {
        let parent = self.current_scope()?;
        let scope = self.scopes.borrow_mut().open(ScopeKind::Timer, parent)?;
        self.scopes.borrow_mut().mark_associated(scope)?;
        let seq = self.alloc_seq();
        self.completions.borrow_mut().insert(seq, scope, CompletionKind::Timer);
        self.resolvers.borrow_mut().insert(seq, Resolver::Timer(new_shared()));
        self.cancel_slots.borrow_mut().insert(scope, CancelSlot::new());
        self.push_command(Command::StartTimer { timer_id: TimerId(seq), start_to_fire_timeout_ms: ms });
        Ok(seq)
    }

    fn emit_schedule_activity(&self, input: ScheduleActivityInput) -> Result<SeqNum, WfError> {
        let parent = self.current_scope()?;
        let scope = self.scopes.borrow_mut().open(ScopeKind::Activity, parent)?;
        self.scopes.borrow_mut().mark_associated(scope)?;
        let seq = self.alloc_seq();
        self.completions.borrow_mut().insert(seq, scope, CompletionKind::Activity);
        self.resolvers.borrow_mut().insert(seq, Resolver::Activity(new_shared()));
        self.cancel_slots.borrow_mut().insert(scope, CancelSlot::new());
        self.push_command(Command::ScheduleActivity {
            activity_id: ActivityId(seq),
            activity_type: input.activity_type,
            arguments: input.arguments,
            headers: input.headers,
        });
        Ok(seq)
    }

    pub(crate) fn start_timer_chain(&self) -> Rc<dyn StartTimerNext> {
        self.start_timer_chain.clone()
    }

    pub(crate) fn schedule_activity_chain(&self) -> Rc<dyn ScheduleActivityNext> {
        self.schedule_activity_chain.clone()
    }

    /// Consume a pending timer's completion/resolver and emit `cancelTimer`,
    /// without detaching its scope. Used during cancellation fan-out, where
    /// the scope must stay attached long enough for `complete_cancel` to
    /// find and trigger its `CancelSlot` afterward.
    fn cancel_pending_timer(&self, seq: SeqNum) -> Result<(), WfError> {
        self.completions.borrow_mut().consume(seq)?;
        self.resolvers.borrow_mut().remove(&seq);
        self.alloc_seq(); // discarded; preserves sequence parity across branches
        self.push_command(Command::CancelTimer { timer_id: TimerId(seq) });
        Ok(())
    }

    /// Direct `clearTimeout`: as [`Engine::cancel_pending_timer`], but also
    /// detaches the scope immediately — correct here because the caller is
    /// dropping its `TimerHandle` and nothing will ever poll it again to do
    /// so later.
    pub(crate) fn clear_timer(&self, seq: SeqNum) -> Result<(), WfError> {
        let scope = self.scope_of(seq)?;
        self.cancel_pending_timer(seq)?;
        self.detach_scope(scope);
        Ok(())
    }

    // ---- cancellation ---------------------------------------

    /// A plain user-opened scope has no host round trip to wait on, so
    /// cancelling one both emits whatever outbound commands its pending
    /// timers/activities need *and* rejects its own bound future right
    /// away. An activity scope only gets the outbound
    /// `requestCancelActivity`; its future stays pending until the host
    /// confirms via `resolveActivity{Canceled}`.
    pub(crate) fn request_cancel(&self, idx: ScopeIdx) -> Result<(), WfError> {
        self.scopes.borrow().request_cancel(idx)?;
        self.emit_cancel_commands(idx, false)?;
        if self.scopes.borrow().kind_of(idx)? == ScopeKind::Scope {
            self.complete_cancel(idx, CancellationSource::Internal)?;
        }
        Ok(())
    }

    /// Fan out the kind-appropriate outbound command (`cancelTimer` /
    /// `requestCancelActivity`) for every pending completion under `idx`,
    /// `idx` included. Shared by [`Engine::request_cancel`] (guarded against
    /// the root) and `cancelWorkflow` (which targets the root directly and
    /// so cannot go through that guard).
    ///
    /// A timer scope's completion is always consumed right away — the host
    /// never sends a confirmation for `cancelTimer` the way it does for an
    /// activity. `terminal` is set only for a host-authoritative whole-run
    /// cancel (`cancelWorkflow`), where there is no later `resolveActivity`
    /// coming either, so the activity's completion must be consumed here
    /// too; a plain `request_cancel` on a single scope still waits for that
    /// round trip before `handle_resolve_activity` consumes it.
    fn emit_cancel_commands(&self, idx: ScopeIdx, terminal: bool) -> Result<(), WfError> {
        let order = self.scopes.borrow().cancellation_order(idx)?;
        for scope in order {
            let kind = self.scopes.borrow().kind_of(scope)?;
            let seqs = self.completions.borrow().pending_for_scope(scope);
            for seq in seqs {
                match kind {
                    ScopeKind::Timer => {
                        let _ = self.cancel_pending_timer(seq);
                    }
                    ScopeKind::Activity => {
                        self.push_command(Command::RequestCancelActivity { activity_id: ActivityId(seq) });
                        if terminal {
                            let _ = self.completions.borrow_mut().consume(seq);
                            self.resolvers.borrow_mut().remove(&seq);
                        }
                    }
                    ScopeKind::Scope => {}
                }
            }
        }
        Ok(())
    }

    pub(crate) fn complete_cancel(&self, idx: ScopeIdx, source: CancellationSource) -> Result<(), WfError> {
        let order = self.scopes.borrow().cancellation_order(idx)?;
        for scope in order {
            if let Some(slot) = self.cancel_slots.borrow().get(&scope).cloned() {
                slot.trigger(WfError::cancellation(source));
            }
        }
        Ok(())
    }

    // ---- external-dependency bridge --------------------------

    pub(crate) fn call_sync(&self, iface: &str, func: &str, args: &[Payload]) -> Result<Payload, WfError> {
        match self.dependencies.lookup(iface, func)? {
            Dependency::Sync(f) => f(args),
            _ => Err(WfError::illegal_state(format!("{iface}.{func} is not a sync dependency"))),
        }
    }

    pub(crate) fn call_async_ignored(&self, iface: &str, func: &str, args: Vec<Payload>) -> Result<(), WfError> {
        match self.dependencies.lookup(iface, func)? {
            Dependency::AsyncIgnored => {
                self.pending_external.borrow_mut().push(PendingExternalCall {
                    iface_name: iface.to_string(),
                    fn_name: func.to_string(),
                    args,
                    seq: None,
                });
                Ok(())
            }
            _ => Err(WfError::illegal_state(format!("{iface}.{func} is not an async-ignored dependency"))),
        }
    }

    pub(crate) fn call_async_awaited(
        &self,
        iface: &str,
        func: &str,
        args: Vec<Payload>,
    ) -> Result<(SeqNum, CompletionFuture<Result<Payload, WfError>>), WfError> {
        match self.dependencies.lookup(iface, func)? {
            Dependency::AsyncAwaited => {
                let scope = self.current_scope()?;
                let seq = self.alloc_seq();
                self.completions.borrow_mut().insert(seq, scope, CompletionKind::ExternalCall);
                let shared = new_shared();
                self.resolvers.borrow_mut().insert(seq, Resolver::External(shared.clone()));
                self.pending_external.borrow_mut().push(PendingExternalCall {
                    iface_name: iface.to_string(),
                    fn_name: func.to_string(),
                    args,
                    seq: Some(seq),
                });
                Ok((seq, CompletionFuture::new(shared)))
            }
            _ => Err(WfError::illegal_state(format!("{iface}.{func} is not an async-awaited dependency"))),
        }
    }

    pub fn inject(&self, iface_name: impl Into<String>, fn_name: impl Into<String>, dependency: Dependency) {
        self.dependencies.inject(iface_name, fn_name, dependency);
    }

    // ---- activation dispatcher -------------------------------

    fn set_replaying(&self, is_replaying: bool) -> Result<(), WfError> {
        let mut info = self.info.borrow_mut();
        let info = info.as_mut().ok_or_else(|| WfError::illegal_state("workflow info not initialized"))?;
        info.is_replaying = is_replaying;
        Ok(())
    }

    fn dispatch_job(self: &Rc<Self>, job: ActivationJob) -> Result<bool, WfError> {
        if matches!(job, ActivationJob::RemoveFromCache) {
            return Err(WfError::illegal_state("removeFromCache must not reach the in-sandbox core"));
        }
        if self.completed.get() && !job.is_query() {
            tracing::debug!(run_id = %self.run_id, job = job.name(), "skipping job on completed workflow");
            return Ok(false);
        }
        tracing::debug!(run_id = %self.run_id, job = job.name(), "dispatching job");
        match job {
            ActivationJob::StartWorkflow { headers, arguments } => self.handle_start_workflow(headers, arguments),
            ActivationJob::CancelWorkflow => self.handle_cancel_workflow(),
            ActivationJob::FireTimer { timer_id } => self.handle_fire_timer(timer_id),
            ActivationJob::ResolveActivity { activity_id, result } => {
                self.handle_resolve_activity(activity_id, result)
            }
            ActivationJob::QueryWorkflow { query_id, query_type, arguments } => {
                self.handle_query(query_id, query_type, arguments)
            }
            ActivationJob::SignalWorkflow { signal_name, input } => self.handle_signal(signal_name, input),
            ActivationJob::UpdateRandomSeed { randomness_seed } => {
                self.rng.borrow_mut().reseed(&randomness_seed);
                Ok(())
            }
            ActivationJob::RemoveFromCache => unreachable!("rejected above"),
        }?;
        Ok(true)
    }

    fn handle_start_workflow(self: &Rc<Self>, headers: Headers, arguments: Vec<Payload>) -> Result<(), WfError> {
        tracing::info!(run_id = %self.run_id, "starting workflow");
        let engine = self.clone();
        let chain = self.execute_chain.clone();
        let input = ExecuteInput { headers, arguments };
        self.executor.spawn(async move {
            match chain.call(input).await {
                Ok(result) => {
                    tracing::info!(run_id = %engine.run_id, "workflow completed");
                    engine.completed.set(true);
                    engine.push_command(Command::CompleteWorkflowExecution { result });
                }
                Err(err) => {
                    tracing::error!(run_id = %engine.run_id, error = %err, "workflow failed");
                    engine.completed.set(true);
                    engine.push_command(Command::FailWorkflowExecution { message: failure_message(&err) });
                }
            }
        });
        Ok(())
    }

    /// `cancelWorkflow` targets the root directly, so it cannot go through
    /// the user-facing [`Engine::request_cancel`] guard (the root can never
    /// be requestCancel'd from user code). It is host-authoritative — there
    /// is no further round trip to wait on — so it both tells the host to
    /// drop any outstanding timers/activities and immediately rejects every
    /// awaiting continuation under the root.
    fn handle_cancel_workflow(&self) -> Result<(), WfError> {
        tracing::warn!(run_id = %self.run_id, "workflow cancelled by host");
        self.cancelled.set(true);
        let root = self.scopes.borrow().root();
        self.emit_cancel_commands(root, true)?;
        self.complete_cancel(root, CancellationSource::External)
    }

    fn handle_fire_timer(&self, timer_id: TimerId) -> Result<(), WfError> {
        let seq = timer_id.0;
        let slot = self.completions.borrow_mut().consume(seq)?;
        let resolver = self
            .resolvers
            .borrow_mut()
            .remove(&seq)
            .ok_or_else(|| WfError::illegal_state(format!("no resolver for timer seq {seq}")))?;
        match resolver {
            Resolver::Timer(shared) => resolve_shared(&shared, ()),
            _ => return Err(WfError::illegal_state(format!("seq {seq} is not a timer"))),
        }
        self.detach_scope(slot.scope);
        Ok(())
    }

    fn handle_resolve_activity(&self, activity_id: ActivityId, result: ActivityResolution) -> Result<(), WfError> {
        let seq = activity_id.0;
        let slot = self.completions.borrow_mut().consume(seq)?;
        let resolver = self
            .resolvers
            .borrow_mut()
            .remove(&seq)
            .ok_or_else(|| WfError::illegal_state(format!("no resolver for activity seq {seq}")))?;
        let shared = match resolver {
            Resolver::Activity(shared) => shared,
            _ => return Err(WfError::illegal_state(format!("seq {seq} is not an activity"))),
        };
        match result {
            ActivityResolution::Completed { result: payload } => {
                if self.converter.from_payload::<serde_json::Value>(&payload).is_err() {
                    resolve_shared(
                        &shared,
                        Err(WfError::user_code(format!("activity result payload for seq {seq} failed to decode"))),
                    );
                } else {
                    resolve_shared(&shared, Ok(payload));
                }
            }
            ActivityResolution::Failed { message } => {
                resolve_shared(&shared, Err(WfError::user_code(message)));
            }
            ActivityResolution::Canceled => {
                self.complete_cancel(slot.scope, CancellationSource::Internal)?;
            }
        }
        self.detach_scope(slot.scope);
        Ok(())
    }

    fn handle_query(self: &Rc<Self>, query_id: String, query_type: String, arguments: Vec<Payload>) -> Result<(), WfError> {
        match self.handlers.query(&query_type) {
            None => self.push_command(Command::RespondToQueryFailed {
                query_id,
                message: format!("no query handler registered for '{query_type}'"),
            }),
            Some(handler) => {
                let engine = self.clone();
                let root = self.scopes.borrow().root();
                let ctx = WorkflowContext::new(self.clone(), root);
                self.executor.spawn(async move {
                    match handler(ctx, arguments).await {
                        Ok(response) => engine.push_command(Command::RespondToQuerySucceeded { query_id, response }),
                        Err(err) => engine.push_command(Command::RespondToQueryFailed {
                            query_id,
                            message: failure_message(&err),
                        }),
                    }
                });
            }
        }
        Ok(())
    }

    fn handle_signal(self: &Rc<Self>, signal_name: String, input: Vec<Payload>) -> Result<(), WfError> {
        let engine = self.clone();
        let chain = self.handle_signal_chain.clone();
        let signal_input = SignalInput { signal_name, input };
        self.executor.spawn(async move {
            if let Err(err) = chain.call(signal_input).await {
                engine.completed.set(true);
                engine.push_command(Command::FailWorkflowExecution { message: failure_message(&err) });
            }
        });
        Ok(())
    }

    /// Dispatch a single job within `activation` and drain microtasks to
    /// quiescence`).
    pub fn activate_job(self: &Rc<Self>, activation: &Activation, job_index: usize) -> Result<ActivateOutcome, WfError> {
        let job = activation
            .jobs
            .get(job_index)
            .cloned()
            .ok_or_else(|| WfError::illegal_state(format!("job index {job_index} out of range")))?;
        self.clock.set(activation.timestamp_ms);
        self.set_replaying(activation.is_replaying)?;
        let processed = self.dispatch_job(job)?;
        self.executor.run_until_quiescent();
        let pending = self.pending_external.borrow().clone();
        Ok(ActivateOutcome { processed, pending_external_calls: pending })
    }

    /// Convenience for driving an entire activation's jobs in order — what
    /// a host normally does by calling `activate_job` once per index.
    pub fn activate(self: &Rc<Self>, activation: Activation) -> Result<Vec<ActivateOutcome>, WfError> {
        let mut outcomes = Vec::with_capacity(activation.jobs.len());
        for idx in 0..activation.jobs.len() {
            outcomes.push(self.activate_job(&activation, idx)?);
        }
        Ok(outcomes)
    }

    // ---- concluder -------------------------------------------

    pub fn conclude(&self) -> Result<Conclusion, WfError> {
        let pending = std::mem::take(&mut *self.pending_external.borrow_mut());
        if !pending.is_empty() {
            return Ok(Conclusion::Pending(pending));
        }
        let commands = self.commands.borrow_mut().drain();
        let completion = ActivationCompletion::new(self.run_id.clone(), commands);
        let encoded = wf_wire::encode(&completion).map_err(|e| WfError::illegal_state(e.to_string()))?;
        Ok(Conclusion::Complete(encoded))
    }

    pub fn resolve_external_dependencies(&self, results: Vec<ExternalDependencyResult>) -> Result<(), WfError> {
        for r in results {
            self.completions.borrow_mut().consume(r.seq)?;
            let resolver = self
                .resolvers
                .borrow_mut()
                .remove(&r.seq)
                .ok_or_else(|| WfError::illegal_state(format!("no pending external call for seq {}", r.seq)))?;
            let shared = match resolver {
                Resolver::External(shared) => shared,
                _ => return Err(WfError::illegal_state(format!("seq {} is not an external call", r.seq))),
            };
            match r.outcome {
                ExternalOutcome::Resolved { result } => resolve_shared(&shared, Ok(result)),
                ExternalOutcome::Rejected { error } => resolve_shared(&shared, Err(WfError::user_code(error))),
            }
        }
        self.executor.run_until_quiescent();
        Ok(())
    }
}
