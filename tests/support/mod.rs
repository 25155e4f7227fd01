// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario and
//! property test binaries: small
//! [`Workflow`] implementations and the activation/engine plumbing to drive
//! them without a real host.

#![allow(dead_code)]

use async_trait::async_trait;
use std::rc::Rc;
use wf_core::{Command, Payload, RunId, WfError};
use wf_engine::{DependencyRegistry, Engine, EngineInit, Workflow, WorkflowContext, WorkflowHandlers};
use wf_wire::{Activation, ActivationCompletion, ActivationJob, Headers};

pub fn one_job_activation(job: ActivationJob) -> Activation {
    jobs_activation(vec![job])
}

pub fn jobs_activation(jobs: Vec<ActivationJob>) -> Activation {
    Activation { run_id: RunId::from("run-1"), timestamp_ms: 1_700_000_000_000, is_replaying: false, jobs }
}

pub fn start_workflow_job() -> ActivationJob {
    ActivationJob::StartWorkflow { headers: Headers::new(), arguments: Vec::new() }
}

/// Build a fresh engine around `workflow`, with no registered dependencies
/// or interceptors unless `handlers` supplies signal/query handlers.
pub fn init_engine(workflow: Rc<dyn Workflow>, handlers: WorkflowHandlers) -> Rc<Engine> {
    Engine::init(EngineInit {
        run_id: RunId::from("run-1"),
        workflow_id: "wf-1".to_string(),
        workflow_type: "TestWorkflow".to_string(),
        task_queue: "default".to_string(),
        start_time_ms: 1_700_000_000_000,
        randomness_seed: b"deterministic-seed".to_vec(),
        workflow,
        handlers,
        dependencies: DependencyRegistry::new(),
        inbound_interceptors: Vec::new(),
        outbound_interceptors: Vec::new(),
    })
}

/// Run `conclude` and unwrap the `Complete` branch — every scenario here
/// resolves with no outstanding external-dependency calls.
pub fn conclude_commands(engine: &Engine) -> Vec<Command> {
    match engine.conclude().expect("conclude failed") {
        wf_engine::Conclusion::Complete(bytes) => {
            let completion: ActivationCompletion = wf_wire::decode(&bytes).expect("decode completion failed");
            completion.commands
        }
        wf_engine::Conclusion::Pending(calls) => {
            panic!("expected a complete conclusion, got pending external calls: {calls:?}")
        }
    }
}

/// Awaits a single timer for `ms` and returns `Payload::binary_null()`.
pub struct SleepWorkflow {
    pub ms: u64,
}

#[async_trait(?Send)]
impl Workflow for SleepWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        ctx.sleep(self.ms).await?;
        Ok(Payload::binary_null())
    }
}

/// Starts a timer and cancels it before ever awaiting it.
pub struct CancelImmediateWorkflow {
    pub ms: u64,
}

#[async_trait(?Send)]
impl Workflow for CancelImmediateWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        let timer = ctx.start_timer(self.ms)?;
        timer.cancel()?;
        Ok(Payload::binary_null())
    }
}

/// Starts a long timer T0 and a short timer T1; once T1 fires, cancels T0.
pub struct CancelWithDelayWorkflow {
    pub long_ms: u64,
    pub short_ms: u64,
}

#[async_trait(?Send)]
impl Workflow for CancelWithDelayWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        let t0 = ctx.start_timer(self.long_ms)?;
        let t1 = ctx.start_timer(self.short_ms)?;
        t1.await?;
        t0.cancel()?;
        Ok(Payload::binary_null())
    }
}

/// Schedules one activity and awaits it, propagating whatever it resolves
/// to (including a `Cancellation` if the run is cancelled out from under
/// it) straight out of `main`.
pub struct ActivityWorkflow {
    pub activity_type: &'static str,
}

#[async_trait(?Send)]
impl Workflow for ActivityWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        let activity = ctx.schedule_activity(self.activity_type, Vec::new(), Headers::new())?;
        activity.await
    }
}

/// Starts `count` timers back to back (never awaiting any of them) and
/// completes immediately — enough to exercise sequence allocation without
/// any suspension.
pub struct ManyTimersWorkflow {
    pub count: u32,
}

#[async_trait(?Send)]
impl Workflow for ManyTimersWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        for i in 0..self.count {
            ctx.start_timer(u64::from(i) + 1)?;
        }
        Ok(Payload::binary_null())
    }
}

/// Starts two timers in sequence, awaiting each in turn before completing
/// — three dispatcher-visible jobs (`startWorkflow`, two `fireTimer`s) that
/// can be delivered across any number of activation batches.
pub struct TwoTimersInSequenceWorkflow;

#[async_trait(?Send)]
impl Workflow for TwoTimersInSequenceWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        ctx.sleep(10).await?;
        ctx.sleep(10).await?;
        Ok(Payload::binary_null())
    }
}

/// Returns immediately with no suspension at all.
pub struct ImmediateWorkflow;

#[async_trait(?Send)]
impl Workflow for ImmediateWorkflow {
    async fn main(&self, _ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        Ok(Payload::binary_null())
    }
}

/// Opens a cancellable scope around a timer that would otherwise sleep
/// forever, then cancels it before the scope's body ever gets a chance to
/// run, and surfaces whatever the scope's future resolves to as the
/// workflow's own result (`Payload::binary_null()` if it was the expected
/// `Cancellation`, an error otherwise).
pub struct CancelScopeImmediateWorkflow {
    pub ms: u64,
}

#[async_trait(?Send)]
impl Workflow for CancelScopeImmediateWorkflow {
    async fn main(&self, ctx: WorkflowContext, _arguments: Vec<Payload>) -> Result<Payload, WfError> {
        let ms = self.ms;
        let (handle, fut) = ctx.cancellable_scope::<_, ()>(move |child| async move {
            child.sleep(ms).await?;
            Ok(())
        })?;
        handle.cancel()?;
        match fut.await {
            Err(WfError::Cancellation { .. }) => Ok(Payload::binary_null()),
            other => Err(WfError::user_code(format!("expected the scope to reject with Cancellation, got {other:?}"))),
        }
    }
}
