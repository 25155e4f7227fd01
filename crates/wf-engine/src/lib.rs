// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-engine: the single-threaded deterministic replay engine built on
//! `wf-core`'s data model and `wf-wire`'s activation/completion wire types.
//!
//! Owns everything `wf-core` deliberately leaves out — resolver closures,
//! the cooperative task scheduler, the interceptor chains, and the
//! activation dispatcher/concluder that ties them together into one
//! `Engine` per workflow run.

mod bridge;
mod context;
mod engine;
mod error;
mod executor;
mod future;
mod info;
mod interceptor;
mod shims;
mod workflow;

pub use bridge::{ApplyMode, Dependency, DependencyRegistry, PendingExternalCall, SyncDependencyFn};
pub use context::{ActivityHandle, CancelHandle, TimerHandle, WorkflowContext};
pub use engine::{ActivateOutcome, Conclusion, Engine, EngineInit};
pub use error::EngineError;
pub use info::WorkflowInfo;
pub use interceptor::{
    ExecuteInput, ExecuteNext, HandleSignalNext, InboundInterceptor, OutboundInterceptor, ScheduleActivityInput,
    ScheduleActivityNext, SignalInput, StartTimerInput, StartTimerNext,
};
pub use shims::weak_ref_banned;
pub use workflow::{QueryHandler, SignalHandler, Workflow, WorkflowHandlers};
