// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound activation wire types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wf_core::{ActivityId, Payload, RunId, TimerId};

/// Header values attached to a workflow invocation or signal, carried
/// opaquely through the core to interceptors.
pub type Headers = HashMap<String, Payload>;

/// An outcome reported back for a previously scheduled activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ActivityResolution {
    Completed { result: Payload },
    Failed { message: String },
    Canceled,
}

/// One job within an activation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivationJob {
    StartWorkflow {
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: Headers,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<Payload>,
    },

    CancelWorkflow,

    FireTimer { timer_id: TimerId },

    ResolveActivity { activity_id: ActivityId, result: ActivityResolution },

    QueryWorkflow {
        query_id: String,
        query_type: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<Payload>,
    },

    SignalWorkflow {
        signal_name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        input: Vec<Payload>,
    },

    UpdateRandomSeed { randomness_seed: Vec<u8> },

    /// Must never reach the in-sandbox core; receiving one is
    /// an `IllegalState`. Still has to round-trip on the wire so the
    /// activator can detect and reject it.
    RemoveFromCache,
}

impl ActivationJob {
    pub fn name(&self) -> &'static str {
        match self {
            ActivationJob::StartWorkflow { .. } => "start_workflow",
            ActivationJob::CancelWorkflow => "cancel_workflow",
            ActivationJob::FireTimer { .. } => "fire_timer",
            ActivationJob::ResolveActivity { .. } => "resolve_activity",
            ActivationJob::QueryWorkflow { .. } => "query_workflow",
            ActivationJob::SignalWorkflow { .. } => "signal_workflow",
            ActivationJob::UpdateRandomSeed { .. } => "update_random_seed",
            ActivationJob::RemoveFromCache => "remove_from_cache",
        }
    }

    /// Queries are serviceable on a completed workflow; every other job is
    /// skipped once the run has concluded.
    pub fn is_query(&self) -> bool {
        matches!(self, ActivationJob::QueryWorkflow { .. })
    }
}

/// A batch of jobs delivered for one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    pub run_id: RunId,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub is_replaying: bool,
    pub jobs: Vec<ActivationJob>,
}
