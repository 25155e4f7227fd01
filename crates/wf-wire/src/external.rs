// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shape for `resolveExternalDependencies` results: the
//! host's answer to a previously queued `AsyncAwaited` external-dependency
//! call, keyed by the sequence number the engine allocated for it.

use serde::{Deserialize, Serialize};
use wf_core::{Payload, SeqNum};

/// One resolved (or failed) external-dependency call, as delivered by
/// `resolveExternalDependencies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDependencyResult {
    pub seq: SeqNum,
    #[serde(flatten)]
    pub outcome: ExternalOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ExternalOutcome {
    Resolved { result: Payload },
    Rejected { error: String },
}
