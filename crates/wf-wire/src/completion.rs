// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound activation-completion wire type.
//!
//! Failures *during* activation processing are never encoded here — they
//! are re-raised to the host for run disposition. The only
//! core-encoded completion shape is the successful one: a run id plus the
//! drained command buffer.

use serde::{Deserialize, Serialize};
use wf_core::{Command, RunId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationCompletion {
    pub run_id: RunId,
    pub commands: Vec<Command>,
}

impl ActivationCompletion {
    pub fn new(run_id: RunId, commands: Vec<Command>) -> Self {
        Self { run_id, commands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_empty_commands() {
        let completion = ActivationCompletion::new(RunId::from("run-1"), vec![]);
        let json = serde_json::to_string(&completion).unwrap();
        let back: ActivationCompletion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, completion);
    }
}
