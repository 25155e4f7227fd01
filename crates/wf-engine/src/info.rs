// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkflowInfo`: the read-only surface workflow/signal/query handlers
//! consult for facts about the run they're executing in.

use wf_core::RunId;

/// Static-at-init plus per-activation-updated facts about the run the
/// engine is driving. Cheap to clone; handlers get a snapshot, not a live
/// handle into engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInfo {
    pub workflow_id: String,
    pub run_id: RunId,
    pub workflow_type: String,
    pub task_queue: String,
    /// Updated on every dispatched job, not just once
    /// per activation.
    pub is_replaying: bool,
    pub start_time_ms: i64,
}

impl WorkflowInfo {
    pub fn new(
        workflow_id: impl Into<String>,
        run_id: RunId,
        workflow_type: impl Into<String>,
        task_queue: impl Into<String>,
        start_time_ms: i64,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id,
            workflow_type: workflow_type.into(),
            task_queue: task_queue.into(),
            is_replaying: false,
            start_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_info_starts_out_not_replaying() {
        let info = WorkflowInfo::new("wf-1", RunId::from("run-1"), "MyWorkflow", "default", 0);
        assert!(!info.is_replaying);
    }
}
