// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound commands produced by user code during an activation.

use crate::ids::{ActivityId, TimerId};
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single outbound instruction queued in the command buffer and drained
/// on `conclude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Start a timer; consumes the next sequence number.
    StartTimer {
        timer_id: TimerId,
        start_to_fire_timeout_ms: u64,
    },

    /// Cancel a previously started timer. Still consumes a sequence number
    /// even when emitted for a timer that was never actually scheduled with
    /// the host, to preserve sequence parity.
    CancelTimer { timer_id: TimerId },

    /// Schedule an activity for execution by the worker-level executor.
    ScheduleActivity {
        activity_id: ActivityId,
        activity_type: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<Payload>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, Payload>,
    },

    /// Request cancellation of a previously scheduled activity.
    RequestCancelActivity { activity_id: ActivityId },

    /// Respond to a query with a successful result.
    RespondToQuerySucceeded { query_id: String, response: Payload },

    /// Respond to a query with a failure message.
    RespondToQueryFailed { query_id: String, message: String },

    /// Terminal success: the workflow's entry point returned normally.
    CompleteWorkflowExecution { result: Payload },

    /// Terminal failure: the workflow's entry point threw, or a signal
    /// handler threw.
    FailWorkflowExecution { message: String },
}

impl Command {
    /// Command name for log spans.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartTimer { .. } => "start_timer",
            Command::CancelTimer { .. } => "cancel_timer",
            Command::ScheduleActivity { .. } => "schedule_activity",
            Command::RequestCancelActivity { .. } => "request_cancel_activity",
            Command::RespondToQuerySucceeded { .. } => "respond_to_query_succeeded",
            Command::RespondToQueryFailed { .. } => "respond_to_query_failed",
            Command::CompleteWorkflowExecution { .. } => "complete_workflow_execution",
            Command::FailWorkflowExecution { .. } => "fail_workflow_execution",
        }
    }

    /// True for the two commands that end the workflow run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Command::CompleteWorkflowExecution { .. } | Command::FailWorkflowExecution { .. }
        )
    }
}

/// Ordered outbound command queue, drained whole on `conclude`.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Drain every queued command in insertion order, leaving the buffer
    /// empty.
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn as_slice(&self) -> &[Command] {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SeqNum;

    #[test]
    fn drain_empties_in_insertion_order() {
        let mut buf = CommandBuffer::new();
        buf.push(Command::StartTimer {
            timer_id: TimerId(SeqNum(0)),
            start_to_fire_timeout_ms: 100,
        });
        buf.push(Command::CancelTimer { timer_id: TimerId(SeqNum(0)) });
        assert_eq!(buf.len(), 2);

        let drained = buf.drain();
        assert!(buf.is_empty());
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name(), "start_timer");
        assert_eq!(drained[1].name(), "cancel_timer");
    }

    #[test]
    fn terminal_commands_are_flagged() {
        assert!(Command::CompleteWorkflowExecution { result: Payload::binary_null() }.is_terminal());
        assert!(Command::FailWorkflowExecution { message: "boom".into() }.is_terminal());
        assert!(!Command::CancelTimer { timer_id: TimerId(SeqNum(0)) }.is_terminal());
    }
}
