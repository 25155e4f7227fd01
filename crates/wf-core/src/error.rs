// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The four error kinds of the workflow execution core.

use thiserror::Error;

/// Where a cancellation originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationSource {
    /// User code called `requestCancel` on a scope it owns.
    Internal,
    /// The host delivered a `cancelWorkflow` job.
    External,
}

impl std::fmt::Display for CancellationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CancellationSource::Internal => "internal",
            CancellationSource::External => "external",
        })
    }
}

/// The four error kinds the core can raise.
///
/// `DeterminismViolation` and `IllegalState` are fatal and are never caught
/// inside the core; they propagate to the host. `Cancellation` is
/// recoverable by user code. `UserCodeFailure` is converted to a wire
/// failure and never propagated as a Rust panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WfError {
    /// User code attempted a non-deterministic operation (weak refs, direct
    /// wall-clock reads, reading time before `init`, etc).
    #[error("determinism violation: {0}")]
    DeterminismViolation(String),

    /// An engine invariant was violated: completion missing, no scope on the
    /// stack, activation arrived before init, `removeFromCache` reached the
    /// sandbox, or a sequence number failed to parse.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A scope was cancelled; carries source attribution. May be caught by
    /// user code and does not by itself terminate the workflow.
    #[error("cancelled ({source})")]
    Cancellation { source: CancellationSource },

    /// An error raised from user code (workflow entry, signal handler, query
    /// handler). Converted to a wire failure before leaving the core.
    #[error("user code failure: {message}")]
    UserCodeFailure { message: String },
}

impl WfError {
    pub fn determinism(msg: impl Into<String>) -> Self {
        WfError::DeterminismViolation(msg.into())
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        WfError::IllegalState(msg.into())
    }

    pub fn cancellation(source: CancellationSource) -> Self {
        WfError::Cancellation { source }
    }

    pub fn user_code(msg: impl Into<String>) -> Self {
        WfError::UserCodeFailure { message: msg.into() }
    }

    /// True for the two fatal kinds that the core never catches.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WfError::DeterminismViolation(_) | WfError::IllegalState(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, WfError::Cancellation { .. })
    }

    /// Convert any user-code-originated error into a wire failure message.
    pub fn to_user_code_failure(message: impl std::fmt::Display) -> Self {
        WfError::user_code(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds_are_determinism_and_illegal_state() {
        assert!(WfError::determinism("weak ref").is_fatal());
        assert!(WfError::illegal_state("missing completion").is_fatal());
        assert!(!WfError::cancellation(CancellationSource::Internal).is_fatal());
        assert!(!WfError::user_code("boom").is_fatal());
    }

    #[test]
    fn cancellation_source_displays_lowercase() {
        assert_eq!(CancellationSource::Internal.to_string(), "internal");
        assert_eq!(CancellationSource::External.to_string(), "external");
    }
}
