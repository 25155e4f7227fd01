// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The weak-reference ban: the one ambient shim that isn't
//! backed by engine state, because its entire job is to refuse to exist.
//!
//! Clock and randomness are served straight off [`wf_core::WorkflowClock`]
//! and [`wf_core::AleaRng`]; timeouts are full engine operations and live
//! on [`crate::engine::Engine`] itself (they need the completion table and
//! command buffer). This module only carries the determinism guard that
//! has nowhere else to live.

use wf_core::WfError;

/// Stand-in for constructing any weak-reference primitive (`WeakRef`,
/// `FinalizationRegistry`, ...) from workflow code. Always fails: letting a
/// workflow observe when the garbage collector reclaims something would
/// couple replay to non-deterministic memory pressure.
pub fn weak_ref_banned() -> Result<std::convert::Infallible, WfError> {
    Err(WfError::determinism("weak references are not permitted in workflow code"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_ref_always_fails_with_determinism_violation() {
        assert!(matches!(weak_ref_banned(), Err(WfError::DeterminismViolation(_))));
    }
}
