// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error type: the core's four kinds (`wf_core::WfError`) plus
//! the one engine-specific failure mode, a malformed activation payload.

use thiserror::Error;
use wf_core::WfError;
use wf_wire::ProtocolError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] WfError),

    #[error("failed to decode activation: {0}")]
    Protocol(#[from] ProtocolError),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Core(e) => e.is_fatal(),
            EngineError::Protocol(_) => true,
        }
    }
}
