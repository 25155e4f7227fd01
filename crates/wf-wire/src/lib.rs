// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wf-wire: activation/completion wire types and length-delimited codec.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod activation;
mod codec;
mod completion;
mod external;

pub use activation::{Activation, ActivationJob, ActivityResolution, Headers};
pub use codec::{decode, encode, read_message, write_message, ProtocolError, MAX_MESSAGE_BYTES};
pub use completion::ActivationCompletion;
pub use external::{ExternalDependencyResult, ExternalOutcome};
