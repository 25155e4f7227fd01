// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External-dependency bridge: the only sanctioned channel for
//! non-deterministic operations (metrics, logging, anything host-side)
//! from inside user code.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wf_core::{Payload, SeqNum, WfError};

/// How a registered dependency function is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Dispatched immediately in-sandbox; the return value comes back
    /// synchronously.
    Sync,
    /// Crosses the activation boundary: the engine allocates a sequence
    /// number, records a completion, and the call resolves when a matching
    /// external result arrives.
    AsyncAwaited,
    /// Fire-and-forget: enqueued with no sequence number, result discarded.
    AsyncIgnored,
}

pub type SyncDependencyFn = Rc<dyn Fn(&[Payload]) -> Result<Payload, WfError>>;

/// A registered host function, keyed by `(ifaceName, fnName)`.
#[derive(Clone)]
pub enum Dependency {
    Sync(SyncDependencyFn),
    AsyncAwaited,
    AsyncIgnored,
}

impl Dependency {
    pub fn apply_mode(&self) -> ApplyMode {
        match self {
            Dependency::Sync(_) => ApplyMode::Sync,
            Dependency::AsyncAwaited => ApplyMode::AsyncAwaited,
            Dependency::AsyncIgnored => ApplyMode::AsyncIgnored,
        }
    }
}

/// Host-populated table of injectable dependency functions.
#[derive(Default)]
pub struct DependencyRegistry {
    entries: RefCell<HashMap<(String, String), Dependency>>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self { entries: RefCell::new(HashMap::new()) }
    }

    pub fn inject(&self, iface_name: impl Into<String>, fn_name: impl Into<String>, dependency: Dependency) {
        self.entries.borrow_mut().insert((iface_name.into(), fn_name.into()), dependency);
    }

    pub fn lookup(&self, iface_name: &str, fn_name: &str) -> Result<Dependency, WfError> {
        self.entries
            .borrow()
            .get(&(iface_name.to_string(), fn_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                WfError::illegal_state(format!("no dependency registered for {iface_name}.{fn_name}"))
            })
    }
}

/// An outbound request queued while awaiting the host (`AsyncAwaited`) or
/// fired and forgotten (`AsyncIgnored`); drained by the concluder.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExternalCall {
    pub iface_name: String,
    pub fn_name: String,
    pub args: Vec<Payload>,
    pub seq: Option<SeqNum>,
}
