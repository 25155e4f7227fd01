// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The completion table: `seq -> {scope, kind}`, keyed by the
//! one monotonic sequence stream shared by timers, activities, and awaited
//! external calls. The actual `resolve`/`reject` closures live with the
//! engine's future slab in `wf-engine`; this table only tracks which scope
//! owns a pending sequence number and what kind of wait it is, which is
//! enough to drive cancellation fan-out and completion-hygiene checks.

use crate::error::WfError;
use crate::ids::{ScopeIdx, SeqNum};
use std::collections::HashMap;

/// What a pending completion slot is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Timer,
    Activity,
    ExternalCall,
}

/// A pending completion: the scope that owns it, and what it's waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSlot {
    pub scope: ScopeIdx,
    pub kind: CompletionKind,
}

/// `seq -> CompletionSlot` map. Entries are inserted when user code opens a
/// timer, activity, or awaited external call, and removed when the engine
/// receives the matching resolution job.
#[derive(Debug, Default)]
pub struct CompletionTable {
    slots: HashMap<SeqNum, CompletionSlot>,
}

impl CompletionTable {
    pub fn new() -> Self {
        Self { slots: HashMap::new() }
    }

    pub fn insert(&mut self, seq: SeqNum, scope: ScopeIdx, kind: CompletionKind) {
        self.slots.insert(seq, CompletionSlot { scope, kind });
    }

    /// Remove and return the slot for `seq`. Fails with `IllegalState` if
    /// the activation refers to an unknown sequence number.
    pub fn consume(&mut self, seq: SeqNum) -> Result<CompletionSlot, WfError> {
        self.slots
            .remove(&seq)
            .ok_or_else(|| WfError::illegal_state(format!("no pending completion for seq {seq}")))
    }

    pub fn get(&self, seq: SeqNum) -> Option<&CompletionSlot> {
        self.slots.get(&seq)
    }

    pub fn contains(&self, seq: SeqNum) -> bool {
        self.slots.contains_key(&seq)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every pending sequence number belonging to `scope`, in arbitrary
    /// order — used when fanning out a cancellation to find what a scope
    /// is waiting on.
    pub fn pending_for_scope(&self, scope: ScopeIdx) -> Vec<SeqNum> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.scope == scope)
            .map(|(seq, _)| *seq)
            .collect()
    }
}
