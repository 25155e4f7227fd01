// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cancellation scope tree, represented as an arena.
//!
//! Pure structure only: parent/child relationships, the `associated` flag,
//! and cancellation fan-out order. Actually *acting* on a cancellation —
//! emitting a `cancelTimer`/`requestCancelActivity` command, rejecting a
//! waiting continuation — is the engine's job; this module only tells it
//! which scopes are affected and in what order.

use crate::error::WfError;
use crate::ids::ScopeIdx;
use std::collections::BTreeSet;

/// The kind of region a scope governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// A plain cancellation scope opened by user code.
    Scope,
    /// The region spanning a scheduled activity's lifetime.
    Activity,
    /// The region spanning a started timer's lifetime.
    Timer,
}

/// A single node of the cancellation tree.
#[derive(Debug, Clone)]
pub struct Scope {
    pub idx: ScopeIdx,
    pub kind: ScopeKind,
    pub parent: Option<ScopeIdx>,
    /// Set once a continuation has bound to this scope.
    pub associated: bool,
}

/// Arena of scopes keyed by their monotonic [`ScopeIdx`], plus the
/// parent-to-children index needed for cancellation fan-out.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    children: Vec<BTreeSet<ScopeIdx>>,
    next_idx: ScopeIdx,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a fresh tree with only the root scope, index `0`.
    pub fn new() -> Self {
        let root = Scope { idx: ScopeIdx::ROOT, kind: ScopeKind::Scope, parent: None, associated: false };
        Self { scopes: vec![root], children: vec![BTreeSet::new()], next_idx: ScopeIdx::ROOT.next() }
    }

    pub fn root(&self) -> ScopeIdx {
        ScopeIdx::ROOT
    }

    fn slot(&self, idx: ScopeIdx) -> Result<&Scope, WfError> {
        self.scopes
            .get(idx.0 as usize)
            .ok_or_else(|| WfError::illegal_state(format!("unknown scope {idx}")))
    }

    fn slot_mut(&mut self, idx: ScopeIdx) -> Result<&mut Scope, WfError> {
        self.scopes
            .get_mut(idx.0 as usize)
            .ok_or_else(|| WfError::illegal_state(format!("unknown scope {idx}")))
    }

    pub fn get(&self, idx: ScopeIdx) -> Result<&Scope, WfError> {
        self.slot(idx)
    }

    /// Open a new scope of `kind` under `parent`. Returns the new scope's
    /// index. Corresponds to step 1 of `openScope`; starting
    /// and binding the governing future is the caller's job.
    pub fn open(&mut self, kind: ScopeKind, parent: ScopeIdx) -> Result<ScopeIdx, WfError> {
        self.slot(parent)?;
        let idx = self.next_idx;
        self.next_idx = self.next_idx.next();
        self.scopes.push(Scope { idx, kind, parent: Some(parent), associated: false });
        self.children.push(BTreeSet::new());
        self.children[parent.0 as usize].insert(idx);
        Ok(idx)
    }

    /// Mark a scope as bound to a continuation.
    pub fn mark_associated(&mut self, idx: ScopeIdx) -> Result<(), WfError> {
        self.slot_mut(idx)?.associated = true;
        Ok(())
    }

    pub fn is_associated(&self, idx: ScopeIdx) -> Result<bool, WfError> {
        Ok(self.slot(idx)?.associated)
    }

    pub fn parent_of(&self, idx: ScopeIdx) -> Result<Option<ScopeIdx>, WfError> {
        Ok(self.slot(idx)?.parent)
    }

    pub fn kind_of(&self, idx: ScopeIdx) -> Result<ScopeKind, WfError> {
        Ok(self.slot(idx)?.kind)
    }

    /// Remove `child` from `parent`'s child set, as happens when the
    /// child's governing continuation resolves.
    pub fn detach(&mut self, parent: ScopeIdx, child: ScopeIdx) -> Result<(), WfError> {
        self.slot(parent)?;
        self.children[parent.0 as usize].remove(&child);
        Ok(())
    }

    pub fn children_of(&self, idx: ScopeIdx) -> Result<&BTreeSet<ScopeIdx>, WfError> {
        self.slot(idx)?;
        Ok(&self.children[idx.0 as usize])
    }

    /// Request cancellation of `idx`. The root scope can never be
    /// requestCancel'd from user code.
    pub fn request_cancel(&self, idx: ScopeIdx) -> Result<(), WfError> {
        self.slot(idx)?;
        if idx.is_root() {
            return Err(WfError::illegal_state("root scope cannot be cancelled from user code"));
        }
        Ok(())
    }

    /// Depth-first fan-out order for a completeCancel on `idx`: every
    /// descendant before `idx` itself, so children reject before their
    /// parent does.
    pub fn cancellation_order(&self, idx: ScopeIdx) -> Result<Vec<ScopeIdx>, WfError> {
        self.slot(idx)?;
        let mut order = Vec::new();
        self.collect_descendants(idx, &mut order)?;
        order.push(idx);
        Ok(order)
    }

    fn collect_descendants(&self, idx: ScopeIdx, out: &mut Vec<ScopeIdx>) -> Result<(), WfError> {
        for &child in self.children_of(idx)? {
            self.collect_descendants(child, out)?;
            out.push(child);
        }
        Ok(())
    }
}
