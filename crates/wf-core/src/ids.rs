// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types: sequence numbers, scope indices, and the run id.
//!
//! Sequence numbers are drawn from one monotonic stream shared by every
//! command kind and are serialized as decimal strings in
//! `timerId`/`activityId` wire fields.

use serde::{Deserialize, Serialize};
use std::num::ParseIntError;

/// Monotonically increasing identity for timers, activities, external
/// calls, and signal completions. `0` is a valid, ordinary sequence number
/// (the root scope reserves index `0` in [`crate::scope::ScopeTree`], a
/// separate number space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeqNum(pub u64);

impl SeqNum {
    pub const ZERO: SeqNum = SeqNum(0);

    /// Returns the next sequence number without mutating `self`.
    pub fn next(self) -> SeqNum {
        SeqNum(self.0 + 1)
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SeqNum {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(SeqNum)
    }
}

impl Serialize for SeqNum {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SeqNum {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map(SeqNum).map_err(serde::de::Error::custom)
    }
}

/// Wire identifier for a timer: the decimal string form of a [`SeqNum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub SeqNum);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire identifier for an activity: the decimal string form of a [`SeqNum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub SeqNum);

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a node in the cancellation scope tree. `0` is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScopeIdx(pub u32);

impl ScopeIdx {
    pub const ROOT: ScopeIdx = ScopeIdx(0);

    pub fn is_root(self) -> bool {
        self == ScopeIdx::ROOT
    }

    pub fn next(self) -> ScopeIdx {
        ScopeIdx(self.0 + 1)
    }
}

impl std::fmt::Display for ScopeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Host-assigned identifier for the workflow run, carried on the activation
/// and echoed back on the completion. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        RunId(s.to_string())
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        RunId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_num_parses_decimal_round_trip() {
        let seq = SeqNum(42);
        let s = seq.to_string();
        assert_eq!(s, "42");
        assert_eq!(s.parse::<SeqNum>().unwrap(), seq);
    }

    #[test]
    fn seq_num_rejects_non_decimal() {
        assert!("abc".parse::<SeqNum>().is_err());
    }

    #[test]
    fn seq_num_json_round_trips_as_string() {
        let timer_id = TimerId(SeqNum(7));
        let json = serde_json::to_string(&timer_id).unwrap();
        assert_eq!(json, "\"7\"");
        let back: TimerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, timer_id);
    }

    #[test]
    fn scope_idx_root_is_zero() {
        assert_eq!(ScopeIdx::ROOT.0, 0);
        assert!(ScopeIdx::ROOT.is_root());
        assert!(!ScopeIdx::ROOT.next().is_root());
    }
}
