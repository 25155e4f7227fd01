// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow lifecycle surface: the user-supplied entry
//! point, signal handlers, and query handlers the dispatcher drives.

use crate::context::WorkflowContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use wf_core::{Payload, WfError};

/// The workflow's `main` entry point, invoked once per run on
/// `startWorkflow`.
#[async_trait(?Send)]
pub trait Workflow {
    async fn main(&self, ctx: WorkflowContext, arguments: Vec<Payload>) -> Result<Payload, WfError>;
}

pub type SignalHandler =
    Rc<dyn Fn(WorkflowContext, Vec<Payload>) -> Pin<Box<dyn Future<Output = Result<(), WfError>>>>>;

pub type QueryHandler =
    Rc<dyn Fn(WorkflowContext, Vec<Payload>) -> Pin<Box<dyn Future<Output = Result<Payload, WfError>>>>>;

/// `workflow.signals` / `workflow.queries`: name-keyed handler
/// tables looked up by `signalWorkflow`/`queryWorkflow` jobs.
#[derive(Default)]
pub struct WorkflowHandlers {
    signals: HashMap<String, SignalHandler>,
    queries: HashMap<String, QueryHandler>,
}

impl WorkflowHandlers {
    pub fn new() -> Self {
        Self { signals: HashMap::new(), queries: HashMap::new() }
    }

    pub fn on_signal(&mut self, name: impl Into<String>, handler: SignalHandler) {
        self.signals.insert(name.into(), handler);
    }

    pub fn on_query(&mut self, name: impl Into<String>, handler: QueryHandler) {
        self.queries.insert(name.into(), handler);
    }

    pub fn signal(&self, name: &str) -> Option<SignalHandler> {
        self.signals.get(name).cloned()
    }

    pub fn query(&self, name: &str) -> Option<QueryHandler> {
        self.queries.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_signal_name_looks_up_as_none() {
        let handlers = WorkflowHandlers::new();
        assert!(handlers.signal("fail").is_none());
    }

    #[test]
    fn registered_query_can_be_looked_up_by_name() {
        let mut handlers = WorkflowHandlers::new();
        handlers.on_query("status", Rc::new(|_ctx, _args| Box::pin(async { Ok(Payload::binary_null()) })));
        assert!(handlers.query("status").is_some());
        assert!(handlers.query("missing").is_none());
    }
}
