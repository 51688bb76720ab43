//! Observation hooks for statement walking.
//!
//! A [`Trace`] sees each statement of the final pass together with the state
//! before and after it. Intermediate loop iterations are not traced.

use crate::ast::NodeId;
use crate::state::State;

pub trait Trace {
    fn enter(&mut self, _node: NodeId, _state: &State) {}
    fn leave(&mut self, _node: NodeId, _state: &State) {}
}

/// Ignores everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoTrace;

impl Trace for NoTrace {}

/// Logs every step at `trace` level.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogTrace;

impl Trace for LogTrace {
    fn enter(&mut self, node: NodeId, state: &State) {
        log::trace!("enter {}: {}", node, state);
    }

    fn leave(&mut self, node: NodeId, state: &State) {
        log::trace!("leave {}: {}", node, state);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub node: NodeId,
    pub phase: Phase,
    pub state: State,
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub events: Vec<TraceEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state seen before `node`.
    pub fn before(&self, node: NodeId) -> Option<&State> {
        self.last(node, Phase::Enter)
    }

    /// Last state seen after `node`.
    pub fn after(&self, node: NodeId) -> Option<&State> {
        self.last(node, Phase::Leave)
    }

    fn last(&self, node: NodeId, phase: Phase) -> Option<&State> {
        self.events
            .iter()
            .rev()
            .find(|e| e.node == node && e.phase == phase)
            .map(|e| &e.state)
    }
}

impl Trace for Recorder {
    fn enter(&mut self, node: NodeId, state: &State) {
        self.events.push(TraceEvent {
            node,
            phase: Phase::Enter,
            state: state.clone(),
        });
    }

    fn leave(&mut self, node: NodeId, state: &State) {
        self.events.push(TraceEvent {
            node,
            phase: Phase::Leave,
            state: state.clone(),
        });
    }
}
