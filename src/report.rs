//! Findings produced by an analysis.
//!
//! The report is a map from node to an ordered set of records. Reporting the
//! same finding twice for a node (for instance from several passes over a
//! loop body) keeps a single record.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::NodeId;
use crate::types::Annotation;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    NullDereference,
    DivisionByZero,
    /// A value may violate the given contract.
    ContractViolation(Annotation),
    UnreachableCode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NullDereference => write!(f, "null dereference"),
            ErrorKind::DivisionByZero => write!(f, "division by zero"),
            ErrorKind::ContractViolation(annotation) => write!(f, "{} violation", annotation),
            ErrorKind::UnreachableCode => write!(f, "unreachable code"),
        }
    }
}

/// One finding.
///
/// `definite` records are certain whenever the node executes; the others
/// are possible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub definite: bool,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, definite: bool) -> Self {
        ErrorRecord {
            kind,
            message: message.into(),
            definite,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let certainty = if self.definite { "error" } else { "warning" };
        write!(f, "{}: {}", certainty, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    records: BTreeMap<NodeId, BTreeSet<ErrorRecord>>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, returning `false` if the node already had it.
    pub fn add(&mut self, node: NodeId, record: ErrorRecord) -> bool {
        self.records.entry(node).or_default().insert(record)
    }

    /// Records reported at a node, in order.
    pub fn at(&self, node: NodeId) -> impl Iterator<Item = &ErrorRecord> + '_ {
        self.records.get(&node).into_iter().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ErrorRecord)> + '_ {
        self.records
            .iter()
            .flat_map(|(node, records)| records.iter().map(move |r| (*node, r)))
    }

    pub fn definite(&self) -> impl Iterator<Item = (NodeId, &ErrorRecord)> + '_ {
        self.iter().filter(|(_, r)| r.definite)
    }

    pub fn potential(&self) -> impl Iterator<Item = (NodeId, &ErrorRecord)> + '_ {
        self.iter().filter(|(_, r)| !r.definite)
    }

    /// Number of records of a kind.
    pub fn count(&self, kind: &ErrorKind) -> usize {
        self.iter().filter(|(_, r)| &r.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Nodes with at least one record.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.keys().copied()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, record) in self.iter() {
            writeln!(f, "{}: {}", node, record)?;
        }
        Ok(())
    }
}
