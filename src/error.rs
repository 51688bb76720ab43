//! Errors that abort an analysis.
//!
//! Findings about the analyzed code (null dereferences, contract violations,
//! ...) are not errors: they are collected in an
//! [`ErrorReport`](crate::report::ErrorReport). An [`AnalysisError`] means the
//! tree handed to the analyzer is malformed.

use std::fmt;

use crate::ast::{DeclId, MethodId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Node id outside the tree.
    UnknownNode(NodeId),
    /// Declaration id that the tree does not define.
    UnknownDecl(DeclId),
    /// Method id that the tree does not define.
    UnknownMethod(MethodId),
    /// An expression node was found where a statement was expected.
    ExpectedStatement(NodeId),
    /// A statement node was found where an expression was expected.
    ExpectedExpression(NodeId),
    /// `break` or `continue` with no enclosing loop or switch.
    JumpOutsideLoop(NodeId),
    /// Abstract or native method.
    MissingBody(MethodId),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::UnknownNode(id) => write!(f, "Unknown node {}", id),
            AnalysisError::UnknownDecl(id) => write!(f, "Unknown declaration {}", id),
            AnalysisError::UnknownMethod(id) => write!(f, "Unknown method {}", id),
            AnalysisError::ExpectedStatement(id) => write!(f, "Expected a statement at {}", id),
            AnalysisError::ExpectedExpression(id) => write!(f, "Expected an expression at {}", id),
            AnalysisError::JumpOutsideLoop(id) => write!(f, "Jump outside of a loop or switch at {}", id),
            AnalysisError::MissingBody(id) => write!(f, "Method {} has no body", id),
        }
    }
}

impl std::error::Error for AnalysisError {}
