//! # flowcheck: flow-sensitive value analysis for Java-like methods
//!
//! **`flowcheck`** walks a single method body and computes, for every program point, an
//! over-approximation of the values each local variable, parameter and field may hold.
//! It uses that information to flag operations that fail for part or all of those values:
//! null dereferences, division by zero, and violations of declared value contracts
//! (`@NotNull`, `@Positive`, `@Size`, ...).
//!
//! ## Key Features
//!
//! - **Closed value lattice**: [`Value`][crate::value::Value] covers integers and characters as
//!   saturating intervals, booleans, strings and arrays by length, boxed primitives and opaque
//!   objects, each with an independent nullability axis.
//! - **Path-sensitive narrowing**: guards such as `x > 5`, `s != null` or `a.length == 0` split the
//!   state into a true-state and a false-state.
//! - **Terminating loops**: loop heads are merged, then widened, until they stabilize.
//! - **Definite vs potential findings**: every finding says whether *all* or only *some* of the
//!   values reaching it fail.
//!
//! ## Basic Usage
//!
//! ```rust
//! use flowcheck::algebra::CmpOp;
//! use flowcheck::ast::TreeBuilder;
//! use flowcheck::state::State;
//! use flowcheck::types::TypeRef;
//! use flowcheck::value::Value;
//! use flowcheck::walker::Analyzer;
//!
//! // if (x > 5) x = 2; else x = 10;
//! let mut b = TreeBuilder::new();
//! let x = b.local("x", TypeRef::int());
//! let read = b.name(x);
//! let five = b.int(5);
//! let cond = b.cmp(CmpOp::Gt, read, five);
//! let two = b.int(2);
//! let then_assign = b.assign(x, two);
//! let then_branch = b.expr_stmt(then_assign);
//! let ten = b.int(10);
//! let else_assign = b.assign(x, ten);
//! let else_branch = b.expr_stmt(else_assign);
//! let branch = b.if_else(cond, then_branch, else_branch);
//! let tree = b.build();
//!
//! // Starting from x in [1, 10].
//! let mut initial = State::new();
//! initial.set(x, Value::int_range(1, 10));
//! let analysis = Analyzer::default().analyze(&tree, branch, initial).unwrap();
//! assert_eq!(analysis.final_state.get(x), Value::int_range(2, 10));
//! assert!(analysis.report.is_empty());
//! ```
//!
//! ## Core Components
//!
//! - **[`value`]** and **[`algebra`]**: the abstract domain and every operation over it.
//! - **[`state`]**: per-branch variable state.
//! - **[`condition`]**, **[`eval`]**, **[`walker`]**: the analysis itself.
//! - **[`contract`]**: translating annotations to values and checking values against them.
//! - **[`report`]**: the findings.

pub mod algebra;
pub mod ast;
pub mod condition;
pub mod config;
pub mod contract;
pub mod error;
pub mod eval;
pub mod interval;
pub mod report;
pub mod state;
pub mod trace;
pub mod types;
pub mod value;
pub mod walker;

pub use config::AnalyzerConfig;
pub use error::AnalysisError;
pub use report::{ErrorKind, ErrorRecord, ErrorReport};
pub use state::State;
pub use value::Value;
pub use walker::{Analysis, Analyzer};
