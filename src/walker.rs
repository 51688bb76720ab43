//! Statement walker and analysis entry points.
//!
//! Statements are walked by structural recursion, threading one [`State`]
//! through each statement. Loops are solved by iterating the body to a fixed
//! point (merging, then widening after
//! [`widening_threshold`](AnalyzerConfig::widening_threshold) iterations) and
//! then walking the body one final time over the converged loop-head state.
//! Only that final pass reports findings and feeds the [`Trace`].

use crate::algebra::{Fault, FaultKind};
use crate::ast::{DeclId, MethodId, NodeId, Stmt, SwitchCase, Tree};
use crate::condition::Branches;
use crate::config::AnalyzerConfig;
use crate::contract;
use crate::error::AnalysisError;
use crate::eval::literal_value;
use crate::report::{ErrorKind, ErrorRecord, ErrorReport};
use crate::state::State;
use crate::trace::{NoTrace, Trace};
use crate::types::{Annotation, TypeRef};
use crate::value::Value;

/// Result of analyzing one body.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// State falling off the end of the body.
    pub final_state: State,
    /// Merge of the final state and every state reaching a `return`.
    pub exit_state: State,
    pub report: ErrorReport,
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Analyzer { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes a statement starting from `initial`.
    pub fn analyze(&self, tree: &Tree, body: NodeId, initial: State) -> Result<Analysis, AnalysisError> {
        self.analyze_with_trace(tree, body, initial, &mut NoTrace)
    }

    pub fn analyze_with_trace(
        &self,
        tree: &Tree,
        body: NodeId,
        initial: State,
        trace: &mut dyn Trace,
    ) -> Result<Analysis, AnalysisError> {
        let walker = Walker::new(tree, &self.config, trace);
        walker.run(body, initial)
    }

    /// Analyzes a method body, seeding parameters and fields from their
    /// contracts and checking returned values against the return contract.
    pub fn analyze_method(&self, tree: &Tree, method: MethodId) -> Result<Analysis, AnalysisError> {
        self.analyze_method_with_trace(tree, method, &mut NoTrace)
    }

    pub fn analyze_method_with_trace(
        &self,
        tree: &Tree,
        method: MethodId,
        trace: &mut dyn Trace,
    ) -> Result<Analysis, AnalysisError> {
        let decl = tree.method(method)?;
        let body = decl.body.ok_or(AnalysisError::MissingBody(method))?;
        let initial = contract::entry_state(tree, decl)?;
        log::debug!("Analyzing method {} with {} parameters", decl.name, decl.params.len());

        let mut walker = Walker::new(tree, &self.config, trace);
        walker.return_type = Some(&decl.return_type);
        walker.return_contract = &decl.return_contract;
        walker.run(body, initial)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FrameKind {
    Loop,
    Switch,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Jump {
    Break,
    Continue,
}

/// States diverted by `break` and `continue` out of a loop or switch body.
#[derive(Debug, Clone)]
pub(crate) struct EndState {
    pub(crate) breaks: State,
    pub(crate) continues: State,
}

impl EndState {
    fn new() -> Self {
        EndState {
            breaks: State::domain_empty(),
            continues: State::domain_empty(),
        }
    }
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    end: EndState,
}

/// One pass over a loop: the state flowing back to the head and the state
/// leaving the loop.
struct LoopPass {
    back: State,
    exit: State,
}

pub(crate) struct Walker<'a> {
    pub(crate) tree: &'a Tree,
    pub(crate) config: &'a AnalyzerConfig,
    report: ErrorReport,
    frames: Vec<Frame>,
    returns: State,
    return_type: Option<&'a TypeRef>,
    return_contract: &'a [Annotation],
    /// Nesting depth of loop iterations whose findings are discarded.
    muted: usize,
    trace: &'a mut dyn Trace,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(tree: &'a Tree, config: &'a AnalyzerConfig, trace: &'a mut dyn Trace) -> Self {
        Walker {
            tree,
            config,
            report: ErrorReport::new(),
            frames: Vec::new(),
            returns: State::domain_empty(),
            return_type: None,
            return_contract: &[],
            muted: 0,
            trace,
        }
    }

    fn run(mut self, body: NodeId, initial: State) -> Result<Analysis, AnalysisError> {
        let final_state = self.walk_stmt(body, initial)?;
        let mut exit_state = self.returns;
        exit_state.merge_with(&final_state);
        log::debug!("Analysis finished with {} findings", self.report.len());
        Ok(Analysis {
            final_state,
            exit_state,
            report: self.report,
        })
    }

    #[cfg(test)]
    pub(crate) fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub(crate) fn emit(&mut self, node: NodeId, kind: ErrorKind, message: String, definite: bool) {
        if self.muted > 0 {
            return;
        }
        log::debug!("{}: {}", node, message);
        self.report.add(node, ErrorRecord::new(kind, message, definite));
    }

    pub(crate) fn report_fault(&mut self, node: NodeId, fault: Option<Fault>) {
        let Some(fault) = fault else {
            return;
        };
        let (kind, what) = match fault.kind {
            FaultKind::NullDereference => (ErrorKind::NullDereference, "null value used as an operand"),
            FaultKind::DivisionByZero => (ErrorKind::DivisionByZero, "division by zero"),
        };
        let message = if fault.definite {
            what.to_string()
        } else {
            format!("possible {}", what)
        };
        self.emit(node, kind, message, fault.definite);
    }

    /// Reports every contract the value (possibly) violates.
    pub(crate) fn check_contract(&mut self, node: NodeId, value: &Value, annotations: &[Annotation], subject: &str) {
        for violation in contract::check(value, annotations) {
            let message = if violation.definite {
                format!("{} violates {}", subject, violation.annotation)
            } else {
                format!("{} may violate {}", subject, violation.annotation)
            };
            self.emit(
                node,
                ErrorKind::ContractViolation(violation.annotation),
                message,
                violation.definite,
            );
        }
    }

    fn report_unreachable(&mut self, node: NodeId, stmt: &Stmt) {
        if !self.config.report_unreachable || is_trivial(stmt) {
            return;
        }
        self.emit(node, ErrorKind::UnreachableCode, "unreachable code".to_string(), true);
    }

    pub(crate) fn walk_stmt(&mut self, id: NodeId, state: State) -> Result<State, AnalysisError> {
        let tree = self.tree;
        let stmt = tree.stmt(id)?;
        if state.is_domain_empty() {
            self.report_unreachable(id, stmt);
            return Ok(state);
        }
        if self.muted == 0 {
            self.trace.enter(id, &state);
        }

        let out = match stmt {
            Stmt::Block(stmts) => self.walk_seq(stmts, state)?,
            Stmt::LocalDecl { decl, init } => self.walk_local_decl(*decl, *init, state)?,
            Stmt::Expr(expr) => {
                let mut state = state;
                self.eval_expr(*expr, &mut state)?;
                state
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.walk_if(*cond, *then_branch, *else_branch, &state)?,
            Stmt::While { cond, body } => {
                self.walk_loop(id, state, |w, head| w.while_pass(*cond, *body, head))?
            }
            Stmt::DoWhile { body, cond } => {
                self.walk_loop(id, state, |w, head| w.do_while_pass(*body, *cond, head))?
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let entry = self.walk_seq(init, state)?;
                if entry.is_domain_empty() {
                    entry
                } else {
                    self.walk_loop(id, entry, |w, head| w.for_pass(*cond, update, *body, head))?
                }
            }
            Stmt::Switch { selector, cases } => self.walk_switch(id, *selector, cases, state)?,
            Stmt::Return(value) => self.walk_return(id, *value, state)?,
            Stmt::Throw(value) => {
                let mut state = state;
                // `throw null` throws a NullPointerException instead.
                self.eval_deref(*value, id, &mut state)?;
                State::domain_empty()
            }
            Stmt::Break => self.jump(id, Jump::Break, state)?,
            Stmt::Continue => self.jump(id, Jump::Continue, state)?,
            Stmt::Empty => state,
        };

        if self.muted == 0 {
            self.trace.leave(id, &out);
        }
        Ok(out)
    }

    /// Walks statements in sequence, reporting the first unreachable one.
    fn walk_seq(&mut self, stmts: &[NodeId], mut state: State) -> Result<State, AnalysisError> {
        let tree = self.tree;
        for &id in stmts {
            if state.is_domain_empty() {
                let stmt = tree.stmt(id)?;
                if is_trivial(stmt) {
                    continue;
                }
                self.report_unreachable(id, stmt);
                break;
            }
            state = self.walk_stmt(id, state)?;
        }
        Ok(state)
    }

    fn walk_local_decl(&mut self, decl: DeclId, init: Option<NodeId>, mut state: State) -> Result<State, AnalysisError> {
        let tree = self.tree;
        let info = tree.decl(decl)?;
        let value = match init {
            Some(expr) => {
                let value = self.eval_expr(expr, &mut state)?;
                self.convert(expr, &value, &info.ty)
            }
            None => contract::default_value(&info.ty),
        };
        state.set(decl, value);
        Ok(state)
    }

    fn walk_if(
        &mut self,
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
        state: &State,
    ) -> Result<State, AnalysisError> {
        let Branches { when_true, when_false } = self.eval_condition(cond, state)?;
        let mut out = self.walk_stmt(then_branch, when_true)?;
        let other = match else_branch {
            Some(else_branch) => self.walk_stmt(else_branch, when_false)?,
            None => when_false,
        };
        out.merge_with(&other);
        Ok(out)
    }

    fn walk_return(&mut self, id: NodeId, value: Option<NodeId>, mut state: State) -> Result<State, AnalysisError> {
        if let Some(expr) = value {
            let result = self.eval_expr(expr, &mut state)?;
            let result = match self.return_type {
                Some(ty) => self.convert(expr, &result, ty),
                None => result,
            };
            let contract = self.return_contract;
            self.check_contract(id, &result, contract, "returned value");
        }
        self.returns.merge_with(&state);
        Ok(State::domain_empty())
    }

    fn jump(&mut self, id: NodeId, jump: Jump, state: State) -> Result<State, AnalysisError> {
        let frame = match jump {
            Jump::Break => self.frames.last_mut(),
            Jump::Continue => self.frames.iter_mut().rev().find(|f| f.kind == FrameKind::Loop),
        };
        let frame = frame.ok_or(AnalysisError::JumpOutsideLoop(id))?;
        match jump {
            Jump::Break => frame.end.breaks.merge_with(&state),
            Jump::Continue => frame.end.continues.merge_with(&state),
        }
        Ok(State::domain_empty())
    }

    /// Runs `body` inside a new loop or switch frame and returns what it
    /// collected from `break` and `continue`.
    fn with_frame<T>(
        &mut self,
        kind: FrameKind,
        body: impl FnOnce(&mut Self) -> Result<T, AnalysisError>,
    ) -> Result<(T, EndState), AnalysisError> {
        self.frames.push(Frame {
            kind,
            end: EndState::new(),
        });
        let result = body(self);
        let end = self.frames.pop().map_or_else(EndState::new, |f| f.end);
        Ok((result?, end))
    }

    /// Solves a loop to a fixed point, then walks it once more to report.
    ///
    /// `pass` runs one iteration from the given loop-head state.
    fn walk_loop<F>(&mut self, id: NodeId, entry: State, mut pass: F) -> Result<State, AnalysisError>
    where
        F: FnMut(&mut Self, &State) -> Result<LoopPass, AnalysisError>,
    {
        let mut head = entry;
        let mut iteration = 0;
        let mut gave_up = false;

        self.muted += 1;
        loop {
            let back = match pass(self, &head) {
                Ok(p) => p.back,
                Err(e) => {
                    self.muted -= 1;
                    return Err(e);
                }
            };
            let mut next = head.clone();
            if iteration >= self.config.widening_threshold {
                next.widen_with(&back);
                self.fit_declared(&mut next);
            } else {
                next.merge_with(&back);
            }
            if next == head {
                break;
            }
            iteration += 1;
            if iteration >= self.config.max_iterations {
                let count = next.havoc_changed(&head);
                if !gave_up {
                    log::warn!(
                        "Loop {} did not stabilize after {} iterations, giving up on {} variables",
                        id,
                        iteration,
                        count
                    );
                    gave_up = true;
                }
            }
            head = next;
        }
        self.muted -= 1;
        log::debug!("Loop {} stabilized after {} iterations", id, iteration);

        Ok(pass(self, &head)?.exit)
    }

    /// Pulls widened bounds of primitive and boxed variables back into their declared width.
    fn fit_declared(&self, state: &mut State) {
        if state.is_domain_empty() {
            return;
        }
        let tree = self.tree;
        let fitted: Vec<_> = state
            .iter()
            .filter_map(|(decl, value)| {
                let ty = &tree.decl(decl).ok()?.ty;
                let numeric = matches!(ty, TypeRef::Primitive(_) | TypeRef::Boxed(_));
                numeric.then(|| (decl, contract::coerce(value, ty).value))
            })
            .collect();
        for (decl, value) in fitted {
            state.set(decl, value);
        }
    }

    fn while_pass(&mut self, cond: NodeId, body: NodeId, head: &State) -> Result<LoopPass, AnalysisError> {
        let branches = self.eval_condition(cond, head)?;
        let (out, end) = self.with_frame(FrameKind::Loop, |w| w.walk_stmt(body, branches.when_true))?;
        let mut back = out;
        back.merge_with(&end.continues);
        let mut exit = branches.when_false;
        exit.merge_with(&end.breaks);
        Ok(LoopPass { back, exit })
    }

    fn do_while_pass(&mut self, body: NodeId, cond: NodeId, head: &State) -> Result<LoopPass, AnalysisError> {
        let (out, end) = self.with_frame(FrameKind::Loop, |w| w.walk_stmt(body, head.clone()))?;
        let mut tail = out;
        tail.merge_with(&end.continues);
        let branches = self.eval_condition(cond, &tail)?;
        let mut exit = branches.when_false;
        exit.merge_with(&end.breaks);
        Ok(LoopPass {
            back: branches.when_true,
            exit,
        })
    }

    fn for_pass(
        &mut self,
        cond: Option<NodeId>,
        update: &[NodeId],
        body: NodeId,
        head: &State,
    ) -> Result<LoopPass, AnalysisError> {
        let branches = match cond {
            Some(cond) => self.eval_condition(cond, head)?,
            None => Branches {
                when_true: head.clone(),
                when_false: State::domain_empty(),
            },
        };
        let (out, end) = self.with_frame(FrameKind::Loop, |w| w.walk_stmt(body, branches.when_true))?;
        let mut back = out;
        back.merge_with(&end.continues);
        for &expr in update {
            self.eval_expr(expr, &mut back)?;
        }
        let mut exit = branches.when_false;
        exit.merge_with(&end.breaks);
        Ok(LoopPass { back, exit })
    }

    fn walk_switch(
        &mut self,
        id: NodeId,
        selector: NodeId,
        cases: &[SwitchCase],
        mut state: State,
    ) -> Result<State, AnalysisError> {
        let value = self.eval_deref(selector, id, &mut state)?;
        if value.is_empty() {
            return Ok(State::domain_empty());
        }
        let var = self.tree.variable_of(selector);

        let ((fallthrough, has_default), end) = self.with_frame(FrameKind::Switch, |w| {
            let mut fallthrough = State::domain_empty();
            let mut has_default = false;
            for case in cases {
                let mut entry = fallthrough;
                if case.is_default {
                    has_default = true;
                    entry.merge_with(&state);
                }
                for label in &case.labels {
                    let matched = value.restrict_equal(&literal_value(label));
                    entry.merge_with(&narrowed(&state, var, matched));
                }
                fallthrough = w.walk_seq(&case.body, entry)?;
            }
            Ok((fallthrough, has_default))
        })?;

        let mut exit = fallthrough;
        exit.merge_with(&end.breaks);
        if !has_default {
            let unmatched = cases
                .iter()
                .flat_map(|c| &c.labels)
                .fold(value.clone(), |v, label| v.restrict_not_equal(&literal_value(label)));
            exit.merge_with(&narrowed(&state, var, unmatched));
        }
        Ok(exit)
    }

    /// Assignment conversion, reporting a failed unboxing at `node`.
    pub(crate) fn convert(&mut self, node: NodeId, value: &Value, ty: &TypeRef) -> Value {
        let out = contract::coerce(value, ty);
        self.report_unboxing(node, out.fault);
        out.value
    }

    /// Unboxing a possibly-null wrapper is only reported under
    /// [`report_nullable_dereference`](AnalyzerConfig::report_nullable_dereference).
    pub(crate) fn report_unboxing(&mut self, node: NodeId, fault: Option<Fault>) {
        let Some(fault) = fault else {
            return;
        };
        if fault.definite {
            self.emit(node, ErrorKind::NullDereference, "unboxing of a null value".to_string(), true);
        } else if self.config.report_nullable_dereference {
            let message = "possible unboxing of a null value".to_string();
            self.emit(node, ErrorKind::NullDereference, message, false);
        }
    }
}

/// `state` with the variable (if any) bound to `value`; domain-empty if no
/// value is left.
fn narrowed(state: &State, var: Option<DeclId>, value: Value) -> State {
    let mut out = state.clone();
    if value.is_empty() {
        out.set_domain_empty();
    } else if let Some(decl) = var {
        out.set(decl, value);
    }
    out
}

fn is_trivial(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Empty => true,
        Stmt::Block(stmts) => stmts.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::algebra::{ArithOp, CmpOp};
    use crate::ast::TreeBuilder;
    use crate::trace::Recorder;

    #[test]
    fn test_jump_outside_loop() {
        let mut b = TreeBuilder::new();
        let brk = b.break_stmt();
        let body = b.block(vec![brk]);
        let tree = b.build();

        let result = Analyzer::default().analyze(&tree, body, State::new());
        assert_eq!(result.err(), Some(AnalysisError::JumpOutsideLoop(brk)));
    }

    #[test]
    fn test_missing_body() {
        let mut b = TreeBuilder::new();
        let m = b.method("run", vec![], TypeRef::Void, vec![], None);
        let tree = b.build();

        let result = Analyzer::default().analyze_method(&tree, m);
        assert_eq!(result.err(), Some(AnalysisError::MissingBody(m)));
    }

    #[test]
    fn test_return_makes_rest_unreachable() {
        let mut b = TreeBuilder::new();
        let x = b.local("x", TypeRef::int());
        let one = b.int(1);
        let decl = b.declare(x, Some(one));
        let ret = b.ret(None);
        let two = b.int(2);
        let assign = b.assign(x, two);
        let dead = b.expr_stmt(assign);
        let body = b.block(vec![decl, ret, dead]);
        let tree = b.build();

        let analysis = Analyzer::default().analyze(&tree, body, State::new()).unwrap();
        assert!(analysis.final_state.is_domain_empty());
        assert_eq!(analysis.exit_state.get(x), Value::int(1));
        let dead_records: Vec<_> = analysis.report.at(dead).collect();
        assert_eq!(dead_records.len(), 1);
        assert_eq!(dead_records[0].kind, ErrorKind::UnreachableCode);
        assert_eq!(analysis.report.len(), 1);
    }

    #[test]
    fn test_trace_sees_final_states() {
        let mut b = TreeBuilder::new();
        let i = b.local("i", TypeRef::int());
        let zero = b.int(0);
        let decl = b.declare(i, Some(zero));
        let read = b.name(i);
        let ten = b.int(10);
        let cond = b.cmp(CmpOp::Lt, read, ten);
        let one = b.int(1);
        let bump = b.compound(ArithOp::Add, i, one);
        let step = b.expr_stmt(bump);
        let body = b.block(vec![step]);
        let loop_ = b.while_loop(cond, body);
        let root = b.block(vec![decl, loop_]);
        let tree = b.build();

        let mut recorder = Recorder::new();
        let analysis = Analyzer::default()
            .analyze_with_trace(&tree, root, State::new(), &mut recorder)
            .unwrap();

        // Entered and left once: intermediate iterations are not traced.
        let events = recorder.events.iter().filter(|e| e.node == step).count();
        assert_eq!(events, 2);
        let before_step = recorder.before(step).unwrap();
        assert_eq!(before_step.get(i), Value::int_range(0, 9));
        assert_eq!(analysis.final_state.get(i), Value::int_range(10, i32::MAX as i64));
    }

    #[test]
    fn test_iteration_cap_gives_up() {
        let config = AnalyzerConfig {
            widening_threshold: 1000,
            max_iterations: 5,
            ..AnalyzerConfig::default()
        };
        let mut b = TreeBuilder::new();
        let i = b.local("i", TypeRef::Primitive(crate::types::PrimitiveKind::Long));
        let zero = b.int(0);
        let decl = b.declare(i, Some(zero));
        let cond = b.bool_lit(true);
        let one = b.int(1);
        let bump = b.compound(ArithOp::Add, i, one);
        let step = b.expr_stmt(bump);
        let loop_ = b.while_loop(cond, step);
        let root = b.block(vec![decl, loop_]);
        let tree = b.build();

        let mut recorder = Recorder::new();
        let analysis = Analyzer::new(config)
            .analyze_with_trace(&tree, root, State::new(), &mut recorder)
            .unwrap();
        assert!(analysis.final_state.is_domain_empty());
        assert_eq!(recorder.before(step).unwrap().get(i), Value::Any);
    }
}
