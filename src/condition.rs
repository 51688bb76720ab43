//! Condition evaluation.
//!
//! A boolean expression used as a guard splits the incoming state into the
//! state where it holds and the state where it does not. Comparisons narrow
//! the variables they compare, `&&`/`||` combine the results of their
//! operands, and any other boolean expression narrows at most itself.

use crate::algebra::CmpOp;
use crate::ast::{BinaryOp, Expr, NodeId, UnaryOp};
use crate::error::AnalysisError;
use crate::state::State;
use crate::value::Value;
use crate::walker::Walker;

/// States on which a condition holds and does not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branches {
    pub when_true: State,
    pub when_false: State,
}

impl Branches {
    pub fn unreachable() -> Self {
        Branches {
            when_true: State::domain_empty(),
            when_false: State::domain_empty(),
        }
    }

    /// The state after the condition, whatever its outcome.
    pub fn join(self) -> State {
        let mut state = self.when_true;
        state.merge_with(&self.when_false);
        state
    }

    fn swap(self) -> Self {
        Branches {
            when_true: self.when_false,
            when_false: self.when_true,
        }
    }
}

impl Walker<'_> {
    /// Splits `state` on the condition `id`. The incoming state is not modified.
    pub(crate) fn eval_condition(&mut self, id: NodeId, state: &State) -> Result<Branches, AnalysisError> {
        if state.is_domain_empty() {
            return Ok(Branches::unreachable());
        }
        let tree = self.tree;
        match tree.expr(id)? {
            Expr::Binary {
                op: BinaryOp::Cmp(op),
                lhs,
                rhs,
            } => self.eval_comparison(id, *op, *lhs, *rhs, state),
            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                let left = self.eval_condition(*lhs, state)?;
                // `rhs` only runs when `lhs` held.
                let right = self.eval_condition(*rhs, &left.when_true)?;
                let when_true = self.conjoin(left.when_true, right.when_true, *rhs);
                let mut when_false = left.when_false;
                when_false.merge_with(&right.when_false);
                Ok(Branches { when_true, when_false })
            }
            Expr::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => {
                let left = self.eval_condition(*lhs, state)?;
                let right = self.eval_condition(*rhs, &left.when_false)?;
                let mut when_true = left.when_true;
                when_true.merge_with(&right.when_true);
                let when_false = self.conjoin(left.when_false, right.when_false, *rhs);
                Ok(Branches { when_true, when_false })
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(self.eval_condition(*operand, state)?.swap()),
            _ => self.eval_boolean(id, state),
        }
    }

    /// Both operands of a short-circuit operator hold: `right` was computed
    /// from `left`.
    fn conjoin(&self, left: State, right: State, rhs: NodeId) -> State {
        if left.is_domain_empty() || right.is_domain_empty() {
            return State::domain_empty();
        }
        // Values assigned by `rhs` replace those of `left` instead of refining them.
        if self.tree.has_side_effects(rhs) {
            return right;
        }
        let mut state = left;
        state.intersect_with(&right);
        state
    }

    fn eval_comparison(
        &mut self,
        id: NodeId,
        op: CmpOp,
        lhs: NodeId,
        rhs: NodeId,
        state: &State,
    ) -> Result<Branches, AnalysisError> {
        let mut work = state.clone();
        let l = self.eval_expr(lhs, &mut work)?;
        let r = self.eval_expr(rhs, &mut work)?;
        let out = l.compare(op, &r);
        self.report_fault(id, out.fault);
        let Some((can_be_true, can_be_false)) = out.value.as_bool() else {
            return Ok(Branches::unreachable());
        };

        // `l` is stale once `rhs` has written to the state; only `r` may be bound back.
        let narrow_lhs = !self.tree.has_side_effects(rhs);

        let mut when_true = work.clone();
        if narrow_lhs {
            self.narrow_operand(&mut when_true, lhs, l.restrict(op, &r));
        }
        self.narrow_operand(&mut when_true, rhs, r.restrict(op.flip(), &l));
        if !can_be_true {
            when_true.set_domain_empty();
        }

        let negated = op.negate();
        let mut when_false = work;
        if narrow_lhs {
            self.narrow_operand(&mut when_false, lhs, l.restrict(negated, &r));
        }
        self.narrow_operand(&mut when_false, rhs, r.restrict(negated.flip(), &l));
        if !can_be_false {
            when_false.set_domain_empty();
        }

        Ok(Branches { when_true, when_false })
    }

    /// Binds the narrowed value of a compared operand, if it is a variable
    /// or the length of one.
    fn narrow_operand(&self, state: &mut State, operand: NodeId, narrowed: Value) {
        if state.is_domain_empty() {
            return;
        }
        if narrowed.is_empty() {
            state.set_domain_empty();
            return;
        }
        let tree = self.tree;
        if let Some(decl) = tree.variable_of(operand) {
            state.set(decl, narrowed);
            return;
        }
        let Ok(Expr::Length(target)) = tree.expr(operand) else {
            return;
        };
        let (Some(decl), Some(length)) = (tree.variable_of(*target), narrowed.as_interval()) else {
            return;
        };
        let current = state.get(decl);
        if let Some(old) = current.length() {
            let value = current.with_length(old.meet(&length));
            if value.is_empty() {
                state.set_domain_empty();
            } else {
                state.set(decl, value);
            }
        }
    }

    /// Any other boolean expression: its value decides which branches are
    /// possible, and a boolean variable is narrowed to true/false.
    fn eval_boolean(&mut self, id: NodeId, state: &State) -> Result<Branches, AnalysisError> {
        let mut work = state.clone();
        let value = self.eval_expr(id, &mut work)?;
        if value.is_empty() || work.is_domain_empty() {
            return Ok(Branches::unreachable());
        }
        let (can_be_true, can_be_false) = value.as_bool().unwrap_or((true, true));

        let mut when_true = work.clone();
        let mut when_false = work;
        if let Some(decl) = self.tree.variable_of(id) {
            when_true.set(decl, value.restrict_equal(&Value::bool_const(true)));
            when_false.set(decl, value.restrict_equal(&Value::bool_const(false)));
        }
        if !can_be_true {
            when_true.set_domain_empty();
        }
        if !can_be_false {
            when_false.set_domain_empty();
        }
        Ok(Branches { when_true, when_false })
    }
}
