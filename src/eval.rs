//! Expression evaluation.
//!
//! Every expression kind yields a [`Value`]; declarations, assignments and
//! increments also update the carried [`State`]. Null dereferences are
//! detected where a value is dereferenced (member access, indexing, calls),
//! arithmetic faults where the algebra signals them.

use crate::algebra::{ArithOp, Fault, FaultKind, Outcome};
use crate::ast::{BinaryOp, DeclId, Expr, Literal, MethodId, NodeId, UnaryOp};
use crate::contract;
use crate::error::AnalysisError;
use crate::interval::Interval;
use crate::report::ErrorKind;
use crate::state::State;
use crate::types::TypeRef;
use crate::value::{Value, LENGTH_RANGE};
use crate::walker::Walker;

/// Abstract value of a literal.
pub fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::int(*n),
        Literal::Char(c) => Value::char(*c),
        Literal::Bool(b) => Value::bool_const(*b),
        Literal::Str(s) => Value::string_literal(s),
        Literal::Null => Value::Null,
    }
}

/// Unary plus: unboxes and promotes characters.
fn unary_plus(value: &Value) -> Outcome {
    match value {
        Value::Null => Outcome::faulted(Value::Empty, Fault::definite(FaultKind::NullDereference)),
        Value::Boxed { inner, .. } => unary_plus(inner),
        Value::Char(i) => Outcome::ok(Value::Integer(*i)),
        other => Outcome::ok(other.clone()),
    }
}

impl Walker<'_> {
    pub(crate) fn eval_expr(&mut self, id: NodeId, state: &mut State) -> Result<Value, AnalysisError> {
        if state.is_domain_empty() {
            return Ok(Value::Empty);
        }
        let tree = self.tree;
        let value = match tree.expr(id)? {
            Expr::Literal(literal) => literal_value(literal),
            Expr::Name(decl) => self.read(*decl, state)?,
            Expr::This => Value::object(false),
            Expr::Unary { op, operand } => self.eval_unary(id, *op, *operand, state)?,
            Expr::Binary {
                op: BinaryOp::Arith(op),
                lhs,
                rhs,
            } => {
                let l = self.eval_expr(*lhs, state)?;
                let r = self.eval_expr(*rhs, state)?;
                let out = l.arith(*op, &r);
                self.report_fault(id, out.fault);
                out.value
            }
            Expr::Binary {
                op: BinaryOp::Cmp(op),
                lhs,
                rhs,
            } => {
                let l = self.eval_expr(*lhs, state)?;
                let r = self.eval_expr(*rhs, state)?;
                let out = l.compare(*op, &r);
                self.report_fault(id, out.fault);
                out.value
            }
            Expr::Binary { .. } => {
                // && and || go through the condition evaluator for short-circuiting.
                let branches = self.eval_condition(id, state)?;
                let value = Value::boolean(
                    !branches.when_true.is_domain_empty(),
                    !branches.when_false.is_domain_empty(),
                );
                *state = branches.join();
                value
            }
            Expr::Assign { op, target, value } => self.eval_assign(id, *op, *target, *value, state)?,
            Expr::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                let branches = self.eval_condition(*cond, state)?;
                let mut when_true = branches.when_true;
                let then_value = self.eval_expr(*then_value, &mut when_true)?;
                let mut when_false = branches.when_false;
                let else_value = self.eval_expr(*else_value, &mut when_false)?;
                when_true.merge_with(&when_false);
                *state = when_true;
                then_value.merge(&else_value)
            }
            Expr::Call { method, receiver, args } => self.eval_call(id, *method, *receiver, args, state)?,
            Expr::Field { target, field } => {
                let decl = tree.decl(*field)?;
                match target {
                    Some(object) if tree.variable_of(id).is_none() => {
                        let object = self.eval_deref(*object, id, state)?;
                        if object.is_empty() {
                            Value::Empty
                        } else {
                            contract::initial_value(&decl.ty, &decl.annotations)
                        }
                    }
                    _ => self.read(*field, state)?,
                }
            }
            Expr::Index { array, index } => {
                let a = self.eval_deref(*array, id, state)?;
                let i = self.eval_expr(*index, state)?;
                if a.is_empty() || i.is_empty() {
                    Value::Empty
                } else {
                    self.element_value(*array)
                }
            }
            Expr::Length(target) => {
                let v = self.eval_deref(*target, id, state)?;
                match v.length() {
                    Some(length) => Value::Integer(length),
                    None if v.is_empty() => Value::Empty,
                    None => Value::Integer(LENGTH_RANGE),
                }
            }
            Expr::NewArray { length, .. } => {
                let n = self.eval_expr(*length, state)?;
                match n.as_interval() {
                    // All-negative lengths throw, leaving nothing.
                    Some(n) => Value::array(n, false),
                    None if n.is_empty() => Value::Empty,
                    None => Value::array(LENGTH_RANGE, false),
                }
            }
            Expr::NewObject { ty, args } => {
                for &arg in args {
                    self.eval_expr(arg, state)?;
                }
                contract::default_value(ty).with_nullable(false)
            }
            Expr::InstanceOf { operand, .. } => {
                let v = self.eval_expr(*operand, state)?;
                match v {
                    Value::Empty => Value::Empty,
                    Value::Null => Value::bool_const(false),
                    _ => Value::any_bool(),
                }
            }
            Expr::Cast { ty, operand } => {
                let v = self.eval_expr(*operand, state)?;
                let out = contract::cast(&v, ty);
                self.report_unboxing(id, out.fault);
                out.value
            }
            Expr::Unknown(children) => {
                for &child in children {
                    self.eval_expr(child, state)?;
                }
                Value::Any
            }
        };
        Ok(value)
    }

    /// Current value of a declaration; untracked ones start from their
    /// declared contract.
    fn read(&self, decl: DeclId, state: &State) -> Result<Value, AnalysisError> {
        let info = self.tree.decl(decl)?;
        Ok(match state.lookup(decl) {
            Some(value) => value.clone(),
            None => contract::initial_value(&info.ty, &info.annotations),
        })
    }

    /// Evaluates an expression that is about to be dereferenced at `at`.
    ///
    /// A definitely null value is reported and yields `Empty`. Otherwise the
    /// dereferenced variable (if any) is known to be non-null afterwards.
    pub(crate) fn eval_deref(&mut self, target: NodeId, at: NodeId, state: &mut State) -> Result<Value, AnalysisError> {
        let value = self.eval_expr(target, state)?;
        if value.is_null() {
            let message = format!("{} is always null here", self.tree.describe(target));
            self.emit(at, ErrorKind::NullDereference, message, true);
            return Ok(Value::Empty);
        }
        if value.is_reference() && value.may_be_null() {
            if self.config.report_nullable_dereference {
                let message = format!("{} may be null here", self.tree.describe(target));
                self.emit(at, ErrorKind::NullDereference, message, false);
            }
            if let Some(decl) = self.tree.variable_of(target) {
                state.set(decl, value.with_nullable(false));
            }
        }
        Ok(value.with_nullable(false))
    }

    fn eval_unary(&mut self, id: NodeId, op: UnaryOp, operand: NodeId, state: &mut State) -> Result<Value, AnalysisError> {
        if op.is_increment() {
            return self.eval_increment(id, op, operand, state);
        }
        let v = self.eval_expr(operand, state)?;
        let out = match op {
            UnaryOp::Neg => v.negate(),
            UnaryOp::Not => v.not(),
            _ => unary_plus(&v),
        };
        self.report_fault(id, out.fault);
        Ok(out.value)
    }

    /// `++` and `--`, as a read-modify-write through the algebra.
    fn eval_increment(&mut self, id: NodeId, op: UnaryOp, operand: NodeId, state: &mut State) -> Result<Value, AnalysisError> {
        let tree = self.tree;
        let Some(decl) = tree.variable_of(operand) else {
            self.eval_expr(operand, state)?;
            return Ok(Value::Any);
        };
        let current = self.read(decl, state)?;
        let one = Value::int(1);
        let out = match op {
            UnaryOp::PreInc | UnaryOp::PostInc => current.add(&one),
            _ => current.subtract(&one),
        };
        self.report_fault(id, out.fault);
        let updated = self.convert(id, &out.value, &tree.decl(decl)?.ty);
        state.set(decl, updated.clone());
        Ok(match op {
            UnaryOp::PreInc | UnaryOp::PreDec => updated,
            _ => current,
        })
    }

    fn eval_assign(
        &mut self,
        id: NodeId,
        op: Option<ArithOp>,
        target: NodeId,
        value: NodeId,
        state: &mut State,
    ) -> Result<Value, AnalysisError> {
        let tree = self.tree;
        if let Some(decl) = tree.variable_of(target) {
            let current = match op {
                Some(_) => Some(self.read(decl, state)?),
                None => None,
            };
            let rhs = self.eval_expr(value, state)?;
            let result = match (op, current) {
                (Some(op), Some(current)) => {
                    let out = current.arith(op, &rhs);
                    self.report_fault(id, out.fault);
                    out.value
                }
                _ => rhs,
            };
            let stored = self.convert(id, &result, &tree.decl(decl)?.ty);
            state.set(decl, stored.clone());
            return Ok(stored);
        }

        // Array elements and fields of other objects are not tracked.
        match tree.expr(target)? {
            Expr::Index { array, index } => {
                self.eval_deref(*array, target, state)?;
                self.eval_expr(*index, state)?;
            }
            Expr::Field {
                target: Some(object), ..
            } => {
                self.eval_deref(*object, target, state)?;
            }
            _ => {
                self.eval_expr(target, state)?;
            }
        }
        let rhs = self.eval_expr(value, state)?;
        match op {
            None => Ok(rhs),
            Some(op @ (ArithOp::Div | ArithOp::Rem)) => {
                let out = Value::Integer(Interval::FULL).arith(op, &rhs);
                self.report_fault(id, out.fault);
                Ok(Value::Any)
            }
            Some(_) => Ok(Value::Any),
        }
    }

    fn eval_call(
        &mut self,
        id: NodeId,
        method: Option<MethodId>,
        receiver: Option<NodeId>,
        args: &[NodeId],
        state: &mut State,
    ) -> Result<Value, AnalysisError> {
        let receiver = match receiver {
            Some(receiver) => self.eval_deref(receiver, id, state)?,
            None => Value::object(false),
        };
        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            values.push(self.eval_expr(arg, state)?);
        }
        if receiver.is_empty() {
            return Ok(Value::Empty);
        }
        let Some(method) = method else {
            return Ok(Value::Any);
        };

        let tree = self.tree;
        let callee = tree.method(method)?;
        for (&param, value) in callee.params.iter().zip(&values) {
            let decl = tree.decl(param)?;
            let subject = format!("argument `{}` of `{}`", decl.name, callee.name);
            self.check_contract(id, value, &decl.annotations, &subject);
        }
        Ok(contract::initial_value(&callee.return_type, &callee.return_contract))
    }

    /// Element value of an indexed array variable, from its declared type.
    fn element_value(&self, array: NodeId) -> Value {
        let ty = self
            .tree
            .variable_of(array)
            .and_then(|decl| self.tree.decl(decl).ok())
            .map(|decl| &decl.ty);
        match ty {
            Some(TypeRef::Array(elem)) => contract::default_value(elem),
            _ => Value::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::algebra::CmpOp;
    use crate::ast::{TreeBuilder, Tree};
    use crate::types::{Annotation, PrimitiveKind};
    use crate::walker::Analyzer;

    fn run(tree: &Tree, body: NodeId) -> crate::walker::Analysis {
        Analyzer::default().analyze(tree, body, State::new()).unwrap()
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal_value(&Literal::Int(7)), Value::int(7));
        assert_eq!(literal_value(&Literal::Char(97)), Value::char(97));
        assert_eq!(literal_value(&Literal::Bool(false)), Value::bool_const(false));
        assert_eq!(literal_value(&Literal::Str("abc".into())), Value::string_literal("abc"));
        assert_eq!(literal_value(&Literal::Null), Value::Null);
    }

    #[test]
    fn test_null_dereference_definite_only() {
        let mut b = TreeBuilder::new();
        let s = b.local("s", TypeRef::String);
        let t = b.param("t", TypeRef::String, vec![]);
        let null = b.null();
        let decl = b.declare(s, Some(null));
        let read_s = b.name(s);
        let len_s = b.length(read_s);
        let use_s = b.expr_stmt(len_s);
        let read_t = b.name(t);
        let len_t = b.length(read_t);
        let use_t = b.expr_stmt(len_t);
        let body = b.block(vec![decl, use_s, use_t]);
        let tree = b.build();

        let analysis = run(&tree, body);
        let records: Vec<_> = analysis.report.at(len_s).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::NullDereference);
        assert!(records[0].definite);
        assert_eq!(analysis.report.at(len_t).count(), 0);
        // The successful dereference proves `t` non-null.
        assert!(!analysis.final_state.get(t).may_be_null());
    }

    #[test]
    fn test_division_by_zero() {
        let mut b = TreeBuilder::new();
        let x = b.local("x", TypeRef::int());
        let y = b.param("y", TypeRef::int(), vec![Annotation::Min(-1), Annotation::Max(3)]);
        let ten = b.int(10);
        let zero = b.int(0);
        let definite = b.arith(ArithOp::Div, ten, zero);
        let d1 = b.declare(x, Some(definite));
        let ten = b.int(10);
        let read_y = b.name(y);
        let potential = b.arith(ArithOp::Div, ten, read_y);
        let assign = b.assign(x, potential);
        let s2 = b.expr_stmt(assign);
        let body = b.block(vec![d1, s2]);
        let tree = b.build();

        let analysis = run(&tree, body);
        let first: Vec<_> = analysis.report.at(definite).collect();
        assert_eq!(first.len(), 1);
        assert!(first[0].definite);
        let second: Vec<_> = analysis.report.at(potential).collect();
        assert_eq!(second.len(), 1);
        assert!(!second[0].definite);
        assert_eq!(analysis.final_state.get(x), Value::Empty);
    }

    #[test]
    fn test_increments() {
        let mut b = TreeBuilder::new();
        let i = b.local("i", TypeRef::int());
        let j = b.local("j", TypeRef::int());
        let five = b.int(5);
        let d1 = b.declare(i, Some(five));
        let read_i = b.name(i);
        let post = b.unary(UnaryOp::PostInc, read_i);
        let d2 = b.declare(j, Some(post));
        let body = b.block(vec![d1, d2]);
        let tree = b.build();

        let analysis = run(&tree, body);
        assert_eq!(analysis.final_state.get(i), Value::int(6));
        assert_eq!(analysis.final_state.get(j), Value::int(5));
    }

    #[test]
    fn test_ternary_merges_arms() {
        let mut b = TreeBuilder::new();
        let p = b.param("p", TypeRef::int(), vec![]);
        let x = b.local("x", TypeRef::int());
        let read_p = b.name(p);
        let zero = b.int(0);
        let cond = b.cmp(CmpOp::Gt, read_p, zero);
        let one = b.int(1);
        let minus = b.int(-1);
        let pick = b.conditional(cond, one, minus);
        let decl = b.declare(x, Some(pick));
        let body = b.block(vec![decl]);
        let tree = b.build();

        let analysis = run(&tree, body);
        assert_eq!(analysis.final_state.get(x), Value::int_range(-1, 1));
    }

    #[test]
    fn test_boxing_on_assignment() {
        let mut b = TreeBuilder::new();
        let boxed = b.local("n", TypeRef::Boxed(PrimitiveKind::Int));
        let x = b.local("x", TypeRef::int());
        let three = b.int(3);
        let d1 = b.declare(boxed, Some(three));
        let read = b.name(boxed);
        let d2 = b.declare(x, Some(read));
        let null = b.null();
        let set_null = b.assign(boxed, null);
        let s3 = b.expr_stmt(set_null);
        let read = b.name(boxed);
        let unbox = b.assign(x, read);
        let s4 = b.expr_stmt(unbox);
        let body = b.block(vec![d1, d2, s3, s4]);
        let tree = b.build();

        let analysis = run(&tree, body);
        let records: Vec<_> = analysis.report.at(unbox).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::NullDereference);
        assert_eq!(analysis.report.len(), 1);
    }

    #[test]
    fn test_call_checks_argument_contracts() {
        let mut b = TreeBuilder::new();
        let n = b.param("n", TypeRef::int(), vec![Annotation::Positive]);
        let callee = b.method("take", vec![n], TypeRef::int(), vec![Annotation::Max(9)], None);
        let r = b.local("r", TypeRef::int());
        let zero = b.int(0);
        let call = b.call(Some(callee), None, vec![zero]);
        let decl = b.declare(r, Some(call));
        let body = b.block(vec![decl]);
        let tree = b.build();

        let analysis = run(&tree, body);
        let records: Vec<_> = analysis.report.at(call).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::ContractViolation(Annotation::Positive));
        assert!(records[0].definite);
        assert_eq!(analysis.final_state.get(r), Value::int_range(i32::MIN as i64, 9));
    }

    #[test]
    fn test_unknown_call_returns_any() {
        let mut b = TreeBuilder::new();
        let r = b.local("r", TypeRef::object("Foo"));
        let call = b.call(None, None, vec![]);
        let decl = b.declare(r, Some(call));
        let tree = b.build();

        let analysis = run(&tree, decl);
        assert_eq!(analysis.final_state.get(r), Value::Any);
        assert!(analysis.report.is_empty());
    }

    #[test]
    fn test_new_array_length() {
        let mut b = TreeBuilder::new();
        let a = b.local("a", TypeRef::array_of(TypeRef::int()));
        let four = b.int(4);
        let alloc = b.new_array(TypeRef::int(), four);
        let decl = b.declare(a, Some(alloc));
        let tree = b.build();

        let analysis = run(&tree, decl);
        assert_eq!(analysis.final_state.get(a), Value::array(Interval::point(4), false));
    }
}
