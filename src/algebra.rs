//! Operation algebra over abstract values.
//!
//! Every operation is total over every ordered pair of [`Value`] variants:
//! pairs without a precise rule fall into one explicit default arm, which is
//! always sound (`Any` for merge/intersect/arithmetic, the unchanged receiver
//! for the `restrict_*` narrowings).
//!
//! Arithmetic never panics and never wraps: endpoints saturate (see
//! [`Interval`]). Faults detected along the way (null operands, zero
//! divisors) are returned next to the resulting value as a [`Fault`]; the
//! caller decides where to report them.

use std::fmt;

use crate::interval::Interval;
use crate::value::{Value, CHAR_RANGE, LENGTH_RANGE};

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        };
        write!(f, "{}", s)
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// Logical negation: `!(a < b)` is `a >= b`.
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
        }
    }

    /// Operand swap: `a < b` is `b > a`.
    pub fn flip(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
        }
    }

    pub fn is_ordering(self) -> bool {
        !matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        };
        write!(f, "{}", s)
    }
}

/// Kind of runtime fault an operation can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FaultKind {
    NullDereference,
    DivisionByZero,
}

/// Fault signalled by an operation.
///
/// `definite` means every value of the offending operand triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fault {
    pub kind: FaultKind,
    pub definite: bool,
}

impl Fault {
    pub fn definite(kind: FaultKind) -> Self {
        Fault { kind, definite: true }
    }

    pub fn potential(kind: FaultKind) -> Self {
        Fault { kind, definite: false }
    }
}

/// Result of an operation: the value plus an optional fault signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub value: Value,
    pub fault: Option<Fault>,
}

impl Outcome {
    pub fn ok(value: Value) -> Self {
        Outcome { value, fault: None }
    }

    pub fn faulted(value: Value, fault: Fault) -> Self {
        Outcome {
            value,
            fault: Some(fault),
        }
    }

    /// Transforms the value, keeping the fault.
    pub fn map(self, f: impl FnOnce(Value) -> Value) -> Self {
        Outcome {
            value: f(self.value),
            fault: self.fault,
        }
    }
}

impl Value {
    /// Join (`⊔`): over-approximation of the union. Commutative and idempotent.
    pub fn merge(&self, other: &Value) -> Value {
        use Value::*;
        match (self, other) {
            (Empty, v) | (v, Empty) => v.clone(),
            (Any, _) | (_, Any) => Any,
            (Integer(a), Integer(b)) => Integer(a.hull(b)),
            (Char(a), Char(b)) => Char(a.hull(b)),
            (Integer(a), Char(b)) | (Char(b), Integer(a)) => Integer(a.hull(b)),
            (
                Boolean {
                    can_be_true: t1,
                    can_be_false: f1,
                },
                Boolean {
                    can_be_true: t2,
                    can_be_false: f2,
                },
            ) => Value::boolean(*t1 || *t2, *f1 || *f2),
            (Str { length: a, nullable: n }, Str { length: b, nullable: m }) => Str {
                length: a.hull(b),
                nullable: *n || *m,
            },
            (Array { length: a, nullable: n }, Array { length: b, nullable: m }) => Array {
                length: a.hull(b),
                nullable: *n || *m,
            },
            (Null, Null) => Null,
            (Null, r) | (r, Null) if r.is_reference() => r.with_nullable(true),
            (Boxed { inner: a, nullable: n }, Boxed { inner: b, nullable: m }) => Value::boxed(a.merge(b), *n || *m),
            (Boxed { inner, nullable }, p) | (p, Boxed { inner, nullable }) if p.is_primitive() => {
                Value::boxed(inner.merge(p), *nullable)
            }
            (Object { .. }, r) | (r, Object { .. }) if r.is_reference() => Object {
                nullable: self.may_be_null() || other.may_be_null(),
            },
            _ => Any,
        }
    }

    /// Meet (`⊓`): over-approximation of the intersection.
    pub fn intersect(&self, other: &Value) -> Value {
        use Value::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Empty,
            (Any, v) | (v, Any) => v.clone(),
            (Integer(a), Integer(b)) => a.meet(b).map_or(Empty, Integer),
            (Char(a), Char(b)) | (Integer(a), Char(b)) | (Char(b), Integer(a)) => a.meet(b).map_or(Empty, Char),
            (
                Boolean {
                    can_be_true: t1,
                    can_be_false: f1,
                },
                Boolean {
                    can_be_true: t2,
                    can_be_false: f2,
                },
            ) => Value::boolean(*t1 && *t2, *f1 && *f2),
            (Str { length: a, nullable: n }, Str { length: b, nullable: m }) => match a.meet(b) {
                Some(length) => Str {
                    length,
                    nullable: *n && *m,
                },
                None if *n && *m => Null,
                None => Empty,
            },
            (Array { length: a, nullable: n }, Array { length: b, nullable: m }) => match a.meet(b) {
                Some(length) => Array {
                    length,
                    nullable: *n && *m,
                },
                None if *n && *m => Null,
                None => Empty,
            },
            (Null, Null) => Null,
            (Null, r) | (r, Null) if r.is_reference() => {
                if r.may_be_null() {
                    Null
                } else {
                    Empty
                }
            }
            (Boxed { inner: a, nullable: n }, Boxed { inner: b, nullable: m }) => {
                Value::boxed(a.intersect(b), *n && *m)
            }
            (Boxed { inner, .. }, p) | (p, Boxed { inner, .. }) if p.is_primitive() => {
                Value::boxed(inner.intersect(p), false)
            }
            (Object { nullable: n }, Object { nullable: m }) => Object { nullable: *n && *m },
            (Object { nullable }, r) | (r, Object { nullable }) if r.is_reference() => {
                r.with_nullable(r.may_be_null() && *nullable)
            }
            _ => Any,
        }
    }

    pub fn add(&self, other: &Value) -> Outcome {
        self.arith(ArithOp::Add, other)
    }

    pub fn subtract(&self, other: &Value) -> Outcome {
        self.arith(ArithOp::Sub, other)
    }

    pub fn multiply(&self, other: &Value) -> Outcome {
        self.arith(ArithOp::Mul, other)
    }

    pub fn divide(&self, other: &Value) -> Outcome {
        self.arith(ArithOp::Div, other)
    }

    pub fn remainder(&self, other: &Value) -> Outcome {
        self.arith(ArithOp::Rem, other)
    }

    /// Binary arithmetic.
    ///
    /// `Empty` operands propagate silently (the fault that produced them has
    /// already been reported). A `null` operand yields `Empty` plus a definite
    /// null dereference, except for string concatenation.
    pub fn arith(&self, op: ArithOp, other: &Value) -> Outcome {
        use Value::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Outcome::ok(Empty),
            (Str { .. }, _) | (_, Str { .. }) if op == ArithOp::Add => Outcome::ok(concat(self, other)),
            (Null, _) | (_, Null) => Outcome::faulted(Empty, Fault::definite(FaultKind::NullDereference)),
            (Boxed { inner: a, nullable: n }, Boxed { inner: b, nullable: m }) => {
                let nullable = *n || *m;
                a.arith(op, b).map(|v| Value::boxed(v, nullable))
            }
            (Boxed { inner, nullable }, p) => {
                let nullable = *nullable;
                inner.arith(op, p).map(|v| Value::boxed(v, nullable))
            }
            (p, Boxed { inner, nullable }) => {
                let nullable = *nullable;
                p.arith(op, inner).map(|v| Value::boxed(v, nullable))
            }
            _ => match (self.as_interval(), other.as_interval()) {
                (Some(a), Some(b)) => numeric(op, &a, &b),
                _ => Outcome::ok(Any),
            },
        }
    }

    /// Unary minus.
    pub fn negate(&self) -> Outcome {
        match self {
            Value::Empty => Outcome::ok(Value::Empty),
            Value::Null => Outcome::faulted(Value::Empty, Fault::definite(FaultKind::NullDereference)),
            Value::Integer(i) | Value::Char(i) => Outcome::ok(Value::Integer(i.neg())),
            Value::Boxed { inner, nullable } => {
                let nullable = *nullable;
                inner.negate().map(|v| Value::boxed(v, nullable))
            }
            _ => Outcome::ok(Value::Any),
        }
    }

    /// Logical not.
    pub fn not(&self) -> Outcome {
        match self {
            Value::Empty => Outcome::ok(Value::Empty),
            Value::Null => Outcome::faulted(Value::Empty, Fault::definite(FaultKind::NullDereference)),
            Value::Boolean {
                can_be_true,
                can_be_false,
            } => Outcome::ok(Value::boolean(*can_be_false, *can_be_true)),
            Value::Boxed { inner, nullable } => {
                let nullable = *nullable;
                inner.not().map(|v| Value::boxed(v, nullable))
            }
            _ => Outcome::ok(Value::Any),
        }
    }

    /// Value of the comparison `self OP other`: which outcomes are possible.
    ///
    /// Derived from the narrowings, so the outcome is consistent with what
    /// the condition evaluator will do to each branch.
    pub fn compare(&self, op: CmpOp, other: &Value) -> Outcome {
        if self.is_empty() || other.is_empty() {
            return Outcome::ok(Value::Empty);
        }
        if op.is_ordering() && (self.is_null() || other.is_null()) {
            return Outcome::faulted(Value::Empty, Fault::definite(FaultKind::NullDereference));
        }
        let can_be_true = !self.restrict(op, other).is_empty();
        let can_be_false = !self.restrict(op.negate(), other).is_empty();
        Outcome::ok(Value::boolean(can_be_true, can_be_false))
    }

    /// Narrows `self` given that `self OP other` holds.
    pub fn restrict(&self, op: CmpOp, other: &Value) -> Value {
        match op {
            CmpOp::Lt => self.restrict_less(other),
            CmpOp::Le => self.restrict_less_or_equal(other),
            CmpOp::Gt => self.restrict_greater(other),
            CmpOp::Ge => self.restrict_greater_or_equal(other),
            CmpOp::Eq => self.restrict_equal(other),
            CmpOp::Ne => self.restrict_not_equal(other),
        }
    }

    pub fn restrict_greater(&self, other: &Value) -> Value {
        self.restrict_ordered(other, Interval::restrict_greater)
    }

    pub fn restrict_greater_or_equal(&self, other: &Value) -> Value {
        self.restrict_ordered(other, Interval::restrict_greater_or_equal)
    }

    pub fn restrict_less(&self, other: &Value) -> Value {
        self.restrict_ordered(other, Interval::restrict_less)
    }

    pub fn restrict_less_or_equal(&self, other: &Value) -> Value {
        self.restrict_ordered(other, Interval::restrict_less_or_equal)
    }

    fn restrict_ordered(&self, other: &Value, narrow: fn(&Interval, &Interval) -> Option<Interval>) -> Value {
        use Value::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Empty,
            // Comparing null numerically throws; nothing continues on either branch.
            (Null, _) | (_, Null) => Empty,
            // Unboxing succeeded, so the receiver is not null afterwards.
            (Boxed { inner, .. }, o) => Value::boxed(inner.restrict_ordered(o, narrow), false),
            (s, Boxed { inner, .. }) => s.restrict_ordered(inner, narrow),
            (Integer(a), o) => match o.as_interval() {
                Some(b) => narrow(a, &b).map_or(Empty, Integer),
                None => self.clone(),
            },
            (Char(a), o) => match o.as_interval() {
                Some(b) => narrow(a, &b).map_or(Empty, Char),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }

    pub fn restrict_equal(&self, other: &Value) -> Value {
        use Value::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Empty,
            (s, Null) => {
                if s.may_be_null() {
                    Null
                } else {
                    Empty
                }
            }
            (Null, o) => {
                if o.may_be_null() {
                    Null
                } else {
                    Empty
                }
            }
            (Integer(a), o) if o.as_interval().is_some() => {
                o.as_interval().and_then(|b| a.meet(&b)).map_or(Empty, Integer)
            }
            (Char(a), o) if o.as_interval().is_some() => o.as_interval().and_then(|b| a.meet(&b)).map_or(Empty, Char),
            (Boxed { inner, .. }, o) if o.is_primitive() => Value::boxed(inner.restrict_equal(o), false),
            (s, Boxed { inner, .. }) if s.is_primitive() => s.restrict_equal(inner),
            _ => match self.intersect(other) {
                Any => self.clone(),
                v => v,
            },
        }
    }

    /// Only narrows against a single point at one of our endpoints, or `null`.
    pub fn restrict_not_equal(&self, other: &Value) -> Value {
        use Value::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Empty,
            (s, Null) => s.with_nullable(false),
            (Null, _) => Null,
            (Integer(a), o) if o.as_interval().is_some() => {
                o.as_interval().and_then(|b| a.restrict_not_equal(&b)).map_or(Empty, Integer)
            }
            (Char(a), o) if o.as_interval().is_some() => {
                o.as_interval().and_then(|b| a.restrict_not_equal(&b)).map_or(Empty, Char)
            }
            (
                Boolean {
                    can_be_true,
                    can_be_false,
                },
                o,
            ) => match o.as_bool() {
                Some((true, false)) => Value::boolean(false, *can_be_false),
                Some((false, true)) => Value::boolean(*can_be_true, false),
                _ => self.clone(),
            },
            (Boxed { inner, .. }, o) if o.is_primitive() => Value::boxed(inner.restrict_not_equal(o), false),
            (s, Boxed { inner, .. }) if s.is_primitive() => s.restrict_not_equal(inner),
            _ => self.clone(),
        }
    }

    /// Widening (`∇`): like merge, but interval bounds that grew jump to infinity.
    pub fn widen(&self, next: &Value) -> Value {
        use Value::*;
        match (self, next) {
            (Empty, v) | (v, Empty) => v.clone(),
            (Integer(a), Integer(b)) => Integer(a.widen(b)),
            (Char(a), Char(b)) => Char(a.widen(b).clamp_to(&CHAR_RANGE).unwrap_or(CHAR_RANGE)),
            (Str { length: a, nullable: n }, Str { length: b, nullable: m }) => Str {
                length: a.widen(b).clamp_to(&LENGTH_RANGE).unwrap_or(LENGTH_RANGE),
                nullable: *n || *m,
            },
            (Array { length: a, nullable: n }, Array { length: b, nullable: m }) => Array {
                length: a.widen(b).clamp_to(&LENGTH_RANGE).unwrap_or(LENGTH_RANGE),
                nullable: *n || *m,
            },
            (Boxed { inner: a, nullable: n }, Boxed { inner: b, nullable: m }) => Value::boxed(a.widen(b), *n || *m),
            _ => self.merge(next),
        }
    }

    /// Primitive (non-reference, non-lattice-extreme) value.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Char(_) | Value::Boolean { .. })
    }
}

fn numeric(op: ArithOp, a: &Interval, b: &Interval) -> Outcome {
    match op {
        ArithOp::Add => Outcome::ok(Value::Integer(a.add(b))),
        ArithOp::Sub => Outcome::ok(Value::Integer(a.sub(b))),
        ArithOp::Mul => Outcome::ok(Value::Integer(a.mul(b))),
        ArithOp::Div | ArithOp::Rem if b.contains(0) => {
            let definite = b.as_point() == Some(0);
            Outcome::faulted(
                Value::Empty,
                Fault {
                    kind: FaultKind::DivisionByZero,
                    definite,
                },
            )
        }
        ArithOp::Div => Outcome::ok(Value::Integer(a.div(b))),
        ArithOp::Rem => Outcome::ok(Value::Integer(a.rem(b))),
    }
}

/// String concatenation: lengths add; `null` prints as "null".
fn concat(lhs: &Value, rhs: &Value) -> Value {
    const NULL_TEXT: Interval = Interval { min: 4, max: 4 };
    let piece = |v: &Value| match v {
        Value::Str { length, nullable: true } => length.hull(&NULL_TEXT),
        Value::Str { length, nullable: false } => *length,
        Value::Null => NULL_TEXT,
        Value::Char(_) => Interval::point(1),
        Value::Boolean { .. } => Interval { min: 4, max: 5 },
        Value::Integer(_) => Interval { min: 1, max: 20 },
        _ => LENGTH_RANGE,
    };
    let length = piece(lhs).add(&piece(rhs));
    Value::string(length.clamp_to(&LENGTH_RANGE).unwrap_or(LENGTH_RANGE), false)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use test_log::test;

    use crate::value::MAX_LENGTH;

    /// Representative values covering every variant.
    pub fn samples() -> Vec<Value> {
        vec![
            Value::Any,
            Value::Empty,
            Value::int(0),
            Value::int_range(1, 10),
            Value::int_range(-5, 5),
            Value::int_range(i64::MIN, 3),
            Value::char_range(48, 57),
            Value::bool_const(true),
            Value::bool_const(false),
            Value::any_bool(),
            Value::string_literal("abc"),
            Value::string(LENGTH_RANGE, true),
            Value::array(Interval::point(3), false),
            Value::array(LENGTH_RANGE, true),
            Value::Null,
            Value::boxed(Value::int_range(0, 9), true),
            Value::boxed(Value::int(7), false),
            Value::object(true),
            Value::object(false),
        ]
    }

    #[test]
    fn test_merge_commutative_and_idempotent() {
        for a in samples() {
            assert_eq!(a.merge(&a), a, "merge not idempotent for {}", a);
            for b in samples() {
                assert_eq!(a.merge(&b), b.merge(&a), "merge not commutative for {} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_merge_identity_and_absorption() {
        for a in samples() {
            assert_eq!(a.merge(&Value::Empty), a);
            assert_eq!(a.merge(&Value::Any), Value::Any);
            assert_eq!(a.intersect(&Value::Any), a);
            assert_eq!(a.intersect(&Value::Empty), Value::Empty);
        }
    }

    #[test]
    fn test_intersect_ranges() {
        assert_eq!(Value::int_range(1, 10).intersect(&Value::int_range(5, 20)), Value::int_range(5, 10));
        assert_eq!(Value::int_range(1, 4).intersect(&Value::int_range(5, 20)), Value::Empty);
    }

    #[test]
    fn test_merge_null_widens_reference() {
        let s = Value::string_literal("abc");
        assert_eq!(Value::Null.merge(&s), s.with_nullable(true));
        assert_eq!(s.merge(&Value::Null), s.with_nullable(true));
        assert_eq!(Value::Null.merge(&Value::int(1)), Value::Any);
    }

    #[test]
    fn test_intersect_null() {
        assert_eq!(Value::Null.intersect(&Value::object(true)), Value::Null);
        assert_eq!(Value::Null.intersect(&Value::object(false)), Value::Empty);
        assert_eq!(
            Value::string(Interval::point(2), true).intersect(&Value::string(Interval::point(3), true)),
            Value::Null
        );
    }

    #[test]
    fn test_add_subtract() {
        let a = Value::int_range(-10, 200);
        let b = Value::int_range(-160, -10);
        assert_eq!(a.add(&b), Outcome::ok(Value::int_range(-170, 190)));
        assert_eq!(a.subtract(&b), Outcome::ok(Value::int_range(0, 360)));
    }

    #[test]
    fn test_multiply_corners() {
        let a = Value::int_range(-3, 2);
        let b = Value::int_range(-4, 5);
        assert_eq!(a.multiply(&b), Outcome::ok(Value::int_range(-15, 12)));
    }

    #[test]
    fn test_arith_saturates() {
        let big = Value::int(i64::MAX);
        assert_eq!(big.add(&Value::int(1)).value, Value::int(i64::MAX));
        assert_eq!(Value::int(i64::MIN).subtract(&Value::int(1)).value, Value::int(i64::MIN));
    }

    #[test]
    fn test_arith_null_operand() {
        for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div] {
            let out = Value::int(1).arith(op, &Value::Null);
            assert_eq!(out.value, Value::Empty);
            assert_eq!(out.fault, Some(Fault::definite(FaultKind::NullDereference)));
        }
    }

    #[test]
    fn test_arith_empty_operand_is_silent() {
        let out = Value::Empty.divide(&Value::int(0));
        assert_eq!(out, Outcome::ok(Value::Empty));
    }

    #[test]
    fn test_divide_by_zero() {
        let out = Value::int(10).divide(&Value::int(0));
        assert_eq!(out.value, Value::Empty);
        assert_eq!(out.fault, Some(Fault::definite(FaultKind::DivisionByZero)));

        let out = Value::int(10).divide(&Value::int_range(-1, 3));
        assert_eq!(out.value, Value::Empty);
        assert_eq!(out.fault, Some(Fault::potential(FaultKind::DivisionByZero)));

        let out = Value::int_range(10, 20).divide(&Value::int_range(2, 5));
        assert_eq!(out, Outcome::ok(Value::int_range(2, 10)));
    }

    #[test]
    fn test_remainder_by_zero() {
        let out = Value::int(10).remainder(&Value::int_range(0, 3));
        assert_eq!(out.fault, Some(Fault::potential(FaultKind::DivisionByZero)));
    }

    #[test]
    fn test_boxed_arith_rewraps() {
        let a = Value::boxed(Value::int_range(1, 2), false);
        let b = Value::boxed(Value::int(10), true);
        assert_eq!(a.add(&Value::int(1)).value, Value::boxed(Value::int_range(2, 3), false));
        assert_eq!(a.add(&b).value, Value::boxed(Value::int_range(11, 12), true));
    }

    #[test]
    fn test_string_concat() {
        let out = Value::string_literal("ab").add(&Value::string_literal("cde"));
        assert_eq!(out, Outcome::ok(Value::string(Interval::point(5), false)));
        let out = Value::string_literal("x").add(&Value::Null);
        assert_eq!(out.value, Value::string(Interval::point(5), false));
        assert_eq!(out.fault, None);
    }

    #[test]
    fn test_restrict_greater() {
        let a = Value::int_range(1, 10);
        assert_eq!(a.restrict_greater(&Value::int(5)), Value::int_range(6, 10));
        assert_eq!(a.restrict_greater(&Value::int(10)), Value::Empty);
        assert_eq!(a.restrict_less_or_equal(&Value::int(5)), Value::int_range(1, 5));
        assert_eq!(a.restrict_less(&Value::int_range(3, 20)), Value::int_range(1, 10));
        assert_eq!(a.restrict_greater_or_equal(&Value::int_range(3, 20)), Value::int_range(3, 10));
    }

    #[test]
    fn test_restrict_keeps_char_kind() {
        let c = Value::char_range(0, 100);
        assert_eq!(c.restrict_less(&Value::int(10)), Value::char_range(0, 9));
    }

    #[test]
    fn test_restrict_equal_and_not_equal() {
        let a = Value::int_range(1, 10);
        assert_eq!(a.restrict_equal(&Value::int(4)), Value::int(4));
        assert_eq!(a.restrict_equal(&Value::int(40)), Value::Empty);
        assert_eq!(a.restrict_not_equal(&Value::int(1)), Value::int_range(2, 10));
        assert_eq!(a.restrict_not_equal(&Value::int(10)), Value::int_range(1, 9));
        assert_eq!(a.restrict_not_equal(&Value::int(5)), a);
        assert_eq!(a.restrict_not_equal(&Value::int_range(1, 2)), a);
    }

    #[test]
    fn test_restrict_nullness() {
        let s = Value::string(LENGTH_RANGE, true);
        assert_eq!(s.restrict_equal(&Value::Null), Value::Null);
        assert_eq!(s.restrict_not_equal(&Value::Null), s.with_nullable(false));
        assert_eq!(Value::Null.restrict_not_equal(&Value::Null), Value::Empty);
        assert_eq!(Value::object(false).restrict_equal(&Value::Null), Value::Empty);
        assert_eq!(Value::Any.restrict_equal(&Value::Null), Value::Null);
    }

    #[test]
    fn test_restrict_boolean() {
        let b = Value::any_bool();
        assert_eq!(b.restrict_not_equal(&Value::bool_const(true)), Value::bool_const(false));
        assert_eq!(b.restrict_equal(&Value::bool_const(true)), Value::bool_const(true));
    }

    #[test]
    fn test_restrict_boxed_unboxes() {
        let b = Value::boxed(Value::int_range(0, 10), true);
        assert_eq!(b.restrict_greater(&Value::int(5)), Value::boxed(Value::int_range(6, 10), false));
    }

    #[test]
    fn test_restrict_unhandled_returns_receiver() {
        let o = Value::object(true);
        assert_eq!(o.restrict_greater(&Value::int(3)), o);
    }

    #[test]
    fn test_compare() {
        let a = Value::int_range(1, 10);
        assert_eq!(a.compare(CmpOp::Gt, &Value::int(0)).value, Value::bool_const(true));
        assert_eq!(a.compare(CmpOp::Gt, &Value::int(10)).value, Value::bool_const(false));
        assert_eq!(a.compare(CmpOp::Gt, &Value::int(5)).value, Value::any_bool());
        assert_eq!(Value::Null.compare(CmpOp::Eq, &Value::Null).value, Value::bool_const(true));
        assert_eq!(
            Value::object(false).compare(CmpOp::Eq, &Value::Null).value,
            Value::bool_const(false)
        );
    }

    #[test]
    fn test_compare_null_ordering_faults() {
        let out = Value::Null.compare(CmpOp::Lt, &Value::int(1));
        assert_eq!(out.fault, Some(Fault::definite(FaultKind::NullDereference)));
    }

    #[test]
    fn test_negate_and_not() {
        assert_eq!(Value::int_range(-3, 5).negate().value, Value::int_range(-5, 3));
        assert_eq!(Value::bool_const(true).not().value, Value::bool_const(false));
        assert_eq!(Value::any_bool().not().value, Value::any_bool());
    }

    #[test]
    fn test_widen() {
        let a = Value::int_range(0, 1);
        assert_eq!(a.widen(&Value::int_range(0, 2)), Value::int_range(0, i64::MAX));
        let s = Value::string(Interval::point(1), false);
        assert_eq!(
            s.widen(&Value::string(Interval::new(1, 2).unwrap(), false)),
            Value::string(Interval::new(1, MAX_LENGTH).unwrap(), false)
        );
        for a in samples() {
            for b in samples() {
                let widened = a.widen(&b);
                assert_eq!(widened.merge(&a.merge(&b)), widened, "widen below merge for {} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_cmp_op_negate_flip() {
        for op in [CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge, CmpOp::Eq, CmpOp::Ne] {
            assert_eq!(op.negate().negate(), op);
            assert_eq!(op.flip().flip(), op);
        }
        assert_eq!(CmpOp::Lt.negate(), CmpOp::Ge);
        assert_eq!(CmpOp::Lt.flip(), CmpOp::Gt);
    }
}
