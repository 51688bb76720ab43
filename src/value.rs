//! Abstract values.
//!
//! A [`Value`] stands for a set of concrete runtime values. The lattice is a
//! closed tagged union: every reference-like variant carries its nullability
//! on a separate axis, so narrowing what the non-null values look like never
//! loses whether the reference can be null, and vice versa.
//!
//! ```text
//!                         Any
//!        /      |       |       |       \        \
//!  Integer    Char   Boolean   Str    Array ... Object
//!        \      |       |       |       /        /
//!                        Empty
//! ```
//!
//! `Null` sits below every nullable reference variant.

use std::fmt;

use crate::interval::Interval;

/// Largest length a string or array can have.
pub const MAX_LENGTH: i64 = i32::MAX as i64;

/// Range of Java character codes.
pub const CHAR_RANGE: Interval = Interval {
    min: 0,
    max: u16::MAX as i64,
};

/// Range of valid lengths.
pub const LENGTH_RANGE: Interval = Interval {
    min: 0,
    max: MAX_LENGTH,
};

/// Abstract value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Top: no information.
    Any,
    /// Bottom: no runtime value can reach here.
    Empty,
    /// Integral value within the interval.
    Integer(Interval),
    /// Character code within the interval (a sub-interval of [`CHAR_RANGE`]).
    Char(Interval),
    /// Boolean. At least one flag is set; otherwise the value is `Empty`.
    Boolean { can_be_true: bool, can_be_false: bool },
    /// String, approximated by its possible lengths.
    Str { length: Interval, nullable: bool },
    /// Array, approximated by its possible lengths.
    Array { length: Interval, nullable: bool },
    /// Definitely null.
    Null,
    /// Boxed primitive wrapping a primitive abstract value.
    Boxed { inner: Box<Value>, nullable: bool },
    /// Any other reference type.
    Object { nullable: bool },
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Integer(Interval::point(value))
    }

    /// Integer in `[min, max]`, or `Empty` if inverted.
    pub fn int_range(min: i64, max: i64) -> Self {
        Interval::new(min, max).map_or(Value::Empty, Value::Integer)
    }

    pub fn char(code: u16) -> Self {
        Value::Char(Interval::point(code as i64))
    }

    /// Character in `[min, max]`, clamped to the character range.
    pub fn char_range(min: i64, max: i64) -> Self {
        Interval::new(min, max)
            .and_then(|i| i.clamp_to(&CHAR_RANGE))
            .map_or(Value::Empty, Value::Char)
    }

    /// Boolean with the given possible outcomes; `Empty` if neither is possible.
    pub fn boolean(can_be_true: bool, can_be_false: bool) -> Self {
        if can_be_true || can_be_false {
            Value::Boolean {
                can_be_true,
                can_be_false,
            }
        } else {
            Value::Empty
        }
    }

    pub fn bool_const(value: bool) -> Self {
        Value::boolean(value, !value)
    }

    pub fn any_bool() -> Self {
        Value::boolean(true, true)
    }

    /// Non-null string literal of the given length.
    pub fn string_literal(text: &str) -> Self {
        let len = text.encode_utf16().count() as i64;
        Value::Str {
            length: Interval::point(len),
            nullable: false,
        }
    }

    pub fn string(length: Interval, nullable: bool) -> Self {
        match length.clamp_to(&LENGTH_RANGE) {
            Some(length) => Value::Str { length, nullable },
            None if nullable => Value::Null,
            None => Value::Empty,
        }
    }

    pub fn array(length: Interval, nullable: bool) -> Self {
        match length.clamp_to(&LENGTH_RANGE) {
            Some(length) => Value::Array { length, nullable },
            None if nullable => Value::Null,
            None => Value::Empty,
        }
    }

    /// Boxed primitive. An `Empty` inner value leaves only `null` (if allowed).
    pub fn boxed(inner: Value, nullable: bool) -> Self {
        match inner {
            Value::Empty if nullable => Value::Null,
            Value::Empty => Value::Empty,
            inner => Value::Boxed {
                inner: Box::new(inner),
                nullable,
            },
        }
    }

    pub fn object(nullable: bool) -> Self {
        Value::Object { nullable }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Value::Any)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is a reference-like value (possibly null).
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Value::Str { .. } | Value::Array { .. } | Value::Null | Value::Boxed { .. } | Value::Object { .. }
        )
    }

    /// Whether `null` is among the represented values.
    pub fn may_be_null(&self) -> bool {
        match self {
            Value::Null | Value::Any => true,
            Value::Str { nullable, .. }
            | Value::Array { nullable, .. }
            | Value::Boxed { nullable, .. }
            | Value::Object { nullable } => *nullable,
            _ => false,
        }
    }

    /// Same non-null values, with the nullable axis replaced.
    ///
    /// Removing nullability from `Null` leaves nothing (`Empty`). Non-reference
    /// values are returned unchanged.
    pub fn with_nullable(&self, nullable: bool) -> Value {
        match self {
            Value::Null if nullable => Value::Null,
            Value::Null => Value::Empty,
            Value::Str { length, .. } => Value::Str {
                length: *length,
                nullable,
            },
            Value::Array { length, .. } => Value::Array {
                length: *length,
                nullable,
            },
            Value::Boxed { inner, .. } => Value::Boxed {
                inner: inner.clone(),
                nullable,
            },
            Value::Object { .. } => Value::Object { nullable },
            other => other.clone(),
        }
    }

    /// The integral interval this value denotes, if numeric.
    ///
    /// Characters promote to their codes, mirroring binary numeric promotion.
    pub fn as_interval(&self) -> Option<Interval> {
        match self {
            Value::Integer(i) | Value::Char(i) => Some(*i),
            _ => None,
        }
    }

    /// Length interval of strings and arrays.
    pub fn length(&self) -> Option<Interval> {
        match self {
            Value::Str { length, .. } | Value::Array { length, .. } => Some(*length),
            _ => None,
        }
    }

    /// Same reference, with the length axis replaced.
    pub fn with_length(&self, length: Option<Interval>) -> Value {
        match (self, length) {
            (Value::Str { nullable, .. }, Some(length)) => Value::string(length, *nullable),
            (Value::Array { nullable, .. }, Some(length)) => Value::array(length, *nullable),
            (Value::Str { nullable, .. } | Value::Array { nullable, .. }, None) => {
                if *nullable {
                    Value::Null
                } else {
                    Value::Empty
                }
            }
            (other, _) => other.clone(),
        }
    }

    /// Boolean outcomes `(can_be_true, can_be_false)`, if boolean.
    pub fn as_bool(&self) -> Option<(bool, bool)> {
        match self {
            Value::Boolean {
                can_be_true,
                can_be_false,
            } => Some((*can_be_true, *can_be_false)),
            Value::Boxed { inner, .. } => inner.as_bool(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let null_suffix = |nullable: bool| if nullable { "?" } else { "" };
        match self {
            Value::Any => write!(f, "⊤"),
            Value::Empty => write!(f, "⊥"),
            Value::Integer(i) => write!(f, "int{}", i),
            Value::Char(i) => write!(f, "char{}", i),
            Value::Boolean {
                can_be_true,
                can_be_false,
            } => match (can_be_true, can_be_false) {
                (true, true) => write!(f, "bool"),
                (true, false) => write!(f, "true"),
                _ => write!(f, "false"),
            },
            Value::Str { length, nullable } => write!(f, "String{}(len {})", null_suffix(*nullable), length),
            Value::Array { length, nullable } => write!(f, "array{}(len {})", null_suffix(*nullable), length),
            Value::Null => write!(f, "null"),
            Value::Boxed { inner, nullable } => write!(f, "boxed{}({})", null_suffix(*nullable), inner),
            Value::Object { nullable } => write!(f, "object{}", null_suffix(*nullable)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_constructors_keep_invariants() {
        assert_eq!(Value::int_range(3, 1), Value::Empty);
        assert_eq!(Value::boolean(false, false), Value::Empty);
        assert_eq!(Value::char_range(-5, 10), Value::Char(Interval::new(0, 10).unwrap()));
        assert_eq!(Value::boxed(Value::Empty, true), Value::Null);
        assert_eq!(Value::boxed(Value::Empty, false), Value::Empty);
    }

    #[test]
    fn test_string_literal_length() {
        assert_eq!(
            Value::string_literal("hello"),
            Value::Str {
                length: Interval::point(5),
                nullable: false
            }
        );
    }

    #[test]
    fn test_nullable_axis() {
        let s = Value::string(LENGTH_RANGE, true);
        assert!(s.may_be_null());
        let s = s.with_nullable(false);
        assert!(!s.may_be_null());
        assert_eq!(s.length(), Some(LENGTH_RANGE));
        assert_eq!(Value::Null.with_nullable(false), Value::Empty);
    }

    #[test]
    fn test_with_length_out_of_range() {
        let a = Value::array(LENGTH_RANGE, true);
        assert_eq!(a.with_length(None), Value::Null);
        let a = a.with_nullable(false);
        assert_eq!(a.with_length(None), Value::Empty);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::int(3).to_string(), "int[3, 3]");
        assert_eq!(Value::bool_const(true).to_string(), "true");
        assert_eq!(Value::object(true).to_string(), "object?");
    }
}
