//! Translation between declarations and abstract values.
//!
//! Declared types and annotations turn into initial values for parameters,
//! fields and call results. In the other direction, values flowing into an
//! annotated position are checked against the annotations.

use crate::algebra::{Fault, FaultKind, Outcome};
use crate::ast::{DeclKind, MethodDecl, Tree};
use crate::error::AnalysisError;
use crate::interval::Interval;
use crate::state::State;
use crate::types::{Annotation, PrimitiveKind, TypeRef};
use crate::value::{Value, CHAR_RANGE, LENGTH_RANGE};

/// Most general value of a declared type.
pub fn default_value(ty: &TypeRef) -> Value {
    match ty {
        TypeRef::Primitive(kind) => default_primitive(*kind),
        TypeRef::String => Value::string(LENGTH_RANGE, true),
        TypeRef::Array(_) => Value::array(LENGTH_RANGE, true),
        TypeRef::Boxed(kind) => Value::boxed(default_primitive(*kind), true),
        TypeRef::Object(_) => Value::object(true),
        TypeRef::Void => Value::Any,
    }
}

fn default_primitive(kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::Boolean => Value::any_bool(),
        PrimitiveKind::Char => Value::Char(CHAR_RANGE),
        PrimitiveKind::Float | PrimitiveKind::Double => Value::Any,
        integral => integral.range().map_or(Value::Any, Value::Integer),
    }
}

/// Value of a declaration with the given type and contracts.
pub fn initial_value(ty: &TypeRef, annotations: &[Annotation]) -> Value {
    annotations
        .iter()
        .fold(default_value(ty), |value, annotation| apply(&value, annotation))
}

/// Narrows a value to what the annotation admits.
pub fn apply(value: &Value, annotation: &Annotation) -> Value {
    if let Some(bounds) = annotation.numeric_bounds() {
        return narrow_numeric(value, &bounds);
    }
    match annotation {
        Annotation::NotNull => value.with_nullable(false),
        Annotation::NotEmpty => narrow_length(&value.with_nullable(false), &Interval::at_least(1)),
        Annotation::Size { .. } => match annotation.length_bounds() {
            Some(bounds) => narrow_length(value, &bounds),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn narrow_numeric(value: &Value, bounds: &Interval) -> Value {
    match value {
        Value::Integer(i) => i.meet(bounds).map_or(Value::Empty, Value::Integer),
        Value::Char(i) => i.meet(bounds).map_or(Value::Empty, Value::Char),
        Value::Boxed { inner, nullable } => Value::boxed(narrow_numeric(inner, bounds), *nullable),
        other => other.clone(),
    }
}

fn narrow_length(value: &Value, bounds: &Interval) -> Value {
    match value.length() {
        Some(length) => value.with_length(length.meet(bounds)),
        None => value.clone(),
    }
}

/// A value that does not (or may not) satisfy an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub annotation: Annotation,
    /// Every represented value violates the annotation.
    pub definite: bool,
}

/// Checks a value against each annotation.
///
/// Values about which nothing is known (`Any`) and unreachable values
/// (`Empty`) never violate anything.
pub fn check(value: &Value, annotations: &[Annotation]) -> Vec<Violation> {
    annotations
        .iter()
        .filter_map(|annotation| {
            check_one(value, annotation).map(|definite| Violation {
                annotation: annotation.clone(),
                definite,
            })
        })
        .collect()
}

fn check_one(value: &Value, annotation: &Annotation) -> Option<bool> {
    if value.is_empty() || value.is_any() {
        return None;
    }
    if let Some(bounds) = annotation.numeric_bounds() {
        let actual = match value {
            Value::Boxed { inner, .. } => inner.as_interval(),
            other => other.as_interval(),
        }?;
        return compare_bounds(&actual, &bounds);
    }
    match annotation {
        Annotation::NotNull => {
            if value.is_null() {
                Some(true)
            } else if value.may_be_null() {
                Some(false)
            } else {
                None
            }
        }
        Annotation::NotEmpty => {
            if value.is_null() {
                return Some(true);
            }
            let length = compare_bounds(&value.length()?, &Interval::at_least(1));
            match (length, value.may_be_null()) {
                (Some(true), _) => Some(true),
                (Some(false), _) | (None, true) => Some(false),
                (None, false) => None,
            }
        }
        Annotation::Size { .. } => {
            let bounds = annotation.length_bounds()?;
            compare_bounds(&value.length()?, &bounds)
        }
        _ => None,
    }
}

/// `Some(true)` if disjoint, `Some(false)` if partially outside.
fn compare_bounds(actual: &Interval, allowed: &Interval) -> Option<bool> {
    if actual.is_disjoint(allowed) {
        Some(true)
    } else if !allowed.contains_interval(actual) {
        Some(false)
    } else {
        None
    }
}

/// Assignment conversion of a value into a declared type.
///
/// Unboxes into primitives (a definite `null` faults), boxes primitives into
/// wrappers, and saturates integral values into the target width.
pub fn coerce(value: &Value, ty: &TypeRef) -> Outcome {
    convert(value, ty, Overflow::Saturate)
}

/// Explicit cast. Like [`coerce`], except that integral values that do not
/// fit the target width may wrap to anything in it.
pub fn cast(value: &Value, ty: &TypeRef) -> Outcome {
    convert(value, ty, Overflow::Wrap)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Overflow {
    Saturate,
    Wrap,
}

fn convert(value: &Value, ty: &TypeRef, overflow: Overflow) -> Outcome {
    if value.is_empty() {
        return Outcome::ok(Value::Empty);
    }
    match ty {
        TypeRef::Primitive(kind) => match value {
            Value::Null => Outcome::faulted(Value::Empty, Fault::definite(FaultKind::NullDereference)),
            Value::Boxed { inner, nullable } => {
                let unboxed = convert_primitive(inner.as_ref().clone(), *kind, overflow);
                if *nullable {
                    Outcome::faulted(unboxed, Fault::potential(FaultKind::NullDereference))
                } else {
                    Outcome::ok(unboxed)
                }
            }
            other => Outcome::ok(convert_primitive(other.clone(), *kind, overflow)),
        },
        TypeRef::Boxed(kind) => match value {
            primitive if primitive.is_primitive() => {
                Outcome::ok(Value::boxed(convert_primitive(primitive.clone(), *kind, overflow), false))
            }
            Value::Boxed { inner, nullable } => Outcome::ok(Value::boxed(
                convert_primitive(inner.as_ref().clone(), *kind, overflow),
                *nullable,
            )),
            other => Outcome::ok(other.clone()),
        },
        _ => Outcome::ok(value.clone()),
    }
}

fn convert_primitive(value: Value, kind: PrimitiveKind, overflow: Overflow) -> Value {
    let range = match kind {
        PrimitiveKind::Boolean => return value,
        PrimitiveKind::Float | PrimitiveKind::Double => return Value::Any,
        integral => match integral.range() {
            Some(range) => range,
            None => return value,
        },
    };
    let Some(i) = value.as_interval() else {
        return value;
    };
    let fitted = match overflow {
        _ if range.contains_interval(&i) => i,
        Overflow::Saturate => Interval {
            min: i.min.clamp(range.min, range.max),
            max: i.max.clamp(range.min, range.max),
        },
        Overflow::Wrap => range,
    };
    if kind == PrimitiveKind::Char {
        Value::Char(fitted)
    } else {
        Value::Integer(fitted)
    }
}

/// State on entry to a method: fields and parameters at their declared values.
pub fn entry_state(tree: &Tree, method: &MethodDecl) -> Result<State, AnalysisError> {
    let mut state = State::new();
    for (id, decl) in tree.decls_of_kind(DeclKind::Field) {
        state.set(id, initial_value(&decl.ty, &decl.annotations));
    }
    for &param in &method.params {
        let decl = tree.decl(param)?;
        state.set(param, initial_value(&decl.ty, &decl.annotations));
    }
    Ok(state)
}
