//! Variable states.
//!
//! A [`State`] maps declarations to abstract values at one program point.
//! A domain-empty state describes a point no execution reaches: reading any
//! variable from it yields `Empty`, and it is the identity of [`State::merge_with`].

use std::collections::BTreeMap;
use std::fmt;

use crate::ast::DeclId;
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    values: BTreeMap<DeclId, Value>,
    unreachable: bool,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state of a point no execution reaches.
    pub fn domain_empty() -> Self {
        State {
            values: BTreeMap::new(),
            unreachable: true,
        }
    }

    pub fn is_domain_empty(&self) -> bool {
        self.unreachable
    }

    pub fn set_domain_empty(&mut self) {
        self.unreachable = true;
    }

    /// Value of a declaration: `Any` if untracked, `Empty` if unreachable.
    pub fn get(&self, decl: DeclId) -> Value {
        if self.unreachable {
            return Value::Empty;
        }
        self.values.get(&decl).cloned().unwrap_or(Value::Any)
    }

    /// Tracked value, if any.
    pub fn lookup(&self, decl: DeclId) -> Option<&Value> {
        self.values.get(&decl)
    }

    /// Records a value. Storing `Empty` does not by itself make the state
    /// unreachable; callers decide that.
    pub fn set(&mut self, decl: DeclId, value: Value) {
        self.values.insert(decl, value);
    }

    pub fn remove(&mut self, decl: DeclId) -> Option<Value> {
        self.values.remove(&decl)
    }

    pub fn contains(&self, decl: DeclId) -> bool {
        self.values.contains_key(&decl)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Value)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Join with another state (control-flow merge).
    ///
    /// A domain-empty side contributes nothing. Keys present on one side only
    /// keep their value.
    pub fn merge_with(&mut self, other: &State) {
        if other.unreachable {
            return;
        }
        if self.unreachable {
            *self = other.clone();
            return;
        }
        for (decl, value) in &other.values {
            let merged = match self.values.get(decl) {
                Some(mine) => mine.merge(value),
                None => value.clone(),
            };
            self.values.insert(*decl, merged);
        }
    }

    /// Meet with another state describing the same program point.
    ///
    /// If some variable has no value left, the state becomes domain-empty.
    pub fn intersect_with(&mut self, other: &State) {
        if other.unreachable {
            return;
        }
        if self.unreachable {
            *self = other.clone();
            return;
        }
        for (decl, value) in &other.values {
            let met = match self.values.get(decl) {
                Some(mine) => {
                    let met = mine.intersect(value);
                    if met.is_empty() && !mine.is_empty() && !value.is_empty() {
                        self.unreachable = true;
                    }
                    met
                }
                None => value.clone(),
            };
            self.values.insert(*decl, met);
        }
    }

    /// Widening of `self` (the previous loop head) by `next`.
    pub fn widen_with(&mut self, next: &State) {
        if next.unreachable {
            return;
        }
        if self.unreachable {
            *self = next.clone();
            return;
        }
        for (decl, value) in &next.values {
            let widened = match self.values.get(decl) {
                Some(mine) => mine.widen(value),
                None => value.clone(),
            };
            self.values.insert(*decl, widened);
        }
    }

    /// Sets to `Any` every variable whose value differs from `previous`.
    ///
    /// Returns the number of variables given up.
    pub fn havoc_changed(&mut self, previous: &State) -> usize {
        if self.unreachable {
            return 0;
        }
        let mut count = 0;
        for (decl, value) in self.values.iter_mut() {
            let unchanged = !previous.unreachable && previous.values.get(decl) == Some(value);
            if !unchanged && !value.is_any() {
                *value = Value::Any;
                count += 1;
            }
        }
        count
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unreachable {
            return write!(f, "unreachable");
        }
        write!(f, "{{")?;
        for (i, (decl, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", decl, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn d(i: u32) -> DeclId {
        DeclId::new(i)
    }

    #[test]
    fn test_get_defaults() {
        let mut s = State::new();
        assert_eq!(s.get(d(0)), Value::Any);
        s.set(d(0), Value::int(3));
        assert_eq!(s.get(d(0)), Value::int(3));
        s.set_domain_empty();
        assert_eq!(s.get(d(0)), Value::Empty);
    }

    #[test]
    fn test_set_empty_keeps_reachable() {
        let mut s = State::new();
        s.set(d(0), Value::Empty);
        assert!(!s.is_domain_empty());
    }

    #[test]
    fn test_merge_with() {
        let mut a = State::new();
        a.set(d(0), Value::int(2));
        a.set(d(1), Value::int(7));
        let mut b = State::new();
        b.set(d(0), Value::int(10));
        b.set(d(2), Value::bool_const(true));

        a.merge_with(&b);
        assert_eq!(a.get(d(0)), Value::int_range(2, 10));
        assert_eq!(a.get(d(1)), Value::int(7));
        assert_eq!(a.get(d(2)), Value::bool_const(true));
    }

    #[test]
    fn test_merge_domain_empty_is_identity() {
        let mut a = State::new();
        a.set(d(0), Value::int(2));
        let before = a.clone();
        a.merge_with(&State::domain_empty());
        assert_eq!(a, before);

        let mut e = State::domain_empty();
        e.merge_with(&before);
        assert_eq!(e, before);
    }

    #[test]
    fn test_intersect_with() {
        let mut a = State::new();
        a.set(d(0), Value::int_range(0, 10));
        let mut b = State::new();
        b.set(d(0), Value::int_range(5, 20));
        a.intersect_with(&b);
        assert_eq!(a.get(d(0)), Value::int_range(5, 10));
        assert!(!a.is_domain_empty());

        let mut c = State::new();
        c.set(d(0), Value::int(50));
        a.intersect_with(&c);
        assert!(a.is_domain_empty());
    }

    #[test]
    fn test_widen_with() {
        let mut head = State::new();
        head.set(d(0), Value::int_range(0, 1));
        let mut next = State::new();
        next.set(d(0), Value::int_range(0, 2));
        head.widen_with(&next);
        assert_eq!(head.get(d(0)), Value::int_range(0, i64::MAX));
    }

    #[test]
    fn test_havoc_changed() {
        let mut prev = State::new();
        prev.set(d(0), Value::int(1));
        prev.set(d(1), Value::int(1));
        let mut next = prev.clone();
        next.set(d(1), Value::int_range(1, 2));
        next.set(d(2), Value::bool_const(true));

        assert_eq!(next.havoc_changed(&prev), 2);
        assert_eq!(next.get(d(0)), Value::int(1));
        assert_eq!(next.get(d(1)), Value::Any);
        assert_eq!(next.get(d(2)), Value::Any);
    }
}
