//! Saturating closed integer intervals.
//!
//! [`Interval`] is the numeric building block shared by integer, character,
//! string-length and array-length values. Endpoints are plain `i64`s: the
//! representable minimum and maximum double as `-∞` and `+∞`, and every
//! endpoint computation saturates instead of wrapping.

use std::cmp::{max, min};
use std::fmt;

/// Closed interval `[min, max]` with `min <= max`.
///
/// An inverted interval is never constructed; operations that could produce
/// one return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub min: i64,
    pub max: i64,
}

impl Interval {
    pub const FULL: Interval = Interval {
        min: i64::MIN,
        max: i64::MAX,
    };

    /// Creates `[min, max]`, or `None` if the bounds are inverted.
    pub fn new(min: i64, max: i64) -> Option<Self> {
        if min <= max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn point(value: i64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// `[value, +∞)`
    pub fn at_least(value: i64) -> Self {
        Self {
            min: value,
            max: i64::MAX,
        }
    }

    /// `(-∞, value]`
    pub fn at_most(value: i64) -> Self {
        Self {
            min: i64::MIN,
            max: value,
        }
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn as_point(&self) -> Option<i64> {
        self.is_point().then_some(self.min)
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn contains_interval(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    pub fn is_disjoint(&self, other: &Interval) -> bool {
        self.max < other.min || other.max < self.min
    }

    /// Smallest interval containing both.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            min: min(self.min, other.min),
            max: max(self.max, other.max),
        }
    }

    /// Intersection, `None` when the intervals are disjoint.
    pub fn meet(&self, other: &Interval) -> Option<Interval> {
        Interval::new(max(self.min, other.min), min(self.max, other.max))
    }

    /// Standard interval widening: a bound that moved is pushed to infinity.
    pub fn widen(&self, next: &Interval) -> Interval {
        let min = if next.min < self.min { i64::MIN } else { self.min };
        let max = if next.max > self.max { i64::MAX } else { self.max };
        Interval { min, max }
    }

    /// Clamps into `bounds`, `None` if nothing is left.
    pub fn clamp_to(&self, bounds: &Interval) -> Option<Interval> {
        self.meet(bounds)
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval {
            min: self.min.saturating_add(other.min),
            max: self.max.saturating_add(other.max),
        }
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        Interval {
            min: self.min.saturating_sub(other.max),
            max: self.max.saturating_sub(other.min),
        }
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        Self::from_corners([
            self.min.saturating_mul(other.min),
            self.min.saturating_mul(other.max),
            self.max.saturating_mul(other.min),
            self.max.saturating_mul(other.max),
        ])
    }

    /// Truncating division. The divisor must not contain zero.
    pub fn div(&self, divisor: &Interval) -> Interval {
        debug_assert!(!divisor.contains(0));
        Self::from_corners([
            self.min.saturating_div(divisor.min),
            self.min.saturating_div(divisor.max),
            self.max.saturating_div(divisor.min),
            self.max.saturating_div(divisor.max),
        ])
    }

    /// Remainder with the sign of the dividend. The divisor must not contain zero.
    pub fn rem(&self, divisor: &Interval) -> Interval {
        debug_assert!(!divisor.contains(0));
        if let (Some(a), Some(b)) = (self.as_point(), divisor.as_point()) {
            // i64::MIN % -1 overflows, the true result is 0.
            return Interval::point(a.checked_rem(b).unwrap_or(0));
        }
        // |a % b| < |b|, so the magnitude is bounded by the largest |b| - 1.
        let bound = max(divisor.min.unsigned_abs(), divisor.max.unsigned_abs()) - 1;
        let bound = i64::try_from(bound).unwrap_or(i64::MAX);
        let lo = if self.min < 0 { max(self.min, -bound) } else { 0 };
        let hi = if self.max > 0 { min(self.max, bound) } else { 0 };
        Interval { min: lo, max: hi }
    }

    pub fn neg(&self) -> Interval {
        Interval {
            min: self.max.saturating_neg(),
            max: self.min.saturating_neg(),
        }
    }

    fn from_corners(corners: [i64; 4]) -> Interval {
        let mut lo = corners[0];
        let mut hi = corners[0];
        for c in &corners[1..] {
            lo = min(lo, *c);
            hi = max(hi, *c);
        }
        Interval { min: lo, max: hi }
    }

    /// Values of `self` strictly greater than some value of `other`.
    pub fn restrict_greater(&self, other: &Interval) -> Option<Interval> {
        self.meet(&Interval::at_least(other.min.saturating_add(1)))
            .filter(|_| other.min < i64::MAX)
    }

    pub fn restrict_greater_or_equal(&self, other: &Interval) -> Option<Interval> {
        self.meet(&Interval::at_least(other.min))
    }

    pub fn restrict_less(&self, other: &Interval) -> Option<Interval> {
        self.meet(&Interval::at_most(other.max.saturating_sub(1)))
            .filter(|_| other.max > i64::MIN)
    }

    pub fn restrict_less_or_equal(&self, other: &Interval) -> Option<Interval> {
        self.meet(&Interval::at_most(other.max))
    }

    /// Only narrows when `other` is a single point at one of our endpoints.
    pub fn restrict_not_equal(&self, other: &Interval) -> Option<Interval> {
        match other.as_point() {
            Some(p) if self.is_point() && self.min == p => None,
            Some(p) if p == self.min => Some(Interval {
                min: self.min + 1,
                max: self.max,
            }),
            Some(p) if p == self.max => Some(Interval {
                min: self.min,
                max: self.max - 1,
            }),
            _ => Some(*self),
        }
    }
}

fn fmt_bound(f: &mut fmt::Formatter<'_>, value: i64) -> fmt::Result {
    match value {
        i64::MIN => write!(f, "-∞"),
        i64::MAX => write!(f, "+∞"),
        n => write!(f, "{}", n),
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        fmt_bound(f, self.min)?;
        write!(f, ", ")?;
        fmt_bound(f, self.max)?;
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn iv(min: i64, max: i64) -> Interval {
        Interval::new(min, max).unwrap()
    }

    #[test]
    fn test_hull_and_meet() {
        let a = iv(1, 10);
        let b = iv(5, 20);
        assert_eq!(a.hull(&b), iv(1, 20));
        assert_eq!(a.meet(&b), Some(iv(5, 10)));
        assert_eq!(a.meet(&iv(11, 12)), None);
    }

    #[test]
    fn test_add_sub_corners() {
        let a = iv(-10, 200);
        let b = iv(-160, -10);
        assert_eq!(a.add(&b), iv(-170, 190));
        assert_eq!(a.sub(&b), iv(0, 360));
    }

    #[test]
    fn test_mul_saturates() {
        let a = iv(i64::MAX / 2, i64::MAX);
        let b = iv(-3, 2);
        let r = a.mul(&b);
        assert_eq!(r.min, i64::MIN);
        assert_eq!(r.max, i64::MAX);
    }

    #[test]
    fn test_div_truncates() {
        assert_eq!(iv(-7, 9).div(&iv(2, 3)), iv(-3, 4));
        assert_eq!(iv(10, 20).div(&iv(-5, -2)), iv(-10, -2));
        assert_eq!(iv(i64::MIN, i64::MIN).div(&iv(-1, -1)), iv(i64::MAX, i64::MAX));
    }

    #[test]
    fn test_rem_sign_follows_dividend() {
        assert_eq!(iv(7, 7).rem(&iv(3, 3)), iv(1, 1));
        assert_eq!(iv(-7, -7).rem(&iv(3, 3)), iv(-1, -1));
        assert_eq!(iv(0, 100).rem(&iv(1, 10)), iv(0, 9));
        assert_eq!(iv(-100, 3).rem(&iv(-4, -2)), iv(-3, 3));
    }

    #[test]
    fn test_restrict() {
        let a = iv(1, 10);
        assert_eq!(a.restrict_greater(&iv(5, 5)), Some(iv(6, 10)));
        assert_eq!(a.restrict_greater(&iv(10, 10)), None);
        assert_eq!(a.restrict_greater_or_equal(&iv(10, 50)), Some(iv(10, 10)));
        assert_eq!(a.restrict_less(&iv(3, 8)), Some(iv(1, 7)));
        assert_eq!(a.restrict_less_or_equal(&iv(0, 0)), None);
        assert_eq!(a.restrict_not_equal(&iv(1, 1)), Some(iv(2, 10)));
        assert_eq!(a.restrict_not_equal(&iv(10, 10)), Some(iv(1, 9)));
        assert_eq!(a.restrict_not_equal(&iv(5, 5)), Some(a));
        assert_eq!(iv(3, 3).restrict_not_equal(&iv(3, 3)), None);
    }

    #[test]
    fn test_widen() {
        let a = iv(0, 10);
        assert_eq!(a.widen(&iv(0, 11)), Interval::at_least(0));
        assert_eq!(a.widen(&iv(-1, 10)), Interval::at_most(10));
        assert_eq!(a.widen(&iv(2, 5)), a);
    }

    #[test]
    fn test_display() {
        assert_eq!(iv(1, 2).to_string(), "[1, 2]");
        assert_eq!(Interval::FULL.to_string(), "[-∞, +∞]");
    }
}
