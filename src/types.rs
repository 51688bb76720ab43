//! Declared types and contract annotations.
//!
//! These are the two facts the front-end resolves for every declaration:
//! which category its type falls into, and which value contracts are attached
//! to it. Only a closed set of reference types is refined; everything else is
//! an opaque [`TypeRef::Object`].

use std::fmt;

use crate::interval::Interval;

/// Primitive type kinds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    /// Representable range of an integral kind.
    pub fn range(self) -> Option<Interval> {
        let (min, max) = match self {
            PrimitiveKind::Byte => (i8::MIN as i64, i8::MAX as i64),
            PrimitiveKind::Short => (i16::MIN as i64, i16::MAX as i64),
            PrimitiveKind::Char => (0, u16::MAX as i64),
            PrimitiveKind::Int => (i32::MIN as i64, i32::MAX as i64),
            PrimitiveKind::Long => (i64::MIN, i64::MAX),
            PrimitiveKind::Boolean | PrimitiveKind::Float | PrimitiveKind::Double => return None,
        };
        Some(Interval { min, max })
    }

    pub fn is_integral(self) -> bool {
        self.range().is_some()
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        };
        write!(f, "{}", s)
    }
}

/// Category of a declared type.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    String,
    Array(Box<TypeRef>),
    /// Wrapper class of a primitive (`Integer`, `Character`, ...).
    Boxed(PrimitiveKind),
    /// Any other reference type, by name.
    Object(String),
    Void,
}

impl TypeRef {
    pub fn int() -> Self {
        TypeRef::Primitive(PrimitiveKind::Int)
    }

    pub fn boolean() -> Self {
        TypeRef::Primitive(PrimitiveKind::Boolean)
    }

    pub fn array_of(elem: TypeRef) -> Self {
        TypeRef::Array(Box::new(elem))
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeRef::Object(name.into())
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeRef::Primitive(_) | TypeRef::Void)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(kind) => write!(f, "{}", kind),
            TypeRef::String => write!(f, "String"),
            TypeRef::Array(elem) => write!(f, "{}[]", elem),
            TypeRef::Boxed(kind) => match kind {
                PrimitiveKind::Int => write!(f, "Integer"),
                PrimitiveKind::Char => write!(f, "Character"),
                other => {
                    let name = other.to_string();
                    let mut chars = name.chars();
                    match chars.next() {
                        Some(c) => write!(f, "{}{}", c.to_ascii_uppercase(), chars.as_str()),
                        None => Ok(()),
                    }
                }
            },
            TypeRef::Object(name) => write!(f, "{}", name),
            TypeRef::Void => write!(f, "void"),
        }
    }
}

/// Value contract attached to a parameter, field or return value.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Annotation {
    NotNull,
    Nullable,
    /// Value `>= n`.
    Min(i64),
    /// Value `<= n`.
    Max(i64),
    Positive,
    PositiveOrZero,
    Negative,
    NegativeOrZero,
    /// Length of a string or array within `[min, max]`.
    Size { min: i64, max: i64 },
    /// Not null and length `>= 1`.
    NotEmpty,
}

impl Annotation {
    /// Allowed numeric range for numeric contracts.
    pub fn numeric_bounds(&self) -> Option<Interval> {
        match self {
            Annotation::Min(n) => Some(Interval::at_least(*n)),
            Annotation::Max(n) => Some(Interval::at_most(*n)),
            Annotation::Positive => Some(Interval::at_least(1)),
            Annotation::PositiveOrZero => Some(Interval::at_least(0)),
            Annotation::Negative => Some(Interval::at_most(-1)),
            Annotation::NegativeOrZero => Some(Interval::at_most(0)),
            _ => None,
        }
    }

    /// Allowed length range for size contracts.
    pub fn length_bounds(&self) -> Option<Interval> {
        match self {
            Annotation::Size { min, max } => Some(Interval {
                min: *min,
                max: (*max).max(*min),
            }),
            Annotation::NotEmpty => Some(Interval::at_least(1)),
            _ => None,
        }
    }

    pub fn forbids_null(&self) -> bool {
        matches!(self, Annotation::NotNull | Annotation::NotEmpty)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::NotNull => write!(f, "@NotNull"),
            Annotation::Nullable => write!(f, "@Nullable"),
            Annotation::Min(n) => write!(f, "@Min({})", n),
            Annotation::Max(n) => write!(f, "@Max({})", n),
            Annotation::Positive => write!(f, "@Positive"),
            Annotation::PositiveOrZero => write!(f, "@PositiveOrZero"),
            Annotation::Negative => write!(f, "@Negative"),
            Annotation::NegativeOrZero => write!(f, "@NegativeOrZero"),
            Annotation::Size { min, max } => write!(f, "@Size(min = {}, max = {})", min, max),
            Annotation::NotEmpty => write!(f, "@NotEmpty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_integral_ranges() {
        assert_eq!(PrimitiveKind::Int.range(), Some(Interval { min: i32::MIN as i64, max: i32::MAX as i64 }));
        assert_eq!(PrimitiveKind::Char.range(), Some(Interval { min: 0, max: 65535 }));
        assert_eq!(PrimitiveKind::Double.range(), None);
        assert!(!PrimitiveKind::Boolean.is_integral());
    }

    #[test]
    fn test_annotation_bounds() {
        assert_eq!(Annotation::Positive.numeric_bounds(), Some(Interval::at_least(1)));
        assert_eq!(Annotation::Max(9).numeric_bounds(), Some(Interval::at_most(9)));
        assert_eq!(Annotation::NotNull.numeric_bounds(), None);
        assert_eq!(
            Annotation::Size { min: 1, max: 3 }.length_bounds(),
            Some(Interval { min: 1, max: 3 })
        );
        assert!(Annotation::NotEmpty.forbids_null());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeRef::array_of(TypeRef::int()).to_string(), "int[]");
        assert_eq!(TypeRef::Boxed(PrimitiveKind::Int).to_string(), "Integer");
        assert_eq!(TypeRef::Boxed(PrimitiveKind::Long).to_string(), "Long");
        assert_eq!(Annotation::Size { min: 0, max: 4 }.to_string(), "@Size(min = 0, max = 4)");
    }
}
