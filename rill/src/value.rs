// value.rs — Concrete runtime values
//
// `Value` is the constant payload of literal nodes and the result type of the
// reference interpreter. Scalars are bit vectors up to 64 bits wide; wider
// scalars are not needed by any current consumer.

use std::fmt;

use crate::ty::Type;

/// A concrete structured value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Bits { width: u32, bits: u64 },
    Tuple(Vec<Value>),
    Array(Vec<Value>),
}

impl Value {
    /// A bit-vector scalar. Bits beyond `width` are masked off.
    pub fn bits(width: u32, bits: u64) -> Value {
        assert!(width <= 64, "scalar width {width} exceeds 64 bits");
        Value::Bits {
            width,
            bits: mask(width, bits),
        }
    }

    pub fn tuple(fields: Vec<Value>) -> Value {
        Value::Tuple(fields)
    }

    /// An array value. All elements must share a type; checked by `ty()`
    /// callers rather than here, since empty arrays carry no witness.
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(elements)
    }

    /// The scalar payload, or `None` for aggregates.
    pub fn as_bits(&self) -> Option<u64> {
        match self {
            Value::Bits { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    /// The type of this value. Empty arrays are given a zero-width element
    /// type; literal builders requiring a precise type pass it explicitly.
    pub fn ty(&self) -> Type {
        match self {
            Value::Bits { width, .. } => Type::bits(*width),
            Value::Tuple(fields) => Type::tuple(fields.iter().map(Value::ty).collect()),
            Value::Array(elements) => {
                let element = elements.first().map_or(Type::bits(0), Value::ty);
                Type::array(element, elements.len())
            }
        }
    }

    /// The scalar leaf addressed by a structural path.
    /// Panics if the path does not address a leaf of this value's shape.
    pub fn leaf(&self, path: &[usize]) -> u64 {
        match (self, path) {
            (Value::Bits { bits, .. }, []) => *bits,
            (Value::Tuple(fields), [i, rest @ ..]) => fields[*i].leaf(rest),
            (Value::Array(elements), [i, rest @ ..]) => elements[*i].leaf(rest),
            _ => panic!("path does not address a scalar leaf of {self}"),
        }
    }
}

/// Mask `bits` down to `width` bits.
pub fn mask(width: u32, bits: u64) -> u64 {
    if width >= 64 {
        bits
    } else {
        bits & ((1u64 << width) - 1)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bits { width, bits } => write!(f, "bits[{width}]:{bits}"),
            Value::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, ")")
            }
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
        }
    }
}
