// ty.rs — Structured value shapes
//
// A `Type` describes the shape of a node's output: a scalar bit vector, a
// tuple of heterogeneous fields, or a fixed-length array. The dataflow
// engine only ever cares about the shape (which scalar leaves exist and in
// what order), never about operational semantics.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

/// The type of a value produced by an IR node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A scalar bit vector of the given width. Width 0 is legal and carries
    /// no data (it has a leaf, but the leaf can hold only one value).
    Bits(u32),
    /// An ordered, possibly empty, heterogeneous tuple.
    Tuple(Vec<Type>),
    /// A fixed-length array of homogeneous elements. Size 0 is legal.
    Array { element: Box<Type>, size: usize },
}

impl Type {
    pub fn bits(width: u32) -> Type {
        Type::Bits(width)
    }

    pub fn tuple(fields: Vec<Type>) -> Type {
        Type::Tuple(fields)
    }

    pub fn array(element: Type, size: usize) -> Type {
        Type::Array {
            element: Box::new(element),
            size,
        }
    }

    pub fn is_bits(&self) -> bool {
        matches!(self, Type::Bits(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Type::Tuple(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Tuple fields in declaration order, or `None` for non-tuples.
    pub fn tuple_fields(&self) -> Option<&[Type]> {
        match self {
            Type::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    /// Element type and size, or `None` for non-arrays.
    pub fn array_parts(&self) -> Option<(&Type, usize)> {
        match self {
            Type::Array { element, size } => Some((element, *size)),
            _ => None,
        }
    }

    /// Number of immediate children: tuple field count or array size.
    /// Scalars have no children.
    pub fn child_count(&self) -> usize {
        match self {
            Type::Bits(_) => 0,
            Type::Tuple(fields) => fields.len(),
            Type::Array { size, .. } => *size,
        }
    }

    /// Type of the `i`-th immediate child. Panics on scalars or an index out
    /// of range — callers are expected to have validated the path.
    pub fn child(&self, i: usize) -> &Type {
        match self {
            Type::Bits(_) => panic!("scalar type {self} has no child {i}"),
            Type::Tuple(fields) => &fields[i],
            Type::Array { element, size } => {
                assert!(i < *size, "array index {i} out of range for {self}");
                element
            }
        }
    }

    /// Number of scalar leaves, counted depth-first.
    pub fn leaf_count(&self) -> usize {
        match self {
            Type::Bits(_) => 1,
            Type::Tuple(fields) => fields.iter().map(Type::leaf_count).sum(),
            Type::Array { element, size } => element.leaf_count() * size,
        }
    }

    /// Total number of data bits across all leaves.
    pub fn flat_bit_count(&self) -> u64 {
        match self {
            Type::Bits(width) => u64::from(*width),
            Type::Tuple(fields) => fields.iter().map(Type::flat_bit_count).sum(),
            Type::Array { element, size } => element.flat_bit_count() * *size as u64,
        }
    }

    /// Walk a structural path and return the subtype it addresses.
    /// Panics if the path is inconsistent with the shape.
    pub fn subtype(&self, path: &[usize]) -> &Type {
        let mut ty = self;
        for &i in path {
            ty = ty.child(i);
        }
        ty
    }

    /// Like `subtype` but returns `None` instead of panicking, for use where
    /// the path comes from analysis results rather than trusted callers.
    pub fn try_subtype(&self, path: &[usize]) -> Option<&Type> {
        let mut ty = self;
        for &i in path {
            if i >= ty.child_count() {
                return None;
            }
            ty = ty.child(i);
        }
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bits(width) => write!(f, "bits[{width}]"),
            Type::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, ")")
            }
            Type::Array { element, size } => write!(f, "{element}[{size}]"),
        }
    }
}
