//! Errors reported at the boundary of the quadrature point kernels.
//!
//! All checks happen before any point of a batch is processed, so a kernel that returns an
//! error has not written to its output buffers.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum QFunctionError {
    /// A tensor or element dimension outside of `1 ..= 3` was requested.
    UnsupportedDimension(usize),
    /// No kernel exists for the requested combination of operator kind and dimensions.
    UnsupportedVariant { dim: usize, space_dim: usize },
    /// A packed coefficient tensor does not have the number of entries implied by its dimension.
    InvalidCoefficient { expected_len: usize, actual_len: usize },
    /// The same attribute was registered twice in a coefficient table.
    DuplicateAttribute(usize),
    /// A coefficient table without any materials.
    EmptyTable,
    /// A table with several materials was given without a map from attributes to materials.
    MissingAttributeMap { num_materials: usize },
    /// An attribute refers to a material that does not exist.
    MaterialOutOfBounds { attribute: usize, material: usize, num_materials: usize },
    /// The coefficient table has the wrong tensor dimension for the kernel.
    DimensionMismatch { expected: usize, actual: usize },
    /// The number of input or output buffers does not match the kernel.
    BufferCount { buffers: &'static str, expected: usize, actual: usize },
    /// A buffer does not have the length implied by the batch size.
    ///
    /// `expected` saturates at `usize::MAX` if the implied length is not representable.
    BufferSize { buffer: &'static str, expected: usize, actual: usize },
    /// A point carries an attribute that is not present in the coefficient table.
    UnknownAttribute { point: usize, attribute: f64 },
    /// A point has a vanishing weighted Jacobian determinant.
    SingularJacobian { point: usize },
}

impl Display for QFunctionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimension(dim) => {
                write!(f, "Unsupported dimension {} (must be 1, 2 or 3)", dim)
            }
            Self::UnsupportedVariant { dim, space_dim } => {
                write!(f, "No kernel available for dim = {}, space_dim = {}", dim, space_dim)
            }
            Self::InvalidCoefficient {
                expected_len,
                actual_len,
            } => write!(
                f,
                "Packed coefficient has {} entries, expected {}",
                actual_len, expected_len
            ),
            Self::DuplicateAttribute(attribute) => {
                write!(f, "Attribute {} appears more than once in coefficient table", attribute)
            }
            Self::EmptyTable => write!(f, "Coefficient table must contain at least one material"),
            Self::MissingAttributeMap { num_materials } => write!(
                f,
                "Coefficient table with {} materials requires an attribute map",
                num_materials
            ),
            Self::MaterialOutOfBounds {
                attribute,
                material,
                num_materials,
            } => write!(
                f,
                "Attribute {} maps to material {}, but there are only {} materials",
                attribute, material, num_materials
            ),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "Coefficient table has dimension {}, kernel requires dimension {}",
                actual, expected
            ),
            Self::BufferCount {
                buffers,
                expected,
                actual,
            } => write!(f, "Expected {} {} buffers, got {}", expected, buffers, actual),
            Self::BufferSize {
                buffer,
                expected,
                actual,
            } => write!(f, "Buffer {} has length {}, expected {}", buffer, actual, expected),
            Self::UnknownAttribute { point, attribute } => write!(
                f,
                "Attribute {} at quadrature point {} is not present in coefficient table",
                attribute, point
            ),
            Self::SingularJacobian { point } => {
                write!(f, "Singular element Jacobian encountered at quadrature point {}", point)
            }
        }
    }
}

impl Error for QFunctionError {}
