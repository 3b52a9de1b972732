//! Quadrature point kernels for matrix-free finite element operators.
//!
//! Every kernel in this crate operates on a *batch* of `Q` quadrature points. Per-point data
//! is stored component-major: component `c` of point `i` lives at offset `c * Q + i`.
//! Kernels never allocate, never retain references to their buffers and carry no state
//! between calls. The per-point computations are independent of each other, so a batch may
//! be split or vectorized freely.
//!
//! The entry point for most users is [`QFunction`](qfunction::QFunction), which resolves the
//! correct fixed-size kernel once from the operator kind and the element dimensions.
use nalgebra::{DimMin, DimName, RealField};
use num::ToPrimitive;

pub mod allocators;
pub mod coefficient;
pub mod error;
pub mod geometry;
pub mod qfunction;
pub mod strided;
pub mod util;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;

/// Scalar type for quadrature point data.
///
/// Material attributes travel through the same buffers as the floating-point data, so the
/// scalar type must be convertible back to an integer.
pub trait Real: RealField + Copy + ToPrimitive {}

impl<T: RealField + Copy + ToPrimitive> Real for T {}

/// A small, fixed-size dimension.
///
/// Used as a trait alias for the dimension parameters of the kernels.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}
