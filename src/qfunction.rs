//! Quadrature point kernels and their registry.
//!
//! A kernel (a *QFunction*) is evaluated on a batch of `Q` quadrature points with the
//! calling convention
//!
//! ```text
//! kernel(context, Q, inputs, outputs)
//! ```
//!
//! where the context is a [`CoefficientTable`], `inputs` is a list of two read-only buffers and
//! `outputs` is a list of one write-only buffer. All buffers are component-major with stride
//! `Q`. The buffers are owned by the caller and are not retained.
//!
//! Each point of a batch is processed independently of all other points: point `i` only reads
//! the values of point `i` in the inputs and only writes the values of point `i` in the output.
//! Callers may therefore split a batch or evaluate it in parallel.
//!
//! The set of kernels is closed. [`QFunction`] resolves the kernel once from the operator kind
//! and the element dimensions, so no dispatch happens per point.
use crate::coefficient::{packed_len, CoefficientTable};
use crate::error::QFunctionError;
use crate::geometry::{apply_geometry_components, BUILD_GEOMETRY_COMPONENTS};
use crate::Real;
use eyre::WrapErr;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

mod hcurl_h1d;
mod l2_build;

pub use hcurl_h1d::*;
pub use l2_build::*;

/// The signature shared by all kernels.
pub type KernelFn<T> = fn(&CoefficientTable<T>, usize, &[&[T]], &mut [&mut [T]]) -> Result<(), QFunctionError>;

/// The kind of operator a kernel belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QFunctionKind {
    /// Application of the mixed H(curl)-(H1)^d operator.
    HCurlH1dApply,
    /// Construction of quadrature data for an L2 mass operator.
    L2Build,
}

/// A concrete, fixed-size kernel.
///
/// The digits in the names of the apply variants are `space_dim` followed by `dim`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QFunctionVariant {
    Apply22,
    Apply33,
    Apply21,
    Apply32,
    Build1,
    Build2,
    Build3,
}

impl QFunctionVariant {
    pub const ALL: [QFunctionVariant; 7] = [
        Self::Apply22,
        Self::Apply33,
        Self::Apply21,
        Self::Apply32,
        Self::Build1,
        Self::Build2,
        Self::Build3,
    ];

    /// Finds the kernel for the given operator kind and dimensions.
    ///
    /// `dim` is the reference dimension of the element and `space_dim` the dimension of the
    /// space it is embedded in. The L2 build kernels require `dim == space_dim`.
    pub fn resolve(kind: QFunctionKind, dim: usize, space_dim: usize) -> Result<Self, QFunctionError> {
        use QFunctionKind::*;
        use QFunctionVariant::*;
        match (kind, space_dim, dim) {
            (HCurlH1dApply, 2, 2) => Ok(Apply22),
            (HCurlH1dApply, 3, 3) => Ok(Apply33),
            (HCurlH1dApply, 2, 1) => Ok(Apply21),
            (HCurlH1dApply, 3, 2) => Ok(Apply32),
            (L2Build, 1, 1) => Ok(Build1),
            (L2Build, 2, 2) => Ok(Build2),
            (L2Build, 3, 3) => Ok(Build3),
            _ => Err(QFunctionError::UnsupportedVariant { dim, space_dim }),
        }
    }

    pub fn kind(&self) -> QFunctionKind {
        use QFunctionVariant::*;
        match self {
            Apply22 | Apply33 | Apply21 | Apply32 => QFunctionKind::HCurlH1dApply,
            Build1 | Build2 | Build3 => QFunctionKind::L2Build,
        }
    }

    /// Reference dimension of the element.
    pub fn dim(&self) -> usize {
        use QFunctionVariant::*;
        match self {
            Apply21 | Build1 => 1,
            Apply22 | Apply32 | Build2 => 2,
            Apply33 | Build3 => 3,
        }
    }

    /// Dimension of the space the element is embedded in.
    pub fn space_dim(&self) -> usize {
        use QFunctionVariant::*;
        match self {
            Build1 => 1,
            Apply22 | Apply21 | Build2 => 2,
            Apply33 | Apply32 | Build3 => 3,
        }
    }

    /// Dimension of the coefficient tensors the kernel expects.
    pub fn coefficient_dim(&self) -> usize {
        self.space_dim()
    }

    pub fn name(&self) -> &'static str {
        use QFunctionVariant::*;
        match self {
            Apply22 => "f_apply_hcurlh1d_22",
            Apply33 => "f_apply_hcurlh1d_33",
            Apply21 => "f_apply_hcurlh1d_21",
            Apply32 => "f_apply_hcurlh1d_32",
            Build1 => "f_build_l2_1",
            Build2 => "f_build_l2_2",
            Build3 => "f_build_l2_3",
        }
    }

    pub fn num_inputs(&self) -> usize {
        2
    }

    pub fn num_outputs(&self) -> usize {
        1
    }

    /// Number of components of each input buffer.
    pub fn input_components(&self) -> [usize; 2] {
        match self.kind() {
            QFunctionKind::HCurlH1dApply => [apply_geometry_components(self.dim(), self.space_dim()), self.dim()],
            QFunctionKind::L2Build => [BUILD_GEOMETRY_COMPONENTS, 1],
        }
    }

    /// Number of components of each output buffer.
    pub fn output_components(&self) -> [usize; 1] {
        match self.kind() {
            QFunctionKind::HCurlH1dApply => [self.space_dim()],
            QFunctionKind::L2Build => [packed_len(self.dim())],
        }
    }

    /// Required lengths of the input buffers for a batch of `num_points` points.
    ///
    /// Lengths that do not fit in `usize` saturate at `usize::MAX`.
    pub fn input_sizes(&self, num_points: usize) -> [usize; 2] {
        self.input_components().map(|n| n.saturating_mul(num_points))
    }

    /// Required lengths of the output buffers for a batch of `num_points` points.
    ///
    /// Lengths that do not fit in `usize` saturate at `usize::MAX`.
    pub fn output_sizes(&self, num_points: usize) -> [usize; 1] {
        self.output_components().map(|n| n.saturating_mul(num_points))
    }

    /// Returns the kernel function of this variant.
    pub fn kernel<T: Real>(&self) -> KernelFn<T> {
        use QFunctionVariant::*;
        match self {
            Apply22 => apply_hcurl_h1d_22::<T>,
            Apply33 => apply_hcurl_h1d_33::<T>,
            Apply21 => apply_hcurl_h1d_21::<T>,
            Apply32 => apply_hcurl_h1d_32::<T>,
            Build1 => build_l2_1::<T>,
            Build2 => build_l2_2::<T>,
            Build3 => build_l2_3::<T>,
        }
    }
}

impl Display for QFunctionVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Checks the number of input and output buffers passed to a kernel.
pub(crate) fn check_buffer_counts<T>(inputs: &[&[T]], outputs: &[&mut [T]]) -> Result<(), QFunctionError> {
    if inputs.len() != 2 {
        return Err(QFunctionError::BufferCount {
            buffers: "input",
            expected: 2,
            actual: inputs.len(),
        });
    }
    if outputs.len() != 1 {
        return Err(QFunctionError::BufferCount {
            buffers: "output",
            expected: 1,
            actual: outputs.len(),
        });
    }
    Ok(())
}

/// A kernel bound to the coefficient table of one operator instance.
#[derive(Clone)]
pub struct QFunction<T> {
    variant: QFunctionVariant,
    table: CoefficientTable<T>,
    kernel: KernelFn<T>,
}

impl<T: fmt::Debug> fmt::Debug for QFunction<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("QFunction")
            .field("variant", &self.variant)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<T: Real> QFunction<T> {
    /// Resolves the kernel for the given operator kind and dimensions.
    ///
    /// Fails if no such kernel exists or if the coefficient table has the wrong tensor dimension.
    pub fn new(
        kind: QFunctionKind,
        dim: usize,
        space_dim: usize,
        table: CoefficientTable<T>,
    ) -> Result<Self, QFunctionError> {
        let variant = QFunctionVariant::resolve(kind, dim, space_dim)?;
        Self::from_variant(variant, table)
    }

    pub fn from_variant(variant: QFunctionVariant, table: CoefficientTable<T>) -> Result<Self, QFunctionError> {
        table.check_dim(variant.coefficient_dim())?;
        debug!(
            "Resolved kernel {} (dim = {}, space_dim = {}) with {} materials",
            variant,
            variant.dim(),
            variant.space_dim(),
            table.num_materials()
        );
        Ok(Self {
            variant,
            table,
            kernel: variant.kernel(),
        })
    }

    pub fn variant(&self) -> QFunctionVariant {
        self.variant
    }

    pub fn table(&self) -> &CoefficientTable<T> {
        &self.table
    }

    /// Evaluates the kernel on a batch of `num_points` quadrature points.
    ///
    /// On failure, the output buffers are left untouched.
    pub fn apply(&self, num_points: usize, inputs: &[&[T]], outputs: &mut [&mut [T]]) -> eyre::Result<()> {
        trace!("Evaluating {} on {} quadrature points", self.variant, num_points);
        (self.kernel)(&self.table, num_points, inputs, outputs)
            .wrap_err_with(|| format!("Failed to evaluate kernel {}", self.variant))
    }
}
