//! Kernels that build quadrature data for L2 mass operators.
//!
//! Instead of applying the operator, the build kernels store the symmetric coefficient of each
//! quadrature point scaled by `qw^2 / wdetJ`, where `qw` is the quadrature weight. The result
//! can be kept by the caller and reused for repeated applications of the mass operator.
use crate::coefficient::{packed_len, CoefficientTable};
use crate::error::QFunctionError;
use crate::geometry::BuildGeometry;
use crate::qfunction::check_buffer_counts;
use crate::strided::{check_buffer_len, StridedViewMut};
use crate::Real;
use itertools::izip;

/// Builds packed quadrature data of dimension `dim` for a batch of `num_points` points.
///
/// The geometry buffer holds attributes and weighted Jacobian determinants, `qw` holds one
/// quadrature weight per point and `qd` receives `dim (dim + 1) / 2` components per point.
///
/// All inputs are validated before the first point is processed. If an error is returned,
/// `qd` is unchanged.
pub fn build_l2<T: Real>(
    table: &CoefficientTable<T>,
    dim: usize,
    num_points: usize,
    geometry: &[T],
    qw: &[T],
    qd: &mut [T],
) -> Result<(), QFunctionError> {
    table.check_dim(dim)?;
    let geometry = BuildGeometry::from_buffer(geometry, num_points)?;
    let num_components = packed_len(dim);
    check_buffer_len("qw", qw, 1, num_points)?;
    check_buffer_len("qd", qd, num_components, num_points)?;
    let resolved = table.resolve_attributes(geometry.attributes())?;
    geometry.check_nonsingular()?;

    let mut qd = StridedViewMut::new(qd, num_points, num_components);

    let points = izip!(resolved.coefficients(), geometry.weighted_det(), qw).enumerate();
    for (i, (coefficient, &wdet, &weight)) in points {
        let w = weight * weight / wdet;
        for (k, &c) in coefficient.iter().enumerate() {
            qd[(k, i)] = w * c;
        }
    }

    Ok(())
}

fn build_l2_kernel<T: Real>(
    table: &CoefficientTable<T>,
    dim: usize,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    check_buffer_counts(inputs, outputs)?;
    build_l2(table, dim, num_points, inputs[0], inputs[1], &mut *outputs[0])
}

/// Builds scalar quadrature data.
pub fn build_l2_1<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    build_l2_kernel(table, 1, num_points, inputs, outputs)
}

/// Builds packed 2x2 symmetric quadrature data.
pub fn build_l2_2<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    build_l2_kernel(table, 2, num_points, inputs, outputs)
}

/// Builds packed 3x3 symmetric quadrature data.
pub fn build_l2_3<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    build_l2_kernel(table, 3, num_points, inputs, outputs)
}
