//! Kernels for mixed H(curl)-(H1)^d operators.
//!
//! The H(curl) test space is mapped with the covariant Piola transform `adj(J)^T / det(J)`,
//! while the vector-valued H1 trial space is not transformed. At each quadrature point the
//! kernels therefore compute
//!
//! ```text
//! v = wdetJ * C (adj(J)^T u)
//! ```
//!
//! with `C` the material coefficient of the point.
use crate::allocators::BiDimAllocator;
use crate::coefficient::CoefficientTable;
use crate::error::QFunctionError;
use crate::geometry::ApplyGeometry;
use crate::qfunction::check_buffer_counts;
use crate::strided::{check_buffer_len, StridedView, StridedViewMut};
use crate::util::mult_coefficient_geometry;
use crate::{Real, SmallDim};
use itertools::izip;
use nalgebra::{DefaultAllocator, U1, U2, U3};

/// Applies the mixed H(curl)-(H1)^d operator on a batch of `num_points` points.
///
/// `S` is the space dimension and `D` the reference dimension of the element. The geometry
/// buffer has `2 + S * D` components, `u` has `D` components and `v` has `S` components. The
/// coefficient table must have dimension `S`.
///
/// All inputs are validated before the first point is processed. If an error is returned,
/// `v` is unchanged.
pub fn apply_hcurl_h1d<T, S, D>(
    table: &CoefficientTable<T>,
    num_points: usize,
    geometry: &[T],
    u: &[T],
    v: &mut [T],
) -> Result<(), QFunctionError>
where
    T: Real,
    S: SmallDim,
    D: SmallDim,
    DefaultAllocator: BiDimAllocator<T, S, D>,
{
    table.check_dim(S::dim())?;
    let geometry = ApplyGeometry::from_buffer(geometry, num_points, D::dim(), S::dim())?;
    check_buffer_len("u", u, D::dim(), num_points)?;
    check_buffer_len("v", v, S::dim(), num_points)?;
    let resolved = table.resolve_attributes(geometry.attributes())?;

    let u = StridedView::new(u, num_points, D::dim());
    let mut v = StridedViewMut::new(v, num_points, S::dim());

    let points = izip!(resolved.coefficients(), geometry.weighted_det()).enumerate();
    for (i, (coefficient, &wdet)) in points {
        let adj_jt = geometry.adj_jacobian_transpose::<S, D>(i);
        let u_loc = u.point_vector::<D>(i);
        let v_loc = mult_coefficient_geometry(&adj_jt, coefficient, &u_loc);
        v.set_point_vector(i, &(v_loc * wdet));
    }

    Ok(())
}

fn apply_hcurl_h1d_kernel<T, S, D>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError>
where
    T: Real,
    S: SmallDim,
    D: SmallDim,
    DefaultAllocator: BiDimAllocator<T, S, D>,
{
    check_buffer_counts(inputs, outputs)?;
    apply_hcurl_h1d::<T, S, D>(table, num_points, inputs[0], inputs[1], &mut *outputs[0])
}

/// Mixed H(curl)-(H1)^2 operator on a two-dimensional element.
pub fn apply_hcurl_h1d_22<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    apply_hcurl_h1d_kernel::<T, U2, U2>(table, num_points, inputs, outputs)
}

/// Mixed H(curl)-(H1)^3 operator on a three-dimensional element.
pub fn apply_hcurl_h1d_33<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    apply_hcurl_h1d_kernel::<T, U3, U3>(table, num_points, inputs, outputs)
}

/// Mixed operator on a one-dimensional element embedded in two dimensions.
pub fn apply_hcurl_h1d_21<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    apply_hcurl_h1d_kernel::<T, U2, U1>(table, num_points, inputs, outputs)
}

/// Mixed operator on a two-dimensional element embedded in three dimensions.
pub fn apply_hcurl_h1d_32<T: Real>(
    table: &CoefficientTable<T>,
    num_points: usize,
    inputs: &[&[T]],
    outputs: &mut [&mut [T]],
) -> Result<(), QFunctionError> {
    apply_hcurl_h1d_kernel::<T, U3, U2>(table, num_points, inputs, outputs)
}
