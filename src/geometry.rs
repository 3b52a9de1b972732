//! Geometric quadrature data supplied alongside the active fields.
//!
//! The geometry buffer of an apply kernel holds, for `Q` points and component-major,
//!
//! ```text
//! [ attribute (Q) | wdetJ (Q) | adj(J)^T (space_dim * dim * Q) ]
//! ```
//!
//! where `wdetJ` is the Jacobian determinant multiplied by the quadrature weight and
//! `adj(J)^T` is the `space_dim x dim` adjugate Jacobian transpose, stored column-major.
//! Build kernels only receive the first two fields.
use crate::allocators::BiDimAllocator;
use crate::error::QFunctionError;
use crate::strided::{check_buffer_len, StridedView};
use crate::Real;
use nalgebra::{DefaultAllocator, DimName, OMatrix};

/// Number of geometry components for an apply kernel with the given dimensions.
pub fn apply_geometry_components(dim: usize, space_dim: usize) -> usize {
    2 + dim * space_dim
}

/// Number of geometry components for a build kernel.
pub const BUILD_GEOMETRY_COMPONENTS: usize = 2;

/// Geometry data for the apply kernels.
#[derive(Debug, Copy, Clone)]
pub struct ApplyGeometry<'a, T> {
    attributes: &'a [T],
    weighted_det: &'a [T],
    adj_jacobian_t: StridedView<'a, T>,
}

impl<'a, T: Real> ApplyGeometry<'a, T> {
    /// Interprets `buffer` as geometry data for `num_points` points of an element with
    /// reference dimension `dim` embedded in a space of dimension `space_dim`.
    pub fn from_buffer(
        buffer: &'a [T],
        num_points: usize,
        dim: usize,
        space_dim: usize,
    ) -> Result<Self, QFunctionError> {
        let num_components = apply_geometry_components(dim, space_dim);
        check_buffer_len("geometry", buffer, num_components, num_points)?;
        let (head, adj_jacobian_t) = StridedView::new(buffer, num_points, num_components).split_components(2);
        Ok(Self {
            attributes: head.component(0),
            weighted_det: head.component(1),
            adj_jacobian_t,
        })
    }

    pub fn num_points(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &'a [T] {
        self.attributes
    }

    pub fn weighted_det(&self) -> &'a [T] {
        self.weighted_det
    }

    /// Returns the adjugate Jacobian transpose at point `i` as a `S x D` matrix.
    pub fn adj_jacobian_transpose<S, D>(&self, i: usize) -> OMatrix<T, S, D>
    where
        S: DimName,
        D: DimName,
        DefaultAllocator: BiDimAllocator<T, S, D>,
    {
        self.adj_jacobian_t.point_matrix::<S, D>(i)
    }
}

/// Geometry data for the build kernels.
#[derive(Debug, Copy, Clone)]
pub struct BuildGeometry<'a, T> {
    attributes: &'a [T],
    weighted_det: &'a [T],
}

impl<'a, T: Real> BuildGeometry<'a, T> {
    pub fn from_buffer(buffer: &'a [T], num_points: usize) -> Result<Self, QFunctionError> {
        check_buffer_len("geometry", buffer, BUILD_GEOMETRY_COMPONENTS, num_points)?;
        let view = StridedView::new(buffer, num_points, BUILD_GEOMETRY_COMPONENTS);
        Ok(Self {
            attributes: view.component(0),
            weighted_det: view.component(1),
        })
    }

    pub fn num_points(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &'a [T] {
        self.attributes
    }

    pub fn weighted_det(&self) -> &'a [T] {
        self.weighted_det
    }

    /// Checks that no point has a vanishing weighted Jacobian determinant.
    pub fn check_nonsingular(&self) -> Result<(), QFunctionError> {
        match self.weighted_det.iter().position(|&w| w == T::zero()) {
            None => Ok(()),
            Some(point) => Err(QFunctionError::SingularJacobian { point }),
        }
    }
}
