//! Component-major views over quadrature point buffers.
//!
//! A buffer holding `n` components for each of `Q` points stores component `c` of point `i`
//! at offset `c * Q + i`. The views in this module encode this convention once so that the
//! kernels never perform raw offset arithmetic.
use crate::allocators::{BiDimAllocator, DimAllocator};
use crate::coefficient::packed_index;
use crate::error::QFunctionError;
use nalgebra::{DefaultAllocator, DimName, OMatrix, OVector, Scalar};
use std::ops::{Index, IndexMut};

/// Checks that `buffer` holds exactly `num_components` components for each of `num_points` points.
pub(crate) fn check_buffer_len<T>(
    name: &'static str,
    buffer: &[T],
    num_components: usize,
    num_points: usize,
) -> Result<(), QFunctionError> {
    match num_components.checked_mul(num_points) {
        Some(expected) if expected == buffer.len() => Ok(()),
        _ => Err(QFunctionError::BufferSize {
            buffer: name,
            expected: num_components.saturating_mul(num_points),
            actual: buffer.len(),
        }),
    }
}

/// An immutable component-major view of per-point data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StridedView<'a, T> {
    data: &'a [T],
    num_points: usize,
    num_components: usize,
}

impl<'a, T> StridedView<'a, T> {
    /// Creates a view of `num_components` components for each of `num_points` points.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != num_components * num_points`.
    pub fn new(data: &'a [T], num_points: usize, num_components: usize) -> Self {
        assert_eq!(
            Some(data.len()),
            num_components.checked_mul(num_points),
            "Buffer length must equal number of components times number of points."
        );
        Self {
            data,
            num_points,
            num_components,
        }
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Returns the values of component `c` for all points.
    pub fn component(&self, c: usize) -> &'a [T] {
        assert!(c < self.num_components, "Component index out of bounds");
        &self.data[c * self.num_points..(c + 1) * self.num_points]
    }

    /// Splits the view into the first `n` components and the remaining components.
    pub fn split_components(self, n: usize) -> (StridedView<'a, T>, StridedView<'a, T>) {
        assert!(n <= self.num_components, "Cannot split off more components than available");
        let (head, tail) = self.data.split_at(n * self.num_points);
        (
            StridedView::new(head, self.num_points, n),
            StridedView::new(tail, self.num_points, self.num_components - n),
        )
    }
}

impl<'a, T: Scalar + Copy> StridedView<'a, T> {
    /// Gathers the components of point `i` into a vector.
    ///
    /// The view must have exactly `D` components. This is only checked in debug builds.
    pub fn point_vector<D>(&self, i: usize) -> OVector<T, D>
    where
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        debug_assert_eq!(self.num_components, D::dim(), "Vector dimension mismatch");
        OVector::<T, D>::from_fn(|c, _| self[(c, i)])
    }

    /// Gathers the components of point `i` into an `R x C` matrix.
    ///
    /// The components are interpreted in column-major order, i.e. entry `(r, c)` is
    /// component `c * R + r`.
    ///
    /// The view must have exactly `R * C` components. This is only checked in debug builds.
    pub fn point_matrix<R, C>(&self, i: usize) -> OMatrix<T, R, C>
    where
        R: DimName,
        C: DimName,
        DefaultAllocator: BiDimAllocator<T, R, C>,
    {
        debug_assert_eq!(self.num_components, R::dim() * C::dim(), "Matrix dimension mismatch");
        OMatrix::<T, R, C>::from_fn(|r, c| self[(c * R::dim() + r, i)])
    }

    /// Reads the packed symmetric tensor of point `i` and expands it to a dense matrix.
    ///
    /// The view must have exactly `D (D + 1) / 2` components. This is only checked in debug builds.
    pub fn packed_symmetric_at<D>(&self, i: usize) -> OMatrix<T, D, D>
    where
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let d = D::dim();
        debug_assert_eq!(self.num_components, d * (d + 1) / 2, "Packed tensor dimension mismatch");
        OMatrix::<T, D, D>::from_fn(|r, c| self[(packed_index(r, c, d), i)])
    }
}

impl<'a, T> Index<(usize, usize)> for StridedView<'a, T> {
    type Output = T;

    /// Returns component `c` of point `i`.
    fn index(&self, (c, i): (usize, usize)) -> &T {
        debug_assert!(c < self.num_components && i < self.num_points);
        &self.data[c * self.num_points + i]
    }
}

/// A mutable component-major view of per-point data.
#[derive(Debug)]
pub struct StridedViewMut<'a, T> {
    data: &'a mut [T],
    num_points: usize,
    num_components: usize,
}

impl<'a, T> StridedViewMut<'a, T> {
    /// Creates a mutable view of `num_components` components for each of `num_points` points.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != num_components * num_points`.
    pub fn new(data: &'a mut [T], num_points: usize, num_components: usize) -> Self {
        assert_eq!(
            Some(data.len()),
            num_components.checked_mul(num_points),
            "Buffer length must equal number of components times number of points."
        );
        Self {
            data,
            num_points,
            num_components,
        }
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn as_view(&self) -> StridedView<'_, T> {
        StridedView::new(&*self.data, self.num_points, self.num_components)
    }
}

impl<'a, T: Scalar + Copy> StridedViewMut<'a, T> {
    /// Scatters `values` into the components of point `i`.
    pub fn set_point_vector<D>(&mut self, i: usize, values: &OVector<T, D>)
    where
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        debug_assert_eq!(self.num_components, D::dim(), "Vector dimension mismatch");
        for (c, value) in values.iter().enumerate() {
            self[(c, i)] = *value;
        }
    }
}

impl<'a, T> Index<(usize, usize)> for StridedViewMut<'a, T> {
    type Output = T;

    fn index(&self, (c, i): (usize, usize)) -> &T {
        debug_assert!(c < self.num_components && i < self.num_points);
        &self.data[c * self.num_points + i]
    }
}

impl<'a, T> IndexMut<(usize, usize)> for StridedViewMut<'a, T> {
    fn index_mut(&mut self, (c, i): (usize, usize)) -> &mut T {
        debug_assert!(c < self.num_components && i < self.num_points);
        &mut self.data[c * self.num_points + i]
    }
}
