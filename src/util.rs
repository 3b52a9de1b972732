use crate::allocators::BiDimAllocator;
use crate::coefficient::expand_symmetric;
use nalgebra::{DefaultAllocator, DimName, OMatrix, OVector, RealField};

/// Computes the composed action `v = C (G x)`.
///
/// Here `G` is a `S x D` geometric transform, `C` is a symmetric `S x S` coefficient
/// tensor given in packed form and `x` is a vector of dimension `D`. The result is a vector
/// of dimension `S`.
///
/// # Panics
///
/// Panics if `coefficient` does not have exactly `S (S + 1) / 2` entries.
pub fn mult_coefficient_geometry<T, S, D>(
    geometry: &OMatrix<T, S, D>,
    coefficient: &[T],
    x: &OVector<T, D>,
) -> OVector<T, S>
where
    T: RealField + Copy,
    S: DimName,
    D: DimName,
    DefaultAllocator: BiDimAllocator<T, S, D>,
{
    let c: OMatrix<T, S, S> = expand_symmetric(coefficient);
    c * (geometry * x)
}
