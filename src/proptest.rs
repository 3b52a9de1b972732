//! Strategies for generating quadrature point batches in property-based tests.
use crate::coefficient::{packed_len, CoefficientTable};
use crate::geometry::apply_geometry_components;
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// Input buffers for an apply kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyBatch {
    pub num_points: usize,
    pub geometry: Vec<f64>,
    pub u: Vec<f64>,
}

/// Input buffers for a build kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildBatch {
    pub num_points: usize,
    pub geometry: Vec<f64>,
    pub qw: Vec<f64>,
}

fn attribute_values(num_attributes: usize, num_points: usize) -> impl Strategy<Value = Vec<f64>> {
    assert!(num_attributes > 0, "Need at least one attribute to generate batches");
    vec((0..num_attributes).prop_map(|a| a as f64), num_points)
}

/// A packed symmetric tensor of the given dimension with moderately sized entries.
pub fn packed_coefficient(dim: usize) -> impl Strategy<Value = Vec<f64>> {
    vec(-10.0..10.0, packed_len(dim))
}

/// A table mapping the attributes `0 .. num_attributes` to arbitrary tensors.
pub fn coefficient_table(dim: usize, num_attributes: usize) -> impl Strategy<Value = CoefficientTable<f64>> {
    vec(packed_coefficient(dim), num_attributes).prop_map(move |materials| {
        CoefficientTable::from_pairs(dim, materials.into_iter().enumerate())
            .expect("Internal error: Generated coefficient table must be valid")
    })
}

/// A batch of at most `max_points` points for an apply kernel.
///
/// Weighted Jacobian determinants are strictly positive, attributes are drawn from
/// `0 .. num_attributes`.
pub fn apply_batch(
    dim: usize,
    space_dim: usize,
    num_attributes: usize,
    max_points: usize,
) -> impl Strategy<Value = ApplyBatch> {
    (0..=max_points)
        .prop_flat_map(move |q| {
            let attributes = attribute_values(num_attributes, q);
            let wdet = vec(0.1..10.0, q);
            let adj_jt = vec(-10.0..10.0, dim * space_dim * q);
            let u = vec(-10.0..10.0, dim * q);
            (Just(q), attributes, wdet, adj_jt, u)
        })
        .prop_map(move |(q, attributes, wdet, adj_jt, u)| {
            let mut geometry = Vec::with_capacity(apply_geometry_components(dim, space_dim) * q);
            geometry.extend(attributes);
            geometry.extend(wdet);
            geometry.extend(adj_jt);
            ApplyBatch {
                num_points: q,
                geometry,
                u,
            }
        })
}

/// A batch of at most `max_points` points for a build kernel.
pub fn build_batch(num_attributes: usize, max_points: usize) -> impl Strategy<Value = BuildBatch> {
    (0..=max_points)
        .prop_flat_map(move |q| {
            let attributes = attribute_values(num_attributes, q);
            let wdet = vec(0.1..10.0, q);
            let qw = vec(0.01..2.0, q);
            (Just(q), attributes, wdet, qw)
        })
        .prop_map(|(q, attributes, wdet, qw)| {
            let mut geometry = Vec::with_capacity(2 * q);
            geometry.extend(attributes);
            geometry.extend(wdet);
            BuildBatch {
                num_points: q,
                geometry,
                qw,
            }
        })
}
