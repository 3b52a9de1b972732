use crate::{evaluate, geometry_buffer};
use fenris_qfunctions::coefficient::{attribute_index, packed_index, CoefficientTable};
use fenris_qfunctions::error::QFunctionError;
use fenris_qfunctions::proptest::{apply_batch, coefficient_table, ApplyBatch};
use fenris_qfunctions::qfunction::{apply_hcurl_h1d, apply_hcurl_h1d_22, QFunctionVariant};
use fenris_qfunctions::Real;
use matrixcompare::{assert_matrix_eq, prop_assert_matrix_eq};
use nalgebra::{DMatrix, DVector, U2, U3};
use numeric_literals::replace_float_literals;
use paste::paste;
use proptest::collection::vec;
use proptest::prelude::*;

/// Straightforward dense evaluation of `wdetJ * C (adj(J)^T u)` for every point.
fn reference_apply(
    variant: QFunctionVariant,
    table: &CoefficientTable<f64>,
    num_points: usize,
    geometry: &[f64],
    u: &[f64],
) -> Vec<f64> {
    let (dim, space_dim) = (variant.dim(), variant.space_dim());
    let q = num_points;
    let mut v = vec![0.0; space_dim * q];
    for i in 0..q {
        let attribute = attribute_index(geometry[i]).unwrap();
        let packed = table.lookup(attribute).unwrap();
        let wdet = geometry[q + i];
        let c = DMatrix::from_fn(space_dim, space_dim, |r, s| packed[packed_index(r, s, space_dim)]);
        let g = DMatrix::from_fn(space_dim, dim, |r, s| geometry[(2 + s * space_dim + r) * q + i]);
        let x = DVector::from_fn(dim, |k, _| u[k * q + i]);
        let v_loc = wdet * c * g * x;
        for k in 0..space_dim {
            v[k * q + i] = v_loc[k];
        }
    }
    v
}

#[test]
fn identity_geometry_and_coefficient_scales_input_by_weighted_det() {
    let table = CoefficientTable::from_pairs(2, vec![(0, [1.0, 0.0, 1.0])]).unwrap();
    let geometry = geometry_buffer(&[&[0.0], &[2.0], &[1.0, 0.0, 0.0, 1.0]]);
    let u = [3.0, 4.0];
    let v = evaluate(QFunctionVariant::Apply22, &table, 1, [&geometry[..], &u[..]]).unwrap();
    assert_eq!(v, vec![6.0, 8.0]);
}

#[test]
fn mixed_1d_in_2d_pushes_scalar_input_through_geometry() {
    let (a, b) = (2.0, -3.0);
    let table = CoefficientTable::from_pairs(2, vec![(0, [1.5, 0.0, 1.5])]).unwrap();
    let geometry = geometry_buffer(&[&[0.0], &[0.5], &[a, b]]);
    let u = [5.0];
    let v = evaluate(QFunctionVariant::Apply21, &table, 1, [&geometry[..], &u[..]]).unwrap();
    assert_eq!(v, vec![0.5 * a * 1.5 * 5.0, 0.5 * b * 1.5 * 5.0]);
}

#[test]
fn coefficient_is_applied_after_geometry() {
    // C = [[2, 1], [1, 3]], adj(J)^T = [[1, 2], [0, 1]] (column-major: 1, 0, 2, 1)
    let table = CoefficientTable::from_pairs(2, vec![(0, [2.0, 1.0, 3.0])]).unwrap();
    let geometry = geometry_buffer(&[&[0.0], &[1.0], &[1.0, 0.0, 2.0, 1.0]]);
    let u = [1.0, 1.0];
    let v = evaluate(QFunctionVariant::Apply22, &table, 1, [&geometry[..], &u[..]]).unwrap();
    // G u = (3, 1), C (G u) = (7, 6)
    assert_eq!(v, vec![7.0, 6.0]);
}

#[test]
fn apply_32_agrees_with_dense_reference_for_several_materials() {
    let table = CoefficientTable::from_pairs(
        3,
        vec![
            (1, [1.0, 0.2, 0.0, 2.0, -0.3, 1.5]),
            (2, [4.0, 1.0, 1.0, 4.0, 1.0, 4.0]),
        ],
    )
    .unwrap();
    let q = 3;
    let attributes = [2.0, 1.0, 2.0];
    let wdet = [0.5, 1.25, 2.0];
    let adj_jt: Vec<f64> = (0..6 * q).map(|k| (k as f64 * 0.7).sin()).collect();
    let geometry = geometry_buffer(&[&attributes, &wdet, &adj_jt]);
    let u = [1.0, -2.0, 0.5, 3.0, 0.25, -1.0];

    let v = evaluate(QFunctionVariant::Apply32, &table, q, [&geometry[..], &u[..]]).unwrap();
    let v_ref = reference_apply(QFunctionVariant::Apply32, &table, q, &geometry, &u);
    assert_eq!(v.len(), 9);
    assert_matrix_eq!(DVector::from_vec(v), DVector::from_vec(v_ref), comp = abs, tol = 1e-12);
}

#[test]
fn apply_33_with_shared_material() {
    let materials = vec![[2.0, 0.0, 0.0, 2.0, 0.0, 2.0]];
    let table = CoefficientTable::from_materials(3, materials, vec![(3, 0), (7, 0)]).unwrap();
    let q = 2;
    let mut adj_jt = vec![0.0; 9 * q];
    // Identity at both points
    for k in [0, 4, 8] {
        adj_jt[k * q] = 1.0;
        adj_jt[k * q + 1] = 1.0;
    }
    let geometry = geometry_buffer(&[&[3.0, 7.0], &[1.0, 1.0], &adj_jt]);
    let u = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let v = evaluate(QFunctionVariant::Apply33, &table, q, [&geometry[..], &u[..]]).unwrap();
    assert_eq!(v, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
}

#[replace_float_literals(T::from_f64(literal).unwrap())]
fn check_identity_scenario<T: Real>() {
    let table = CoefficientTable::from_pairs(2, vec![(0, [1.0, 0.0, 1.0])]).unwrap();
    let geometry = [0.0, 2.0, 1.0, 0.0, 0.0, 1.0];
    let u = [3.0, 4.0];
    let expected = [6.0, 8.0];
    let mut v = [0.0, 0.0];
    apply_hcurl_h1d_22::<T>(&table, 1, &[&geometry[..], &u[..]], &mut [&mut v[..]]).unwrap();
    assert_eq!(v, expected);
}

#[test]
fn kernels_support_single_and_double_precision() {
    check_identity_scenario::<f32>();
    check_identity_scenario::<f64>();
}

#[test]
fn unknown_attribute_is_reported_before_any_output_is_written() {
    let table = CoefficientTable::from_pairs(2, vec![(0, [1.0, 0.0, 1.0])]).unwrap();
    let geometry = geometry_buffer(&[&[0.0, 5.0], &[1.0, 1.0], &[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]]);
    let u = [1.0, 1.0, 1.0, 1.0];
    let mut v = [42.0; 4];
    let result = apply_hcurl_h1d::<f64, U2, U2>(&table, 2, &geometry, &u, &mut v);
    assert_eq!(
        result,
        Err(QFunctionError::UnknownAttribute {
            point: 1,
            attribute: 5.0
        })
    );
    assert_eq!(v, [42.0; 4]);
}

#[test]
fn inconsistent_buffers_are_rejected() {
    let table = CoefficientTable::uniform(3, &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
    let q = 2;
    let geometry = vec![0.0; 11 * q];
    let u = vec![0.0; 3 * q];
    let mut v = vec![42.0; 3 * q];

    assert_eq!(
        apply_hcurl_h1d::<f64, U3, U3>(&table, q, &geometry[1..], &u, &mut v),
        Err(QFunctionError::BufferSize {
            buffer: "geometry",
            expected: 22,
            actual: 21
        })
    );
    assert_eq!(
        apply_hcurl_h1d::<f64, U3, U3>(&table, q, &geometry, &u[..5], &mut v),
        Err(QFunctionError::BufferSize {
            buffer: "u",
            expected: 6,
            actual: 5
        })
    );
    assert_eq!(
        apply_hcurl_h1d::<f64, U3, U3>(&table, q, &geometry, &u, &mut v[..4]),
        Err(QFunctionError::BufferSize {
            buffer: "v",
            expected: 6,
            actual: 4
        })
    );
    let table_2d = CoefficientTable::uniform(2, &[1.0, 0.0, 1.0]).unwrap();
    assert_eq!(
        apply_hcurl_h1d::<f64, U3, U2>(&table_2d, q, &geometry, &u, &mut v),
        Err(QFunctionError::DimensionMismatch { expected: 3, actual: 2 })
    );
    assert!(v.iter().all(|&x| x == 42.0));
}

const NUM_ATTRIBUTES: usize = 3;
const MAX_POINTS: usize = 8;

fn apply_case(variant: QFunctionVariant) -> impl Strategy<Value = (CoefficientTable<f64>, ApplyBatch)> {
    (
        coefficient_table(variant.coefficient_dim(), NUM_ATTRIBUTES),
        apply_batch(variant.dim(), variant.space_dim(), NUM_ATTRIBUTES, MAX_POINTS),
    )
}

fn apply_case_with_second_input(
    variant: QFunctionVariant,
) -> impl Strategy<Value = (CoefficientTable<f64>, ApplyBatch, Vec<f64>)> {
    apply_case(variant).prop_flat_map(|(table, batch)| {
        let n = batch.u.len();
        (Just(table), Just(batch), vec(-10.0..10.0, n))
    })
}

macro_rules! apply_properties {
    ($variant:ident) => {
        paste! {
            proptest! {
                #[test]
                fn [<$variant:snake _agrees_with_dense_reference>]((table, batch) in apply_case(QFunctionVariant::$variant)) {
                    let variant = QFunctionVariant::$variant;
                    let ApplyBatch { num_points, geometry, u } = batch;
                    let v = evaluate(variant, &table, num_points, [&geometry[..], &u[..]]).unwrap();
                    let v_ref = reference_apply(variant, &table, num_points, &geometry, &u);
                    prop_assert_matrix_eq!(DVector::from_vec(v), DVector::from_vec(v_ref), comp = abs, tol = 1e-9);
                }

                #[test]
                fn [<$variant:snake _is_linear_in_input>](
                    (table, batch, x2) in apply_case_with_second_input(QFunctionVariant::$variant),
                    alpha in -5.0..5.0,
                    beta in -5.0..5.0
                ) {
                    let variant = QFunctionVariant::$variant;
                    let ApplyBatch { num_points, geometry, u: x1 } = batch;
                    let combined: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| alpha * a + beta * b).collect();

                    let v1 = DVector::from_vec(evaluate(variant, &table, num_points, [&geometry[..], &x1[..]]).unwrap());
                    let v2 = DVector::from_vec(evaluate(variant, &table, num_points, [&geometry[..], &x2[..]]).unwrap());
                    let v = DVector::from_vec(evaluate(variant, &table, num_points, [&geometry[..], &combined[..]]).unwrap());
                    prop_assert_matrix_eq!(v, alpha * v1 + beta * v2, comp = abs, tol = 1e-6);
                }

                #[test]
                fn [<$variant:snake _scales_with_weighted_det>]((table, batch) in apply_case(QFunctionVariant::$variant), k in 0.1..10.0) {
                    let variant = QFunctionVariant::$variant;
                    let ApplyBatch { num_points, geometry, u } = batch;
                    let mut scaled_geometry = geometry.clone();
                    for wdet in &mut scaled_geometry[num_points..2 * num_points] {
                        *wdet *= k;
                    }

                    let v = DVector::from_vec(evaluate(variant, &table, num_points, [&geometry[..], &u[..]]).unwrap());
                    let v_scaled = DVector::from_vec(evaluate(variant, &table, num_points, [&scaled_geometry[..], &u[..]]).unwrap());
                    prop_assert_matrix_eq!(v_scaled, k * v, comp = abs, tol = 1e-6);
                }
            }
        }
    };
}

apply_properties!(Apply22);
apply_properties!(Apply33);
apply_properties!(Apply21);
apply_properties!(Apply32);

fn identity_case(dim: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (0..=MAX_POINTS).prop_flat_map(move |q| (vec(0.1..10.0, q), vec(-10.0..10.0, dim * q)))
}

fn identity_geometry(dim: usize, wdet: &[f64]) -> Vec<f64> {
    let q = wdet.len();
    let mut adj_jt = vec![0.0; dim * dim * q];
    for d in 0..dim {
        let k = d * dim + d;
        adj_jt[k * q..(k + 1) * q].fill(1.0);
    }
    // Attributes are irrelevant for a uniform table
    geometry_buffer(&[&vec![0.0; q][..], wdet, &adj_jt[..]])
}

proptest! {
    #[test]
    fn identity_geometry_22_returns_weighted_input((wdet, u) in identity_case(2)) {
        let q = wdet.len();
        let table = CoefficientTable::uniform(2, &[1.0, 0.0, 1.0]).unwrap();
        let geometry = identity_geometry(2, &wdet);
        let v = evaluate(QFunctionVariant::Apply22, &table, q, [&geometry[..], &u[..]]).unwrap();
        let expected: Vec<f64> = u.iter().enumerate().map(|(k, x)| wdet[k % q] * x).collect();
        prop_assert_eq!(v, expected);
    }

    #[test]
    fn identity_geometry_33_returns_weighted_input((wdet, u) in identity_case(3)) {
        let q = wdet.len();
        let table = CoefficientTable::uniform(3, &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let geometry = identity_geometry(3, &wdet);
        let v = evaluate(QFunctionVariant::Apply33, &table, q, [&geometry[..], &u[..]]).unwrap();
        let expected: Vec<f64> = u.iter().enumerate().map(|(k, x)| wdet[k % q] * x).collect();
        prop_assert_eq!(v, expected);
    }
}
