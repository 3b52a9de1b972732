//! Material coefficients and their lookup by attribute.
//!
//! Coefficients are symmetric tensors of dimension 1, 2 or 3. They are stored *packed*: only
//! the upper triangle is kept, in row-major order. For dimension 3 the entries are
//! `(0,0), (0,1), (0,2), (1,1), (1,2), (2,2)`.
use crate::allocators::DimAllocator;
use crate::error::QFunctionError;
use crate::Real;
use log::debug;
use nalgebra::{DefaultAllocator, DimName, OMatrix, Scalar};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Number of entries in a packed symmetric tensor of dimension `dim`.
pub fn packed_len(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

/// Index of entry `(r, c)` in a packed symmetric tensor of dimension `dim`.
///
/// The index is symmetric in `r` and `c`.
pub fn packed_index(r: usize, c: usize, dim: usize) -> usize {
    let (r, c) = if r <= c { (r, c) } else { (c, r) };
    debug_assert!(c < dim);
    r * dim - r * (r.saturating_sub(1)) / 2 + (c - r)
}

/// Expands a packed symmetric tensor into a dense matrix.
///
/// # Panics
///
/// Panics if `packed` does not have exactly `D (D + 1) / 2` entries.
pub fn expand_symmetric<T, D>(packed: &[T]) -> OMatrix<T, D, D>
where
    T: Scalar + Copy,
    D: DimName,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    assert_eq!(packed.len(), packed_len(d), "Packed tensor has wrong number of entries");
    OMatrix::<T, D, D>::from_fn(|r, c| packed[packed_index(r, c, d)])
}

/// Packs the upper triangle of a square matrix.
///
/// The lower triangle is ignored, so the result is only meaningful for symmetric matrices.
pub fn pack_symmetric<T, D>(matrix: &OMatrix<T, D, D>) -> Vec<T>
where
    T: Scalar + Copy,
    D: DimName,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    let mut packed = Vec::with_capacity(packed_len(d));
    for r in 0..d {
        for c in r..d {
            packed.push(matrix[(r, c)]);
        }
    }
    packed
}

/// Interprets a quadrature point attribute value as an integer attribute.
///
/// Returns `None` if the value is negative, not finite or has a fractional part.
pub fn attribute_index<T: Real>(value: T) -> Option<usize> {
    if value.fract() == T::zero() {
        value.to_usize()
    } else {
        None
    }
}

fn check_dim(dim: usize) -> Result<(), QFunctionError> {
    if (1..=3).contains(&dim) {
        Ok(())
    } else {
        Err(QFunctionError::UnsupportedDimension(dim))
    }
}

/// A lookup table from integer attributes to packed symmetric coefficient tensors.
///
/// The table has two levels: each attribute maps to a *material*, and each material holds one
/// packed tensor. Several attributes may share the same material. A *uniform* table has a
/// single material and no attribute map; every attribute resolves to that material.
///
/// All tensors in a table have the same dimension. The table is immutable after
/// construction, so it may be shared freely between concurrent kernel invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Scalar + Copy + Serialize",
    deserialize = "T: Scalar + Copy + Deserialize<'de>"
))]
#[serde(try_from = "CoefficientTableParts<T>", into = "CoefficientTableParts<T>")]
pub struct CoefficientTable<T> {
    dim: usize,
    // Packed tensors of all materials, stored contiguously
    materials: Vec<T>,
    // (attribute, material) pairs sorted by attribute. `None` for a uniform table.
    attribute_to_material: Option<Vec<(usize, usize)>>,
}

/// The serialized representation of a [`CoefficientTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTableParts<T> {
    pub dim: usize,
    pub materials: Vec<Vec<T>>,
    /// Pairs `(attribute, material)`. Absent for a uniform table.
    #[serde(default)]
    pub attributes: Option<Vec<(usize, usize)>>,
}

impl<T: Scalar + Copy> CoefficientTable<T> {
    /// Constructs a table from an ordered sequence of `(attribute, packed tensor)` pairs.
    ///
    /// Each pair gets its own material.
    pub fn from_pairs<I, P>(dim: usize, pairs: I) -> Result<Self, QFunctionError>
    where
        I: IntoIterator<Item = (usize, P)>,
        P: AsRef<[T]>,
    {
        let mut materials = Vec::new();
        let mut attribute_map = Vec::new();
        for (material, (attribute, packed)) in pairs.into_iter().enumerate() {
            materials.push(packed.as_ref().to_vec());
            attribute_map.push((attribute, material));
        }
        Self::from_materials(dim, materials, attribute_map)
    }

    /// Constructs a table from a list of materials and a map from attributes to materials.
    pub fn from_materials<P>(
        dim: usize,
        materials: impl IntoIterator<Item = P>,
        attribute_map: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, QFunctionError>
    where
        P: AsRef<[T]>,
    {
        let flat_materials = flatten_materials(dim, materials)?;
        let num_materials = flat_materials.len() / packed_len(dim);

        let mut attribute_to_material = Vec::new();
        for (attribute, material) in attribute_map {
            if material >= num_materials {
                return Err(QFunctionError::MaterialOutOfBounds {
                    attribute,
                    material,
                    num_materials,
                });
            }
            attribute_to_material.push((attribute, material));
        }

        attribute_to_material.sort_unstable_by_key(|&(attribute, _)| attribute);
        if let Some(pair) = attribute_to_material
            .windows(2)
            .find(|pair| pair[0].0 == pair[1].0)
        {
            return Err(QFunctionError::DuplicateAttribute(pair[0].0));
        }

        debug!(
            "Created coefficient table of dimension {} with {} materials for {} attributes",
            dim,
            num_materials,
            attribute_to_material.len()
        );

        Ok(Self {
            dim,
            materials: flat_materials,
            attribute_to_material: Some(attribute_to_material),
        })
    }

    /// Constructs a table in which every attribute resolves to the same tensor.
    pub fn uniform(dim: usize, packed: &[T]) -> Result<Self, QFunctionError> {
        let materials = flatten_materials(dim, [packed])?;
        debug!("Created uniform coefficient table of dimension {}", dim);
        Ok(Self {
            dim,
            materials,
            attribute_to_material: None,
        })
    }

    /// Dimension of the tensors stored in the table.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_materials(&self) -> usize {
        self.materials.len() / packed_len(self.dim)
    }

    pub fn is_uniform(&self) -> bool {
        self.attribute_to_material.is_none()
    }

    /// Returns the packed tensor of the given material.
    ///
    /// # Panics
    ///
    /// Panics if the material index is out of bounds.
    pub fn material(&self, material: usize) -> &[T] {
        let n = packed_len(self.dim);
        &self.materials[material * n..(material + 1) * n]
    }

    /// Returns the material associated with the given attribute, if any.
    pub fn material_for_attribute(&self, attribute: usize) -> Option<usize> {
        match &self.attribute_to_material {
            None => Some(0),
            Some(map) => map
                .binary_search_by_key(&attribute, |&(a, _)| a)
                .ok()
                .map(|idx| map[idx].1),
        }
    }

    /// Returns the packed tensor associated with the given attribute, if any.
    pub fn lookup(&self, attribute: usize) -> Option<&[T]> {
        self.material_for_attribute(attribute)
            .map(|material| self.material(material))
    }

    /// Returns the dense tensor associated with the given attribute, if any.
    ///
    /// # Panics
    ///
    /// Panics if `D` does not agree with the dimension of the table.
    pub fn lookup_dense<D>(&self, attribute: usize) -> Option<OMatrix<T, D, D>>
    where
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        assert_eq!(D::dim(), self.dim, "Tensor dimension mismatch");
        self.lookup(attribute).map(expand_symmetric::<T, D>)
    }

    /// Checks that the table stores tensors of dimension `expected`.
    pub fn check_dim(&self, expected: usize) -> Result<(), QFunctionError> {
        if self.dim == expected {
            Ok(())
        } else {
            Err(QFunctionError::DimensionMismatch {
                expected,
                actual: self.dim,
            })
        }
    }

    /// Lists the attributes known to the table in ascending order, paired with their material.
    ///
    /// A uniform table has no explicit attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.attribute_to_material.iter().flatten().copied()
    }
}

impl<T: Real> CoefficientTable<T> {
    /// Returns the material for an attribute stored as a quadrature point value.
    pub fn material_for_value(&self, value: T) -> Option<usize> {
        if self.is_uniform() {
            Some(0)
        } else {
            attribute_index(value).and_then(|attribute| self.material_for_attribute(attribute))
        }
    }

    /// Returns the packed tensor for an attribute stored as a quadrature point value.
    pub fn lookup_value(&self, value: T) -> Option<&[T]> {
        self.material_for_value(value)
            .map(|material| self.material(material))
    }

    /// Checks that every attribute value in the batch is present in the table.
    pub fn validate_attributes(&self, attributes: &[T]) -> Result<(), QFunctionError> {
        if self.is_uniform() {
            return Ok(());
        }
        match attributes
            .iter()
            .position(|&value| self.material_for_value(value).is_none())
        {
            None => Ok(()),
            Some(point) => Err(QFunctionError::UnknownAttribute {
                point,
                attribute: attributes[point].to_f64().unwrap_or(f64::NAN),
            }),
        }
    }

    /// Validates the attribute values of a batch and returns a view that yields the
    /// coefficient of every point without further checks.
    pub fn resolve_attributes<'a>(
        &'a self,
        attributes: &'a [T],
    ) -> Result<ResolvedAttributes<'a, T>, QFunctionError> {
        self.validate_attributes(attributes)?;
        Ok(ResolvedAttributes {
            table: self,
            attributes,
        })
    }
}

/// Attribute values of a batch, all of which are known to a coefficient table.
///
/// Obtained from [`CoefficientTable::resolve_attributes`].
#[derive(Debug, Copy, Clone)]
pub struct ResolvedAttributes<'a, T> {
    table: &'a CoefficientTable<T>,
    attributes: &'a [T],
}

impl<'a, T: Real> ResolvedAttributes<'a, T> {
    pub fn num_points(&self) -> usize {
        self.attributes.len()
    }

    /// Packed coefficients of all points, in point order.
    pub fn coefficients(&self) -> impl Iterator<Item = &'a [T]> + 'a {
        let table = self.table;
        let n = packed_len(table.dim);
        self.attributes.iter().map(move |&value| {
            // Every value resolves, so the fallback is never taken
            let material = table.material_for_value(value).unwrap_or_default();
            &table.materials[material * n..(material + 1) * n]
        })
    }
}

fn flatten_materials<T, P>(dim: usize, materials: impl IntoIterator<Item = P>) -> Result<Vec<T>, QFunctionError>
where
    T: Scalar + Copy,
    P: AsRef<[T]>,
{
    check_dim(dim)?;
    let expected_len = packed_len(dim);
    let mut flat = Vec::new();
    for packed in materials {
        let packed = packed.as_ref();
        if packed.len() != expected_len {
            return Err(QFunctionError::InvalidCoefficient {
                expected_len,
                actual_len: packed.len(),
            });
        }
        flat.extend_from_slice(packed);
    }
    if flat.is_empty() {
        return Err(QFunctionError::EmptyTable);
    }
    Ok(flat)
}

impl<T: Scalar + Copy> TryFrom<CoefficientTableParts<T>> for CoefficientTable<T> {
    type Error = QFunctionError;

    fn try_from(parts: CoefficientTableParts<T>) -> Result<Self, Self::Error> {
        match parts.attributes {
            Some(attributes) => Self::from_materials(parts.dim, parts.materials, attributes),
            None => {
                if parts.materials.len() > 1 {
                    return Err(QFunctionError::MissingAttributeMap {
                        num_materials: parts.materials.len(),
                    });
                }
                let packed = parts.materials.first().ok_or(QFunctionError::EmptyTable)?;
                Self::uniform(parts.dim, packed)
            }
        }
    }
}

impl<T: Scalar + Copy> From<CoefficientTable<T>> for CoefficientTableParts<T> {
    fn from(table: CoefficientTable<T>) -> Self {
        let materials = (0..table.num_materials())
            .map(|m| table.material(m).to_vec())
            .collect();
        Self {
            dim: table.dim,
            materials,
            attributes: table.attribute_to_material,
        }
    }
}
