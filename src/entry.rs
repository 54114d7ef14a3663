//! An indexed entry: an opaque caller value paired with its geometry.

use crate::geometry::Geometry;

/// An immutable `(value, geometry)` pair held by the tree.
///
/// Two entries are equal iff both the value and the geometry are equal;
/// deletion matches on that combined equality.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry<V, const D: usize> {
    value: V,
    geometry: Geometry<D>,
}

impl<V, const D: usize> Entry<V, D> {
    /// Creates an entry from a value and anything convertible to a
    /// [`Geometry`] (a `Point` or a `Rect`).
    pub fn new(value: V, geometry: impl Into<Geometry<D>>) -> Self {
        Entry {
            value,
            geometry: geometry.into(),
        }
    }

    /// The caller-supplied value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The indexed shape.
    pub fn geometry(&self) -> &Geometry<D> {
        &self.geometry
    }
}
