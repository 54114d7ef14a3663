//! Geometry primitives: points, axis-aligned rectangles and the
//! operations the tree needs between them.
//!
//! All types are plain immutable values compared by coordinate equality.
//! The dimensionality `D` (2 or 3 in practice) is a const generic, so a
//! tree built over 2D geometry cannot receive 3D geometry by construction.

use crate::errors::{SpatialError, SpatialResult};

/// A point in `D`-dimensional space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const D: usize> {
    coords: [f64; D],
}

impl<const D: usize> Point<D> {
    /// Creates a point from its coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Point { coords }
    }

    /// Returns all coordinates.
    pub fn coords(&self) -> &[f64; D] {
        &self.coords
    }

    /// Returns the coordinate on the given axis.
    pub fn get(&self, axis: usize) -> f64 {
        self.coords[axis]
    }

    /// Returns the degenerate (zero-volume) rectangle covering this point.
    pub fn mbr(&self) -> Rect<D> {
        Rect {
            min: self.coords,
            max: self.coords,
        }
    }

    /// Minimum distance from this point to a rectangle, 0 when inside.
    pub fn distance(&self, rect: &Rect<D>) -> f64 {
        rect.distance(&self.mbr())
    }

    /// True when this point lies within the rectangle (boundary included).
    pub fn intersects(&self, rect: &Rect<D>) -> bool {
        rect.contains_point(self)
    }
}

impl Point<2> {
    /// Convenience constructor for 2D points.
    pub fn xy(x: f64, y: f64) -> Self {
        Point { coords: [x, y] }
    }
}

impl Point<3> {
    /// Convenience constructor for 3D points.
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Point { coords: [x, y, z] }
    }
}

impl<const D: usize> std::fmt::Display for Point<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// An axis-aligned rectangle (2D) or box (3D) described by its minimum
/// and maximum corners.
///
/// The invariant `min[i] <= max[i]` on every axis is enforced at
/// construction; computed rectangles (unions of valid rectangles) keep it
/// by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<const D: usize> {
    min: [f64; D],
    max: [f64; D],
}

impl<const D: usize> Rect<D> {
    /// Creates a rectangle from its corners.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::MalformedGeometry`] when `min > max` on any
    /// axis, or when a coordinate is NaN.
    pub fn new(min: [f64; D], max: [f64; D]) -> SpatialResult<Self> {
        for axis in 0..D {
            // The negated comparison also rejects NaN coordinates.
            if !(min[axis] <= max[axis]) {
                return Err(SpatialError::MalformedGeometry(format!(
                    "min {} exceeds max {} on axis {}",
                    min[axis], max[axis], axis
                )));
            }
        }
        Ok(Rect { min, max })
    }

    /// Internal constructor for rectangles already known to be valid.
    pub(crate) fn raw(min: [f64; D], max: [f64; D]) -> Self {
        debug_assert!((0..D).all(|i| min[i] <= max[i]));
        Rect { min, max }
    }

    /// Returns the minimum corner.
    pub fn min(&self) -> &[f64; D] {
        &self.min
    }

    /// Returns the maximum corner.
    pub fn max(&self) -> &[f64; D] {
        &self.max
    }

    /// Volume of the rectangle (area in 2D).
    pub fn area(&self) -> f64 {
        (0..D).map(|i| self.max[i] - self.min[i]).product()
    }

    /// Sum of the edge lengths, the "margin" used by the R*-tree split.
    pub fn margin(&self) -> f64 {
        (0..D).map(|i| self.max[i] - self.min[i]).sum()
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect<D>) -> Rect<D> {
        let mut min = self.min;
        let mut max = self.max;
        for i in 0..D {
            min[i] = min[i].min(other.min[i]);
            max[i] = max[i].max(other.max[i]);
        }
        Rect { min, max }
    }

    /// Area growth needed for `self` to also cover `other`.
    pub fn enlargement(&self, other: &Rect<D>) -> f64 {
        self.union(other).area() - self.area()
    }

    /// True when the closed regions overlap; a shared boundary counts.
    pub fn intersects(&self, other: &Rect<D>) -> bool {
        (0..D).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(&self, other: &Rect<D>) -> bool {
        (0..D).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    /// True when the point lies within `self` (boundary included).
    pub fn contains_point(&self, point: &Point<D>) -> bool {
        (0..D).all(|i| self.min[i] <= point.coords[i] && self.max[i] >= point.coords[i])
    }

    /// Volume of the intersection with `other`, 0 when disjoint.
    pub fn overlap(&self, other: &Rect<D>) -> f64 {
        let mut total = 1.0;
        for i in 0..D {
            let extent = self.max[i].min(other.max[i]) - self.min[i].max(other.min[i]);
            if extent <= 0.0 {
                return 0.0;
            }
            total *= extent;
        }
        total
    }

    /// Euclidean distance between the nearest points of the two
    /// rectangles, 0 when they intersect.
    pub fn distance(&self, other: &Rect<D>) -> f64 {
        let mut sum = 0.0;
        for i in 0..D {
            let separation = (other.min[i] - self.max[i])
                .max(self.min[i] - other.max[i])
                .max(0.0);
            sum += separation * separation;
        }
        sum.sqrt()
    }
}

impl<const D: usize> std::fmt::Display for Rect<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rect(")?;
        for (i, c) in self.min.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, " .. ")?;
        for (i, c) in self.max.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// An indexed shape: either a point or a rectangle.
///
/// Dispatched by pattern match; both variants expose the capability set
/// the tree relies on (`mbr`, `intersects`, `distance`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Geometry<const D: usize> {
    Point(Point<D>),
    Rect(Rect<D>),
}

impl<const D: usize> Geometry<D> {
    /// Minimum bounding rectangle of the shape.
    ///
    /// The identity for a rectangle; a degenerate zero-volume rectangle
    /// for a point.
    pub fn mbr(&self) -> Rect<D> {
        match self {
            Geometry::Point(p) => p.mbr(),
            Geometry::Rect(r) => *r,
        }
    }

    /// True when the shape overlaps the rectangle (boundary included).
    pub fn intersects(&self, rect: &Rect<D>) -> bool {
        match self {
            Geometry::Point(p) => p.intersects(rect),
            Geometry::Rect(r) => r.intersects(rect),
        }
    }

    /// Distance from the shape to the rectangle, 0 when overlapping.
    pub fn distance(&self, rect: &Rect<D>) -> f64 {
        match self {
            Geometry::Point(p) => p.distance(rect),
            Geometry::Rect(r) => r.distance(rect),
        }
    }
}

impl<const D: usize> From<Point<D>> for Geometry<D> {
    fn from(point: Point<D>) -> Self {
        Geometry::Point(point)
    }
}

impl<const D: usize> From<Rect<D>> for Geometry<D> {
    fn from(rect: Rect<D>) -> Self {
        Geometry::Rect(rect)
    }
}

// Manual serde implementations: serde does not provide `Deserialize` for
// arrays of arbitrary const-generic length, so coordinates travel as
// sequences and are length-checked on the way back in.
#[cfg(feature = "serde")]
mod serde_impls {
    use super::{Point, Rect};

    impl<const D: usize> serde::Serialize for Point<D> {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.coords[..].serialize(serializer)
        }
    }

    impl<'de, const D: usize> serde::Deserialize<'de> for Point<D> {
        fn deserialize<De: serde::Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
            let coords = coords_from::<De, D>(Vec::<f64>::deserialize(deserializer)?)?;
            Ok(Point { coords })
        }
    }

    impl<const D: usize> serde::Serialize for Rect<D> {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            (&self.min[..], &self.max[..]).serialize(serializer)
        }
    }

    impl<'de, const D: usize> serde::Deserialize<'de> for Rect<D> {
        fn deserialize<De: serde::Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
            let (min, max) = <(Vec<f64>, Vec<f64>)>::deserialize(deserializer)?;
            let min = coords_from::<De, D>(min)?;
            let max = coords_from::<De, D>(max)?;
            Rect::new(min, max).map_err(serde::de::Error::custom)
        }
    }

    fn coords_from<'de, De: serde::Deserializer<'de>, const D: usize>(
        raw: Vec<f64>,
    ) -> Result<[f64; D], De::Error> {
        raw.try_into().map_err(|raw: Vec<f64>| {
            serde::de::Error::custom(format!("expected {} coordinates, got {}", D, raw.len()))
        })
    }
}
