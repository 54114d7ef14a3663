//! # Persistent R-tree - Immutable In-Memory Spatial Index
//!
//! This crate provides an immutable R-tree / R*-tree over axis-aligned
//! geometry (points and rectangles in 2 or 3 dimensions) for embedding in
//! other systems: callers insert `(value, geometry)` entries and query
//! which entries overlap a region or lie nearest to a point.
//!
//! ## Features
//!
//! - **Copy-on-Write Versioning**: every insert/delete returns a new tree
//!   value; old versions stay valid and share unchanged subtrees
//! - **Thread Friendly**: immutable nodes, so any number of versions can
//!   be queried from any number of threads without locks
//! - **Pluggable Heuristics**: Guttman (minimal-area / quadratic) and
//!   R*-tree (overlap- and margin-aware) selection and splitting
//! - **Lazy Queries**: range search and best-first nearest-neighbor
//!   search as pull-based iterators
//! - **Bulk Loading**: sort-tile-recursive packing for large batches
//! - **Export Seam**: structural visitor plus node constructors so an
//!   external layer can persist and rebuild trees
//!
//! ## Quick Start
//!
//! ```rust
//! use persistent_rtree::{Config, Entry, Point, Rect, RTree};
//!
//! # fn main() -> Result<(), persistent_rtree::SpatialError> {
//! let config = Config::star().min_children(2).max_children(8).build()?;
//! let tree: RTree<&str, 2> = RTree::new(config);
//!
//! let tree = tree
//!     .insert(Entry::new("museum", Point::xy(3.0, 4.0)))
//!     .insert(Entry::new("harbor", Point::xy(9.0, 1.0)));
//!
//! let query = Rect::new([0.0, 0.0], [5.0, 5.0])?;
//! let hits: Vec<&&str> = tree.search(&query).map(|e| e.value()).collect();
//! assert_eq!(hits, vec![&"museum"]);
//!
//! let nearest: Vec<&&str> = tree
//!     .nearest(&Point::xy(8.0, 0.0), 1)
//!     .map(|e| e.value())
//!     .collect();
//! assert_eq!(nearest, vec![&"harbor"]);
//! # Ok(())
//! # }
//! ```

// Core data model
pub mod config;
pub mod entry;
pub mod errors;
pub mod geometry;
pub mod node;
pub mod tree;

// Strategy implementations (algorithms behind the config enums)
mod selector;
mod splitter;

// Re-export the primary API surface
pub use config::{Config, ConfigBuilder, SelectorKind, SplitterKind};
pub use entry::Entry;
pub use errors::{SpatialError, SpatialResult};
pub use geometry::{Geometry, Point, Rect};
pub use node::{Node, NodeVisitor};
pub use tree::{Nearest, RTree, Search};

/// A tree over 2D geometry.
pub type RTree2D<V> = RTree<V, 2>;

/// A tree over 3D geometry.
pub type RTree3D<V> = RTree<V, 3>;
