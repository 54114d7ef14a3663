//! The persistent tree structure: leaf and non-leaf nodes.
//!
//! Nodes are immutable after construction. Structural edits build new
//! nodes for the affected path only; everything off the path is shared
//! between tree versions through the `Arc` child handles.

use std::sync::Arc;

use crate::entry::Entry;
use crate::geometry::Rect;

/// A node of the tree.
///
/// Every node carries its minimum bounding rectangle, computed at
/// construction from its content; use [`Node::leaf`] and
/// [`Node::non_leaf`] to build nodes so the cached rectangle stays
/// consistent.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Node<V, const D: usize> {
    /// A node directly holding indexed entries.
    Leaf {
        mbr: Rect<D>,
        entries: Vec<Entry<V, D>>,
    },
    /// A node holding child subtrees.
    NonLeaf {
        mbr: Rect<D>,
        children: Vec<Arc<Node<V, D>>>,
    },
}

impl<V, const D: usize> Node<V, D> {
    /// Builds a leaf over the given entries, computing its bounding
    /// rectangle. The entry list must not be empty.
    pub fn leaf(entries: Vec<Entry<V, D>>) -> Self {
        let mbr = bounds_of(entries.iter().map(|e| e.geometry().mbr()));
        Node::Leaf { mbr, entries }
    }

    /// Builds a non-leaf over the given children, computing its bounding
    /// rectangle. The child list must not be empty.
    pub fn non_leaf(children: Vec<Arc<Node<V, D>>>) -> Self {
        let mbr = bounds_of(children.iter().map(|c| *c.mbr()));
        Node::NonLeaf { mbr, children }
    }

    /// The minimum bounding rectangle of everything beneath this node.
    pub fn mbr(&self) -> &Rect<D> {
        match self {
            Node::Leaf { mbr, .. } => mbr,
            Node::NonLeaf { mbr, .. } => mbr,
        }
    }

    /// True for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of direct children (non-leaf) or entries (leaf).
    pub fn count(&self) -> usize {
        match self {
            Node::Leaf { entries, .. } => entries.len(),
            Node::NonLeaf { children, .. } => children.len(),
        }
    }

    /// The entries of a leaf node.
    pub fn entries(&self) -> Option<&[Entry<V, D>]> {
        match self {
            Node::Leaf { entries, .. } => Some(entries),
            Node::NonLeaf { .. } => None,
        }
    }

    /// The children of a non-leaf node.
    pub fn children(&self) -> Option<&[Arc<Node<V, D>>]> {
        match self {
            Node::Leaf { .. } => None,
            Node::NonLeaf { children, .. } => Some(children),
        }
    }

    /// Height of the subtree rooted here; a lone leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::NonLeaf { children, .. } => {
                1 + children.first().map(|c| c.depth()).unwrap_or(0)
            }
        }
    }

    /// Total number of entries held transitively beneath this node.
    pub fn entry_count(&self) -> usize {
        match self {
            Node::Leaf { entries, .. } => entries.len(),
            Node::NonLeaf { children, .. } => children.iter().map(|c| c.entry_count()).sum(),
        }
    }

    /// Collects every entry beneath this node, used when condensing
    /// underfull nodes during deletion.
    pub(crate) fn collect_entries(&self, out: &mut Vec<Entry<V, D>>)
    where
        V: Clone,
    {
        match self {
            Node::Leaf { entries, .. } => out.extend(entries.iter().cloned()),
            Node::NonLeaf { children, .. } => {
                for child in children {
                    child.collect_entries(out);
                }
            }
        }
    }

    pub(crate) fn visit<T: NodeVisitor<V, D>>(&self, depth: usize, visitor: &mut T) {
        match self {
            Node::Leaf { mbr, entries } => visitor.leaf(mbr, entries, depth),
            Node::NonLeaf { mbr, children } => {
                visitor.non_leaf(mbr, children.len(), depth);
                for child in children {
                    child.visit(depth + 1, visitor);
                }
            }
        }
    }
}

/// Callback surface for [`crate::RTree::visit`]: every node is reported
/// top-down with its bounding rectangle and its depth (root at 0).
///
/// This is the seam an external serialization layer consumes; together
/// with [`Node::leaf`], [`Node::non_leaf`] and
/// [`crate::RTree::from_parts`] it round-trips a tree without reaching
/// into private internals.
pub trait NodeVisitor<V, const D: usize> {
    /// Called for every non-leaf node before its children are visited.
    fn non_leaf(&mut self, mbr: &Rect<D>, child_count: usize, depth: usize);

    /// Called for every leaf node with its entries.
    fn leaf(&mut self, mbr: &Rect<D>, entries: &[Entry<V, D>], depth: usize);
}

fn bounds_of<const D: usize>(mut rects: impl Iterator<Item = Rect<D>>) -> Rect<D> {
    let first = rects
        .next()
        .expect("node must hold at least one entry or child");
    rects.fold(first, |acc, rect| acc.union(&rect))
}

// Manual `Deserialize`: nodes are rebuilt through the constructors so the
// cached rectangle is recomputed from the content, and the stored
// rectangle is checked against it. A payload whose rectangle does not
// cover its content is rejected instead of becoming a tree that silently
// prunes matching entries.
#[cfg(feature = "serde")]
mod serde_impls {
    use std::sync::Arc;

    use super::Node;
    use crate::entry::Entry;
    use crate::geometry::Rect;

    #[derive(serde::Deserialize)]
    enum NodePayload<V, const D: usize> {
        Leaf {
            mbr: Rect<D>,
            entries: Vec<Entry<V, D>>,
        },
        NonLeaf {
            mbr: Rect<D>,
            children: Vec<Arc<Node<V, D>>>,
        },
    }

    impl<'de, V: serde::Deserialize<'de>, const D: usize> serde::Deserialize<'de> for Node<V, D> {
        fn deserialize<De: serde::Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
            let (node, stored) = match NodePayload::deserialize(deserializer)? {
                NodePayload::Leaf { mbr, entries } => {
                    if entries.is_empty() {
                        return Err(serde::de::Error::custom(
                            "leaf node must hold at least one entry",
                        ));
                    }
                    (Node::leaf(entries), mbr)
                }
                NodePayload::NonLeaf { mbr, children } => {
                    if children.is_empty() {
                        return Err(serde::de::Error::custom(
                            "non-leaf node must hold at least one child",
                        ));
                    }
                    (Node::non_leaf(children), mbr)
                }
            };
            if *node.mbr() != stored {
                return Err(serde::de::Error::custom(format!(
                    "stored bounding rectangle {} does not match node content {}",
                    stored,
                    node.mbr()
                )));
            }
            Ok(node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn leaf_of(points: &[(f64, f64)]) -> Node<i32, 2> {
        Node::leaf(
            points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| Entry::new(i as i32, Point::xy(x, y)))
                .collect(),
        )
    }

    #[test]
    fn test_leaf_mbr_covers_entries() {
        let leaf = leaf_of(&[(0.0, 2.0), (5.0, -1.0), (3.0, 3.0)]);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.count(), 3);
        assert_eq!(*leaf.mbr(), Rect::raw([0.0, -1.0], [5.0, 3.0]));
        assert_eq!(leaf.depth(), 1);
    }

    #[test]
    fn test_non_leaf_mbr_covers_children() {
        let a = Arc::new(leaf_of(&[(0.0, 0.0), (1.0, 1.0)]));
        let b = Arc::new(leaf_of(&[(10.0, 10.0), (12.0, 11.0)]));
        let parent = Node::non_leaf(vec![a, b]);
        assert!(!parent.is_leaf());
        assert_eq!(parent.count(), 2);
        assert_eq!(*parent.mbr(), Rect::raw([0.0, 0.0], [12.0, 11.0]));
        assert_eq!(parent.depth(), 2);
        assert_eq!(parent.entry_count(), 4);
    }

    #[test]
    fn test_visit_reports_every_node() {
        struct Counter {
            leaves: usize,
            non_leaves: usize,
            max_depth: usize,
        }
        impl NodeVisitor<i32, 2> for Counter {
            fn non_leaf(&mut self, _mbr: &Rect<2>, _child_count: usize, depth: usize) {
                self.non_leaves += 1;
                self.max_depth = self.max_depth.max(depth);
            }
            fn leaf(&mut self, _mbr: &Rect<2>, entries: &[Entry<i32, 2>], depth: usize) {
                assert!(!entries.is_empty());
                self.leaves += 1;
                self.max_depth = self.max_depth.max(depth);
            }
        }

        let a = Arc::new(leaf_of(&[(0.0, 0.0)]));
        let b = Arc::new(leaf_of(&[(5.0, 5.0)]));
        let root = Node::non_leaf(vec![a, b]);

        let mut counter = Counter {
            leaves: 0,
            non_leaves: 0,
            max_depth: 0,
        };
        root.visit(0, &mut counter);
        assert_eq!(counter.leaves, 2);
        assert_eq!(counter.non_leaves, 1);
        assert_eq!(counter.max_depth, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip_recomputes_mbr() {
        let node = leaf_of(&[(0.0, 2.0), (5.0, -1.0)]);
        let json = serde_json::to_string(&node).unwrap();
        let back: Node<i32, 2> = serde_json::from_str(&json).unwrap();
        assert_eq!(*back.mbr(), *node.mbr());
        assert_eq!(back.count(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_rectangle_not_covering_content() {
        // The stored rectangle misses the entry entirely; accepting it
        // would make search prune the leaf.
        let json = r#"{"Leaf":{"mbr":[[100.0,100.0],[101.0,101.0]],"entries":[{"value":1,"geometry":{"Point":[5.0,5.0]}}]}}"#;
        let err = serde_json::from_str::<Node<i32, 2>>(json).unwrap_err();
        assert!(err.to_string().contains("does not match node content"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_empty_leaf() {
        let json = r#"{"Leaf":{"mbr":[[0.0,0.0],[1.0,1.0]],"entries":[]}}"#;
        assert!(serde_json::from_str::<Node<i32, 2>>(json).is_err());
    }
}
