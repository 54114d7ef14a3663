//! Subtree-selection strategies used during insertion.
//!
//! Both strategies are pure functions of the child list and the incoming
//! geometry, deterministic for a fixed input order: every comparison uses
//! `f64::total_cmp` and ties keep the lowest index.

use std::sync::Arc;

use crate::config::SelectorKind;
use crate::geometry::Rect;
use crate::node::Node;

impl SelectorKind {
    /// Picks the index of the child that should absorb a geometry with
    /// the given bounding rectangle. The child list must not be empty.
    pub(crate) fn select<V, const D: usize>(
        &self,
        children: &[Arc<Node<V, D>>],
        target: &Rect<D>,
    ) -> usize {
        debug_assert!(!children.is_empty());
        match self {
            SelectorKind::MinimalArea => best_index(children.len(), |i| {
                area_key(children[i].mbr(), target)
            }),
            SelectorKind::RStar => {
                // R* rule: when the candidates are leaves, minimizing the
                // overlap growth among siblings beats raw area growth.
                if children.first().map_or(false, |c| c.is_leaf()) {
                    best_index(children.len(), |i| overlap_key(children, i, target))
                } else {
                    best_index(children.len(), |i| area_key(children[i].mbr(), target))
                }
            }
        }
    }
}

/// Index with the lexicographically smallest key; the earliest index wins
/// a full tie.
fn best_index<const N: usize>(len: usize, key_of: impl Fn(usize) -> [f64; N]) -> usize {
    let mut best = 0;
    let mut best_key = key_of(0);
    for i in 1..len {
        let key = key_of(i);
        if key_less(&key, &best_key) {
            best = i;
            best_key = key;
        }
    }
    best
}

fn key_less(a: &[f64], b: &[f64]) -> bool {
    for (x, y) in a.iter().zip(b) {
        match x.total_cmp(y) {
            std::cmp::Ordering::Less => return true,
            std::cmp::Ordering::Greater => return false,
            std::cmp::Ordering::Equal => {}
        }
    }
    false
}

/// (area enlargement, resulting area, existing area)
fn area_key<const D: usize>(mbr: &Rect<D>, target: &Rect<D>) -> [f64; 3] {
    let combined = mbr.union(target);
    let combined_area = combined.area();
    [combined_area - mbr.area(), combined_area, mbr.area()]
}

/// (overlap enlargement among siblings, area enlargement, resulting area,
/// existing area)
fn overlap_key<V, const D: usize>(
    children: &[Arc<Node<V, D>>],
    index: usize,
    target: &Rect<D>,
) -> [f64; 4] {
    let mbr = children[index].mbr();
    let combined = mbr.union(target);
    let mut overlap_before = 0.0;
    let mut overlap_after = 0.0;
    for (j, sibling) in children.iter().enumerate() {
        if j == index {
            continue;
        }
        let other = sibling.mbr();
        overlap_before += mbr.overlap(other);
        overlap_after += combined.overlap(other);
    }
    let combined_area = combined.area();
    [
        overlap_after - overlap_before,
        combined_area - mbr.area(),
        combined_area,
        mbr.area(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::geometry::Point;

    fn leaf(min: [f64; 2], max: [f64; 2]) -> Arc<Node<i32, 2>> {
        Arc::new(Node::leaf(vec![
            Entry::new(0, Point::new(min)),
            Entry::new(1, Point::new(max)),
        ]))
    }

    fn wrap(child: &Arc<Node<i32, 2>>) -> Arc<Node<i32, 2>> {
        Arc::new(Node::non_leaf(vec![child.clone()]))
    }

    #[test]
    fn test_minimal_area_picks_enclosing_child() {
        let children = vec![leaf([0.0, 0.0], [10.0, 10.0]), leaf([20.0, 0.0], [30.0, 10.0])];
        let target = Rect::raw([25.0, 5.0], [26.0, 6.0]);
        // The second child already covers the target, zero enlargement.
        assert_eq!(SelectorKind::MinimalArea.select(&children, &target), 1);
    }

    #[test]
    fn test_minimal_area_tie_breaks_on_smaller_area() {
        // Both children need zero enlargement; the smaller one wins.
        let children = vec![leaf([0.0, 0.0], [10.0, 10.0]), leaf([2.0, 2.0], [8.0, 8.0])];
        let target = Rect::raw([4.0, 4.0], [5.0, 5.0]);
        assert_eq!(SelectorKind::MinimalArea.select(&children, &target), 1);
    }

    #[test]
    fn test_minimal_area_full_tie_keeps_first() {
        let children = vec![leaf([0.0, 0.0], [4.0, 4.0]), leaf([0.0, 0.0], [4.0, 4.0])];
        let target = Rect::raw([1.0, 1.0], [2.0, 2.0]);
        assert_eq!(SelectorKind::MinimalArea.select(&children, &target), 0);
    }

    #[test]
    fn test_rstar_prefers_low_overlap_among_leaves() {
        // Growing the second child onto the target would make it overlap
        // the first; the first child absorbs the target with zero new
        // overlap even though its area enlargement is larger (15 vs 5).
        let children = vec![leaf([0.0, 0.0], [10.0, 10.0]), leaf([4.0, 12.0], [6.0, 22.0])];
        let target = Rect::raw([5.0, 9.5], [5.5, 11.5]);
        assert_eq!(SelectorKind::MinimalArea.select(&children, &target), 1);
        assert_eq!(SelectorKind::RStar.select(&children, &target), 0);
    }

    #[test]
    fn test_rstar_uses_area_above_leaf_parents() {
        let inner_a = leaf([0.0, 0.0], [10.0, 10.0]);
        let inner_b = leaf([20.0, 0.0], [30.0, 10.0]);
        let children = vec![wrap(&inner_a), wrap(&inner_b)];
        let target = Rect::raw([25.0, 5.0], [26.0, 6.0]);
        assert_eq!(SelectorKind::RStar.select(&children, &target), 1);
    }
}
