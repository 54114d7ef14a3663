//! Node-splitting strategies applied when an insertion overflows a node.
//!
//! A splitter partitions `max_children + 1` items into two groups, each
//! holding at least `min_children` items. The partition invariant is
//! re-checked after every split; a strategy that breaks it is a
//! programming error and aborts with a labeled panic rather than
//! producing an invalid tree.

use itertools::Itertools;

use crate::config::SplitterKind;
use crate::entry::Entry;
use crate::geometry::Rect;
use crate::node::Node;

/// Anything the splitter can partition: leaf entries or child nodes.
pub(crate) trait Bounded<const D: usize> {
    fn bounds(&self) -> Rect<D>;
}

impl<V, const D: usize> Bounded<D> for Entry<V, D> {
    fn bounds(&self) -> Rect<D> {
        self.geometry().mbr()
    }
}

impl<V, const D: usize> Bounded<D> for std::sync::Arc<Node<V, D>> {
    fn bounds(&self) -> Rect<D> {
        *self.mbr()
    }
}

impl SplitterKind {
    /// Partitions an overflowing item list into two groups.
    pub(crate) fn split<T: Bounded<D>, const D: usize>(
        &self,
        items: Vec<T>,
        min_children: usize,
    ) -> (Vec<T>, Vec<T>) {
        let total = items.len();
        debug_assert!(total >= 2 * min_children);
        let (first, second) = match self {
            SplitterKind::Quadratic => split_quadratic(items, min_children),
            SplitterKind::RStar => split_rstar(items, min_children),
        };
        check_partition(first.len(), second.len(), total, min_children);
        (first, second)
    }
}

fn check_partition(first: usize, second: usize, total: usize, min_children: usize) {
    if first + second != total
        || first < min_children
        || second < min_children
        || first > total - min_children
        || second > total - min_children
    {
        panic!(
            "split invariant violated: partition {}/{} of {} items with min_children {}",
            first, second, total, min_children
        );
    }
}

/// Guttman's quadratic split.
///
/// Seeds are the pair wasting the most area when boxed together; each
/// remaining item is assigned by its strongest relative preference,
/// except when a group must take everything left to reach
/// `min_children`, or has grown so large the other group could not.
fn split_quadratic<T: Bounded<D>, const D: usize>(
    items: Vec<T>,
    min_children: usize,
) -> (Vec<T>, Vec<T>) {
    let rects: Vec<Rect<D>> = items.iter().map(Bounded::bounds).collect();
    let total = rects.len();

    let (mut seed_a, mut seed_b) = (0, 1);
    let mut worst_waste = f64::NEG_INFINITY;
    for (i, j) in (0..total).tuple_combinations() {
        let waste = rects[i].union(&rects[j]).area() - rects[i].area() - rects[j].area();
        if waste > worst_waste {
            worst_waste = waste;
            seed_a = i;
            seed_b = j;
        }
    }

    let mut group_a = vec![seed_a];
    let mut group_b = vec![seed_b];
    let mut rect_a = rects[seed_a];
    let mut rect_b = rects[seed_b];
    let mut remaining: Vec<usize> = (0..total).filter(|&i| i != seed_a && i != seed_b).collect();
    // A group larger than this would starve the other below min_children.
    let cap = total - min_children;

    while !remaining.is_empty() {
        if group_a.len() + remaining.len() == min_children || group_b.len() == cap {
            group_a.append(&mut remaining);
            break;
        }
        if group_b.len() + remaining.len() == min_children || group_a.len() == cap {
            group_b.append(&mut remaining);
            break;
        }

        // Strongest preference for either group goes next.
        let mut pick = 0;
        let mut pick_diff = f64::NEG_INFINITY;
        for (slot, &index) in remaining.iter().enumerate() {
            let diff =
                (rect_a.enlargement(&rects[index]) - rect_b.enlargement(&rects[index])).abs();
            if diff > pick_diff {
                pick_diff = diff;
                pick = slot;
            }
        }
        let index = remaining.remove(pick);

        let to_a = rect_a.enlargement(&rects[index]);
        let to_b = rect_b.enlargement(&rects[index]);
        let prefers_a = match to_a.total_cmp(&to_b) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => match rect_a.area().total_cmp(&rect_b.area()) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => group_a.len() <= group_b.len(),
            },
        };
        if prefers_a {
            rect_a = rect_a.union(&rects[index]);
            group_a.push(index);
        } else {
            rect_b = rect_b.union(&rects[index]);
            group_b.push(index);
        }
    }

    take_groups(items, &group_a, &group_b)
}

/// R*-tree split.
///
/// Items are sorted by lower and by upper bound on every axis; among the
/// distributions leaving `min_children..=total - min_children` items on
/// each side, the split axis is the one minimizing the summed margins,
/// and the chosen distribution on that axis minimizes overlap, with area
/// as the tie-break.
fn split_rstar<T: Bounded<D>, const D: usize>(
    items: Vec<T>,
    min_children: usize,
) -> (Vec<T>, Vec<T>) {
    struct Candidate {
        order: Vec<usize>,
        first_len: usize,
        overlap: f64,
        area: f64,
    }

    let rects: Vec<Rect<D>> = items.iter().map(Bounded::bounds).collect();
    let total = rects.len();

    let mut best: Option<(f64, Candidate)> = None;
    for axis in 0..D {
        let mut margin_sum = 0.0;
        let mut axis_best: Option<Candidate> = None;

        for by_upper in [false, true] {
            let mut order: Vec<usize> = (0..total).collect();
            order.sort_by(|&a, &b| {
                let (ka, kb) = if by_upper {
                    (rects[a].max()[axis], rects[b].max()[axis])
                } else {
                    (rects[a].min()[axis], rects[b].min()[axis])
                };
                ka.total_cmp(&kb)
            });

            // Running unions from both ends make each distribution O(1).
            let mut prefix = Vec::with_capacity(total);
            let mut running = rects[order[0]];
            for &index in &order {
                running = running.union(&rects[index]);
                prefix.push(running);
            }
            let mut suffix = vec![running; total];
            let mut running = rects[order[total - 1]];
            for slot in (0..total).rev() {
                running = running.union(&rects[order[slot]]);
                suffix[slot] = running;
            }

            for first_len in min_children..=(total - min_children) {
                let left = prefix[first_len - 1];
                let right = suffix[first_len];
                margin_sum += left.margin() + right.margin();
                let overlap = left.overlap(&right);
                let area = left.area() + right.area();
                let better = match &axis_best {
                    None => true,
                    Some(candidate) => match overlap.total_cmp(&candidate.overlap) {
                        std::cmp::Ordering::Less => true,
                        std::cmp::Ordering::Greater => false,
                        std::cmp::Ordering::Equal => {
                            area.total_cmp(&candidate.area) == std::cmp::Ordering::Less
                        }
                    },
                };
                if better {
                    axis_best = Some(Candidate {
                        order: order.clone(),
                        first_len,
                        overlap,
                        area,
                    });
                }
            }
        }

        let axis_best = axis_best.expect("split called with fewer than 2 * min_children items");
        let replace = match &best {
            None => true,
            Some((margin, _)) => margin_sum < *margin,
        };
        if replace {
            best = Some((margin_sum, axis_best));
        }
    }

    let (_, candidate) = best.expect("geometry must have at least one axis");
    let first: Vec<usize> = candidate.order[..candidate.first_len].to_vec();
    let second: Vec<usize> = candidate.order[candidate.first_len..].to_vec();
    take_groups(items, &first, &second)
}

/// Moves items into the two index groups without cloning.
fn take_groups<T>(items: Vec<T>, first: &[usize], second: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let group_a = first
        .iter()
        .map(|&i| slots[i].take().expect("index assigned to both groups"))
        .collect();
    let group_b = second
        .iter()
        .map(|&i| slots[i].take().expect("index assigned to both groups"))
        .collect();
    (group_a, group_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn entries_at(points: &[(f64, f64)]) -> Vec<Entry<usize, 2>> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Entry::new(i, Point::xy(x, y)))
            .collect()
    }

    fn assert_valid_partition(
        input: &[Entry<usize, 2>],
        first: &[Entry<usize, 2>],
        second: &[Entry<usize, 2>],
        min_children: usize,
    ) {
        assert_eq!(first.len() + second.len(), input.len());
        assert!(first.len() >= min_children);
        assert!(second.len() >= min_children);
        let mut values: Vec<usize> = first
            .iter()
            .chain(second.iter())
            .map(|e| *e.value())
            .collect();
        values.sort_unstable();
        let expected: Vec<usize> = (0..input.len()).collect();
        assert_eq!(values, expected, "groups must partition the input exactly");
    }

    #[test]
    fn test_quadratic_separates_distant_clusters() {
        let input = entries_at(&[
            (0.0, 0.0),
            (1.0, 1.0),
            (0.5, 0.5),
            (100.0, 100.0),
            (101.0, 101.0),
        ]);
        let (first, second) = SplitterKind::Quadratic.split(input.clone(), 2);
        assert_valid_partition(&input, &first, &second, 2);

        let low: Vec<&Entry<usize, 2>> = first
            .iter()
            .chain(second.iter())
            .filter(|e| e.geometry().mbr().max()[0] < 50.0)
            .collect();
        assert_eq!(low.len(), 3);
        // All three low points end up on one side.
        assert!(first.iter().all(|e| e.geometry().mbr().max()[0] < 50.0)
            || second.iter().all(|e| e.geometry().mbr().max()[0] < 50.0));
    }

    #[test]
    fn test_quadratic_respects_min_children_under_skew() {
        // Four co-located points and one outlier; the outlier side must
        // still receive min_children items.
        let input = entries_at(&[
            (0.0, 0.0),
            (0.1, 0.1),
            (0.2, 0.2),
            (0.3, 0.3),
            (500.0, 500.0),
        ]);
        let (first, second) = SplitterKind::Quadratic.split(input.clone(), 2);
        assert_valid_partition(&input, &first, &second, 2);
    }

    #[test]
    fn test_rstar_splits_along_separating_axis() {
        // Two clusters separated in y; x coordinates interleave.
        let input = entries_at(&[
            (0.0, 0.0),
            (5.0, 1.0),
            (2.0, 0.5),
            (1.0, 100.0),
            (4.0, 101.0),
        ]);
        let (first, second) = SplitterKind::RStar.split(input.clone(), 2);
        assert_valid_partition(&input, &first, &second, 2);

        let (low, high) = if first[0].geometry().mbr().min()[1] < 50.0 {
            (&first, &second)
        } else {
            (&second, &first)
        };
        assert!(low.iter().all(|e| e.geometry().mbr().max()[1] < 50.0));
        assert!(high.iter().all(|e| e.geometry().mbr().min()[1] > 50.0));
    }

    #[test]
    fn test_rstar_split_with_min_children_one() {
        let input = entries_at(&[(0.0, 0.0), (10.0, 10.0), (10.5, 10.5)]);
        let (first, second) = SplitterKind::RStar.split(input.clone(), 1);
        assert_valid_partition(&input, &first, &second, 1);
    }

    #[test]
    fn test_split_works_on_child_nodes() {
        let children: Vec<std::sync::Arc<Node<usize, 2>>> = (0..5)
            .map(|i| {
                std::sync::Arc::new(Node::leaf(vec![Entry::new(
                    i,
                    Point::xy(i as f64 * 10.0, 0.0),
                )]))
            })
            .collect();
        let (first, second) = SplitterKind::Quadratic.split(children, 2);
        assert_eq!(first.len() + second.len(), 5);
        assert!(first.len() >= 2 && second.len() >= 2);
    }

    #[test]
    #[should_panic(expected = "split invariant violated")]
    fn test_partition_check_rejects_undersized_group() {
        check_partition(1, 4, 5, 2);
    }

    #[test]
    fn test_3d_split() {
        let input: Vec<Entry<usize, 3>> = (0..5)
            .map(|i| {
                let offset = if i < 3 { 0.0 } else { 1000.0 };
                Entry::new(i, Point::xyz(i as f64, 0.0, offset))
            })
            .collect();
        let (first, second) = SplitterKind::RStar.split(input, 2);
        assert!(first.len() >= 2 && second.len() >= 2);
    }
}
