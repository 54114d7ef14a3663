//! The immutable tree handle and its algorithms: copy-on-write insertion
//! and deletion, lazy range search, best-first nearest-neighbor search,
//! and STR bulk loading.

use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::config::Config;
use crate::entry::Entry;
use crate::geometry::{Point, Rect};
use crate::node::{Node, NodeVisitor};
use crate::splitter::Bounded;

/// An immutable R-tree over `(value, geometry)` entries.
///
/// Every mutation returns a brand-new tree value; the previous version
/// stays valid and both versions share every node off the edited path.
/// Because no node is ever mutated after construction, any number of
/// tree versions can be queried concurrently without synchronization.
///
/// # Examples
///
/// ```rust
/// use persistent_rtree::{Config, Entry, Point, Rect, RTree};
///
/// let empty: RTree<u32, 2> = RTree::new(Config::default());
/// let tree = empty.insert(Entry::new(7, Point::xy(1.0, 2.0)));
///
/// assert_eq!(empty.size(), 0); // the old version is untouched
/// assert_eq!(tree.size(), 1);
///
/// let query = Rect::new([0.0, 0.0], [5.0, 5.0])?;
/// assert_eq!(tree.search(&query).count(), 1);
/// # Ok::<(), persistent_rtree::SpatialError>(())
/// ```
#[derive(Debug)]
pub struct RTree<V, const D: usize> {
    root: Option<Arc<Node<V, D>>>,
    config: Arc<Config>,
    size: usize,
}

impl<V, const D: usize> Clone for RTree<V, D> {
    fn clone(&self) -> Self {
        RTree {
            root: self.root.clone(),
            config: self.config.clone(),
            size: self.size,
        }
    }
}

impl<V, const D: usize> RTree<V, D> {
    /// Creates an empty tree with the given configuration.
    pub fn new(config: Config) -> Self {
        RTree {
            root: None,
            config: Arc::new(config),
            size: 0,
        }
    }

    /// Rebuilds a tree handle from an exported root, recomputing the
    /// entry count by traversal. This is the decoding half of the
    /// structural export seam; see [`NodeVisitor`] for the encoding half.
    pub fn from_parts(root: Option<Arc<Node<V, D>>>, config: Config) -> Self {
        let size = root.as_ref().map_or(0, |r| r.entry_count());
        #[cfg(debug_assertions)]
        if let Some(root) = &root {
            debug_check_arity(root, true, &config);
        }
        RTree {
            root,
            config: Arc::new(config),
            size,
        }
    }

    /// The tree configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The root node, absent iff the tree is empty.
    pub fn root(&self) -> Option<&Arc<Node<V, D>>> {
        self.root.as_ref()
    }

    /// Number of entries held.
    pub fn size(&self) -> usize {
        self.size
    }

    /// True when the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Height of the tree; 0 when empty, 1 for a lone leaf root.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.depth())
    }

    /// Walks every node top-down, reporting kind, bounding rectangle and
    /// depth (root at depth 0), and leaf entries.
    pub fn visit<T: NodeVisitor<V, D>>(&self, visitor: &mut T) {
        if let Some(root) = &self.root {
            root.visit(0, visitor);
        }
    }

    /// Entries whose geometry intersects the query rectangle, as a lazy,
    /// restartable iterator. Subtrees whose bounding rectangle misses the
    /// query are pruned without being descended.
    pub fn search(&self, query: &Rect<D>) -> Search<'_, V, D> {
        let mut stack = Vec::new();
        if let Some(root) = &self.root {
            if root.mbr().intersects(query) {
                stack.push(Pending::Node(root.as_ref()));
            }
        }
        Search {
            query: *query,
            stack,
        }
    }

    /// Entries whose geometry covers the given point; equivalent to
    /// [`RTree::search`] with a degenerate rectangle.
    pub fn search_point(&self, point: &Point<D>) -> Search<'_, V, D> {
        self.search(&point.mbr())
    }

    /// All entries of the tree, in traversal order.
    pub fn iter(&self) -> Search<'_, V, D> {
        let mut stack = Vec::new();
        if let Some(root) = &self.root {
            stack.push(Pending::Node(root.as_ref()));
        }
        // The root rectangle covers every entry, so nothing is pruned.
        Search {
            query: self
                .root
                .as_ref()
                .map_or_else(|| Point::new([0.0; D]).mbr(), |r| *r.mbr()),
            stack,
        }
    }

    /// The `k` entries nearest to `point`, as a lazy iterator in
    /// non-decreasing distance order (fewer than `k` when the tree is
    /// smaller).
    ///
    /// Best-first search over a priority queue: a popped entry is final
    /// because no still-queued node can hold anything closer — a node's
    /// bounding rectangle is a lower bound on the distance of everything
    /// beneath it.
    pub fn nearest(&self, point: &Point<D>, k: usize) -> Nearest<'_, V, D> {
        let query = point.mbr();
        let mut queue = BinaryHeap::new();
        if k > 0 {
            if let Some(root) = &self.root {
                queue.push(Candidate {
                    distance: root.mbr().distance(&query),
                    item: Pending::Node(root.as_ref()),
                });
            }
        }
        Nearest {
            query,
            queue,
            remaining: k,
        }
    }
}

impl<V: Clone, const D: usize> RTree<V, D> {
    /// Inserts one entry, returning the new tree version.
    ///
    /// Descends through non-leaf nodes using the configured selector,
    /// appends at a leaf, and splits overflowing nodes on the way back
    /// up; a root split grows the tree by one level. Only the nodes on
    /// the descent path are rebuilt.
    pub fn insert(&self, entry: Entry<V, D>) -> RTree<V, D> {
        let root = match &self.root {
            None => Arc::new(Node::leaf(vec![entry])),
            Some(root) => match insert_below(root, entry, &self.config) {
                Inserted::One(node) => node,
                Inserted::Split(first, second) => {
                    log::debug!(
                        "root split, tree height grows to {}",
                        first.depth() + 1
                    );
                    Arc::new(Node::non_leaf(vec![first, second]))
                }
            },
        };
        RTree {
            root: Some(root),
            config: self.config.clone(),
            size: self.size + 1,
        }
    }

    /// Inserts every entry of a sequence, returning the final version.
    pub fn insert_all(&self, entries: impl IntoIterator<Item = Entry<V, D>>) -> RTree<V, D> {
        entries
            .into_iter()
            .fold(self.clone(), |tree, entry| tree.insert(entry))
    }

    /// Builds a tree from scratch with sort-tile-recursive packing.
    ///
    /// Entries are sorted by their center coordinate axis by axis and
    /// tiled into full nodes bottom-up. Much cheaper than repeated
    /// [`RTree::insert`] for large batches and produces a well-balanced
    /// tree; chunk sizes are evened out so every non-root node meets
    /// `min_children`.
    pub fn bulk_load(config: Config, entries: impl IntoIterator<Item = Entry<V, D>>) -> RTree<V, D> {
        let entries: Vec<Entry<V, D>> = entries.into_iter().collect();
        let size = entries.len();
        if entries.is_empty() {
            return RTree::new(config);
        }
        let fanout = config.max_children();
        let mut nodes: Vec<Arc<Node<V, D>>> = str_chunks(entries, fanout)
            .into_iter()
            .map(|chunk| Arc::new(Node::leaf(chunk)))
            .collect();
        while nodes.len() > 1 {
            nodes = str_chunks(nodes, fanout)
                .into_iter()
                .map(|chunk| Arc::new(Node::non_leaf(chunk)))
                .collect();
        }
        RTree {
            root: nodes.pop(),
            config: Arc::new(config),
            size,
        }
    }
}

impl<V: Clone + PartialEq, const D: usize> RTree<V, D> {
    /// Removes one entry matching `entry` by value-and-geometry equality,
    /// returning the new tree version; when the entry is absent the
    /// returned version is equivalent to `self`.
    ///
    /// A non-root node left with fewer than `min_children` members is
    /// condensed away: it is removed from its parent and its remaining
    /// entries are reinserted from the root. The root itself is exempt
    /// from `min_children`; a root left with a single child is collapsed,
    /// shrinking the tree height.
    pub fn delete(&self, entry: &Entry<V, D>) -> RTree<V, D> {
        let root = match &self.root {
            None => return self.clone(),
            Some(root) => root,
        };
        let (root, orphans) = match delete_below(root, entry, &self.config, true) {
            Deleted::NotFound => return self.clone(),
            Deleted::Kept(node, orphans) => (Some(collapse_root(node)), orphans),
            Deleted::Gone(orphans) => (None, orphans),
        };
        if !orphans.is_empty() {
            log::debug!("condense: reinserting {} orphaned entries", orphans.len());
        }
        let pruned = RTree {
            root,
            config: self.config.clone(),
            size: self.size - 1 - orphans.len(),
        };
        pruned.insert_all(orphans)
    }

    /// Removes every entry of a sequence in order.
    pub fn delete_all<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a Entry<V, D>>,
    ) -> RTree<V, D>
    where
        V: 'a,
    {
        entries
            .into_iter()
            .fold(self.clone(), |tree, entry| tree.delete(entry))
    }

    /// True when the tree holds an entry equal to `entry`.
    pub fn contains(&self, entry: &Entry<V, D>) -> bool {
        self.search(&entry.geometry().mbr())
            .any(|found| found == entry)
    }
}

// ============================================================================
// Insertion
// ============================================================================

enum Inserted<V, const D: usize> {
    One(Arc<Node<V, D>>),
    Split(Arc<Node<V, D>>, Arc<Node<V, D>>),
}

fn insert_below<V: Clone, const D: usize>(
    node: &Arc<Node<V, D>>,
    entry: Entry<V, D>,
    config: &Config,
) -> Inserted<V, D> {
    match node.as_ref() {
        Node::Leaf { entries, .. } => {
            let mut next = Vec::with_capacity(entries.len() + 1);
            next.extend(entries.iter().cloned());
            next.push(entry);
            if next.len() > config.max_children() {
                let (first, second) = config.splitter().split(next, config.min_children());
                Inserted::Split(
                    Arc::new(Node::leaf(first)),
                    Arc::new(Node::leaf(second)),
                )
            } else {
                Inserted::One(Arc::new(Node::leaf(next)))
            }
        }
        Node::NonLeaf { children, .. } => {
            let target = config
                .selector()
                .select(children, &entry.geometry().mbr());
            // Siblings off the path are reused by reference.
            let mut next = children.clone();
            match insert_below(&children[target], entry, config) {
                Inserted::One(child) => next[target] = child,
                Inserted::Split(first, second) => {
                    next[target] = first;
                    next.push(second);
                }
            }
            if next.len() > config.max_children() {
                let (first, second) = config.splitter().split(next, config.min_children());
                Inserted::Split(
                    Arc::new(Node::non_leaf(first)),
                    Arc::new(Node::non_leaf(second)),
                )
            } else {
                Inserted::One(Arc::new(Node::non_leaf(next)))
            }
        }
    }
}

// ============================================================================
// Deletion
// ============================================================================

enum Deleted<V, const D: usize> {
    /// No matching entry beneath this node.
    NotFound,
    /// The node survives (rebuilt); orphans collected further down.
    Kept(Arc<Node<V, D>>, Vec<Entry<V, D>>),
    /// The node fell below `min_children` and was dissolved; its
    /// remaining content is handed up for reinsertion.
    Gone(Vec<Entry<V, D>>),
}

fn delete_below<V: Clone + PartialEq, const D: usize>(
    node: &Arc<Node<V, D>>,
    entry: &Entry<V, D>,
    config: &Config,
    is_root: bool,
) -> Deleted<V, D> {
    match node.as_ref() {
        Node::Leaf { entries, .. } => {
            let position = match entries.iter().position(|e| e == entry) {
                Some(position) => position,
                None => return Deleted::NotFound,
            };
            let mut remaining = entries.clone();
            remaining.remove(position);
            if remaining.is_empty() {
                Deleted::Gone(Vec::new())
            } else if !is_root && remaining.len() < config.min_children() {
                Deleted::Gone(remaining)
            } else {
                Deleted::Kept(Arc::new(Node::leaf(remaining)), Vec::new())
            }
        }
        Node::NonLeaf { children, .. } => {
            let target_mbr = entry.geometry().mbr();
            for (index, child) in children.iter().enumerate() {
                if !child.mbr().intersects(&target_mbr) {
                    continue;
                }
                match delete_below(child, entry, config, false) {
                    Deleted::NotFound => continue,
                    Deleted::Kept(rebuilt, orphans) => {
                        let mut next = children.clone();
                        next[index] = rebuilt;
                        return Deleted::Kept(Arc::new(Node::non_leaf(next)), orphans);
                    }
                    Deleted::Gone(mut orphans) => {
                        let mut next = children.clone();
                        next.remove(index);
                        if next.is_empty() {
                            return Deleted::Gone(orphans);
                        }
                        // The root is exempt from min_children; an
                        // underfull root is collapsed afterwards instead
                        // of dissolved.
                        if !is_root && next.len() < config.min_children() {
                            for child in &next {
                                child.collect_entries(&mut orphans);
                            }
                            return Deleted::Gone(orphans);
                        }
                        return Deleted::Kept(Arc::new(Node::non_leaf(next)), orphans);
                    }
                }
            }
            Deleted::NotFound
        }
    }
}

/// Debug-only arity check for trees rebuilt through `from_parts`.
#[cfg(debug_assertions)]
fn debug_check_arity<V, const D: usize>(node: &Node<V, D>, is_root: bool, config: &Config) {
    let count = node.count();
    debug_assert!(count >= 1, "node must hold at least one member");
    debug_assert!(
        count <= config.max_children(),
        "node holds {} members, max_children is {}",
        count,
        config.max_children()
    );
    debug_assert!(
        is_root || count >= config.min_children(),
        "non-root node holds {} members, min_children is {}",
        count,
        config.min_children()
    );
    if let Some(children) = node.children() {
        for child in children {
            debug_check_arity(child, false, config);
        }
    }
}

/// Collapses single-child non-leaf roots, shrinking the height.
fn collapse_root<V, const D: usize>(mut root: Arc<Node<V, D>>) -> Arc<Node<V, D>> {
    loop {
        let only_child = match root.children() {
            Some(children) if children.len() == 1 => children[0].clone(),
            _ => return root,
        };
        log::debug!("root collapsed, tree height shrinks to {}", only_child.depth());
        root = only_child;
    }
}

// ============================================================================
// Search
// ============================================================================

enum Pending<'a, V, const D: usize> {
    Node(&'a Node<V, D>),
    Entry(&'a Entry<V, D>),
}

/// Lazy depth-first range query iterator; see [`RTree::search`].
///
/// Re-running the same query on the same tree value yields the same
/// sequence.
pub struct Search<'a, V, const D: usize> {
    query: Rect<D>,
    stack: Vec<Pending<'a, V, D>>,
}

impl<'a, V, const D: usize> Iterator for Search<'a, V, D> {
    type Item = &'a Entry<V, D>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(pending) = self.stack.pop() {
            match pending {
                Pending::Entry(entry) => return Some(entry),
                Pending::Node(node) => match node {
                    Node::Leaf { entries, .. } => {
                        for entry in entries.iter().rev() {
                            if entry.geometry().intersects(&self.query) {
                                self.stack.push(Pending::Entry(entry));
                            }
                        }
                    }
                    Node::NonLeaf { children, .. } => {
                        for child in children.iter().rev() {
                            if child.mbr().intersects(&self.query) {
                                self.stack.push(Pending::Node(child.as_ref()));
                            }
                        }
                    }
                },
            }
        }
        None
    }
}

// ============================================================================
// Nearest-neighbor search
// ============================================================================

struct Candidate<'a, V, const D: usize> {
    distance: f64,
    item: Pending<'a, V, D>,
}

impl<V, const D: usize> PartialEq for Candidate<'_, V, D> {
    fn eq(&self, other: &Self) -> bool {
        self.distance.total_cmp(&other.distance) == std::cmp::Ordering::Equal
    }
}

impl<V, const D: usize> Eq for Candidate<'_, V, D> {}

impl<V, const D: usize> PartialOrd for Candidate<'_, V, D> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<V, const D: usize> Ord for Candidate<'_, V, D> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed so the BinaryHeap pops the smallest distance first.
        other.distance.total_cmp(&self.distance)
    }
}

/// Lazy best-first nearest-neighbor iterator; see [`RTree::nearest`].
pub struct Nearest<'a, V, const D: usize> {
    query: Rect<D>,
    queue: BinaryHeap<Candidate<'a, V, D>>,
    remaining: usize,
}

impl<'a, V, const D: usize> Iterator for Nearest<'a, V, D> {
    type Item = &'a Entry<V, D>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while let Some(candidate) = self.queue.pop() {
            match candidate.item {
                Pending::Entry(entry) => {
                    self.remaining -= 1;
                    return Some(entry);
                }
                Pending::Node(node) => match node {
                    Node::Leaf { entries, .. } => {
                        for entry in entries {
                            self.queue.push(Candidate {
                                distance: entry.geometry().distance(&self.query),
                                item: Pending::Entry(entry),
                            });
                        }
                    }
                    Node::NonLeaf { children, .. } => {
                        for child in children {
                            self.queue.push(Candidate {
                                distance: child.mbr().distance(&self.query),
                                item: Pending::Node(child.as_ref()),
                            });
                        }
                    }
                },
            }
        }
        None
    }
}

// ============================================================================
// STR bulk loading
// ============================================================================

/// Splits `count` items into chunks of at most `capacity` with sizes as
/// even as possible; with two or more chunks every chunk holds at least
/// `capacity / 2` items, so `min_children` is always satisfied.
fn even_chunk_sizes(count: usize, capacity: usize) -> Vec<usize> {
    let chunks = count.div_ceil(capacity);
    let base = count / chunks;
    let extra = count % chunks;
    (0..chunks)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Sort-tile-recursive partitioning: sorts by center on the current axis,
/// slices into slabs and recurses on the next axis, emitting evenly-sized
/// chunks at the last axis.
fn str_chunks<T: Bounded<D>, const D: usize>(items: Vec<T>, capacity: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::new();
    str_recurse(items, 0, capacity, &mut chunks);
    chunks
}

fn str_recurse<T: Bounded<D>, const D: usize>(
    mut items: Vec<T>,
    axis: usize,
    capacity: usize,
    out: &mut Vec<Vec<T>>,
) {
    items.sort_by(|a, b| center(a, axis).total_cmp(&center(b, axis)));

    if axis + 1 == D || items.len() <= capacity {
        let sizes = even_chunk_sizes(items.len(), capacity);
        let mut items = items.into_iter();
        for size in sizes {
            out.push(items.by_ref().take(size).collect());
        }
        return;
    }

    // Slab count along this axis so the leaf tiling stays roughly square.
    let leaves = items.len().div_ceil(capacity);
    let axes_left = (D - axis) as f64;
    let slabs = (leaves as f64).powf(1.0 / axes_left).ceil() as usize;
    let slab_sizes = even_chunk_sizes(items.len(), items.len().div_ceil(slabs.max(1)));
    let mut items = items.into_iter();
    for size in slab_sizes {
        let slab: Vec<T> = items.by_ref().take(size).collect();
        str_recurse(slab, axis + 1, capacity, out);
    }
}

fn center<T: Bounded<D>, const D: usize>(item: &T, axis: usize) -> f64 {
    let bounds = item.bounds();
    (bounds.min()[axis] + bounds.max()[axis]) / 2.0
}
