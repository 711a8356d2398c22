//! A runtime-dimension R*-tree over projected points.
//!
//! The engine builds each tree exactly once from the full batch of projected
//! entries, so construction uses Sort-Tile-Recursive packing and the tree is
//! read-only afterwards. Window queries return every stored entry inside a
//! closed axis-aligned box.
use crate::constants::NODE_CAPACITY;
use serde::Serialize;

/// A stored entry: a projected point and the id of the original vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Vec<f64>,
    pub id: u32,
}

#[derive(Debug, Clone)]
struct Rect {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl Rect {
    fn empty(dim: usize) -> Self {
        Rect {
            mins: vec![f64::INFINITY; dim],
            maxs: vec![f64::NEG_INFINITY; dim],
        }
    }

    fn expand_point(&mut self, p: &[f64]) {
        for (k, &x) in p.iter().enumerate() {
            if x < self.mins[k] {
                self.mins[k] = x;
            }
            if x > self.maxs[k] {
                self.maxs[k] = x;
            }
        }
    }

    fn expand_rect(&mut self, other: &Rect) {
        for k in 0..self.mins.len() {
            if other.mins[k] < self.mins[k] {
                self.mins[k] = other.mins[k];
            }
            if other.maxs[k] > self.maxs[k] {
                self.maxs[k] = other.maxs[k];
            }
        }
    }

    fn intersects(&self, mins: &[f64], maxs: &[f64]) -> bool {
        self.mins.iter().zip(maxs).all(|(lo, hi)| lo <= hi)
            && self.maxs.iter().zip(mins).all(|(hi, lo)| hi >= lo)
    }

    fn center(&self, axis: usize) -> f64 {
        0.5 * (self.mins[axis] + self.maxs[axis])
    }
}

fn contains(mins: &[f64], maxs: &[f64], p: &[f64]) -> bool {
    p.iter()
        .zip(mins.iter().zip(maxs))
        .all(|(x, (lo, hi))| lo <= x && x <= hi)
}

#[derive(Debug)]
enum Node {
    Leaf(Vec<Entry>),
    Internal(Vec<Child>),
}

#[derive(Debug)]
struct Child {
    rect: Rect,
    node: Node,
}

/// Per-tree statistics.
#[derive(Debug, Clone, Serialize)]
pub struct TreeStats {
    pub n_entries: usize,
    pub height: usize,
    pub n_nodes: usize,
    pub n_leaves: usize,
}

/// Static spatial index over `(projected point, id)` pairs.
///
/// Nodes hold at most [`NODE_CAPACITY`] entries. The dimension is a runtime
/// field so one tree type serves any projected dimension `K`.
#[derive(Debug)]
pub struct RTree {
    dim: usize,
    len: usize,
    root: Node,
}

impl RTree {
    /// An empty tree of the given dimension.
    pub fn new(dim: usize) -> Self {
        RTree {
            dim,
            len: 0,
            root: Node::Leaf(Vec::new()),
        }
    }

    /// Build a tree from a batch of entries with Sort-Tile-Recursive packing.
    ///
    /// An empty batch yields an empty tree.
    pub fn bulk_load(dim: usize, entries: Vec<Entry>) -> Self {
        let len = entries.len();
        if len == 0 {
            return RTree::new(dim);
        }
        let mut groups = Vec::new();
        str_partition(entries, dim, 0, &mut groups);
        let mut level: Vec<Child> = groups
            .into_iter()
            .map(|group| {
                let mut rect = Rect::empty(dim);
                for e in &group {
                    rect.expand_point(&e.key);
                }
                Child {
                    rect,
                    node: Node::Leaf(group),
                }
            })
            .collect();
        while level.len() > 1 {
            let mut groups = Vec::new();
            str_partition(level, dim, 0, &mut groups);
            level = groups
                .into_iter()
                .map(|group| {
                    let mut rect = Rect::empty(dim);
                    for c in &group {
                        rect.expand_rect(&c.rect);
                    }
                    Child {
                        rect,
                        node: Node::Internal(group),
                    }
                })
                .collect();
        }
        let root = match level.pop() {
            Some(child) => child.node,
            None => Node::Leaf(Vec::new()),
        };
        RTree { dim, len, root }
    }

    /// All entries whose point lies inside the closed box `[mins, maxs]`.
    ///
    /// Results come back in deterministic tree-traversal order; no other
    /// ordering is guaranteed.
    pub fn window_query(&self, mins: &[f64], maxs: &[f64]) -> Vec<&Entry> {
        debug_assert_eq!(mins.len(), self.dim);
        debug_assert_eq!(maxs.len(), self.dim);
        let mut out = Vec::new();
        collect_window(&self.root, mins, maxs, &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Drop all entries, keeping the dimension.
    pub fn clear(&mut self) {
        self.root = Node::Leaf(Vec::new());
        self.len = 0;
    }

    /// Number of levels; 1 for a tree that is a single leaf.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Node::Internal(children) = node {
            height += 1;
            node = &children[0].node;
        }
        height
    }

    pub fn stats(&self) -> TreeStats {
        let mut n_nodes = 0;
        let mut n_leaves = 0;
        count_nodes(&self.root, &mut n_nodes, &mut n_leaves);
        TreeStats {
            n_entries: self.len,
            height: self.height(),
            n_nodes,
            n_leaves,
        }
    }
}

fn collect_window<'a>(node: &'a Node, mins: &[f64], maxs: &[f64], out: &mut Vec<&'a Entry>) {
    match node {
        Node::Leaf(entries) => {
            for e in entries {
                if contains(mins, maxs, &e.key) {
                    out.push(e);
                }
            }
        }
        Node::Internal(children) => {
            for c in children {
                if c.rect.intersects(mins, maxs) {
                    collect_window(&c.node, mins, maxs, out);
                }
            }
        }
    }
}

fn count_nodes(node: &Node, n_nodes: &mut usize, n_leaves: &mut usize) {
    *n_nodes += 1;
    match node {
        Node::Leaf(_) => *n_leaves += 1,
        Node::Internal(children) => {
            for c in children {
                count_nodes(&c.node, n_nodes, n_leaves);
            }
        }
    }
}

/// Sort key used by the packing pass: entries sort by coordinate, upper-level
/// children by bounding-box center.
trait StrKey {
    fn coord(&self, axis: usize) -> f64;
}

impl StrKey for Entry {
    fn coord(&self, axis: usize) -> f64 {
        self.key[axis]
    }
}

impl StrKey for Child {
    fn coord(&self, axis: usize) -> f64 {
        self.rect.center(axis)
    }
}

/// Sort-Tile-Recursive: slice along successive axes until every group fits
/// in one node.
fn str_partition<T: StrKey>(mut items: Vec<T>, dims: usize, axis: usize, out: &mut Vec<Vec<T>>) {
    if items.len() <= NODE_CAPACITY {
        out.push(items);
        return;
    }
    items.sort_by(|a, b| a.coord(axis).total_cmp(&b.coord(axis)));
    let remaining = dims - axis;
    if remaining <= 1 {
        while items.len() > NODE_CAPACITY {
            let rest = items.split_off(NODE_CAPACITY);
            out.push(std::mem::replace(&mut items, rest));
        }
        out.push(items);
    } else {
        let n_groups = (items.len() + NODE_CAPACITY - 1) / NODE_CAPACITY;
        let n_slabs = (n_groups as f64).powf(1.0 / remaining as f64).ceil() as usize;
        let slab = (items.len() + n_slabs - 1) / n_slabs;
        while !items.is_empty() {
            let take = slab.min(items.len());
            let rest = items.split_off(take);
            str_partition(std::mem::replace(&mut items, rest), dims, axis + 1, out);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_entries(n: usize, dim: usize, seed: u64) -> Vec<Entry> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n)
            .map(|id| Entry {
                key: (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect(),
                id: id as u32,
            })
            .collect()
    }

    fn brute_force(entries: &[Entry], mins: &[f64], maxs: &[f64]) -> Vec<u32> {
        let mut ids: Vec<u32> = entries
            .iter()
            .filter(|e| contains(mins, maxs, &e.key))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_empty_tree() {
        let tree = RTree::bulk_load(3, Vec::new());
        assert!(tree.is_empty());
        assert_eq!(tree.window_query(&[-1.; 3], &[1.; 3]).len(), 0);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn test_window_matches_brute_force() {
        let entries = random_entries(500, 3, 7);
        let tree = RTree::bulk_load(3, entries.clone());
        assert_eq!(tree.len(), 500);

        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..50 {
            let center: Vec<f64> = (0..3).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let half: f64 = rng.gen_range(0.5..6.0);
            let mins: Vec<f64> = center.iter().map(|c| c - half).collect();
            let maxs: Vec<f64> = center.iter().map(|c| c + half).collect();

            let mut got: Vec<u32> = tree.window_query(&mins, &maxs).iter().map(|e| e.id).collect();
            got.sort_unstable();
            assert_eq!(got, brute_force(&entries, &mins, &maxs));
        }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let entries = vec![
            Entry { key: vec![0.0, 0.0], id: 0 },
            Entry { key: vec![1.0, 1.0], id: 1 },
            Entry { key: vec![2.0, 2.0], id: 2 },
        ];
        let tree = RTree::bulk_load(2, entries);
        let ids: Vec<u32> = tree
            .window_query(&[0.0, 0.0], &[1.0, 1.0])
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&0) && ids.contains(&1));
    }

    #[test]
    fn test_duplicate_keys_kept_apart() {
        let entries = vec![
            Entry { key: vec![1.0, 1.0], id: 0 },
            Entry { key: vec![1.0, 1.0], id: 1 },
        ];
        let tree = RTree::bulk_load(2, entries);
        let mut ids: Vec<u32> = tree
            .window_query(&[0.0, 0.0], &[2.0, 2.0])
            .iter()
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    fn check_capacity(node: &Node) {
        match node {
            Node::Leaf(entries) => assert!(entries.len() <= NODE_CAPACITY),
            Node::Internal(children) => {
                assert!(!children.is_empty() && children.len() <= NODE_CAPACITY);
                for c in children {
                    check_capacity(&c.node);
                }
            }
        }
    }

    #[test]
    fn test_packing_invariants() {
        let entries = random_entries(2000, 4, 3);
        let tree = RTree::bulk_load(4, entries);
        check_capacity(&tree.root);
        assert!(tree.height() > 1);

        let stats = tree.stats();
        assert_eq!(stats.n_entries, 2000);
        assert!(stats.n_leaves >= 2000 / NODE_CAPACITY);
        assert!(stats.n_nodes > stats.n_leaves);

        // A window covering everything returns each id exactly once.
        let mut ids: Vec<u32> = tree
            .window_query(&[-11.0; 4], &[11.0; 4])
            .iter()
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..2000).collect::<Vec<u32>>());
    }

    #[test]
    fn test_clear() {
        let mut tree = RTree::bulk_load(2, random_entries(100, 2, 5));
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.window_query(&[-20.0; 2], &[20.0; 2]).len(), 0);
    }

    #[test]
    fn test_one_dimensional_tree() {
        let entries = random_entries(300, 1, 13);
        let tree = RTree::bulk_load(1, entries.clone());
        let mins = [-3.0];
        let maxs = [4.5];
        let mut got: Vec<u32> = tree.window_query(&mins, &maxs).iter().map(|e| e.id).collect();
        got.sort_unstable();
        assert_eq!(got, brute_force(&entries, &mins, &maxs));
    }
}
