//! Union-find over record identifiers.

use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint-set forest keyed by identifier rather than position.
///
/// Union by rank with path compression. Components are reported in the order
/// their first member was inserted, and members in insertion order, so output
/// does not depend on which side of a union became the root.
#[derive(Debug, Clone)]
pub struct DisjointSet<K> {
    keys: Vec<K>,
    slot: HashMap<K, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl<K: Eq + Hash + Clone> Default for DisjointSet<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            slot: HashMap::new(),
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> DisjointSet<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` as a singleton. Returns false if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.slot.contains_key(&key) {
            return false;
        }
        let idx = self.keys.len();
        self.slot.insert(key.clone(), idx);
        self.keys.push(key);
        self.parent.push(idx);
        self.rank.push(0);
        true
    }

    fn root(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    /// Merge the components of `a` and `b`, inserting either if unknown.
    /// Returns true when two distinct components were joined.
    pub fn union(&mut self, a: &K, b: &K) -> bool {
        self.insert(a.clone());
        self.insert(b.clone());
        let (Some(&ia), Some(&ib)) = (self.slot.get(a), self.slot.get(b)) else {
            return false;
        };
        let mut ra = self.root(ia);
        let mut rb = self.root(ib);
        if ra == rb {
            return false;
        }
        if self.rank[ra] < self.rank[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        if self.rank[ra] == self.rank[rb] {
            self.rank[ra] = self.rank[ra].saturating_add(1);
        }
        true
    }

    /// True when both keys are present and in the same component.
    pub fn connected(&mut self, a: &K, b: &K) -> bool {
        match (self.slot.get(a).copied(), self.slot.get(b).copied()) {
            (Some(ia), Some(ib)) => self.root(ia) == self.root(ib),
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All components, singletons included.
    pub fn components(&mut self) -> Vec<Vec<K>> {
        let mut by_root: HashMap<usize, usize> = HashMap::new();
        let mut out: Vec<Vec<K>> = Vec::new();
        for idx in 0..self.keys.len() {
            let root = self.root(idx);
            let group = *by_root.entry(root).or_insert_with(|| {
                out.push(Vec::new());
                out.len() - 1
            });
            out[group].push(self.keys[idx].clone());
        }
        out
    }
}
