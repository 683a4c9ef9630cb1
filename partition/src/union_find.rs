//! Sequential reference partitioner.
//!
//! Produces the same labels as the lane kernel: every rectangle is labelled
//! with the smallest index of its component.

use crate::predicate::ComponentPredicate;
use crate::rect::Rect;

/// Union-find over `0..len` whose roots are always the smallest member.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, idx: u32) -> u32 {
        let mut root = idx;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        // Path compression
        let mut current = idx;
        while current != root {
            let parent = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = parent;
        }

        root
    }

    pub fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[larger as usize] = smaller;
        }
    }

    /// Root of every element.
    pub fn labels(&mut self) -> Vec<u32> {
        (0..self.parent.len() as u32).map(|i| self.find(i)).collect()
    }
}

/// Labels `rects` by testing every pair once on the calling thread.
pub fn partition_sequential<P>(rects: &[Rect], predicate: &P) -> Vec<u32>
where
    P: ComponentPredicate + ?Sized,
{
    let mut uf = UnionFind::new(rects.len());
    for (i, a) in rects.iter().enumerate() {
        for (j, b) in rects.iter().enumerate().skip(i + 1) {
            if predicate.same_component(a, b) {
                uf.union(i as u32, j as u32);
            }
        }
    }
    uf.labels()
}
