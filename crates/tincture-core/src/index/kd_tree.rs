//! Exact k-d tree.
//!
//! Nodes split at the median of the axis with the widest spread. Buckets of
//! at most [`LEAF_SIZE`] samples are scanned linearly. A far subtree is only
//! skipped when its splitting plane is strictly farther than the current k-th
//! best distance, so equal-distance samples with a lower insertion index are
//! never missed and results match [`BruteForce`](super::BruteForce) exactly.

use super::{Candidate, CandidateHeap, IndexStrategy, NeighborIndex, distance_sq};
use crate::features::ReferenceSet;

/// Maximum number of samples in a leaf bucket.
pub const LEAF_SIZE: usize = 16;

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        axis: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug)]
pub struct KdTree {
    reference: ReferenceSet,
    /// Sample indices permuted so every node owns a contiguous range.
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl KdTree {
    pub fn new(reference: ReferenceSet) -> Self {
        let mut tree = Self {
            order: (0..reference.len()).collect(),
            nodes: Vec::new(),
            reference,
        };
        if !tree.order.is_empty() {
            let len = tree.order.len();
            tree.build_node(0, len);
        }
        tree
    }

    /// Number of nodes, leaves included.
    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { start, end });
        if end - start <= LEAF_SIZE {
            return id;
        }

        let Some(axis) = self.widest_axis(start, end) else {
            // Every sample in range is identical.
            return id;
        };

        let mid = start + (end - start) / 2;
        let reference = &self.reference;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            reference.vector(a)[axis]
                .total_cmp(&reference.vector(b)[axis])
                .then(a.cmp(&b))
        });
        let value = self.reference.vector(self.order[mid])[axis];

        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes[id] = Node::Split {
            axis,
            value,
            left,
            right,
        };
        id
    }

    /// Axis with the largest value range, or `None` if every range is zero.
    fn widest_axis(&self, start: usize, end: usize) -> Option<usize> {
        let dimension = self.reference.dimension();
        let mut lo = vec![f32::INFINITY; dimension];
        let mut hi = vec![f32::NEG_INFINITY; dimension];
        for &i in &self.order[start..end] {
            for (axis, &v) in self.reference.vector(i).iter().enumerate() {
                lo[axis] = lo[axis].min(v);
                hi[axis] = hi[axis].max(v);
            }
        }

        let (axis, spread) = lo
            .iter()
            .zip(&hi)
            .map(|(l, h)| h - l)
            .enumerate()
            .fold((0, 0.0_f32), |acc, (axis, spread)| {
                if spread > acc.1 { (axis, spread) } else { acc }
            });
        (spread > 0.0).then_some(axis)
    }

    fn search_node(&self, id: usize, query: &[f32], best: &mut CandidateHeap) {
        match self.nodes[id] {
            Node::Leaf { start, end } => {
                for &index in &self.order[start..end] {
                    best.push(Candidate {
                        dist_sq: distance_sq(query, self.reference.vector(index)),
                        index,
                    });
                }
            }
            Node::Split {
                axis,
                value,
                left,
                right,
            } => {
                let diff = query[axis] as f64 - value as f64;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.search_node(near, query, best);
                if diff * diff <= best.worst_dist_sq() {
                    self.search_node(far, query, best);
                }
            }
        }
    }
}

impl NeighborIndex for KdTree {
    fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    fn strategy(&self) -> IndexStrategy {
        IndexStrategy::KdTree
    }

    fn search(&self, query: &[f32], best: &mut CandidateHeap) {
        if !self.nodes.is_empty() {
            self.search_node(0, query, best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSet;
    use crate::index::BruteForce;
    use glam::Vec2;

    /// Deterministic pseudo-random points on a coarse grid so ties are common.
    fn scattered(n: usize, dimension: usize, seed: u64) -> FeatureSet {
        let mut state = seed;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % 21) as f32 - 10.0
        };
        let values: Vec<f32> = (0..n * dimension).map(|_| next()).collect();
        let labels = (0..n).map(|i| Vec2::new(i as f32, 0.0)).collect();
        FeatureSet::from_parts(dimension, values, labels).unwrap()
    }

    #[test]
    fn test_matches_brute_force_exactly() {
        for (dimension, seed) in [(2, 1), (3, 7), (9, 42)] {
            let set = scattered(600, dimension, seed);
            let tree = KdTree::new(set.clone());
            let brute = BruteForce::new(set);
            let queries = scattered(40, dimension, seed + 100);
            for q in queries.vectors() {
                for k in [1, 5, 17] {
                    let a = tree.query(q, k).unwrap();
                    let b = brute.query(q, k).unwrap();
                    assert_eq!(a, b, "dimension {dimension}, k {k}");
                }
            }
        }
    }

    #[test]
    fn test_identical_points_stay_in_one_leaf() {
        let set = FeatureSet::from_parts(2, vec![1.0; 200], vec![Vec2::ZERO; 100]).unwrap();
        let tree = KdTree::new(set);
        assert_eq!(tree.node_count(), 1);
        let result = tree.query(&[1.0, 1.0], 3).unwrap();
        let indices: Vec<usize> = result.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(result.iter().all(|n| n.distance == 0.0));
    }

    #[test]
    fn test_k_equal_to_len_returns_everything() {
        let set = scattered(40, 2, 3);
        let tree = KdTree::new(set);
        let result = tree.query(&[0.0, 0.0], 40).unwrap();
        assert_eq!(result.len(), 40);
        assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}
