//! Exact K-nearest-neighbor search over a [`ReferenceSet`].
//!
//! Every backend returns the same answer for the same input: the `k`
//! reference samples with the smallest Euclidean distance, ordered by
//! `(distance, insertion index)`.

pub mod brute_force;
pub mod kd_tree;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::features::ReferenceSet;

pub use brute_force::BruteForce;
pub use kd_tree::KdTree;

/// Highest feature dimension for which [`IndexStrategy::Auto`] picks the k-d tree.
pub const KD_TREE_MAX_DIMENSION: usize = 16;

/// Which search structure to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStrategy {
    /// k-d tree up to [`KD_TREE_MAX_DIMENSION`], brute force above.
    #[default]
    Auto,
    KdTree,
    BruteForce,
}

impl IndexStrategy {
    /// Resolve `Auto` for a given feature dimension.
    pub fn resolve(self, dimension: usize) -> Self {
        match self {
            Self::Auto if dimension <= KD_TREE_MAX_DIMENSION => Self::KdTree,
            Self::Auto => Self::BruteForce,
            other => other,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::KdTree => "kd-tree",
            Self::BruteForce => "brute-force",
        }
    }
}

impl fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of a query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Euclidean distance to the query.
    pub distance: f64,
    /// Insertion index in the reference set.
    pub index: usize,
    /// Chroma label of the reference sample.
    pub label: Vec2,
}

/// A built, immutable nearest-neighbor index.
///
/// Queries take `&self` and may run concurrently from many threads.
pub trait NeighborIndex: Send + Sync {
    /// The reference set this index was built over.
    fn reference(&self) -> &ReferenceSet;

    /// The backend this index uses.
    fn strategy(&self) -> IndexStrategy;

    /// Collect the `k` best candidates for `query` into `best`.
    ///
    /// Callers guarantee `1 <= k <= len` and a matching dimension.
    fn search(&self, query: &[f32], best: &mut CandidateHeap);

    /// Return the `k` nearest reference samples, sorted ascending by distance
    /// with ties broken by ascending insertion index.
    fn query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, TransferError> {
        let reference = self.reference();
        check_k(k, reference.len())?;
        if query.len() != reference.dimension() {
            return Err(TransferError::DimensionMismatch {
                expected: reference.dimension(),
                actual: query.len(),
            });
        }

        let mut best = CandidateHeap::new(k);
        self.search(query, &mut best);
        Ok(best
            .into_sorted()
            .into_iter()
            .map(|c| Neighbor {
                distance: c.dist_sq.sqrt(),
                index: c.index,
                label: reference.label(c.index),
            })
            .collect())
    }
}

/// Build an index over `reference` with the requested strategy.
pub fn build(reference: ReferenceSet, strategy: IndexStrategy) -> Box<dyn NeighborIndex> {
    let resolved = strategy.resolve(reference.dimension());
    tracing::debug!(
        requested = %strategy,
        resolved = %resolved,
        samples = reference.len(),
        dimension = reference.dimension(),
        "building neighbor index"
    );
    match resolved {
        IndexStrategy::BruteForce => Box::new(BruteForce::new(reference)),
        _ => Box::new(KdTree::new(reference)),
    }
}

/// Check `1 <= k <= len`.
pub fn check_k(k: usize, len: usize) -> Result<(), TransferError> {
    if k == 0 || k > len {
        return Err(TransferError::InvalidK { k, len });
    }
    Ok(())
}

/// Squared Euclidean distance, accumulated in f64 in coordinate order.
#[inline]
pub fn distance_sq(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// A scored reference sample. Ordered by `(dist_sq, index)`.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub dist_sq: f64,
    pub index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

/// Bounded max-heap keeping the `k` smallest candidates seen so far.
#[derive(Debug)]
pub struct CandidateHeap {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl CandidateHeap {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// The current k-th best squared distance, or infinity while not full.
    pub fn worst_dist_sq(&self) -> f64 {
        if self.is_full() {
            self.heap.peek().map_or(f64::INFINITY, |c| c.dist_sq)
        } else {
            f64::INFINITY
        }
    }

    /// Offer a candidate; it is kept only if it beats the current worst.
    pub fn push(&mut self, candidate: Candidate) {
        if !self.is_full() {
            self.heap.push(candidate);
            return;
        }
        if self.heap.peek().is_some_and(|worst| candidate < *worst) {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    /// Drain into ascending `(dist_sq, index)` order.
    pub fn into_sorted(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSet;

    fn line_set(xs: &[f32]) -> ReferenceSet {
        let vectors: Vec<Vec<f32>> = xs.iter().map(|&x| vec![x, 0.0]).collect();
        let labels = xs.iter().map(|&x| Vec2::new(x, -x)).collect();
        FeatureSet::from_vectors(&vectors, labels).unwrap()
    }

    #[test]
    fn test_auto_resolves_by_dimension() {
        assert_eq!(IndexStrategy::Auto.resolve(2), IndexStrategy::KdTree);
        assert_eq!(IndexStrategy::Auto.resolve(9), IndexStrategy::KdTree);
        assert_eq!(IndexStrategy::Auto.resolve(25), IndexStrategy::BruteForce);
        assert_eq!(IndexStrategy::BruteForce.resolve(2), IndexStrategy::BruteForce);
    }

    #[test]
    fn test_candidate_heap_keeps_k_smallest_with_index_ties() {
        let mut heap = CandidateHeap::new(2);
        for (dist_sq, index) in [(4.0, 0), (1.0, 1), (1.0, 2), (0.5, 3), (1.0, 0)] {
            heap.push(Candidate { dist_sq, index });
        }
        let kept: Vec<(f64, usize)> = heap
            .into_sorted()
            .iter()
            .map(|c| (c.dist_sq, c.index))
            .collect();
        assert_eq!(kept, vec![(0.5, 3), (1.0, 0)]);
    }

    #[test]
    fn test_query_rejects_bad_k_and_dimension() {
        for strategy in [IndexStrategy::KdTree, IndexStrategy::BruteForce] {
            let index = build(line_set(&[0.0, 1.0, 2.0]), strategy);
            assert!(matches!(
                index.query(&[0.0, 0.0], 0),
                Err(TransferError::InvalidK { k: 0, len: 3 })
            ));
            assert!(matches!(
                index.query(&[0.0, 0.0], 4),
                Err(TransferError::InvalidK { k: 4, len: 3 })
            ));
            assert!(matches!(
                index.query(&[0.0], 1),
                Err(TransferError::DimensionMismatch {
                    expected: 2,
                    actual: 1
                })
            ));
        }
    }

    #[test]
    fn test_query_returns_k_sorted_with_labels() {
        for strategy in [IndexStrategy::KdTree, IndexStrategy::BruteForce] {
            let index = build(line_set(&[5.0, -1.0, 3.0, 0.5, 10.0]), strategy);
            assert_eq!(index.strategy(), strategy);
            let result = index.query(&[0.0, 0.0], 3).unwrap();
            let indices: Vec<usize> = result.iter().map(|n| n.index).collect();
            assert_eq!(indices, vec![3, 1, 2]);
            assert_eq!(result[0].distance, 0.5);
            assert_eq!(result[1].label, Vec2::new(-1.0, 1.0));
        }
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        for strategy in [IndexStrategy::KdTree, IndexStrategy::BruteForce] {
            let index = build(line_set(&[1.0, -1.0, 1.0, -1.0]), strategy);
            let result = index.query(&[0.0, 0.0], 3).unwrap();
            let indices: Vec<usize> = result.iter().map(|n| n.index).collect();
            assert_eq!(indices, vec![0, 1, 2]);
        }
    }
}
