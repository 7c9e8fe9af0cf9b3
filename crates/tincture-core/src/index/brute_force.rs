//! Exhaustive linear scan. Exact in any dimension.

use super::{Candidate, CandidateHeap, IndexStrategy, NeighborIndex, distance_sq};
use crate::features::ReferenceSet;

#[derive(Debug)]
pub struct BruteForce {
    reference: ReferenceSet,
}

impl BruteForce {
    pub fn new(reference: ReferenceSet) -> Self {
        Self { reference }
    }
}

impl NeighborIndex for BruteForce {
    fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    fn strategy(&self) -> IndexStrategy {
        IndexStrategy::BruteForce
    }

    fn search(&self, query: &[f32], best: &mut CandidateHeap) {
        for (index, vector) in self.reference.vectors().enumerate() {
            best.push(Candidate {
                dist_sq: distance_sq(query, vector),
                index,
            });
        }
    }
}
