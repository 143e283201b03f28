//! Exact cosine nearest-neighbor search over the term-weight rows.

use super::vectorizer::{SparseRow, TermWeightMatrix};
use rayon::prelude::*;

pub const DEFAULT_NEIGHBOR_CAP: usize = 50;

/// Brute-force index. Rows are L2-normalized, so cosine distance is
/// `1 - dot`.
#[derive(Clone, Debug)]
pub struct SimilarityIndex {
    matrix: TermWeightMatrix,
    neighbor_cap: usize,
}

/// A neighbor row and its cosine distance to the query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

impl Neighbor {
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

impl SimilarityIndex {
    pub fn build(matrix: TermWeightMatrix, neighbor_cap: usize) -> Self {
        Self {
            matrix,
            neighbor_cap: neighbor_cap.max(1),
        }
    }

    pub fn neighbor_cap(&self) -> usize {
        self.neighbor_cap
    }

    pub fn len(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.n_rows() == 0
    }

    pub fn matrix(&self) -> &TermWeightMatrix {
        &self.matrix
    }

    /// Up to `k` nearest rows to row `row`, the row itself left out so it
    /// never takes one of the `k` slots. `k` is bounded by the neighbor cap
    /// and the number of other rows.
    pub fn kneighbors(&self, row: usize, k: usize) -> Vec<Neighbor> {
        match self.matrix.row(row) {
            Some(query) => self.nearest(query, k, Some(row)),
            None => Vec::new(),
        }
    }

    /// Up to `k` nearest rows to an arbitrary query vector, such as a free
    /// text description weighted with the fitted model.
    pub fn kneighbors_of(&self, query: &SparseRow, k: usize) -> Vec<Neighbor> {
        self.nearest(query, k, None)
    }

    fn nearest(&self, query: &SparseRow, k: usize, exclude: Option<usize>) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = self
            .matrix
            .rows
            .par_iter()
            .enumerate()
            .filter(|(row, _)| Some(*row) != exclude)
            .map(|(row, candidate)| Neighbor {
                row,
                distance: (1.0 - query.dot(candidate)).clamp(0.0, 2.0),
            })
            .collect();

        let k = k.min(self.neighbor_cap).min(all.len());
        if k == 0 {
            return Vec::new();
        }

        let by_distance = |a: &Neighbor, b: &Neighbor| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.row.cmp(&b.row))
        };
        if k < all.len() {
            all.select_nth_unstable_by(k - 1, by_distance);
            all.truncate(k);
        }
        all.sort_unstable_by(by_distance);
        all
    }
}
