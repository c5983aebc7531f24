//! Symmetric reorderings of sparse matrices.
//!
//! Pattern analysis for a sparse Cholesky factorization permutes the matrix to `P A P^T`
//! before factorizing it. A good ordering keeps the non-zeros of the factor close to the
//! diagonal and thereby reduces fill-in. This module provides the permutation type and the
//! (reverse) Cuthill-McKee bandwidth-reducing orderings.
use core::fmt;
use std::collections::VecDeque;
use std::error::Error;

use nalgebra_sparse::pattern::SparsityPattern;

/// A permutation of `n` indices.
///
/// The permutation maps a *target index* `i` to the *source index* `perm[i]`, so that
/// applying it to a sequence gives
///
/// ```text
/// target[i] = source[perm[i]]
/// ```
///
/// The inverse mapping is stored alongside so that both directions are `O(1)` lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    perm: Vec<usize>,
    inverse: Vec<usize>,
}

/// The index array passed to [`Permutation::from_vec`] is not a permutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidPermutation {
    index: usize,
}

impl fmt::Display for InvalidPermutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid permutation: index {} is out of bounds or appears more than once",
            self.index
        )
    }
}

impl Error for InvalidPermutation {}

impl Permutation {
    pub fn from_vec(perm: Vec<usize>) -> Result<Self, InvalidPermutation> {
        let n = perm.len();
        let mut inverse = vec![usize::MAX; n];
        for (target, &source) in perm.iter().enumerate() {
            if source >= n || inverse[source] != usize::MAX {
                return Err(InvalidPermutation { index: source });
            }
            inverse[source] = target;
        }
        Ok(Self { perm, inverse })
    }

    pub fn identity(n: usize) -> Self {
        let perm: Vec<_> = (0..n).collect();
        Self {
            inverse: perm.clone(),
            perm,
        }
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn source_index(&self, target_index: usize) -> usize {
        self.perm[target_index]
    }

    pub fn target_index(&self, source_index: usize) -> usize {
        self.inverse[source_index]
    }

    pub fn reverse(&mut self) {
        self.perm.reverse();
        let n = self.perm.len();
        for target in &mut self.inverse {
            *target = n - 1 - *target;
        }
    }

    pub fn inverse(&self) -> Permutation {
        Self {
            perm: self.inverse.clone(),
            inverse: self.perm.clone(),
        }
    }

    /// Returns `target` with `target[i] = source[perm[i]]`.
    ///
    /// # Panics
    ///
    /// Panics if the slice length differs from the permutation length.
    pub fn apply_to_slice<T: Clone>(&self, source: &[T]) -> Vec<T> {
        assert_eq!(
            source.len(),
            self.len(),
            "Slice and permutation must have the same size."
        );
        self.perm.iter().map(|&i| source[i].clone()).collect()
    }

    /// Inverse of [`apply_to_slice`](Self::apply_to_slice): writes `source[perm[i]] = target[i]`.
    ///
    /// # Panics
    ///
    /// Panics if the slice length differs from the permutation length.
    pub fn apply_inverse_to_slice<T: Clone>(&self, target: &[T]) -> Vec<T> {
        assert_eq!(
            target.len(),
            self.len(),
            "Slice and permutation must have the same size."
        );
        self.inverse.iter().map(|&i| target[i].clone()).collect()
    }
}

/// Computes a Cuthill-McKee ordering of the graph of a structurally symmetric square pattern.
///
/// The ordering is a breadth-first traversal that visits neighbors in order of increasing
/// degree. Each connected component is started from an unvisited vertex of minimum degree,
/// so patterns with several components (including empty rows) are handled.
///
/// # Panics
///
/// Panics if the pattern is not square.
pub fn cuthill_mckee(pattern: &SparsityPattern) -> Permutation {
    assert_eq!(
        pattern.major_dim(),
        pattern.minor_dim(),
        "Matrix must be square."
    );
    let n = pattern.major_dim();
    let degree = |vertex: usize| pattern.lane(vertex).len();

    let mut start_candidates: Vec<usize> = (0..n).collect();
    start_candidates.sort_by_key(|&vertex| degree(vertex));

    let mut visited = vec![false; n];
    let mut ordering = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    let mut neighbors = Vec::new();

    for &start in &start_candidates {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        while let Some(vertex) = queue.pop_front() {
            ordering.push(vertex);
            neighbors.clear();
            neighbors.extend(
                pattern
                    .lane(vertex)
                    .iter()
                    .copied()
                    .filter(|&neighbor| !visited[neighbor]),
            );
            neighbors.sort_by_key(|&neighbor| degree(neighbor));
            for &neighbor in &neighbors {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    Permutation::from_vec(ordering)
        .expect("Internal error: Cuthill-McKee must visit every vertex exactly once")
}

/// Computes a Reverse Cuthill-McKee (RCM) ordering, which typically produces less fill-in
/// in a Cholesky factor than the plain Cuthill-McKee ordering.
pub fn reverse_cuthill_mckee(pattern: &SparsityPattern) -> Permutation {
    let mut permutation = cuthill_mckee(pattern);
    permutation.reverse();
    permutation
}

/// The pattern of the symmetrically permuted matrix `B = P A P^T`, with
/// `B[i, j] = A[perm[i], perm[j]]`.
///
/// Also returns, for every non-zero of `B` in storage order, the index of the corresponding
/// non-zero in the storage of `A`. Gathering `A`'s values through this map yields `B`'s
/// values, which lets a factorization reuse the permuted pattern across value updates.
///
/// # Panics
///
/// Panics if the pattern is not square or its dimension differs from the permutation's.
pub fn permute_symmetric(pattern: &SparsityPattern, permutation: &Permutation) -> (SparsityPattern, Vec<usize>) {
    let n = pattern.major_dim();
    assert_eq!(n, pattern.minor_dim(), "Matrix must be square.");
    assert_eq!(n, permutation.len(), "Permutation must match matrix dimensions.");

    let mut offsets = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(pattern.nnz());
    let mut value_map = Vec::with_capacity(pattern.nnz());
    let mut lane_entries = Vec::new();

    offsets.push(0);
    for target_lane in 0..n {
        let source_lane = permutation.source_index(target_lane);
        let source_offset = pattern.major_offsets()[source_lane];
        lane_entries.clear();
        lane_entries.extend(
            pattern
                .lane(source_lane)
                .iter()
                .enumerate()
                .map(|(k, &source_minor)| (permutation.target_index(source_minor), source_offset + k)),
        );
        lane_entries.sort_unstable();
        for &(target_minor, source_entry) in &lane_entries {
            indices.push(target_minor);
            value_map.push(source_entry);
        }
        offsets.push(indices.len());
    }

    let permuted = SparsityPattern::try_from_offsets_and_indices(n, n, offsets, indices)
        .expect("Internal error: permuted pattern of a valid pattern must be valid");
    (permuted, value_map)
}
