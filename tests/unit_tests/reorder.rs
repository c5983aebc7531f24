use caribou::reorder::{cuthill_mckee, permute_symmetric, reverse_cuthill_mckee, Permutation};
use nalgebra::DMatrix;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CscMatrix;
use proptest::prelude::*;

fn pattern_of(matrix: &DMatrix<i32>) -> SparsityPattern {
    CscMatrix::from(matrix).pattern().clone()
}

fn bandwidth(pattern: &SparsityPattern) -> usize {
    (0..pattern.major_dim())
        .flat_map(|j| pattern.lane(j).iter().map(move |&i| if i > j { i - j } else { j - i }))
        .max()
        .unwrap_or(0)
}

#[test]
fn cuthill_mckee_basic_examples() {
    // Basic example
    {
        let matrix = DMatrix::from_row_slice(4, 4, &[1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1]);
        let pattern = pattern_of(&matrix);
        let perm = cuthill_mckee(&pattern);

        assert_eq!(perm.perm(), &[1, 3, 0, 2]);

        let mut rcm_expected_perm = perm.clone();
        rcm_expected_perm.reverse();
        assert_eq!(&reverse_cuthill_mckee(&pattern), &rcm_expected_perm);
        assert_eq!(rcm_expected_perm.perm(), &[2, 0, 3, 1]);
    }

    // Diagonal pattern
    {
        let matrix = DMatrix::from_row_slice(4, 4, &[1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1]);
        let pattern = pattern_of(&matrix);
        let perm = cuthill_mckee(&pattern);
        assert_eq!(perm.perm(), &[0, 1, 2, 3]);
    }
}

#[test]
fn permutation_from_vec_rejects_invalid_input() {
    assert!(Permutation::from_vec(vec![2, 0, 1]).is_ok());
    assert!(Permutation::from_vec(vec![0, 0, 1]).is_err());
    assert!(Permutation::from_vec(vec![0, 3, 1]).is_err());
    assert!(Permutation::from_vec(vec![]).unwrap().is_empty());
}

#[test]
fn permutation_apply_and_inverse() {
    let perm = Permutation::from_vec(vec![2, 0, 3, 1]).unwrap();
    let source = ['a', 'b', 'c', 'd'];
    let target = perm.apply_to_slice(&source);
    assert_eq!(target, vec!['c', 'a', 'd', 'b']);
    assert_eq!(perm.apply_inverse_to_slice(&target), source.to_vec());
    assert_eq!(perm.inverse().apply_to_slice(&target), source.to_vec());

    for i in 0..4 {
        assert_eq!(perm.target_index(perm.source_index(i)), i);
    }
    assert_eq!(Permutation::identity(3).perm(), &[0, 1, 2]);
}

#[test]
#[should_panic]
fn apply_to_slice_of_wrong_length_panics() {
    Permutation::identity(3).apply_to_slice(&[1, 2]);
}

#[test]
fn reverse_cuthill_mckee_recovers_banded_structure() {
    // A path graph 0 - 1 - ... - 7 with its vertices relabeled, i.e. a scrambled tridiagonal matrix
    let labels = [5, 2, 7, 0, 3, 6, 1, 4];
    let mut matrix = DMatrix::zeros(8, 8);
    for k in 0..8 {
        matrix[(labels[k], labels[k])] = 1;
        if k + 1 < 8 {
            matrix[(labels[k], labels[k + 1])] = 1;
            matrix[(labels[k + 1], labels[k])] = 1;
        }
    }
    let pattern = pattern_of(&matrix);
    assert!(bandwidth(&pattern) > 1);

    let perm = reverse_cuthill_mckee(&pattern);
    let (permuted, _) = permute_symmetric(&pattern, &perm);
    assert_eq!(bandwidth(&permuted), 1);
    assert_eq!(permuted.nnz(), pattern.nnz());
}

#[test]
fn permute_symmetric_maps_entries() {
    #[rustfmt::skip]
    let dense = DMatrix::from_row_slice(4, 4, &[
        11, 12,  0, 14,
        21, 22, 23,  0,
         0, 32, 33, 34,
        41,  0, 43, 44,
    ]);
    let matrix = CscMatrix::from(&dense);
    let perm = Permutation::from_vec(vec![3, 1, 0, 2]).unwrap();
    let (permuted_pattern, value_map) = permute_symmetric(matrix.pattern(), &perm);

    let values: Vec<i32> = value_map.iter().map(|&k| matrix.values()[k]).collect();
    let permuted = CscMatrix::try_from_pattern_and_values(permuted_pattern, values).unwrap();
    let permuted_dense = DMatrix::from(&permuted);

    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(permuted_dense[(i, j)], dense[(perm.source_index(i), perm.source_index(j))]);
        }
    }
}

/// Random structurally symmetric patterns with full diagonal.
fn symmetric_pattern() -> impl Strategy<Value = SparsityPattern> {
    (1usize..20)
        .prop_flat_map(|n| (Just(n), proptest::collection::vec((0..n, 0..n), 0..3 * n)))
        .prop_map(|(n, entries)| {
            let mut matrix = DMatrix::<i32>::identity(n, n);
            for (i, j) in entries {
                matrix[(i, j)] = 1;
                matrix[(j, i)] = 1;
            }
            pattern_of(&matrix)
        })
}

proptest! {
    #[test]
    fn reverse_cuthill_mckee_is_valid_permutation(pattern in symmetric_pattern()) {
        let perm = reverse_cuthill_mckee(&pattern);
        prop_assert_eq!(perm.len(), pattern.major_dim());
        let mut indices = perm.perm().to_vec();
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..pattern.major_dim()).collect::<Vec<_>>());

        let (permuted, value_map) = permute_symmetric(&pattern, &perm);
        prop_assert_eq!(permuted.nnz(), pattern.nnz());
        prop_assert_eq!(value_map.len(), pattern.nnz());
        prop_assert_eq!(permuted.transpose(), permuted.clone());
    }
}
