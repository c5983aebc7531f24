use caribou::element::{CanonicalElement, Hex8, Quad4};
use caribou::proptest::{reference_point2, reference_point3};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DVector, Point, SVector};
use proptest::prelude::*;

fn assert_lagrange_property<C: CanonicalElement<D>, const D: usize>() {
    // We expect that N_i(x_j) = delta_ij
    // where N_i is the ith basis function, x_j is the reference coordinate of node j,
    // and delta_ij is the Kronecker delta.
    for (j, node) in C::NODES.iter().enumerate() {
        let xi = Point::from(SVector::<f64, D>::from(*node));
        let phi = DVector::from_vec(C::evaluate_basis(&xi));

        let mut expected = DVector::zeros(C::NUM_NODES);
        expected[j] = 1.0;

        assert_matrix_eq!(phi, expected, comp = abs, tol = 1e-12);
    }
}

/// Compares basis gradients with central differences of the basis functions.
fn assert_gradients_match_finite_differences<C: CanonicalElement<D>, const D: usize>(xi: &Point<f64, D>) {
    let h = 1e-6;
    let gradients = C::evaluate_basis_gradients(xi);
    for d in 0..D {
        let mut xi_plus = *xi;
        let mut xi_minus = *xi;
        xi_plus[d] += h;
        xi_minus[d] -= h;
        let phi_plus = C::evaluate_basis(&xi_plus);
        let phi_minus = C::evaluate_basis(&xi_minus);
        for i in 0..C::NUM_NODES {
            let approx = (phi_plus[i] - phi_minus[i]) / (2.0 * h);
            assert_scalar_eq!(gradients[i][d], approx, comp = abs, tol = 1e-8);
        }
    }
}

#[test]
fn hex8_lagrange_property() {
    assert_lagrange_property::<Hex8, 3>();
}

#[test]
fn quad4_lagrange_property() {
    assert_lagrange_property::<Quad4, 2>();
}

#[test]
fn canonical_tables_have_consistent_sizes() {
    assert_eq!(Hex8::NUM_NODES, 8);
    assert_eq!(Hex8::GAUSS_NODES.len(), Hex8::GAUSS_WEIGHTS.len());
    assert_eq!(Quad4::NUM_NODES, 4);
    assert_eq!(Quad4::GAUSS_NODES.len(), Quad4::GAUSS_WEIGHTS.len());

    // The weights sum to the volume of the reference domain
    assert_scalar_eq!(Hex8::GAUSS_WEIGHTS.iter().sum::<f64>(), 8.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(Quad4::GAUSS_WEIGHTS.iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-14);
}

#[test]
fn hex8_gauss_points_lie_in_octant_of_corresponding_node() {
    for (node, gauss_point) in Hex8::NODES.iter().zip(Hex8::GAUSS_NODES) {
        for d in 0..3 {
            assert_eq!(node[d].signum(), gauss_point[d].signum());
            assert_scalar_eq!(gauss_point[d].abs(), 1.0 / 3.0f64.sqrt(), comp = abs, tol = 1e-15);
        }
    }
}

#[test]
fn reference_node_matches_table() {
    let node = Hex8::reference_node::<f64>(6);
    assert_eq!(node.coords.as_slice(), &[1.0, 1.0, 1.0]);
    let node = Quad4::reference_node::<f32>(3);
    assert_eq!(node.coords.as_slice(), &[-1.0f32, 1.0]);
}

#[test]
#[should_panic]
fn populate_basis_panics_on_wrong_buffer_length() {
    let mut buffer = vec![0.0; 7];
    Hex8::populate_basis(&mut buffer, &Point::origin());
}

proptest! {
    #[test]
    fn hex8_partition_of_unity(xi in reference_point3()) {
        let phi_sum: f64 = Hex8::evaluate_basis(&xi).iter().sum();
        prop_assert!((phi_sum - 1.0).abs() <= 1e-12);
    }

    #[test]
    fn quad4_partition_of_unity(xi in reference_point2()) {
        let phi_sum: f64 = Quad4::evaluate_basis(&xi).iter().sum();
        prop_assert!((phi_sum - 1.0).abs() <= 1e-12);
    }

    #[test]
    fn hex8_partition_of_unity_gradient(xi in reference_point3()) {
        // Since the sum of basis functions is 1, the sum of the gradients must be 0
        let gradient_sum = Hex8::evaluate_basis_gradients(&xi)
            .into_iter()
            .fold(SVector::<f64, 3>::zeros(), |sum, grad| sum + grad);
        prop_assert!(gradient_sum.amax() <= 1e-12);
    }

    #[test]
    fn quad4_partition_of_unity_gradient(xi in reference_point2()) {
        let gradient_sum = Quad4::evaluate_basis_gradients(&xi)
            .into_iter()
            .fold(SVector::<f64, 2>::zeros(), |sum, grad| sum + grad);
        prop_assert!(gradient_sum.amax() <= 1e-12);
    }

    #[test]
    fn hex8_gradients_are_derivatives_of_basis(xi in reference_point3()) {
        assert_gradients_match_finite_differences::<Hex8, 3>(&xi);
    }

    #[test]
    fn quad4_gradients_are_derivatives_of_basis(xi in reference_point2()) {
        assert_gradients_match_finite_differences::<Quad4, 2>(&xi);
    }
}
