use nalgebra::{Point2, Vector2};

use crate::element::{populate_multilinear_basis, populate_multilinear_basis_gradients, CanonicalElement};
use crate::Real;

/// `1 / sqrt(3)`, the positive point of the two-point Gauss-Legendre rule.
const G: f64 = 0.577_350_269_189_625_8;

/// The bilinear 4-node quadrilateral on `[-1, 1]^2`, nodes in counter-clockwise order.
///
/// Integrated with the 2x2 Gauss rule.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Quad4;

impl CanonicalElement<2> for Quad4 {
    #[rustfmt::skip]
    const NODES: &'static [[f64; 2]] = &[
        [-1.0, -1.0],
        [ 1.0, -1.0],
        [ 1.0,  1.0],
        [-1.0,  1.0],
    ];

    #[rustfmt::skip]
    const GAUSS_NODES: &'static [[f64; 2]] = &[
        [-G, -G],
        [ G, -G],
        [ G,  G],
        [-G,  G],
    ];

    const GAUSS_WEIGHTS: &'static [f64] = &[1.0; 4];

    fn populate_basis<T: Real>(basis_values: &mut [T], xi: &Point2<T>) {
        populate_multilinear_basis(Self::NODES, basis_values, xi)
    }

    fn populate_basis_gradients<T: Real>(basis_gradients: &mut [Vector2<T>], xi: &Point2<T>) {
        populate_multilinear_basis_gradients(Self::NODES, basis_gradients, xi)
    }
}
