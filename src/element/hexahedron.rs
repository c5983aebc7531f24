use nalgebra::{Point3, Vector3};

use crate::element::{populate_multilinear_basis, populate_multilinear_basis_gradients, CanonicalElement};
use crate::Real;

/// `1 / sqrt(3)`, the positive point of the two-point Gauss-Legendre rule.
const G: f64 = 0.577_350_269_189_625_8;

/// The trilinear 8-node hexahedron on `[-1, 1]^3`.
///
/// Nodes 0-3 form the bottom face (`z = -1`) in counter-clockwise order seen from above,
/// nodes 4-7 the top face in the same order. The edges 0-1, 0-3 and 0-4 are aligned with
/// the local x, y and z axes respectively.
///
/// The quadrature table is the 2x2x2 Gauss rule, exact for polynomials of degree 3 in
/// each variable. Gauss point `i` lies in the octant of node `i`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Hex8;

impl CanonicalElement<3> for Hex8 {
    #[rustfmt::skip]
    const NODES: &'static [[f64; 3]] = &[
        [-1.0, -1.0, -1.0],
        [ 1.0, -1.0, -1.0],
        [ 1.0,  1.0, -1.0],
        [-1.0,  1.0, -1.0],
        [-1.0, -1.0,  1.0],
        [ 1.0, -1.0,  1.0],
        [ 1.0,  1.0,  1.0],
        [-1.0,  1.0,  1.0],
    ];

    #[rustfmt::skip]
    const GAUSS_NODES: &'static [[f64; 3]] = &[
        [-G, -G, -G],
        [ G, -G, -G],
        [ G,  G, -G],
        [-G,  G, -G],
        [-G, -G,  G],
        [ G, -G,  G],
        [ G,  G,  G],
        [-G,  G,  G],
    ];

    const GAUSS_WEIGHTS: &'static [f64] = &[1.0; 8];

    fn populate_basis<T: Real>(basis_values: &mut [T], xi: &Point3<T>) {
        populate_multilinear_basis(Self::NODES, basis_values, xi)
    }

    fn populate_basis_gradients<T: Real>(basis_gradients: &mut [Vector3<T>], xi: &Point3<T>) {
        populate_multilinear_basis_gradients(Self::NODES, basis_gradients, xi)
    }
}
