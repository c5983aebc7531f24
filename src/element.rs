//! Canonical (reference) elements.
//!
//! A canonical element is a compile-time description of an element topology: the reference
//! coordinates of its nodes, a Gauss quadrature table on the reference domain and the
//! Lagrange shape functions interpolating between the nodes. Canonical elements carry no
//! geometry; see [`RectangularElement`](crate::geometry::RectangularElement) for the mapping
//! to world space.
use std::fmt::Debug;

use nalgebra::{convert, Point, SVector};
use numeric_literals::replace_float_literals;

use crate::Real;

mod hexahedron;
mod quadrilateral;

pub use hexahedron::*;
pub use quadrilateral::*;

/// A reference element of dimension `D` described by static tables.
///
/// All tables live in `f64` and are converted to the working scalar type on use.
/// The reference domain is `[-1, 1]^D` for every element provided by this crate.
pub trait CanonicalElement<const D: usize>:
    Copy + Debug + Default + PartialEq + Send + Sync + 'static
{
    /// Reference coordinates of the nodes, in local node order.
    const NODES: &'static [[f64; D]];

    /// Reference coordinates of the Gauss quadrature points.
    const GAUSS_NODES: &'static [[f64; D]];

    /// Quadrature weights, one per entry of [`GAUSS_NODES`](Self::GAUSS_NODES).
    const GAUSS_WEIGHTS: &'static [f64];

    const NUM_NODES: usize = Self::NODES.len();

    /// Evaluates each shape function at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `basis_values.len() != NUM_NODES`.
    fn populate_basis<T: Real>(basis_values: &mut [T], xi: &Point<T, D>);

    /// Evaluates the gradient (with respect to reference coordinates) of each shape function.
    ///
    /// # Panics
    ///
    /// Panics if `basis_gradients.len() != NUM_NODES`.
    fn populate_basis_gradients<T: Real>(basis_gradients: &mut [SVector<T, D>], xi: &Point<T, D>);

    fn evaluate_basis<T: Real>(xi: &Point<T, D>) -> Vec<T> {
        let mut basis_values = vec![T::zero(); Self::NUM_NODES];
        Self::populate_basis(&mut basis_values, xi);
        basis_values
    }

    fn evaluate_basis_gradients<T: Real>(xi: &Point<T, D>) -> Vec<SVector<T, D>> {
        let mut basis_gradients = vec![SVector::zeros(); Self::NUM_NODES];
        Self::populate_basis_gradients(&mut basis_gradients, xi);
        basis_gradients
    }

    /// The reference coordinates of node `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= NUM_NODES`.
    fn reference_node<T: Real>(index: usize) -> Point<T, D> {
        point_from_f64(&Self::NODES[index])
    }
}

/// Converts a point stored in a static `f64` table to the working scalar type.
pub(crate) fn point_from_f64<T: Real, const D: usize>(coords: &[f64; D]) -> Point<T, D> {
    Point::from(SVector::<T, D>::from_fn(|i, _| convert(coords[i])))
}

/// Linear basis function on the interval [-1, 1].
///
/// `alpha` is the reference coordinate of the node the function belongs to, so that
/// `phi_linear_1d(alpha, alpha) == 1`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn phi_linear_1d<T: Real>(alpha: T, xi: T) -> T {
    (1.0 + alpha * xi) / 2.0
}

/// Gradient of [`phi_linear_1d`], which does not depend on `xi`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn phi_linear_1d_grad<T: Real>(alpha: T) -> T {
    alpha / 2.0
}

/// Tensor-product linear Lagrange basis for nodes at the corners of `[-1, 1]^D`.
///
/// The shape function of a node with reference coordinates `a` is
/// `N_a(xi) = prod_d (1 + a_d xi_d) / 2`.
pub(crate) fn populate_multilinear_basis<T: Real, const D: usize>(
    nodes: &[[f64; D]],
    basis_values: &mut [T],
    xi: &Point<T, D>,
) {
    assert_eq!(
        basis_values.len(),
        nodes.len(),
        "Basis buffer must have exactly one entry per node."
    );
    for (value, node) in basis_values.iter_mut().zip(nodes) {
        *value = node
            .iter()
            .zip(xi.iter())
            .map(|(&alpha, &xi_d)| phi_linear_1d(convert(alpha), xi_d))
            .fold(T::one(), |acc, phi| acc * phi);
    }
}

/// Reference gradients of the basis produced by [`populate_multilinear_basis`].
pub(crate) fn populate_multilinear_basis_gradients<T: Real, const D: usize>(
    nodes: &[[f64; D]],
    basis_gradients: &mut [SVector<T, D>],
    xi: &Point<T, D>,
) {
    assert_eq!(
        basis_gradients.len(),
        nodes.len(),
        "Gradient buffer must have exactly one entry per node."
    );
    for (gradient, node) in basis_gradients.iter_mut().zip(nodes) {
        *gradient = SVector::from_fn(|k, _| {
            (0..D)
                .map(|d| {
                    let alpha = convert(node[d]);
                    if d == k {
                        phi_linear_1d_grad(alpha)
                    } else {
                        phi_linear_1d(alpha, xi[d])
                    }
                })
                .fold(T::one(), |acc, factor| acc * factor)
        });
    }
}
