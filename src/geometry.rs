//! Rectangular elements: canonical elements placed in world space.
//!
//! A [`RectangularElement`] is a canonical element that has been scaled along its local axes,
//! rotated by an orthonormal frame and centered at a world-space position. Since the
//! parametrization cannot express shear or tapering, the map from reference to world
//! coordinates is affine and its Jacobian is the same at every point of the element.
//!
//! **The constant Jacobian is only valid for this family.** A general (skewed or tapered)
//! hexahedron has a Jacobian that varies over the element and must be evaluated per
//! quadrature point from shape-function derivatives, see
//! [`isoparametric_jacobian`](RectangularElement::isoparametric_jacobian). Reusing
//! [`gauss_quadrature`](RectangularElement::gauss_quadrature) for such elements gives wrong
//! integrals without any error.
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Mul};

use itertools::izip;
use nalgebra::{convert, Const, Point, SMatrix, SVector, Scalar};
use num::Zero;
use numeric_literals::replace_float_literals;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::element::{point_from_f64, CanonicalElement, Hex8, Quad4};
use crate::quadrature::Quadrature;
use crate::{Real, SmallDim};

/// A canonical element `C` mapped to world space by a center, per-axis extents and a frame.
///
/// The element is a value type: it is never mutated after construction and all derived
/// quantities (node positions, Jacobian) are recomputed on demand.
///
/// Deserialization applies the same checks as [`new`](Self::new) and reports violations as
/// deserialization errors.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Scalar + Serialize"))]
pub struct RectangularElement<T: Scalar, C, const D: usize> {
    center: Point<T, D>,
    extents: SVector<T, D>,
    frame: SMatrix<T, D, D>,
    #[serde(skip)]
    canonical: PhantomData<C>,
}

/// An 8-node hexahedron whose faces are rectangles.
pub type RectangularHexahedron<T> = RectangularElement<T, Hex8, 3>;

/// A 4-node quadrilateral with right angles.
pub type RectangularQuad<T> = RectangularElement<T, Quad4, 2>;

impl<T, C, const D: usize> RectangularElement<T, C, D>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
{
    const QUADRATURE_TABLES_MATCH: () = assert!(
        C::GAUSS_NODES.len() == C::GAUSS_WEIGHTS.len() && !C::GAUSS_WEIGHTS.is_empty(),
        "Gauss nodes must have assigned weights."
    );

    /// Creates an element from its center, its edge lengths along the local axes and the
    /// rotation taking local axes to world axes.
    ///
    /// # Panics
    ///
    /// Panics if an extent is not strictly positive, or if `frame` is not a rotation
    /// (orthonormal with determinant `+1`). Both would silently corrupt Jacobian
    /// determinants and volumes.
    pub fn new(center: Point<T, D>, extents: SVector<T, D>, frame: SMatrix<T, D, D>) -> Self {
        if let Err(message) = check_extents_and_frame(&extents, &frame) {
            panic!("{}", message);
        }
        Self {
            center,
            extents,
            frame,
            canonical: PhantomData,
        }
    }

    /// Creates an element whose local axes coincide with the world axes.
    pub fn from_center_and_extents(center: Point<T, D>, extents: SVector<T, D>) -> Self {
        Self::new(center, extents, SMatrix::identity())
    }

    /// The reference element itself: centered at the origin with all extents equal to 2.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_center_and_extents(Point::origin(), SVector::repeat(2.0))
    }

    pub fn center(&self) -> &Point<T, D> {
        &self.center
    }

    pub fn extents(&self) -> &SVector<T, D> {
        &self.extents
    }

    /// The local coordinate frame, i.e. the rotation from local to world axes.
    ///
    /// Column `i` is the world direction of local axis `i`.
    pub fn frame(&self) -> &SMatrix<T, D, D> {
        &self.frame
    }

    pub fn num_nodes(&self) -> usize {
        C::NUM_NODES
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn half_extents(&self) -> SVector<T, D> {
        self.extents * 0.5
    }

    /// The world coordinates of local node `index`, relative to the element center.
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_nodes()`.
    pub fn node(&self, index: usize) -> Point<T, D> {
        assert!(
            index < C::NUM_NODES,
            "Node index {} out of bounds for element with {} nodes",
            index,
            C::NUM_NODES
        );
        self.transform(&C::reference_node(index))
    }

    /// The coordinates of all nodes, in local node order. Same convention as [`node`](Self::node).
    pub fn nodes(&self) -> Vec<Point<T, D>> {
        (0..C::NUM_NODES).map(|i| self.node(i)).collect()
    }

    /// Maps reference coordinates in `[-1, 1]^D` to world space relative to the center:
    /// `frame * (xi .* extents / 2)`.
    ///
    /// The center is not added; use [`world_coordinates`](Self::world_coordinates) for
    /// absolute positions.
    pub fn transform(&self, xi: &Point<T, D>) -> Point<T, D> {
        Point::from(self.frame * xi.coords.component_mul(&self.half_extents()))
    }

    /// Maps reference coordinates to absolute world coordinates, `center + transform(xi)`.
    pub fn world_coordinates(&self, xi: &Point<T, D>) -> Point<T, D> {
        self.center + self.transform(xi).coords
    }

    /// Inverse of [`world_coordinates`](Self::world_coordinates).
    ///
    /// The result lies outside `[-1, 1]^D` if `x` lies outside the element.
    pub fn local_coordinates(&self, x: &Point<T, D>) -> Point<T, D> {
        let local = self.frame.transpose() * (x - &self.center);
        Point::from(local.component_div(&self.half_extents()))
    }

    /// Whether the reference coordinates lie in `[-1, 1]^D`, up to a small tolerance.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn contains_local(&self, xi: &Point<T, D>) -> bool {
        let tol = T::default_epsilon().sqrt();
        xi.iter().all(|xi_d| xi_d.abs() <= 1.0 + tol)
    }

    /// Whether the world-space point lies inside the element, up to a small tolerance.
    pub fn contains_point(&self, x: &Point<T, D>) -> bool {
        self.contains_local(&self.local_coordinates(x))
    }

    /// The Jacobian of the map from reference to world coordinates.
    ///
    /// It is `frame * diag(extents / 2)` at every point of the element. The evaluation point
    /// is accepted for symmetry with general elements and ignored.
    pub fn jacobian_at(&self, _xi: &Point<T, D>) -> SMatrix<T, D, D> {
        self.jacobian()
    }

    /// The constant Jacobian `frame * diag(extents / 2)`.
    ///
    /// Its determinant is `prod(extents / 2)`, the ratio between world and reference volume.
    pub fn jacobian(&self) -> SMatrix<T, D, D> {
        self.frame * SMatrix::from_diagonal(&self.half_extents())
    }

    /// The inverse of [`jacobian`](Self::jacobian), `diag(2 / extents) * frame^T`.
    pub fn inverse_jacobian(&self) -> SMatrix<T, D, D> {
        let inv_half_extents = self.half_extents().map(|h| T::one() / h);
        SMatrix::from_diagonal(&inv_half_extents) * self.frame.transpose()
    }

    /// The Jacobian computed from node positions and shape-function gradients,
    /// `J = sum_i x_i grad(N_i)(xi)^T`.
    ///
    /// This is the formula a general isoparametric element needs at every point. For a
    /// rectangular element it coincides with [`jacobian`](Self::jacobian) everywhere.
    pub fn isoparametric_jacobian(&self, xi: &Point<T, D>) -> SMatrix<T, D, D> {
        let gradients = C::evaluate_basis_gradients(xi);
        self.nodes()
            .iter()
            .zip(&gradients)
            .fold(SMatrix::zeros(), |jacobian, (x_i, grad_i)| {
                jacobian + x_i.coords * grad_i.transpose()
            })
    }

    /// Volume (area in 2D) of the element.
    pub fn volume(&self) -> T {
        self.extents.iter().fold(T::one(), |acc, h| acc * *h)
    }

    /// Interpolates nodal values at the given reference coordinates with the shape functions
    /// of the canonical element.
    ///
    /// # Panics
    ///
    /// Panics if `nodal_values.len() != num_nodes()`.
    pub fn interpolate<V>(&self, nodal_values: &[V], xi: &Point<T, D>) -> V
    where
        V: Clone + Zero + Mul<T, Output = V> + AddAssign,
    {
        assert_eq!(
            nodal_values.len(),
            C::NUM_NODES,
            "Must provide exactly one value per node."
        );
        let phi = C::evaluate_basis(xi);
        let mut result = V::zero();
        for (value, phi_i) in izip!(nodal_values, phi) {
            result += value.clone() * phi_i;
        }
        result
    }

    /// Approximates the integral of `f` over the element with the canonical Gauss rule,
    ///
    /// ```text
    /// sum_i f(element, xi_i) * w_i * det(J)
    /// ```
    ///
    /// `f` receives the element and the reference coordinates of the quadrature point.
    /// Since `det(J)` is constant for rectangular elements it is computed once.
    ///
    /// # Example
    ///
    /// ```
    /// use caribou::geometry::RectangularHexahedron;
    /// use caribou::nalgebra::{Point3, Vector3};
    ///
    /// let hexa = RectangularHexahedron::from_center_and_extents(Point3::origin(), Vector3::new(1.0, 2.0, 3.0));
    /// // Integrate 1 + 2 xi + 2 xi eta + 3 zeta over the element.
    /// let integral = hexa.gauss_quadrature(|_, p: &Point3<f64>| 1.0 + 2.0 * p.x + 2.0 * p.x * p.y + 3.0 * p.z);
    /// assert!((integral - 6.0).abs() < 1e-12);
    /// ```
    pub fn gauss_quadrature<V, F>(&self, f: F) -> V
    where
        F: Fn(&Self, &Point<T, D>) -> V,
        V: Mul<T, Output = V> + Add<Output = V>,
    {
        #[allow(clippy::let_unit_value)]
        let () = Self::QUADRATURE_TABLES_MATCH;

        let det_j = self.jacobian().determinant();
        let mut terms = izip!(C::GAUSS_NODES, C::GAUSS_WEIGHTS)
            .map(|(xi, w)| f(self, &point_from_f64(xi)) * convert::<f64, T>(*w) * det_j);
        let first = terms
            .next()
            .expect("Internal error: quadrature table is checked to be non-empty at compile time");
        terms.fold(first, |sum, term| sum + term)
    }

    /// Approximates the integral of `f` over the element with an arbitrary reference rule.
    ///
    /// Use this when the canonical rule is not exact for the integrand, e.g. with
    /// [`tensor_gauss(3)`](crate::quadrature::tensor_gauss) for tri-quadratic functions.
    pub fn integrate<V, F>(&self, quadrature: impl Quadrature<T, D>, f: F) -> V
    where
        F: Fn(&Self, &Point<T, D>) -> V,
        V: Zero + Mul<T, Output = V> + AddAssign,
    {
        assert_eq!(
            quadrature.weights().len(),
            quadrature.points().len(),
            "Quadrature weights and points must have the same length."
        );
        let det_j = self.jacobian().determinant();
        let mut integral = V::zero();
        for (w, xi) in izip!(quadrature.weights(), quadrature.points()) {
            integral += f(self, xi) * (*w * det_j);
        }
        integral
    }
}

impl<T, C, const D: usize> Default for RectangularElement<T, C, D>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
{
    fn default() -> Self {
        Self::reference()
    }
}

fn check_extents_and_frame<T, const D: usize>(extents: &SVector<T, D>, frame: &SMatrix<T, D, D>) -> Result<(), String>
where
    T: Real,
    Const<D>: SmallDim,
{
    if !extents.iter().all(|h| *h > T::zero()) {
        return Err(format!(
            "Element extents must be strictly positive, got {:?}",
            extents.as_slice()
        ));
    }
    if !is_rotation(frame) {
        return Err(format!(
            "Element frame must be a rotation matrix, got {:?}",
            frame.as_slice()
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Scalar + Deserialize<'de>"))]
struct RectangularElementParams<T: Scalar, const D: usize> {
    center: Point<T, D>,
    extents: SVector<T, D>,
    frame: SMatrix<T, D, D>,
}

impl<'de, T, C, const D: usize> Deserialize<'de> for RectangularElement<T, C, D>
where
    T: Real + Deserialize<'de>,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
{
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: Deserializer<'de>,
    {
        let RectangularElementParams { center, extents, frame } = RectangularElementParams::deserialize(deserializer)?;
        check_extents_and_frame(&extents, &frame).map_err(de::Error::custom)?;
        Ok(Self {
            center,
            extents,
            frame,
            canonical: PhantomData,
        })
    }
}

/// Whether `frame` is orthonormal with positive determinant, up to `sqrt(eps)`.
fn is_rotation<T, const D: usize>(frame: &SMatrix<T, D, D>) -> bool
where
    T: Real,
    Const<D>: SmallDim,
{
    let tol = T::default_epsilon().sqrt();
    let orthogonality_error = (frame.transpose() * frame - SMatrix::<T, D, D>::identity()).amax();
    orthogonality_error <= tol && frame.determinant() > T::zero()
}
