//! Quadrature rules on reference domains.
//!
//! The canonical elements carry fixed Gauss tables. The rules here complement them when a
//! different (usually higher) degree of exactness is needed: Gauss-Legendre rules on
//! `[-1, 1]` with any number of points, and their tensor products on `[-1, 1]^D`.
use itertools::izip;
use nalgebra::{convert, Point, SVector, Scalar};
use num::Zero;
use std::f64::consts::PI;
use std::ops::{AddAssign, Mul};

use crate::element::{point_from_f64, CanonicalElement};
use crate::Real;

/// Weights and points of a quadrature rule, stored separately.
pub type QuadraturePair<T, const D: usize> = (Vec<T>, Vec<Point<T, D>>);

/// A quadrature rule consisting of weights and points on a `D`-dimensional reference domain.
pub trait Quadrature<T: Scalar, const D: usize> {
    fn weights(&self) -> &[T];
    fn points(&self) -> &[Point<T, D>];

    fn len(&self) -> usize {
        self.weights().len()
    }

    fn is_empty(&self) -> bool {
        self.weights().is_empty()
    }

    /// Approximates the integral of the given function over the reference domain.
    fn integrate<U, Function>(&self, f: Function) -> U
    where
        T: Copy,
        Function: Fn(&Point<T, D>) -> U,
        U: Zero + Mul<T, Output = U> + AddAssign<U>,
    {
        assert_eq!(
            self.weights().len(),
            self.points().len(),
            "Quadrature weights and points must have the same length."
        );
        let mut integral = U::zero();
        for (w, p) in izip!(self.weights(), self.points()) {
            integral += f(p) * *w;
        }
        integral
    }
}

impl<T, A, B, const D: usize> Quadrature<T, D> for (A, B)
where
    T: Scalar,
    A: AsRef<[T]>,
    B: AsRef<[Point<T, D>]>,
{
    fn weights(&self) -> &[T] {
        self.0.as_ref()
    }

    fn points(&self) -> &[Point<T, D>] {
        self.1.as_ref()
    }
}

impl<T, X, const D: usize> Quadrature<T, D> for &X
where
    T: Scalar,
    X: Quadrature<T, D>,
{
    fn weights(&self) -> &[T] {
        X::weights(self)
    }

    fn points(&self) -> &[Point<T, D>] {
        X::points(self)
    }
}

/// Evaluates the Legendre polynomial `P_n` and its derivative at `x` in the open interval
/// `(-1, 1)`.
///
/// Uses the three-term recurrence `m P_m = (2m - 1) x P_{m-1} - (m - 1) P_{m-2}` and
/// `P_n' = n (x P_n - P_{n-1}) / (x^2 - 1)`.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let (mut p_prev, mut p) = (0.0, 1.0);
    for m in 1..=n {
        let m = m as f64;
        let p_next = ((2.0 * m - 1.0) * x * p - (m - 1.0) * p_prev) / m;
        p_prev = p;
        p = p_next;
    }
    let n = n as f64;
    let dp = n * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// The Gauss-Legendre rule with `num_points` points on `[-1, 1]`, computed in `f64`.
///
/// Points are sorted in increasing order.
fn gauss_legendre_f64(num_points: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(num_points > 0, "Gauss rule needs at least one point");
    let n = num_points;
    let mut weights = Vec::with_capacity(n);
    let mut points = Vec::with_capacity(n);

    for i in 0..n {
        // Chebyshev-like initial guess for the i-th root (in decreasing order), then Newton
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, dp) = legendre_with_derivative(n, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre_with_derivative(n, x);
        points.push(x);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    weights.reverse();
    points.reverse();
    (weights, points)
}

/// Gauss-Legendre quadrature on the reference interval `[-1, 1]`.
///
/// With `n` points the rule integrates polynomials of degree up to `2n - 1` exactly.
///
/// # Panics
///
/// Panics if `num_points == 0`.
pub fn gauss<T: Real>(num_points: usize) -> QuadraturePair<T, 1> {
    let (weights, points) = gauss_legendre_f64(num_points);
    (
        weights.into_iter().map(convert).collect(),
        points.into_iter().map(|x| point_from_f64(&[x])).collect(),
    )
}

/// Tensor-product Gauss rule on `[-1, 1]^D` with `num_points_per_dim` points per axis.
///
/// Points are ordered with the first coordinate varying fastest. The rule is exact for
/// polynomials of degree up to `2n - 1` in each variable separately.
///
/// # Panics
///
/// Panics if `num_points_per_dim == 0`.
pub fn tensor_gauss<T: Real, const D: usize>(num_points_per_dim: usize) -> QuadraturePair<T, D> {
    let (weights_1d, points_1d) = gauss_legendre_f64(num_points_per_dim);
    let n = num_points_per_dim;
    let total = n.pow(D as u32);

    let mut weights = Vec::with_capacity(total);
    let mut points = Vec::with_capacity(total);
    let mut multi_index = [0usize; D];
    for _ in 0..total {
        let weight = multi_index.iter().fold(1.0, |w, &i| w * weights_1d[i]);
        weights.push(convert(weight));
        points.push(Point::from(SVector::<T, D>::from_fn(|d, _| {
            convert(points_1d[multi_index[d]])
        })));

        // Advance the multi-index like an odometer
        for index in multi_index.iter_mut() {
            *index += 1;
            if *index < n {
                break;
            }
            *index = 0;
        }
    }

    (weights, points)
}

/// The quadrature table of a canonical element, converted to the working scalar type.
pub fn canonical<T: Real, C: CanonicalElement<D>, const D: usize>() -> QuadraturePair<T, D> {
    let weights = C::GAUSS_WEIGHTS.iter().copied().map(convert).collect();
    let points = C::GAUSS_NODES.iter().map(point_from_f64).collect();
    (weights, points)
}
