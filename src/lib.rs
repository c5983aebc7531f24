//! Rectangular finite elements, Gauss quadrature and direct sparse linear solvers.
//!
//! The crate has two halves:
//!
//! - [`geometry`] and [`element`] describe elements as a canonical reference element
//!   (node and quadrature tables, shape functions) mapped to world space by a center, extents and
//!   an orthonormal frame. Element integrals are computed by Gauss quadrature.
//! - [`solver`] wraps a direct sparse factorization backend in a strict
//!   analyze/factorize/solve state machine.
//!
//! [`assembly`] ties the two together by turning element integrals into global sparse systems.
use nalgebra::{DimMin, DimName, RealField};

pub mod assembly;
pub mod element;
pub mod geometry;
pub mod quadrature;
pub mod reorder;
pub mod solver;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// Real scalar types supported by the crate.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// A small, fixed-size dimension.
///
/// Used as a trait alias for the bounds needed to take determinants of square matrices of
/// this dimension.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}
