//! Proptest strategies for elements and their ingredients.
use crate::geometry::{RectangularHexahedron, RectangularQuad};
use ::proptest::prelude::*;
use nalgebra::{Matrix2, Matrix3, Point2, Point3, Rotation2, Rotation3, Vector2, Vector3};
use std::f64::consts::PI;

pub fn point2() -> impl Strategy<Value = Point2<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone()].prop_map(|[x, y]| Point2::new(x, y))
}

pub fn point3() -> impl Strategy<Value = Point3<f64>> {
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range.clone()].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Points in the reference domain `[-1, 1]^2`.
pub fn reference_point2() -> impl Strategy<Value = Point2<f64>> {
    [-1.0..=1.0, -1.0..=1.0].prop_map(|[x, y]| Point2::new(x, y))
}

/// Points in the reference domain `[-1, 1]^3`.
pub fn reference_point3() -> impl Strategy<Value = Point3<f64>> {
    [-1.0..=1.0, -1.0..=1.0, -1.0..=1.0].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Strictly positive extents, bounded away from zero to keep Jacobians well conditioned.
pub fn extents2() -> impl Strategy<Value = Vector2<f64>> {
    [0.1..10.0, 0.1..10.0].prop_map(|[x, y]| Vector2::new(x, y))
}

pub fn extents3() -> impl Strategy<Value = Vector3<f64>> {
    [0.1..10.0, 0.1..10.0, 0.1..10.0].prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

pub fn rotation2() -> impl Strategy<Value = Matrix2<f64>> {
    (-PI..PI).prop_map(|angle| Rotation2::new(angle).into_inner())
}

pub fn rotation3() -> impl Strategy<Value = Matrix3<f64>> {
    // Axis-angle with angles up to pi covers all rotations
    [-1.0..1.0, -1.0..1.0, -1.0..1.0].prop_map(|[x, y, z]| {
        let axis_angle = Vector3::new(x, y, z) * (PI / 3.0f64.sqrt());
        Rotation3::from_scaled_axis(axis_angle).into_inner()
    })
}

impl Arbitrary for RectangularHexahedron<f64> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (point3(), extents3(), rotation3())
            .prop_map(|(center, extents, frame)| Self::new(center, extents, frame))
            .boxed()
    }
}

impl Arbitrary for RectangularQuad<f64> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (point2(), extents2(), rotation2())
            .prop_map(|(center, extents, frame)| Self::new(center, extents, frame))
            .boxed()
    }
}
