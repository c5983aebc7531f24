use caribou::geometry::{RectangularHexahedron, RectangularQuad};
use nalgebra::{Point2, Point3, Vector2, Vector3};


/// A uniform grid of `[0, 1]^3` with `n` hexahedra per axis.
///
/// Returns the node positions, the elements and their connectivity in `Hex8` node order.
fn unit_cube_grid(n: usize) -> (Vec<Point3<f64>>, Vec<RectangularHexahedron<f64>>, Vec<[usize; 8]>) {
    let h = 1.0 / n as f64;
    let node_index = |i: usize, j: usize, k: usize| i + (n + 1) * (j + (n + 1) * k);

    let mut vertices = Vec::new();
    for k in 0..=n {
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64 * h, j as f64 * h, k as f64 * h));
            }
        }
    }

    let mut elements = Vec::new();
    let mut connectivity = Vec::new();
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let center = Point3::new((i as f64 + 0.5) * h, (j as f64 + 0.5) * h, (k as f64 + 0.5) * h);
                elements.push(RectangularHexahedron::from_center_and_extents(center, Vector3::repeat(h)));
                connectivity.push([
                    node_index(i, j, k),
                    node_index(i + 1, j, k),
                    node_index(i + 1, j + 1, k),
                    node_index(i, j + 1, k),
                    node_index(i, j, k + 1),
                    node_index(i + 1, j, k + 1),
                    node_index(i + 1, j + 1, k + 1),
                    node_index(i, j + 1, k + 1),
                ]);
            }
        }
    }
    (vertices, elements, connectivity)
}

/// A uniform grid of `[0, 1]^2` with `n` quadrilaterals per axis.
fn unit_square_grid(n: usize) -> (Vec<Point2<f64>>, Vec<RectangularQuad<f64>>, Vec<[usize; 4]>) {
    let h = 1.0 / n as f64;
    let node_index = |i: usize, j: usize| i + (n + 1) * j;

    let vertices = (0..=n)
        .flat_map(|j| (0..=n).map(move |i| Point2::new(i as f64 * h, j as f64 * h)))
        .collect();

    let mut elements = Vec::new();
    let mut connectivity = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let center = Point2::new((i as f64 + 0.5) * h, (j as f64 + 0.5) * h);
            elements.push(RectangularQuad::from_center_and_extents(center, Vector2::repeat(h)));
            connectivity.push([
                node_index(i, j),
                node_index(i + 1, j),
                node_index(i + 1, j + 1),
                node_index(i, j + 1),
            ]);
        }
    }
    (vertices, elements, connectivity)
}

fn is_on_unit_box_boundary(coords: &[f64]) -> bool {
    coords
        .iter()
        .any(|&x| x.abs() < 1e-12 || (x - 1.0).abs() < 1e-12)
}
