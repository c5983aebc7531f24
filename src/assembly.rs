//! Element and global assembly of scalar finite element systems.
//!
//! Element quantities are computed with [`RectangularElement::gauss_quadrature`], which is exact
//! for the bilinear/trilinear integrands of the Laplace and mass operators on rectangular
//! elements. Global matrices are assembled in coordinate format and converted to CSC, summing
//! the contributions of elements that share nodes.
//!
//! All functions take the element list and the connectivity (global node indices of each
//! element, in local node order) as separate slices, so any mesh representation can be used.
use eyre::eyre;
use nalgebra::{Const, DMatrix, DVector, Point};
use nalgebra_sparse::{CooMatrix, CscMatrix};
use rayon::prelude::*;

use crate::element::CanonicalElement;
use crate::geometry::RectangularElement;
use crate::{Real, SmallDim};

/// The element stiffness matrix of the Laplace operator, `K_ij = ∫ ∇N_i · ∇N_j dx`.
pub fn element_laplace_stiffness<T, C, const D: usize>(element: &RectangularElement<T, C, D>) -> DMatrix<T>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
{
    // Maps reference gradients to world gradients, constant over the element
    let j_inv_t = element.inverse_jacobian().transpose();
    element.gauss_quadrature(|_, xi| {
        let world_gradients: Vec<_> = C::evaluate_basis_gradients(xi)
            .iter()
            .map(|grad| j_inv_t * grad)
            .collect();
        DMatrix::from_fn(C::NUM_NODES, C::NUM_NODES, |i, j| {
            world_gradients[i].dot(&world_gradients[j])
        })
    })
}

/// The consistent element mass matrix, `M_ij = ∫ ρ N_i N_j dx`.
pub fn element_mass<T, C, const D: usize>(element: &RectangularElement<T, C, D>, density: T) -> DMatrix<T>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
{
    element.gauss_quadrature(|_, xi| {
        let phi = C::evaluate_basis(xi);
        DMatrix::from_fn(C::NUM_NODES, C::NUM_NODES, |i, j| density * phi[i] * phi[j])
    })
}

/// The element load vector `f_i = ∫ f(x) N_i dx` for a source term given in world coordinates.
pub fn element_load<T, C, F, const D: usize>(element: &RectangularElement<T, C, D>, source: F) -> DVector<T>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
    F: Fn(&Point<T, D>) -> T,
{
    element.gauss_quadrature(|element, xi| {
        let f = source(&element.world_coordinates(xi));
        DVector::from_iterator(C::NUM_NODES, C::evaluate_basis(xi).into_iter().map(|phi_i| f * phi_i))
    })
}

fn validate_connectivity<Connectivity: AsRef<[usize]>>(
    num_nodes: usize,
    nodes_per_element: usize,
    num_elements: usize,
    connectivity: &[Connectivity],
) -> eyre::Result<()> {
    if connectivity.len() != num_elements {
        return Err(eyre!(
            "Got {} elements but connectivity for {} elements",
            num_elements,
            connectivity.len()
        ));
    }
    for (element_index, element_nodes) in connectivity.iter().enumerate() {
        let element_nodes = element_nodes.as_ref();
        if element_nodes.len() != nodes_per_element {
            return Err(eyre!(
                "Element {} has {} nodes in connectivity, expected {}",
                element_index,
                element_nodes.len(),
                nodes_per_element
            ));
        }
        if let Some(node) = element_nodes.iter().find(|&&node| node >= num_nodes) {
            return Err(eyre!(
                "Element {} references node {}, but there are only {} nodes",
                element_index,
                node,
                num_nodes
            ));
        }
    }
    Ok(())
}

fn distribute_local_to_global<T: Real>(
    coo: &mut CooMatrix<T>,
    global_indices: &[usize],
    element_matrix: &DMatrix<T>,
) -> eyre::Result<()> {
    let n = global_indices.len();
    if element_matrix.shape() != (n, n) {
        return Err(eyre!(
            "Element matrix has shape {:?}, expected ({1}, {1})",
            element_matrix.shape(),
            n
        ));
    }
    for (i_local, &i_global) in global_indices.iter().enumerate() {
        for (j_local, &j_global) in global_indices.iter().enumerate() {
            coo.push(i_global, j_global, element_matrix[(i_local, j_local)]);
        }
    }
    Ok(())
}

/// Assembles the global `num_nodes x num_nodes` matrix from per-element matrices.
///
/// `element_matrix` is called once per element and must return a square matrix with one row
/// per element node, e.g. [`element_laplace_stiffness`].
pub fn assemble_matrix<T, C, Connectivity, F, const D: usize>(
    num_nodes: usize,
    elements: &[RectangularElement<T, C, D>],
    connectivity: &[Connectivity],
    element_matrix: F,
) -> eyre::Result<CscMatrix<T>>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
    Connectivity: AsRef<[usize]>,
    F: Fn(&RectangularElement<T, C, D>) -> DMatrix<T>,
{
    validate_connectivity(num_nodes, C::NUM_NODES, elements.len(), connectivity)?;
    let mut coo = CooMatrix::new(num_nodes, num_nodes);
    for (element, element_nodes) in elements.iter().zip(connectivity) {
        distribute_local_to_global(&mut coo, element_nodes.as_ref(), &element_matrix(element))?;
    }
    Ok(CscMatrix::from(&coo))
}

/// Parallel version of [`assemble_matrix`]. Elements are processed concurrently with rayon.
///
/// The result equals the serial result up to the summation order of shared entries.
pub fn assemble_matrix_par<T, C, Connectivity, F, const D: usize>(
    num_nodes: usize,
    elements: &[RectangularElement<T, C, D>],
    connectivity: &[Connectivity],
    element_matrix: F,
) -> eyre::Result<CscMatrix<T>>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
    Connectivity: Sync + AsRef<[usize]>,
    F: Sync + Fn(&RectangularElement<T, C, D>) -> DMatrix<T>,
{
    validate_connectivity(num_nodes, C::NUM_NODES, elements.len(), connectivity)?;
    let coo = elements
        .par_iter()
        .zip(connectivity)
        .try_fold(
            || CooMatrix::new(num_nodes, num_nodes),
            |mut coo, (element, element_nodes)| {
                distribute_local_to_global(&mut coo, element_nodes.as_ref(), &element_matrix(element))?;
                Ok::<_, eyre::Report>(coo)
            },
        )
        .try_reduce(
            || CooMatrix::new(num_nodes, num_nodes),
            |mut coo1, coo2| {
                for (i, j, v) in coo2.triplet_iter() {
                    coo1.push(i, j, *v);
                }
                Ok(coo1)
            },
        )?;
    Ok(CscMatrix::from(&coo))
}

/// Assembles the global vector of length `num_nodes` from per-element vectors.
pub fn assemble_vector<T, C, Connectivity, F, const D: usize>(
    num_nodes: usize,
    elements: &[RectangularElement<T, C, D>],
    connectivity: &[Connectivity],
    element_vector: F,
) -> eyre::Result<DVector<T>>
where
    T: Real,
    C: CanonicalElement<D>,
    Const<D>: SmallDim,
    Connectivity: AsRef<[usize]>,
    F: Fn(&RectangularElement<T, C, D>) -> DVector<T>,
{
    validate_connectivity(num_nodes, C::NUM_NODES, elements.len(), connectivity)?;
    let mut vector = DVector::zeros(num_nodes);
    for (element, element_nodes) in elements.iter().zip(connectivity) {
        let element_nodes = element_nodes.as_ref();
        let local = element_vector(element);
        if local.len() != element_nodes.len() {
            return Err(eyre!(
                "Element vector has length {}, expected {}",
                local.len(),
                element_nodes.len()
            ));
        }
        for (i_local, &i_global) in element_nodes.iter().enumerate() {
            vector[i_global] += local[i_local];
        }
    }
    Ok(vector)
}

/// Imposes `u[dof] = value` for each given condition by symmetric elimination.
///
/// The known values are moved to the right-hand side, the constrained rows and columns are
/// zeroed and their diagonal entries set to one. The sparsity pattern is left unchanged, so a
/// solver that analyzed the unconstrained matrix can factorize the result directly.
/// Symmetric positive semi-definite matrices whose kernel is removed by the conditions become
/// positive definite.
pub fn apply_dirichlet_conditions<T: Real>(
    matrix: &mut CscMatrix<T>,
    rhs: &mut DVector<T>,
    conditions: &[(usize, T)],
) -> eyre::Result<()> {
    let n = matrix.nrows();
    if matrix.ncols() != n || rhs.len() != n {
        return Err(eyre!(
            "Incompatible system: {}x{} matrix with right-hand side of length {}",
            n,
            matrix.ncols(),
            rhs.len()
        ));
    }

    let mut prescribed = vec![None; n];
    for &(dof, value) in conditions {
        if dof >= n {
            return Err(eyre!("Dirichlet condition on dof {}, but system has dimension {}", dof, n));
        }
        if matrix.pattern().lane(dof).binary_search(&dof).is_err() {
            return Err(eyre!("Dirichlet condition on dof {} without diagonal entry", dof));
        }
        prescribed[dof] = Some(value);
    }

    for (j, column) in matrix.col_iter().enumerate() {
        if let Some(g) = prescribed[j] {
            for (&i, &a_ij) in column.row_indices().iter().zip(column.values()) {
                rhs[i] -= a_ij * g;
            }
        }
    }

    let (offsets, row_indices, values) = matrix.csc_data_mut();
    for j in 0..n {
        for k in offsets[j]..offsets[j + 1] {
            let i = row_indices[k];
            if prescribed[i].is_some() || prescribed[j].is_some() {
                values[k] = if i == j { T::one() } else { T::zero() };
            }
        }
    }

    for (dof, value) in prescribed.into_iter().enumerate() {
        if let Some(g) = value {
            rhs[dof] = g;
        }
    }
    Ok(())
}
