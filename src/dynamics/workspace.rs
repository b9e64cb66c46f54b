//! Caller-owned scratch buffers for dynamics evaluation

use nalgebra::{DMatrix, DVector, Isometry3};

/// Scratch space for one evaluation thread.
///
/// A [`Model`](super::Model) is immutable during queries; all transient
/// buffers (velocity, Jacobians, RK4 stages, collision poses) live here.
/// Create one workspace per worker with
/// [`Model::workspace`](super::Model::workspace) and reuse it across
/// calls; concurrent evaluation needs one workspace per thread.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Tangent-space velocity returned by the robot's velocity field
    pub(crate) v: DVector<f64>,
    /// Velocity Jacobian with respect to the state
    pub(crate) jv_x: DMatrix<f64>,
    /// Velocity Jacobian with respect to the control
    pub(crate) jv_u: DMatrix<f64>,
    /// Integrate Jacobian with respect to the base point
    pub(crate) j_first: DMatrix<f64>,
    /// Integrate Jacobian with respect to the increment
    pub(crate) j_second: DMatrix<f64>,
    // RK4 stages
    pub(crate) k1: DVector<f64>,
    pub(crate) k2: DVector<f64>,
    pub(crate) k3: DVector<f64>,
    pub(crate) k4: DVector<f64>,
    pub(crate) x_stage: DVector<f64>,
    /// World poses of the registered collision shapes
    pub(crate) poses: Vec<Isometry3<f64>>,
}

impl Workspace {
    pub(crate) fn new(nx: usize, nu: usize, ndx: usize, num_shapes: usize) -> Self {
        Workspace {
            v: DVector::zeros(ndx),
            jv_x: DMatrix::zeros(ndx, nx),
            jv_u: DMatrix::zeros(ndx, nu),
            j_first: DMatrix::zeros(ndx, ndx),
            j_second: DMatrix::zeros(ndx, ndx),
            k1: DVector::zeros(ndx),
            k2: DVector::zeros(ndx),
            k3: DVector::zeros(ndx),
            k4: DVector::zeros(ndx),
            x_stage: DVector::zeros(nx),
            poses: vec![Isometry3::identity(); num_shapes],
        }
    }
}
