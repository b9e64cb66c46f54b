//! Generic robot model: manifold-aware stepping, differentiation,
//! rollouts, and collision queries

use nalgebra::{DMatrix, DVector, DVectorView, Isometry3, Translation3, UnitQuaternion, Vector3};
use parry3d_f64::shape::SharedShape;
use rand::Rng;
use std::sync::Arc;

use crate::collision::{Broadphase, CollisionEngine, CollisionOut};
use crate::common::{bounds_distance, constants, DynamicsError, DynamicsResult};
use crate::state_space::StateSpace;

use super::trajectory::TrajectoryBuffer;
use super::workspace::Workspace;

/// Capability interface a concrete robot supplies to [`Model`].
///
/// The two velocity methods are the required core: a robot provides its
/// flat velocity field and the field's Jacobians, and the model turns
/// them into manifold-correct steps and step Jacobians. Everything else
/// has a default: either a generic fallback a robot may override, or an
/// opt-in capability that fails with `NotImplemented` until the robot
/// provides it.
pub trait Dynamics {
    /// Velocity `v(x, u)` in the tangent space (`calcV`)
    fn velocity(&self, v: &mut DVector<f64>, x: &DVector<f64>, u: &DVector<f64>)
        -> DynamicsResult<()>;

    /// Jacobians of the velocity field with respect to state and control
    /// (`calcDiffV`); `jv_x` is `ndx x nx`, `jv_u` is `ndx x nu`
    fn velocity_jacobian(
        &self,
        jv_x: &mut DMatrix<f64>,
        jv_u: &mut DMatrix<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> DynamicsResult<()>;

    /// World poses of the registered collision shapes at state `x`.
    ///
    /// Default: a planar robot with a single shape posed from
    /// `(x[0], x[1])` and yaw `x[2]`.
    fn collision_poses(
        &self,
        x: &DVector<f64>,
        poses: &mut [Isometry3<f64>],
    ) -> DynamicsResult<()> {
        if x.len() < 3 {
            return Err(DynamicsError::precondition(format!(
                "planar collision pose needs at least 3 state components, got {}",
                x.len()
            )));
        }
        if poses.len() != 1 {
            return Err(DynamicsError::precondition(format!(
                "planar collision pose covers exactly 1 shape, got {}",
                poses.len()
            )));
        }
        poses[0] = Isometry3::from_parts(
            Translation3::new(x[0], x[1], 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), x[2]),
        );
        Ok(())
    }

    /// Distance between two raw states. Default is the plain Euclidean
    /// norm of the difference, deliberately not manifold-aware; robots
    /// with angular components are expected to override using their
    /// state space's `diff`.
    fn distance(&self, x: &DVector<f64>, y: &DVector<f64>) -> f64 {
        (x - y).norm()
    }

    /// Straight-line interpolation between two raw states. Not
    /// manifold-aware by default, same caveat as [`Dynamics::distance`].
    fn interpolate(&self, from: &DVector<f64>, to: &DVector<f64>, alpha: f64) -> DVector<f64> {
        from + alpha * (to - from)
    }

    /// Regularization residual (opt-in capability)
    fn regularization(
        &self,
        _r: &mut DVector<f64>,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
    ) -> DynamicsResult<()> {
        Err(DynamicsError::not_implemented("regularization"))
    }

    /// Jacobians of the regularization residual (opt-in capability)
    fn regularization_jacobian(
        &self,
        _jx: &mut DMatrix<f64>,
        _ju: &mut DMatrix<f64>,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
    ) -> DynamicsResult<()> {
        Err(DynamicsError::not_implemented("regularization_jacobian"))
    }

    /// Admissible-time lower bound between two states (opt-in capability)
    fn lower_bound_time(&self, _x: &DVector<f64>, _y: &DVector<f64>) -> DynamicsResult<f64> {
        Err(DynamicsError::not_implemented("lower_bound_time"))
    }
}

/// Validity predicate used by rollouts: returns false to stop.
pub type ValidityFn<'a> = dyn FnMut(DVectorView<f64>) -> bool + 'a;

/// A robot model over a state space: bounds, weights, collision shapes,
/// and the generic integrator.
///
/// The model itself is immutable during evaluation; per-call scratch
/// lives in a [`Workspace`], so one model can serve many workers as long
/// as each brings its own workspace.
pub struct Model<D: Dynamics> {
    name: String,
    dynamics: D,
    space: Arc<StateSpace>,
    nx: usize,
    nu: usize,
    /// Leading state components that can affect collision geometry; the
    /// distance gradient is zero past this count
    nx_col: usize,
    /// Leading state components forming a free spatial offset
    translation_invariance: usize,
    ref_dt: f64,
    x_lb: DVector<f64>,
    x_ub: DVector<f64>,
    u_lb: DVector<f64>,
    u_ub: DVector<f64>,
    u_ref: DVector<f64>,
    u_weight: DVector<f64>,
    x_weight: DVector<f64>,
    r_weight: DVector<f64>,
    collision: CollisionEngine,
}

impl<D: Dynamics> Model<D> {
    /// Build a model with the default configuration: bounds at
    /// `±DEFAULT_BOUND`, control weight `0.1`, unit diff weight, zero
    /// state weight. A configuration loader is expected to overwrite
    /// these through the setters.
    pub fn new(dynamics: D, space: Arc<StateSpace>, nu: usize) -> Self {
        let nx = space.dim();
        let ntan = space.tangent_dim();
        Model {
            name: String::from("robot"),
            dynamics,
            space,
            nx,
            nu,
            nx_col: 0,
            translation_invariance: 0,
            ref_dt: constants::DEFAULT_REF_DT,
            x_lb: DVector::from_element(nx, -constants::DEFAULT_BOUND),
            x_ub: DVector::from_element(nx, constants::DEFAULT_BOUND),
            u_lb: DVector::from_element(nu, -constants::DEFAULT_BOUND),
            u_ub: DVector::from_element(nu, constants::DEFAULT_BOUND),
            u_ref: DVector::zeros(nu),
            u_weight: DVector::from_element(nu, constants::DEFAULT_CONTROL_WEIGHT),
            x_weight: DVector::zeros(nx),
            r_weight: DVector::from_element(ntan, 1.0),
            collision: CollisionEngine::new(),
        }
    }

    /// Scratch buffers sized for this model. Create after the collision
    /// shapes are registered so the pose buffer matches.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(
            self.nx,
            self.nu,
            self.space.tangent_dim(),
            self.collision.num_shapes(),
        )
    }

    // ---- accessors -------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn nu(&self) -> usize {
        self.nu
    }

    pub fn nx_col(&self) -> usize {
        self.nx_col
    }

    pub fn translation_invariance(&self) -> usize {
        self.translation_invariance
    }

    pub fn ref_dt(&self) -> f64 {
        self.ref_dt
    }

    pub fn state_space(&self) -> &Arc<StateSpace> {
        &self.space
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn x_lb(&self) -> &DVector<f64> {
        &self.x_lb
    }

    pub fn x_ub(&self) -> &DVector<f64> {
        &self.x_ub
    }

    pub fn u_lb(&self) -> &DVector<f64> {
        &self.u_lb
    }

    pub fn u_ub(&self) -> &DVector<f64> {
        &self.u_ub
    }

    pub fn u_ref(&self) -> &DVector<f64> {
        &self.u_ref
    }

    pub fn u_weight(&self) -> &DVector<f64> {
        &self.u_weight
    }

    pub fn x_weight(&self) -> &DVector<f64> {
        &self.x_weight
    }

    pub fn r_weight(&self) -> &DVector<f64> {
        &self.r_weight
    }

    pub fn collision(&self) -> &CollisionEngine {
        &self.collision
    }

    // ---- configuration ---------------------------------------------

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_ref_dt(&mut self, ref_dt: f64) {
        self.ref_dt = ref_dt;
    }

    pub fn set_translation_invariance(&mut self, count: usize) -> DynamicsResult<()> {
        if count > self.nx {
            return Err(DynamicsError::precondition(format!(
                "translation invariance {} exceeds state dimension {}",
                count, self.nx
            )));
        }
        self.translation_invariance = count;
        Ok(())
    }

    pub fn set_nx_col(&mut self, nx_col: usize) -> DynamicsResult<()> {
        if nx_col > self.nx {
            return Err(DynamicsError::precondition(format!(
                "nx_col {} exceeds state dimension {}",
                nx_col, self.nx
            )));
        }
        self.nx_col = nx_col;
        Ok(())
    }

    pub fn set_state_bounds(&mut self, lb: DVector<f64>, ub: DVector<f64>) -> DynamicsResult<()> {
        self.check_state_dim(&lb)?;
        self.check_state_dim(&ub)?;
        self.x_lb = lb;
        self.x_ub = ub;
        Ok(())
    }

    pub fn set_control_bounds(&mut self, lb: DVector<f64>, ub: DVector<f64>) -> DynamicsResult<()> {
        self.check_control_dim(&lb)?;
        self.check_control_dim(&ub)?;
        self.u_lb = lb;
        self.u_ub = ub;
        Ok(())
    }

    /// Overwrite the bounds of the leading position components only
    pub fn set_position_bounds(
        &mut self,
        p_lb: &DVector<f64>,
        p_ub: &DVector<f64>,
    ) -> DynamicsResult<()> {
        if p_lb.len() != p_ub.len() || p_lb.len() > self.nx {
            return Err(DynamicsError::precondition(format!(
                "position bounds of sizes {} and {} for state dimension {}",
                p_lb.len(),
                p_ub.len(),
                self.nx
            )));
        }
        let p = p_lb.len();
        self.x_lb.rows_mut(0, p).copy_from(p_lb);
        self.x_ub.rows_mut(0, p).copy_from(p_ub);
        Ok(())
    }

    pub fn set_position_lb(&mut self, p: &DVector<f64>) -> DynamicsResult<()> {
        self.check_offset_dim(p)?;
        self.x_lb.rows_mut(0, p.len()).copy_from(p);
        Ok(())
    }

    pub fn set_position_ub(&mut self, p: &DVector<f64>) -> DynamicsResult<()> {
        self.check_offset_dim(p)?;
        self.x_ub.rows_mut(0, p.len()).copy_from(p);
        Ok(())
    }

    pub fn set_control_weight(&mut self, w: DVector<f64>) -> DynamicsResult<()> {
        self.check_control_dim(&w)?;
        self.u_weight = w;
        Ok(())
    }

    pub fn set_state_weight(&mut self, w: DVector<f64>) -> DynamicsResult<()> {
        self.check_state_dim(&w)?;
        self.x_weight = w;
        Ok(())
    }

    pub fn set_diff_weight(&mut self, w: DVector<f64>) -> DynamicsResult<()> {
        if w.len() != self.space.tangent_dim() {
            return Err(DynamicsError::precondition(format!(
                "diff weight has size {}, expected {}",
                w.len(),
                self.space.tangent_dim()
            )));
        }
        self.r_weight = w;
        Ok(())
    }

    pub fn set_control_reference(&mut self, u_ref: DVector<f64>) -> DynamicsResult<()> {
        self.check_control_dim(&u_ref)?;
        self.u_ref = u_ref;
        Ok(())
    }

    pub fn register_collision_shape(&mut self, shape: SharedShape) {
        self.collision.register_shape(shape);
    }

    pub fn set_environment(&mut self, env: Arc<dyn Broadphase>) {
        self.collision.set_environment(env);
    }

    // ---- stepping --------------------------------------------------

    /// One Euler step on the manifold:
    /// `x_next = integrate(x, velocity(x, u) * dt)`
    pub fn step_into(
        &self,
        ws: &mut Workspace,
        x_next: &mut DVector<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> DynamicsResult<()> {
        self.check_state_dim(x)?;
        self.check_control_dim(u)?;
        self.check_state_dim(x_next)?;
        self.dynamics.velocity(&mut ws.v, x, u)?;
        ws.v *= dt;
        self.space.integrate_into(
            x.rows(0, self.nx),
            ws.v.rows(0, ws.v.len()),
            x_next.rows_mut(0, self.nx),
        )
    }

    /// Owned-return convenience wrapper around [`Model::step_into`]
    pub fn step(
        &self,
        ws: &mut Workspace,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> DynamicsResult<DVector<f64>> {
        let mut x_next = DVector::zeros(self.nx);
        self.step_into(ws, &mut x_next, x, u, dt)?;
        Ok(x_next)
    }

    /// Exact Jacobians of [`Model::step`] via the manifold chain rule:
    /// `Fx = Jfirst + Jsecond * dt * Jv_x`, `Fu = Jsecond * dt * Jv_u`,
    /// where `(Jfirst, Jsecond)` are the integrate Jacobians at
    /// `(x, v*dt)` and `(Jv_x, Jv_u)` the robot velocity Jacobians.
    ///
    /// This is the identity that lets a robot provide only its flat
    /// velocity field while differentiation through angle wrapping is
    /// handled here, once.
    pub fn step_diff_into(
        &self,
        ws: &mut Workspace,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> DynamicsResult<()> {
        self.check_state_dim(x)?;
        self.check_control_dim(u)?;
        let ndx = self.space.tangent_dim();
        if fx.nrows() != ndx || fx.ncols() != ndx {
            return Err(DynamicsError::precondition(format!(
                "Fx is {}x{}, expected {}x{}",
                fx.nrows(),
                fx.ncols(),
                ndx,
                ndx
            )));
        }
        if fu.nrows() != ndx || fu.ncols() != self.nu {
            return Err(DynamicsError::precondition(format!(
                "Fu is {}x{}, expected {}x{}",
                fu.nrows(),
                fu.ncols(),
                ndx,
                self.nu
            )));
        }
        self.dynamics.velocity(&mut ws.v, x, u)?;
        self.dynamics.velocity_jacobian(&mut ws.jv_x, &mut ws.jv_u, x, u)?;
        ws.v *= dt;
        self.space.jintegrate_into(
            x.rows(0, self.nx),
            ws.v.rows(0, ws.v.len()),
            ws.j_first.view_mut((0, 0), (ndx, ndx)),
            ws.j_second.view_mut((0, 0), (ndx, ndx)),
        )?;
        fx.copy_from(&ws.j_first);
        fx.gemm(dt, &ws.j_second, &ws.jv_x, 1.0);
        fu.gemm(dt, &ws.j_second, &ws.jv_u, 0.0);
        Ok(())
    }

    /// Owned-return convenience wrapper around [`Model::step_diff_into`]
    pub fn step_diff(
        &self,
        ws: &mut Workspace,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> DynamicsResult<(DMatrix<f64>, DMatrix<f64>)> {
        let ndx = self.space.tangent_dim();
        let mut fx = DMatrix::zeros(ndx, ndx);
        let mut fu = DMatrix::zeros(ndx, self.nu);
        self.step_diff_into(ws, &mut fx, &mut fu, x, u, dt)?;
        Ok((fx, fu))
    }

    /// Classical fourth-order Runge-Kutta step over the same velocity
    /// field, with the combined increment applied through `integrate`.
    ///
    /// Higher accuracy than [`Model::step`], but there is no matching
    /// Jacobian variant; callers needing derivatives use the Euler path.
    pub fn step_rk4_into(
        &self,
        ws: &mut Workspace,
        x_next: &mut DVector<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> DynamicsResult<()> {
        self.check_state_dim(x)?;
        self.check_control_dim(u)?;
        self.check_state_dim(x_next)?;
        if self.space.tangent_dim() != self.nx {
            return Err(DynamicsError::not_implemented(
                "RK4 stages on a space with tangent_dim != dim",
            ));
        }
        self.dynamics.velocity(&mut ws.k1, x, u)?;
        ws.x_stage.copy_from(x);
        ws.x_stage.axpy(0.5 * dt, &ws.k1, 1.0);
        self.dynamics.velocity(&mut ws.k2, &ws.x_stage, u)?;
        ws.x_stage.copy_from(x);
        ws.x_stage.axpy(0.5 * dt, &ws.k2, 1.0);
        self.dynamics.velocity(&mut ws.k3, &ws.x_stage, u)?;
        ws.x_stage.copy_from(x);
        ws.x_stage.axpy(dt, &ws.k3, 1.0);
        self.dynamics.velocity(&mut ws.k4, &ws.x_stage, u)?;

        ws.v.copy_from(&ws.k1);
        ws.v.axpy(2.0, &ws.k2, 1.0);
        ws.v.axpy(2.0, &ws.k3, 1.0);
        ws.v.axpy(1.0, &ws.k4, 1.0);
        ws.v *= dt / 6.0;
        self.space.integrate_into(
            x.rows(0, self.nx),
            ws.v.rows(0, ws.v.len()),
            x_next.rows_mut(0, self.nx),
        )
    }

    /// Owned-return convenience wrapper around [`Model::step_rk4_into`]
    pub fn step_rk4(
        &self,
        ws: &mut Workspace,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> DynamicsResult<DVector<f64>> {
        let mut x_next = DVector::zeros(self.nx);
        self.step_rk4_into(ws, &mut x_next, x, u, dt)?;
        Ok(x_next)
    }

    // ---- rollouts --------------------------------------------------

    /// Apply [`Model::step`] repeatedly at `ref_dt` into a pre-allocated
    /// buffer. Requires `actions.len() + 1 == traj.capacity()`.
    ///
    /// With a validity predicate, the rollout stops at the first state
    /// the predicate rejects: the returned count (also written to
    /// `traj.set_len`) is the number of valid states, the rejected state
    /// stays in the slot just past the count for inspection, and later
    /// slots keep their previous contents.
    pub fn rollout(
        &self,
        ws: &mut Workspace,
        traj: &mut TrajectoryBuffer,
        x0: &DVector<f64>,
        actions: &[DVector<f64>],
        mut is_valid: Option<&mut ValidityFn>,
    ) -> DynamicsResult<usize> {
        self.check_state_dim(x0)?;
        if actions.len() + 1 != traj.capacity() {
            return Err(DynamicsError::precondition(format!(
                "{} actions for a trajectory buffer of capacity {}",
                actions.len(),
                traj.capacity()
            )));
        }
        if traj.nx() != self.nx {
            return Err(DynamicsError::precondition(format!(
                "trajectory buffer holds states of size {}, expected {}",
                traj.nx(),
                self.nx
            )));
        }
        let mut valid = actions.len() + 1;
        traj.state_mut(0).copy_from(x0);
        let mut x_cur = x0.clone();
        let mut x_next = DVector::zeros(self.nx);
        for (i, u) in actions.iter().enumerate() {
            self.step_into(ws, &mut x_next, &x_cur, u, self.ref_dt)?;
            traj.state_mut(i + 1).copy_from(&x_next);
            if let Some(pred) = is_valid.as_mut() {
                if !pred(traj.state(i + 1)) {
                    valid = i + 1;
                    break;
                }
            }
            std::mem::swap(&mut x_cur, &mut x_next);
        }
        traj.set_len(valid);
        Ok(valid)
    }

    /// Vector-returning rollout overload. The returned sequence holds the
    /// valid states plus, on early termination, the first rejected state.
    pub fn rollout_states(
        &self,
        ws: &mut Workspace,
        x0: &DVector<f64>,
        actions: &[DVector<f64>],
        mut is_valid: Option<&mut ValidityFn>,
    ) -> DynamicsResult<(Vec<DVector<f64>>, usize)> {
        self.check_state_dim(x0)?;
        let mut xs = Vec::with_capacity(actions.len() + 1);
        xs.push(x0.clone());
        let mut valid = actions.len() + 1;
        for (i, u) in actions.iter().enumerate() {
            let x_next = self.step(ws, &xs[i], u, self.ref_dt)?;
            xs.push(x_next);
            if let Some(pred) = is_valid.as_mut() {
                if !pred(xs[i + 1].rows(0, self.nx)) {
                    valid = i + 1;
                    break;
                }
            }
        }
        Ok((xs, valid))
    }

    // ---- metrics and residuals -------------------------------------

    /// Raw-state distance; delegates to the robot (default: Euclidean
    /// norm, not manifold-aware)
    pub fn distance(&self, x: &DVector<f64>, y: &DVector<f64>) -> DynamicsResult<f64> {
        self.check_state_dim(x)?;
        self.check_state_dim(y)?;
        Ok(self.dynamics.distance(x, y))
    }

    /// Raw-state interpolation; delegates to the robot (default:
    /// straight line, not manifold-aware)
    pub fn interpolate(
        &self,
        from: &DVector<f64>,
        to: &DVector<f64>,
        alpha: f64,
    ) -> DynamicsResult<DVector<f64>> {
        self.check_state_dim(from)?;
        self.check_state_dim(to)?;
        Ok(self.dynamics.interpolate(from, to, alpha))
    }

    /// Weighted manifold residual `r = r_weight .* (x1 (-) x0)`
    pub fn state_diff(&self, x0: &DVector<f64>, x1: &DVector<f64>) -> DynamicsResult<DVector<f64>> {
        let mut r = self.space.diff(x0, x1)?;
        r.component_mul_assign(&self.r_weight);
        Ok(r)
    }

    /// Jacobians of [`Model::state_diff`]; the diff Jacobians with their
    /// diagonals scaled by the residual weight
    pub fn state_diff_jacobian(
        &self,
        x0: &DVector<f64>,
        x1: &DVector<f64>,
    ) -> DynamicsResult<(DMatrix<f64>, DMatrix<f64>)> {
        let (mut j0, mut j1) = self.space.jdiff(x0, x1)?;
        for i in 0..self.r_weight.len() {
            j0[(i, i)] *= self.r_weight[i];
            j1[(i, i)] *= self.r_weight[i];
        }
        Ok((j0, j1))
    }

    /// Uniform sample inside the state box bounds
    pub fn sample_uniform(&self) -> DVector<f64> {
        let mut rng = rand::thread_rng();
        DVector::from_fn(self.nx, |i, _| {
            self.x_lb[i] + (self.x_ub[i] - self.x_lb[i]) * rng.gen_range(0.0..=1.0)
        })
    }

    // ---- validity and cost -----------------------------------------

    pub fn is_control_valid(&self, u: &DVector<f64>) -> DynamicsResult<bool> {
        self.check_control_dim(u)?;
        Ok(bounds_distance(u, &self.u_lb, &self.u_ub) < constants::CONTROL_BOUND_TOL)
    }

    pub fn is_state_valid(&self, x: &DVector<f64>) -> DynamicsResult<bool> {
        self.check_state_dim(x)?;
        let tol = constants::STATE_BOUND_TOL;
        for i in 0..self.nx {
            if x[i] < self.x_lb[i] - tol || x[i] > self.x_ub[i] + tol {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Aggregate bound check with a caller-chosen tolerance (see
    /// [`constants::STATE_CHECK_TOL`] for the conventional default)
    pub fn check_state(&self, x: &DVector<f64>, tolerance: f64) -> DynamicsResult<bool> {
        self.check_state_dim(x)?;
        Ok(bounds_distance(x, &self.x_lb, &self.x_ub) < tolerance)
    }

    /// Per-step cost; the default objective is time
    pub fn cost(&self, _x: &DVector<f64>, _u: &DVector<f64>) -> f64 {
        self.ref_dt
    }

    pub fn traj_cost(&self, xs: &[DVector<f64>], us: &[DVector<f64>]) -> DynamicsResult<f64> {
        if xs.len() != us.len() && xs.len() != us.len() + 1 {
            return Err(DynamicsError::precondition(format!(
                "{} states for {} actions",
                xs.len(),
                us.len()
            )));
        }
        let mut c = 0.0;
        for (x, u) in xs.iter().zip(us.iter()) {
            c += self.cost(x, u);
        }
        Ok(c)
    }

    // ---- translation invariance ------------------------------------

    pub fn offset_dim(&self) -> usize {
        self.translation_invariance
    }

    /// Extract the free spatial offset (the leading components)
    pub fn offset(&self, x: &DVector<f64>) -> DynamicsResult<DVector<f64>> {
        self.check_state_dim(x)?;
        Ok(x.rows(0, self.translation_invariance).into_owned())
    }

    /// Re-apply a spatial offset to a state
    pub fn transform_state(
        &self,
        p: &DVector<f64>,
        x: &DVector<f64>,
    ) -> DynamicsResult<DVector<f64>> {
        self.check_offset_dim(p)?;
        self.check_state_dim(x)?;
        let mut out = x.clone();
        for i in 0..self.translation_invariance {
            out[i] += p[i];
        }
        Ok(out)
    }

    /// Zero the free spatial offset, producing the canonical state a
    /// motion primitive is stored at
    pub fn canonical_state(&self, x: &DVector<f64>) -> DynamicsResult<DVector<f64>> {
        self.check_state_dim(x)?;
        let mut out = x.clone();
        for i in 0..self.translation_invariance {
            out[i] = 0.0;
        }
        Ok(out)
    }

    // ---- collision -------------------------------------------------

    /// True when the robot at `x` is collision-free. Requires an
    /// environment handle on the collision engine.
    pub fn collision_check(&self, ws: &mut Workspace, x: &DVector<f64>) -> DynamicsResult<bool> {
        self.check_state_dim(x)?;
        self.update_poses(ws, x)?;
        self.collision.check(&ws.poses)
    }

    /// Minimum signed distance from the robot at `x` to the environment
    pub fn collision_distance(
        &self,
        ws: &mut Workspace,
        x: &DVector<f64>,
    ) -> DynamicsResult<CollisionOut> {
        self.check_state_dim(x)?;
        self.update_poses(ws, x)?;
        self.collision.distance(&ws.poses)
    }

    /// Gradient of the collision distance with respect to the first
    /// `nx_col` state components, by central finite differences with
    /// step [`constants::COLLISION_FD_STEP`]; components past `nx_col`
    /// cannot move the geometry and get a zero gradient. Also returns
    /// the distance at `x`.
    pub fn collision_distance_diff(
        &self,
        ws: &mut Workspace,
        x: &DVector<f64>,
    ) -> DynamicsResult<(DVector<f64>, f64)> {
        self.check_state_dim(x)?;
        if self.nx_col == 0 || self.nx_col > self.nx {
            return Err(DynamicsError::precondition(format!(
                "collision gradient needs 0 < nx_col <= nx, got nx_col = {}",
                self.nx_col
            )));
        }
        let f = self.collision_distance(ws, x)?.distance;
        let eps = constants::COLLISION_FD_STEP;
        let mut grad = DVector::zeros(self.nx);
        let mut xp = x.clone();
        for i in 0..self.nx_col {
            xp[i] = x[i] + eps;
            let d_plus = self.collision_distance(ws, &xp)?.distance;
            xp[i] = x[i] - eps;
            let d_minus = self.collision_distance(ws, &xp)?.distance;
            grad[i] = (d_plus - d_minus) / (2.0 * eps);
            xp[i] = x[i];
        }
        Ok((grad, f))
    }

    // ---- opt-in capabilities ---------------------------------------

    pub fn regularization(
        &self,
        r: &mut DVector<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> DynamicsResult<()> {
        self.check_state_dim(x)?;
        self.check_control_dim(u)?;
        self.dynamics.regularization(r, x, u)
    }

    pub fn regularization_jacobian(
        &self,
        jx: &mut DMatrix<f64>,
        ju: &mut DMatrix<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> DynamicsResult<()> {
        self.check_state_dim(x)?;
        self.check_control_dim(u)?;
        self.dynamics.regularization_jacobian(jx, ju, x, u)
    }

    pub fn lower_bound_time(&self, x: &DVector<f64>, y: &DVector<f64>) -> DynamicsResult<f64> {
        self.check_state_dim(x)?;
        self.check_state_dim(y)?;
        self.dynamics.lower_bound_time(x, y)
    }

    // ---- internal --------------------------------------------------

    fn update_poses(&self, ws: &mut Workspace, x: &DVector<f64>) -> DynamicsResult<()> {
        let n = self.collision.num_shapes();
        if ws.poses.len() != n {
            ws.poses.resize(n, Isometry3::identity());
        }
        self.dynamics.collision_poses(x, &mut ws.poses)
    }

    fn check_state_dim(&self, x: &DVector<f64>) -> DynamicsResult<()> {
        if x.len() != self.nx {
            return Err(DynamicsError::precondition(format!(
                "state has size {}, expected {}",
                x.len(),
                self.nx
            )));
        }
        Ok(())
    }

    fn check_control_dim(&self, u: &DVector<f64>) -> DynamicsResult<()> {
        if u.len() != self.nu {
            return Err(DynamicsError::precondition(format!(
                "control has size {}, expected {}",
                u.len(),
                self.nu
            )));
        }
        Ok(())
    }

    fn check_offset_dim(&self, p: &DVector<f64>) -> DynamicsResult<()> {
        if p.len() != self.translation_invariance {
            return Err(DynamicsError::precondition(format!(
                "offset has size {}, expected {}",
                p.len(),
                self.translation_invariance
            )));
        }
        Ok(())
    }
}
