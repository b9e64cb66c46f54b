//! Named numeric constants shared across the kernel.
//!
//! Every sentinel or tolerance the kernel relies on lives here, so that a
//! magic number appears exactly once and carries a name.

/// Default magnitude for state and control box bounds when a robot has not
/// been configured yet.
pub const DEFAULT_BOUND: f64 = 1e8;

/// Signed distance reported when no collision environment is set.
/// Large enough that any planner treats the robot as unconstrained, small
/// enough to survive arithmetic without overflowing.
pub const FREE_SPACE_DISTANCE: f64 = 1e30;

/// Search horizon for the narrow-phase signed-distance query. Obstacle
/// pairs farther apart than this report [`FREE_SPACE_DISTANCE`].
pub const CONTACT_PREDICTION: f64 = 1e6;

/// Step size for the finite-difference collision distance gradient.
pub const COLLISION_FD_STEP: f64 = 1e-4;

/// Guard against division by near-duplicate interpolation timestamps.
pub const DUPLICATE_TIME_EPS: f64 = 1e-6;

/// Tolerance for control bound validity.
pub const CONTROL_BOUND_TOL: f64 = 1e-12;

/// Per-component tolerance for state bound validity.
pub const STATE_BOUND_TOL: f64 = 1e-8;

/// Default tolerance for the aggregate state bound check.
pub const STATE_CHECK_TOL: f64 = 1e-2;

/// Reference timestep used until a robot configuration overrides it.
pub const DEFAULT_REF_DT: f64 = 0.1;

/// Default weight on control effort.
pub const DEFAULT_CONTROL_WEIGHT: f64 = 0.1;
