//! ManifoldDynamics - manifold-aware robot dynamics kernel
//!
//! This crate provides the numeric core shared by trajectory-optimization
//! and motion-planning benchmarks: state-space algebra that handles angular
//! wrap-around uniformly with Euclidean components, a generic integrator
//! with exact Jacobians via the manifold chain rule, signed-distance
//! collision queries, and time interpolation along manifold trajectories.

// Core modules
pub mod common;
pub mod state_space;

// Kernel modules
pub mod collision;
pub mod dynamics;
pub mod interpolation;

// Re-export common types for convenience
pub use common::{DynamicsError, DynamicsResult};
pub use state_space::{AngularMix, Compound, Euclidean, StateSpace};
pub use collision::{Broadphase, CollisionEngine, CollisionOut, StaticEnvironment};
pub use dynamics::{Dynamics, Model, TrajectoryBuffer, Workspace};
pub use interpolation::{linear_interpolation, Interpolator};
