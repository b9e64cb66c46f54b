//! Common error types, constants, and numeric helpers for manifold_dynamics
//!
//! This module provides the foundational building blocks used across
//! the dynamics, collision, and interpolation kernels.

pub mod constants;
pub mod error;
pub mod math;

pub use constants::*;
pub use error::*;
pub use math::*;
