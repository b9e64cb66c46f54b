//! Time interpolation along a sequence of manifold states
//!
//! Interpolation runs per segment through the state space's
//! `diff`/`integrate`, so angular components take the short arc instead
//! of blending raw coordinates, and the time Jacobian is exact under the
//! integrate Jacobian rather than a finite-difference approximation.

use itertools::Itertools;
use nalgebra::DVector;
use std::sync::Arc;
use tracing::warn;

use crate::common::{constants, DynamicsError, DynamicsResult};
use crate::state_space::StateSpace;

/// Interpolate a timestamped state sequence at `t_query`.
///
/// Returns the interpolated state and its derivative with respect to the
/// query time (`J2 * diff / segment_duration`). Queries outside the knot
/// range extrapolate on the first or last segment; this and
/// near-duplicate knots are degraded conditions that log a warning and
/// proceed with the defined fallback.
pub fn linear_interpolation(
    times: &[f64],
    states: &[DVector<f64>],
    t_query: f64,
    space: &StateSpace,
) -> DynamicsResult<(DVector<f64>, DVector<f64>)> {
    if states.is_empty() {
        return Err(DynamicsError::precondition("empty state sequence"));
    }
    if times.len() != states.len() {
        return Err(DynamicsError::precondition(format!(
            "{} timestamps for {} states",
            times.len(),
            states.len()
        )));
    }
    let n = times.len();
    if n == 1 {
        return Ok((states[0].clone(), DVector::zeros(space.tangent_dim())));
    }

    let index = if t_query < times[0] {
        warn!(
            "extrapolating before the first knot: t_query = {}, t_first = {}",
            t_query, times[0]
        );
        1
    } else if t_query >= times[n - 1] {
        warn!(
            "extrapolating at or past the last knot: t_query = {}, t_last = {}",
            t_query,
            times[n - 1]
        );
        n - 1
    } else {
        // first knot strictly greater than the query time
        times.partition_point(|&t| t <= t_query)
    };

    let dt_seg = times[index] - times[index - 1];
    if dt_seg < constants::DUPLICATE_TIME_EPS {
        warn!(
            "near-duplicate knots at {} and {}, clamping the interpolation factor",
            times[index - 1],
            times[index]
        );
    }
    let factor = (t_query - times[index - 1]) / dt_seg.max(constants::DUPLICATE_TIME_EPS);

    let diff = space.diff(&states[index - 1], &states[index])?;
    let dx = factor * &diff;
    let out = space.integrate(&states[index - 1], &dx)?;
    let (_, j2) = space.jintegrate(&states[index - 1], &dx)?;
    let jx = (&j2 * &diff) / dt_seg;
    Ok((out, jx))
}

/// A timestamped state sequence bound to its state space.
pub struct Interpolator {
    times: Vec<f64>,
    states: Vec<DVector<f64>>,
    space: Arc<StateSpace>,
}

impl Interpolator {
    /// Sequence over a purely Euclidean space of the state dimension
    pub fn new(times: Vec<f64>, states: Vec<DVector<f64>>) -> DynamicsResult<Self> {
        let dim = states
            .first()
            .map(|x| x.len())
            .ok_or_else(|| DynamicsError::precondition("empty state sequence"))?;
        Self::with_space(times, states, Arc::new(StateSpace::euclidean(dim)))
    }

    /// Sequence over an explicit state space
    pub fn with_space(
        times: Vec<f64>,
        states: Vec<DVector<f64>>,
        space: Arc<StateSpace>,
    ) -> DynamicsResult<Self> {
        if states.is_empty() {
            return Err(DynamicsError::precondition("empty state sequence"));
        }
        if times.len() != states.len() {
            return Err(DynamicsError::precondition(format!(
                "{} timestamps for {} states",
                times.len(),
                states.len()
            )));
        }
        if !times.iter().tuple_windows().all(|(a, b)| a <= b) {
            return Err(DynamicsError::precondition(
                "timestamps must be non-decreasing",
            ));
        }
        Ok(Interpolator {
            times,
            states,
            space,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[DVector<f64>] {
        &self.states
    }

    pub fn interpolate(&self, t_query: f64) -> DynamicsResult<(DVector<f64>, DVector<f64>)> {
        linear_interpolation(&self.times, &self.states, t_query, &self.space)
    }
}
