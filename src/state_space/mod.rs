//! State-space algebra for manifold-aware dynamics
//!
//! A state space is either a leaf (pure Euclidean, or Euclidean with a set
//! of angular wrap-around components) or a compound of two state spaces.
//! All algebra dispatches structurally over this closed set of variants;
//! there is no open inheritance hierarchy.
//!
//! The core contract, for every variant:
//! - `integrate(x0, diff(x0, x1)) == x1` (round-trip law)
//! - `diff(x, x) == 0`
//! - Jacobians of `diff`/`integrate` are consistent with the operations.

pub mod angular;
pub mod compound;
pub mod euclidean;

pub use angular::AngularMix;
pub use compound::Compound;
pub use euclidean::Euclidean;

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use std::sync::Arc;

use crate::common::{DynamicsError, DynamicsResult};

/// Eager dimension check shared by every state-space operation.
pub(crate) fn check_len(what: &str, got: usize, want: usize) -> DynamicsResult<()> {
    if got != want {
        Err(DynamicsError::precondition(format!(
            "{} has size {}, expected {}",
            what, got, want
        )))
    } else {
        Ok(())
    }
}

/// A state space with possibly-wrapping components.
///
/// States are dense `nx` vectors; perturbations and velocities live in the
/// tangent space of dimension `tangent_dim() <= dim()` (equal for all
/// currently provided variants). Shared by reference (`Arc`) between a
/// robot model, compounds, and interpolators.
#[derive(Debug, Clone)]
pub enum StateSpace {
    Euclidean(Euclidean),
    AngularMix(AngularMix),
    Compound(Compound),
}

impl StateSpace {
    /// Pure Euclidean space of the given dimension
    pub fn euclidean(dim: usize) -> Self {
        StateSpace::Euclidean(Euclidean::new(dim))
    }

    /// Euclidean space with wrap-around components at `angular_indices`
    pub fn angular_mix(dim: usize, angular_indices: Vec<usize>) -> DynamicsResult<Self> {
        Ok(StateSpace::AngularMix(AngularMix::new(
            dim,
            angular_indices,
        )?))
    }

    /// Block composition of two spaces
    pub fn compound(first: Arc<StateSpace>, second: Arc<StateSpace>) -> Self {
        StateSpace::Compound(Compound::new(first, second))
    }

    /// State dimension (`nx`)
    pub fn dim(&self) -> usize {
        match self {
            StateSpace::Euclidean(s) => s.dim(),
            StateSpace::AngularMix(s) => s.dim(),
            StateSpace::Compound(s) => s.dim(),
        }
    }

    /// Tangent-space dimension (`ndx <= nx`)
    pub fn tangent_dim(&self) -> usize {
        match self {
            StateSpace::Euclidean(s) => s.dim(),
            StateSpace::AngularMix(s) => s.dim(),
            StateSpace::Compound(s) => s.tangent_dim(),
        }
    }

    /// The neutral/reference point of the space
    pub fn zero(&self) -> DVector<f64> {
        match self {
            StateSpace::Euclidean(s) => s.zero(),
            StateSpace::AngularMix(s) => s.zero(),
            StateSpace::Compound(s) => s.zero(),
        }
    }

    /// A state drawn from a bounded uniform-ish distribution
    pub fn sample(&self) -> DVector<f64> {
        match self {
            StateSpace::Euclidean(s) => s.sample(),
            StateSpace::AngularMix(s) => s.sample(),
            StateSpace::Compound(s) => s.sample(),
        }
    }

    /// `out = x1 (-) x0`, the tangent vector from `x0` to `x1`
    pub fn diff_into(
        &self,
        x0: DVectorView<f64>,
        x1: DVectorView<f64>,
        out: DVectorViewMut<f64>,
    ) -> DynamicsResult<()> {
        match self {
            StateSpace::Euclidean(s) => s.diff_into(x0, x1, out),
            StateSpace::AngularMix(s) => s.diff_into(x0, x1, out),
            StateSpace::Compound(s) => s.diff_into(x0, x1, out),
        }
    }

    /// `out = x (+) dx`
    pub fn integrate_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        out: DVectorViewMut<f64>,
    ) -> DynamicsResult<()> {
        match self {
            StateSpace::Euclidean(s) => s.integrate_into(x, dx, out),
            StateSpace::AngularMix(s) => s.integrate_into(x, dx, out),
            StateSpace::Compound(s) => s.integrate_into(x, dx, out),
        }
    }

    /// Jacobians of `diff` with respect to both arguments
    pub fn jdiff_into(
        &self,
        x0: DVectorView<f64>,
        x1: DVectorView<f64>,
        j_x0: DMatrixViewMut<f64>,
        j_x1: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        match self {
            StateSpace::Euclidean(s) => s.jdiff_into(x0, x1, j_x0, j_x1),
            StateSpace::AngularMix(s) => s.jdiff_into(x0, x1, j_x0, j_x1),
            StateSpace::Compound(s) => s.jdiff_into(x0, x1, j_x0, j_x1),
        }
    }

    /// Jacobians of `integrate` with respect to both arguments
    pub fn jintegrate_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        j_x: DMatrixViewMut<f64>,
        j_dx: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        match self {
            StateSpace::Euclidean(s) => s.jintegrate_into(x, dx, j_x, j_dx),
            StateSpace::AngularMix(s) => s.jintegrate_into(x, dx, j_x, j_dx),
            StateSpace::Compound(s) => s.jintegrate_into(x, dx, j_x, j_dx),
        }
    }

    /// Transport `jin` from the tangent frame at `x` into the frame at
    /// `integrate(x, dx)`. Leaves opt out; a compound recurses into its
    /// children row blocks.
    pub fn jintegrate_transport_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        jin: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        match self {
            StateSpace::Euclidean(s) => s.jintegrate_transport_into(x, dx, jin),
            StateSpace::AngularMix(s) => s.jintegrate_transport_into(x, dx, jin),
            StateSpace::Compound(s) => s.jintegrate_transport_into(x, dx, jin),
        }
    }

    /// Owned-return convenience wrapper around [`StateSpace::diff_into`]
    pub fn diff(&self, x0: &DVector<f64>, x1: &DVector<f64>) -> DynamicsResult<DVector<f64>> {
        let mut out = DVector::zeros(self.tangent_dim());
        let t = out.len();
        self.diff_into(x0.rows(0, x0.len()), x1.rows(0, x1.len()), out.rows_mut(0, t))?;
        Ok(out)
    }

    /// Owned-return convenience wrapper around [`StateSpace::integrate_into`]
    pub fn integrate(&self, x: &DVector<f64>, dx: &DVector<f64>) -> DynamicsResult<DVector<f64>> {
        let mut out = DVector::zeros(self.dim());
        let n = out.len();
        self.integrate_into(x.rows(0, x.len()), dx.rows(0, dx.len()), out.rows_mut(0, n))?;
        Ok(out)
    }

    /// Owned-return convenience wrapper around [`StateSpace::jdiff_into`]
    pub fn jdiff(
        &self,
        x0: &DVector<f64>,
        x1: &DVector<f64>,
    ) -> DynamicsResult<(DMatrix<f64>, DMatrix<f64>)> {
        let t = self.tangent_dim();
        let mut j_x0 = DMatrix::zeros(t, t);
        let mut j_x1 = DMatrix::zeros(t, t);
        self.jdiff_into(
            x0.rows(0, x0.len()),
            x1.rows(0, x1.len()),
            j_x0.view_mut((0, 0), (t, t)),
            j_x1.view_mut((0, 0), (t, t)),
        )?;
        Ok((j_x0, j_x1))
    }

    /// Owned-return convenience wrapper around [`StateSpace::jintegrate_into`]
    pub fn jintegrate(
        &self,
        x: &DVector<f64>,
        dx: &DVector<f64>,
    ) -> DynamicsResult<(DMatrix<f64>, DMatrix<f64>)> {
        let t = self.tangent_dim();
        let mut j_x = DMatrix::zeros(t, t);
        let mut j_dx = DMatrix::zeros(t, t);
        self.jintegrate_into(
            x.rows(0, x.len()),
            dx.rows(0, dx.len()),
            j_x.view_mut((0, 0), (t, t)),
            j_dx.view_mut((0, 0), (t, t)),
        )?;
        Ok((j_x, j_dx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_law_every_variant() {
        let spaces = vec![
            StateSpace::euclidean(4),
            StateSpace::angular_mix(3, vec![2]).unwrap(),
            StateSpace::compound(
                Arc::new(StateSpace::angular_mix(2, vec![0, 1]).unwrap()),
                Arc::new(StateSpace::euclidean(3)),
            ),
        ];
        for space in &spaces {
            for _ in 0..20 {
                let x0 = space.sample();
                let x1 = space.sample();
                let dx = space.diff(&x0, &x1).unwrap();
                let back = space.integrate(&x0, &dx).unwrap();
                assert!(
                    (back - &x1).norm() < 1e-12,
                    "roundtrip failed for {:?}",
                    space
                );
            }
        }
    }

    #[test]
    fn test_diff_of_self_is_zero_every_variant() {
        let spaces = vec![
            StateSpace::euclidean(2),
            StateSpace::angular_mix(2, vec![1]).unwrap(),
        ];
        for space in &spaces {
            let x = space.sample();
            let dx = space.diff(&x, &x).unwrap();
            assert!(dx.norm() < 1e-15);
        }
    }

    #[test]
    fn test_zero_is_neutral() {
        let space = StateSpace::angular_mix(3, vec![1]).unwrap();
        let z = space.zero();
        assert_eq!(z.len(), 3);
        assert!(z.norm() == 0.0);
    }
}
