//! Euclidean state space with independent angular components (RnSOn)

use nalgebra::{DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use rand::Rng;
use std::f64::consts::PI;

use crate::common::{wrap_angle, DynamicsError, DynamicsResult};
use super::check_len;

/// State space where a fixed set of index positions wrap around with
/// period `2*pi` and every other index is an unconstrained real.
///
/// `diff` on an angular component is the signed shortest arc in
/// `(-pi, pi]`; `integrate` wraps the sum back into the same interval.
/// The integrate Jacobians are identity diagonals: the wrap introduces a
/// derivative discontinuity only on a set of measure zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularMix {
    dim: usize,
    angular_indices: Vec<usize>,
}

impl AngularMix {
    /// Build a state space of `dim` components where `angular_indices`
    /// mark the wrap-around positions. Fails if an index is out of range.
    pub fn new(dim: usize, angular_indices: Vec<usize>) -> DynamicsResult<Self> {
        for &i in &angular_indices {
            if i >= dim {
                return Err(DynamicsError::precondition(format!(
                    "angular index {} out of range for dimension {}",
                    i, dim
                )));
            }
        }
        Ok(AngularMix {
            dim,
            angular_indices,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn angular_indices(&self) -> &[usize] {
        &self.angular_indices
    }

    pub fn zero(&self) -> DVector<f64> {
        DVector::zeros(self.dim)
    }

    /// Uniform draw from `[-1, 1]`, with angular components scaled to the
    /// full `[-pi, pi]` range
    pub fn sample(&self) -> DVector<f64> {
        let mut rng = rand::thread_rng();
        let mut x = DVector::from_fn(self.dim, |_, _| rng.gen_range(-1.0..=1.0));
        for &i in &self.angular_indices {
            x[i] *= PI;
        }
        x
    }

    pub(crate) fn diff_into(
        &self,
        x0: DVectorView<f64>,
        x1: DVectorView<f64>,
        mut out: DVectorViewMut<f64>,
    ) -> DynamicsResult<()> {
        check_len("diff x0", x0.len(), self.dim)?;
        check_len("diff x1", x1.len(), self.dim)?;
        check_len("diff out", out.len(), self.dim)?;
        for i in 0..self.dim {
            out[i] = x1[i] - x0[i];
        }
        for &i in &self.angular_indices {
            out[i] = wrap_angle(out[i]);
        }
        Ok(())
    }

    pub(crate) fn integrate_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        mut out: DVectorViewMut<f64>,
    ) -> DynamicsResult<()> {
        check_len("integrate x", x.len(), self.dim)?;
        check_len("integrate dx", dx.len(), self.dim)?;
        check_len("integrate out", out.len(), self.dim)?;
        for i in 0..self.dim {
            out[i] = x[i] + dx[i];
        }
        for &i in &self.angular_indices {
            out[i] = wrap_angle(out[i]);
        }
        Ok(())
    }

    pub(crate) fn jdiff_into(
        &self,
        x0: DVectorView<f64>,
        x1: DVectorView<f64>,
        mut j_x0: DMatrixViewMut<f64>,
        mut j_x1: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        check_len("Jdiff x0", x0.len(), self.dim)?;
        check_len("Jdiff x1", x1.len(), self.dim)?;
        check_len("Jdiff Jfirst rows", j_x0.nrows(), self.dim)?;
        check_len("Jdiff Jsecond rows", j_x1.nrows(), self.dim)?;
        j_x0.fill(0.0);
        j_x0.fill_diagonal(-1.0);
        j_x1.fill(0.0);
        j_x1.fill_diagonal(1.0);
        Ok(())
    }

    pub(crate) fn jintegrate_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        mut j_x: DMatrixViewMut<f64>,
        mut j_dx: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        check_len("Jintegrate x", x.len(), self.dim)?;
        check_len("Jintegrate dx", dx.len(), self.dim)?;
        check_len("Jintegrate Jfirst rows", j_x.nrows(), self.dim)?;
        check_len("Jintegrate Jsecond rows", j_dx.nrows(), self.dim)?;
        j_x.fill(0.0);
        j_x.fill_diagonal(1.0);
        j_dx.fill(0.0);
        j_dx.fill_diagonal(1.0);
        Ok(())
    }

    pub(crate) fn jintegrate_transport_into(
        &self,
        _x: DVectorView<f64>,
        _dx: DVectorView<f64>,
        _jin: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        Err(DynamicsError::not_implemented(
            "JintegrateTransport on AngularMix",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn so2() -> AngularMix {
        AngularMix::new(1, vec![0]).unwrap()
    }

    #[test]
    fn test_diff_takes_short_arc() {
        // from 3 rad to -3 rad the short way crosses pi: 2*pi - 6 forward
        let space = so2();
        let x0 = DVector::from_vec(vec![3.0]);
        let x1 = DVector::from_vec(vec![-3.0]);
        let mut dx = DVector::zeros(1);
        space
            .diff_into(x0.rows(0, 1), x1.rows(0, 1), dx.rows_mut(0, 1))
            .unwrap();
        let expected = 2.0 * PI - 6.0;
        assert!((dx[0] - expected).abs() < 1e-12);
        assert!(dx[0].abs() < PI);
    }

    #[test]
    fn test_diff_integrate_roundtrip_across_wrap() {
        let space = so2();
        let x0 = DVector::from_vec(vec![3.0]);
        let x1 = DVector::from_vec(vec![-3.0]);
        let mut dx = DVector::zeros(1);
        space
            .diff_into(x0.rows(0, 1), x1.rows(0, 1), dx.rows_mut(0, 1))
            .unwrap();
        let mut back = DVector::zeros(1);
        space
            .integrate_into(x0.rows(0, 1), dx.rows(0, 1), back.rows_mut(0, 1))
            .unwrap();
        assert!((back[0] - x1[0]).abs() < 1e-12);
    }

    #[test]
    fn test_diff_range_property() {
        let space = AngularMix::new(3, vec![2]).unwrap();
        for _ in 0..50 {
            let x0 = space.sample();
            let x1 = space.sample();
            let mut dx = DVector::zeros(3);
            space
                .diff_into(x0.rows(0, 3), x1.rows(0, 3), dx.rows_mut(0, 3))
                .unwrap();
            assert!(dx[2] > -PI && dx[2] <= PI);
            // euclidean components stay plain differences
            assert!((dx[0] - (x1[0] - x0[0])).abs() < 1e-12);
            assert!((dx[1] - (x1[1] - x0[1])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_integrate_wraps() {
        let space = so2();
        let x = DVector::from_vec(vec![3.0]);
        let dx = DVector::from_vec(vec![1.0]);
        let mut out = DVector::zeros(1);
        space
            .integrate_into(x.rows(0, 1), dx.rows(0, 1), out.rows_mut(0, 1))
            .unwrap();
        assert!((out[0] - (4.0 - 2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_sample_angular_range() {
        let space = AngularMix::new(2, vec![1]).unwrap();
        for _ in 0..20 {
            let x = space.sample();
            assert!((-1.0..=1.0).contains(&x[0]));
            assert!(x[1].abs() <= PI);
        }
    }

    #[test]
    fn test_bad_angular_index_is_rejected() {
        assert!(AngularMix::new(2, vec![2]).is_err());
    }
}
