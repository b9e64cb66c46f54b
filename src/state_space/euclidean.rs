//! Pure Euclidean state space (Rn)

use nalgebra::{DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use rand::Rng;

use crate::common::{DynamicsError, DynamicsResult};
use super::check_len;

/// State space where every component is an unconstrained real.
///
/// `diff` and `integrate` reduce to plain vector arithmetic and the
/// tangent space has the same dimension as the state.
#[derive(Debug, Clone, PartialEq)]
pub struct Euclidean {
    dim: usize,
}

impl Euclidean {
    pub fn new(dim: usize) -> Self {
        Euclidean { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn zero(&self) -> DVector<f64> {
        DVector::zeros(self.dim)
    }

    /// Uniform draw from `[-1, 1]` per component
    pub fn sample(&self) -> DVector<f64> {
        let mut rng = rand::thread_rng();
        DVector::from_fn(self.dim, |_, _| rng.gen_range(-1.0..=1.0))
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
            "JintegrateTransport on Euclidean",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_diff_integrate_roundtrip() {
        let space = Euclidean::new(3);
        let x0 = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let x1 = DVector::from_vec(vec![-0.5, 4.0, 2.0]);

        let mut dx = DVector::zeros(3);
        space
            .diff_into(x0.rows(0, 3), x1.rows(0, 3), dx.rows_mut(0, 3))
            .unwrap();

        let mut back = DVector::zeros(3);
        space
            .integrate_into(x0.rows(0, 3), dx.rows(0, 3), back.rows_mut(0, 3))
            .unwrap();

        assert!((back - x1).norm() < 1e-12);
    }

    #[test]
    fn test_diff_of_same_state_is_zero() {
        let space = Euclidean::new(4);
        let x = space.sample();
        let mut dx = DVector::zeros(4);
        space
            .diff_into(x.rows(0, 4), x.rows(0, 4), dx.rows_mut(0, 4))
            .unwrap();
        assert!(dx.norm() < 1e-15);
    }

    #[test]
    fn test_jdiff_signs() {
        let space = Euclidean::new(2);
        let x = space.zero();
        let mut j0 = DMatrix::from_element(2, 2, 7.0);
        let mut j1 = DMatrix::from_element(2, 2, 7.0);
        space
            .jdiff_into(
                x.rows(0, 2),
                x.rows(0, 2),
                j0.view_mut((0, 0), (2, 2)),
                j1.view_mut((0, 0), (2, 2)),
            )
            .unwrap();
        assert_eq!(j0, DMatrix::from_diagonal_element(2, 2, -1.0));
        assert_eq!(j1, DMatrix::identity(2, 2));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let space = Euclidean::new(3);
        let x = DVector::zeros(2);
        let mut out = DVector::zeros(3);
        let result = space.diff_into(x.rows(0, 2), x.rows(0, 2), out.rows_mut(0, 3));
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_in_range() {
        let space = Euclidean::new(8);
        let x = space.sample();
        assert!(x.iter().all(|&v| (-1.0..=1.0).contains(&v)));
    }
}
