//! Block composition of two state spaces

use nalgebra::{DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use std::sync::Arc;

use crate::common::DynamicsResult;
use super::{check_len, StateSpace};

/// Two state spaces stacked into one: the first child owns the leading
/// `dim1` state components, the second the trailing `dim2`.
///
/// Children are shared (`Arc`) so a robot model and a compound can refer
/// to the same space. Every operation decomposes strictly into the two
/// blocks and recurses; there are never cross terms between children.
#[derive(Debug, Clone)]
pub struct Compound {
    first: Arc<StateSpace>,
    second: Arc<StateSpace>,
}

impl Compound {
    pub fn new(first: Arc<StateSpace>, second: Arc<StateSpace>) -> Self {
        Compound { first, second }
    }

    pub fn first(&self) -> &StateSpace {
        &self.first
    }

    pub fn second(&self) -> &StateSpace {
        &self.second
    }

    pub fn dim(&self) -> usize {
        self.first.dim() + self.second.dim()
    }

    pub fn tangent_dim(&self) -> usize {
        self.first.tangent_dim() + self.second.tangent_dim()
    }

    pub fn zero(&self) -> DVector<f64> {
        let z1 = self.first.zero();
        let z2 = self.second.zero();
        let mut out = DVector::zeros(z1.len() + z2.len());
        out.rows_mut(0, z1.len()).copy_from(&z1);
        out.rows_mut(z1.len(), z2.len()).copy_from(&z2);
        out
    }

    pub fn sample(&self) -> DVector<f64> {
        let s1 = self.first.sample();
        let s2 = self.second.sample();
        let mut out = DVector::zeros(s1.len() + s2.len());
        out.rows_mut(0, s1.len()).copy_from(&s1);
        out.rows_mut(s1.len(), s2.len()).copy_from(&s2);
        out
    }

    pub(crate) fn diff_into(
        &self,
        x0: DVectorView<f64>,
        x1: DVectorView<f64>,
        mut out: DVectorViewMut<f64>,
    ) -> DynamicsResult<()> {
        let (n1, n2) = (self.first.dim(), self.second.dim());
        let (t1, t2) = (self.first.tangent_dim(), self.second.tangent_dim());
        check_len("diff x0", x0.len(), n1 + n2)?;
        check_len("diff x1", x1.len(), n1 + n2)?;
        check_len("diff out", out.len(), t1 + t2)?;
        self.first
            .diff_into(x0.rows(0, n1), x1.rows(0, n1), out.rows_mut(0, t1))?;
        self.second
            .diff_into(x0.rows(n1, n2), x1.rows(n1, n2), out.rows_mut(t1, t2))?;
        Ok(())
    }

    pub(crate) fn integrate_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        mut out: DVectorViewMut<f64>,
    ) -> DynamicsResult<()> {
        let (n1, n2) = (self.first.dim(), self.second.dim());
        let (t1, t2) = (self.first.tangent_dim(), self.second.tangent_dim());
        check_len("integrate x", x.len(), n1 + n2)?;
        check_len("integrate dx", dx.len(), t1 + t2)?;
        check_len("integrate out", out.len(), n1 + n2)?;
        self.first
            .integrate_into(x.rows(0, n1), dx.rows(0, t1), out.rows_mut(0, n1))?;
        self.second
            .integrate_into(x.rows(n1, n2), dx.rows(t1, t2), out.rows_mut(n1, n2))?;
        Ok(())
    }

    pub(crate) fn jdiff_into(
        &self,
        x0: DVectorView<f64>,
        x1: DVectorView<f64>,
        mut j_x0: DMatrixViewMut<f64>,
        mut j_x1: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        let (n1, n2) = (self.first.dim(), self.second.dim());
        let (t1, t2) = (self.first.tangent_dim(), self.second.tangent_dim());
        check_len("Jdiff x0", x0.len(), n1 + n2)?;
        check_len("Jdiff x1", x1.len(), n1 + n2)?;
        check_len("Jdiff Jfirst rows", j_x0.nrows(), t1 + t2)?;
        check_len("Jdiff Jsecond rows", j_x1.nrows(), t1 + t2)?;
        // children only write their diagonal blocks
        j_x0.fill(0.0);
        j_x1.fill(0.0);
        self.first.jdiff_into(
            x0.rows(0, n1),
            x1.rows(0, n1),
            j_x0.view_mut((0, 0), (t1, t1)),
            j_x1.view_mut((0, 0), (t1, t1)),
        )?;
        self.second.jdiff_into(
            x0.rows(n1, n2),
            x1.rows(n1, n2),
            j_x0.view_mut((t1, t1), (t2, t2)),
            j_x1.view_mut((t1, t1), (t2, t2)),
        )?;
        Ok(())
    }

    pub(crate) fn jintegrate_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        mut j_x: DMatrixViewMut<f64>,
        mut j_dx: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        let (n1, n2) = (self.first.dim(), self.second.dim());
        let (t1, t2) = (self.first.tangent_dim(), self.second.tangent_dim());
        check_len("Jintegrate x", x.len(), n1 + n2)?;
        check_len("Jintegrate dx", dx.len(), t1 + t2)?;
        check_len("Jintegrate Jfirst rows", j_x.nrows(), t1 + t2)?;
        check_len("Jintegrate Jsecond rows", j_dx.nrows(), t1 + t2)?;
        j_x.fill(0.0);
        j_dx.fill(0.0);
        self.first.jintegrate_into(
            x.rows(0, n1),
            dx.rows(0, t1),
            j_x.view_mut((0, 0), (t1, t1)),
            j_dx.view_mut((0, 0), (t1, t1)),
        )?;
        self.second.jintegrate_into(
            x.rows(n1, n2),
            dx.rows(t1, t2),
            j_x.view_mut((t1, t1), (t2, t2)),
            j_dx.view_mut((t1, t1), (t2, t2)),
        )?;
        Ok(())
    }

    pub(crate) fn jintegrate_transport_into(
        &self,
        x: DVectorView<f64>,
        dx: DVectorView<f64>,
        mut jin: DMatrixViewMut<f64>,
    ) -> DynamicsResult<()> {
        let (n1, n2) = (self.first.dim(), self.second.dim());
        let (t1, t2) = (self.first.tangent_dim(), self.second.tangent_dim());
        check_len("JintegrateTransport x", x.len(), n1 + n2)?;
        check_len("JintegrateTransport dx", dx.len(), t1 + t2)?;
        check_len("JintegrateTransport Jin rows", jin.nrows(), t1 + t2)?;
        let ncols = jin.ncols();
        self.first.jintegrate_transport_into(
            x.rows(0, n1),
            dx.rows(0, t1),
            jin.view_mut((0, 0), (t1, ncols)),
        )?;
        self.second.jintegrate_transport_into(
            x.rows(n1, n2),
            dx.rows(t1, t2),
            jin.view_mut((t1, 0), (t2, ncols)),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_space::StateSpace;
    use nalgebra::DMatrix;
    use std::f64::consts::PI;

    fn pose_and_velocity() -> StateSpace {
        // planar pose (x, y, yaw) stacked with a 2d velocity block
        let pose = Arc::new(StateSpace::angular_mix(3, vec![2]).unwrap());
        let vel = Arc::new(StateSpace::euclidean(2));
        StateSpace::compound(pose, vel)
    }

    #[test]
    fn test_dimensions_are_sums() {
        let space = pose_and_velocity();
        assert_eq!(space.dim(), 5);
        assert_eq!(space.tangent_dim(), 5);
    }

    #[test]
    fn test_diff_splits_blocks() {
        let space = pose_and_velocity();
        let x0 = DVector::from_vec(vec![0.0, 0.0, 3.0, 1.0, 1.0]);
        let x1 = DVector::from_vec(vec![1.0, -1.0, -3.0, 0.0, 2.0]);
        let dx = space.diff(&x0, &x1).unwrap();

        assert!((dx[0] - 1.0).abs() < 1e-12);
        assert!((dx[1] + 1.0).abs() < 1e-12);
        // angular component of the pose block takes the short arc
        assert!((dx[2] - (2.0 * PI - 6.0)).abs() < 1e-12);
        assert!((dx[3] + 1.0).abs() < 1e-12);
        assert!((dx[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip_across_the_seam() {
        let space = pose_and_velocity();
        for _ in 0..20 {
            let x0 = space.sample();
            let x1 = space.sample();
            let dx = space.diff(&x0, &x1).unwrap();
            let back = space.integrate(&x0, &dx).unwrap();
            assert!((back - &x1).norm() < 1e-12);
        }
    }

    #[test]
    fn test_jintegrate_is_identity() {
        let space = pose_and_velocity();
        let x = space.zero();
        let dx = DVector::zeros(5);
        let (j_x, j_dx) = space.jintegrate(&x, &dx).unwrap();
        assert_eq!(j_x, DMatrix::identity(5, 5));
        assert_eq!(j_dx, DMatrix::identity(5, 5));
    }

    #[test]
    fn test_jdiff_block_structure() {
        let space = pose_and_velocity();
        let x0 = space.sample();
        let x1 = space.sample();
        let (j0, j1) = space.jdiff(&x0, &x1).unwrap();
        assert_eq!(j0, DMatrix::from_diagonal_element(5, 5, -1.0));
        assert_eq!(j1, DMatrix::identity(5, 5));
    }

    #[test]
    fn test_transport_is_not_implemented_for_leaf_children() {
        let space = pose_and_velocity();
        let x = space.zero();
        let dx = DVector::zeros(5);
        let mut jin = DMatrix::zeros(5, 5);
        let result = space.jintegrate_transport_into(
            x.rows(0, 5),
            dx.rows(0, 5),
            jin.view_mut((0, 0), (5, 5)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_compound() {
        let inner = Arc::new(pose_and_velocity());
        let extra = Arc::new(StateSpace::euclidean(1));
        let space = StateSpace::compound(inner, extra);
        assert_eq!(space.dim(), 6);

        let x0 = space.sample();
        let x1 = space.sample();
        let dx = space.diff(&x0, &x1).unwrap();
        let back = space.integrate(&x0, &dx).unwrap();
        assert!((back - &x1).norm() < 1e-12);
    }
}
