//! Pre-allocated storage for a state/action sequence

use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};

/// Fixed-capacity column storage for a rollout: `capacity` states of
/// dimension `nx` and `capacity - 1` actions of dimension `nu`.
///
/// Allocated once, reused across rollouts so that stepping never
/// allocates. `len` marks how many leading states are currently valid;
/// an early-terminated rollout leaves its first rejected state in the
/// slot just past `len` for inspection. Accessors index the full
/// capacity, not just the valid prefix.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer {
    states: DMatrix<f64>,
    actions: DMatrix<f64>,
    len: usize,
}

impl TrajectoryBuffer {
    /// Allocate storage for `capacity` states. Panics if `capacity == 0`.
    pub fn new(capacity: usize, nx: usize, nu: usize) -> Self {
        assert!(capacity > 0, "trajectory capacity must be positive");
        TrajectoryBuffer {
            states: DMatrix::zeros(nx, capacity),
            actions: DMatrix::zeros(nu, capacity - 1),
            len: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.states.ncols()
    }

    pub fn nx(&self) -> usize {
        self.states.nrows()
    }

    pub fn nu(&self) -> usize {
        self.actions.nrows()
    }

    /// Number of currently valid states
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark the first `len` states as valid. Panics beyond capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.capacity());
        self.len = len;
    }

    /// View of state column `i`. Panics beyond capacity.
    pub fn state(&self, i: usize) -> DVectorView<f64> {
        assert!(i < self.capacity());
        self.states.column(i)
    }

    pub fn state_mut(&mut self, i: usize) -> DVectorViewMut<f64> {
        assert!(i < self.capacity());
        self.states.column_mut(i)
    }

    /// View of action column `i` (the action applied between states `i`
    /// and `i + 1`). Panics beyond `capacity - 1`.
    pub fn action(&self, i: usize) -> DVectorView<f64> {
        assert!(i < self.capacity() - 1);
        self.actions.column(i)
    }

    pub fn action_mut(&mut self, i: usize) -> DVectorViewMut<f64> {
        assert!(i < self.capacity() - 1);
        self.actions.column_mut(i)
    }

    /// Copies of the valid states
    pub fn states_vec(&self) -> Vec<DVector<f64>> {
        (0..self.len).map(|i| self.state(i).into_owned()).collect()
    }

    /// Copies of the actions between the valid states
    pub fn actions_vec(&self) -> Vec<DVector<f64>> {
        let n = self.len.saturating_sub(1);
        (0..n).map(|i| self.action(i).into_owned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_shape() {
        let traj = TrajectoryBuffer::new(11, 4, 2);
        assert_eq!(traj.capacity(), 11);
        assert_eq!(traj.nx(), 4);
        assert_eq!(traj.nu(), 2);
        assert_eq!(traj.len(), 11);
    }

    #[test]
    fn test_set_len_reports_early_termination() {
        let mut traj = TrajectoryBuffer::new(5, 2, 1);
        traj.set_len(3);
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.states_vec().len(), 3);
        assert_eq!(traj.actions_vec().len(), 2);
        // storage past the valid prefix stays reachable
        let _ = traj.state(4);
    }

    #[test]
    #[should_panic]
    fn test_set_len_beyond_capacity_panics() {
        let mut traj = TrajectoryBuffer::new(5, 2, 1);
        traj.set_len(6);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut traj = TrajectoryBuffer::new(3, 2, 1);
        let x = DVector::from_vec(vec![1.0, -2.0]);
        traj.state_mut(1).copy_from(&x);
        assert_eq!(traj.state(1).into_owned(), x);
    }
}
