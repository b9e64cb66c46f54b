//! Error types for manifold_dynamics

use std::fmt;

/// Main error type for the dynamics kernel.
///
/// Both variants are fatal for the current call chain: they signal a
/// programming or configuration gap, never a runtime condition to retry.
/// Degraded-but-defined results (extrapolation, missing collision
/// environment) are not errors; they are logged and computation proceeds.
#[derive(Debug)]
pub enum DynamicsError {
    /// A capability declared by the abstract interface that this concrete
    /// robot or state space chose not to provide
    NotImplemented(String),
    /// Dimension or argument-count mismatch, detected at operation entry
    PreconditionViolation(String),
}

impl DynamicsError {
    pub fn not_implemented(what: impl Into<String>) -> Self {
        DynamicsError::NotImplemented(what.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        DynamicsError::PreconditionViolation(msg.into())
    }
}

impl fmt::Display for DynamicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicsError::NotImplemented(what) => write!(f, "Not implemented: {}", what),
            DynamicsError::PreconditionViolation(msg) => {
                write!(f, "Precondition violation: {}", msg)
            }
        }
    }
}

impl std::error::Error for DynamicsError {}

/// Result type alias for kernel operations
pub type DynamicsResult<T> = Result<T, DynamicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DynamicsError::not_implemented("regularization");
        assert_eq!(format!("{}", err), "Not implemented: regularization");

        let err = DynamicsError::precondition("state has size 2, expected 3");
        assert_eq!(
            format!("{}", err),
            "Precondition violation: state has size 2, expected 3"
        );
    }
}
