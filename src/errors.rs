//! Error and result types for spatial index construction.
//!
//! Errors surface synchronously at construction time: an invalid
//! configuration or a malformed geometry is rejected before it can reach
//! the tree. Queries on a well-formed tree never error.

use thiserror::Error;

/// Errors that can occur while building spatial index inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpatialError {
    /// Tree configuration with unusable child-count bounds.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Geometry whose coordinates do not describe a valid shape.
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
}

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpatialError::InvalidConfiguration("min_children must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: min_children must be at least 1"
        );

        let err = SpatialError::MalformedGeometry("min 3 exceeds max 1 on axis 0".into());
        assert!(err.to_string().starts_with("malformed geometry"));
    }
}
