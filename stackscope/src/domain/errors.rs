//! Structured error types for stackscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Failures talking to the monitored process.
#[derive(Error, Debug)]
pub enum IntrospectionError {
    #[error("Monitored process is unreachable: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error("Sampling period must be positive, got {0}ms")]
    InvalidSamplingPeriod(u64),

    #[error("Refresh period must be positive, got {0}ms")]
    InvalidRefreshPeriod(u64),

    #[error("Failed to spawn periodic task thread: {0}")]
    TaskSpawnFailed(std::io::Error),
}

/// Reasons a lock graph cannot be interpreted.
///
/// Never surfaced to callers: a bad graph means the process does not expose
/// usable scheduling-rule telemetry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LockGraphError {
    #[error("Lock graph has no rows")]
    Empty,

    #[error("Lock graph has {rows} rows but {threads} thread names")]
    RowCountMismatch { rows: usize, threads: usize },

    #[error("Lock graph row {row} has {columns} columns but {resources} resource names")]
    ColumnCountMismatch { row: usize, columns: usize, resources: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompositeResourceError {
    #[error("Malformed composite resource: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_period_display() {
        let err = ProfilerError::InvalidSamplingPeriod(0);
        assert_eq!(err.to_string(), "Sampling period must be positive, got 0ms");
    }

    #[test]
    fn test_introspection_error_is_transparent() {
        let err: ProfilerError = IntrospectionError::Unreachable("connection reset".into()).into();
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_lock_graph_error_display() {
        let err = LockGraphError::ColumnCountMismatch { row: 1, columns: 3, resources: 2 };
        assert!(err.to_string().contains("row 1"));
        assert!(err.to_string().contains("2 resource names"));
    }
}
