//! Error handling and error types for the subsets engine.
//!
//! Every precondition of the partitioning engine (valid device ids, consistent
//! buffer sizes, depth within the configured maximum) is checked when an
//! operation starts and reported through [`SubsetsError`]. None of these
//! errors are retried: the caller propagates them and abandons the tree.

use std::io;
use thiserror::Error;

/// Main error type for the subsets engine.
#[derive(Error, Debug)]
pub enum SubsetsError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Buffer size mismatch between collaborating buffers
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Device identifier outside the configured distribution
    #[error("Invalid device: {device}, distribution has {num_devices} devices")]
    InvalidDevice { device: usize, num_devices: usize },

    /// Split advancement past the configured maximum depth
    #[error("Depth exceeded: current depth {depth}, maximum depth {max_depth}")]
    DepthExceeded { depth: u32, max_depth: u32 },

    /// Failure inside a row/bin primitive
    #[error("Kernel error in {stage}: {message}")]
    Kernel { stage: String, message: String },

    /// Snapshot whose decoded contents are inconsistent
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// TOML parsing errors
    #[error("TOML error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        #[from]
        source: bincode::Error,
    },
}

/// Type alias for Results using SubsetsError
pub type Result<T> = std::result::Result<T, SubsetsError>;

impl SubsetsError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SubsetsError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        SubsetsError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        SubsetsError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid device error
    pub fn invalid_device(device: usize, num_devices: usize) -> Self {
        SubsetsError::InvalidDevice {
            device,
            num_devices,
        }
    }

    /// Create a depth exceeded error
    pub fn depth_exceeded(depth: u32, max_depth: u32) -> Self {
        SubsetsError::DepthExceeded { depth, max_depth }
    }

    /// Create a kernel error for the named stage
    pub fn kernel<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        SubsetsError::Kernel {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        SubsetsError::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Only configuration loading can be retried with different input; every
    /// failure raised while a tree is being grown is fatal for that tree.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SubsetsError::Config { .. } => true,
            SubsetsError::Json { .. } => true,
            SubsetsError::Toml { .. } => true,
            SubsetsError::IO { .. } => true,
            SubsetsError::InvalidParameter { .. } => false,
            SubsetsError::DimensionMismatch { .. } => false,
            SubsetsError::InvalidDevice { .. } => false,
            SubsetsError::DepthExceeded { .. } => false,
            SubsetsError::Kernel { .. } => false,
            SubsetsError::Serialization { .. } => false,
            SubsetsError::Bincode { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SubsetsError::Config { .. } => "config",
            SubsetsError::InvalidParameter { .. } => "invalid_parameter",
            SubsetsError::DimensionMismatch { .. } => "dimension_mismatch",
            SubsetsError::InvalidDevice { .. } => "invalid_device",
            SubsetsError::DepthExceeded { .. } => "depth_exceeded",
            SubsetsError::Kernel { .. } => "kernel",
            SubsetsError::Serialization { .. } => "serialization",
            SubsetsError::IO { .. } => "io",
            SubsetsError::Json { .. } => "json",
            SubsetsError::Toml { .. } => "toml",
            SubsetsError::Bincode { .. } => "bincode",
        }
    }
}

/// Return early with the given error when the condition does not hold.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SubsetsError::config("test configuration error");
        assert_eq!(err.category(), "config");
        assert!(err.is_recoverable());

        let err = SubsetsError::depth_exceeded(6, 6);
        assert_eq!(err.category(), "depth_exceeded");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = SubsetsError::invalid_device(4, 2);
        let error_string = format!("{}", err);
        assert!(error_string.contains("Invalid device"));
        assert!(error_string.contains("2 devices"));

        let err = SubsetsError::kernel("reorder_bins", "bits out of range");
        assert_eq!(
            err.to_string(),
            "Kernel error in reorder_bins: bits out of range"
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = SubsetsError::dimension_mismatch("bins: 8", "indices: 7");
        assert_eq!(err.category(), "dimension_mismatch");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: usize) -> Result<usize> {
            ensure!(
                value < 4,
                SubsetsError::invalid_parameter("value", value.to_string(), "must be < 4")
            );
            Ok(value)
        }

        assert!(check(3).is_ok());
        assert!(matches!(
            check(5),
            Err(SubsetsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: SubsetsError = io_err.into();
        assert!(matches!(err, SubsetsError::IO { .. }));
        assert_eq!(err.category(), "io");
    }
}
