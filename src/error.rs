//! Custom error types for the translation layer.
//!
//! This module defines the primary error type, `CcdError`, returned by every
//! translator operation. Using the `thiserror` crate, it provides a centralized
//! and consistent way to report why a remote command was refused.
//!
//! ## Error Hierarchy
//!
//! - **`InvalidParameter`**: The caller sent an out-of-range or unknown value (trigger
//!   code, profile code, kinetics window not divisible by the vertical binning, a
//!   malformed wire string). Raised before any engine write.
//! - **`InvalidState`**: The acquisition engine reported a value outside the closed
//!   domain the translator understands (e.g. a trigger mode with no wire code).
//! - **`AcquisitionFault`**: The engine status is neither running nor ready. Carries the
//!   truncated engine diagnostic. The engine error status has already been reset when
//!   this is returned.
//! - **`SizeMismatch`**: A frame read did not match the byte size the client expects,
//!   either before the read (frame geometry) or after it (short read).
//! - **`Configuration`**: Semantic errors in the configuration file.
//! - **`Engine`**: Failures reported by the acquisition engine itself.
//!
//! By using `#[from]`, engine errors (`anyhow::Error`) convert with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the translator error type.
pub type CcdResult<T> = std::result::Result<T, CcdError>;

/// Primary error type for the Frelon translation layer.
///
/// No operation retries; every failure is surfaced immediately with its kind
/// and message.
///
/// # Example
///
/// ```rust
/// use frelon_ccd::error::CcdError;
///
/// fn check_profile(code: i32) -> Result<(), CcdError> {
///     if code != 0 && code != 3 {
///         return Err(CcdError::InvalidParameter(format!(
///             "Invalid profile value: {code}"
///         )));
///     }
///     Ok(())
/// }
///
/// assert!(check_profile(1).is_err());
/// ```
#[derive(Error, Debug)]
pub enum CcdError {
    /// A command argument is out of range or cannot be decoded.
    ///
    /// **Error Type**: Permanent - the same command will fail again.
    ///
    /// **Recovery Strategy**: Fix the argument on the client side.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The engine reported a value outside the domain understood by the translator.
    ///
    /// **Error Type**: Permanent until the engine is reconfigured.
    ///
    /// **Recovery Strategy**: Reset the camera or set the field explicitly.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The acquisition is in fault.
    ///
    /// The message is the engine status truncated before its image counters,
    /// e.g. `Acquisition error: <AcquisitionStatus=AcqFault, Error=CameraError>`.
    ///
    /// **Error Type**: Transient - the engine error status is reset as a side effect.
    #[error("{0}")]
    AcquisitionFault(String),

    /// A frame read did not match the byte size the client expects.
    #[error("Client expects {expected} bytes, {context} has {actual}")]
    SizeMismatch {
        /// Which side of the read disagreed ("frame" or "data str")
        context: &'static str,
        /// Byte size requested by the client
        expected: usize,
        /// Byte size found
        actual: usize,
    },

    /// Configuration validation failed.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The acquisition engine failed.
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl CcdError {
    /// Stable label for logs and wire replies.
    pub fn kind(&self) -> &'static str {
        match self {
            CcdError::InvalidParameter(_) => "invalid_parameter",
            CcdError::InvalidState(_) => "invalid_state",
            CcdError::AcquisitionFault(_) => "acquisition_fault",
            CcdError::SizeMismatch { .. } => "size_mismatch",
            CcdError::Configuration(_) => "configuration",
            CcdError::Engine(_) => "engine",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CcdError::InvalidParameter("Invalid ext. trig: 7".to_string());
        assert_eq!(err.to_string(), "Invalid parameter: Invalid ext. trig: 7");
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = CcdError::SizeMismatch {
            context: "frame",
            expected: 100,
            actual: 200,
        };
        assert_eq!(err.to_string(), "Client expects 100 bytes, frame has 200");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: CcdError = anyhow::anyhow!("espia link down").into();
        assert_eq!(err.to_string(), "espia link down");
        assert_eq!(err.kind(), "engine");
    }
}
