//! Communication error types and handling

use std::fmt;

/// Read/command errors raised by the positioning source and the vehicle link
#[derive(Debug, Clone, PartialEq)]
pub enum CommError {
    /// Connection to the device failed or was lost
    ConnectionLost { device: String },
    /// Timeout waiting for a response
    Timeout { timeout_ms: u32 },
    /// Invalid or corrupted message received
    InvalidMessage { details: String },
    /// Device-specific error
    HardwareError { code: u32, description: String },
    /// Configuration error
    ConfigurationError { parameter: String, value: String },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommError::ConnectionLost { device } => {
                write!(f, "Connection lost to {}", device)
            }
            CommError::Timeout { timeout_ms } => {
                write!(f, "Communication timeout after {}ms", timeout_ms)
            }
            CommError::InvalidMessage { details } => {
                write!(f, "Invalid message: {}", details)
            }
            CommError::HardwareError { code, description } => {
                write!(f, "Hardware error {}: {}", code, description)
            }
            CommError::ConfigurationError { parameter, value } => {
                write!(f, "Configuration error: invalid {} = {}", parameter, value)
            }
        }
    }
}

impl std::error::Error for CommError {}

/// Result type for communication operations
pub type CommResult<T> = Result<T, CommError>;

/// What the mission loop does after a communication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Log it and try again on the next poll tick
    Retry,
    /// End the mission
    Fail,
}

impl CommError {
    /// Get the recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            CommError::ConnectionLost { .. }
            | CommError::Timeout { .. }
            | CommError::InvalidMessage { .. }
            | CommError::HardwareError { .. } => RecoveryStrategy::Retry,
            CommError::ConfigurationError { .. } => RecoveryStrategy::Fail,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retried() {
        let transient = [
            CommError::Timeout { timeout_ms: 500 },
            CommError::ConnectionLost { device: "usbl".to_string() },
            CommError::InvalidMessage { details: "short frame".to_string() },
            CommError::HardwareError { code: 12, description: "thruster busy".to_string() },
        ];
        for error in transient {
            assert_eq!(error.recovery_strategy(), RecoveryStrategy::Retry);
            assert!(error.is_recoverable());
        }
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let error = CommError::ConfigurationError {
            parameter: "port".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(error.recovery_strategy(), RecoveryStrategy::Fail);
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_display() {
        let error = CommError::Timeout { timeout_ms: 250 };
        assert_eq!(error.to_string(), "Communication timeout after 250ms");
    }
}
