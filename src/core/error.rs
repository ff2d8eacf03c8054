//! Error taxonomy for navigation, planning and mission execution

use crate::hardware::CommError;
use std::fmt;

/// Errors surfaced by the navigation engine
///
/// A mission that runs out of time is not an error: it ends in the
/// `TimedOut` mission state instead.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// Non-finite or malformed input to the coordinate math
    InvalidInput { parameter: String, value: String },
    /// The sampler obtained no usable fix
    NoFix { attempts: usize },
    /// A constructed plan violates its structural invariant
    InvalidPlan { reason: String },
    /// Collaborator read failure
    ReadError(CommError),
    /// A mission is already running on this executor
    AlreadyRunning,
    /// The vehicle reported a hard fault
    Fault { description: String },
    /// The mission log could not be persisted
    Persist { message: String },
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::InvalidInput { parameter, value } => {
                write!(f, "Invalid input: {} = {}", parameter, value)
            }
            NavigationError::NoFix { attempts } => {
                write!(f, "No position fix obtained after {} attempts", attempts)
            }
            NavigationError::InvalidPlan { reason } => write!(f, "Invalid plan: {}", reason),
            NavigationError::ReadError(e) => write!(f, "Read error: {}", e),
            NavigationError::AlreadyRunning => write!(f, "A mission is already running"),
            NavigationError::Fault { description } => write!(f, "Vehicle fault: {}", description),
            NavigationError::Persist { message } => {
                write!(f, "Failed to persist mission log: {}", message)
            }
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavigationError::ReadError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for NavigationError {
    fn from(error: CommError) -> Self {
        NavigationError::ReadError(error)
    }
}

/// Result type for navigation operations
pub type NavResult<T> = Result<T, NavigationError>;

impl NavigationError {
    /// Build an `InvalidInput` error for a named non-finite value
    pub fn non_finite(parameter: &str, value: f64) -> Self {
        NavigationError::InvalidInput {
            parameter: parameter.to_string(),
            value: value.to_string(),
        }
    }
}
