//! Core types, constants and errors for the docking navigation system

pub mod types;
pub mod constants;
pub mod error;

pub use types::*;
pub use constants::*;
pub use error::{NavigationError, NavResult};
