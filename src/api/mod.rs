//! High-level entry points
//!
//! [`DockingMission`] wires configuration, sampling, coordinate conversion,
//! planning and execution together for one docking attempt.

pub mod docking;

pub use docking::DockingMission;
