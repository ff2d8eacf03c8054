//! Vehicle control interface

use crate::core::{GeoPoint, TelemetrySample};
use crate::hardware::CommResult;
use serde::Serialize;

/// Control and telemetry access for the drone
pub trait VehicleControl {
    /// Move to a position, holding `target.depth`, at `speed` m/s
    fn move_to(&mut self, target: &GeoPoint, speed: f64) -> CommResult<()>;

    /// Change depth at the current horizontal position at `speed` m/s
    fn descend_to(&mut self, depth: f64, speed: f64) -> CommResult<()>;

    /// Stop and hold position
    fn stop(&mut self) -> CommResult<()>;

    /// Read the latest telemetry sample
    fn get_telemetry(&mut self) -> CommResult<TelemetrySample>;

    /// Check if the vehicle link is up and we are in control
    fn is_connected(&self) -> bool;
}

/// A command as sent to the vehicle, kept for mission logs and test inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum VehicleCommand {
    MoveTo { target: GeoPoint, speed: f64 },
    DescendTo { depth: f64, speed: f64 },
    Stop,
}
