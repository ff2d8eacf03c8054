//! Core data types for the docking navigation system

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, or 0 if the system clock is before it
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Absolute position in geodetic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Depth below surface in meters (positive down)
    pub depth: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, depth: f64) -> Self {
        Self { latitude, longitude, depth }
    }

    /// Same horizontal position at a different depth
    pub fn with_depth(self, depth: f64) -> Self {
        Self { depth, ..self }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.depth.is_finite()
    }
}

/// Offset of the drone from the acoustic reference, as reported by the USBL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeFix {
    /// East offset (meters)
    pub x: f64,
    /// North offset (meters)
    pub y: f64,
    pub timestamp_ms: u64,
}

impl RelativeFix {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, timestamp_ms: current_time_ms() }
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Offset as an (east, north) vector
    pub fn offset(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Mean of the fixes collected in one sampling pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedFix {
    pub x: f64,
    pub y: f64,
    /// Number of fixes that went into the mean (always >= 1)
    pub sample_count: usize,
    /// Number of reads attempted
    pub attempts: usize,
    pub timestamp_ms: u64,
}

impl AveragedFix {
    pub fn as_fix(&self) -> RelativeFix {
        RelativeFix { x: self.x, y: self.y, timestamp_ms: self.timestamp_ms }
    }
}

/// Status flags reported alongside each telemetry sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusFlags {
    /// Vehicle reports a hard fault
    pub fault: bool,
    pub fault_description: Option<String>,
    /// Vehicle is under our control
    pub in_control: bool,
}

impl StatusFlags {
    pub fn nominal() -> Self {
        Self { fault: false, fault_description: None, in_control: true }
    }

    pub fn faulted(description: impl Into<String>) -> Self {
        Self {
            fault: true,
            fault_description: Some(description.into()),
            in_control: true,
        }
    }
}

/// One telemetry reading from the vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp_ms: u64,
    /// Position estimate; `position.depth` is the measured depth
    pub position: GeoPoint,
    pub flags: StatusFlags,
    pub battery_level: Option<f64>,
    pub water_temperature_c: Option<f64>,
}

impl TelemetrySample {
    pub fn new(timestamp_ms: u64, position: GeoPoint) -> Self {
        Self {
            timestamp_ms,
            position,
            flags: StatusFlags::nominal(),
            battery_level: None,
            water_temperature_c: None,
        }
    }

    pub fn with_flags(mut self, flags: StatusFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn depth(&self) -> f64 {
        self.position.depth
    }
}
