//! Physical constants and system parameters

/// Mean Earth radius used by the great-circle formulas (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Shallowest depth the approach stage is allowed to use (meters)
pub const MIN_APPROACH_DEPTH_M: f64 = 5.0;
