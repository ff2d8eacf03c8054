//! Docking Navigation
//!
//! Guides an underwater drone from its current position to a fixed docking
//! station. USBL fixes relative to the station are averaged into a position
//! estimate, converted to geographic coordinates, turned into a waypoint plan
//! and executed against the vehicle under a timeout, with every command and
//! telemetry sample recorded in a mission log.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod utils;
pub mod hardware;
pub mod mission;
pub mod api;

// Re-export commonly used types
pub use core::{GeoPoint, NavResult, NavigationError, RelativeFix, TelemetrySample};
pub use algorithms::{CoordinateConverter, MissionPlan, NavigationPlanner, StrategyKind};
pub use processing::PositionSampler;
pub use hardware::{CommError, CommResult, PositioningSource, VehicleControl};
pub use mission::{MissionExecutor, MissionOutcome, MissionState, SerializedLog};
pub use utils::{ConfigurationManager, SystemConfig};
pub use api::DockingMission;
