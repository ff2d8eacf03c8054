//! Coordinate conversion and mission planning

pub mod coordinates;
pub mod planner;

pub use coordinates::CoordinateConverter;
pub use planner::{
    approach_depth, DirectNavigation, MissionPlan, NavigationPlanner, NavigationStrategy,
    StepKind, StrategyKind, ThreeStageNavigation, WaypointStep,
};
