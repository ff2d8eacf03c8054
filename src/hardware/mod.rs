//! Collaborator interfaces for the positioning source and the vehicle
//!
//! The navigation engine never talks to hardware directly. It reads fixes
//! through [`PositioningSource`] and drives the drone through
//! [`VehicleControl`]; vendor drivers implement these traits outside this
//! crate. Scripted mocks and a simple kinematic simulation live here for
//! tests and offline runs.

pub mod positioning;
pub mod vehicle;
pub mod mock;
pub mod simulation;
pub mod error;

pub use positioning::PositioningSource;
pub use vehicle::{VehicleCommand, VehicleControl};
pub use mock::{ArrivalBehavior, MockPositioningSource, ScriptedVehicle};
pub use simulation::{SimulatedUsbl, SimulatedVehicle};
pub use error::{CommError, CommResult, RecoveryStrategy};
