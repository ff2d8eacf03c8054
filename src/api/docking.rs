//! One docking attempt, from locating the drone to a persisted mission log

use crate::algorithms::{CoordinateConverter, MissionPlan, NavigationPlanner};
use crate::core::{GeoPoint, NavResult};
use crate::hardware::{PositioningSource, VehicleControl};
use crate::mission::{Clock, ExecutionSettings, JsonFileSink, MissionExecutor, MissionOutcome};
use crate::processing::PositionSampler;
use crate::utils::config::SystemConfig;
use log::{info, warn};
use serde_json::json;

/// Facade over the navigation components for a configured docking station
pub struct DockingMission {
    config: SystemConfig,
    converter: CoordinateConverter,
    sampler: PositionSampler,
    planner: NavigationPlanner,
}

impl DockingMission {
    pub fn new(config: SystemConfig) -> Self {
        let mut sampler = PositionSampler::new(config.usbl.sample_count);
        if let Some(sigma) = config.usbl.outlier_threshold_sigma {
            sampler = sampler.with_outlier_rejection(sigma);
        }
        let planner = NavigationPlanner::new(&config.navigation);

        Self {
            converter: CoordinateConverter::new(),
            sampler,
            planner,
            config,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn docking_point(&self) -> GeoPoint {
        self.config.docking
    }

    /// Average a batch of USBL fixes and place the drone relative to the docking station.
    ///
    /// The returned point carries the docking depth since USBL fixes are horizontal only.
    pub fn locate_drone(&self, source: &mut dyn PositioningSource) -> NavResult<GeoPoint> {
        let fix = self.sampler.sample(source)?;
        let position = self.converter.to_absolute(&self.config.docking, &fix.as_fix())?;
        info!(
            "Drone at ({:.6}, {:.6}), {:.1}m from the docking station ({}/{} fixes)",
            position.latitude,
            position.longitude,
            fix.x.hypot(fix.y),
            fix.sample_count,
            fix.attempts
        );
        Ok(position)
    }

    /// Plan for the configured docking point and strategy
    pub fn plan(&self) -> NavResult<MissionPlan> {
        self.planner.create_plan(&self.config.docking)
    }

    /// Executor configured with this mission's tolerances and log directory
    pub fn executor<V: VehicleControl, C: Clock>(
        &self,
        vehicle: V,
        clock: C,
    ) -> MissionExecutor<V, C> {
        let settings = ExecutionSettings::from_config(&self.config.navigation);
        MissionExecutor::new(vehicle, clock, settings)
            .with_log_sink(Box::new(JsonFileSink::new(&self.config.mission.log_dir)))
    }

    /// Plan and execute the mission on `executor`.
    ///
    /// `drone_position` is the located start position, recorded in the log
    /// when known.
    pub fn run<V: VehicleControl, C: Clock>(
        &self,
        executor: &mut MissionExecutor<V, C>,
        drone_position: Option<GeoPoint>,
    ) -> NavResult<MissionOutcome> {
        let plan = self.plan()?;

        let distance_m = match drone_position {
            Some(position) => Some(self.converter.distance_m(&position, &self.config.docking)?),
            None => {
                warn!("Drone position unknown, starting without a USBL fix");
                None
            }
        };
        executor.set_mission_context(json!({
            "strategy": self.planner.strategy_name(),
            "drone_position": drone_position,
            "target": self.config.docking,
            "distance_to_target_m": distance_m,
            "safe_depth_m": self.planner.safe_depth_for(&self.config.docking),
            "usbl_endpoint": self.config.usbl.endpoint(),
        }));

        executor.execute(plan, self.config.mission.timeout(), self.config.mission.poll_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::StrategyKind;
    use crate::core::NavigationError;
    use crate::hardware::{ArrivalBehavior, MockPositioningSource, ScriptedVehicle};
    use crate::mission::{EventKind, ManualClock, MemorySink, MissionState};

    fn config() -> SystemConfig {
        let mut config = SystemConfig::default();
        config.usbl.sample_count = 3;
        config.mission.timeout_s = 60;
        config.mission.poll_interval_ms = 1000;
        config
    }

    #[test]
    fn test_locate_drone_averages_fixes() {
        let mission = DockingMission::new(config());
        let mut source = MockPositioningSource::new("usbl");
        source.push_fix(0.0, 100.0);
        source.push_fix(0.0, 102.0);
        source.push_fix(0.0, 98.0);

        let position = mission.locate_drone(&mut source).unwrap();
        let converter = CoordinateConverter::new();
        let distance = converter.distance_m(&position, &mission.docking_point()).unwrap();
        assert!((distance - 100.0).abs() < 0.01);
        assert!(position.latitude > mission.docking_point().latitude);
        assert_eq!(position.depth, 80.0);
    }

    #[test]
    fn test_locate_drone_without_fixes() {
        let mission = DockingMission::new(config());
        let mut source = MockPositioningSource::new("usbl");
        assert_eq!(
            mission.locate_drone(&mut source),
            Err(NavigationError::NoFix { attempts: 3 })
        );
    }

    #[test]
    fn test_plan_follows_configured_strategy() {
        let mut config = config();
        assert_eq!(DockingMission::new(config.clone()).plan().unwrap().len(), 3);

        config.navigation.strategy = StrategyKind::Direct;
        let plan = DockingMission::new(config).plan().unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.docking_point(), &GeoPoint::new(66.442387, 10.369335, 80.0));
    }

    #[test]
    fn test_run_records_start_context() {
        let mission = DockingMission::new(config());
        let start = GeoPoint::new(66.4430, 10.3700, 80.0);
        let vehicle = ScriptedVehicle::new(start, ArrivalBehavior::AfterReads(2));
        let sink = MemorySink::new();
        let mut executor =
            MissionExecutor::new(vehicle, ManualClock::new(0), ExecutionSettings::default())
                .with_log_sink(Box::new(sink.clone()));

        let outcome = mission.run(&mut executor, Some(start)).unwrap();
        assert_eq!(outcome.state, MissionState::Succeeded);
        assert_eq!(outcome.ticks, 6);

        let start_record = &sink.logs()[0].records[0];
        assert_eq!(start_record.event, EventKind::MissionStart);
        let context = &start_record.payload["context"];
        assert_eq!(context["strategy"], "Three-Stage Approach");
        assert_eq!(context["safe_depth_m"], 70.0);
        assert!(context["distance_to_target_m"].as_f64().unwrap() > 0.0);
        assert_eq!(context["usbl_endpoint"], "192.168.1.189:9200");
    }

    #[test]
    fn test_executor_writes_log_file() {
        let dir = std::env::temp_dir().join(format!("docking_nav_api_{}", std::process::id()));
        let mut config = config();
        config.mission.log_dir = dir.to_string_lossy().to_string();
        let mission = DockingMission::new(config);

        let vehicle = ScriptedVehicle::new(mission.docking_point(), ArrivalBehavior::Never);
        let mut executor = mission.executor(vehicle, ManualClock::new(1_000));
        let outcome = mission.run(&mut executor, None).unwrap();

        assert_eq!(outcome.state, MissionState::TimedOut);
        let location = outcome.log_location.unwrap();
        assert!(location.ends_with("mission_1000_failed.json"));
        assert!(std::path::Path::new(&location).exists());

        let _ = std::fs::remove_dir_all(dir);
    }
}
