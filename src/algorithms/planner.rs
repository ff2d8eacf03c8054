//! Navigation strategies that turn a docking point into a waypoint plan

use crate::core::{GeoPoint, NavResult, NavigationError, MIN_APPROACH_DEPTH_M};
use crate::utils::config::NavigationConfig;
use log::info;
use serde::{Deserialize, Serialize};

/// What a step asks the vehicle to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Horizontal move holding the target depth
    MoveHorizontal,
    /// Vertical move at the current horizontal position
    Descend,
    /// Depth and horizontal position commanded together
    MoveToDepthAndPosition,
}

/// One step of a mission plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointStep {
    pub name: String,
    pub kind: StepKind,
    pub target: GeoPoint,
    /// Horizontal speed (m/s), or vertical speed for `Descend`
    pub speed: f64,
    /// Vertical speed (m/s) applied alongside `speed` for combined moves
    pub vertical_speed: Option<f64>,
}

impl WaypointStep {
    pub fn move_horizontal(name: &str, target: GeoPoint, speed: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: StepKind::MoveHorizontal,
            target,
            speed,
            vertical_speed: None,
        }
    }

    pub fn descend(name: &str, target: GeoPoint, speed: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: StepKind::Descend,
            target,
            speed,
            vertical_speed: None,
        }
    }

    pub fn move_to_depth_and_position(
        name: &str,
        target: GeoPoint,
        horizontal_speed: f64,
        vertical_speed: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: StepKind::MoveToDepthAndPosition,
            target,
            speed: horizontal_speed,
            vertical_speed: Some(vertical_speed),
        }
    }
}

/// Ordered, non-empty sequence of steps ending at the docking point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionPlan {
    name: String,
    docking_point: GeoPoint,
    steps: Vec<WaypointStep>,
}

impl MissionPlan {
    /// Build a plan, checking that it is non-empty and ends exactly at `docking_point`
    pub fn new(name: &str, docking_point: GeoPoint, steps: Vec<WaypointStep>) -> NavResult<Self> {
        let last = steps.last().ok_or_else(|| NavigationError::InvalidPlan {
            reason: "plan has no steps".to_string(),
        })?;

        if last.target != docking_point {
            return Err(NavigationError::InvalidPlan {
                reason: format!(
                    "final step target {:?} does not equal docking point {:?}",
                    last.target, docking_point
                ),
            });
        }

        for (index, step) in steps.iter().enumerate() {
            if !step.target.is_finite() {
                return Err(NavigationError::InvalidPlan {
                    reason: format!("step {} has a non-finite target", index + 1),
                });
            }
            let speeds_ok = step.speed.is_finite()
                && step.speed > 0.0
                && step.vertical_speed.map_or(true, |v| v.is_finite() && v > 0.0);
            if !speeds_ok {
                return Err(NavigationError::InvalidPlan {
                    reason: format!("step {} has a non-positive speed", index + 1),
                });
            }
        }

        Ok(Self { name: name.to_string(), docking_point, steps })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docking_point(&self) -> &GeoPoint {
        &self.docking_point
    }

    pub fn steps(&self) -> &[WaypointStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&WaypointStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a constructed plan
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A way of approaching the docking station
pub trait NavigationStrategy {
    /// Human-readable name, used as the plan name
    fn name(&self) -> &'static str;

    /// Build the plan that brings the vehicle to `docking_point`
    fn create_plan(
        &self,
        docking_point: &GeoPoint,
        approach_speed: f64,
        descent_speed: f64,
        safe_depth: f64,
    ) -> NavResult<MissionPlan>;
}

/// Approach above the station at a safe depth, descend, then close in.
///
/// Keeps horizontal motion at depth to the final short leg.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeStageNavigation;

impl NavigationStrategy for ThreeStageNavigation {
    fn name(&self) -> &'static str {
        "Three-Stage Approach"
    }

    fn create_plan(
        &self,
        docking_point: &GeoPoint,
        approach_speed: f64,
        descent_speed: f64,
        safe_depth: f64,
    ) -> NavResult<MissionPlan> {
        validate_inputs(docking_point, approach_speed, descent_speed, safe_depth)?;

        let above_target = docking_point.with_depth(safe_depth);
        let steps = vec![
            WaypointStep::move_horizontal("Above Target", above_target, approach_speed),
            WaypointStep::descend(
                "Target Depth",
                above_target.with_depth(docking_point.depth),
                descent_speed,
            ),
            WaypointStep::move_horizontal("Target", *docking_point, approach_speed),
        ];
        MissionPlan::new(self.name(), *docking_point, steps)
    }
}

/// Go straight to the station, commanding depth and position together
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectNavigation;

impl NavigationStrategy for DirectNavigation {
    fn name(&self) -> &'static str {
        "Direct Approach"
    }

    fn create_plan(
        &self,
        docking_point: &GeoPoint,
        approach_speed: f64,
        descent_speed: f64,
        safe_depth: f64,
    ) -> NavResult<MissionPlan> {
        validate_inputs(docking_point, approach_speed, descent_speed, safe_depth)?;

        let steps = vec![WaypointStep::move_to_depth_and_position(
            "Target",
            *docking_point,
            approach_speed,
            descent_speed,
        )];
        MissionPlan::new(self.name(), *docking_point, steps)
    }
}

/// Strategy selection as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    ThreeStage,
    Direct,
}

impl StrategyKind {
    pub fn strategy(self) -> Box<dyn NavigationStrategy> {
        match self {
            StrategyKind::ThreeStage => Box::new(ThreeStageNavigation),
            StrategyKind::Direct => Box::new(DirectNavigation),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "three_stage" | "three-stage" => Ok(StrategyKind::ThreeStage),
            "direct" => Ok(StrategyKind::Direct),
            other => Err(format!("unknown navigation strategy '{}'", other)),
        }
    }
}

/// Safe approach depth derived from the docking depth and a vertical offset
pub fn approach_depth(docking_depth: f64, offset_m: f64) -> f64 {
    (docking_depth - offset_m).max(MIN_APPROACH_DEPTH_M)
}

/// Strategy plus the speeds and depths it plans with
pub struct NavigationPlanner {
    strategy: Box<dyn NavigationStrategy>,
    approach_speed: f64,
    descent_speed: f64,
    safe_depth: Option<f64>,
    approach_depth_offset: f64,
}

impl NavigationPlanner {
    pub fn new(config: &NavigationConfig) -> Self {
        Self::with_strategy(config.strategy.strategy(), config)
    }

    pub fn with_strategy(strategy: Box<dyn NavigationStrategy>, config: &NavigationConfig) -> Self {
        Self {
            strategy,
            approach_speed: config.approach_speed_ms,
            descent_speed: config.descent_speed_ms,
            safe_depth: config.safe_depth_m,
            approach_depth_offset: config.approach_depth_offset_m,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Safe depth used for a given docking point
    pub fn safe_depth_for(&self, docking_point: &GeoPoint) -> f64 {
        self.safe_depth
            .unwrap_or_else(|| approach_depth(docking_point.depth, self.approach_depth_offset))
    }

    pub fn create_plan(&self, docking_point: &GeoPoint) -> NavResult<MissionPlan> {
        let safe_depth = self.safe_depth_for(docking_point);
        let plan = self.strategy.create_plan(
            docking_point,
            self.approach_speed,
            self.descent_speed,
            safe_depth,
        )?;
        info!(
            "Built '{}' plan with {} steps to ({:.6}, {:.6}) at {:.1}m, safe depth {:.1}m",
            plan.name(),
            plan.len(),
            docking_point.latitude,
            docking_point.longitude,
            docking_point.depth,
            safe_depth
        );
        Ok(plan)
    }
}

fn validate_inputs(
    docking_point: &GeoPoint,
    approach_speed: f64,
    descent_speed: f64,
    safe_depth: f64,
) -> NavResult<()> {
    if !docking_point.is_finite() {
        return Err(NavigationError::InvalidInput {
            parameter: "docking_point".to_string(),
            value: format!("{:?}", docking_point),
        });
    }
    if !approach_speed.is_finite() || approach_speed <= 0.0 {
        return Err(NavigationError::non_finite("approach_speed", approach_speed));
    }
    if !descent_speed.is_finite() || descent_speed <= 0.0 {
        return Err(NavigationError::non_finite("descent_speed", descent_speed));
    }
    if !safe_depth.is_finite() {
        return Err(NavigationError::non_finite("safe_depth", safe_depth));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn docking() -> GeoPoint {
        GeoPoint::new(66.442387, 10.369335, 80.0)
    }

    #[rstest]
    #[case(GeoPoint::new(66.442387, 10.369335, 80.0), 70.0)]
    #[case(GeoPoint::new(0.0, 0.0, 12.0), 5.0)]
    #[case(GeoPoint::new(-45.5, 170.25, 3.0), 20.0)]
    fn test_three_stage_plan_shape(#[case] dock: GeoPoint, #[case] safe_depth: f64) {
        let plan = ThreeStageNavigation.create_plan(&dock, 0.3, 0.2, safe_depth).unwrap();

        assert_eq!(plan.len(), 3);
        let steps = plan.steps();
        assert_eq!(steps[0].kind, StepKind::MoveHorizontal);
        assert_eq!(steps[0].target.depth, safe_depth);
        assert_eq!(steps[0].speed, 0.3);
        assert_eq!(steps[1].kind, StepKind::Descend);
        assert_eq!(steps[1].target, dock);
        assert_eq!(steps[1].speed, 0.2);
        assert_eq!(steps[2].kind, StepKind::MoveHorizontal);
        assert_eq!(steps[2].target, dock);
    }

    #[rstest]
    #[case(GeoPoint::new(66.442387, 10.369335, 80.0))]
    #[case(GeoPoint::new(0.0, 0.0, 0.0))]
    fn test_direct_plan_single_step(#[case] dock: GeoPoint) {
        let plan = DirectNavigation.create_plan(&dock, 0.3, 0.2, 70.0).unwrap();

        assert_eq!(plan.len(), 1);
        let step = &plan.steps()[0];
        assert_eq!(step.kind, StepKind::MoveToDepthAndPosition);
        assert_eq!(step.target, dock);
        assert_eq!(step.speed, 0.3);
        assert_eq!(step.vertical_speed, Some(0.2));
    }

    #[test]
    fn test_plan_invariant_rejects_wrong_final_target() {
        let dock = docking();
        let steps = vec![WaypointStep::move_horizontal("Near", dock.with_depth(10.0), 0.3)];
        let result = MissionPlan::new("broken", dock, steps);
        assert!(matches!(result, Err(NavigationError::InvalidPlan { .. })));
    }

    #[test]
    fn test_plan_invariant_rejects_empty_plan() {
        let result = MissionPlan::new("empty", docking(), Vec::new());
        assert!(matches!(result, Err(NavigationError::InvalidPlan { .. })));
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let result = ThreeStageNavigation.create_plan(&docking(), 0.0, 0.2, 70.0);
        assert!(matches!(result, Err(NavigationError::InvalidInput { .. })));

        let result = DirectNavigation.create_plan(&docking(), 0.3, f64::NAN, 70.0);
        assert!(matches!(result, Err(NavigationError::InvalidInput { .. })));
    }

    #[test]
    fn test_approach_depth_has_floor() {
        assert_eq!(approach_depth(80.0, 10.0), 70.0);
        assert_eq!(approach_depth(8.0, 10.0), MIN_APPROACH_DEPTH_M);
    }

    #[test]
    fn test_planner_derives_safe_depth_from_offset() {
        let config = NavigationConfig {
            safe_depth_m: None,
            approach_depth_offset_m: 15.0,
            ..NavigationConfig::default()
        };
        let planner = NavigationPlanner::new(&config);
        let plan = planner.create_plan(&docking()).unwrap();
        assert_eq!(plan.steps()[0].target.depth, 65.0);
    }

    #[test]
    fn test_planner_uses_configured_strategy() {
        let config = NavigationConfig {
            strategy: StrategyKind::Direct,
            ..NavigationConfig::default()
        };
        let planner = NavigationPlanner::new(&config);
        assert_eq!(planner.strategy_name(), "Direct Approach");
        assert_eq!(planner.create_plan(&docking()).unwrap().len(), 1);
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("direct".parse::<StrategyKind>(), Ok(StrategyKind::Direct));
        assert_eq!("three-stage".parse::<StrategyKind>(), Ok(StrategyKind::ThreeStage));
        assert!("zigzag".parse::<StrategyKind>().is_err());
    }
}
