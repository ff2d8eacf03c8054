//! Mission executor: drives a plan against the vehicle, one poll tick at a time

use crate::algorithms::{CoordinateConverter, MissionPlan, StepKind, WaypointStep};
use crate::core::{GeoPoint, NavResult, NavigationError, TelemetrySample};
use crate::hardware::{CommError, CommResult, VehicleCommand, VehicleControl};
use crate::mission::{
    Clock, EndReason, EventKind, LogSink, MissionLog, MissionState, SerializedLog,
};
use crate::utils::config::NavigationConfig;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Arrival tolerances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionSettings {
    /// Horizontal circle of acceptance (meters)
    pub acceptance_radius_m: f64,
    /// Allowed depth error (meters)
    pub depth_tolerance_m: f64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            acceptance_radius_m: 2.0,
            depth_tolerance_m: 0.5,
        }
    }
}

impl ExecutionSettings {
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self {
            acceptance_radius_m: config.acceptance_radius_m,
            depth_tolerance_m: config.depth_tolerance_m,
        }
    }
}

/// Shared flag asking the executor to abort at its next tick
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Consume a pending request
    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// Result of a finished mission
#[derive(Debug, Clone, PartialEq)]
pub struct MissionOutcome {
    pub state: MissionState,
    pub reason: EndReason,
    /// Poll ticks processed
    pub ticks: u32,
    pub steps_completed: usize,
    pub elapsed_ms: u64,
    pub log: SerializedLog,
    /// Where the log sink stored the log, if it succeeded
    pub log_location: Option<String>,
    /// Why the log sink could not store the log
    pub log_error: Option<NavigationError>,
}

impl MissionOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == MissionState::Succeeded
    }
}

struct MissionRun {
    plan: MissionPlan,
    state: MissionState,
    reason: Option<EndReason>,
    step_index: usize,
    command_pending: bool,
    started_at_ms: u64,
    timeout_ms: u64,
    ticks: u32,
    log: MissionLog,
    outcome: Option<MissionOutcome>,
}

/// Executes one mission plan at a time against a vehicle.
///
/// Each tick reads telemetry once, records it, and checks in order: vehicle
/// fault, arrival at the current step, global timeout. Arrival is checked
/// before the timeout, so a final arrival on the tick the timeout expires
/// still counts as success.
pub struct MissionExecutor<V: VehicleControl, C: Clock> {
    vehicle: V,
    clock: C,
    settings: ExecutionSettings,
    converter: CoordinateConverter,
    sink: Option<Box<dyn LogSink>>,
    stop: StopHandle,
    context: Value,
    run: Option<MissionRun>,
}

impl<V: VehicleControl, C: Clock> MissionExecutor<V, C> {
    pub fn new(vehicle: V, clock: C, settings: ExecutionSettings) -> Self {
        Self {
            vehicle,
            clock,
            settings,
            converter: CoordinateConverter::new(),
            sink: None,
            stop: StopHandle::new(),
            context: Value::Null,
            run: None,
        }
    }

    /// Persist finalized logs through `sink`
    pub fn with_log_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Extra data recorded in the `mission_start` record of the next run
    pub fn set_mission_context(&mut self, context: Value) {
        self.context = context;
    }

    /// Observe `stop` instead of the executor's own handle
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut V {
        &mut self.vehicle
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// State of the current run, `Idle` if none was started
    pub fn state(&self) -> MissionState {
        self.run.as_ref().map_or(MissionState::Idle, |r| r.state)
    }

    pub fn ticks(&self) -> u32 {
        self.run.as_ref().map_or(0, |r| r.ticks)
    }

    /// Zero-based index of the step being executed
    pub fn current_step(&self) -> Option<usize> {
        self.run
            .as_ref()
            .filter(|r| r.state == MissionState::Running)
            .map(|r| r.step_index)
    }

    /// Records of the current run so far
    pub fn log(&self) -> Option<&MissionLog> {
        self.run.as_ref().map(|r| &r.log)
    }

    /// Run `plan` to completion, then finalize and persist its log.
    pub fn execute(
        &mut self,
        plan: MissionPlan,
        timeout: Duration,
        poll_interval: Duration,
    ) -> NavResult<MissionOutcome> {
        if let Err(e) = self.start(plan, timeout) {
            if e != NavigationError::AlreadyRunning {
                self.finalize_run();
            }
            return Err(e);
        }

        loop {
            let state = self.tick();
            if state.is_terminal() {
                break;
            }
            self.clock.sleep(poll_interval);
        }

        self.finalize_run().ok_or_else(|| NavigationError::Fault {
            description: "mission loop exited without a terminal state".to_string(),
        })
    }

    /// Begin a new run and command its first step.
    ///
    /// Fails with `AlreadyRunning` while a run is in progress. A vehicle that
    /// is not connected ends the new run as `Failed` and returns `ReadError`.
    pub fn start(&mut self, plan: MissionPlan, timeout: Duration) -> NavResult<()> {
        if self.state() == MissionState::Running {
            return Err(NavigationError::AlreadyRunning);
        }

        let now = self.clock.now_ms();
        let mut log = MissionLog::new(plan.name(), now);
        log.record(
            now,
            EventKind::MissionStart,
            json!({
                "mission_name": plan.name(),
                "docking_point": plan.docking_point(),
                "steps": plan.steps(),
                "timeout_s": timeout.as_secs_f64(),
                "context": self.context.clone(),
            }),
        );
        info!(
            "Starting mission '{}' with {} steps, timeout {:.0}s",
            plan.name(),
            plan.len(),
            timeout.as_secs_f64()
        );

        if self.stop.is_stop_requested() {
            warn!("Stop requested before the mission started, aborting at the first tick");
        }
        let run = self.run.insert(MissionRun {
            plan,
            state: MissionState::Running,
            reason: None,
            step_index: 0,
            command_pending: true,
            started_at_ms: now,
            timeout_ms: timeout.as_millis() as u64,
            ticks: 0,
            log,
            outcome: None,
        });

        if !self.vehicle.is_connected() {
            let error = CommError::ConnectionLost { device: "vehicle".to_string() };
            error!("Vehicle not connected. Cannot run mission.");
            run.log.record(
                now,
                EventKind::ConnectionFailed,
                json!({ "error": error.to_string() }),
            );
            finish_run(
                run,
                now,
                MissionState::Failed,
                EndReason::ConnectionFailed { description: error.to_string() },
            );
            return Err(NavigationError::ReadError(error));
        }

        issue_command(&mut self.vehicle, run, now);
        Ok(())
    }

    /// Process one poll tick and return the resulting state.
    ///
    /// Does not sleep; the caller owns the wait between ticks.
    pub fn tick(&mut self) -> MissionState {
        let now = self.clock.now_ms();
        let Some(run) = self.run.as_mut() else {
            return MissionState::Idle;
        };
        if run.state.is_terminal() {
            return run.state;
        }
        let stop_requested = self.stop.take();

        run.ticks += 1;
        let tick = run.ticks;

        if stop_requested {
            warn!("Stop requested, aborting mission at tick {}", tick);
            let stop_ok = stop_vehicle(&mut self.vehicle);
            run.log.record(
                now,
                EventKind::Aborted,
                json!({ "tick": tick, "step": run.step_index + 1, "stop_ok": stop_ok }),
            );
            finish_run(run, now, MissionState::Failed, EndReason::Aborted);
            return run.state;
        }

        if run.command_pending {
            issue_command(&mut self.vehicle, run, now);
            if run.state.is_terminal() {
                return run.state;
            }
        }

        match self.vehicle.get_telemetry() {
            Err(e) if e.is_recoverable() => {
                warn!("Telemetry read failed at tick {}: {}", tick, e);
                run.log.record(
                    now,
                    EventKind::ReadError,
                    json!({ "tick": tick, "error": e.to_string() }),
                );
            }
            Err(e) => {
                error!("Unrecoverable telemetry error at tick {}: {}", tick, e);
                run.log.record(
                    now,
                    EventKind::Fault,
                    json!({ "tick": tick, "error": e.to_string() }),
                );
                finish_run(
                    run,
                    now,
                    MissionState::Failed,
                    EndReason::Fault { description: e.to_string() },
                );
                return run.state;
            }
            Ok(sample) => {
                let Some(target) = run.plan.step(run.step_index).map(|s| s.target) else {
                    // Unreachable while Running: the index only moves past the
                    // last step when the run succeeds.
                    finish_run(run, now, MissionState::Succeeded, EndReason::Arrived);
                    return run.state;
                };
                let distance = self.converter.distance_m(&sample.position, &target).ok();
                run.log.record(
                    now,
                    EventKind::Telemetry,
                    telemetry_payload(tick, run.step_index, &sample, distance),
                );

                if sample.flags.fault {
                    let description = sample
                        .flags
                        .fault_description
                        .clone()
                        .unwrap_or_else(|| "unspecified fault".to_string());
                    error!("Vehicle fault at tick {}: {}", tick, description);
                    run.log.record(
                        now,
                        EventKind::Fault,
                        json!({ "tick": tick, "error": description }),
                    );
                    finish_run(run, now, MissionState::Failed, EndReason::Fault { description });
                    return run.state;
                }

                if has_arrived(&self.settings, distance, &sample, &target) {
                    let step_number = run.step_index + 1;
                    info!(
                        "Step {}/{} complete at tick {}",
                        step_number,
                        run.plan.len(),
                        tick
                    );
                    run.log.record(
                        now,
                        EventKind::StepComplete,
                        json!({ "tick": tick, "step": step_number }),
                    );
                    run.step_index += 1;
                    if run.step_index >= run.plan.len() {
                        finish_run(run, now, MissionState::Succeeded, EndReason::Arrived);
                        return run.state;
                    }
                    run.command_pending = true;
                    issue_command(&mut self.vehicle, run, now);
                    if run.state.is_terminal() {
                        return run.state;
                    }
                } else {
                    debug!(
                        "Tick {}: step {}, {:.1}m from target, depth {:.1}m",
                        tick,
                        run.step_index + 1,
                        distance.unwrap_or(f64::NAN),
                        sample.depth()
                    );
                }
            }
        }

        let elapsed_ms = now.saturating_sub(run.started_at_ms);
        if elapsed_ms >= run.timeout_ms {
            warn!("Mission timeout after {:.1} seconds", elapsed_ms as f64 / 1000.0);
            let stop_ok = stop_vehicle(&mut self.vehicle);
            run.log.record(
                now,
                EventKind::Timeout,
                json!({
                    "tick": tick,
                    "step": run.step_index + 1,
                    "elapsed_ms": elapsed_ms,
                    "stop_ok": stop_ok,
                }),
            );
            finish_run(run, now, MissionState::TimedOut, EndReason::Timeout { elapsed_ms });
        }

        run.state
    }

    /// Finalize and persist the log of a finished run.
    ///
    /// Returns `None` while no run exists or the run is still going. Repeated
    /// calls return the same outcome without persisting again.
    pub fn finalize_run(&mut self) -> Option<MissionOutcome> {
        let now = self.clock.now_ms();
        let run = self.run.as_mut()?;
        if !run.state.is_terminal() {
            return None;
        }
        if let Some(outcome) = &run.outcome {
            return Some(outcome.clone());
        }

        let log = run.log.finalize(now, run.state);
        let (log_location, log_error) = match self.sink.as_mut() {
            Some(sink) => match sink.persist(&log) {
                Ok(location) => (Some(location), None),
                Err(e) => {
                    error!("Mission log not saved: {}", e);
                    (None, Some(e))
                }
            },
            None => (None, None),
        };

        let outcome = MissionOutcome {
            state: run.state,
            reason: run.reason.clone().unwrap_or(EndReason::Aborted),
            ticks: run.ticks,
            steps_completed: run.step_index,
            elapsed_ms: log.end_time.saturating_sub(log.start_time),
            log,
            log_location,
            log_error,
        };
        run.outcome = Some(outcome.clone());
        Some(outcome)
    }
}

/// Send the current step's command, updating the run on failure
fn issue_command<V: VehicleControl>(vehicle: &mut V, run: &mut MissionRun, now: u64) {
    let Some(step) = run.plan.step(run.step_index).cloned() else {
        return;
    };
    let step_number = run.step_index + 1;

    match send_step(vehicle, &step) {
        Ok(commands) => {
            run.command_pending = false;
            info!(
                "Step {}/{} '{}': {:?} to ({:.6}, {:.6}) at {:.1}m",
                step_number,
                run.plan.len(),
                step.name,
                step.kind,
                step.target.latitude,
                step.target.longitude,
                step.target.depth
            );
            run.log.record(
                now,
                EventKind::Command,
                json!({
                    "step": step_number,
                    "name": step.name,
                    "kind": step.kind,
                    "commands": commands,
                }),
            );
        }
        Err(e) if e.is_recoverable() => {
            warn!("Command for step {} failed, retrying next tick: {}", step_number, e);
            run.log.record(
                now,
                EventKind::CommandError,
                json!({ "step": step_number, "error": e.to_string() }),
            );
        }
        Err(e) => {
            error!("Command for step {} rejected: {}", step_number, e);
            run.log.record(
                now,
                EventKind::Fault,
                json!({ "step": step_number, "error": e.to_string() }),
            );
            finish_run(
                run,
                now,
                MissionState::Failed,
                EndReason::Fault { description: e.to_string() },
            );
        }
    }
}

fn send_step<V: VehicleControl>(
    vehicle: &mut V,
    step: &WaypointStep,
) -> CommResult<Vec<VehicleCommand>> {
    let target = step.target;
    match step.kind {
        StepKind::MoveHorizontal => {
            vehicle.move_to(&target, step.speed)?;
            Ok(vec![VehicleCommand::MoveTo { target, speed: step.speed }])
        }
        StepKind::Descend => {
            vehicle.descend_to(target.depth, step.speed)?;
            Ok(vec![VehicleCommand::DescendTo { depth: target.depth, speed: step.speed }])
        }
        StepKind::MoveToDepthAndPosition => {
            let vertical_speed = step.vertical_speed.unwrap_or(step.speed);
            vehicle.descend_to(target.depth, vertical_speed)?;
            vehicle.move_to(&target, step.speed)?;
            Ok(vec![
                VehicleCommand::DescendTo { depth: target.depth, speed: vertical_speed },
                VehicleCommand::MoveTo { target, speed: step.speed },
            ])
        }
    }
}

/// Best-effort stop; a failure is logged and never changes the outcome
fn stop_vehicle<V: VehicleControl>(vehicle: &mut V) -> bool {
    match vehicle.stop() {
        Ok(()) => true,
        Err(e) => {
            warn!("Stop command failed: {}", e);
            false
        }
    }
}

fn finish_run(run: &mut MissionRun, now: u64, state: MissionState, reason: EndReason) {
    if !run.state.can_transition_to(state) {
        return;
    }
    run.state = state;
    run.log.record(
        now,
        EventKind::MissionEnd,
        json!({
            "state": state,
            "reason": reason,
            "ticks": run.ticks,
            "steps_completed": run.step_index,
        }),
    );
    match state {
        MissionState::Succeeded => info!("Mission completed successfully"),
        _ => warn!("Mission ended {} ({:?})", state, reason),
    }
    run.reason = Some(reason);
}

fn has_arrived(
    settings: &ExecutionSettings,
    distance: Option<f64>,
    sample: &TelemetrySample,
    target: &GeoPoint,
) -> bool {
    match distance {
        Some(d) => {
            d <= settings.acceptance_radius_m
                && (sample.depth() - target.depth).abs() <= settings.depth_tolerance_m
        }
        None => false,
    }
}

fn telemetry_payload(
    tick: u32,
    step_index: usize,
    sample: &TelemetrySample,
    distance: Option<f64>,
) -> Value {
    json!({
        "tick": tick,
        "step": step_index + 1,
        "vehicle_timestamp": sample.timestamp_ms,
        "latitude": sample.position.latitude,
        "longitude": sample.position.longitude,
        "depth": sample.depth(),
        "distance_to_target_m": distance,
        "fault": sample.flags.fault,
        "battery": sample.battery_level,
        "water_temperature_c": sample.water_temperature_c,
    })
}
