//! Scripted collaborators for testing and development

use crate::core::{current_time_ms, GeoPoint, RelativeFix, StatusFlags, TelemetrySample};
use crate::hardware::{
    CommError, CommResult, PositioningSource, VehicleCommand, VehicleControl,
};
use std::collections::{HashSet, VecDeque};

/// Positioning source that replays a queue of scripted reads
pub struct MockPositioningSource {
    name: String,
    readings: VecDeque<CommResult<RelativeFix>>,
    connected: bool,
    reads: usize,
}

impl MockPositioningSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            readings: VecDeque::new(),
            connected: true,
            reads: 0,
        }
    }

    /// Queue a successful fix
    pub fn push_fix(&mut self, x: f64, y: f64) {
        self.readings.push_back(Ok(RelativeFix::new(x, y)));
    }

    /// Queue a failed read
    pub fn push_error(&mut self, error: CommError) {
        self.readings.push_back(Err(error));
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Number of reads attempted so far
    pub fn read_count(&self) -> usize {
        self.reads
    }

    pub fn queued_count(&self) -> usize {
        self.readings.len()
    }
}

impl PositioningSource for MockPositioningSource {
    fn read_fix(&mut self) -> CommResult<RelativeFix> {
        self.reads += 1;
        if !self.connected {
            return Err(CommError::ConnectionLost { device: self.name.clone() });
        }
        // An empty queue behaves like a source that never answers
        self.readings
            .pop_front()
            .unwrap_or(Err(CommError::Timeout { timeout_ms: 1000 }))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        format!("mock:{}", self.name)
    }
}

/// When a scripted vehicle reports being at its commanded target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrivalBehavior {
    /// Arrives once this many telemetry reads have happened since the last command
    AfterReads(u32),
    /// Never reaches the target
    Never,
}

/// Vehicle whose telemetry follows a fixed script instead of physics
pub struct ScriptedVehicle {
    position: GeoPoint,
    target: Option<GeoPoint>,
    arrival: ArrivalBehavior,
    reads_since_command: u32,
    reads: u32,
    fault_on_read: Option<u32>,
    error_reads: HashSet<u32>,
    fatal_error_reads: HashSet<u32>,
    commands: Vec<VehicleCommand>,
    connected: bool,
    fail_stop: bool,
    failing_commands: u32,
}

impl ScriptedVehicle {
    pub fn new(start: GeoPoint, arrival: ArrivalBehavior) -> Self {
        Self {
            position: start,
            target: None,
            arrival,
            reads_since_command: 0,
            reads: 0,
            fault_on_read: None,
            error_reads: HashSet::new(),
            fatal_error_reads: HashSet::new(),
            commands: Vec::new(),
            connected: true,
            fail_stop: false,
            failing_commands: 0,
        }
    }

    /// Report a hard fault on the given (1-based) telemetry read
    pub fn with_fault_on_read(mut self, read: u32) -> Self {
        self.fault_on_read = Some(read);
        self
    }

    /// Fail the given (1-based) telemetry read with a transient timeout
    pub fn with_read_error_on(mut self, read: u32) -> Self {
        self.error_reads.insert(read);
        self
    }

    /// Fail the given (1-based) telemetry read with a non-recoverable error
    pub fn with_fatal_read_error_on(mut self, read: u32) -> Self {
        self.fatal_error_reads.insert(read);
        self
    }

    /// Make every stop command fail
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Reject the next `count` move or descend commands with a timeout
    pub fn with_failing_commands(mut self, count: u32) -> Self {
        self.failing_commands = count;
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// All commands received, in order
    pub fn commands(&self) -> &[VehicleCommand] {
        &self.commands
    }

    pub fn stop_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, VehicleCommand::Stop))
            .count()
    }

    pub fn telemetry_reads(&self) -> u32 {
        self.reads
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    fn check_link(&self) -> CommResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(CommError::ConnectionLost { device: "scripted-vehicle".to_string() })
        }
    }

    fn accept_command(&mut self) -> CommResult<()> {
        self.check_link()?;
        if self.failing_commands > 0 {
            self.failing_commands -= 1;
            return Err(CommError::Timeout { timeout_ms: 250 });
        }
        Ok(())
    }
}

impl VehicleControl for ScriptedVehicle {
    fn move_to(&mut self, target: &GeoPoint, speed: f64) -> CommResult<()> {
        self.accept_command()?;
        self.commands.push(VehicleCommand::MoveTo { target: *target, speed });
        self.target = Some(*target);
        self.reads_since_command = 0;
        Ok(())
    }

    fn descend_to(&mut self, depth: f64, speed: f64) -> CommResult<()> {
        self.accept_command()?;
        self.commands.push(VehicleCommand::DescendTo { depth, speed });
        let base = self.target.unwrap_or(self.position);
        self.target = Some(base.with_depth(depth));
        self.reads_since_command = 0;
        Ok(())
    }

    fn stop(&mut self) -> CommResult<()> {
        self.commands.push(VehicleCommand::Stop);
        self.target = None;
        if self.fail_stop {
            return Err(CommError::HardwareError {
                code: 3001,
                description: "Simulated stop failure".to_string(),
            });
        }
        Ok(())
    }

    fn get_telemetry(&mut self) -> CommResult<TelemetrySample> {
        self.check_link()?;
        self.reads += 1;
        self.reads_since_command += 1;

        if self.error_reads.contains(&self.reads) {
            return Err(CommError::Timeout { timeout_ms: 500 });
        }
        if self.fatal_error_reads.contains(&self.reads) {
            return Err(CommError::ConfigurationError {
                parameter: "telemetry_stream".to_string(),
                value: "closed".to_string(),
            });
        }

        if let (ArrivalBehavior::AfterReads(n), Some(target)) = (self.arrival, self.target) {
            if self.reads_since_command >= n {
                self.position = target;
            }
        }

        let mut sample = TelemetrySample::new(current_time_ms(), self.position);
        if self.fault_on_read == Some(self.reads) {
            sample = sample.with_flags(StatusFlags::faulted("thruster overcurrent"));
        }
        Ok(sample)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_replays_queue() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_fix(1.0, 2.0);
        source.push_error(CommError::Timeout { timeout_ms: 100 });
        assert_eq!(source.queued_count(), 2);

        let fix = source.read_fix().unwrap();
        assert_eq!((fix.x, fix.y), (1.0, 2.0));
        assert!(source.read_fix().is_err());
        // Exhausted queue times out
        assert!(matches!(source.read_fix(), Err(CommError::Timeout { .. })));
        assert_eq!(source.read_count(), 3);
    }

    #[test]
    fn test_mock_source_disconnect() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_fix(1.0, 2.0);
        source.disconnect();
        assert!(!source.is_connected());
        assert!(matches!(source.read_fix(), Err(CommError::ConnectionLost { .. })));
    }

    #[test]
    fn test_scripted_vehicle_arrives_after_one_read() {
        let start = GeoPoint::new(0.0, 0.0, 0.0);
        let target = GeoPoint::new(0.001, 0.001, 10.0);
        let mut vehicle = ScriptedVehicle::new(start, ArrivalBehavior::AfterReads(1));

        vehicle.move_to(&target, 0.3).unwrap();
        let sample = vehicle.get_telemetry().unwrap();
        assert_eq!(sample.position, target);
        assert_eq!(vehicle.commands().len(), 1);
    }

    #[test]
    fn test_scripted_vehicle_descend_keeps_horizontal_position() {
        let start = GeoPoint::new(1.0, 2.0, 5.0);
        let mut vehicle = ScriptedVehicle::new(start, ArrivalBehavior::AfterReads(1));

        vehicle.descend_to(30.0, 0.2).unwrap();
        let sample = vehicle.get_telemetry().unwrap();
        assert_eq!(sample.position, GeoPoint::new(1.0, 2.0, 30.0));
    }

    #[test]
    fn test_scripted_vehicle_never_arrives() {
        let start = GeoPoint::new(0.0, 0.0, 0.0);
        let mut vehicle = ScriptedVehicle::new(start, ArrivalBehavior::Never);
        vehicle.move_to(&GeoPoint::new(1.0, 1.0, 1.0), 0.3).unwrap();
        for _ in 0..5 {
            assert_eq!(vehicle.get_telemetry().unwrap().position, start);
        }
    }

    #[test]
    fn test_scripted_fault_and_errors() {
        let start = GeoPoint::new(0.0, 0.0, 0.0);
        let mut vehicle = ScriptedVehicle::new(start, ArrivalBehavior::Never)
            .with_read_error_on(1)
            .with_fault_on_read(2);

        assert!(vehicle.get_telemetry().is_err());
        let sample = vehicle.get_telemetry().unwrap();
        assert!(sample.flags.fault);
    }
}
