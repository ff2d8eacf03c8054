//! Synthetic positioning data and a kinematic vehicle for offline runs

use crate::algorithms::CoordinateConverter;
use crate::core::{current_time_ms, GeoPoint, RelativeFix, TelemetrySample};
use crate::hardware::{CommError, CommResult, PositioningSource, VehicleControl};
use log::debug;
use nalgebra::Vector2;
use rand::Rng;

/// USBL stand-in producing noisy fixes around a true offset
pub struct SimulatedUsbl {
    endpoint: String,
    true_offset: Vector2<f64>,
    noise_m: f64,
    dropout_probability: f64,
}

impl SimulatedUsbl {
    pub fn new(endpoint: &str, true_x: f64, true_y: f64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            true_offset: Vector2::new(true_x, true_y),
            noise_m: 0.5,
            dropout_probability: 0.0,
        }
    }

    /// Uniform noise amplitude in meters applied to each axis
    pub fn with_noise(mut self, noise_m: f64) -> Self {
        self.noise_m = noise_m.abs();
        self
    }

    /// Probability (0.0 to 1.0) that a read times out
    pub fn with_dropouts(mut self, probability: f64) -> Self {
        self.dropout_probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl PositioningSource for SimulatedUsbl {
    fn read_fix(&mut self) -> CommResult<RelativeFix> {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < self.dropout_probability {
            return Err(CommError::Timeout { timeout_ms: 1000 });
        }

        let noise = if self.noise_m > 0.0 {
            Vector2::new(
                rng.gen_range(-self.noise_m..=self.noise_m),
                rng.gen_range(-self.noise_m..=self.noise_m),
            )
        } else {
            Vector2::zeros()
        };
        let reading = self.true_offset + noise;
        Ok(RelativeFix::new(reading.x, reading.y))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("simulated-usbl@{}", self.endpoint)
    }
}

/// Vehicle that moves toward its commanded targets at the commanded speeds.
///
/// Each telemetry read advances the simulation by one fixed time step.
pub struct SimulatedVehicle {
    position: GeoPoint,
    horizontal_target: Option<(GeoPoint, f64)>,
    depth_target: Option<(f64, f64)>,
    default_vertical_speed: f64,
    step_s: f64,
    elapsed_s: f64,
    battery_level: f64,
    converter: CoordinateConverter,
}

impl SimulatedVehicle {
    pub fn new(start: GeoPoint, step_s: f64, default_vertical_speed: f64) -> Self {
        Self {
            position: start,
            horizontal_target: None,
            depth_target: None,
            default_vertical_speed,
            step_s,
            elapsed_s: 0.0,
            battery_level: 100.0,
            converter: CoordinateConverter::new(),
        }
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    fn advance(&mut self) {
        if let Some((target, speed)) = self.horizontal_target {
            let flat_target = target.with_depth(self.position.depth);
            // Inputs are finite by construction; a failed conversion just holds position
            if let Ok(offset) = self.converter.to_relative(&self.position, &flat_target) {
                let remaining = offset.offset();
                let distance = remaining.norm();
                let travel = (speed * self.step_s).min(distance);
                if distance > 0.0 {
                    let step = remaining * (travel / distance);
                    if let Ok(next) = self
                        .converter
                        .to_absolute(&self.position, &RelativeFix::new(step.x, step.y))
                    {
                        self.position = next;
                    }
                }
                if travel >= distance {
                    self.position = flat_target;
                }
            }
        }

        if let Some((depth, speed)) = self.depth_target {
            let delta = depth - self.position.depth;
            let travel = speed * self.step_s;
            if delta.abs() <= travel {
                self.position.depth = depth;
            } else {
                self.position.depth += travel * delta.signum();
            }
        }

        self.elapsed_s += self.step_s;
        self.battery_level = (self.battery_level - 0.001 * self.step_s).max(0.0);
    }
}

impl VehicleControl for SimulatedVehicle {
    fn move_to(&mut self, target: &GeoPoint, speed: f64) -> CommResult<()> {
        self.horizontal_target = Some((*target, speed));
        // Keep an already commanded vertical speed
        let vertical_speed = self
            .depth_target
            .map(|(_, s)| s)
            .unwrap_or(self.default_vertical_speed);
        self.depth_target = Some((target.depth, vertical_speed));
        debug!("Simulated vehicle moving to {:?} at {:.2} m/s", target, speed);
        Ok(())
    }

    fn descend_to(&mut self, depth: f64, speed: f64) -> CommResult<()> {
        self.depth_target = Some((depth, speed));
        debug!("Simulated vehicle changing depth to {:.1}m at {:.2} m/s", depth, speed);
        Ok(())
    }

    fn stop(&mut self) -> CommResult<()> {
        self.horizontal_target = None;
        self.depth_target = None;
        Ok(())
    }

    fn get_telemetry(&mut self) -> CommResult<TelemetrySample> {
        self.advance();
        let mut sample = TelemetrySample::new(current_time_ms(), self.position);
        sample.battery_level = Some(self.battery_level);
        sample.water_temperature_c = Some(6.5);
        Ok(sample)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_usbl_noise_bounds() {
        let mut usbl = SimulatedUsbl::new("127.0.0.1:9200", 10.0, -5.0).with_noise(0.5);
        for _ in 0..20 {
            let fix = usbl.read_fix().unwrap();
            assert!((fix.x - 10.0).abs() <= 0.5);
            assert!((fix.y + 5.0).abs() <= 0.5);
        }
    }

    #[test]
    fn test_simulated_usbl_full_dropout() {
        let mut usbl = SimulatedUsbl::new("127.0.0.1:9200", 0.0, 0.0).with_dropouts(1.0);
        assert!(usbl.read_fix().is_err());
    }

    #[test]
    fn test_simulated_vehicle_reaches_target() {
        let start = GeoPoint::new(66.442387, 10.369335, 0.0);
        let converter = CoordinateConverter::new();
        let target = converter
            .to_absolute(&start.with_depth(10.0), &RelativeFix::new(6.0, 8.0))
            .unwrap();

        let mut vehicle = SimulatedVehicle::new(start, 1.0, 0.5);
        vehicle.move_to(&target, 1.0).unwrap();

        // 10 m horizontal at 1 m/s, 10 m vertical at 0.5 m/s
        for _ in 0..25 {
            vehicle.get_telemetry().unwrap();
        }
        let distance = converter.distance_m(&vehicle.position(), &target).unwrap();
        assert!(distance < 0.01, "distance = {}", distance);
        assert!((vehicle.position().depth - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulated_vehicle_stop_holds_position() {
        let start = GeoPoint::new(0.0, 0.0, 0.0);
        let mut vehicle = SimulatedVehicle::new(start, 1.0, 0.5);
        vehicle.descend_to(20.0, 1.0).unwrap();
        vehicle.get_telemetry().unwrap();
        vehicle.stop().unwrap();
        let held = vehicle.get_telemetry().unwrap().position;
        assert_eq!(held.depth, 1.0);
    }
}
