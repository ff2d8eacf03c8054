use crate::algorithms::StrategyKind;
use crate::core::GeoPoint;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, one section per component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Docking station position (depth positive down)
    pub docking: GeoPoint,
    pub navigation: NavigationConfig,
    pub mission: MissionConfig,
    pub usbl: UsblConfig,
    pub logging: LoggingConfig,
}

/// Planner strategy, speeds and arrival tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub strategy: StrategyKind,
    /// Horizontal speed (m/s)
    pub approach_speed_ms: f64,
    /// Vertical speed (m/s)
    pub descent_speed_ms: f64,
    /// Explicit safe depth for the approach leg, derived from the offset when absent
    pub safe_depth_m: Option<f64>,
    /// How far above the docking depth to approach (meters)
    pub approach_depth_offset_m: f64,
    /// Horizontal circle of acceptance (meters)
    pub acceptance_radius_m: f64,
    /// Allowed depth error (meters)
    pub depth_tolerance_m: f64,
}

/// Mission loop timing and log destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Global mission timeout (seconds)
    pub timeout_s: u64,
    /// Wait between telemetry polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Directory receiving mission log files
    pub log_dir: String,
}

/// USBL positioning source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsblConfig {
    pub host: String,
    pub port: u16,
    /// Fix requests per position estimate
    pub sample_count: usize,
    /// Reject fixes farther than this many standard deviations from the mean
    pub outlier_threshold_sigma: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            docking: GeoPoint::new(66.442387, 10.369335, 80.0),
            navigation: NavigationConfig::default(),
            mission: MissionConfig::default(),
            usbl: UsblConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::ThreeStage,
            approach_speed_ms: 0.3,
            descent_speed_ms: 0.2,
            safe_depth_m: None,
            approach_depth_offset_m: 10.0,
            acceptance_radius_m: 2.0,
            depth_tolerance_m: 0.5,
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            timeout_s: 1800, // 30 minutes
            poll_interval_ms: 2000,
            log_dir: "mission_logs".to_string(),
        }
    }
}

impl MissionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for UsblConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.189".to_string(),
            port: 9200,
            sample_count: 5,
            outlier_threshold_sigma: None,
        }
    }
}

impl UsblConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    /// Parsed level, `None` if the string is not a known level
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.level.parse().ok()
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid parameter value
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    IoError { message: String },
    /// JSON serialization/deserialization error
    SerializationError { message: String },
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn into_result(self) -> Result<Vec<String>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.warnings),
        }
    }
}

/// Overrides applied on top of a loaded configuration, typically from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub docking_latitude: Option<f64>,
    pub docking_longitude: Option<f64>,
    pub docking_depth: Option<f64>,
    pub timeout_s: Option<u64>,
    pub approach_speed_ms: Option<f64>,
    pub descent_speed_ms: Option<f64>,
    pub usbl_sample_count: Option<usize>,
    pub usbl_host: Option<String>,
    pub usbl_port: Option<u16>,
    pub strategy: Option<StrategyKind>,
    /// Undo every override if any of them is rejected
    pub rollback_on_failure: bool,
}

/// Outcome of applying overrides
#[derive(Debug, Clone)]
pub struct OverrideResult {
    pub applied: Vec<String>,
    pub failed: Vec<String>,
    pub total: usize,
}

/// Holds the active configuration and guards every change with validation
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    system_config: SystemConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn get_system_config(&self) -> &SystemConfig {
        &self.system_config
    }

    /// Replace the whole configuration if it validates
    pub fn update_system_config(&mut self, config: SystemConfig) -> Result<(), ConfigError> {
        Self::validate_system_config(&config).into_result()?;
        self.system_config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: SystemConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        let warnings = Self::validate_system_config(&config).into_result()?;
        for warning in warnings {
            log::warn!("{}: {}", path_str, warning);
        }

        self.system_config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(&self.system_config).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    pub fn config_file_path(&self) -> Option<&str> {
        self.config_file_path.as_deref()
    }

    /// Check if configuration has been modified since last load or save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    // Runtime parameter adjustment

    /// Update the docking point; returns the previous one
    pub fn set_docking_point(&mut self, point: GeoPoint) -> Result<GeoPoint, ConfigError> {
        if let Some(error) = validate_docking(&point, &mut Vec::new()).into_iter().next() {
            return Err(error);
        }
        let old_value = self.system_config.docking;
        self.system_config.docking = point;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_approach_speed(&mut self, speed_ms: f64) -> Result<f64, ConfigError> {
        check_speed("navigation.approach_speed_ms", speed_ms)?;
        let old_value = self.system_config.navigation.approach_speed_ms;
        self.system_config.navigation.approach_speed_ms = speed_ms;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_descent_speed(&mut self, speed_ms: f64) -> Result<f64, ConfigError> {
        check_speed("navigation.descent_speed_ms", speed_ms)?;
        let old_value = self.system_config.navigation.descent_speed_ms;
        self.system_config.navigation.descent_speed_ms = speed_ms;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_mission_timeout(&mut self, timeout_s: u64) -> Result<u64, ConfigError> {
        if timeout_s == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "mission.timeout_s".to_string(),
                value: timeout_s.to_string(),
                reason: "Mission timeout must be positive".to_string(),
            });
        }
        let old_value = self.system_config.mission.timeout_s;
        self.system_config.mission.timeout_s = timeout_s;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_usbl_sample_count(&mut self, count: usize) -> Result<usize, ConfigError> {
        if count == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "usbl.sample_count".to_string(),
                value: count.to_string(),
                reason: "At least one USBL sample is required".to_string(),
            });
        }
        let old_value = self.system_config.usbl.sample_count;
        self.system_config.usbl.sample_count = count;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Point the USBL client at another transceiver; returns the previous endpoint
    pub fn set_usbl_endpoint(&mut self, host: &str, port: u16) -> Result<String, ConfigError> {
        check_endpoint(host, port)?;
        let old_value = self.system_config.usbl.endpoint();
        self.system_config.usbl.host = host.to_string();
        self.system_config.usbl.port = port;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_strategy(&mut self, strategy: StrategyKind) -> StrategyKind {
        let old_value = self.system_config.navigation.strategy;
        self.system_config.navigation.strategy = strategy;
        self.is_modified = true;
        old_value
    }

    /// Apply a batch of overrides, each through its validated setter
    pub fn apply_overrides(
        &mut self,
        overrides: &ConfigOverrides,
    ) -> Result<OverrideResult, ConfigError> {
        let original_config = self.system_config.clone();
        let original_modified = self.is_modified;

        let mut applied = Vec::new();
        let mut failed = Vec::new();
        let mut total = 0;

        if overrides.docking_latitude.is_some()
            || overrides.docking_longitude.is_some()
            || overrides.docking_depth.is_some()
        {
            total += 1;
            let current = self.system_config.docking;
            let point = GeoPoint::new(
                overrides.docking_latitude.unwrap_or(current.latitude),
                overrides.docking_longitude.unwrap_or(current.longitude),
                overrides.docking_depth.unwrap_or(current.depth),
            );
            match self.set_docking_point(point) {
                Ok(old) => applied.push(format!(
                    "docking: ({}, {}, {}) -> ({}, {}, {})",
                    old.latitude,
                    old.longitude,
                    old.depth,
                    point.latitude,
                    point.longitude,
                    point.depth
                )),
                Err(e) => failed.push(format!("docking: {}", e)),
            }
        }

        if let Some(timeout) = overrides.timeout_s {
            total += 1;
            match self.set_mission_timeout(timeout) {
                Ok(old) => applied.push(format!("timeout_s: {} -> {}", old, timeout)),
                Err(e) => failed.push(format!("timeout_s: {}", e)),
            }
        }

        if let Some(speed) = overrides.approach_speed_ms {
            total += 1;
            match self.set_approach_speed(speed) {
                Ok(old) => applied.push(format!("approach_speed_ms: {} -> {}", old, speed)),
                Err(e) => failed.push(format!("approach_speed_ms: {}", e)),
            }
        }

        if let Some(speed) = overrides.descent_speed_ms {
            total += 1;
            match self.set_descent_speed(speed) {
                Ok(old) => applied.push(format!("descent_speed_ms: {} -> {}", old, speed)),
                Err(e) => failed.push(format!("descent_speed_ms: {}", e)),
            }
        }

        if let Some(count) = overrides.usbl_sample_count {
            total += 1;
            match self.set_usbl_sample_count(count) {
                Ok(old) => applied.push(format!("usbl.sample_count: {} -> {}", old, count)),
                Err(e) => failed.push(format!("usbl.sample_count: {}", e)),
            }
        }

        if overrides.usbl_host.is_some() || overrides.usbl_port.is_some() {
            total += 1;
            let current = &self.system_config.usbl;
            let host = overrides.usbl_host.clone().unwrap_or_else(|| current.host.clone());
            let port = overrides.usbl_port.unwrap_or(current.port);
            match self.set_usbl_endpoint(&host, port) {
                Ok(old) => applied.push(format!("usbl: {} -> {}:{}", old, host, port)),
                Err(e) => failed.push(format!("usbl: {}", e)),
            }
        }

        if let Some(strategy) = overrides.strategy {
            total += 1;
            let old = self.set_strategy(strategy);
            applied.push(format!("strategy: {:?} -> {:?}", old, strategy));
        }

        if !failed.is_empty() && overrides.rollback_on_failure {
            self.system_config = original_config;
            self.is_modified = original_modified;

            return Err(ConfigError::InvalidParameter {
                parameter: "overrides".to_string(),
                value: "multiple".to_string(),
                reason: format!(
                    "{} overrides rejected, rolled back all changes: {}",
                    failed.len(),
                    failed.join("; ")
                ),
            });
        }

        Ok(OverrideResult { applied, failed, total })
    }

    /// Validate a full configuration
    pub fn validate_system_config(config: &SystemConfig) -> ValidationResult {
        let mut warnings = Vec::new();
        let mut errors = validate_docking(&config.docking, &mut warnings);

        let nav = &config.navigation;
        for (parameter, speed) in [
            ("navigation.approach_speed_ms", nav.approach_speed_ms),
            ("navigation.descent_speed_ms", nav.descent_speed_ms),
        ] {
            match check_speed(parameter, speed) {
                Err(e) => errors.push(e),
                Ok(()) if speed > 2.0 => {
                    warnings.push(format!(
                        "{} of {} m/s exceeds typical drone speed",
                        parameter, speed
                    ))
                }
                Ok(()) => {}
            }
        }

        if let Some(safe_depth) = nav.safe_depth_m {
            if !safe_depth.is_finite() || safe_depth < 0.0 {
                errors.push(ConfigError::InvalidParameter {
                    parameter: "navigation.safe_depth_m".to_string(),
                    value: safe_depth.to_string(),
                    reason: "Safe depth must be a non-negative number of meters".to_string(),
                });
            } else if safe_depth > config.docking.depth {
                warnings.push(
                    "Safe depth is below the docking depth; the descent leg will ascend"
                        .to_string(),
                );
            }
        }

        if !nav.approach_depth_offset_m.is_finite() || nav.approach_depth_offset_m < 0.0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "navigation.approach_depth_offset_m".to_string(),
                value: nav.approach_depth_offset_m.to_string(),
                reason: "Approach depth offset must be non-negative".to_string(),
            });
        }

        for (parameter, tolerance) in [
            ("navigation.acceptance_radius_m", nav.acceptance_radius_m),
            ("navigation.depth_tolerance_m", nav.depth_tolerance_m),
        ] {
            if !(tolerance.is_finite() && tolerance > 0.0) {
                errors.push(ConfigError::InvalidParameter {
                    parameter: parameter.to_string(),
                    value: tolerance.to_string(),
                    reason: "Arrival tolerance must be positive".to_string(),
                });
            }
        }

        if config.mission.timeout_s == 0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "mission.timeout_s".to_string(),
                value: config.mission.timeout_s.to_string(),
                reason: "Mission timeout must be positive".to_string(),
            });
        }

        if config.mission.poll_interval_ms == 0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "mission.poll_interval_ms".to_string(),
                value: config.mission.poll_interval_ms.to_string(),
                reason: "Poll interval must be positive".to_string(),
            });
        } else if config.mission.poll_interval_ms > config.mission.timeout_s.saturating_mul(1000) {
            warnings.push("Poll interval is longer than the mission timeout".to_string());
        }

        if config.usbl.sample_count == 0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "usbl.sample_count".to_string(),
                value: config.usbl.sample_count.to_string(),
                reason: "At least one USBL sample is required".to_string(),
            });
        } else if config.usbl.sample_count > 50 {
            warnings.push("Large USBL sample count will delay mission start".to_string());
        }

        if let Some(sigma) = config.usbl.outlier_threshold_sigma {
            if !(sigma.is_finite() && sigma > 0.0) {
                errors.push(ConfigError::InvalidParameter {
                    parameter: "usbl.outlier_threshold_sigma".to_string(),
                    value: sigma.to_string(),
                    reason: "Outlier threshold must be positive".to_string(),
                });
            }
        }

        if let Err(e) = check_endpoint(&config.usbl.host, config.usbl.port) {
            errors.push(e);
        }

        if config.logging.level_filter().is_none() {
            errors.push(ConfigError::InvalidParameter {
                parameter: "logging.level".to_string(),
                value: config.logging.level.clone(),
                reason: "Unknown log level".to_string(),
            });
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

fn validate_docking(point: &GeoPoint, warnings: &mut Vec<String>) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !(point.latitude.is_finite() && point.latitude.abs() <= 90.0) {
        errors.push(ConfigError::InvalidParameter {
            parameter: "docking.latitude".to_string(),
            value: point.latitude.to_string(),
            reason: "Latitude must be between -90 and 90 degrees".to_string(),
        });
    }

    if !(point.longitude.is_finite() && point.longitude.abs() <= 180.0) {
        errors.push(ConfigError::InvalidParameter {
            parameter: "docking.longitude".to_string(),
            value: point.longitude.to_string(),
            reason: "Longitude must be between -180 and 180 degrees".to_string(),
        });
    }

    if !(point.depth.is_finite() && point.depth >= 0.0) {
        errors.push(ConfigError::InvalidParameter {
            parameter: "docking.depth".to_string(),
            value: point.depth.to_string(),
            reason: "Depth must be non-negative (positive down)".to_string(),
        });
    } else if point.depth > 300.0 {
        warnings.push("Docking depth beyond 300 m exceeds typical drone ratings".to_string());
    }

    errors
}

fn check_speed(parameter: &str, speed: f64) -> Result<(), ConfigError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: speed.to_string(),
            reason: "Speed must be positive".to_string(),
        })
    }
}

fn check_endpoint(host: &str, port: u16) -> Result<(), ConfigError> {
    if host.trim().is_empty() {
        return Err(ConfigError::InvalidParameter {
            parameter: "usbl.host".to_string(),
            value: host.to_string(),
            reason: "Host must not be empty".to_string(),
        });
    }
    if port == 0 {
        return Err(ConfigError::InvalidParameter {
            parameter: "usbl.port".to_string(),
            value: "0".to_string(),
            reason: "Port must be non-zero".to_string(),
        });
    }
    Ok(())
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::IoError { message } => write!(f, "I/O error: {}", message),
            ConfigError::SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
