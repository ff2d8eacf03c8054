use docking_nav::algorithms::{CoordinateConverter, StrategyKind};
use docking_nav::api::DockingMission;
use docking_nav::core::{current_time_ms, GeoPoint, NavResult, RelativeFix};
use docking_nav::hardware::{SimulatedUsbl, SimulatedVehicle};
use docking_nav::mission::{Clock, EndReason, ManualClock, MissionOutcome, StopHandle, SystemClock};
use docking_nav::utils::{ConfigOverrides, ConfigurationManager};
use log::{error, info, warn};
use std::str::FromStr;

/// Command line options
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<String>,
    write_config: Option<String>,
    overrides: ConfigOverrides,
    no_usbl: bool,
    realtime: bool,
    start_offset: Option<(f64, f64)>,
    help: bool,
}

/// Simulated drone start, meters east and north of the docking station
const DEFAULT_START_OFFSET: (f64, f64) = (-40.0, 60.0);

/// Exit status after an operator interrupt (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [options]\n\
         \n\
         Options:\n  \
           --config <path>          Load configuration from a JSON file\n  \
           --write-config <path>    Write the effective configuration and exit\n  \
           --docking-lat <deg>      Docking station latitude\n  \
           --docking-lon <deg>      Docking station longitude\n  \
           --docking-depth <m>      Docking station depth\n  \
           --timeout <s>            Mission timeout in seconds\n  \
           --approach-speed <m/s>   Horizontal speed\n  \
           --descent-speed <m/s>    Vertical speed\n  \
           --usbl-samples <n>       USBL fixes to average\n  \
           --usbl-ip <host>         USBL transceiver address\n  \
           --usbl-port <port>       USBL transceiver port\n  \
           --direct-approach        Use the single-step direct strategy\n  \
           --no-usbl                Start without locating the drone\n  \
           --start-offset <x> <y>   Simulated start, meters east/north of the station\n  \
           --realtime               Run the simulation against the wall clock\n  \
           --help                   Show this message",
        program
    )
}

fn parse_value<T: FromStr>(args: &[String], index: usize, flag: &str) -> Result<T, String> {
    let raw = args
        .get(index)
        .ok_or_else(|| format!("{} requires a value", flag))?;
    raw.parse::<T>()
        .map_err(|_| format!("invalid value '{}' for {}", raw, flag))
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" => {
                cli.config_path = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--write-config" => {
                cli.write_config = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--docking-lat" => {
                cli.overrides.docking_latitude = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--docking-lon" => {
                cli.overrides.docking_longitude = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--docking-depth" => {
                cli.overrides.docking_depth = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--timeout" => {
                cli.overrides.timeout_s = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--approach-speed" => {
                cli.overrides.approach_speed_ms = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--descent-speed" => {
                cli.overrides.descent_speed_ms = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--usbl-samples" => {
                cli.overrides.usbl_sample_count = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--usbl-ip" => {
                cli.overrides.usbl_host = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--usbl-port" => {
                cli.overrides.usbl_port = Some(parse_value(args, i + 1, flag)?);
                i += 1;
            }
            "--start-offset" => {
                let x = parse_value(args, i + 1, flag)?;
                let y = parse_value(args, i + 2, flag)?;
                cli.start_offset = Some((x, y));
                i += 2;
            }
            "--direct-approach" => cli.overrides.strategy = Some(StrategyKind::Direct),
            "--no-usbl" => cli.no_usbl = true,
            "--realtime" => cli.realtime = true,
            "--help" | "-h" => cli.help = true,
            other => return Err(format!("unknown option '{}'", other)),
        }
        i += 1;
    }

    // The CLI is all-or-nothing
    cli.overrides.rollback_on_failure = true;
    Ok(cli)
}

fn run_mission<C: Clock>(
    mission: &DockingMission,
    vehicle: SimulatedVehicle,
    clock: C,
    stop: StopHandle,
    drone_position: Option<GeoPoint>,
) -> NavResult<MissionOutcome> {
    let mut executor = mission.executor(vehicle, clock).with_stop_handle(stop);
    mission.run(&mut executor, drone_position)
}

/// Process exit status for a finished mission
fn exit_code(outcome: &MissionOutcome) -> i32 {
    if outcome.reason == EndReason::Aborted {
        EXIT_INTERRUPTED
    } else if outcome.succeeded() && outcome.log_error.is_none() {
        0
    } else {
        1
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("docking-nav", |s| s.as_str());

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{}\n\n{}", message, usage(program));
            return Err("Invalid arguments".into());
        }
    };
    if cli.help {
        println!("{}", usage(program));
        return Ok(());
    }

    let mut manager = match &cli.config_path {
        Some(path) => ConfigurationManager::from_file(path)?,
        None => ConfigurationManager::new(),
    };
    let overrides = manager.apply_overrides(&cli.overrides)?;

    let config = manager.get_system_config().clone();
    let level = config.logging.level_filter().unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    for applied in &overrides.applied {
        info!("Override {}", applied);
    }
    for warning in ConfigurationManager::validate_system_config(&config).warnings {
        warn!("{}", warning);
    }

    if let Some(path) = &cli.write_config {
        manager.save_to_file(path)?;
        info!("Configuration written to {}", path);
        return Ok(());
    }

    let stop = StopHandle::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.request_stop())
        .map_err(|e| format!("Failed to set signal handler: {}", e))?;

    let mission = DockingMission::new(config.clone());
    let converter = CoordinateConverter::new();
    let (start_x, start_y) = cli.start_offset.unwrap_or(DEFAULT_START_OFFSET);
    let start = converter
        .to_absolute(&config.docking, &RelativeFix::new(start_x, start_y))?
        .with_depth(0.0);

    let drone_position = if cli.no_usbl {
        warn!("USBL disabled, skipping drone localization");
        None
    } else {
        let mut usbl = SimulatedUsbl::new(&config.usbl.endpoint(), start_x, start_y);
        match mission.locate_drone(&mut usbl) {
            Ok(position) => Some(position),
            Err(e) => {
                error!("Failed to locate drone: {}", e);
                std::process::exit(1);
            }
        }
    };

    let step_s = config.mission.poll_interval().as_secs_f64();
    let vehicle = SimulatedVehicle::new(start, step_s, config.navigation.descent_speed_ms);

    let result = if cli.realtime {
        run_mission(&mission, vehicle, SystemClock, stop, drone_position)
    } else {
        let clock = ManualClock::new(current_time_ms());
        run_mission(&mission, vehicle, clock, stop, drone_position)
    };

    match result {
        Ok(outcome) => {
            info!(
                "Mission finished {} after {} ticks ({:.1}s simulated), {} steps completed",
                outcome.state,
                outcome.ticks,
                outcome.elapsed_ms as f64 / 1000.0,
                outcome.steps_completed
            );
            if let Some(location) = &outcome.log_location {
                println!("Mission log: {}", location);
            }
            if let Some(e) = &outcome.log_error {
                error!("Mission log was not saved: {}", e);
            }
            if outcome.reason == EndReason::Aborted {
                warn!("Mission aborted by operator");
            }
            println!("Mission {}", outcome.state);
            match exit_code(&outcome) {
                0 => Ok(()),
                code => std::process::exit(code),
            }
        }
        Err(e) => {
            error!("Mission failed to run: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docking_nav::core::NavigationError;
    use docking_nav::mission::{MissionLog, MissionState};

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("docking-nav")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_flags_into_overrides() {
        let cli = parse_args(&args(&[
            "--docking-depth",
            "42.5",
            "--timeout",
            "600",
            "--direct-approach",
            "--start-offset",
            "10",
            "-20",
            "--no-usbl",
            "--usbl-ip",
            "10.0.0.7",
            "--usbl-port",
            "9300",
        ]))
        .unwrap();

        assert_eq!(cli.overrides.docking_depth, Some(42.5));
        assert_eq!(cli.overrides.timeout_s, Some(600));
        assert_eq!(cli.overrides.strategy, Some(StrategyKind::Direct));
        assert_eq!(cli.start_offset, Some((10.0, -20.0)));
        assert!(cli.no_usbl);
        assert_eq!(cli.overrides.usbl_host.as_deref(), Some("10.0.0.7"));
        assert_eq!(cli.overrides.usbl_port, Some(9300));
        assert!(cli.overrides.rollback_on_failure);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&args(&["--timeout"])).is_err());
        assert!(parse_args(&args(&["--usbl-samples", "many"])).is_err());
        assert!(parse_args(&args(&["--fly"])).is_err());
        assert!(parse_args(&args(&["--usbl-port", "70000"])).is_err());
    }

    fn outcome(state: MissionState, reason: EndReason) -> MissionOutcome {
        let mut log = MissionLog::new("Test", 0);
        MissionOutcome {
            state,
            reason,
            ticks: 1,
            steps_completed: 0,
            elapsed_ms: 1000,
            log: log.finalize(1000, state),
            log_location: None,
            log_error: None,
        }
    }

    #[test]
    fn test_exit_code_per_outcome() {
        let arrived = outcome(MissionState::Succeeded, EndReason::Arrived);
        assert_eq!(exit_code(&arrived), 0);

        let unsaved = MissionOutcome {
            log_error: Some(NavigationError::Persist { message: "disk full".to_string() }),
            ..arrived
        };
        assert_eq!(exit_code(&unsaved), 1);

        let timed_out = outcome(MissionState::TimedOut, EndReason::Timeout { elapsed_ms: 1000 });
        assert_eq!(exit_code(&timed_out), 1);

        let aborted = outcome(MissionState::Failed, EndReason::Aborted);
        assert_eq!(exit_code(&aborted), EXIT_INTERRUPTED);
    }
}
