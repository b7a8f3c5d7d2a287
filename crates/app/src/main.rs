//! Headless demo: one car, one scripted lap, telemetry on the log.
//!
//! Usage: `drive-sim [--verbose] [--dump-config] [vehicle.json]`

mod clock;
mod driver;
mod track;

use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use control::{Telemetry, TimedRumble, RumbleMotors, VehicleConfig, VehicleController};
use mechanics::SurfaceCatalog;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simcore::{HapticPulse, HapticSink, SimContext};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use crate::clock::FixedStep;
use crate::driver::ScriptedDriver;
use crate::track::{CarParams, ToyCar, Track};

const TICK_HZ: f64 = 50.0;
const LAP_SECONDS: f64 = 30.0;
const SEED: u64 = 0x5EED;

/// Stands in for a gamepad: logs motor speeds.
#[derive(Default)]
struct LoggedMotors {
    last: (f64, f64),
}

impl RumbleMotors for LoggedMotors {
    fn set_motor_speeds(&mut self, low_frequency: f64, high_frequency: f64) {
        if (low_frequency, high_frequency) != self.last {
            log::trace!("rumble low={low_frequency:.2} high={high_frequency:.2}");
        }
        self.last = (low_frequency, high_frequency);
    }
}

/// Lets the main loop advance the rumble timer the controller's sink feeds.
#[derive(Clone)]
struct SharedRumble(Rc<RefCell<TimedRumble<LoggedMotors>>>);

impl HapticSink for SharedRumble {
    fn pulse(&mut self, pulse: HapticPulse) {
        self.0.borrow_mut().pulse(pulse);
    }
}

/// Headless driving simulation demo
#[derive(Parser, Debug)]
#[command(name = "drive-sim")]
#[command(version)]
#[command(about = "Drive one scripted lap and log vehicle telemetry")]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective vehicle configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Vehicle configuration file (JSON); reference tuning when omitted
    #[arg(value_name = "FILE")]
    config_path: Option<PathBuf>,
}

fn log_telemetry(t: f64, telemetry: &Telemetry) {
    log::info!(
        "t={t:5.1}s {:6.1} km/h  gear {:>1}  {:5.0} rpm  steer {:+.2}  curb {}  rumble {}",
        telemetry.speed_kph,
        telemetry.gear_label,
        telemetry.engine_rpm,
        telemetry.smoothed_steer,
        telemetry.wheels_on_curb,
        if telemetry.haptic_active { "on" } else { "off" },
    );
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config_path {
        Some(path) => VehicleConfig::load(path)?,
        None => VehicleConfig::default(),
    };
    if args.dump_config {
        println!("{}", config.to_json_string()?);
        return Ok(());
    }

    let surfaces = Arc::new(SurfaceCatalog::reference()?);
    let rumble = SharedRumble(Rc::new(RefCell::new(TimedRumble::new(LoggedMotors::default()))));
    let top_gear = u8::try_from(config.drivetrain.gearbox.gears.len())?;
    let mut controller = VehicleController::new(config, surfaces, Box::new(rumble.clone()))?;

    let mut car = ToyCar::new(CarParams::default(), Track::default(), SEED);
    controller.attach(&mut car);
    log::info!("center of mass lowered by {:.2} m", -car.com_offset());

    let mut driver = ScriptedDriver::new(6200.0, top_gear);
    let mut clock = FixedStep::new(1.0 / TICK_HZ);
    let mut frame_rng = StdRng::seed_from_u64(SEED);
    let mut telemetry = Telemetry::default();
    let mut next_report = 0.0;

    // Render frames arrive at a jittery ~60 Hz; the simulation ticks at a fixed 50 Hz.
    while clock.elapsed < LAP_SECONDS {
        let frame_dt = 1.0 / 60.0 + frame_rng.gen_range(-0.004..0.004);
        clock.advance(frame_dt, |dt, t| {
            let input = driver.input(t, &telemetry);
            telemetry = controller.tick(SimContext { dt, t }, input, &mut car);
            car.integrate(dt);
            rumble.0.borrow_mut().advance(dt);

            if t >= next_report {
                log_telemetry(t, &telemetry);
                next_report += 1.0;
            }
        });
    }

    let position = car.position();
    log::info!(
        "lap done: {:.0} m down the track, {:.1} m off center, final gear {}",
        position.z,
        position.x,
        telemetry.gear_label
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(err) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("logger setup failed: {err}");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
