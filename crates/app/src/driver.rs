//! Scripted test driver for the demo lap.

use control::Telemetry;
use mechanics::Gear;
use simcore::DriverInput;

/// Time-scripted inputs with a simple automatic upshift.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    pub upshift_rpm: f64,
    pub top_gear: u8,
    shift_held: bool,
}

impl ScriptedDriver {
    pub fn new(upshift_rpm: f64, top_gear: u8) -> Self {
        Self {
            upshift_rpm,
            top_gear,
            shift_held: false,
        }
    }

    /// Input for the tick starting at `t`, given the previous tick's telemetry.
    pub fn input(&mut self, t: f64, last: &Telemetry) -> DriverInput {
        let mut input = DriverInput::default();

        match t {
            t if t < 20.0 => input.throttle = 1.0,
            t if t < 24.0 => input.brake = 0.7,
            t if t < 26.0 => input.handbrake = true,
            _ => {}
        }
        input.steer = match t {
            t if (8.0..10.5).contains(&t) => 0.6,
            t if (10.5..13.0).contains(&t) => -0.6,
            _ => 0.0,
        };

        // release for one tick between presses so every press is a fresh edge
        let wants_shift = match last.gear {
            Gear::Neutral => input.throttle > 0.0,
            Gear::Forward(n) => n < self.top_gear && last.engine_rpm > self.upshift_rpm,
            Gear::Reverse => false,
        };
        input.shift_up = wants_shift && !self.shift_held;
        self.shift_held = input.shift_up;

        input
    }
}
