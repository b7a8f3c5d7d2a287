//! Timed rumble sink
//!
//! A [`HapticSink`] for devices that only know "set motor speeds". Each pulse
//! sets the speeds and arms a timer; the motors are stopped once the pulse's
//! advisory duration elapses unless a newer pulse arrived first.

use simcore::{HapticPulse, HapticSink};

/// A dual-motor rumble device
pub trait RumbleMotors {
    /// Set low- and high-frequency motor speeds in [0, 1]
    fn set_motor_speeds(&mut self, low_frequency: f64, high_frequency: f64);
}

/// Rumble sink that owns the pulse expiry timer
pub struct TimedRumble<S: RumbleMotors> {
    motors: S,
    remaining_s: Option<f64>,
}

impl<S: RumbleMotors> TimedRumble<S> {
    pub fn new(motors: S) -> Self {
        Self {
            motors,
            remaining_s: None,
        }
    }

    /// Whether the motors are currently driven
    pub fn is_rumbling(&self) -> bool {
        self.remaining_s.is_some()
    }

    pub fn motors(&self) -> &S {
        &self.motors
    }

    /// Advance the expiry timer; stops the motors when it runs out
    pub fn advance(&mut self, dt: f64) {
        let Some(remaining) = self.remaining_s else {
            return;
        };
        let remaining = remaining - dt.max(0.0);
        if remaining <= 0.0 {
            self.motors.set_motor_speeds(0.0, 0.0);
            self.remaining_s = None;
        } else {
            self.remaining_s = Some(remaining);
        }
    }
}

impl<S: RumbleMotors> HapticSink for TimedRumble<S> {
    fn pulse(&mut self, pulse: HapticPulse) {
        self.motors.set_motor_speeds(pulse.low_frequency, pulse.high_frequency);
        self.remaining_s = if pulse.is_stop() || pulse.duration_s <= 0.0 {
            None
        } else {
            Some(pulse.duration_s)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Motors {
        calls: Vec<(f64, f64)>,
    }

    impl RumbleMotors for Motors {
        fn set_motor_speeds(&mut self, low_frequency: f64, high_frequency: f64) {
            self.calls.push((low_frequency, high_frequency));
        }
    }

    #[test]
    fn test_stops_after_duration() {
        let mut rumble = TimedRumble::new(Motors::default());
        rumble.pulse(HapticPulse::new(0.5, 0.25, 0.022));
        rumble.advance(0.02);
        assert!(rumble.is_rumbling());
        rumble.advance(0.02);
        assert!(!rumble.is_rumbling());

        assert_eq!(rumble.motors().calls, vec![(0.5, 0.25), (0.0, 0.0)]);
    }

    #[test]
    fn test_new_pulse_rearms_timer() {
        let mut rumble = TimedRumble::new(Motors::default());
        for _ in 0..10 {
            rumble.pulse(HapticPulse::new(0.3, 0.3, 0.022));
            rumble.advance(0.02);
        }
        assert!(rumble.is_rumbling());
        assert_eq!(rumble.motors().calls.len(), 10);
    }

    #[test]
    fn test_stop_pulse_disarms_timer() {
        let mut rumble = TimedRumble::new(Motors::default());
        rumble.pulse(HapticPulse::new(0.3, 0.3, 1.0));
        rumble.pulse(HapticPulse::stop());
        assert!(!rumble.is_rumbling());
        rumble.advance(2.0);
        assert_eq!(rumble.motors().calls.len(), 2);
    }
}
