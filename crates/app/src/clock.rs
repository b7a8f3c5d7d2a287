/// Fixed-timestep accumulator: turns variable frame times into whole ticks.
#[derive(Debug, Clone)]
pub struct FixedStep {
    pub fixed_dt: f64,
    pub accumulator: f64,
    pub elapsed: f64,
}

impl FixedStep {
    pub fn new(fixed_dt: f64) -> Self {
        FixedStep {
            fixed_dt,
            accumulator: 0.0,
            elapsed: 0.0,
        }
    }

    /// Add one frame's worth of time and run `tick` once per whole step that fits.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, frame_dt: f64, mut tick: impl FnMut(f64, f64)) -> usize {
        self.accumulator += frame_dt.max(0.0);
        let mut ticks = 0;

        while self.accumulator >= self.fixed_dt {
            tick(self.fixed_dt, self.elapsed);
            self.accumulator -= self.fixed_dt;
            self.elapsed += self.fixed_dt;
            ticks += 1;
        }

        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_carries_remainder_between_frames() {
        let mut clock = FixedStep::new(0.02);
        assert_eq!(clock.advance(0.015, |_, _| {}), 0);
        assert_eq!(clock.advance(0.015, |_, _| {}), 1);
        assert_relative_eq!(clock.accumulator, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_long_frame_runs_several_ticks() {
        let mut clock = FixedStep::new(0.02);
        let mut times = Vec::new();
        clock.advance(0.065, |dt, t| times.push((dt, t)));

        assert_eq!(times.len(), 3);
        assert_relative_eq!(times[2].1, 0.04, epsilon = 1e-12);
        assert!(times.iter().all(|&(dt, _)| dt == 0.02));
    }
}
