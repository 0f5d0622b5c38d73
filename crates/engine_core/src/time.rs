//! Time management for the game loop.

use std::time::{Duration, Instant};

/// Maximum number of fixed steps allowed to pile up in the accumulator.
const MAX_BACKLOG_STEPS: u32 = 5;

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    /// Time when the engine started.
    start_time: Instant,
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Fixed timestep for physics (default 60 Hz).
    fixed_timestep: Duration,
    /// Accumulated time for fixed updates.
    accumulator: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_frame: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            fixed_timestep: Duration::from_secs_f64(1.0 / 60.0),
            accumulator: Duration::ZERO,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.elapsed = now - self.start_time;
        self.advance(delta);
    }

    /// Advance the clock by an explicit delta (used by `update` and by headless runs).
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.frame_count += 1;
        self.accumulator += delta;

        let max_backlog = self.fixed_timestep * MAX_BACKLOG_STEPS;
        if self.accumulator > max_backlog {
            log::debug!(
                "Dropping {:.1} ms of simulation backlog",
                (self.accumulator - max_backlog).as_secs_f64() * 1000.0
            );
            self.accumulator = max_backlog;
        }
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fixed_timestep_seconds(&self) -> f32 {
        self.fixed_timestep.as_secs_f32()
    }

    /// Check if a fixed update should run and consume the time.
    pub fn should_fixed_update(&mut self) -> bool {
        if self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            true
        } else {
            false
        }
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }

    /// Set the fixed timestep rate in Hz.
    pub fn set_fixed_rate(&mut self, hz: f64) {
        self.fixed_timestep = Duration::from_secs_f64(1.0 / hz);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_steps(time: &mut Time) -> u32 {
        let mut steps = 0;
        while time.should_fixed_update() {
            steps += 1;
        }
        steps
    }

    #[test]
    fn fixed_steps_follow_accumulated_time() {
        let mut time = Time::new();
        time.set_fixed_rate(50.0);
        time.advance(Duration::from_millis(50));
        assert_eq!(count_steps(&mut time), 2);
        // 10 ms left over + 15 ms = one more step
        time.advance(Duration::from_millis(15));
        assert_eq!(count_steps(&mut time), 1);
    }

    #[test]
    fn backlog_is_clamped() {
        let mut time = Time::new();
        time.set_fixed_rate(60.0);
        time.advance(Duration::from_secs(3));
        assert_eq!(count_steps(&mut time), MAX_BACKLOG_STEPS);
        assert_eq!(time.frame_count(), 1);
    }
}
