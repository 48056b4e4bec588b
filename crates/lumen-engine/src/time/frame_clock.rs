use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Seconds the clock has been running (sum of clamped deltas).
    pub run_time: f32,

    /// Frame rate independent animation timer in `[0, 1)`.
    ///
    /// Advances by `dt * timer_speed` unless paused, wrapping at 1.
    pub timer: f32,

    /// Whether animation is paused.
    pub paused: bool,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped to avoid pathological values when the application is paused
/// by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,

    run_time: f32,
    timer: f32,
    timer_speed: f32,
    paused: bool,

    fps_window_start: Instant,
    fps_frames: u32,
}

impl FrameClock {
    /// Creates a new clock with default clamps (0.1 ms .. 250 ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
            run_time: 0.0,
            timer: 0.0,
            timer_speed: 0.25,
            paused: false,
            fps_window_start: now,
            fps_frames: 0,
        }
    }

    /// Multiplier applied to `dt` when advancing the animation timer.
    pub fn set_timer_speed(&mut self, speed: f32) {
        self.timer_speed = speed;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let raw = now.saturating_duration_since(self.last);
        self.last = now;
        self.advance(raw.clamp(self.dt_min, self.dt_max), now)
    }

    /// Returns `Some(fps)` exactly once per elapsed second of wall time.
    pub fn poll_fps(&mut self) -> Option<u32> {
        let elapsed = self.last.saturating_duration_since(self.fps_window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = (self.fps_frames as f32 / elapsed.as_secs_f32()).round() as u32;
        self.fps_window_start = self.last;
        self.fps_frames = 0;
        Some(fps)
    }

    fn advance(&mut self, dt: Duration, now: Instant) -> FrameTime {
        let dt = dt.as_secs_f32();

        self.run_time += dt;
        if !self.paused {
            self.timer = (self.timer + dt * self.timer_speed).fract();
        }
        self.fps_frames += 1;

        let ft = FrameTime {
            dt,
            run_time: self.run_time,
            timer: self.timer,
            paused: self.paused,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(clock: &mut FrameClock, secs: f32) -> FrameTime {
        let now = clock.last;
        clock.advance(Duration::from_secs_f32(secs), now)
    }

    #[test]
    fn frame_index_increments() {
        let mut c = FrameClock::new();
        assert_eq!(step(&mut c, 0.016).frame_index, 0);
        assert_eq!(step(&mut c, 0.016).frame_index, 1);
    }

    #[test]
    fn timer_wraps_into_unit_range() {
        let mut c = FrameClock::new();
        c.set_timer_speed(1.0);
        let a = step(&mut c, 0.75);
        assert!((a.timer - 0.75).abs() < 1e-5);
        let b = step(&mut c, 0.5);
        assert!((b.timer - 0.25).abs() < 1e-5);
    }

    #[test]
    fn paused_freezes_timer_but_not_run_time() {
        let mut c = FrameClock::new();
        c.set_timer_speed(1.0);
        step(&mut c, 0.25);
        c.set_paused(true);
        let ft = step(&mut c, 0.25);
        assert!(ft.paused);
        assert!((ft.timer - 0.25).abs() < 1e-5);
        assert!((ft.run_time - 0.5).abs() < 1e-5);
    }

    #[test]
    fn tick_clamps_long_stalls() {
        let mut c = FrameClock::new();
        c.last -= Duration::from_secs(5);
        let ft = c.tick();
        assert!(ft.dt <= 0.25 + 1e-6);
    }

    #[test]
    fn fps_reported_once_per_second() {
        let mut c = FrameClock::new();
        for _ in 0..10 {
            step(&mut c, 0.1);
        }
        assert_eq!(c.poll_fps(), None);
        c.last += Duration::from_secs(1);
        assert_eq!(c.poll_fps(), Some(10));
        assert_eq!(c.poll_fps(), None);
    }
}
