
use std::time::{Duration, Instant};

use crate::vklint;

/// Timeout used by fence waits and swapchain acquisition.
#[derive(Debug, Copy, Clone)]
pub enum VkTimeDuration {
    Immediate,
    Time(Duration),
    Infinite,
}

impl From<VkTimeDuration> for vklint {

    fn from(time: VkTimeDuration) -> vklint {
        match time {
            | VkTimeDuration::Immediate => 0,
            | VkTimeDuration::Time(time) => {
                let nanos = time.as_nanos();
                if nanos >= vklint::MAX as u128 { vklint::MAX } else { nanos as vklint }
            },
            | VkTimeDuration::Infinite => vklint::MAX,
        }
    }
}

/// Measures frame delta time and accumulated running time.
pub struct FrameTimer {

    start: Instant,
    last : Instant,
}

impl FrameTimer {

    pub fn new() -> FrameTimer {
        let now = Instant::now();
        FrameTimer { start: now, last: now }
    }

    /// Return the seconds elapsed since the previous call.
    pub fn tick(&mut self) -> f32 {

        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        delta.as_secs_f32()
    }

    pub fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

impl Default for FrameTimer {

    fn default() -> FrameTimer {
        FrameTimer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_convert_to_nanoseconds() {

        assert_eq!(vklint::from(VkTimeDuration::Immediate), 0);
        assert_eq!(vklint::from(VkTimeDuration::Infinite), vklint::MAX);
        assert_eq!(vklint::from(VkTimeDuration::Time(Duration::from_millis(1500))), 1_500_000_000);
    }

    #[test]
    fn timer_is_monotonic() {

        let mut timer = FrameTimer::new();
        let delta = timer.tick();
        assert!(delta >= 0.0);
        assert!(timer.elapsed() >= delta);
    }
}
