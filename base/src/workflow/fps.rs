
pub const FPS_SAMPLE_COUNT: usize = 30;

/// Rolling average of the most recent frame times.
pub struct FpsCounter {

    samples: [f32; FPS_SAMPLE_COUNT],
    current: usize,
    filled : usize,
}

impl FpsCounter {

    pub fn new() -> FpsCounter {

        FpsCounter {
            samples: [0.0; FPS_SAMPLE_COUNT],
            current: 0,
            filled : 0,
        }
    }

    /// Record the duration of one frame in seconds.
    pub fn tick_frame(&mut self, delta_time: f32) {

        self.samples[self.current] = delta_time;
        self.current = (self.current + 1) % FPS_SAMPLE_COUNT;
        self.filled = (self.filled + 1).min(FPS_SAMPLE_COUNT);
    }

    /// Average frame time in seconds.
    pub fn frame_time(&self) -> f32 {

        if self.filled == 0 {
            return 0.0
        }
        self.samples[..self.filled].iter().sum::<f32>() / self.filled as f32
    }

    pub fn fps(&self) -> f32 {

        let frame_time = self.frame_time();
        if frame_time > 0.0 { 1.0 / frame_time } else { 0.0 }
    }
}

/// Collects frame times in benchmark mode, the first `warmup` frames are skipped.
pub struct BenchmarkRecorder {

    warmup: u32,
    frames: u32,

    skipped: u32,
    samples: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkReport {

    pub frames: usize,
    pub average_ms: f32,
    pub min_ms: f32,
    pub max_ms: f32,
    pub fps: f32,
}

impl BenchmarkRecorder {

    pub fn new(warmup: u32, frames: u32) -> BenchmarkRecorder {

        BenchmarkRecorder {
            warmup,
            frames: frames.max(1),
            skipped: 0,
            samples: Vec::with_capacity(frames as usize),
        }
    }

    /// Record one frame and return true once enough frames have been measured.
    pub fn record(&mut self, delta_time: f32) -> bool {

        if self.skipped < self.warmup {
            self.skipped += 1;
        } else if !self.is_finished() {
            self.samples.push(delta_time);
        }

        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.samples.len() >= self.frames as usize
    }

    pub fn report(&self) -> Option<BenchmarkReport> {

        if self.samples.is_empty() {
            return None
        }

        let total: f32 = self.samples.iter().sum();
        let min = self.samples.iter().cloned().fold(f32::MAX, f32::min);
        let max = self.samples.iter().cloned().fold(0.0, f32::max);
        let average = total / self.samples.len() as f32;

        let report = BenchmarkReport {
            frames: self.samples.len(),
            average_ms: average * 1000.0,
            min_ms: min * 1000.0,
            max_ms: max * 1000.0,
            fps: if average > 0.0 { 1.0 / average } else { 0.0 },
        };
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fps_averages_recent_samples() {

        let mut counter = FpsCounter::new();
        assert_eq!(counter.fps(), 0.0);

        counter.tick_frame(0.02);
        counter.tick_frame(0.03);
        assert_relative_eq!(counter.frame_time(), 0.025);
        assert_relative_eq!(counter.fps(), 40.0, epsilon = 1e-3);

        for _ in 0..FPS_SAMPLE_COUNT {
            counter.tick_frame(0.01);
        }
        assert_relative_eq!(counter.fps(), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn benchmark_skips_warmup_frames() {

        let mut recorder = BenchmarkRecorder::new(2, 3);
        assert!(!recorder.record(1.0));
        assert!(!recorder.record(1.0));
        assert!(recorder.report().is_none());

        assert!(!recorder.record(0.010));
        assert!(!recorder.record(0.020));
        assert!(recorder.record(0.030));
        // extra frames are not measured.
        assert!(recorder.record(5.0));

        let report = recorder.report().unwrap();
        assert_eq!(report.frames, 3);
        assert_relative_eq!(report.average_ms, 20.0, epsilon = 1e-3);
        assert_relative_eq!(report.min_ms, 10.0, epsilon = 1e-3);
        assert_relative_eq!(report.max_ms, 30.0, epsilon = 1e-3);
        assert_relative_eq!(report.fps, 50.0, epsilon = 1e-2);
    }
}
