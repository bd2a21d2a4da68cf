//! Auto-gain from two moving windows over per-frame peaks.

use super::moving_window::MovingWindow;

pub const PEAK_THRESHOLD: f64 = 0.01;
const SLOW_SECONDS: f64 = 5.0;
const FAST_SECONDS: f64 = 1.0;
/// Consecutive quiet frames before the slow window is cleared.
const SILENCE_FRAMES: usize = 5;
/// Deviation (in slow stddevs) that counts as a regime change.
const REGIME_K: f64 = 1.0;
const REGIME_DROP_FRACTION: f64 = 0.6;
const SCALE_STDDEVS: f64 = 1.5;

#[derive(Clone, Debug)]
pub struct Scaler {
    slow: MovingWindow,
    fast: MovingWindow,
    silent_frames: usize,
    threshold: f64,
}

impl Scaler {
    /// `frames_per_sec` is the rate at which `update` will be called.
    pub fn new(frames_per_sec: f64) -> Self {
        let frames = |secs: f64| ((secs * frames_per_sec).round() as usize).max(1);
        Self {
            slow: MovingWindow::new(frames(SLOW_SECONDS)),
            fast: MovingWindow::new(frames(FAST_SECONDS)),
            silent_frames: 0,
            threshold: PEAK_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Feed the frame peak and return the scale to divide bar values by.
    pub fn update(&mut self, peak: f64) -> f64 {
        if peak >= self.threshold {
            self.silent_frames = 0;
            self.slow.update(peak);
            self.fast.update(peak);
        } else {
            self.silent_frames = self.silent_frames.saturating_add(1);
            if self.silent_frames >= SILENCE_FRAMES {
                self.slow.drop(self.slow.len());
            }
        }

        let (mut mean, mut stddev) = self.slow.stats();
        if self.slow.len() >= self.fast.cap()
            && (self.fast.mean() - mean).abs() > REGIME_K * stddev
        {
            let n = (self.slow.len() as f64 * REGIME_DROP_FRACTION).ceil() as usize;
            (mean, stddev) = self.slow.drop(n);
        }

        (mean + SCALE_STDDEVS * stddev).max(1.0)
    }

    pub fn slow(&self) -> &MovingWindow {
        &self.slow
    }

    pub fn fast(&self) -> &MovingWindow {
        &self.fast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_scales_to_one() {
        let mut s = Scaler::new(43.0);
        for _ in 0..100 {
            assert_eq!(s.update(0.0), 1.0);
        }
        assert!(s.slow().is_empty());
    }

    #[test]
    fn window_capacities_follow_frame_rate() {
        let s = Scaler::new(40.0);
        assert_eq!(s.slow().cap(), 200);
        assert_eq!(s.fast().cap(), 40);
    }

    #[test]
    fn constant_peak_converges() {
        let mut s = Scaler::new(20.0);
        let mut last = 0.0;
        let mut diffs = Vec::new();
        for _ in 0..(s.fast().cap() * 3) {
            let scale = s.update(7.5);
            diffs.push((scale - last).abs());
            last = scale;
        }
        assert!((last - 7.5).abs() < 1e-9);
        for d in &diffs[s.fast().cap() + 1..] {
            assert!(*d < 1e-6);
        }
    }

    #[test]
    fn quiet_passage_clears_slow_window() {
        let mut s = Scaler::new(10.0);
        for _ in 0..30 {
            s.update(5.0);
        }
        for _ in 0..4 {
            s.update(0.0);
        }
        assert!(!s.slow().is_empty());
        assert_eq!(s.update(0.0), 1.0);
        assert!(s.slow().is_empty());
    }

    #[test]
    fn regime_change_drops_history() {
        let mut s = Scaler::new(10.0);
        for i in 0..50 {
            s.update(2.0 + (i % 2) as f64 * 0.1);
        }
        let before = s.slow().len();
        for _ in 0..10 {
            s.update(20.0);
        }
        assert!(s.slow().len() < before);
        // Louder material raises the scale quickly.
        assert!(s.update(20.0) > 10.0);
    }

    #[test]
    fn never_below_one() {
        let mut s = Scaler::new(10.0);
        for _ in 0..20 {
            assert!(s.update(0.5) >= 1.0);
        }
    }
}
