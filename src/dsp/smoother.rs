//! Temporal smoothing of bar values, one filter per (channel, bar).

use super::moving_window::MovingWindow;
use std::str::FromStr;

/// Frames of history the averaging window holds at 60 fps.
const AVERAGE_FRAMES_AT_60: f64 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SmoothingMethod {
    #[default]
    Simple,
    Average,
    SimpleAverage,
    New,
    NewAverage,
}

impl SmoothingMethod {
    fn averages(self) -> bool {
        matches!(
            self,
            SmoothingMethod::Average | SmoothingMethod::SimpleAverage | SmoothingMethod::NewAverage
        )
    }
}

impl FromStr for SmoothingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "simple" => Ok(SmoothingMethod::Simple),
            "average" | "avg" => Ok(SmoothingMethod::Average),
            "simple-average" | "simpleaverage" => Ok(SmoothingMethod::SimpleAverage),
            "new" => Ok(SmoothingMethod::New),
            "new-average" | "newaverage" => Ok(SmoothingMethod::NewAverage),
            _ => Err(format!("unknown smoothing method: {s}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SmootherConfig {
    pub channels: usize,
    pub sample_size: usize,
    pub sample_rate: f64,
    /// Weight of the previous value, in `(0, 1)`.
    pub factor: f64,
    /// Averaging window length; derived from the slice rate when `None`.
    pub average_size: Option<usize>,
    pub method: SmoothingMethod,
}

impl SmootherConfig {
    pub fn window_size(&self) -> usize {
        self.average_size.unwrap_or_else(|| {
            let slices_per_sec = self.sample_rate / self.sample_size as f64;
            (AVERAGE_FRAMES_AT_60 * slices_per_sec / 60.0).ceil() as usize
        })
        .max(1)
    }
}

/// Smoothing state for the bars of a single channel.
#[derive(Clone, Debug)]
pub struct ChannelSmoother {
    method: SmoothingMethod,
    factor: f64,
    values: Vec<f64>,
    windows: Vec<MovingWindow>,
}

impl ChannelSmoother {
    pub fn new(cfg: &SmootherConfig) -> Self {
        let bars = (cfg.sample_size / 2).max(1);
        let windows = if cfg.method.averages() {
            vec![MovingWindow::new(cfg.window_size()); bars]
        } else {
            Vec::new()
        };
        Self {
            method: cfg.method,
            factor: cfg.factor,
            values: vec![0.0; bars],
            windows,
        }
    }

    /// Smooth `x` for bar `idx`. `peak` is the global peak of the last frame.
    pub fn smooth(&mut self, idx: usize, x: f64, peak: f64) -> f64 {
        if idx >= self.values.len() {
            return x;
        }
        let x = if x.is_nan() { 0.0 } else { x };

        let x = if self.method.averages() {
            self.windows[idx].update(x).0
        } else {
            x
        };

        let prev = self.values[idx];
        let y = match self.method {
            SmoothingMethod::Average => x,
            SmoothingMethod::Simple | SmoothingMethod::SimpleAverage => {
                simple(self.factor, x, prev)
            }
            SmoothingMethod::New | SmoothingMethod::NewAverage => {
                adaptive(self.factor, x, prev, peak)
            }
        };

        self.values[idx] = y;
        y
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
        for w in &mut self.windows {
            w.drop(w.len());
        }
    }
}

fn simple(f: f64, x: f64, prev: f64) -> f64 {
    (1.0 - f) * x + f * prev
}

/// Factor that leans on history for small, quiet changes and follows the
/// input for large or loud ones.
fn adaptive(f: f64, x: f64, prev: f64, peak: f64) -> f64 {
    let diff = (x - prev).abs();
    let m = x.max(prev);
    let diff_pct = if m > 0.0 { diff / m } else { 0.0 };
    let peak_pct = x / peak.max(1.0);

    let partial = (1.0 - f) * 0.45;
    let nf = f + partial - (partial + 0.1) * diff_pct.powf(1.5) + partial / 0.75
        - (partial / 0.5) * peak_pct.powi(4);
    let nf = nf.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);

    (1.0 - nf) * x + nf * prev
}

/// Per-channel smoothers addressed by `(channel, bar)`.
#[derive(Clone, Debug)]
pub struct Smoother {
    channels: Vec<ChannelSmoother>,
    peak: f64,
}

impl Smoother {
    pub fn new(cfg: &SmootherConfig) -> Self {
        Self {
            channels: (0..cfg.channels.max(1))
                .map(|_| ChannelSmoother::new(cfg))
                .collect(),
            peak: 0.0,
        }
    }

    pub fn smooth_bin(&mut self, ch: usize, idx: usize, x: f64) -> f64 {
        let peak = self.peak;
        match self.channels.get_mut(ch) {
            Some(c) => c.smooth(idx, x, peak),
            None => x,
        }
    }

    /// Forget all history, e.g. after the bar layout changed.
    pub fn reset(&mut self) {
        for c in &mut self.channels {
            c.reset();
        }
        self.peak = 0.0;
    }

    /// Record the frame peak consumed by the adaptive methods next frame.
    pub fn set_peak(&mut self, peak: f64) {
        self.peak = peak;
    }

    /// Split into per-channel state for worker threads.
    pub fn into_channels(self) -> Vec<ChannelSmoother> {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(method: SmoothingMethod, factor: f64) -> SmootherConfig {
        SmootherConfig {
            channels: 2,
            sample_size: 1024,
            sample_rate: 44100.0,
            factor,
            average_size: None,
            method,
        }
    }

    #[test]
    fn simple_step_response() {
        let mut s = Smoother::new(&cfg(SmoothingMethod::Simple, 0.9));
        let inputs = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let out: Vec<f64> = inputs.iter().map(|&x| s.smooth_bin(0, 3, x)).collect();
        let expected = [0.0, 0.0, 0.0, 0.1, 0.19, 0.271, 0.3439];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn simple_converges_monotonically() {
        let f = 0.7;
        let mut s = Smoother::new(&cfg(SmoothingMethod::Simple, f));
        let c = 5.0;
        let mut prev_err = c;
        for t in 1..200 {
            let y = s.smooth_bin(1, 0, c);
            let err = (y - c).abs();
            assert!(err <= prev_err);
            assert!(err <= f.powi(t) * c + 1e-12);
            prev_err = err;
        }
        assert!(prev_err < 1e-9);
    }

    #[test]
    fn channels_are_independent() {
        let mut s = Smoother::new(&cfg(SmoothingMethod::Simple, 0.5));
        s.smooth_bin(0, 0, 10.0);
        assert_eq!(s.smooth_bin(1, 0, 0.0), 0.0);
    }

    #[test]
    fn nan_counts_as_zero() {
        let mut s = Smoother::new(&cfg(SmoothingMethod::Simple, 0.5));
        s.smooth_bin(0, 0, 4.0);
        assert_eq!(s.smooth_bin(0, 0, f64::NAN), 1.0);
    }

    #[test]
    fn reset_forgets_history() {
        let mut s = Smoother::new(&cfg(SmoothingMethod::SimpleAverage, 0.5));
        for _ in 0..8 {
            s.smooth_bin(1, 3, 10.0);
        }
        s.set_peak(10.0);
        s.reset();
        // Empty window and zero history: half of the first input.
        assert_eq!(s.smooth_bin(1, 3, 2.0), 1.0);
    }

    #[test]
    fn average_returns_window_mean() {
        let mut c = cfg(SmoothingMethod::Average, 0.5);
        c.average_size = Some(3);
        let mut s = Smoother::new(&c);
        s.smooth_bin(0, 2, 3.0);
        s.smooth_bin(0, 2, 6.0);
        assert!((s.smooth_bin(0, 2, 9.0) - 6.0).abs() < 1e-12);
        assert!((s.smooth_bin(0, 2, 12.0) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn simple_average_chains_both() {
        let mut c = cfg(SmoothingMethod::SimpleAverage, 0.5);
        c.average_size = Some(2);
        let mut s = Smoother::new(&c);
        assert!((s.smooth_bin(0, 0, 4.0) - 2.0).abs() < 1e-12);
        // mean(4, 8) = 6, then 0.5 * 6 + 0.5 * 2
        assert!((s.smooth_bin(0, 0, 8.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn default_window_tracks_slice_rate() {
        let c = cfg(SmoothingMethod::Average, 0.5);
        // 44100 / 1024 = 43.07 slices/s -> ceil(5 * 43.07 / 60) = 4
        assert_eq!(c.window_size(), 4);
    }

    #[test]
    fn adaptive_stays_between_previous_and_input() {
        let mut s = Smoother::new(&cfg(SmoothingMethod::New, 0.8));
        s.set_peak(10.0);
        let mut prev = 0.0;
        for x in [3.0, 8.0, 1.0, 0.0, 6.5, 6.6] {
            let y = s.smooth_bin(0, 5, x);
            let (lo, hi) = if x < prev { (x, prev) } else { (prev, x) };
            assert!(y >= lo - 1e-12 && y <= hi + 1e-12);
            prev = y;
        }
    }

    #[test]
    fn adaptive_formula_matches_reference_point() {
        let f: f64 = 0.5;
        let (x, prev, peak) = (2.0, 1.0, 4.0);
        let partial = (1.0 - f) * 0.45;
        let diff_pct: f64 = 0.5;
        let peak_pct: f64 = 0.5;
        let nf = f + partial - (partial + 0.1) * diff_pct.powf(1.5) + partial / 0.75
            - (partial / 0.5) * peak_pct.powi(4);
        let want = (1.0 - nf) * x + nf * prev;
        assert!((adaptive(f, x, prev, peak) - want).abs() < 1e-12);
    }

    #[test]
    fn silence_stays_silent() {
        for method in [SmoothingMethod::New, SmoothingMethod::NewAverage] {
            let mut s = Smoother::new(&cfg(method, 0.6));
            for _ in 0..10 {
                assert_eq!(s.smooth_bin(0, 0, 0.0), 0.0);
            }
        }
    }

    #[test]
    fn methods_parse() {
        assert_eq!("simple".parse(), Ok(SmoothingMethod::Simple));
        assert_eq!("new_average".parse(), Ok(SmoothingMethod::NewAverage));
        assert_eq!("simpleaverage".parse(), Ok(SmoothingMethod::SimpleAverage));
        assert!("n2s3".parse::<SmoothingMethod>().is_err());
    }
}
