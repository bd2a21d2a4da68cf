//! Logarithmic bin layout and per-bar magnitude extraction.

use realfft::num_complex::Complex;
use std::str::FromStr;

/// Lower edge of the displayed band.
pub const DEFAULT_LOW_HZ: f64 = 60.0;
/// Upper edge of the displayed band (capped by Nyquist).
pub const MAX_HIGH_HZ: f64 = 8000.0;
/// Bins ending below this are attenuated when squashing the low end.
const BASS_CUT_HZ: f64 = 250.0;
/// Bins starting below this get a linear low-frequency roll-off.
const LOW_ROLLOFF_HZ: f64 = 400.0;
const LOW_ROLLOFF_GAIN: f64 = 0.55;

/// How the coefficients inside one bin collapse to a single magnitude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BinReduction {
    #[default]
    MaxSampleValue,
    SumMagnitudes,
}

impl FromStr for BinReduction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max" | "max-sample" => Ok(BinReduction::MaxSampleValue),
            "sum" | "sum-magnitudes" | "mean" => Ok(BinReduction::SumMagnitudes),
            _ => Err(format!("unknown bin reduction: {s}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub sample_rate: f64,
    pub sample_size: usize,
    pub squash_low: bool,
    pub reduction: BinReduction,
    pub low_hz: f64,
}

impl AnalyzerConfig {
    pub fn new(sample_rate: f64, sample_size: usize) -> Self {
        Self {
            sample_rate,
            sample_size,
            squash_low: false,
            reduction: BinReduction::default(),
            low_hz: DEFAULT_LOW_HZ,
        }
    }
}

/// One output bar: FFT range `[floor_fft, ceil_fft)` plus gains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinDescriptor {
    pub floor_fft: usize,
    pub ceil_fft: usize,
    pub eq_value: f64,
    pub pow_value: f64,
}

#[derive(Clone, Debug)]
pub struct Analyzer {
    cfg: AnalyzerConfig,
    bins: Vec<BinDescriptor>,
    rolloff_idx: usize,
}

impl Analyzer {
    pub fn new(cfg: AnalyzerConfig) -> Self {
        let rolloff_idx = freq_to_idx(&cfg, LOW_ROLLOFF_HZ);
        Self {
            bins: Vec::with_capacity(cfg.sample_size / 2),
            cfg,
            rolloff_idx,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.cfg
    }

    pub fn bins(&self) -> &[BinDescriptor] {
        &self.bins
    }

    pub fn bar_count(&self) -> usize {
        self.bins.len()
    }

    /// FFT coefficient index holding frequency `hz`.
    pub fn idx(&self, hz: f64) -> usize {
        freq_to_idx(&self.cfg, hz)
    }

    /// Rebuild the bin table for `n` bars. Returns the usable bar count,
    /// which may be lower than requested when the spectrum runs out of
    /// coefficients.
    pub fn recalculate(&mut self, n: usize) -> usize {
        let half = self.cfg.sample_size / 2;
        let limit = half + 1;
        let n = n.clamp(1, half.max(1));

        let lo = self.cfg.low_hz.max(f64::MIN_POSITIVE);
        let hi = (self.cfg.sample_rate / 2.0).min(MAX_HIGH_HZ).max(lo);
        let (log_lo, log_hi) = (lo.log10(), hi.log10());
        let steps = (n + 1) as f64;

        let mut edges: Vec<usize> = (0..=n)
            .map(|k| {
                let f = 10f64.powf(log_lo + (k as f64 / steps) * (log_hi - log_lo));
                self.idx(f)
            })
            .collect();

        for k in 1..edges.len() {
            if edges[k] <= edges[k - 1] {
                edges[k] = edges[k - 1] + 1;
            }
        }

        let eq_scale = 100.0 / steps;
        self.bins.clear();
        for pair in edges.windows(2) {
            let (floor_fft, ceil_fft) = (pair[0], pair[1]);
            if ceil_fft > limit {
                break;
            }
            self.bins.push(BinDescriptor {
                floor_fft,
                ceil_fft,
                eq_value: (floor_fft as f64 + 14.0).log2() * eq_scale,
                pow_value: 1.0,
            });
        }

        if self.cfg.squash_low {
            let bass_cut = self.idx(BASS_CUT_HZ);
            if bass_cut > 0 {
                for bin in self.bins.iter_mut().filter(|b| b.ceil_fft <= bass_cut) {
                    bin.pow_value = (bin.ceil_fft as f64 / bass_cut as f64).max(0.5);
                }
            }
        }

        self.bins.len()
    }

    /// Magnitude of bar `bar` from one channel's FFT output.
    pub fn process_bin(&self, bar: usize, fft: &[Complex<f64>]) -> f64 {
        let Some(bin) = self.bins.get(bar) else {
            return 0.0;
        };

        let limit = (self.cfg.sample_size / 2 + 1).min(fft.len());
        let a = bin.floor_fft.min(limit);
        let b = bin.ceil_fft.min(limit);
        if b <= a {
            return 0.0;
        }

        let coeffs = fft[a..b].iter().map(|c| c.re.hypot(c.im));
        let mut mag = match self.cfg.reduction {
            BinReduction::MaxSampleValue => coeffs.fold(0.0, f64::max),
            BinReduction::SumMagnitudes => coeffs.sum::<f64>() / (b - a) as f64,
        };

        if a < self.rolloff_idx {
            mag *= LOW_ROLLOFF_GAIN * ((a + 1) as f64 / self.rolloff_idx as f64);
        }

        mag *= bin.eq_value * bin.pow_value;

        if mag <= 0.0 || mag.is_nan() {
            return 0.0;
        }
        mag.ln().max(0.0)
    }
}

fn freq_to_idx(cfg: &AnalyzerConfig, hz: f64) -> usize {
    let resolution = cfg.sample_rate / cfg.sample_size as f64;
    let idx = (hz / resolution).floor();
    if idx <= 0.0 {
        return 0;
    }
    (idx as usize).min(cfg.sample_size / 2)
}
