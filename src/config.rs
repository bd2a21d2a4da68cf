//! Validated run configuration.

use crate::capture::{Device, SessionConfig};
use crate::colors::check_attr;
use crate::display::{DisplayConfig, DrawType};
use crate::dsp::{AnalyzerConfig, BinReduction, SmootherConfig, SmoothingMethod, WindowFn};
use crate::error::{Error, Result};
use crate::processor::ProcessorConfig;
use crate::settings::Settings;

pub const DEFAULT_BACKEND: &str = "cpal";
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
pub const DEFAULT_SAMPLE_SIZE: usize = 1024;
pub const DEFAULT_FRAME_RATE: i32 = 60;
pub const DEFAULT_SMOOTHING: i32 = 65;

const MIN_SAMPLE_SIZE: usize = 4;
const MIN_FACTOR: f64 = 0.00001;
const MAX_FACTOR: f64 = 0.9999;

#[derive(Clone, Debug)]
pub struct Config {
    pub backend: String,
    pub device: Option<String>,
    pub sample_rate: f64,
    pub sample_size: usize,
    pub frame_rate: i32,
    pub channels: usize,
    pub smoothing_factor: f64,
    /// `None` when smoothing is switched off.
    pub smoothing_method: Option<SmoothingMethod>,
    pub window: WindowFn,
    pub threaded: bool,
    pub squash_low: bool,
    pub reduction: BinReduction,
    pub display: DisplayConfig,
}

fn parse_method(s: &str) -> Result<Option<SmoothingMethod>> {
    match s.to_lowercase().as_str() {
        "none" | "off" => Ok(None),
        other => other.parse().map(Some).map_err(Error::Config),
    }
}

impl Config {
    pub fn from_settings(s: &Settings) -> Result<Self> {
        let sample_rate = s.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        let sample_size = s.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE);
        let channels = s.channels.unwrap_or(1);

        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::Config(format!("sample rate must be positive, got {sample_rate}")));
        }
        if sample_size < MIN_SAMPLE_SIZE {
            return Err(Error::Config(format!(
                "sample size must be at least {MIN_SAMPLE_SIZE}, got {sample_size}"
            )));
        }
        if sample_rate < sample_size as f64 {
            return Err(Error::Config(format!(
                "sample rate {sample_rate} is lower than sample size {sample_size}"
            )));
        }
        if !(1..=2).contains(&channels) {
            return Err(Error::Config(format!("channels must be 1 or 2, got {channels}")));
        }

        let smoothing = s.smoothing.unwrap_or(DEFAULT_SMOOTHING);
        let smoothing_factor = (smoothing as f64 / 100.0).clamp(MIN_FACTOR, MAX_FACTOR);
        let smoothing_method = match &s.smoothing_method {
            Some(m) => parse_method(m)?,
            None => Some(SmoothingMethod::default()),
        };
        let window = match &s.window {
            Some(w) => w.parse().map_err(Error::Config)?,
            None => WindowFn::default(),
        };

        let draw_type = DrawType::try_from(s.draw_type.unwrap_or(1)).map_err(Error::Config)?;
        let bar_width = s.bar_width.unwrap_or(2);
        if bar_width < 1 {
            return Err(Error::Config(format!("bar width must be at least 1, got {bar_width}")));
        }
        let space_width = s.space_width.unwrap_or(1);
        if space_width < 0 {
            return Err(Error::Config(format!("space width must not be negative, got {space_width}")));
        }
        let base_size = s.base_thickness.unwrap_or(1);
        if base_size < 0 {
            return Err(Error::Config(format!("base thickness must not be negative, got {base_size}")));
        }
        if let Some(scheme) = s.scheme {
            if scheme > 9 {
                return Err(Error::Config(format!("color scheme must be 0-9, got {scheme}")));
            }
        }
        for (name, attr) in [("fg", s.fg), ("bg", s.bg), ("ct", s.center)] {
            if let Some(attr) = attr {
                check_attr(attr).map_err(|e| Error::Config(format!("--{name}: {e}")))?;
            }
        }

        Ok(Self {
            backend: s.backend.clone().unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            device: s.device.clone(),
            sample_rate,
            sample_size,
            frame_rate: s.frame_rate.unwrap_or(DEFAULT_FRAME_RATE),
            channels,
            smoothing_factor,
            smoothing_method,
            window,
            threaded: s.threaded.unwrap_or(false),
            squash_low: s.squash_low.unwrap_or(false),
            reduction: if s.sum_magnitudes.unwrap_or(false) {
                BinReduction::SumMagnitudes
            } else {
                BinReduction::MaxSampleValue
            },
            display: DisplayConfig {
                bar_width,
                space_width,
                base_size,
                draw_type,
                invert: s.invert.unwrap_or(false),
                fg: s.fg.unwrap_or(0),
                bg: s.bg.unwrap_or(0),
                center: s.center.unwrap_or(0),
                scheme: s.scheme,
            },
        })
    }

    /// Slices delivered per second.
    pub fn slice_rate(&self) -> f64 {
        self.sample_rate / self.sample_size as f64
    }

    pub fn processor(&self) -> ProcessorConfig {
        let mut analyzer = AnalyzerConfig::new(self.sample_rate, self.sample_size);
        analyzer.squash_low = self.squash_low;
        analyzer.reduction = self.reduction;

        // Frames come from kicks or the timer, whichever is faster.
        let frames_per_sec = if self.frame_rate > 0 {
            (self.frame_rate as f64).max(self.slice_rate())
        } else {
            self.slice_rate()
        };

        ProcessorConfig {
            analyzer,
            window: self.window,
            smoothing: self.smoothing_method.map(|method| SmootherConfig {
                channels: self.channels,
                sample_size: self.sample_size,
                sample_rate: self.sample_rate,
                factor: self.smoothing_factor,
                average_size: None,
                method,
            }),
            frames_per_sec,
        }
    }

    pub fn session(&self, device: Device) -> SessionConfig {
        SessionConfig {
            device,
            channels: self.channels,
            sample_size: self.sample_size,
            sample_rate: self.sample_rate,
        }
    }
}
