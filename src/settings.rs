use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional defaults from `config.toml`. Every field mirrors a command-line
/// flag; flags win over the file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub backend: Option<String>,
    pub device: Option<String>,
    pub sample_rate: Option<f64>,
    pub sample_size: Option<usize>,
    pub frame_rate: Option<i32>,
    pub channels: Option<usize>,
    /// 0-100
    pub smoothing: Option<i32>,
    pub smoothing_method: Option<String>,
    pub window: Option<String>,
    pub base_thickness: Option<i32>,
    pub bar_width: Option<i32>,
    pub space_width: Option<i32>,
    pub draw_type: Option<i32>,
    pub threaded: Option<bool>,
    pub invert: Option<bool>,
    pub squash_low: Option<bool>,
    pub sum_magnitudes: Option<bool>,
    pub fg: Option<u16>,
    pub bg: Option<u16>,
    pub center: Option<u16>,
    pub scheme: Option<u8>,
}

impl Settings {
    /// Load the user's settings file. Missing or malformed files yield the
    /// defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match Self::parse(&content) {
            Ok(settings) => {
                tracing::debug!(path = %path.display(), "loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("barscope")
            .join("config.toml")
    }

    /// Fields set in `over` replace ours.
    pub fn merge(self, over: Settings) -> Settings {
        Settings {
            backend: over.backend.or(self.backend),
            device: over.device.or(self.device),
            sample_rate: over.sample_rate.or(self.sample_rate),
            sample_size: over.sample_size.or(self.sample_size),
            frame_rate: over.frame_rate.or(self.frame_rate),
            channels: over.channels.or(self.channels),
            smoothing: over.smoothing.or(self.smoothing),
            smoothing_method: over.smoothing_method.or(self.smoothing_method),
            window: over.window.or(self.window),
            base_thickness: over.base_thickness.or(self.base_thickness),
            bar_width: over.bar_width.or(self.bar_width),
            space_width: over.space_width.or(self.space_width),
            draw_type: over.draw_type.or(self.draw_type),
            threaded: over.threaded.or(self.threaded),
            invert: over.invert.or(self.invert),
            squash_low: over.squash_low.or(self.squash_low),
            sum_magnitudes: over.sum_magnitudes.or(self.sum_magnitudes),
            fg: over.fg.or(self.fg),
            bg: over.bg.or(self.bg),
            center: over.center.or(self.center),
            scheme: over.scheme.or(self.scheme),
        }
    }
}
