mod cancel;
mod capture;
mod colors;
mod config;
mod display;
mod dsp;
mod error;
mod help;
mod logging;
mod processor;
mod session;
mod settings;
mod terminal;

use capture::Registry;
use clap::{Parser, Subcommand};
use config::Config;
use settings::Settings;
use std::io;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "barscope")]
#[command(version = "0.1.0")]
#[command(about = "Realtime audio spectrum bars in the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Capture backend (see `list-backends`)
    #[arg(short, long)]
    backend: Option<String>,

    /// Capture device (see `list-devices`)
    #[arg(short, long)]
    device: Option<String>,

    /// Sample rate in Hz
    #[arg(short = 'r', long = "rate")]
    rate: Option<f64>,

    /// Samples per slice
    #[arg(short = 'n', long = "samples")]
    samples: Option<usize>,

    /// Frames per second
    #[arg(short = 'f', long = "fps")]
    fps: Option<i32>,

    /// Channels (1 or 2)
    #[arg(long = "ch", visible_alias = "channels")]
    channels: Option<usize>,

    /// Smoothing factor (0-100)
    #[arg(long = "sf", visible_alias = "smoothing")]
    smoothing: Option<i32>,

    /// Smoothing method: simple, average, simple-average, new, new-average, none
    #[arg(long = "sm", visible_alias = "smoothing-method")]
    smoothing_method: Option<String>,

    /// Window function: lanczos, hann, hamming, blackman, bartlett, rectangular, planck[:p], cosine[:p]
    #[arg(long)]
    window: Option<String>,

    /// Base line thickness
    #[arg(long = "bt", visible_alias = "base-thickness")]
    base_thickness: Option<i32>,

    /// Bar width in cells
    #[arg(long = "bw", visible_alias = "bar-width")]
    bar_width: Option<i32>,

    /// Gap between bars in cells
    #[arg(long = "sw", visible_alias = "space-width")]
    space_width: Option<i32>,

    /// Draw type (1=up, 2=up-down, 3=down, 4=left-right)
    #[arg(long = "dt", visible_alias = "draw-type")]
    draw_type: Option<i32>,

    /// Process channels on worker threads
    #[arg(short, long)]
    threaded: bool,

    /// Invert drawing direction
    #[arg(short, long)]
    invert: bool,

    /// Flatten the low end below 250 Hz
    #[arg(long)]
    squash_low: bool,

    /// Sum magnitudes per bar instead of taking the maximum
    #[arg(long)]
    sum_magnitudes: bool,

    /// Bar color attribute (decimal or 0x hex)
    #[arg(long, value_parser = colors::parse_attr)]
    fg: Option<u16>,

    /// Background color attribute
    #[arg(long, value_parser = colors::parse_attr)]
    bg: Option<u16>,

    /// Center line color attribute
    #[arg(long = "ct", value_parser = colors::parse_attr)]
    center: Option<u16>,

    /// Color scheme (0-9)
    #[arg(long)]
    scheme: Option<u8>,

    /// Write a debug log to $TMPDIR/barscope.log
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List capture backends
    #[command(visible_alias = "lb")]
    ListBackends,
    /// List devices of the selected backend
    #[command(visible_alias = "ld")]
    ListDevices,
}

impl Cli {
    fn settings(&self) -> Settings {
        let flag = |set: bool| set.then_some(true);
        Settings {
            backend: self.backend.clone(),
            device: self.device.clone(),
            sample_rate: self.rate,
            sample_size: self.samples,
            frame_rate: self.fps,
            channels: self.channels,
            smoothing: self.smoothing,
            smoothing_method: self.smoothing_method.clone(),
            window: self.window.clone(),
            base_thickness: self.base_thickness,
            bar_width: self.bar_width,
            space_width: self.space_width,
            draw_type: self.draw_type,
            threaded: flag(self.threaded),
            invert: flag(self.invert),
            squash_low: flag(self.squash_low),
            sum_magnitudes: flag(self.sum_magnitudes),
            fg: self.fg,
            bg: self.bg,
            center: self.center,
            scheme: self.scheme,
        }
    }
}

fn run(cli: Cli) -> error::Result<()> {
    if let Some(path) = logging::init(cli.debug)? {
        tracing::info!(path = %path.display(), "logging enabled");
    }

    let settings = Settings::load().merge(cli.settings());
    let config = Config::from_settings(&settings)?;
    let registry = Registry::with_defaults();

    match cli.command {
        Some(Commands::ListBackends) => session::list_backends(&registry, &mut io::stdout()),
        Some(Commands::ListDevices) => {
            session::list_devices(&registry, &config.backend, &mut io::stdout())
        }
        None => session::run(&config, &registry),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
