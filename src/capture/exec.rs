//! Child-process capture backends
//!
//! parec, pw-record and ffmpeg are started with raw float output on stdout.
//! A watcher thread kills the child when the session is cancelled, which
//! unblocks the pending read, and always reaps it.

use super::{
    is_valid_device_name, Backend, Device, Kick, SampleFormat, Session, SessionConfig,
    SharedBuffers, SliceReader,
};
use crate::cancel::Cancel;
use crate::error::{Error, Result};
use crossbeam::channel::bounded;
use crossbeam::select;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

pub const PAREC: &str = "parec";
pub const PIPEWIRE: &str = "pipewire";
pub const FFMPEG_ALSA: &str = "ffmpeg-alsa";
pub const FFMPEG_PULSE: &str = "ffmpeg-pulse";

const DEFAULT_MONITOR: &str = "@DEFAULT_MONITOR@";
/// pw-record picks the default node for this target.
const AUTO_TARGET: &str = "auto";
/// Record from the target sink's monitor ports instead of a source.
const CAPTURE_SINK: &str = "{ stream.capture.sink = true }";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flavor {
    Parec,
    PipeWire,
    FfmpegAlsa,
    FfmpegPulse,
}

impl Flavor {
    fn name(self) -> &'static str {
        match self {
            Flavor::Parec => PAREC,
            Flavor::PipeWire => PIPEWIRE,
            Flavor::FfmpegAlsa => FFMPEG_ALSA,
            Flavor::FfmpegPulse => FFMPEG_PULSE,
        }
    }

    fn program(self) -> &'static str {
        match self {
            Flavor::Parec => "parec",
            Flavor::PipeWire => "pw-record",
            Flavor::FfmpegAlsa | Flavor::FfmpegPulse => "ffmpeg",
        }
    }

    fn format(self) -> SampleFormat {
        match self {
            Flavor::Parec | Flavor::PipeWire => SampleFormat::F32Le,
            Flavor::FfmpegAlsa | Flavor::FfmpegPulse => SampleFormat::F64Le,
        }
    }

    fn args(self, cfg: &SessionConfig) -> Vec<String> {
        let rate = (cfg.sample_rate.round() as u64).to_string();
        let channels = cfg.channels.to_string();
        let dev = cfg.device.name.clone();
        match self {
            Flavor::Parec => vec![
                "--raw".into(),
                "--format=float32le".into(),
                format!("--rate={rate}"),
                format!("--channels={channels}"),
                format!("--device={dev}"),
            ],
            Flavor::PipeWire => vec![
                "--format".into(),
                "f32".into(),
                "--rate".into(),
                rate,
                "--channels".into(),
                channels,
                "--target".into(),
                dev,
                "-P".into(),
                CAPTURE_SINK.into(),
                "-".into(),
            ],
            Flavor::FfmpegAlsa | Flavor::FfmpegPulse => {
                let input = if self == Flavor::FfmpegAlsa { "alsa" } else { "pulse" };
                vec![
                    "-hide_banner".into(),
                    "-loglevel".into(),
                    "error".into(),
                    "-f".into(),
                    input.into(),
                    "-i".into(),
                    dev,
                    "-ac".into(),
                    channels,
                    "-ar".into(),
                    rate,
                    "-f".into(),
                    "f64le".into(),
                    "-".into(),
                ]
            }
        }
    }
}

pub struct ExecBackend {
    flavor: Flavor,
}

pub fn parec() -> Box<dyn Backend> {
    Box::new(ExecBackend { flavor: Flavor::Parec })
}

pub fn pipewire() -> Box<dyn Backend> {
    Box::new(ExecBackend { flavor: Flavor::PipeWire })
}

pub fn ffmpeg_alsa() -> Box<dyn Backend> {
    Box::new(ExecBackend { flavor: Flavor::FfmpegAlsa })
}

pub fn ffmpeg_pulse() -> Box<dyn Backend> {
    Box::new(ExecBackend { flavor: Flavor::FfmpegPulse })
}

impl Backend for ExecBackend {
    fn name(&self) -> &'static str {
        self.flavor.name()
    }

    fn devices(&self) -> Result<Vec<Device>> {
        match self.flavor {
            Flavor::FfmpegAlsa => {
                let out = run_listing("arecord", &["-L"])
                    .ok_or_else(|| Error::backend(self.name(), "arecord -L failed"))?;
                Ok(parse_arecord_devices(&out))
            }
            Flavor::PipeWire => {
                let out = run_listing("pactl", &["list", "sinks", "short"])
                    .ok_or_else(|| Error::backend(self.name(), "pactl list sinks failed"))?;
                let mut devices = parse_pactl_short(&out);
                devices.insert(0, Device::new(AUTO_TARGET).with_description("default sink"));
                Ok(devices)
            }
            Flavor::Parec | Flavor::FfmpegPulse => {
                let out = run_listing("pactl", &["list", "sources", "short"])
                    .ok_or_else(|| Error::backend(self.name(), "pactl list sources failed"))?;
                Ok(parse_pactl_short(&out))
            }
        }
    }

    fn default_device(&self) -> Result<Option<Device>> {
        Ok(Some(match self.flavor {
            Flavor::Parec => Device::new(default_monitor_source().unwrap_or_else(|| DEFAULT_MONITOR.into())),
            Flavor::PipeWire => Device::new(pipewire_target(default_sink())),
            Flavor::FfmpegAlsa | Flavor::FfmpegPulse => Device::new("default"),
        }))
    }

    /// Device names are not checked against the listing: pulse and ALSA
    /// both accept aliases that are never enumerated.
    fn device(&self, name: Option<&str>) -> Result<Device> {
        match name {
            Some(name) => Ok(Device::new(name)),
            None => self
                .default_device()?
                .ok_or_else(|| Error::UnknownDevice("no default device".into())),
        }
    }

    fn start(&self, cfg: SessionConfig) -> Result<Box<dyn Session>> {
        if !is_valid_device_name(&cfg.device.name) {
            return Err(Error::UnknownDevice(cfg.device.name));
        }
        Ok(Box::new(ExecSession {
            flavor: self.flavor,
            args: self.flavor.args(&cfg),
            cfg,
        }))
    }
}

struct ExecSession {
    flavor: Flavor,
    args: Vec<String>,
    cfg: SessionConfig,
}

impl Session for ExecSession {
    fn start(&mut self, cancel: &Cancel, dst: SharedBuffers, kick: Kick) -> Result<()> {
        let name = self.flavor.name();
        let program = self.flavor.program();
        tracing::debug!(backend = name, args = ?self.args, "spawning {program}");

        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::backend(name, format!("failed to start {program}: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::backend(name, "child has no stdout"))?;

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let done = cancel.done().clone();
        let watcher = thread::spawn(move || -> std::io::Result<ExitStatus> {
            select! {
                recv(done) -> _ => {}
                recv(stop_rx) -> _ => {}
            }
            let _ = child.kill();
            child.wait()
        });

        let mut reader = SliceReader::new(stdout, self.flavor.format(), self.cfg.slice_len());
        let mut samples = vec![0.0; self.cfg.slice_len()];
        let mut slices = 0usize;
        let pumped = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }
            match reader.read_slice(&mut samples) {
                Ok(true) => {
                    dst.write_interleaved(&samples);
                    kick.kick();
                    slices += 1;
                }
                Ok(false) => break Ok(()),
                Err(_) if cancel.is_cancelled() => break Ok(()),
                Err(e) => break Err(Error::from(e)),
            }
        };

        drop(stop_tx);
        let status = watcher
            .join()
            .map_err(|_| Error::backend(name, "process watcher panicked"))??;
        pumped?;

        tracing::debug!(backend = name, slices, %status, "capture process finished");
        if slices == 0 && !status.success() && !cancel.is_cancelled() {
            return Err(Error::backend(name, format!("{program} exited with {status}")));
        }
        Ok(())
    }
}

fn run_listing(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .stderr(Stdio::null())
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).into_owned())
}

/// `pactl list sources|sinks short`: index, name, driver, sample format,
/// state; tab separated.
fn parse_pactl_short(out: &str) -> Vec<Device> {
    out.lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let _index = parts.next()?;
            let name = parts.next()?.trim();
            if !is_valid_device_name(name) {
                return None;
            }
            let device = Device::new(name);
            Some(match parts.nth(1) {
                Some(format) if !format.is_empty() => device.with_description(format.trim()),
                _ => device,
            })
        })
        .collect()
}

/// `arecord -L`: names start at column 0, descriptions are indented below.
fn parse_arecord_devices(out: &str) -> Vec<Device> {
    let mut devices: Vec<Device> = Vec::new();
    for line in out.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            if let Some(last) = devices.last_mut() {
                if last.description.is_none() {
                    last.description = Some(line.trim().to_string());
                }
            }
        } else if is_valid_device_name(line.trim()) {
            devices.push(Device::new(line.trim()));
        }
    }
    devices
}

fn default_sink() -> Option<String> {
    run_listing("pactl", &["get-default-sink"])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && is_valid_device_name(s))
}

/// Sink node to record from; pw-record resolves `auto` itself.
fn pipewire_target(sink: Option<String>) -> String {
    sink.unwrap_or_else(|| AUTO_TARGET.to_string())
}

/// The monitor of the default sink, falling back to any monitor source.
fn default_monitor_source() -> Option<String> {
    let sink = default_sink();
    let sources = parse_pactl_short(&run_listing("pactl", &["list", "sources", "short"])?);
    pick_monitor(sink.as_deref(), &sources)
}

fn pick_monitor(sink: Option<&str>, sources: &[Device]) -> Option<String> {
    if let Some(sink) = sink {
        let expected = format!("{sink}.monitor");
        if let Some(d) = sources.iter().find(|d| d.name == expected) {
            return Some(d.name.clone());
        }
    }
    sources
        .iter()
        .find(|d| d.name.ends_with(".monitor"))
        .map(|d| d.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACTL: &str = "\
0\talsa_output.pci-0000_00_1f.3.analog-stereo.monitor\tmodule-alsa-card.c\ts16le 2ch 44100Hz\tSUSPENDED
1\talsa_input.pci-0000_00_1f.3.analog-stereo\tmodule-alsa-card.c\ts16le 2ch 44100Hz\tRUNNING
2\tbad name; echo\tmodule-null.c\tfloat32le 2ch 48000Hz\tIDLE
";

    const ARECORD: &str = "\
null
    Discard all samples (playback) or generate zero samples (capture)
default
    Default ALSA Output (currently PipeWire Media Server)
hw:CARD=PCH,DEV=0
    HDA Intel PCH, ALC3246 Analog
    Direct hardware device without any conversions
";

    fn cfg(device: &str) -> SessionConfig {
        SessionConfig {
            device: Device::new(device),
            channels: 2,
            sample_size: 1024,
            sample_rate: 44100.0,
        }
    }

    #[test]
    fn parses_pactl_sources() {
        let devices = parse_pactl_short(PACTL);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "alsa_output.pci-0000_00_1f.3.analog-stereo.monitor");
        assert_eq!(devices[0].description.as_deref(), Some("s16le 2ch 44100Hz"));
    }

    #[test]
    fn parses_arecord_listing() {
        let devices = parse_arecord_devices(ARECORD);
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["null", "default", "hw:CARD=PCH,DEV=0"]);
        assert_eq!(
            devices[1].description.as_deref(),
            Some("Default ALSA Output (currently PipeWire Media Server)")
        );
    }

    #[test]
    fn prefers_default_sink_monitor() {
        let sources = vec![
            Device::new("a.monitor"),
            Device::new("b.monitor"),
            Device::new("mic"),
        ];
        assert_eq!(pick_monitor(Some("b"), &sources).as_deref(), Some("b.monitor"));
        assert_eq!(pick_monitor(Some("zzz"), &sources).as_deref(), Some("a.monitor"));
        assert_eq!(pick_monitor(None, &[Device::new("mic")]), None);
    }

    #[test]
    fn command_lines() {
        let parec = Flavor::Parec.args(&cfg("x.monitor"));
        assert!(parec.contains(&"--format=float32le".to_string()));
        assert!(parec.contains(&"--device=x.monitor".to_string()));
        assert!(parec.contains(&"--channels=2".to_string()));

        let ff = Flavor::FfmpegPulse.args(&cfg("default"));
        assert_eq!(ff.last().map(String::as_str), Some("-"));
        assert!(ff.windows(2).any(|w| w[0] == "-f" && w[1] == "f64le"));
        assert!(ff.windows(2).any(|w| w[0] == "-f" && w[1] == "pulse"));
        let pw = Flavor::PipeWire.args(&cfg("alsa_output.pci.analog-stereo"));
        assert!(pw
            .windows(2)
            .any(|w| w[0] == "--target" && w[1] == "alsa_output.pci.analog-stereo"));
        assert!(pw
            .windows(2)
            .any(|w| w[0] == "-P" && w[1] == "{ stream.capture.sink = true }"));
        assert_eq!(pw.last().map(String::as_str), Some("-"));

        assert_eq!(Flavor::FfmpegAlsa.format(), SampleFormat::F64Le);
        assert_eq!(Flavor::PipeWire.format(), SampleFormat::F32Le);
    }

    #[test]
    fn pipewire_targets_default_sink() {
        assert_eq!(pipewire_target(Some("speakers".into())), "speakers");
        assert_eq!(pipewire_target(None), "auto");
    }

    #[test]
    fn rejects_unsafe_device() {
        let backend = ExecBackend { flavor: Flavor::Parec };
        assert!(matches!(
            backend.start(cfg("foo bar")),
            Err(Error::UnknownDevice(_))
        ));
    }
}
