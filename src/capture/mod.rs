//! Audio capture backends
//!
//! Every backend delivers interleaved PCM which is de-interleaved into the
//! shared per-channel input buffers, followed by a kick to the processor.
//! Backends are looked up by short name in a [`Registry`] built by the
//! front-end.

pub mod exec;
pub mod native;
pub mod stdin;

use crate::cancel::Cancel;
use crate::error::{Error, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A capture source as reported by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub description: Option<String>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub device: Device,
    pub channels: usize,
    /// Frames per slice.
    pub sample_size: usize,
    pub sample_rate: f64,
}

impl SessionConfig {
    /// Samples per slice across all channels.
    pub fn slice_len(&self) -> usize {
        self.sample_size * self.channels
    }

    /// Wall-clock length of one slice.
    pub fn slice_duration(&self) -> Duration {
        Duration::from_secs_f64(self.sample_size as f64 / self.sample_rate)
    }
}

/// Per-channel input slices shared between capture and processing.
#[derive(Clone)]
pub struct SharedBuffers {
    inner: Arc<Mutex<Vec<Vec<f64>>>>,
    channels: usize,
    sample_size: usize,
}

impl SharedBuffers {
    pub fn new(channels: usize, sample_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vec![vec![0.0; sample_size]; channels])),
            channels,
            sample_size,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Vec<Vec<f64>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// De-interleave one slice of samples under the lock.
    pub fn write_interleaved(&self, samples: &[f64]) {
        let mut bufs = self.lock();
        deinterleave(samples, &mut bufs);
    }

    pub fn zero(&self) {
        for buf in self.lock().iter_mut() {
            buf.fill(0.0);
        }
    }
}

/// `dst[k % channels][k / channels] = src[k]`.
pub fn deinterleave(src: &[f64], dst: &mut [Vec<f64>]) {
    let channels = dst.len();
    if channels == 0 {
        return;
    }
    for (k, &sample) in src.iter().enumerate() {
        if let Some(slot) = dst[k % channels].get_mut(k / channels) {
            *slot = sample;
        }
    }
}

/// Single-slot wakeup from capture to the processor. Extra kicks are dropped.
#[derive(Clone)]
pub struct Kick(Sender<()>);

impl Kick {
    pub fn kick(&self) {
        let _ = self.0.try_send(());
    }
}

pub fn kick_channel() -> (Kick, Receiver<()>) {
    let (tx, rx) = bounded(1);
    (Kick(tx), rx)
}

/// On-the-wire sample encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    F32Le,
    F64Le,
}

impl SampleFormat {
    pub fn bytes(self) -> usize {
        match self {
            SampleFormat::F32Le => 4,
            SampleFormat::F64Le => 8,
        }
    }

    fn decode(self, bytes: &[u8], out: &mut [f64]) {
        match self {
            SampleFormat::F32Le => {
                for (chunk, slot) in bytes.chunks_exact(4).zip(out.iter_mut()) {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(chunk);
                    *slot = f32::from_le_bytes(raw) as f64;
                }
            }
            SampleFormat::F64Le => {
                for (chunk, slot) in bytes.chunks_exact(8).zip(out.iter_mut()) {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    *slot = f64::from_le_bytes(raw);
                }
            }
        }
    }
}

/// Reads whole slices from a byte stream.
///
/// Each read is bounded by the bytes still missing from the current slice,
/// so a backlog is delivered slice by slice and frames are never split.
pub struct SliceReader<R> {
    inner: R,
    format: SampleFormat,
    slice_bytes: usize,
    buf: Vec<u8>,
    filled: usize,
}

impl<R: Read> SliceReader<R> {
    pub fn new(inner: R, format: SampleFormat, slice_len: usize) -> Self {
        let slice_bytes = slice_len * format.bytes();
        Self {
            inner,
            format,
            slice_bytes,
            buf: vec![0; slice_bytes],
            filled: 0,
        }
    }

    /// Decode the next slice into `out` (interleaved). `Ok(false)` on EOF.
    pub fn read_slice(&mut self, out: &mut [f64]) -> io::Result<bool> {
        while self.filled < self.slice_bytes {
            match self.inner.read(&mut self.buf[self.filled..self.slice_bytes]) {
                Ok(0) => return Ok(false),
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.format.decode(&self.buf, out);
        self.filled = 0;
        Ok(true)
    }
}

/// A running capture. `start` blocks until the source ends or `cancel`
/// fires, filling `dst` and kicking after each slice.
pub trait Session: Send {
    fn start(&mut self, cancel: &Cancel, dst: SharedBuffers, kick: Kick) -> Result<()>;
}

pub trait Backend: Send {
    fn name(&self) -> &'static str;

    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn devices(&self) -> Result<Vec<Device>>;

    fn default_device(&self) -> Result<Option<Device>>;

    fn start(&self, cfg: SessionConfig) -> Result<Box<dyn Session>>;

    /// Resolve a device by name, or the default when `name` is `None`.
    fn device(&self, name: Option<&str>) -> Result<Device> {
        match name {
            None => self
                .default_device()?
                .ok_or_else(|| Error::UnknownDevice("no default device".into())),
            Some(name) => self
                .devices()?
                .into_iter()
                .find(|d| d.name == name)
                .ok_or_else(|| Error::UnknownDevice(name.to_string())),
        }
    }
}

pub type BackendFactory = fn() -> Box<dyn Backend>;

/// Named backend constructors, in preference order.
#[derive(Default)]
pub struct Registry {
    entries: Vec<(&'static str, BackendFactory)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        r.register(native::NAME, native::backend);
        r.register(exec::PAREC, exec::parec);
        r.register(exec::PIPEWIRE, exec::pipewire);
        r.register(exec::FFMPEG_ALSA, exec::ffmpeg_alsa);
        r.register(exec::FFMPEG_PULSE, exec::ffmpeg_pulse);
        r.register(stdin::NAME, stdin::backend);
        r
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Backend>> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, factory)| factory())
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))
    }
}

/// Device names end up on child-process command lines.
pub(crate) fn is_valid_device_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '@' | ',' | '='))
}
