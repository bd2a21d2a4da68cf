//! In-process capture through cpal (ALSA, CoreAudio, WASAPI).

use super::{Backend, Device, Kick, Session, SessionConfig, SharedBuffers};
use crate::cancel::Cancel;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::bounded;
use crossbeam::select;
use std::fs::File;
use std::os::unix::io::AsRawFd;

pub const NAME: &str = "cpal";

/// Redirects stderr to /dev/null while alive. ALSA prints probe noise
/// there during enumeration, which would land on the terminal.
struct StderrSuppressor {
    saved_fd: i32,
    _dev_null: File,
}

impl StderrSuppressor {
    fn new() -> Option<Self> {
        let dev_null = File::open("/dev/null").ok()?;
        let saved_fd = unsafe { libc::dup(2) };
        if saved_fd < 0 {
            return None;
        }
        if unsafe { libc::dup2(dev_null.as_raw_fd(), 2) } < 0 {
            unsafe {
                libc::close(saved_fd);
            }
            return None;
        }
        Some(Self {
            saved_fd,
            _dev_null: dev_null,
        })
    }
}

impl Drop for StderrSuppressor {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved_fd, 2);
            libc::close(self.saved_fd);
        }
    }
}

pub struct CpalBackend;

pub fn backend() -> Box<dyn Backend> {
    Box::new(CpalBackend)
}

impl Backend for CpalBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn devices(&self) -> Result<Vec<Device>> {
        let _quiet = StderrSuppressor::new();
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| Error::backend(NAME, e.to_string()))?;
        Ok(devices
            .filter_map(|d| d.name().ok())
            .map(|name| Device::new(name).with_description(format!("{:?}", host.id())))
            .collect())
    }

    fn default_device(&self) -> Result<Option<Device>> {
        let _quiet = StderrSuppressor::new();
        Ok(cpal::default_host()
            .default_input_device()
            .and_then(|d| d.name().ok())
            .map(Device::new))
    }

    fn start(&self, cfg: SessionConfig) -> Result<Box<dyn Session>> {
        Ok(Box::new(CpalSession { cfg }))
    }
}

/// The cpal stream is not `Send` on every platform, so it is opened on the
/// capture thread inside `start` and never leaves it.
struct CpalSession {
    cfg: SessionConfig,
}

fn find_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if let Some(d) = host.default_input_device() {
        if d.name().map(|n| n == name).unwrap_or(false) {
            return Ok(d);
        }
    }
    host.input_devices()
        .map_err(|e| Error::backend(NAME, e.to_string()))?
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| Error::UnknownDevice(name.to_string()))
}

/// Accumulates callback data and yields the most recent aligned slice.
struct Staging {
    pending: Vec<f32>,
    slice: Vec<f64>,
}

impl Staging {
    fn new(slice_len: usize) -> Self {
        Self {
            pending: Vec::with_capacity(slice_len * 2),
            slice: vec![0.0; slice_len],
        }
    }

    fn push(&mut self, data: &[f32]) -> Option<&[f64]> {
        let slice_len = self.slice.len();
        self.pending.extend_from_slice(data);
        if slice_len == 0 || self.pending.len() < slice_len {
            return None;
        }
        let end = (self.pending.len() / slice_len) * slice_len;
        let start = end - slice_len;
        for (dst, src) in self.slice.iter_mut().zip(&self.pending[start..end]) {
            *dst = *src as f64;
        }
        self.pending.drain(..end);
        Some(&self.slice)
    }
}

impl Session for CpalSession {
    fn start(&mut self, cancel: &Cancel, dst: SharedBuffers, kick: Kick) -> Result<()> {
        let quiet = StderrSuppressor::new();
        let host = cpal::default_host();
        let device = find_device(&host, &self.cfg.device.name)?;

        let stream_config = cpal::StreamConfig {
            channels: self.cfg.channels as u16,
            sample_rate: cpal::SampleRate(self.cfg.sample_rate.round() as u32),
            buffer_size: cpal::BufferSize::Default,
        };
        tracing::debug!(
            device = %self.cfg.device.name,
            channels = stream_config.channels,
            rate = stream_config.sample_rate.0,
            "building cpal input stream"
        );

        let (fatal_tx, fatal_rx) = bounded::<String>(1);
        let mut staging = Staging::new(self.cfg.slice_len());
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Some(slice) = staging.push(data) {
                        dst.write_interleaved(slice);
                        kick.kick();
                    }
                },
                move |err| match err {
                    cpal::StreamError::DeviceNotAvailable => {
                        let _ = fatal_tx.try_send(err.to_string());
                    }
                    other => tracing::warn!(error = %other, "audio stream hiccup"),
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;
        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        drop(quiet);

        select! {
            recv(cancel.done()) -> _ => Ok(()),
            recv(fatal_rx) -> msg => match msg {
                Ok(message) => Err(Error::Stream(message)),
                Err(_) => Ok(()),
            },
        }
    }
}
