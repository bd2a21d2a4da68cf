//! Capture from standard input (interleaved f32 LE).
//!
//! A reader thread blocks on the stream and hands complete slices over a
//! single-slot channel, replacing any slice the session has not picked up
//! yet. The session waits with a deadline so a stalled pipe turns into
//! silence instead of a frozen frame.

use super::{Backend, Device, Kick, SampleFormat, Session, SessionConfig, SharedBuffers, SliceReader};
use crate::cancel::Cancel;
use crate::error::{Error, Result};
use crossbeam::channel::{bounded, TrySendError};
use crossbeam::select;
use std::io::{self, Read};
use std::thread;

pub const NAME: &str = "stdin";

/// Consecutive missed deadlines before the input is zero-filled.
const SILENT_AFTER_MISSES: u32 = 2;

pub struct StdinBackend;

pub fn backend() -> Box<dyn Backend> {
    Box::new(StdinBackend)
}

impl Backend for StdinBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn devices(&self) -> Result<Vec<Device>> {
        Ok(vec![Device::new(NAME).with_description("standard input")])
    }

    fn default_device(&self) -> Result<Option<Device>> {
        Ok(Some(Device::new(NAME)))
    }

    fn start(&self, cfg: SessionConfig) -> Result<Box<dyn Session>> {
        Ok(Box::new(StdinSession::new(cfg, io::stdin())))
    }
}

pub struct StdinSession {
    cfg: SessionConfig,
    source: Option<Box<dyn Read + Send>>,
}

impl StdinSession {
    pub fn new(cfg: SessionConfig, source: impl Read + Send + 'static) -> Self {
        Self {
            cfg,
            source: Some(Box::new(source)),
        }
    }
}

impl Session for StdinSession {
    fn start(&mut self, cancel: &Cancel, dst: SharedBuffers, kick: Kick) -> Result<()> {
        let source = self
            .source
            .take()
            .ok_or_else(|| Error::backend(NAME, "session already started"))?;
        let slice_len = self.cfg.slice_len();

        let (tx, rx) = bounded::<io::Result<Vec<f64>>>(1);
        let stale = rx.clone();
        // Not joined: a read on a terminal or idle pipe cannot be interrupted,
        // so the thread ends with the process or at EOF.
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                let mut reader = SliceReader::new(source, SampleFormat::F32Le, slice_len);
                loop {
                    let mut samples = vec![0.0; slice_len];
                    match reader.read_slice(&mut samples) {
                        Ok(true) => {
                            let mut msg = Ok(samples);
                            loop {
                                match tx.try_send(msg) {
                                    Ok(()) => break,
                                    Err(TrySendError::Full(back)) => {
                                        if stale.try_recv().is_ok() {
                                            tracing::trace!("dropping unread slice");
                                        }
                                        msg = back;
                                    }
                                    Err(TrySendError::Disconnected(_)) => return,
                                }
                            }
                        }
                        Ok(false) => return,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            return;
                        }
                    }
                }
            })?;

        let nominal = self.cfg.slice_duration();
        let mut deadline = nominal * 2;
        let mut misses = 0u32;
        loop {
            select! {
                recv(rx) -> msg => match msg {
                    Ok(Ok(samples)) => {
                        misses = 0;
                        dst.write_interleaved(&samples);
                        kick.kick();
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        tracing::debug!("stdin reached end of stream");
                        return Ok(());
                    }
                },
                recv(cancel.done()) -> _ => return Ok(()),
                default(deadline) => {
                    deadline = nominal;
                    misses = misses.saturating_add(1);
                    if misses >= SILENT_AFTER_MISSES {
                        if misses == SILENT_AFTER_MISSES {
                            tracing::debug!("stdin stalled, emitting silence");
                        }
                        dst.zero();
                        kick.kick();
                    }
                }
            }
        }
    }
}
