//! Wiring of backend, capture thread, processor and display.

use crate::cancel::Cancel;
use crate::capture::{kick_channel, Backend, Registry, SharedBuffers};
use crate::config::Config;
use crate::display::Display;
use crate::error::{Error, Result};
use crate::processor::{self, frame_period, Single, Threaded};
use std::io::Write;
use std::thread;

/// Run until the user quits or the capture source ends.
pub fn run(config: &Config, registry: &Registry) -> Result<()> {
    let mut backend = registry.create(&config.backend)?;
    backend.init()?;
    let result = run_with(config, backend.as_mut());
    let closed = backend.close();
    result.and(closed)
}

fn run_with(config: &Config, backend: &mut dyn Backend) -> Result<()> {
    let device = backend.device(config.device.as_deref())?;
    tracing::info!(
        backend = backend.name(),
        device = %device.name,
        rate = config.sample_rate,
        size = config.sample_size,
        channels = config.channels,
        threaded = config.threaded,
        "starting session"
    );
    let mut capture = backend.start(config.session(device))?;

    let input = SharedBuffers::new(config.channels, config.sample_size);
    let mut display = Display::new(config.display.clone());
    display.init()?;
    let cancel = Cancel::new();
    display.start(&cancel)?;

    let (kick, kick_rx) = kick_channel();
    let capture_thread = {
        let cancel = cancel.clone();
        let input = input.clone();
        thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let result = capture.start(&cancel, input, kick);
                match &result {
                    Ok(()) => tracing::debug!("capture finished"),
                    Err(e) => tracing::error!(error = %e, "capture failed"),
                }
                cancel.cancel();
                result
            })?
    };

    let period = frame_period(config.frame_rate);
    let processed = if config.threaded {
        Threaded::new(config.processor(), input, &mut display)
            .and_then(|mut p| processor::run(&mut p, kick_rx, &cancel, period))
    } else {
        let mut p = Single::new(config.processor(), input, &mut display);
        processor::run(&mut p, kick_rx, &cancel, period)
    };

    cancel.cancel();
    let captured = capture_thread
        .join()
        .unwrap_or_else(|_| Err(Error::Processor("capture thread panicked".into())));
    let stopped = display.stop();
    tracing::info!("session finished");

    processed.and(captured).and(stopped)
}

pub fn list_backends(registry: &Registry, out: &mut impl Write) -> Result<()> {
    for name in registry.names() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Print the devices of `backend`, marking the default with `*`.
pub fn list_devices(registry: &Registry, backend: &str, out: &mut impl Write) -> Result<()> {
    let mut backend = registry.create(backend)?;
    backend.init()?;
    let listed = (|| -> Result<()> {
        let default = backend.default_device()?.map(|d| d.name);
        for device in backend.devices()? {
            let mark = if Some(&device.name) == default.as_ref() { '*' } else { ' ' };
            match &device.description {
                Some(desc) => writeln!(out, "{mark} {}\t{desc}", device.name)?,
                None => writeln!(out, "{mark} {}", device.name)?,
            }
        }
        Ok(())
    })();
    let closed = backend.close();
    listed.and(closed)
}
