//! Frame orchestration
//!
//! A processor turns the shared input slices into one frame of bar values
//! per call and hands it to an [`Output`]. [`run`] drives it from capture
//! kicks, a frame timer and the cancellation token.

mod single;
mod threaded;

pub use single::Single;
pub use threaded::Threaded;

use crate::cancel::Cancel;
use crate::dsp::{AnalyzerConfig, SmootherConfig, WindowFn};
use crate::error::Result;
use crossbeam::channel::{after, never, Receiver};
use crossbeam::select;
use std::time::Duration;

/// One rendered frame of bar values.
pub struct Frame<'a> {
    /// `bars[channel][bar]`; only the first `bar_count` entries are valid.
    pub bars: &'a [Vec<f64>],
    pub channels: usize,
    pub bar_count: usize,
    pub peak: f64,
    /// Divisor the renderer maps to its full span.
    pub scale: f64,
}

impl Frame<'_> {
    pub fn channel(&self, ch: usize) -> &[f64] {
        self.bars
            .get(ch)
            .map(|b| &b[..self.bar_count.min(b.len())])
            .unwrap_or(&[])
    }
}

/// Sink for frames.
pub trait Output {
    /// Bar count the sink can show for `channels` channels right now.
    fn bins(&mut self, channels: usize) -> usize;

    fn write(&mut self, frame: &Frame<'_>) -> Result<()>;
}

impl<O: Output + ?Sized> Output for &mut O {
    fn bins(&mut self, channels: usize) -> usize {
        (**self).bins(channels)
    }

    fn write(&mut self, frame: &Frame<'_>) -> Result<()> {
        (**self).write(frame)
    }
}

pub trait Process {
    fn process(&mut self) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub analyzer: AnalyzerConfig,
    pub window: WindowFn,
    /// `None` disables temporal smoothing.
    pub smoothing: Option<SmootherConfig>,
    /// Rate the auto-scaler windows are sized for.
    pub frames_per_sec: f64,
}

/// Frame period for `fps`; non-positive rates fall back to one second.
pub fn frame_period(fps: i32) -> Duration {
    if fps <= 0 {
        Duration::from_secs(1)
    } else {
        Duration::from_secs_f64(1.0 / fps as f64)
    }
}

/// Process frames until `cancel` fires. Each frame is followed by a wait on
/// the next kick or a fresh timer, so slow frames never queue up.
pub fn run<P: Process + ?Sized>(
    p: &mut P,
    kick: Receiver<()>,
    cancel: &Cancel,
    period: Duration,
) -> Result<()> {
    let mut kick = kick;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        p.process()?;
        select! {
            recv(kick) -> msg => {
                if msg.is_err() {
                    kick = never();
                }
            }
            recv(after(period)) -> _ => {}
            recv(cancel.done()) -> _ => return Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::capture::SharedBuffers;
    use crate::dsp::SmoothingMethod;
    use std::f64::consts::PI;

    /// Output that keeps every frame.
    pub struct Recorder {
        pub bins: usize,
        pub frames: Vec<Recorded>,
    }

    pub struct Recorded {
        pub bars: Vec<Vec<f64>>,
        pub bar_count: usize,
        pub peak: f64,
        pub scale: f64,
    }

    impl Recorder {
        pub fn new(bins: usize) -> Self {
            Self {
                bins,
                frames: Vec::new(),
            }
        }

        pub fn last(&self) -> &Recorded {
            &self.frames[self.frames.len() - 1]
        }
    }

    impl Output for Recorder {
        fn bins(&mut self, _channels: usize) -> usize {
            self.bins
        }

        fn write(&mut self, frame: &Frame<'_>) -> Result<()> {
            self.frames.push(Recorded {
                bars: (0..frame.channels)
                    .map(|ch| frame.channel(ch).to_vec())
                    .collect(),
                bar_count: frame.bar_count,
                peak: frame.peak,
                scale: frame.scale,
            });
            Ok(())
        }
    }

    pub fn config(rate: f64, size: usize, channels: usize) -> ProcessorConfig {
        ProcessorConfig {
            analyzer: AnalyzerConfig::new(rate, size),
            window: WindowFn::Lanczos,
            smoothing: Some(SmootherConfig {
                channels,
                sample_size: size,
                sample_rate: rate,
                factor: 0.65,
                average_size: None,
                method: SmoothingMethod::Simple,
            }),
            frames_per_sec: rate / size as f64,
        }
    }

    pub fn fill_sine(input: &SharedBuffers, ch: usize, freq: f64, rate: f64, amp: f64) {
        let mut bufs = input.lock();
        for (i, x) in bufs[ch].iter_mut().enumerate() {
            *x = amp * (2.0 * PI * freq * i as f64 / rate).sin();
        }
    }

    pub fn loudest(bars: &[f64]) -> usize {
        bars.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}
