use super::{Frame, Output, Process, ProcessorConfig};
use crate::capture::SharedBuffers;
use crate::dsp::{Analyzer, ChannelSmoother, Plan, Scaler, Smoother, WindowFn};
use crate::error::{Error, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use realfft::RealFftPlanner;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Job {
    analyzer: Arc<Analyzer>,
    bar_count: usize,
    /// Peak of the previous frame, for the adaptive smoothers.
    peak: f64,
    /// The bin table changed since the last job.
    reset: bool,
    bars: Vec<f64>,
}

struct Done {
    ch: usize,
    bars: Vec<f64>,
    peak: f64,
    result: Result<()>,
}

struct Worker {
    jobs: Sender<Job>,
    handle: JoinHandle<()>,
}

/// One worker thread per channel. Workers release their analyzer handle
/// before reporting back, so the bin table can be rebuilt in place between
/// frames.
pub struct Threaded<O> {
    analyzer: Arc<Analyzer>,
    workers: Vec<Worker>,
    done: Receiver<Done>,
    bars: Vec<Vec<f64>>,
    scaler: Scaler,
    last_peak: f64,
    output: O,
    requested: usize,
    recalculations: usize,
}

impl<O: Output> Threaded<O> {
    pub fn new(cfg: ProcessorConfig, input: SharedBuffers, output: O) -> Result<Self> {
        let channels = input.channels();
        let size = cfg.analyzer.sample_size;
        let mut planner = RealFftPlanner::new();
        let mut smoothers: Vec<Option<ChannelSmoother>> = match &cfg.smoothing {
            Some(s) => Smoother::new(s).into_channels().into_iter().map(Some).collect(),
            None => Vec::new(),
        };
        smoothers.resize_with(channels, || None);

        let (done_tx, done) = unbounded();
        let mut workers = Vec::with_capacity(channels);
        for (ch, smoother) in smoothers.into_iter().enumerate().take(channels) {
            let (jobs, job_rx) = unbounded();
            let state = ChannelWorker {
                ch,
                input: input.clone(),
                plan: Plan::with_planner(&mut planner, size),
                window: cfg.window,
                smoother,
            };
            let done_tx = done_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("channel-{ch}"))
                .spawn(move || state.run(job_rx, done_tx))?;
            workers.push(Worker { jobs, handle });
        }

        Ok(Self {
            analyzer: Arc::new(Analyzer::new(cfg.analyzer)),
            workers,
            done,
            bars: vec![vec![0.0; size / 2]; channels],
            scaler: Scaler::new(cfg.frames_per_sec),
            last_peak: 0.0,
            output,
            requested: 0,
            recalculations: 0,
        })
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn recalculations(&self) -> usize {
        self.recalculations
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}

impl<O: Output> Process for Threaded<O> {
    fn process(&mut self) -> Result<()> {
        let channels = self.workers.len();
        let want = self.output.bins(channels);
        let reset = want != self.requested;
        if reset {
            self.requested = want;
            let got = Arc::make_mut(&mut self.analyzer).recalculate(want);
            self.recalculations += 1;
            tracing::debug!(requested = want, bars = got, "recalculated bins");
        }

        let bar_count = self.analyzer.bar_count();
        for (ch, worker) in self.workers.iter().enumerate() {
            let job = Job {
                analyzer: Arc::clone(&self.analyzer),
                bar_count,
                peak: if reset { 0.0 } else { self.last_peak },
                reset,
                bars: std::mem::take(&mut self.bars[ch]),
            };
            worker
                .jobs
                .send(job)
                .map_err(|_| Error::Processor(format!("channel {ch} worker exited")))?;
        }

        let mut peak = 0.0f64;
        let mut failed = Ok(());
        for _ in 0..channels {
            let done = self
                .done
                .recv()
                .map_err(|_| Error::Processor("channel workers exited".into()))?;
            peak = peak.max(done.peak);
            self.bars[done.ch] = done.bars;
            if failed.is_ok() {
                failed = done.result;
            }
        }
        failed?;

        let scale = self.scaler.update(peak);
        self.last_peak = peak;

        self.output.write(&Frame {
            bars: &self.bars,
            channels,
            bar_count,
            peak,
            scale,
        })
    }
}

impl<O> Drop for Threaded<O> {
    fn drop(&mut self) {
        let handles: Vec<_> = self
            .workers
            .drain(..)
            .map(|w| {
                drop(w.jobs);
                w.handle
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
    }
}

struct ChannelWorker {
    ch: usize,
    input: SharedBuffers,
    plan: Plan,
    window: WindowFn,
    smoother: Option<ChannelSmoother>,
}

impl ChannelWorker {
    fn run(mut self, jobs: Receiver<Job>, done: Sender<Done>) {
        for job in jobs {
            let Job {
                analyzer,
                bar_count,
                peak: last_peak,
                reset,
                mut bars,
            } = job;

            if reset {
                if let Some(smoother) = &mut self.smoother {
                    smoother.reset();
                }
            }

            {
                let input = self.input.lock();
                if let Some(buf) = input.get(self.ch) {
                    let n = buf.len().min(self.plan.size());
                    self.plan.input_mut()[..n].copy_from_slice(&buf[..n]);
                }
            }
            self.window.apply(self.plan.input_mut());
            let result = self.plan.execute();

            bars.resize(bar_count, 0.0);
            let mut peak = 0.0f64;
            if result.is_ok() {
                for (i, slot) in bars.iter_mut().enumerate() {
                    let mut v = analyzer.process_bin(i, self.plan.output());
                    if let Some(smoother) = &mut self.smoother {
                        v = smoother.smooth(i, v, last_peak);
                    }
                    peak = peak.max(v);
                    *slot = v;
                }
            }
            drop(analyzer);

            let done_msg = Done {
                ch: self.ch,
                bars,
                peak,
                result,
            };
            if done.send(done_msg).is_err() {
                return;
            }
        }
    }
}
