use super::{Frame, Output, Process, ProcessorConfig};
use crate::capture::SharedBuffers;
use crate::dsp::{Analyzer, Plan, Scaler, Smoother, WindowFn};
use crate::error::Result;
use realfft::RealFftPlanner;

/// Runs every channel on the calling thread.
pub struct Single<O> {
    input: SharedBuffers,
    analyzer: Analyzer,
    window: WindowFn,
    plans: Vec<Plan>,
    bars: Vec<Vec<f64>>,
    smoother: Option<Smoother>,
    scaler: Scaler,
    output: O,
    requested: usize,
    recalculations: usize,
}

impl<O: Output> Single<O> {
    pub fn new(cfg: ProcessorConfig, input: SharedBuffers, output: O) -> Self {
        let channels = input.channels();
        let size = cfg.analyzer.sample_size;
        let mut planner = RealFftPlanner::new();
        Self {
            plans: (0..channels)
                .map(|_| Plan::with_planner(&mut planner, size))
                .collect(),
            bars: vec![vec![0.0; size / 2]; channels],
            smoother: cfg.smoothing.as_ref().map(Smoother::new),
            scaler: Scaler::new(cfg.frames_per_sec),
            analyzer: Analyzer::new(cfg.analyzer),
            window: cfg.window,
            input,
            output,
            requested: 0,
            recalculations: 0,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// How many times the bin table was rebuilt.
    pub fn recalculations(&self) -> usize {
        self.recalculations
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

impl<O: Output> Process for Single<O> {
    fn process(&mut self) -> Result<()> {
        let channels = self.plans.len();
        let want = self.output.bins(channels);
        if want != self.requested {
            self.requested = want;
            let got = self.analyzer.recalculate(want);
            self.recalculations += 1;
            // Bar indices now cover other frequencies.
            if let Some(smoother) = &mut self.smoother {
                smoother.reset();
            }
            tracing::debug!(requested = want, bars = got, "recalculated bins");
        }

        {
            let input = self.input.lock();
            for (plan, buf) in self.plans.iter_mut().zip(input.iter()) {
                let n = buf.len().min(plan.size());
                plan.input_mut()[..n].copy_from_slice(&buf[..n]);
            }
        }

        let bar_count = self.analyzer.bar_count();
        let mut peak = 0.0f64;
        for (ch, plan) in self.plans.iter_mut().enumerate() {
            self.window.apply(plan.input_mut());
            plan.execute()?;

            let bars = &mut self.bars[ch];
            if bars.len() < bar_count {
                bars.resize(bar_count, 0.0);
            }
            for (i, slot) in bars.iter_mut().take(bar_count).enumerate() {
                let mut v = self.analyzer.process_bin(i, plan.output());
                if let Some(smoother) = &mut self.smoother {
                    v = smoother.smooth_bin(ch, i, v);
                }
                peak = peak.max(v);
                *slot = v;
            }
        }

        let scale = self.scaler.update(peak);
        if let Some(smoother) = &mut self.smoother {
            smoother.set_peak(peak);
        }

        self.output.write(&Frame {
            bars: &self.bars,
            channels,
            bar_count,
            peak,
            scale,
        })
    }
}
