//! Forward real-to-complex FFT plan.

use crate::error::{Error, Result};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Binds an input buffer of `size` reals to `size / 2 + 1` complex outputs.
///
/// `execute` uses the input as scratch, so it must be refilled before every
/// call. `output[0]` is the DC term.
pub struct Plan {
    fft: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl Plan {
    pub fn new(size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        Self::with_planner(&mut planner, size)
    }

    /// Reuses twiddle tables when several plans of the same size are needed.
    pub fn with_planner(planner: &mut RealFftPlanner<f64>, size: usize) -> Self {
        let fft = planner.plan_fft_forward(size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        Self {
            fft,
            input,
            output,
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.input.len()
    }

    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut self.input
    }

    pub fn output(&self) -> &[Complex<f64>] {
        &self.output
    }

    pub fn execute(&mut self) -> Result<()> {
        self.fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| Error::Processor(format!("fft: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn output_is_one_sided() {
        let plan = Plan::new(1024);
        assert_eq!(plan.size(), 1024);
        assert_eq!(plan.output().len(), 513);
    }

    #[test]
    fn dc_lands_in_bin_zero() {
        let mut plan = Plan::new(64);
        plan.input_mut().fill(1.0);
        plan.execute().unwrap();
        assert!((plan.output()[0].re - 64.0).abs() < 1e-9);
        for c in &plan.output()[1..] {
            assert!(c.norm() < 1e-9);
        }
    }

    #[test]
    fn cosine_lands_in_its_bin() {
        let n = 256;
        let mut plan = Plan::new(n);
        for (i, x) in plan.input_mut().iter_mut().enumerate() {
            *x = (2.0 * PI * 10.0 * i as f64 / n as f64).cos();
        }
        plan.execute().unwrap();
        let peak = plan
            .output()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(10));
        assert!((plan.output()[10].norm() - n as f64 / 2.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_buffers_are_an_error() {
        let mut plan = Plan::new(64);
        plan.output.pop();
        assert!(matches!(plan.execute(), Err(Error::Processor(_))));
    }
}
