//! Signal processing building blocks
//!
//! Everything between a de-interleaved slice of samples and a row of bar
//! heights: window functions, the FFT plan, logarithmic binning, temporal
//! smoothing and auto-scaling.

pub mod analyzer;
pub mod fft;
pub mod moving_window;
pub mod scaler;
pub mod smoother;
pub mod window;

pub use analyzer::{Analyzer, AnalyzerConfig, BinReduction};
pub use fft::Plan;
pub use scaler::Scaler;
pub use smoother::{ChannelSmoother, Smoother, SmootherConfig, SmoothingMethod};
pub use window::WindowFn;
