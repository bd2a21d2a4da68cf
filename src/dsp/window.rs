//! In-place window functions applied to a slice before the FFT.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

const HAMMING_A0: f64 = 25.0 / 46.0;

/// Amplitude taper applied to each channel's slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowFn {
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    Bartlett,
    Lanczos,
    /// Planck-taper with shape parameter `ε` in `(0, 0.5]`.
    PlanckTaper(f64),
    /// Generic two-term cosine sum with caller-supplied `a₀`.
    CosineSum(f64),
}

impl Default for WindowFn {
    fn default() -> Self {
        WindowFn::Lanczos
    }
}

impl WindowFn {
    pub fn apply(&self, buf: &mut [f64]) {
        if buf.len() < 2 {
            return;
        }
        match *self {
            WindowFn::Rectangular => {}
            WindowFn::Hann => cosine_sum(buf, 0.5),
            WindowFn::Hamming => cosine_sum(buf, HAMMING_A0),
            WindowFn::CosineSum(a0) => cosine_sum(buf, a0),
            WindowFn::Blackman => blackman(buf),
            WindowFn::Bartlett => bartlett(buf),
            WindowFn::Lanczos => lanczos(buf),
            WindowFn::PlanckTaper(eps) => planck_taper(buf, eps),
        }
    }
}

fn cosine_sum(buf: &mut [f64], a0: f64) {
    let n = buf.len() as f64;
    let a1 = 1.0 - a0;
    for (i, x) in buf.iter_mut().enumerate() {
        *x *= a0 - a1 * (2.0 * PI * i as f64 / n).cos();
    }
}

fn blackman(buf: &mut [f64]) {
    let n = buf.len() as f64;
    for (i, x) in buf.iter_mut().enumerate() {
        let t = 2.0 * PI * i as f64 / n;
        *x *= 0.42 - 0.5 * t.cos() + 0.08 * (2.0 * t).cos();
    }
}

fn bartlett(buf: &mut [f64]) {
    let m = (buf.len() - 1) as f64;
    for (i, x) in buf.iter_mut().enumerate() {
        *x *= 1.0 - (2.0 * i as f64 / m - 1.0).abs();
    }
}

fn lanczos(buf: &mut [f64]) {
    let m = (buf.len() - 1) as f64;
    for (i, x) in buf.iter_mut().enumerate() {
        *x *= sinc(2.0 * i as f64 / m - 1.0);
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let px = PI * x;
    px.sin() / px
}

fn planck_taper(buf: &mut [f64], eps: f64) {
    let len = buf.len();
    let eps = eps.clamp(0.0, 0.5);
    let taper = eps * len as f64;
    let edge = (taper.floor() as usize).min(len / 2);
    if edge == 0 {
        return;
    }

    buf[0] = 0.0;
    buf[len - 1] = 0.0;
    for i in 1..edge {
        let k = i as f64;
        let w = 1.0 / (1.0 + (taper / k - taper / (taper - k)).exp());
        buf[i] *= w;
        buf[len - 1 - i] *= w;
    }
}

impl FromStr for WindowFn {
    type Err = String;

    /// Accepts `name` or `name:param` (for `planck` and `cosine`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, param) = match s.split_once(':') {
            Some((n, p)) => {
                let p: f64 = p
                    .parse()
                    .map_err(|_| format!("invalid window parameter: {p}"))?;
                (n, Some(p))
            }
            None => (s, None),
        };

        match (name.to_lowercase().as_str(), param) {
            ("rectangular" | "rect" | "none", _) => Ok(WindowFn::Rectangular),
            ("hann" | "hanning", _) => Ok(WindowFn::Hann),
            ("hamming", _) => Ok(WindowFn::Hamming),
            ("blackman", _) => Ok(WindowFn::Blackman),
            ("bartlett" | "triangle", _) => Ok(WindowFn::Bartlett),
            ("lanczos", _) => Ok(WindowFn::Lanczos),
            ("planck" | "planck-taper", p) => Ok(WindowFn::PlanckTaper(p.unwrap_or(0.1))),
            ("cosine" | "cosine-sum", p) => Ok(WindowFn::CosineSum(p.unwrap_or(0.5))),
            _ => Err(format!("unknown window function: {s}")),
        }
    }
}

impl fmt::Display for WindowFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowFn::Rectangular => write!(f, "rectangular"),
            WindowFn::Hann => write!(f, "hann"),
            WindowFn::Hamming => write!(f, "hamming"),
            WindowFn::Blackman => write!(f, "blackman"),
            WindowFn::Bartlett => write!(f, "bartlett"),
            WindowFn::Lanczos => write!(f, "lanczos"),
            WindowFn::PlanckTaper(eps) => write!(f, "planck:{eps}"),
            WindowFn::CosineSum(a0) => write!(f, "cosine:{a0}"),
        }
    }
}
