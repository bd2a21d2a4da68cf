//! Fixed-capacity running mean and standard deviation.
//!
//! Values live in a contiguous ring addressed by a head cursor, so pushing
//! and dropping never allocate. Sums are kept incrementally and the derived
//! statistics are refreshed after every mutation.

/// Bounded FIFO of scalars with O(1) mean/stddev.
#[derive(Clone, Debug)]
pub struct MovingWindow {
    ring: Vec<f64>,
    head: usize,
    len: usize,
    sum: f64,
    sum_sq: f64,
    mean: f64,
    stddev: f64,
}

impl MovingWindow {
    /// Capacity is raised to 1 when 0 is requested.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
            sum: 0.0,
            sum_sq: 0.0,
            mean: 0.0,
            stddev: 0.0,
        }
    }

    /// Push `x`, evicting the oldest value when full. Returns `(mean, stddev)`.
    pub fn update(&mut self, x: f64) -> (f64, f64) {
        let cap = self.ring.len();
        let old = if self.len == cap {
            let old = self.ring[self.head];
            self.ring[self.head] = x;
            self.head = (self.head + 1) % cap;
            old
        } else {
            self.ring[(self.head + self.len) % cap] = x;
            self.len += 1;
            0.0
        };

        self.sum += x - old;
        self.sum_sq += x * x - old * old;
        self.refresh()
    }

    /// Evict up to `n` of the oldest values. Returns `(mean, stddev)`.
    pub fn drop(&mut self, n: usize) -> (f64, f64) {
        let cap = self.ring.len();
        for _ in 0..n.min(self.len) {
            let old = self.ring[self.head];
            self.head = (self.head + 1) % cap;
            self.len -= 1;
            self.sum -= old;
            self.sum_sq -= old * old;
        }
        self.refresh()
    }

    pub fn stats(&self) -> (f64, f64) {
        (self.mean, self.stddev)
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stddev(&self) -> f64 {
        self.stddev
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn cap(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn refresh(&mut self) -> (f64, f64) {
        if self.len == 0 {
            // Reset explicitly so drift from long add/remove runs cannot survive.
            self.sum = 0.0;
            self.sum_sq = 0.0;
            self.mean = 0.0;
            self.stddev = 0.0;
            return (0.0, 0.0);
        }

        let n = self.len as f64;
        self.mean = self.sum / n;
        self.stddev = if self.len < 2 {
            0.0
        } else {
            (self.sum_sq / n - self.mean * self.mean).max(0.0).sqrt()
        };

        (self.mean, self.stddev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn empty_window_reports_zero() {
        let w = MovingWindow::new(4);
        assert!(w.is_empty());
        assert_eq!(w.stats(), (0.0, 0.0));
        assert_eq!(w.cap(), 4);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut w = MovingWindow::new(0);
        assert_eq!(w.cap(), 1);
        w.update(3.0);
        w.update(5.0);
        assert_eq!(w.len(), 1);
        assert_eq!(w.mean(), 5.0);
    }

    #[test]
    fn mean_and_stddev_over_partial_window() {
        let mut w = MovingWindow::new(8);
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            w.update(x);
        }
        let (mean, stddev) = w.stats();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((stddev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn full_window_evicts_oldest() {
        let mut w = MovingWindow::new(3);
        for x in [100.0, 1.0, 2.0, 3.0] {
            w.update(x);
        }
        assert_eq!(w.len(), 3);
        assert!((w.mean() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_no_deviation() {
        let mut w = MovingWindow::new(5);
        w.update(1.0);
        w.update(3.0);
        let (_, sd) = w.drop(1);
        assert_eq!(w.len(), 1);
        assert_eq!(sd, 0.0);
        assert!((w.mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn drop_all_resets_sum() {
        let mut w = MovingWindow::new(16);
        for i in 0..40 {
            w.update(0.1 * i as f64 + 1e-7);
        }
        w.drop(usize::MAX);
        assert!(w.is_empty());
        assert_eq!(w.sum(), 0.0);
        assert_eq!(w.stats(), (0.0, 0.0));
    }

    #[test]
    fn invariants_hold_under_random_operations() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut w = MovingWindow::new(32);
        let mut shadow: std::collections::VecDeque<f64> = Default::default();

        for _ in 0..5000 {
            if rng.gen_bool(0.85) {
                let x = rng.gen_range(0.0..50.0);
                w.update(x);
                shadow.push_back(x);
                if shadow.len() > 32 {
                    shadow.pop_front();
                }
            } else {
                let n = rng.gen_range(0..12);
                w.drop(n);
                for _ in 0..n.min(shadow.len()) {
                    shadow.pop_front();
                }
            }

            assert!(w.len() <= w.cap());
            assert_eq!(w.len(), shadow.len());
            assert!(w.stddev() >= 0.0);
            if w.is_empty() {
                assert_eq!(w.sum(), 0.0);
                assert_eq!(w.stddev(), 0.0);
            } else {
                let expected = shadow.iter().sum::<f64>() / shadow.len() as f64;
                assert!((w.mean() - w.sum() / w.len() as f64).abs() < 1e-9);
                assert!((w.mean() - expected).abs() < 1e-6);
            }
        }
    }
}
