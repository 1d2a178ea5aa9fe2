// StrideBeat — Rolling Sample Window
//
// Fixed-capacity ring buffer of the most recent accelerometer samples.  The
// combined per-axis variance is orientation independent: gravity is a constant
// offset on each axis and contributes nothing once the window mean is removed.

use crate::config::WINDOW_SIZE;
use crate::events::{Accel, Sample};

pub struct RollingWindow<const N: usize = WINDOW_SIZE> {
    data: [Accel; N],
    /// Next slot to write.
    write_index: usize,
    len: usize,
}

impl<const N: usize> RollingWindow<N> {
    pub fn new() -> Self {
        Self {
            data: [Accel::default(); N],
            write_index: 0,
            len: 0,
        }
    }

    /// Append a sample, evicting the oldest one once the window is full.
    pub fn push(&mut self, sample: Sample) {
        self.data[self.write_index] = sample.accel;
        self.write_index = (self.write_index + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Held samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Accel> + '_ {
        let start = (self.write_index + N - self.len) % N;
        (0..self.len).map(move |i| &self.data[(start + i) % N])
    }

    /// `var(ax) + var(ay) + var(az)` (population variance), or `None` while
    /// fewer than two samples are held.
    pub fn variance(&self) -> Option<f32> {
        if self.len < 2 {
            return None;
        }

        let n = self.len as f32;
        let (sx, sy, sz) = self
            .iter()
            .fold((0.0f32, 0.0f32, 0.0f32), |(x, y, z), a| (x + a.ax, y + a.ay, z + a.az));
        let (mx, my, mz) = (sx / n, sy / n, sz / n);

        let sum_sq = self.iter().fold(0.0f32, |acc, a| {
            acc + (a.ax - mx).powi(2) + (a.ay - my).powi(2) + (a.az - mz).powi(2)
        });

        Some(sum_sq / n)
    }
}

impl<const N: usize> Default for RollingWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sample(ax: f32, ay: f32, az: f32) -> Sample {
        Sample::new(Instant::now(), ax, ay, az)
    }

    #[test]
    fn variance_undefined_below_two_samples() {
        let mut window: RollingWindow<4> = RollingWindow::new();
        assert_eq!(window.variance(), None);
        window.push(sample(0.0, 0.0, 1.0));
        assert_eq!(window.variance(), None);
        window.push(sample(0.0, 0.0, 1.0));
        assert_eq!(window.variance(), Some(0.0));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut window: RollingWindow<3> = RollingWindow::new();
        for i in 0..5 {
            window.push(sample(i as f32, 0.0, 0.0));
        }
        assert!(window.is_full());
        assert_eq!(window.len(), 3);
        let xs: Vec<f32> = window.iter().map(|a| a.ax).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn constant_gravity_offset_has_zero_variance() {
        let mut window: RollingWindow = RollingWindow::new();
        for _ in 0..WINDOW_SIZE {
            window.push(sample(0.3, -0.2, 0.93));
        }
        assert!(window.variance().unwrap() < 1e-9);
    }

    #[test]
    fn variance_sums_all_axes() {
        let mut window: RollingWindow<2> = RollingWindow::new();
        // Each axis alternates ±0.5 around its mean → variance 0.25 per axis.
        window.push(sample(0.5, 1.5, -0.5));
        window.push(sample(-0.5, 0.5, 0.5));
        let v = window.variance().unwrap();
        assert!((v - 0.75).abs() < 1e-6, "got {v}");
    }
}
