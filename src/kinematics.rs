//! Kinematics processor
//!
//! Derives velocity, acceleration and jerk from consecutive pointer samples
//! with guarded divisors, and periodically estimates narrow-band tremor
//! power with a discrete Fourier transform restricted to the physiological
//! tremor band (~8-12 Hz).
//!
//! All updates are incremental; the only buffer is the bounded sample ring
//! that the tremor DFT consumes.

use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::config::KinematicsConfig;
use crate::types::{KinematicFrame, Sample};

/// Kinematics state. Owns the sample ring exclusively.
#[derive(Debug)]
pub struct KinematicsProcessor {
    config: KinematicsConfig,
    samples: VecDeque<Sample>,
    prev_frame: Option<KinematicFrame>,
    prev_sample: Option<Sample>,
}

impl KinematicsProcessor {
    pub fn new(config: KinematicsConfig) -> Self {
        let cap = config.window_size;
        Self {
            config,
            samples: VecDeque::with_capacity(cap),
            prev_frame: None,
            prev_sample: None,
        }
    }

    /// Recent samples, oldest first. Detectors borrow, never mutate.
    pub fn samples(&self) -> &VecDeque<Sample> {
        &self.samples
    }

    /// Ingest one accepted pointer sample and derive a frame against the
    /// previous one.
    ///
    /// Returns `None` for the first sample and whenever Δt falls below the
    /// guard threshold: a degenerate Δt skips the frame rather than
    /// producing NaN/∞.
    pub fn push(&mut self, sample: Sample) -> Option<KinematicFrame> {
        self.samples.push_back(sample);
        while self.samples.len() > self.config.window_size {
            self.samples.pop_front();
        }

        let prev = match self.prev_sample.replace(sample) {
            Some(p) => p,
            None => return None,
        };

        if sample.t_ms <= prev.t_ms {
            // Out-of-order or duplicate timestamp; no update.
            return None;
        }
        let dt_ms = sample.t_ms - prev.t_ms;
        if dt_ms < self.config.min_dt_ms {
            return None;
        }
        let dt = dt_ms as f64;

        let vx = (sample.x - prev.x) / dt;
        let vy = (sample.y - prev.y) / dt;

        let (ax, ay, jx, jy) = match self.prev_frame {
            Some(pf) => {
                let ax = (vx - pf.vx) / dt;
                let ay = (vy - pf.vy) / dt;
                let jx = (ax - pf.ax) / dt;
                let jy = (ay - pf.ay) / dt;
                (ax, ay, jx, jy)
            }
            None => (0.0, 0.0, 0.0, 0.0),
        };

        let frame = KinematicFrame {
            vx,
            vy,
            ax,
            ay,
            jx,
            jy,
            speed: (vx * vx + vy * vy).sqrt(),
            jerk: (jx * jx + jy * jy).sqrt(),
            t_ms: sample.t_ms,
        };
        self.prev_frame = Some(frame);
        Some(frame)
    }

    /// Estimate tremor power over the current sample window.
    ///
    /// Returns `None` when the window is underfilled or when net
    /// displacement sits below the stillness threshold — a motionless
    /// cursor must never be classified as tremor.
    pub fn tremor_power(&self) -> Option<f64> {
        let n = self.config.window_size;
        if self.samples.len() < n {
            return None;
        }

        // Stillness gate: bounding-box diagonal of the window.
        let (mut min_x, mut max_x) = (f64::MAX, f64::MIN);
        let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
        for s in &self.samples {
            min_x = min_x.min(s.x);
            max_x = max_x.max(s.x);
            min_y = min_y.min(s.y);
            max_y = max_y.max(s.y);
        }
        let spread = ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt();
        if spread < self.config.tremor_min_displacement_px {
            return None;
        }

        // Effective sample rate from the window span.
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let span_ms = last.t_ms.saturating_sub(first.t_ms);
        if span_ms == 0 {
            return None;
        }
        let sample_rate_hz = (n as f64 - 1.0) / (span_ms as f64 / 1000.0);
        if sample_rate_hz <= 0.0 {
            return None;
        }

        // Mean-removed signed component series. The axes transform
        // separately: rectifying to a displacement magnitude would double a
        // real tremor's frequency out of the band.
        let mean_x: f64 = self.samples.iter().map(|s| s.x).sum::<f64>() / n as f64;
        let mean_y: f64 = self.samples.iter().map(|s| s.y).sum::<f64>() / n as f64;
        let xs: Vec<f64> = self.samples.iter().map(|s| s.x - mean_x).collect();
        let ys: Vec<f64> = self.samples.iter().map(|s| s.y - mean_y).collect();

        // DFT bins restricted to the tremor band, band power summed per axis.
        let mut power = 0.0;
        let mut bins = 0u32;
        for k in 1..n / 2 {
            let freq = k as f64 * sample_rate_hz / n as f64;
            if freq < self.config.tremor_band_low_hz || freq > self.config.tremor_band_high_hz {
                continue;
            }
            let mut re_x = 0.0;
            let mut im_x = 0.0;
            let mut re_y = 0.0;
            let mut im_y = 0.0;
            for i in 0..n {
                let angle = -2.0 * PI * k as f64 * i as f64 / n as f64;
                let (sin, cos) = angle.sin_cos();
                re_x += xs[i] * cos;
                im_x += xs[i] * sin;
                re_y += ys[i] * cos;
                im_y += ys[i] * sin;
            }
            let magnitude = (re_x * re_x + im_x * im_x).sqrt()
                + (re_y * re_y + im_y * im_y).sqrt();
            power += magnitude / n as f64;
            bins += 1;
        }
        if bins == 0 {
            // Sample rate too low to resolve the band; no estimate.
            return None;
        }
        Some(power / bins as f64)
    }

    /// Drop all history (session reset).
    pub fn reset(&mut self) {
        self.samples.clear();
        self.prev_frame = None;
        self.prev_sample = None;
    }
}
