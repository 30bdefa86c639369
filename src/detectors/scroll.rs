//! Scroll-pattern detection
//!
//! Tracks signed scroll velocity over a sliding window. Repeated direction
//! changes read as hunting, a single change as a reversal, and a steady
//! direction falls into speed bands from slow reading to skimming.

use std::collections::VecDeque;

use crate::config::ScrollConfig;
use crate::types::{BehaviorKind, BehaviorOccurrence, Point};

#[derive(Debug, Clone, Copy)]
struct ScrollSample {
    /// Signed velocity in px/ms; sign follows delta_y.
    velocity: f64,
    t_ms: u64,
}

/// Scroll detector. Owns its velocity window exclusively.
#[derive(Debug)]
pub struct ScrollDetector {
    config: ScrollConfig,
    window: VecDeque<ScrollSample>,
    last_scroll: Option<(f64, u64)>,
    last_point: Option<Point>,
}

impl ScrollDetector {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            window: VecDeque::new(),
            last_scroll: None,
            last_point: None,
        }
    }

    pub fn on_scroll(&mut self, delta_y: f64, point: Option<Point>, t_ms: u64) {
        if let Some(p) = point {
            self.last_point = Some(p);
        }
        if let Some((_, prev_t)) = self.last_scroll {
            let dt = t_ms.saturating_sub(prev_t);
            if dt > 0 {
                self.window.push_back(ScrollSample {
                    velocity: delta_y / dt as f64,
                    t_ms,
                });
            }
        }
        self.last_scroll = Some((delta_y, t_ms));

        let horizon = t_ms.saturating_sub(self.config.window_ms);
        while self
            .window
            .front()
            .map(|s| s.t_ms < horizon)
            .unwrap_or(false)
        {
            self.window.pop_front();
        }
    }

    pub fn evaluate(&mut self, now_ms: u64) -> Option<BehaviorOccurrence> {
        // Stale window: the gesture ended, nothing to classify.
        let newest = self.window.back()?;
        if now_ms.saturating_sub(newest.t_ms) > self.config.window_ms {
            self.window.clear();
            return None;
        }
        if self.window.len() < 2 {
            return None;
        }

        let mut changes = 0u32;
        let mut last_sign = 0i8;
        for s in &self.window {
            let sign = if s.velocity > 0.0 {
                1
            } else if s.velocity < 0.0 {
                -1
            } else {
                continue;
            };
            if last_sign != 0 && sign != last_sign {
                changes += 1;
            }
            last_sign = sign;
        }

        let t_ms = newest.t_ms;
        let occ = if changes >= self.config.hunt_min_changes {
            let confidence = (60.0 + 8.0 * changes as f64).min(88.0);
            BehaviorOccurrence::new(BehaviorKind::ScrollHunt, confidence, t_ms)
        } else if changes == 1 {
            BehaviorOccurrence::new(BehaviorKind::ScrollReversal, 60.0, t_ms)
        } else {
            let mean_speed: f64 = self.window.iter().map(|s| s.velocity.abs()).sum::<f64>()
                / self.window.len() as f64;
            if mean_speed < self.config.slow_max {
                BehaviorOccurrence::new(BehaviorKind::ScrollSlow, 58.0, t_ms)
            } else if mean_speed < self.config.normal_max {
                BehaviorOccurrence::new(BehaviorKind::ScrollNormal, 55.0, t_ms)
            } else if mean_speed < self.config.fast_max {
                BehaviorOccurrence::new(BehaviorKind::ScrollFast, 50.0, t_ms)
            } else {
                BehaviorOccurrence::new(BehaviorKind::ScrollSkim, 45.0, t_ms)
            }
        };

        // Evidence consumed; the next gesture classifies fresh.
        self.window.clear();
        let point = self.last_point;
        Some(match point {
            Some(p) => occ.at_point(p),
            None => occ,
        })
    }
}
