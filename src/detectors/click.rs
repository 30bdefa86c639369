//! Click-cluster detection
//!
//! Clusters clicks in time and space: three or more clustered clicks read as
//! rage-clicking, exactly two in a short window as a double-click, and a
//! settled singleton as a plain click.

use std::collections::VecDeque;

use crate::config::ClickConfig;
use crate::types::{BehaviorKind, BehaviorOccurrence, ElementFacts, Point};

const HISTORY_CAP: usize = 16;

#[derive(Debug, Clone)]
struct ClickSample {
    point: Point,
    t_ms: u64,
    target: Option<ElementFacts>,
}

/// Stateful click detector. Owns its click history exclusively.
#[derive(Debug)]
pub struct ClickDetector {
    config: ClickConfig,
    clicks: VecDeque<ClickSample>,
    /// Timestamp of the newest click already attributed to an emission;
    /// prevents a cluster from re-reporting every cadence tick.
    consumed_until_ms: u64,
}

impl ClickDetector {
    pub fn new(config: ClickConfig) -> Self {
        Self {
            config,
            clicks: VecDeque::with_capacity(HISTORY_CAP),
            consumed_until_ms: 0,
        }
    }

    pub fn on_click(&mut self, point: Point, t_ms: u64, target: Option<ElementFacts>) {
        self.clicks.push_back(ClickSample { point, t_ms, target });
        while self.clicks.len() > HISTORY_CAP {
            self.clicks.pop_front();
        }
    }

    /// Evaluate the current cluster. Pure over the detector's own history.
    pub fn evaluate(&mut self, now_ms: u64) -> Option<BehaviorOccurrence> {
        let newest = self.clicks.back()?.clone();
        if newest.t_ms <= self.consumed_until_ms {
            return None;
        }

        // Cluster: clicks within the window of the newest one and inside
        // the spatial radius around it.
        let cluster: Vec<&ClickSample> = self
            .clicks
            .iter()
            .filter(|c| {
                newest.t_ms.saturating_sub(c.t_ms) <= self.config.cluster_window_ms
                    && c.point.distance_to(&newest.point) <= self.config.cluster_radius_px
            })
            .collect();

        let occurrence = match cluster.len() {
            n if n >= 3 => {
                // Confidence scales with cluster size, capped.
                let confidence = (60.0 + 10.0 * n as f64).min(95.0);
                Some(BehaviorOccurrence::new(BehaviorKind::RageClick, confidence, newest.t_ms))
            }
            2 => {
                let gap = newest.t_ms.saturating_sub(cluster[0].t_ms);
                if gap <= self.config.double_click_window_ms {
                    Some(BehaviorOccurrence::new(BehaviorKind::DoubleClick, 65.0, newest.t_ms))
                } else {
                    singleton(&newest, now_ms, self.config.double_click_window_ms)
                }
            }
            1 => singleton(&newest, now_ms, self.config.double_click_window_ms),
            _ => None,
        }?;

        self.consumed_until_ms = newest.t_ms;
        Some(
            occurrence
                .at_point(newest.point)
                .with_target(newest.target.clone()),
        )
    }
}

/// A lone click only reads as a single-click once the double-click window
/// has passed without a companion.
fn singleton(click: &ClickSample, now_ms: u64, double_window_ms: u64) -> Option<BehaviorOccurrence> {
    if now_ms.saturating_sub(click.t_ms) < double_window_ms {
        return None;
    }
    Some(BehaviorOccurrence::new(BehaviorKind::SingleClick, 55.0, click.t_ms))
}
