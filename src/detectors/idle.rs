//! Idle and off-canvas detection
//!
//! Measures inactivity against the capture layer's idle anchor and escalates
//! through short idle, long idle and abandonment. A pointer parked outside
//! the viewport escalates separately from distraction to abandonment risk.
//! Both detectors stay silent while the tab is hidden.

use crate::config::IdleConfig;
use crate::types::{BehaviorKind, BehaviorOccurrence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IdleBand {
    Short,
    Long,
    Abandoned,
}

/// Idle detector. Stateless over input except the escalation memory.
#[derive(Debug)]
pub struct IdleDetector {
    config: IdleConfig,
    /// Anchor and band of the last emission; an escalation for the same
    /// anchor emits once per band.
    emitted: Option<(u64, IdleBand)>,
    offcanvas_emitted: Option<(u64, IdleBand)>,
}

impl IdleDetector {
    pub fn new(config: IdleConfig) -> Self {
        Self {
            config,
            emitted: None,
            offcanvas_emitted: None,
        }
    }

    pub fn evaluate(
        &mut self,
        now_ms: u64,
        idle_anchor_ms: u64,
        offcanvas_since_ms: Option<u64>,
        suspended: bool,
    ) -> Vec<BehaviorOccurrence> {
        if suspended {
            return Vec::new();
        }
        let mut out = Vec::new();

        let idle_ms = now_ms.saturating_sub(idle_anchor_ms);
        let band = if idle_ms >= self.config.abandoned_ms {
            Some((IdleBand::Abandoned, BehaviorKind::Abandoned, 85.0))
        } else if idle_ms >= self.config.long_ms {
            Some((IdleBand::Long, BehaviorKind::IdleLong, 70.0))
        } else if idle_ms >= self.config.short_ms {
            Some((IdleBand::Short, BehaviorKind::IdleShort, 55.0))
        } else {
            None
        };
        if let Some((band, kind, confidence)) = band {
            if self.should_emit(idle_anchor_ms, band) {
                self.emitted = Some((idle_anchor_ms, band));
                out.push(BehaviorOccurrence::new(kind, confidence, now_ms));
            }
        }

        if let Some(since) = offcanvas_since_ms {
            let away_ms = now_ms.saturating_sub(since);
            let band = if away_ms >= self.config.offcanvas_risk_ms {
                Some((IdleBand::Long, BehaviorKind::AbandonmentRisk, 80.0))
            } else if away_ms >= self.config.offcanvas_distraction_ms {
                Some((IdleBand::Short, BehaviorKind::Distraction, 60.0))
            } else {
                None
            };
            if let Some((band, kind, confidence)) = band {
                let fresh = match self.offcanvas_emitted {
                    Some((anchor, prev)) => anchor != since || band > prev,
                    None => true,
                };
                if fresh {
                    self.offcanvas_emitted = Some((since, band));
                    out.push(BehaviorOccurrence::new(kind, confidence, now_ms));
                }
            }
        }

        out
    }

    fn should_emit(&self, anchor_ms: u64, band: IdleBand) -> bool {
        match self.emitted {
            Some((prev_anchor, prev_band)) => prev_anchor != anchor_ms || band > prev_band,
            None => true,
        }
    }
}
