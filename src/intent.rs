//! Intent accumulator
//!
//! A single exponentially-decaying score integrates admitted emotion
//! records. Crossing a tier threshold emits one decision and locks the
//! accumulator for that tier's duration; the score keeps integrating while
//! locked, but no further decision fires until the lock expires.

use serde::{Deserialize, Serialize};

use crate::config::IntentConfig;
use crate::types::EmotionRecord;

/// Escalation tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionTier {
    MicroAssist,
    Incentive,
}

/// One tier crossing, surfaced to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDecision {
    pub tier: InterventionTier,
    /// Accumulator score at decision time, 0-100.
    pub score: f64,
    pub t_ms: u64,
}

#[derive(Debug)]
pub struct IntentAccumulator {
    config: IntentConfig,
    score: f64,
    last_update_ms: u64,
    locked_until_ms: u64,
}

impl IntentAccumulator {
    pub fn new(config: IntentConfig) -> Self {
        Self {
            config,
            score: 0.0,
            last_update_ms: 0,
            locked_until_ms: 0,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Decay the score to `now_ms`. Half-life decay keeps old evidence from
    /// dominating a quiet session.
    fn decay_to(&mut self, now_ms: u64) {
        let dt = now_ms.saturating_sub(self.last_update_ms);
        if dt > 0 && self.score > 0.0 {
            let halves = dt as f64 / self.config.half_life_ms as f64;
            self.score *= 0.5_f64.powf(halves);
        }
        self.last_update_ms = now_ms;
    }

    /// Integrate one admitted record and report a tier crossing, if any.
    pub fn observe(&mut self, record: &EmotionRecord, now_ms: u64) -> Option<IntentDecision> {
        self.decay_to(now_ms);
        let weight = self.config.emotion_weight(record.emotion);
        self.score = (self.score + weight * record.confidence / 100.0).clamp(0.0, 100.0);
        self.decide(now_ms)
    }

    /// Re-check thresholds without new evidence (tick path). Decay only.
    pub fn poll(&mut self, now_ms: u64) -> Option<IntentDecision> {
        self.decay_to(now_ms);
        self.decide(now_ms)
    }

    fn decide(&mut self, now_ms: u64) -> Option<IntentDecision> {
        if now_ms < self.locked_until_ms {
            return None;
        }
        // Highest crossed tier wins.
        let (tier, lock_ms) = if self.score >= self.config.incentive_threshold {
            (InterventionTier::Incentive, self.config.incentive_lock_ms)
        } else if self.score >= self.config.assist_threshold {
            (InterventionTier::MicroAssist, self.config.assist_lock_ms)
        } else {
            return None;
        };
        self.locked_until_ms = now_ms + lock_ms;
        Some(IntentDecision {
            tier,
            score: self.score,
            t_ms: now_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BehaviorKind, ElementContext, Emotion};

    fn record(emotion: Emotion, confidence: f64, t_ms: u64) -> EmotionRecord {
        EmotionRecord {
            behavior: BehaviorKind::Hover,
            emotion,
            confidence,
            t_ms,
            context: ElementContext::default(),
        }
    }

    fn accumulator() -> IntentAccumulator {
        IntentAccumulator::new(IntentConfig::default())
    }

    #[test]
    fn test_score_accumulates_weighted_confidence() {
        let mut acc = accumulator();
        acc.observe(&record(Emotion::PurchaseIntent, 100.0, 1_000), 1_000);
        // Weight 18 at full confidence
        assert!((acc.score() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_life_decay() {
        let mut acc = accumulator();
        acc.observe(&record(Emotion::PurchaseIntent, 100.0, 0), 0);
        let before = acc.score();
        acc.poll(15_000);
        assert!((acc.score() - before / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_assist_tier_fires_once_per_lock() {
        let mut acc = accumulator();
        // Three high-weight records in quick succession push past 45
        let mut decision = None;
        for i in 0..3u64 {
            let t = 1_000 + i * 500;
            if let Some(d) = acc.observe(&record(Emotion::PurchaseIntent, 95.0, t), t) {
                decision = Some(d);
            }
        }
        let d = decision.expect("assist decision expected");
        assert_eq!(d.tier, InterventionTier::MicroAssist);

        // Still above the threshold, but locked for 8s
        assert!(acc
            .observe(&record(Emotion::PurchaseIntent, 95.0, 3_000), 3_000)
            .is_none());
    }

    #[test]
    fn test_incentive_tier_preferred_when_crossed() {
        let config = IntentConfig {
            assist_lock_ms: 0,
            ..IntentConfig::default()
        };
        let mut acc = IntentAccumulator::new(config);
        let mut last = None;
        for i in 0..8u64 {
            let t = 1_000 + i * 200;
            if let Some(d) = acc.observe(&record(Emotion::PurchaseIntent, 95.0, t), t) {
                last = Some(d);
            }
        }
        assert_eq!(last.unwrap().tier, InterventionTier::Incentive);
    }

    #[test]
    fn test_negative_weight_suppresses() {
        let mut acc = accumulator();
        acc.observe(&record(Emotion::PurchaseIntent, 100.0, 0), 0);
        let before = acc.score();
        // Engagement carries a negative weight: calm browsing drains intent
        acc.observe(&record(Emotion::Engagement, 100.0, 1), 1);
        assert!(acc.score() < before);
    }

    #[test]
    fn test_score_clamped_to_100() {
        let mut acc = accumulator();
        for i in 0..50u64 {
            acc.observe(&record(Emotion::PurchaseIntent, 100.0, i), i);
        }
        assert!(acc.score() <= 100.0);
    }

    #[test]
    fn test_lock_expiry_allows_next_decision() {
        let mut acc = accumulator();
        for i in 0..3u64 {
            let t = 1_000 + i * 500;
            acc.observe(&record(Emotion::PurchaseIntent, 95.0, t), t);
        }
        // Locked now; feed more evidence after the 8s assist lock
        let d = acc.observe(&record(Emotion::PriceShock, 95.0, 11_000), 11_000);
        assert!(d.is_some());
    }

    #[test]
    fn test_quiet_session_never_decides() {
        let mut acc = accumulator();
        assert!(acc.poll(60_000).is_none());
        assert_eq!(acc.score(), 0.0);
    }
}
