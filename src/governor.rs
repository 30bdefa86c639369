//! Emission governor
//!
//! Dual-key rate limiting over the record stream: a per-behavior cooldown
//! and a per-emotion cooldown must both have elapsed, and the adjusted
//! confidence must clear the floor. Admission stamps both cooldowns.

use std::collections::HashMap;

use crate::config::CooldownConfig;
use crate::types::{BehaviorKind, Emotion, EmotionRecord};

#[derive(Debug)]
pub struct CooldownGovernor {
    config: CooldownConfig,
    behavior_last_ms: HashMap<BehaviorKind, u64>,
    emotion_last_ms: HashMap<Emotion, u64>,
}

impl CooldownGovernor {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            behavior_last_ms: HashMap::new(),
            emotion_last_ms: HashMap::new(),
        }
    }

    /// Admit or reject one record. Rejection leaves both cooldowns untouched.
    pub fn admit(&mut self, record: &EmotionRecord, now_ms: u64) -> bool {
        if record.confidence <= self.config.confidence_floor {
            return false;
        }
        let behavior_window = self.config.behavior_window_ms(record.behavior);
        if let Some(&last) = self.behavior_last_ms.get(&record.behavior) {
            if now_ms.saturating_sub(last) < behavior_window {
                return false;
            }
        }
        if let Some(&last) = self.emotion_last_ms.get(&record.emotion) {
            if now_ms.saturating_sub(last) < self.config.emotion_window_ms {
                return false;
            }
        }
        self.behavior_last_ms.insert(record.behavior, now_ms);
        self.emotion_last_ms.insert(record.emotion, now_ms);
        true
    }
}
