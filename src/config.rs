//! Engine configuration
//!
//! Every numeric threshold, cooldown window and decay constant in the
//! pipeline lives here, injected at construction. Tuning never requires
//! touching classifier logic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{BehaviorKind, Emotion};

/// Host-supplied initialization options. Absent values fall back to
/// generated/demo defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitOptions {
    /// API key attached to HTTP fallback requests when present.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Tenant identifier; defaults to "demo".
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Raises engine-side log verbosity.
    #[serde(default)]
    pub debug: bool,
    /// Session id override; a UUID v4 is generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Page URL stamped onto outbound events.
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Capture-layer throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Minimum gap between accepted pointer-move samples (ms). 25ms ≈ 40Hz.
    pub pointer_min_gap_ms: u64,
    /// Minimum gap between accepted scroll samples (ms). 100ms ≈ 10Hz.
    pub scroll_min_gap_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pointer_min_gap_ms: 25,
            scroll_min_gap_ms: 100,
        }
    }
}

/// Kinematics and tremor analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Sample ring capacity. Power of two; the tremor DFT consumes the
    /// full window.
    pub window_size: usize,
    /// Δt below this is treated as "no update" (guards divide-by-zero).
    pub min_dt_ms: u64,
    /// Tremor evaluation cadence (ms).
    pub tremor_interval_ms: u64,
    /// Tremor band lower edge (Hz). Human physiological tremor sits near
    /// 8-12 Hz.
    pub tremor_band_low_hz: f64,
    /// Tremor band upper edge (Hz).
    pub tremor_band_high_hz: f64,
    /// Minimum net displacement (px) across the window for tremor analysis
    /// to run at all. Stillness must never read as tremor.
    pub tremor_min_displacement_px: f64,
    /// Band power above this emits a tremor behavior occurrence.
    pub tremor_power_threshold: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            window_size: 32,
            min_dt_ms: 1,
            tremor_interval_ms: 250,
            tremor_band_low_hz: 8.0,
            tremor_band_high_hz: 12.0,
            tremor_min_displacement_px: 4.0,
            tremor_power_threshold: 9.0,
        }
    }
}

/// Click-cluster detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    /// Cluster time window (ms).
    pub cluster_window_ms: u64,
    /// Cluster spatial radius (px).
    pub cluster_radius_px: f64,
    /// Double-click window (ms).
    pub double_click_window_ms: u64,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            cluster_window_ms: 1000,
            cluster_radius_px: 50.0,
            double_click_window_ms: 500,
        }
    }
}

/// Pointer-movement detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Trailing window for direction-reversal counting (ms).
    pub shake_window_ms: u64,
    /// Reversals at or above this count ⇒ shake.
    pub shake_min_reversals: u32,
    /// Reversals only count at or above this speed (px/ms).
    pub shake_min_speed: f64,
    /// Top-edge band for exit intent (px from viewport top).
    pub exit_edge_px: f64,
    /// Minimum upward speed for exit intent (px/ms; vy more negative
    /// than -threshold).
    pub exit_min_speed: f64,
    /// Debounce between exit-intent emissions (ms).
    pub exit_debounce_ms: u64,
    /// Speed below this counts as dwelling (px/ms).
    pub hover_max_speed: f64,
    /// Dwell radius (px) within which the pointer is "over the same spot".
    pub dwell_radius_px: f64,
    /// Dwell duration for hover (ms).
    pub hover_dwell_ms: u64,
    /// Dwell duration for hesitation (ms).
    pub hesitation_dwell_ms: u64,
    /// Minimum net displacement for drift/scan fallback (px). Guards
    /// against classifying sub-pixel jitter as a gesture.
    pub min_gesture_displacement_px: f64,
    /// Speed below this (and moving) ⇒ drift (px/ms).
    pub drift_max_speed: f64,
    /// Speed below this (and above drift) ⇒ scan (px/ms).
    pub scan_max_speed: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            shake_window_ms: 1500,
            shake_min_reversals: 3,
            shake_min_speed: 0.3,
            exit_edge_px: 50.0,
            exit_min_speed: 0.5,
            exit_debounce_ms: 3000,
            hover_max_speed: 0.08,
            dwell_radius_px: 10.0,
            hover_dwell_ms: 800,
            hesitation_dwell_ms: 3000,
            min_gesture_displacement_px: 24.0,
            drift_max_speed: 0.15,
            scan_max_speed: 0.6,
        }
    }
}

/// Scroll-pattern detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Trailing window for sign-change counting (ms).
    pub window_ms: u64,
    /// Sign changes at or above this count ⇒ scroll-hunt.
    pub hunt_min_changes: u32,
    /// Velocity bands (px/ms): below slow ⇒ slow, below normal ⇒ normal,
    /// below fast ⇒ fast, else skim.
    pub slow_max: f64,
    pub normal_max: f64,
    pub fast_max: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            window_ms: 3000,
            hunt_min_changes: 3,
            slow_max: 0.2,
            normal_max: 1.0,
            fast_max: 2.5,
        }
    }
}

/// Idle and off-canvas banding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Idle-short threshold (ms).
    pub short_ms: u64,
    /// Idle-long threshold (ms).
    pub long_ms: u64,
    /// Abandoned threshold (ms).
    pub abandoned_ms: u64,
    /// Off-canvas distraction threshold (ms).
    pub offcanvas_distraction_ms: u64,
    /// Off-canvas abandonment-risk threshold (ms).
    pub offcanvas_risk_ms: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            short_ms: 10_000,
            long_ms: 30_000,
            abandoned_ms: 60_000,
            offcanvas_distraction_ms: 2_000,
            offcanvas_risk_ms: 8_000,
        }
    }
}

/// Cooldown governor windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Confidence floor; records at or below this are discarded.
    pub confidence_floor: f64,
    /// Uniform per-emotion window (ms).
    pub emotion_window_ms: u64,
    /// Default per-behavior window (ms) when no override applies.
    pub behavior_default_ms: u64,
    /// Per-behavior re-emission windows. Rapid/noisy behaviors get short
    /// windows; severe ones get long windows. Kinds absent from the table
    /// fall back to the default window.
    pub behavior_windows: HashMap<BehaviorKind, u64>,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        let behavior_windows = HashMap::from([
            (BehaviorKind::Hover, 2_000),
            (BehaviorKind::Drift, 2_000),
            (BehaviorKind::Scan, 2_000),
            (BehaviorKind::ScrollSlow, 3_000),
            (BehaviorKind::ScrollNormal, 3_000),
            (BehaviorKind::ScrollFast, 3_000),
            (BehaviorKind::ScrollSkim, 3_000),
            (BehaviorKind::SingleClick, 3_000),
            (BehaviorKind::Hesitation, 5_000),
            (BehaviorKind::Shake, 6_000),
            (BehaviorKind::RageClick, 8_000),
            (BehaviorKind::ExitIntent, 10_000),
            (BehaviorKind::Abandoned, 15_000),
        ]);
        Self {
            confidence_floor: 50.0,
            emotion_window_ms: 10_000,
            behavior_default_ms: 4_000,
            behavior_windows,
        }
    }
}

impl CooldownConfig {
    /// Re-emission window for one behavior kind.
    pub fn behavior_window_ms(&self, kind: BehaviorKind) -> u64 {
        self.behavior_windows
            .get(&kind)
            .copied()
            .unwrap_or(self.behavior_default_ms)
    }
}

/// Intent accumulator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Decay half-life (ms); the score halves this often with no input.
    pub half_life_ms: u64,
    /// Micro-assist tier threshold (score 0-100).
    pub assist_threshold: f64,
    /// Micro-assist lock window (ms).
    pub assist_lock_ms: u64,
    /// Incentive tier threshold (score 0-100).
    pub incentive_threshold: f64,
    /// Incentive lock window (ms).
    pub incentive_lock_ms: u64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            half_life_ms: 15_000,
            assist_threshold: 45.0,
            assist_lock_ms: 8_000,
            incentive_threshold: 70.0,
            incentive_lock_ms: 15_000,
        }
    }
}

impl IntentConfig {
    /// Signed score delta contributed by an emotion, before confidence
    /// scaling. Calm engagement pulls the score down; everything that
    /// warrants intervention pushes it up.
    pub fn emotion_weight(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::PurchaseIntent => 18.0,
            Emotion::PriceShock => 14.0,
            Emotion::AbandonmentIntent => 14.0,
            Emotion::Frustration => 12.0,
            Emotion::ExitRisk => 12.0,
            Emotion::Anxiety => 10.0,
            Emotion::Confusion => 8.0,
            Emotion::Hesitation => 8.0,
            Emotion::Interest => 6.0,
            Emotion::Curiosity => 2.0,
            Emotion::Engagement => -3.0,
        }
    }
}

/// Transport batching and reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Queue capacity; oldest entries drop on overflow.
    pub queue_capacity: usize,
    /// Flush when the queue reaches this size.
    pub batch_size: usize,
    /// Flush at least this often while events are queued (ms).
    pub flush_interval_ms: u64,
    /// Base reconnect backoff (ms), doubling per attempt.
    pub backoff_base_ms: u64,
    /// Backoff ceiling (ms).
    pub backoff_max_ms: u64,
    /// Reconnect attempts before permanent HTTP fallback.
    pub max_reconnect_attempts: u32,
    /// Ping cadence on the intervention channel (ms).
    pub ping_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 50,
            batch_size: 10,
            flush_interval_ms: 5_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            max_reconnect_attempts: 5,
            ping_interval_ms: 30_000,
        }
    }
}

/// Classifier cadence and history bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detector bank cadence (ms).
    pub classify_interval_ms: u64,
    /// Trailing behavior history bound.
    pub behavior_history_len: usize,
    /// Trailing emotion history bound.
    pub emotion_history_len: usize,
    /// Window for the AFTER_FRUSTRATION sticky effect (ms).
    pub sequence_window_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classify_interval_ms: 1_000,
            behavior_history_len: 100,
            emotion_history_len: 50,
            sequence_window_ms: 5_000,
        }
    }
}

/// The complete, injected configuration table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub options: InitOptions,
    pub capture: CaptureConfig,
    pub kinematics: KinematicsConfig,
    pub click: ClickConfig,
    pub movement: MovementConfig,
    pub scroll: ScrollConfig,
    pub idle: IdleConfig,
    pub cooldown: CooldownConfig,
    pub intent: IntentConfig,
    pub transport: TransportConfig,
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    /// Parse a sparse JSON configuration; unspecified fields keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::ConfigError(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that would break pipeline invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.kinematics.window_size.is_power_of_two() {
            return Err(EngineError::ConfigError(
                "kinematics.window_size must be a power of two".to_string(),
            ));
        }
        if self.kinematics.tremor_band_low_hz >= self.kinematics.tremor_band_high_hz {
            return Err(EngineError::ConfigError(
                "tremor band low edge must sit below the high edge".to_string(),
            ));
        }
        if self.intent.assist_threshold >= self.intent.incentive_threshold {
            return Err(EngineError::ConfigError(
                "assist threshold must sit below the incentive threshold".to_string(),
            ));
        }
        if self.transport.batch_size == 0 || self.transport.queue_capacity == 0 {
            return Err(EngineError::ConfigError(
                "transport queue and batch sizes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
