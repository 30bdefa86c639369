//! Core data types
//!
//! This module defines the types that flow through the behavioral pipeline:
//! raw input events, kinematic frames, behavior occurrences, element context
//! and emotion records.

use serde::{Deserialize, Serialize};

/// A 2D point in page coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A raw pointer position at a monotonic time. Lives only in bounded
/// history buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Monotonic milliseconds, host-supplied.
    pub t_ms: u64,
}

impl Sample {
    pub fn new(x: f64, y: f64, t_ms: u64) -> Self {
        Self { x, y, t_ms }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Derivatives of two consecutive samples. Owned transiently by the
/// kinematics processor and consumed immediately; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicFrame {
    /// Velocity in px/ms.
    pub vx: f64,
    pub vy: f64,
    /// Acceleration in px/ms².
    pub ax: f64,
    pub ay: f64,
    /// Jerk in px/ms³.
    pub jx: f64,
    pub jy: f64,
    /// Velocity magnitude in px/ms.
    pub speed: f64,
    /// Jerk magnitude in px/ms³.
    pub jerk: f64,
    pub t_ms: u64,
}

/// Discrete, named behavior patterns detected from raw input kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    RageClick,
    DoubleClick,
    SingleClick,
    Shake,
    ExitIntent,
    Hover,
    Hesitation,
    Drift,
    Scan,
    Tremor,
    ScrollHunt,
    ScrollReversal,
    ScrollSlow,
    ScrollNormal,
    ScrollFast,
    ScrollSkim,
    IdleShort,
    IdleLong,
    Abandoned,
    Distraction,
    AbandonmentRisk,
}

/// A detected behavior with a raw confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorOccurrence {
    pub kind: BehaviorKind,
    /// Raw detector confidence, 0-100.
    pub confidence: f64,
    /// The implicated page point, when the detector has one.
    pub point: Option<Point>,
    /// Facts about the implicated DOM element, when known at detection time.
    pub target: Option<ElementFacts>,
    pub t_ms: u64,
}

impl BehaviorOccurrence {
    pub fn new(kind: BehaviorKind, confidence: f64, t_ms: u64) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 100.0),
            point: None,
            target: None,
            t_ms,
        }
    }

    pub fn at_point(mut self, point: Point) -> Self {
        self.point = Some(point);
        self
    }

    pub fn with_target(mut self, target: Option<ElementFacts>) -> Self {
        self.target = target;
        self
    }
}

/// Inferred affective labels attached to behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Frustration,
    Confusion,
    Interest,
    Engagement,
    Curiosity,
    Hesitation,
    Anxiety,
    PurchaseIntent,
    PriceShock,
    AbandonmentIntent,
    ExitRisk,
}

impl Emotion {
    /// Negative emotions carry the AFTER_FRUSTRATION sticky effect and
    /// receive the sequence-tag confidence delta.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Emotion::Frustration
                | Emotion::Confusion
                | Emotion::Anxiety
                | Emotion::Hesitation
                | Emotion::PriceShock
                | Emotion::AbandonmentIntent
                | Emotion::ExitRisk
        )
    }
}

/// Semantic role of the DOM element implicated in a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    Price,
    Cta,
    Navigation,
    Form,
}

/// Temporal-sequence tag derived from the trailing emotion history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceTag {
    AfterFrustration,
    AfterSuccess,
}

/// Context assigned to a behavior occurrence. Computed fresh per occurrence;
/// no identity beyond the current classification.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ElementRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_tag: Option<SequenceTag>,
}

/// Read-only facts about a DOM element, captured by the host. The engine
/// never touches the DOM itself; role resolution is a pure function of
/// these facts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementFacts {
    /// Lowercase tag name ("button", "a", "input", ...).
    #[serde(default)]
    pub tag: String,
    /// Class attribute tokens, lowercased.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Visible text content, truncated by the host.
    #[serde(default)]
    pub text: String,
    /// Whether a form element is among the ancestors.
    #[serde(default)]
    pub in_form: bool,
    /// Whether a navigation landmark is among the ancestors.
    #[serde(default)]
    pub in_nav: bool,
}

/// The unit of pipeline output: an emotion hypothesis bound to the behavior
/// that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub behavior: BehaviorKind,
    pub emotion: Emotion,
    /// Adjusted confidence, 0-95 after all modifiers.
    pub confidence: f64,
    pub t_ms: u64,
    pub context: ElementContext,
}

/// Identity attached to every outbound event. Generated once per page
/// session and immutable for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub tenant_id: String,
    pub page_url: String,
}

/// A normalized DOM event as delivered by the host capture shim.
///
/// Timestamps travel separately (see [`RawEvent`]); the engine trusts the
/// host's monotonic clock and never reads wall time for pipeline decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ElementFacts>,
    },
    PointerLeave,
    PointerEnter,
    Click {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ElementFacts>,
    },
    Scroll {
        delta_y: f64,
        /// Host-synthesized probe point (typically viewport center).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        point: Option<Point>,
    },
    FocusIn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ElementFacts>,
    },
    FocusOut,
    Visibility {
        hidden: bool,
    },
    TextSelection,
}

/// An input event paired with its monotonic timestamp, as it crosses the
/// FFI/JSON boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub t_ms: u64,
    #[serde(flatten)]
    pub event: InputEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_behavior_kind_serialization() {
        let kind = BehaviorKind::RageClick;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, "\"rage_click\"");

        let parsed: BehaviorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, BehaviorKind::RageClick);
    }

    #[test]
    fn test_emotion_serialization() {
        let emotion = Emotion::PurchaseIntent;
        let json = serde_json::to_string(&emotion).unwrap();
        assert_eq!(json, "\"purchase_intent\"");
    }

    #[test]
    fn test_negative_emotion_partition() {
        assert!(Emotion::Frustration.is_negative());
        assert!(Emotion::PriceShock.is_negative());
        assert!(!Emotion::Engagement.is_negative());
        assert!(!Emotion::PurchaseIntent.is_negative());
    }

    #[test]
    fn test_raw_event_deserialization() {
        let json = r#"{
            "t_ms": 1200,
            "kind": "pointer_move",
            "x": 100.0,
            "y": 240.5
        }"#;

        let raw: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(raw.t_ms, 1200);
        assert_eq!(
            raw.event,
            InputEvent::PointerMove {
                x: 100.0,
                y: 240.5,
                target: None
            }
        );
    }

    #[test]
    fn test_click_event_with_target() {
        let json = r#"{
            "t_ms": 500,
            "kind": "click",
            "x": 10.0,
            "y": 20.0,
            "target": {
                "tag": "button",
                "classes": ["buy-now"],
                "text": "Buy Now"
            }
        }"#;

        let raw: RawEvent = serde_json::from_str(json).unwrap();
        match raw.event {
            InputEvent::Click { target, .. } => {
                let facts = target.unwrap();
                assert_eq!(facts.tag, "button");
                assert!(!facts.in_form);
            }
            other => panic!("expected click, got {other:?}"),
        }
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_occurrence_confidence_clamped() {
        let occ = BehaviorOccurrence::new(BehaviorKind::RageClick, 140.0, 0);
        assert_eq!(occ.confidence, 100.0);
    }
}
