//! Intervention directives and overlay lifecycle
//!
//! Server-pushed directives become overlays that move through a strict
//! lifecycle: scheduled, shown, then exactly one terminal outcome. Terminal
//! transitions are first-writer-wins, so a click racing an expiry reports
//! once. At most one live overlay exists per intervention kind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Known intervention kinds the host can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    DiscountModal,
    TrustBadges,
    UrgencyBanner,
    SocialToast,
    HelpChat,
    ValueHighlight,
    ComparisonModal,
    ExitIntent,
}

/// Presentation archetype the host maps to its own components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayArchetype {
    Modal,
    Banner,
    Toast,
    Tooltip,
}

impl InterventionKind {
    pub fn archetype(&self) -> OverlayArchetype {
        match self {
            InterventionKind::DiscountModal
            | InterventionKind::ComparisonModal
            | InterventionKind::ExitIntent => OverlayArchetype::Modal,
            InterventionKind::TrustBadges | InterventionKind::UrgencyBanner => {
                OverlayArchetype::Banner
            }
            InterventionKind::SocialToast | InterventionKind::HelpChat => OverlayArchetype::Toast,
            InterventionKind::ValueHighlight => OverlayArchetype::Tooltip,
        }
    }
}

/// Display timing attached to a directive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default)]
    pub delay_ms: u64,
    /// Auto-expiry after showing; `None` waits for user action.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Persistent overlays ignore duration and survive until acted on.
    #[serde(default)]
    pub persistent: bool,
}

/// A validated server directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub kind: InterventionKind,
    pub content: serde_json::Value,
    pub timing: Timing,
    pub correlation_id: String,
}

impl Directive {
    /// Parse the raw intervention type string from the channel.
    pub fn parse_kind(raw: &str) -> Result<InterventionKind, EngineError> {
        serde_json::from_value(serde_json::Value::String(raw.to_string()))
            .map_err(|_| EngineError::DirectiveError(format!("unknown intervention type: {raw}")))
    }
}

/// Terminal outcome of one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Clicked,
    Dismissed,
    Expired,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Clicked => "clicked",
            Outcome::Dismissed => "dismissed",
            Outcome::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OverlayPhase {
    Scheduled { show_at_ms: u64 },
    Shown { expire_at_ms: Option<u64> },
    Terminal(Outcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: String,
    pub directive: Directive,
    phase: OverlayPhase,
}

impl Overlay {
    fn live(&self) -> bool {
        !matches!(self.phase, OverlayPhase::Terminal(_))
    }
}

/// Lifecycle events the engine converts into host actions and channel
/// acknowledgements.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    Show {
        overlay_id: String,
        directive: Directive,
    },
    Remove {
        overlay_id: String,
        correlation_id: String,
        outcome: Outcome,
    },
}

#[derive(Debug, Default)]
pub struct OverlayManager {
    overlays: Vec<Overlay>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one directive. A live overlay of the same kind wins; the new
    /// directive is discarded, never queued.
    pub fn schedule(&mut self, directive: Directive, now_ms: u64) -> Option<String> {
        if self
            .overlays
            .iter()
            .any(|o| o.live() && o.directive.kind == directive.kind)
        {
            log::debug!(
                "discarding {:?} directive, one is already live",
                directive.kind
            );
            return None;
        }
        let id = Uuid::new_v4().to_string();
        let show_at_ms = now_ms + directive.timing.delay_ms;
        self.overlays.push(Overlay {
            id: id.clone(),
            directive,
            phase: OverlayPhase::Scheduled { show_at_ms },
        });
        Some(id)
    }

    /// Advance due show/expire transitions.
    pub fn tick(&mut self, now_ms: u64) -> Vec<OverlayEvent> {
        let mut events = Vec::new();
        for overlay in &mut self.overlays {
            match overlay.phase {
                OverlayPhase::Scheduled { show_at_ms } if now_ms >= show_at_ms => {
                    let timing = overlay.directive.timing;
                    let expire_at_ms = if timing.persistent {
                        None
                    } else {
                        timing.duration_ms.map(|d| now_ms + d)
                    };
                    overlay.phase = OverlayPhase::Shown { expire_at_ms };
                    events.push(OverlayEvent::Show {
                        overlay_id: overlay.id.clone(),
                        directive: overlay.directive.clone(),
                    });
                }
                OverlayPhase::Shown {
                    expire_at_ms: Some(expire_at_ms),
                } if now_ms >= expire_at_ms => {
                    overlay.phase = OverlayPhase::Terminal(Outcome::Expired);
                    events.push(OverlayEvent::Remove {
                        overlay_id: overlay.id.clone(),
                        correlation_id: overlay.directive.correlation_id.clone(),
                        outcome: Outcome::Expired,
                    });
                }
                _ => {}
            }
        }
        self.overlays.retain(Overlay::live);
        events
    }

    /// Host callback: the user clicked the overlay. Idempotent.
    pub fn clicked(&mut self, overlay_id: &str) -> Option<OverlayEvent> {
        self.terminate(overlay_id, Outcome::Clicked)
    }

    /// Host callback: the user dismissed the overlay. Idempotent.
    pub fn dismissed(&mut self, overlay_id: &str) -> Option<OverlayEvent> {
        self.terminate(overlay_id, Outcome::Dismissed)
    }

    /// First terminal transition wins; anything after is a no-op.
    fn terminate(&mut self, overlay_id: &str, outcome: Outcome) -> Option<OverlayEvent> {
        let overlay = self.overlays.iter_mut().find(|o| o.id == overlay_id)?;
        if !overlay.live() {
            return None;
        }
        overlay.phase = OverlayPhase::Terminal(outcome);
        let event = OverlayEvent::Remove {
            overlay_id: overlay.id.clone(),
            correlation_id: overlay.directive.correlation_id.clone(),
            outcome,
        };
        self.overlays.retain(Overlay::live);
        Some(event)
    }

    /// Live overlay ids, oldest first.
    pub fn live_ids(&self) -> Vec<String> {
        self.overlays
            .iter()
            .filter(|o| o.live())
            .map(|o| o.id.clone())
            .collect()
    }
}
