//! Behavior-to-emotion mapping
//!
//! Each behavior kind carries a base emotion hypothesis and a base
//! confidence. The mapped confidence blends detector confidence with the
//! base, then element role and sequence context transform the emotion and
//! adjust the score. Output confidence never exceeds 95: the pipeline is
//! heuristic and never claims certainty.

use crate::types::{
    BehaviorKind, BehaviorOccurrence, ElementContext, ElementRole, Emotion, EmotionRecord,
    SequenceTag,
};

/// Hard ceiling on emitted confidence.
const CONFIDENCE_CAP: f64 = 95.0;

/// Base hypothesis per behavior kind.
fn base_mapping(kind: BehaviorKind) -> (Emotion, f64) {
    match kind {
        BehaviorKind::RageClick => (Emotion::Frustration, 90.0),
        BehaviorKind::DoubleClick => (Emotion::Interest, 55.0),
        BehaviorKind::SingleClick => (Emotion::Engagement, 45.0),
        BehaviorKind::Shake => (Emotion::Frustration, 75.0),
        BehaviorKind::ExitIntent => (Emotion::AbandonmentIntent, 80.0),
        BehaviorKind::Hover => (Emotion::Interest, 60.0),
        BehaviorKind::Hesitation => (Emotion::Hesitation, 70.0),
        BehaviorKind::Drift => (Emotion::Curiosity, 45.0),
        BehaviorKind::Scan => (Emotion::Curiosity, 55.0),
        BehaviorKind::Tremor => (Emotion::Anxiety, 70.0),
        BehaviorKind::ScrollHunt => (Emotion::Frustration, 72.0),
        BehaviorKind::ScrollReversal => (Emotion::Confusion, 60.0),
        BehaviorKind::ScrollSlow => (Emotion::Engagement, 55.0),
        BehaviorKind::ScrollNormal => (Emotion::Engagement, 50.0),
        BehaviorKind::ScrollFast => (Emotion::Engagement, 45.0),
        BehaviorKind::ScrollSkim => (Emotion::Curiosity, 40.0),
        BehaviorKind::IdleShort => (Emotion::Hesitation, 50.0),
        BehaviorKind::IdleLong => (Emotion::Hesitation, 65.0),
        BehaviorKind::Abandoned => (Emotion::AbandonmentIntent, 75.0),
        BehaviorKind::Distraction => (Emotion::Hesitation, 55.0),
        BehaviorKind::AbandonmentRisk => (Emotion::ExitRisk, 78.0),
    }
}

/// One-way contextual transform: an emotion near a salient element becomes
/// a more specific one. Never runs in reverse.
fn transform(emotion: Emotion, role: ElementRole) -> Emotion {
    match role {
        ElementRole::Price => match emotion {
            // Attention on a price reads as purchase consideration.
            Emotion::Interest | Emotion::Engagement | Emotion::Curiosity => {
                Emotion::PurchaseIntent
            }
            // Agitation at a price reads as price shock.
            Emotion::Frustration | Emotion::Confusion => Emotion::PriceShock,
            other => other,
        },
        ElementRole::Cta => match emotion {
            Emotion::Interest => Emotion::PurchaseIntent,
            other => other,
        },
        ElementRole::Navigation | ElementRole::Form => emotion,
    }
}

fn role_boost(role: ElementRole) -> f64 {
    match role {
        ElementRole::Price => 15.0,
        ElementRole::Cta => 10.0,
        ElementRole::Form => 8.0,
        ElementRole::Navigation => 5.0,
    }
}

/// Map one behavior occurrence into an emotion record.
pub fn map_occurrence(occ: &BehaviorOccurrence, context: ElementContext) -> EmotionRecord {
    let (base_emotion, base_confidence) = base_mapping(occ.kind);
    let mut confidence = (occ.confidence + base_confidence) / 2.0;

    let mut emotion = base_emotion;
    if let Some(role) = context.role {
        emotion = transform(emotion, role);
        confidence += role_boost(role);
    }

    match context.sequence_tag {
        Some(SequenceTag::AfterFrustration) if emotion.is_negative() => confidence += 10.0,
        Some(SequenceTag::AfterSuccess) if !emotion.is_negative() => confidence += 5.0,
        _ => {}
    }

    EmotionRecord {
        behavior: occ.kind,
        emotion,
        confidence: confidence.clamp(0.0, CONFIDENCE_CAP),
        t_ms: occ.t_ms,
        context,
    }
}
