//! Wire encoding
//!
//! Envelope and channel message shapes for the backend. Pipeline timestamps
//! stay monotonic; only the outbound envelope carries a wall-clock RFC 3339
//! timestamp, stamped at encode time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BehaviorKind, ElementContext, Emotion, EmotionRecord, Session};

/// One emotion event as the backend ingests it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEnvelope {
    pub session_id: String,
    pub tenant_id: String,
    pub emotion: Emotion,
    pub confidence: f64,
    pub behavior: BehaviorKind,
    pub page_url: String,
    /// Wall-clock time in RFC 3339, assigned when the record is encoded.
    pub timestamp: DateTime<Utc>,
    pub metadata: EnvelopeMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    pub behavior: BehaviorKind,
    pub context: ElementContext,
}

impl EmotionEnvelope {
    pub fn from_record(record: &EmotionRecord, session: &Session, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id: session.session_id.clone(),
            tenant_id: session.tenant_id.clone(),
            emotion: record.emotion,
            confidence: record.confidence,
            behavior: record.behavior,
            page_url: session.page_url.clone(),
            timestamp,
            metadata: EnvelopeMetadata {
                behavior: record.behavior,
                context: record.context,
            },
        }
    }
}

/// Client-to-server channel messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Register {
        session_id: String,
        tenant_id: String,
    },
    InterventionShown {
        session_id: String,
        correlation_id: String,
    },
    InterventionClicked {
        session_id: String,
        correlation_id: String,
    },
    InterventionResult {
        session_id: String,
        correlation_id: String,
        outcome: String,
    },
    Ping,
}

/// Server-to-client channel messages. Unknown fields are ignored so the
/// backend can evolve its payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected,
    Intervention {
        intervention_type: String,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        timing: crate::intervention::Timing,
        #[serde(alias = "correlationId")]
        correlation_id: String,
    },
    Pong,
}
