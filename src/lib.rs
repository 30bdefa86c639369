//! Moodwire - Client-embedded engine for behavioral emotion inference
//!
//! Moodwire turns raw interaction events (pointer, scroll, focus,
//! visibility) into emotion hypotheses and intervention choreography through
//! a deterministic pipeline: capture → kinematics → behavior detection →
//! emotion mapping → governed emission → intent accumulation.
//!
//! The engine is sans-IO: the host drives it with events and clock ticks on
//! a monotonic millisecond clock, and performs the socket, HTTP and overlay
//! work the engine asks for via [`engine::Action`] values.
//!
//! ## Modules
//!
//! - **Capture**: throttling, visibility suspension and idle anchoring
//! - **Kinematics**: velocity/acceleration/jerk derivation and tremor DFT
//! - **Detectors**: click, movement, scroll, idle and off-canvas patterns
//! - **Emotion**: behavior-to-emotion mapping with element and sequence context
//! - **Governor / Intent**: dual-key cooldowns and the decaying intent score
//! - **Transport / Intervention**: resilient delivery and overlay lifecycle

pub mod capture;
pub mod config;
pub mod context;
pub mod detectors;
pub mod emotion;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod governor;
pub mod intent;
pub mod intervention;
pub mod kinematics;
pub mod transport;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{EngineConfig, InitOptions};
pub use engine::{Action, Engine};
pub use error::EngineError;
pub use intent::{IntentDecision, InterventionTier};
pub use intervention::{Directive, InterventionKind, Outcome, OverlayArchetype};
pub use types::{BehaviorKind, Emotion, EmotionRecord, InputEvent, RawEvent};

/// Engine version embedded in diagnostics output.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name attached to diagnostics output.
pub const PRODUCER_NAME: &str = "moodwire";
