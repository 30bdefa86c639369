//! Engine orchestration
//!
//! The engine is sans-IO and single-threaded: the host feeds it raw events
//! and clock ticks, and it answers with the IO it wants performed. All
//! pipeline decisions run on the host's monotonic clock; wall time is read
//! once per outbound envelope.

use std::collections::VecDeque;

use chrono::Utc;
use uuid::Uuid;

use crate::capture::{Accepted, CaptureLayer};
use crate::config::EngineConfig;
use crate::context::{resolve_context, DomProbe, NullProbe};
use crate::detectors::{DetectorBank, SessionSnapshot};
use crate::emotion::map_occurrence;
use crate::encoder::{ClientMessage, EmotionEnvelope, ServerMessage};
use crate::error::EngineError;
use crate::governor::CooldownGovernor;
use crate::intent::{IntentAccumulator, IntentDecision};
use crate::intervention::{Directive, OverlayEvent, OverlayManager, Outcome};
use crate::kinematics::KinematicsProcessor;
use crate::transport::{Transport, TransportAction};
use crate::types::{
    BehaviorKind, BehaviorOccurrence, EmotionRecord, InputEvent, Sample, Session,
};

/// IO and notifications the host must perform after a call into the engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum Action {
    SocketConnect,
    SocketSend(String),
    HttpPost(String),
    Beacon(String),
    ShowOverlay {
        overlay_id: String,
        directive: Directive,
    },
    RemoveOverlay {
        overlay_id: String,
    },
    IntentDecision(IntentDecision),
}

impl From<TransportAction> for Action {
    fn from(action: TransportAction) -> Self {
        match action {
            TransportAction::SocketConnect => Action::SocketConnect,
            TransportAction::SocketSend(body) => Action::SocketSend(body),
            TransportAction::HttpPost(body) => Action::HttpPost(body),
            TransportAction::Beacon(body) => Action::Beacon(body),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    session: Session,
    capture: CaptureLayer,
    kinematics: KinematicsProcessor,
    bank: DetectorBank,
    governor: CooldownGovernor,
    intent: IntentAccumulator,
    transport: Transport,
    overlays: OverlayManager,
    probe: Box<dyn DomProbe>,
    behavior_history: VecDeque<BehaviorOccurrence>,
    emotion_history: VecDeque<EmotionRecord>,
    last_classify_ms: u64,
    last_tremor_ms: u64,
    hidden_since_ms: Option<u64>,
    torn_down: bool,
}

impl Engine {
    pub fn new(config: EngineConfig, now_ms: u64) -> Result<Self, EngineError> {
        config.validate()?;
        let session = Session {
            session_id: config
                .options
                .session_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            tenant_id: config
                .options
                .tenant_id
                .clone()
                .unwrap_or_else(|| "demo".to_string()),
            page_url: config.options.page_url.clone().unwrap_or_default(),
        };
        if config.options.debug {
            log::debug!("engine starting for session {}", session.session_id);
        }
        Ok(Self {
            capture: CaptureLayer::new(config.capture.clone(), now_ms),
            kinematics: KinematicsProcessor::new(config.kinematics.clone()),
            bank: DetectorBank::new(&config),
            governor: CooldownGovernor::new(config.cooldown.clone()),
            intent: IntentAccumulator::new(config.intent.clone()),
            transport: Transport::new(config.transport.clone(), now_ms),
            overlays: OverlayManager::new(),
            probe: Box::new(NullProbe),
            behavior_history: VecDeque::new(),
            emotion_history: VecDeque::new(),
            last_classify_ms: now_ms,
            last_tremor_ms: now_ms,
            hidden_since_ms: None,
            torn_down: false,
            session,
            config,
        })
    }

    /// Install a host hit-test probe for point-only behaviors.
    pub fn set_probe(&mut self, probe: Box<dyn DomProbe>) {
        self.probe = probe;
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// API key the host attaches as authorization on `HttpPost` and
    /// `Beacon` actions, when configured.
    pub fn api_key(&self) -> Option<&str> {
        self.config.options.api_key.as_deref()
    }

    /// Admitted emotion records, oldest first.
    pub fn emotion_history(&self) -> impl Iterator<Item = &EmotionRecord> {
        self.emotion_history.iter()
    }

    /// Recent behavior occurrences, admitted or not.
    pub fn behavior_history(&self) -> impl Iterator<Item = &BehaviorOccurrence> {
        self.behavior_history.iter()
    }

    pub fn intent_score(&self) -> f64 {
        self.intent.score()
    }

    /// Kick off the transport. Idempotent.
    pub fn start(&mut self) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        Ok(self.transport.start().into_iter().map(Action::from).collect())
    }

    /// Ingest one raw host event at monotonic time `t_ms`.
    pub fn handle_event(
        &mut self,
        t_ms: u64,
        event: &InputEvent,
    ) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        let mut actions = Vec::new();
        match self.capture.accept(t_ms, event) {
            Accepted::Pointer { point, target } => {
                if let Some(frame) = self.kinematics.push(Sample::new(point.x, point.y, t_ms)) {
                    self.bank.on_frame(frame, point, target);
                }
            }
            Accepted::Click { point, target } => {
                self.bank.on_click(point, t_ms, target);
            }
            Accepted::Scroll { delta_y, point } => {
                self.bank.on_scroll(delta_y, point, t_ms);
            }
            Accepted::Visibility { hidden } => {
                if hidden {
                    self.hidden_since_ms = Some(t_ms);
                    // Stale kinematics must not read as motion after resume.
                    self.kinematics.reset();
                    // The tab may never come back; push what we have.
                    actions.extend(
                        self.transport.flush(t_ms)?.into_iter().map(Action::from),
                    );
                } else if let Some(since) = self.hidden_since_ms.take() {
                    self.bank.on_hidden_interval(t_ms.saturating_sub(since));
                }
            }
            Accepted::PointerLeft
            | Accepted::PointerReturned
            | Accepted::Focus { .. }
            | Accepted::Selection
            | Accepted::Dropped => {}
        }
        Ok(actions)
    }

    /// Advance the engine clock. The host calls this on a coarse timer.
    pub fn tick(&mut self, now_ms: u64) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        let mut actions = Vec::new();

        // Inference stands down entirely while the tab is hidden; only
        // transport and overlay housekeeping keep running.
        if !self.capture.suspended() {
            if now_ms.saturating_sub(self.last_tremor_ms)
                >= self.config.kinematics.tremor_interval_ms
            {
                self.last_tremor_ms = now_ms;
                if let Some(power) = self.kinematics.tremor_power() {
                    self.bank.on_tremor_power(power);
                }
            }

            if now_ms.saturating_sub(self.last_classify_ms)
                >= self.config.pipeline.classify_interval_ms
            {
                self.last_classify_ms = now_ms;
                actions.extend(self.classify(now_ms)?);
            }
        }

        if let Some(decision) = self.intent.poll(now_ms) {
            actions.push(Action::IntentDecision(decision));
        }

        actions.extend(self.transport.tick(now_ms)?.into_iter().map(Action::from));

        for event in self.overlays.tick(now_ms) {
            actions.extend(self.overlay_event_actions(event)?);
        }

        Ok(actions)
    }

    /// One classification pass over the detector bank.
    fn classify(&mut self, now_ms: u64) -> Result<Vec<Action>, EngineError> {
        let snapshot = SessionSnapshot {
            visible: !self.capture.suspended(),
            idle_anchor_ms: self.capture.idle_anchor_ms(),
            offcanvas_since_ms: self.capture.offcanvas_since_ms(),
        };
        let occurrences = self.bank.evaluate(now_ms, snapshot);
        let mut actions = Vec::new();

        for mut occ in occurrences {
            // Point-only behaviors get a chance at element facts.
            if occ.target.is_none() {
                if let Some(point) = occ.point {
                    occ.target = self.probe.probe(point);
                }
            }
            let context = resolve_context(
                occ.target.as_ref(),
                self.emotion_history.make_contiguous(),
                now_ms,
                self.config.pipeline.sequence_window_ms,
            );
            let record = map_occurrence(&occ, context);

            self.behavior_history.push_back(occ);
            while self.behavior_history.len() > self.config.pipeline.behavior_history_len {
                self.behavior_history.pop_front();
            }

            if !self.governor.admit(&record, now_ms) {
                continue;
            }
            if self.config.options.debug {
                log::debug!(
                    "admitted {:?} -> {:?} at confidence {:.1}{}",
                    record.behavior,
                    record.emotion,
                    record.confidence,
                    if is_high_signal(record.behavior) {
                        " [high-signal]"
                    } else {
                        ""
                    }
                );
            }

            if let Some(decision) = self.intent.observe(&record, now_ms) {
                actions.push(Action::IntentDecision(decision));
            }

            let envelope = EmotionEnvelope::from_record(&record, &self.session, Utc::now());
            actions.extend(
                self.transport
                    .enqueue(envelope, now_ms)?
                    .into_iter()
                    .map(Action::from),
            );

            self.emotion_history.push_back(record);
            while self.emotion_history.len() > self.config.pipeline.emotion_history_len {
                self.emotion_history.pop_front();
            }
        }

        Ok(actions)
    }

    /// The host's socket connected.
    pub fn socket_opened(&mut self, now_ms: u64) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        let flush = self.transport.on_socket_opened(now_ms)?;
        let register = self.transport.send_control(&ClientMessage::Register {
            session_id: self.session.session_id.clone(),
            tenant_id: self.session.tenant_id.clone(),
        })?;
        // Registration precedes any backlog.
        Ok(register
            .into_iter()
            .chain(flush)
            .map(Action::from)
            .collect())
    }

    /// The host's socket dropped.
    pub fn socket_closed(&mut self, now_ms: u64) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        Ok(self
            .transport
            .on_socket_closed(now_ms)
            .into_iter()
            .map(Action::from)
            .collect())
    }

    /// One text frame arrived from the server. Malformed frames are logged
    /// and ignored; the channel must survive garbage.
    pub fn socket_message(&mut self, now_ms: u64, raw: &str) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        let message: ServerMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(err) => {
                log::debug!("ignoring malformed server frame: {err}");
                return Ok(Vec::new());
            }
        };
        match message {
            ServerMessage::Connected | ServerMessage::Pong => Ok(Vec::new()),
            ServerMessage::Intervention {
                intervention_type,
                content,
                timing,
                correlation_id,
            } => {
                let kind = match Directive::parse_kind(&intervention_type) {
                    Ok(kind) => kind,
                    Err(err) => {
                        log::debug!("{err}");
                        return Ok(Vec::new());
                    }
                };
                let directive = Directive {
                    kind,
                    content,
                    timing,
                    correlation_id,
                };
                self.overlays.schedule(directive, now_ms);
                // Show fires from the next tick once the delay elapses.
                Ok(Vec::new())
            }
        }
    }

    /// Host callback: the user clicked an overlay.
    pub fn overlay_clicked(&mut self, overlay_id: &str) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        match self.overlays.clicked(overlay_id) {
            Some(event) => self.overlay_event_actions(event),
            None => Ok(Vec::new()),
        }
    }

    /// Host callback: the user dismissed an overlay.
    pub fn overlay_dismissed(&mut self, overlay_id: &str) -> Result<Vec<Action>, EngineError> {
        self.ensure_live()?;
        match self.overlays.dismissed(overlay_id) {
            Some(event) => self.overlay_event_actions(event),
            None => Ok(Vec::new()),
        }
    }

    fn overlay_event_actions(&mut self, event: OverlayEvent) -> Result<Vec<Action>, EngineError> {
        let mut actions = Vec::new();
        match event {
            OverlayEvent::Show {
                overlay_id,
                directive,
            } => {
                actions.extend(
                    self.transport
                        .send_control(&ClientMessage::InterventionShown {
                            session_id: self.session.session_id.clone(),
                            correlation_id: directive.correlation_id.clone(),
                        })?
                        .into_iter()
                        .map(Action::from),
                );
                actions.push(Action::ShowOverlay {
                    overlay_id,
                    directive,
                });
            }
            OverlayEvent::Remove {
                overlay_id,
                correlation_id,
                outcome,
            } => {
                let message = match outcome {
                    Outcome::Clicked => ClientMessage::InterventionClicked {
                        session_id: self.session.session_id.clone(),
                        correlation_id,
                    },
                    Outcome::Dismissed | Outcome::Expired => ClientMessage::InterventionResult {
                        session_id: self.session.session_id.clone(),
                        correlation_id,
                        outcome: outcome.as_str().to_string(),
                    },
                };
                actions.extend(
                    self.transport
                        .send_control(&message)?
                        .into_iter()
                        .map(Action::from),
                );
                actions.push(Action::RemoveOverlay { overlay_id });
            }
        }
        Ok(actions)
    }

    /// Final drain at page unload. Idempotent; all later calls except
    /// another teardown fail with [`EngineError::TornDown`].
    pub fn teardown(&mut self) -> Result<Vec<Action>, EngineError> {
        if self.torn_down {
            return Ok(Vec::new());
        }
        self.torn_down = true;
        let mut actions: Vec<Action> = self
            .transport
            .teardown()?
            .into_iter()
            .map(Action::from)
            .collect();
        for id in self.overlays.live_ids() {
            actions.push(Action::RemoveOverlay { overlay_id: id });
        }
        Ok(actions)
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.torn_down {
            Err(EngineError::TornDown)
        } else {
            Ok(())
        }
    }
}

/// Behavior kinds that most often precede an intervention, exposed for
/// host-side diagnostics panels.
pub fn is_high_signal(kind: BehaviorKind) -> bool {
    matches!(
        kind,
        BehaviorKind::RageClick
            | BehaviorKind::ExitIntent
            | BehaviorKind::Hesitation
            | BehaviorKind::Abandoned
            | BehaviorKind::AbandonmentRisk
    )
}
