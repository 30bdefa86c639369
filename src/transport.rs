//! Resilient transport
//!
//! Sans-IO state machine over the host's socket and HTTP primitives. The
//! engine queues envelopes, batches them on size or interval, and walks the
//! link through connect, bounded-backoff reconnect and a permanent HTTP
//! fallback. Teardown drains whatever is left through a beacon, which the
//! host can hand to `sendBeacon`-style fire-and-forget delivery.

use std::collections::VecDeque;

use crate::config::TransportConfig;
use crate::encoder::{ClientMessage, EmotionEnvelope};
use crate::error::EngineError;

/// IO the host must perform on the engine's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportAction {
    /// Open (or re-open) the event socket.
    SocketConnect,
    /// Send one text frame over the open socket.
    SocketSend(String),
    /// POST one body to the ingest endpoint.
    HttpPost(String),
    /// Fire-and-forget delivery during page unload.
    Beacon(String),
}

/// Link lifecycle. `Fallback` is terminal for the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Backoff { attempt: u32, retry_at_ms: u64 },
    Fallback,
}

#[derive(Debug)]
pub struct Transport {
    config: TransportConfig,
    state: LinkState,
    /// Consecutive failed connection attempts; cleared by a successful open.
    reconnect_attempts: u32,
    queue: VecDeque<EmotionEnvelope>,
    /// Envelopes dropped to queue pressure, for diagnostics.
    dropped: u64,
    last_flush_ms: u64,
    last_ping_ms: u64,
}

impl Transport {
    pub fn new(config: TransportConfig, now_ms: u64) -> Self {
        Self {
            config,
            state: LinkState::Idle,
            reconnect_attempts: 0,
            queue: VecDeque::new(),
            dropped: 0,
            last_flush_ms: now_ms,
            last_ping_ms: now_ms,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Request the initial connection.
    pub fn start(&mut self) -> Vec<TransportAction> {
        match self.state {
            LinkState::Idle => {
                self.state = LinkState::Connecting;
                vec![TransportAction::SocketConnect]
            }
            _ => Vec::new(),
        }
    }

    /// Queue one envelope. The queue is bounded; under pressure the oldest
    /// envelope is dropped first, newest data wins.
    pub fn enqueue(
        &mut self,
        envelope: EmotionEnvelope,
        now_ms: u64,
    ) -> Result<Vec<TransportAction>, EngineError> {
        self.queue.push_back(envelope);
        while self.queue.len() > self.config.queue_capacity {
            self.queue.pop_front();
            self.dropped += 1;
            log::warn!("transport queue full, dropping oldest envelope");
        }
        if self.queue.len() >= self.config.batch_size {
            return self.flush(now_ms);
        }
        Ok(Vec::new())
    }

    /// Drive timers: interval flush, backoff retry, keepalive ping.
    pub fn tick(&mut self, now_ms: u64) -> Result<Vec<TransportAction>, EngineError> {
        let mut actions = Vec::new();

        if let LinkState::Backoff { retry_at_ms, .. } = self.state {
            if now_ms >= retry_at_ms {
                self.state = LinkState::Connecting;
                actions.push(TransportAction::SocketConnect);
            }
        }

        if !self.queue.is_empty()
            && now_ms.saturating_sub(self.last_flush_ms) >= self.config.flush_interval_ms
        {
            actions.extend(self.flush(now_ms)?);
        }

        if self.state == LinkState::Open
            && now_ms.saturating_sub(self.last_ping_ms) >= self.config.ping_interval_ms
        {
            self.last_ping_ms = now_ms;
            actions.push(TransportAction::SocketSend(serde_json::to_string(
                &ClientMessage::Ping,
            )?));
        }

        Ok(actions)
    }

    /// The host's socket came up.
    pub fn on_socket_opened(&mut self, now_ms: u64) -> Result<Vec<TransportAction>, EngineError> {
        self.state = LinkState::Open;
        self.reconnect_attempts = 0;
        self.last_ping_ms = now_ms;
        // Backlog accumulated while connecting goes out immediately.
        self.flush(now_ms)
    }

    /// The host's socket dropped. Bounded retries, then HTTP for good.
    pub fn on_socket_closed(&mut self, now_ms: u64) -> Vec<TransportAction> {
        if self.state == LinkState::Fallback {
            return Vec::new();
        }
        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;
        if attempt > self.config.max_reconnect_attempts {
            log::warn!("socket reconnect budget exhausted, falling back to http");
            self.state = LinkState::Fallback;
            return Vec::new();
        }
        let delay = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << (attempt - 1).min(31))
            .min(self.config.backoff_max_ms);
        self.state = LinkState::Backoff {
            attempt,
            retry_at_ms: now_ms + delay,
        };
        Vec::new()
    }

    /// Send one control message over the channel, when it is up.
    pub fn send_control(&mut self, message: &ClientMessage) -> Result<Vec<TransportAction>, EngineError> {
        match self.state {
            LinkState::Open => Ok(vec![TransportAction::SocketSend(serde_json::to_string(
                message,
            )?)]),
            // Control traffic has no HTTP shape; dropped off-channel.
            _ => Ok(Vec::new()),
        }
    }

    /// Flush queued envelopes through whichever path is available.
    pub fn flush(&mut self, now_ms: u64) -> Result<Vec<TransportAction>, EngineError> {
        if self.queue.is_empty() {
            return Ok(Vec::new());
        }
        match self.state {
            LinkState::Open => {
                self.last_flush_ms = now_ms;
                let batch: Vec<EmotionEnvelope> = self.queue.drain(..).collect();
                Ok(vec![TransportAction::SocketSend(serde_json::to_string(
                    &batch,
                )?)])
            }
            LinkState::Fallback => {
                self.last_flush_ms = now_ms;
                let mut actions = Vec::new();
                for envelope in self.queue.drain(..) {
                    actions.push(TransportAction::HttpPost(serde_json::to_string(&envelope)?));
                }
                Ok(actions)
            }
            // Not connected yet: hold the queue, the timer retries.
            _ => Ok(Vec::new()),
        }
    }

    /// Final drain at page unload. Whatever the link state, the remaining
    /// queue leaves as one beacon payload.
    pub fn teardown(&mut self) -> Result<Vec<TransportAction>, EngineError> {
        if self.queue.is_empty() {
            return Ok(Vec::new());
        }
        let batch: Vec<EmotionEnvelope> = self.queue.drain(..).collect();
        Ok(vec![TransportAction::Beacon(serde_json::to_string(&batch)?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BehaviorKind, ElementContext, Emotion, EmotionRecord, Session};
    use chrono::Utc;

    fn envelope(n: u64) -> EmotionEnvelope {
        let record = EmotionRecord {
            behavior: BehaviorKind::Hover,
            emotion: Emotion::Interest,
            confidence: 60.0 + n as f64,
            t_ms: n,
            context: ElementContext::default(),
        };
        let session = Session {
            session_id: "s-1".into(),
            tenant_id: "t-1".into(),
            page_url: "https://shop.example/".into(),
        };
        EmotionEnvelope::from_record(&record, &session, Utc::now())
    }

    fn transport() -> Transport {
        Transport::new(TransportConfig::default(), 0)
    }

    fn open_transport() -> Transport {
        let mut t = transport();
        t.start();
        t.on_socket_opened(0).unwrap();
        t
    }

    #[test]
    fn test_start_requests_connect_once() {
        let mut t = transport();
        assert_eq!(t.start(), vec![TransportAction::SocketConnect]);
        assert!(t.start().is_empty());
        assert_eq!(t.state(), LinkState::Connecting);
    }

    #[test]
    fn test_batch_size_triggers_flush() {
        let mut t = open_transport();
        let mut actions = Vec::new();
        for i in 0..10u64 {
            actions = t.enqueue(envelope(i), 100 + i).unwrap();
        }
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            TransportAction::SocketSend(body) => {
                let parsed: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
                assert_eq!(parsed.len(), 10);
            }
            other => panic!("expected socket send, got {other:?}"),
        }
        assert_eq!(t.queued(), 0);
    }

    #[test]
    fn test_interval_flush() {
        let mut t = open_transport();
        t.enqueue(envelope(1), 100).unwrap();
        assert!(t.tick(2_000).unwrap().is_empty());
        let actions = t.tick(5_100).unwrap();
        assert!(matches!(actions[0], TransportAction::SocketSend(_)));
    }

    #[test]
    fn test_queue_holds_while_connecting() {
        let mut t = transport();
        t.start();
        for i in 0..12u64 {
            t.enqueue(envelope(i), i).unwrap();
        }
        // Nothing leaves before the socket opens
        assert_eq!(t.queued(), 12);
        let actions = t.on_socket_opened(200).unwrap();
        assert!(matches!(actions[0], TransportAction::SocketSend(_)));
        assert_eq!(t.queued(), 0);
    }

    #[test]
    fn test_queue_capacity_drops_oldest() {
        let mut t = transport();
        t.start();
        for i in 0..60u64 {
            t.enqueue(envelope(i), i).unwrap();
        }
        assert_eq!(t.queued(), 50);
        assert_eq!(t.dropped(), 10);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut t = open_transport();
        t.on_socket_closed(1_000);
        assert_eq!(
            t.state(),
            LinkState::Backoff { attempt: 1, retry_at_ms: 2_000 }
        );

        // Retry fires at the deadline
        let actions = t.tick(2_000).unwrap();
        assert_eq!(actions, vec![TransportAction::SocketConnect]);

        t.on_socket_closed(2_100);
        assert_eq!(
            t.state(),
            LinkState::Backoff { attempt: 2, retry_at_ms: 4_100 }
        );

        // Delay doubles per attempt
        t.tick(4_100).unwrap();
        t.on_socket_closed(4_200); // attempt 3, 4s
        t.tick(8_200).unwrap();
        t.on_socket_closed(8_300); // attempt 4, 8s
        t.tick(16_300).unwrap();
        t.on_socket_closed(16_400); // attempt 5, 16s
        match t.state() {
            LinkState::Backoff { attempt, retry_at_ms } => {
                assert_eq!(attempt, 5);
                assert_eq!(retry_at_ms, 16_400 + 16_000);
            }
            other => panic!("expected backoff, got {other:?}"),
        }
    }

    #[test]
    fn test_reconnect_budget_exhaustion_falls_back() {
        let mut t = open_transport();
        let mut now = 1_000;
        for _ in 0..5 {
            t.on_socket_closed(now);
            now += 40_000;
            t.tick(now).unwrap();
        }
        // Sixth failure exceeds the budget
        t.on_socket_closed(now);
        assert_eq!(t.state(), LinkState::Fallback);
    }

    #[test]
    fn test_fallback_posts_individually() {
        let mut t = transport();
        t.state = LinkState::Fallback;
        t.enqueue(envelope(1), 100).unwrap();
        t.enqueue(envelope(2), 200).unwrap();
        let actions = t.flush(300).unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions
            .iter()
            .all(|a| matches!(a, TransportAction::HttpPost(_))));
    }

    #[test]
    fn test_fallback_is_terminal() {
        let mut t = transport();
        t.state = LinkState::Fallback;
        assert!(t.on_socket_closed(100).is_empty());
        assert_eq!(t.state(), LinkState::Fallback);
        // No reconnects scheduled from fallback
        assert!(t.tick(100_000).unwrap().is_empty());
    }

    #[test]
    fn test_successful_open_resets_attempt_counter() {
        let mut t = open_transport();
        t.on_socket_closed(1_000);
        t.tick(2_000).unwrap();
        t.on_socket_opened(2_100).unwrap();
        // A fresh failure starts the ladder over
        t.on_socket_closed(3_000);
        assert_eq!(
            t.state(),
            LinkState::Backoff { attempt: 1, retry_at_ms: 4_000 }
        );
    }

    #[test]
    fn test_ping_cadence() {
        let mut t = open_transport();
        let actions = t.tick(30_000).unwrap();
        assert_eq!(
            actions,
            vec![TransportAction::SocketSend("{\"type\":\"ping\"}".into())]
        );
        // Not again until the next interval
        assert!(t.tick(31_000).unwrap().is_empty());
    }

    #[test]
    fn test_control_only_when_open() {
        let mut t = transport();
        let msg = ClientMessage::Ping;
        assert!(t.send_control(&msg).unwrap().is_empty());
        t.start();
        t.on_socket_opened(0).unwrap();
        assert_eq!(t.send_control(&msg).unwrap().len(), 1);
    }

    #[test]
    fn test_teardown_drains_via_beacon() {
        let mut t = transport();
        t.start();
        t.enqueue(envelope(1), 100).unwrap();
        t.enqueue(envelope(2), 200).unwrap();
        let actions = t.teardown().unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            TransportAction::Beacon(body) => {
                let parsed: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
                assert_eq!(parsed.len(), 2);
            }
            other => panic!("expected beacon, got {other:?}"),
        }
        assert_eq!(t.queued(), 0);
    }

    #[test]
    fn test_teardown_with_empty_queue_is_silent() {
        let mut t = open_transport();
        assert!(t.teardown().unwrap().is_empty());
    }
}
