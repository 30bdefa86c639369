//! Behavior detector bank
//!
//! Each detector owns its evidence buffers exclusively; the bank routes
//! accepted samples in and collects occurrences on the classification
//! cadence. Detectors never talk to each other.

mod click;
mod idle;
mod movement;
mod scroll;

pub use click::ClickDetector;
pub use idle::IdleDetector;
pub use movement::MovementDetector;
pub use scroll::ScrollDetector;

use crate::config::EngineConfig;
use crate::types::{BehaviorOccurrence, ElementFacts, KinematicFrame, Point};

/// Session state the bank needs at evaluation time, read from the capture
/// layer by the engine.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    pub visible: bool,
    pub idle_anchor_ms: u64,
    pub offcanvas_since_ms: Option<u64>,
}

#[derive(Debug)]
pub struct DetectorBank {
    click: ClickDetector,
    movement: MovementDetector,
    scroll: ScrollDetector,
    idle: IdleDetector,
}

impl DetectorBank {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            click: ClickDetector::new(config.click.clone()),
            movement: MovementDetector::new(config.movement.clone(), &config.kinematics),
            scroll: ScrollDetector::new(config.scroll.clone()),
            idle: IdleDetector::new(config.idle.clone()),
        }
    }

    pub fn on_click(&mut self, point: Point, t_ms: u64, target: Option<ElementFacts>) {
        self.click.on_click(point, t_ms, target);
    }

    pub fn on_frame(&mut self, frame: KinematicFrame, point: Point, target: Option<ElementFacts>) {
        self.movement.on_frame(frame, point, target);
    }

    pub fn on_scroll(&mut self, delta_y: f64, point: Option<Point>, t_ms: u64) {
        self.scroll.on_scroll(delta_y, point, t_ms);
    }

    pub fn on_tremor_power(&mut self, power: f64) {
        self.movement.on_tremor_power(power);
    }

    /// Visibility returned after `hidden_ms`; hidden time is excluded from
    /// time-based evidence.
    pub fn on_hidden_interval(&mut self, hidden_ms: u64) {
        self.movement.on_hidden_interval(hidden_ms);
    }

    /// Run every detector once. Called on the classification cadence.
    pub fn evaluate(&mut self, now_ms: u64, snapshot: SessionSnapshot) -> Vec<BehaviorOccurrence> {
        let mut out = Vec::new();
        if let Some(occ) = self.click.evaluate(now_ms) {
            out.push(occ);
        }
        out.extend(self.movement.evaluate(now_ms, snapshot.visible));
        if let Some(occ) = self.scroll.evaluate(now_ms) {
            out.push(occ);
        }
        out.extend(self.idle.evaluate(
            now_ms,
            snapshot.idle_anchor_ms,
            snapshot.offcanvas_since_ms,
            !snapshot.visible,
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BehaviorKind;

    fn snapshot(now_ms: u64) -> SessionSnapshot {
        SessionSnapshot {
            visible: true,
            idle_anchor_ms: now_ms,
            offcanvas_since_ms: None,
        }
    }

    #[test]
    fn test_bank_routes_clicks() {
        let mut bank = DetectorBank::new(&EngineConfig::default());
        for i in 0..3u64 {
            bank.on_click(Point::new(100.0, 100.0), 100 + i * 200, None);
        }
        let occs = bank.evaluate(700, snapshot(700));
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::RageClick));
    }

    #[test]
    fn test_bank_can_emit_multiple_kinds_in_one_pass() {
        let mut bank = DetectorBank::new(&EngineConfig::default());
        bank.on_click(Point::new(100.0, 100.0), 100, None);
        bank.on_click(Point::new(100.0, 100.0), 300, None);
        bank.on_click(Point::new(100.0, 100.0), 500, None);
        for i in 1..=3u64 {
            bank.on_scroll(400.0, None, 600 + i * 200);
        }
        let occs = bank.evaluate(1300, snapshot(1300));
        let kinds: Vec<_> = occs.iter().map(|o| o.kind).collect();
        assert!(kinds.contains(&BehaviorKind::RageClick));
        assert!(kinds.iter().any(|k| {
            matches!(
                k,
                BehaviorKind::ScrollSlow
                    | BehaviorKind::ScrollNormal
                    | BehaviorKind::ScrollFast
                    | BehaviorKind::ScrollSkim
            )
        }));
    }
}
