//! Pointer-movement detection
//!
//! Consumes kinematic frames and reads them as movement patterns: direction
//! shaking, exit-intent toward the top edge, hover and hesitation dwells,
//! narrow-band tremor, and the drift/scan residual classes.

use std::collections::VecDeque;

use crate::config::{KinematicsConfig, MovementConfig};
use crate::types::{BehaviorKind, BehaviorOccurrence, ElementFacts, KinematicFrame, Point};

#[derive(Debug, Clone)]
struct FrameSample {
    frame: KinematicFrame,
    point: Point,
}

#[derive(Debug, Clone)]
struct Dwell {
    anchor: Point,
    since_ms: u64,
    target: Option<ElementFacts>,
    hover_emitted: bool,
    hesitation_emitted: bool,
}

/// Movement detector. Owns its frame window and dwell state exclusively.
#[derive(Debug)]
pub struct MovementDetector {
    config: MovementConfig,
    tremor_threshold: f64,
    frames: VecDeque<FrameSample>,
    dwell: Option<Dwell>,
    last_exit_ms: Option<u64>,
    pending_tremor: Option<f64>,
    tremor_consumed: bool,
}

impl MovementDetector {
    pub fn new(config: MovementConfig, kinematics: &KinematicsConfig) -> Self {
        Self {
            config,
            tremor_threshold: kinematics.tremor_power_threshold,
            frames: VecDeque::new(),
            dwell: None,
            last_exit_ms: None,
            pending_tremor: None,
            tremor_consumed: false,
        }
    }

    /// Feed one derived frame together with the sample point it ended on.
    pub fn on_frame(&mut self, frame: KinematicFrame, point: Point, target: Option<ElementFacts>) {
        self.frames.push_back(FrameSample { frame, point });
        let horizon = frame.t_ms.saturating_sub(self.config.shake_window_ms);
        while self
            .frames
            .front()
            .map(|f| f.frame.t_ms < horizon)
            .unwrap_or(false)
        {
            self.frames.pop_front();
        }

        // Dwell anchor: survives while the pointer stays inside the radius.
        match &mut self.dwell {
            Some(d) if point.distance_to(&d.anchor) <= self.config.dwell_radius_px => {
                if target.is_some() {
                    d.target = target;
                }
            }
            _ => {
                self.dwell = Some(Dwell {
                    anchor: point,
                    since_ms: frame.t_ms,
                    target,
                    hover_emitted: false,
                    hesitation_emitted: false,
                });
            }
        }
    }

    /// The tab was hidden for `hidden_ms`. Hidden time never counts toward
    /// dwell, so the anchor clock shifts forward by the gap.
    pub fn on_hidden_interval(&mut self, hidden_ms: u64) {
        if let Some(d) = &mut self.dwell {
            d.since_ms = d.since_ms.saturating_add(hidden_ms);
        }
    }

    /// Latest tremor power estimate, recorded on the tremor cadence.
    pub fn on_tremor_power(&mut self, power: f64) {
        if power > self.tremor_threshold {
            self.tremor_consumed = false;
            // Remember the overshoot for the next evaluation.
            self.pending_tremor = Some(power);
        }
    }

    /// Evaluate movement patterns over the current window.
    pub fn evaluate(&mut self, now_ms: u64, visible: bool) -> Vec<BehaviorOccurrence> {
        let mut out = Vec::new();

        if let Some(occ) = self.evaluate_shake(now_ms) {
            out.push(occ);
        }
        if let Some(occ) = self.evaluate_exit(now_ms, visible) {
            out.push(occ);
        }
        if let Some(occ) = self.evaluate_dwell(now_ms) {
            out.push(occ);
        }
        if let Some(occ) = self.evaluate_tremor(now_ms) {
            out.push(occ);
        }
        // Drift/scan only describe motion no stronger pattern claimed.
        if out.is_empty() {
            if let Some(occ) = self.evaluate_residual(now_ms) {
                out.push(occ);
            }
        }
        out
    }

    fn evaluate_shake(&mut self, _now_ms: u64) -> Option<BehaviorOccurrence> {
        let mut reversals = 0u32;
        let mut last_sign = 0i8;
        for fs in &self.frames {
            if fs.frame.speed < self.config.shake_min_speed {
                continue;
            }
            let sign = if fs.frame.vx > 0.0 {
                1
            } else if fs.frame.vx < 0.0 {
                -1
            } else {
                0
            };
            if sign == 0 {
                continue;
            }
            if last_sign != 0 && sign != last_sign {
                reversals += 1;
            }
            last_sign = sign;
        }
        if reversals < self.config.shake_min_reversals {
            return None;
        }
        let last = self.frames.back()?.clone();
        let confidence = (55.0 + 10.0 * reversals as f64).min(90.0);
        // Reversal evidence is consumed so the same burst cannot re-fire.
        self.frames.clear();
        Some(
            BehaviorOccurrence::new(BehaviorKind::Shake, confidence, last.frame.t_ms)
                .at_point(last.point),
        )
    }

    fn evaluate_exit(&mut self, now_ms: u64, visible: bool) -> Option<BehaviorOccurrence> {
        if !visible {
            return None;
        }
        let last = self.frames.back()?;
        if last.point.y > self.config.exit_edge_px {
            return None;
        }
        if last.frame.vy > -self.config.exit_min_speed {
            return None;
        }
        if let Some(prev) = self.last_exit_ms {
            if now_ms.saturating_sub(prev) < self.config.exit_debounce_ms {
                return None;
            }
        }
        self.last_exit_ms = Some(now_ms);
        Some(
            BehaviorOccurrence::new(BehaviorKind::ExitIntent, 85.0, last.frame.t_ms)
                .at_point(last.point),
        )
    }

    fn evaluate_dwell(&mut self, now_ms: u64) -> Option<BehaviorOccurrence> {
        let moving_fast = self
            .frames
            .back()
            .map(|f| f.frame.speed > self.config.hover_max_speed)
            .unwrap_or(true);
        if moving_fast {
            return None;
        }
        let dwell = self.dwell.as_mut()?;
        let held_ms = now_ms.saturating_sub(dwell.since_ms);

        if held_ms >= self.config.hesitation_dwell_ms && !dwell.hesitation_emitted {
            dwell.hesitation_emitted = true;
            dwell.hover_emitted = true;
            let extra = (held_ms - self.config.hesitation_dwell_ms) as f64 / 1000.0;
            let confidence = (75.0 + extra * 5.0).min(90.0);
            return Some(
                BehaviorOccurrence::new(BehaviorKind::Hesitation, confidence, now_ms)
                    .at_point(dwell.anchor)
                    .with_target(dwell.target.clone()),
            );
        }
        if held_ms >= self.config.hover_dwell_ms && !dwell.hover_emitted {
            dwell.hover_emitted = true;
            return Some(
                BehaviorOccurrence::new(BehaviorKind::Hover, 65.0, now_ms)
                    .at_point(dwell.anchor)
                    .with_target(dwell.target.clone()),
            );
        }
        None
    }

    fn evaluate_tremor(&mut self, now_ms: u64) -> Option<BehaviorOccurrence> {
        let power = self.pending_tremor.take()?;
        if self.tremor_consumed {
            return None;
        }
        self.tremor_consumed = true;
        // Confidence grows with overshoot above the threshold.
        let confidence = (60.0 + (power / self.tremor_threshold) * 10.0).min(85.0);
        let point = self.frames.back().map(|f| f.point);
        let mut occ = BehaviorOccurrence::new(BehaviorKind::Tremor, confidence, now_ms);
        if let Some(p) = point {
            occ = occ.at_point(p);
        }
        Some(occ)
    }

    fn evaluate_residual(&mut self, _now_ms: u64) -> Option<BehaviorOccurrence> {
        if self.frames.len() < 4 {
            return None;
        }
        let first = self.frames.front()?.clone();
        let last = self.frames.back()?.clone();
        // Micro-gestures stay unclassified.
        if first.point.distance_to(&last.point) < self.config.min_gesture_displacement_px {
            return None;
        }
        let mean_speed: f64 =
            self.frames.iter().map(|f| f.frame.speed).sum::<f64>() / self.frames.len() as f64;
        let occ = if mean_speed < self.config.drift_max_speed {
            BehaviorOccurrence::new(BehaviorKind::Drift, 58.0, last.frame.t_ms)
        } else if mean_speed < self.config.scan_max_speed {
            BehaviorOccurrence::new(BehaviorKind::Scan, 62.0, last.frame.t_ms)
        } else {
            return None;
        };
        // Window consumed; the next gesture builds fresh evidence.
        self.frames.clear();
        Some(occ.at_point(last.point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KinematicsConfig;

    fn detector() -> MovementDetector {
        MovementDetector::new(MovementConfig::default(), &KinematicsConfig::default())
    }

    fn frame(vx: f64, vy: f64, t_ms: u64) -> KinematicFrame {
        KinematicFrame {
            vx,
            vy,
            ax: 0.0,
            ay: 0.0,
            jx: 0.0,
            jy: 0.0,
            speed: (vx * vx + vy * vy).sqrt(),
            jerk: 0.0,
            t_ms,
        }
    }

    #[test]
    fn test_shake_from_direction_reversals() {
        let mut det = detector();
        let mut x = 500.0;
        for i in 0..8u64 {
            let vx = if i % 2 == 0 { 0.8 } else { -0.8 };
            x += vx * 100.0;
            det.on_frame(frame(vx, 0.0, i * 100), Point::new(x, 300.0), None);
        }
        let occs = det.evaluate(800, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::Shake));
        let shake = occs.iter().find(|o| o.kind == BehaviorKind::Shake).unwrap();
        assert!(shake.confidence > 80.0);
    }

    #[test]
    fn test_shake_consumes_window_and_keeps_last_point() {
        let mut det = detector();
        let mut x = 500.0;
        for i in 0..8u64 {
            let vx = if i % 2 == 0 { 0.8 } else { -0.8 };
            x += vx * 100.0;
            det.on_frame(frame(vx, 0.0, i * 100), Point::new(x, 300.0), None);
        }
        let occs = det.evaluate(800, true);
        let shake = occs.iter().find(|o| o.kind == BehaviorKind::Shake).unwrap();
        assert_eq!(shake.point, Some(Point::new(500.0, 300.0)));
        assert_eq!(shake.t_ms, 700);
        // The same burst never re-fires
        assert!(!det
            .evaluate(1800, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::Shake));
    }

    #[test]
    fn test_hidden_interval_does_not_count_toward_dwell() {
        let mut det = detector();
        det.on_frame(frame(0.01, 0.0, 100), Point::new(200.0, 200.0), None);
        // Tab hidden for 10s while the pointer sat still
        det.on_hidden_interval(10_000);
        // Only 500ms of visible dwell so far: silent
        assert!(det.evaluate(10_600, true).is_empty());
        // 900ms of visible dwell crosses the hover threshold
        let occs = det.evaluate(11_000, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::Hover));
    }

    #[test]
    fn test_slow_reversals_are_not_shake() {
        let mut det = detector();
        for i in 0..8u64 {
            // Below the shake speed floor
            let vx = if i % 2 == 0 { 0.1 } else { -0.1 };
            det.on_frame(frame(vx, 0.0, i * 100), Point::new(500.0 + i as f64, 300.0), None);
        }
        let occs = det.evaluate(800, true);
        assert!(!occs.iter().any(|o| o.kind == BehaviorKind::Shake));
    }

    #[test]
    fn test_exit_intent_at_top_edge() {
        let mut det = detector();
        det.on_frame(frame(0.0, -1.0, 100), Point::new(400.0, 30.0), None);
        let occs = det.evaluate(200, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::ExitIntent));
    }

    #[test]
    fn test_exit_intent_debounced() {
        let mut det = detector();
        det.on_frame(frame(0.0, -1.0, 100), Point::new(400.0, 30.0), None);
        assert!(det
            .evaluate(200, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::ExitIntent));

        det.on_frame(frame(0.0, -1.0, 1100), Point::new(400.0, 20.0), None);
        // Within the debounce interval: silent
        assert!(!det
            .evaluate(1200, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::ExitIntent));

        det.on_frame(frame(0.0, -1.0, 4000), Point::new(400.0, 20.0), None);
        assert!(det
            .evaluate(4100, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::ExitIntent));
    }

    #[test]
    fn test_exit_intent_requires_visibility() {
        let mut det = detector();
        det.on_frame(frame(0.0, -1.0, 100), Point::new(400.0, 30.0), None);
        assert!(det.evaluate(200, false).is_empty());
    }

    #[test]
    fn test_downward_motion_at_top_is_not_exit() {
        let mut det = detector();
        det.on_frame(frame(0.0, 1.0, 100), Point::new(400.0, 30.0), None);
        assert!(!det
            .evaluate(200, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::ExitIntent));
    }

    #[test]
    fn test_hover_then_hesitation_on_sustained_dwell() {
        let mut det = detector();
        // Pointer settles at one spot with tiny residual motion
        for i in 0..5u64 {
            det.on_frame(
                frame(0.01, 0.0, 100 + i * 50),
                Point::new(200.0 + i as f64, 200.0),
                None,
            );
        }
        // At 1s of dwell: hover
        let occs = det.evaluate(1000, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::Hover));
        // Hover never re-fires for the same dwell
        assert!(!det
            .evaluate(1500, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::Hover));
        // Past the hesitation threshold the dwell escalates
        let occs = det.evaluate(3200, true);
        let hes = occs
            .iter()
            .find(|o| o.kind == BehaviorKind::Hesitation)
            .expect("hesitation expected");
        assert!(hes.confidence >= 75.0);
    }

    #[test]
    fn test_hesitation_confidence_grows_with_dwell() {
        let mut det = detector();
        det.on_frame(frame(0.01, 0.0, 100), Point::new(200.0, 200.0), None);
        let occs = det.evaluate(6200, true);
        let hes = occs
            .iter()
            .find(|o| o.kind == BehaviorKind::Hesitation)
            .unwrap();
        // ~6.1s dwell: 75 + ~3 * 5, capped at 90
        assert!(hes.confidence > 85.0);
        assert!(hes.confidence <= 90.0);
    }

    #[test]
    fn test_moving_pointer_breaks_dwell() {
        let mut det = detector();
        det.on_frame(frame(0.01, 0.0, 100), Point::new(200.0, 200.0), None);
        // Pointer jumps far away: dwell anchor resets
        det.on_frame(frame(1.0, 0.0, 600), Point::new(600.0, 200.0), None);
        let occs = det.evaluate(1200, true);
        assert!(!occs.iter().any(|o| o.kind == BehaviorKind::Hover));
    }

    #[test]
    fn test_drift_and_scan_classification() {
        let mut det = detector();
        for i in 0..6u64 {
            det.on_frame(
                frame(0.1, 0.0, i * 100),
                Point::new(100.0 + i as f64 * 10.0, 300.0),
                None,
            );
        }
        let occs = det.evaluate(600, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::Drift));

        let mut det = detector();
        for i in 0..6u64 {
            det.on_frame(
                frame(0.4, 0.0, i * 100),
                Point::new(100.0 + i as f64 * 40.0, 300.0),
                None,
            );
        }
        let occs = det.evaluate(600, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::Scan));
    }

    #[test]
    fn test_micro_gesture_stays_unclassified() {
        let mut det = detector();
        for i in 0..6u64 {
            det.on_frame(
                frame(0.1, 0.0, i * 100),
                Point::new(100.0 + i as f64, 300.0),
                None,
            );
        }
        assert!(det.evaluate(600, true).is_empty());
    }

    #[test]
    fn test_tremor_power_above_threshold_emits_once() {
        let mut det = detector();
        det.on_frame(frame(0.2, 0.0, 100), Point::new(300.0, 300.0), None);
        det.on_tremor_power(20.0);
        let occs = det.evaluate(400, true);
        assert!(occs.iter().any(|o| o.kind == BehaviorKind::Tremor));
        // Consumed until the next above-threshold estimate
        assert!(!det
            .evaluate(700, true)
            .iter()
            .any(|o| o.kind == BehaviorKind::Tremor));
    }

    #[test]
    fn test_tremor_power_below_threshold_ignored() {
        let mut det = detector();
        det.on_tremor_power(2.0);
        assert!(det.evaluate(400, true).is_empty());
    }
}
