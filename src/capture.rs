//! Event capture layer
//!
//! Normalizes the host's raw DOM events into accepted samples: per-type
//! throttling by timestamp-gap rejection, a suspended flag while the tab is
//! hidden, and the idle anchor that every accepted event resets.

use crate::config::CaptureConfig;
use crate::types::{ElementFacts, InputEvent, Point};

/// What the capture layer decided about one raw event.
#[derive(Debug, Clone, PartialEq)]
pub enum Accepted {
    /// A pointer sample passed the throttle.
    Pointer { point: Point, target: Option<ElementFacts> },
    /// A click always passes.
    Click { point: Point, target: Option<ElementFacts> },
    /// A scroll sample passed the throttle.
    Scroll { delta_y: f64, point: Option<Point> },
    /// Focus landed on an element.
    Focus { target: Option<ElementFacts> },
    /// Pointer left the viewport.
    PointerLeft,
    /// Pointer returned to the viewport.
    PointerReturned,
    /// Tab visibility flipped; downstream processing follows `hidden`.
    Visibility { hidden: bool },
    /// The user selected text.
    Selection,
    /// Throttled or arrived while irrelevant; no downstream work.
    Dropped,
}

/// Capture-layer state. Owns nothing but its own throttle clocks.
#[derive(Debug)]
pub struct CaptureLayer {
    config: CaptureConfig,
    last_pointer_ms: Option<u64>,
    last_scroll_ms: Option<u64>,
    suspended: bool,
    /// Last accepted-event time; the idle detectors measure from here.
    idle_anchor_ms: u64,
    /// When the pointer left the viewport, if it is currently off-canvas.
    offcanvas_since_ms: Option<u64>,
}

impl CaptureLayer {
    pub fn new(config: CaptureConfig, now_ms: u64) -> Self {
        Self {
            config,
            last_pointer_ms: None,
            last_scroll_ms: None,
            suspended: false,
            idle_anchor_ms: now_ms,
            offcanvas_since_ms: None,
        }
    }

    /// Whether downstream processing is suspended (tab hidden).
    pub fn suspended(&self) -> bool {
        self.suspended
    }

    /// Time of the last accepted event.
    pub fn idle_anchor_ms(&self) -> u64 {
        self.idle_anchor_ms
    }

    /// When the pointer left the viewport, if it has not returned.
    pub fn offcanvas_since_ms(&self) -> Option<u64> {
        self.offcanvas_since_ms
    }

    /// Classify one raw event. Throttled events are dropped, not queued.
    pub fn accept(&mut self, t_ms: u64, event: &InputEvent) -> Accepted {
        match event {
            InputEvent::Visibility { hidden } => {
                self.suspended = *hidden;
                if !hidden {
                    // Idle restarts from visibility return, never from the
                    // hidden interval.
                    self.idle_anchor_ms = t_ms;
                }
                Accepted::Visibility { hidden: *hidden }
            }
            _ if self.suspended => Accepted::Dropped,
            InputEvent::PointerMove { x, y, target } => {
                if let Some(last) = self.last_pointer_ms {
                    if t_ms.saturating_sub(last) < self.config.pointer_min_gap_ms {
                        return Accepted::Dropped;
                    }
                }
                self.last_pointer_ms = Some(t_ms);
                self.touch(t_ms);
                self.offcanvas_since_ms = None;
                Accepted::Pointer {
                    point: Point::new(*x, *y),
                    target: target.clone(),
                }
            }
            InputEvent::Click { x, y, target } => {
                self.touch(t_ms);
                Accepted::Click {
                    point: Point::new(*x, *y),
                    target: target.clone(),
                }
            }
            InputEvent::Scroll { delta_y, point } => {
                if let Some(last) = self.last_scroll_ms {
                    if t_ms.saturating_sub(last) < self.config.scroll_min_gap_ms {
                        return Accepted::Dropped;
                    }
                }
                self.last_scroll_ms = Some(t_ms);
                self.touch(t_ms);
                Accepted::Scroll {
                    delta_y: *delta_y,
                    point: *point,
                }
            }
            InputEvent::FocusIn { target } => {
                self.touch(t_ms);
                Accepted::Focus {
                    target: target.clone(),
                }
            }
            InputEvent::FocusOut => {
                self.touch(t_ms);
                Accepted::Dropped
            }
            InputEvent::PointerLeave => {
                self.touch(t_ms);
                self.offcanvas_since_ms = Some(t_ms);
                Accepted::PointerLeft
            }
            InputEvent::PointerEnter => {
                self.touch(t_ms);
                self.offcanvas_since_ms = None;
                Accepted::PointerReturned
            }
            InputEvent::TextSelection => {
                self.touch(t_ms);
                Accepted::Selection
            }
        }
    }

    fn touch(&mut self, t_ms: u64) {
        self.idle_anchor_ms = t_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> CaptureLayer {
        CaptureLayer::new(CaptureConfig::default(), 0)
    }

    fn pointer(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerMove { x, y, target: None }
    }

    #[test]
    fn test_pointer_throttle_drops_fast_events() {
        let mut cap = layer();
        assert_ne!(cap.accept(100, &pointer(1.0, 1.0)), Accepted::Dropped);
        // 10ms later: below the 25ms gap, rejected not queued
        assert_eq!(cap.accept(110, &pointer(2.0, 2.0)), Accepted::Dropped);
        // 30ms after the accepted one: passes
        assert_ne!(cap.accept(130, &pointer(3.0, 3.0)), Accepted::Dropped);
    }

    #[test]
    fn test_scroll_throttle() {
        let mut cap = layer();
        let scroll = InputEvent::Scroll { delta_y: 10.0, point: None };
        assert_ne!(cap.accept(0, &scroll), Accepted::Dropped);
        assert_eq!(cap.accept(50, &scroll), Accepted::Dropped);
        assert_ne!(cap.accept(100, &scroll), Accepted::Dropped);
    }

    #[test]
    fn test_suspension_drops_everything() {
        let mut cap = layer();
        cap.accept(100, &InputEvent::Visibility { hidden: true });
        assert!(cap.suspended());
        assert_eq!(cap.accept(200, &pointer(1.0, 1.0)), Accepted::Dropped);
        assert_eq!(
            cap.accept(300, &InputEvent::Click { x: 0.0, y: 0.0, target: None }),
            Accepted::Dropped
        );
    }

    #[test]
    fn test_visibility_return_rearms_idle_anchor() {
        let mut cap = layer();
        cap.accept(100, &pointer(1.0, 1.0));
        cap.accept(200, &InputEvent::Visibility { hidden: true });
        // Hidden for 5 seconds
        cap.accept(5200, &InputEvent::Visibility { hidden: false });
        assert!(!cap.suspended());
        // Idle measures from the visibility return, not the last pointer move
        assert_eq!(cap.idle_anchor_ms(), 5200);
    }

    #[test]
    fn test_accepted_events_reset_idle_anchor() {
        let mut cap = layer();
        cap.accept(500, &pointer(1.0, 1.0));
        assert_eq!(cap.idle_anchor_ms(), 500);
        cap.accept(900, &InputEvent::TextSelection);
        assert_eq!(cap.idle_anchor_ms(), 900);
    }

    #[test]
    fn test_throttled_event_does_not_reset_idle_anchor() {
        let mut cap = layer();
        cap.accept(500, &pointer(1.0, 1.0));
        cap.accept(510, &pointer(2.0, 2.0)); // throttled
        assert_eq!(cap.idle_anchor_ms(), 500);
    }

    #[test]
    fn test_offcanvas_tracking() {
        let mut cap = layer();
        assert_eq!(cap.offcanvas_since_ms(), None);
        cap.accept(1000, &InputEvent::PointerLeave);
        assert_eq!(cap.offcanvas_since_ms(), Some(1000));
        cap.accept(2000, &InputEvent::PointerEnter);
        assert_eq!(cap.offcanvas_since_ms(), None);
    }

    #[test]
    fn test_pointer_move_clears_offcanvas() {
        let mut cap = layer();
        cap.accept(1000, &InputEvent::PointerLeave);
        cap.accept(1100, &pointer(5.0, 5.0));
        assert_eq!(cap.offcanvas_since_ms(), None);
    }
}
