use glam::Vec2;

use super::{HitTestResult, XrInput};
use crate::input::{MouseButton, PointerId, PointerInfo, PointerKind, PointerTracker};
use crate::pose::shortest_arc;

/// What the screen touches did between two XR frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchGesture {
    pub fingers: usize,
    /// The number of fingers changed this frame.
    pub started: bool,
    /// Surface under a single finger.
    pub hit: Option<HitTestResult>,
    /// Ratio of the two-finger span to the previous frame's.
    pub pinch: Option<f32>,
    /// Degrees the two-finger line turned since the previous frame.
    pub twist: Option<f32>,
}

/// Follows transient XR touches from frame to frame.
#[derive(Debug, Clone, Default)]
pub struct TouchTracker {
    touches: PointerTracker,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingers(&self) -> usize {
        self.touches.count()
    }

    pub fn clear(&mut self) {
        self.touches.clear();
    }

    pub fn advance(&mut self, inputs: &[XrInput]) -> TouchGesture {
        let before = self.touches.count();
        let span = self.touches.span();
        let angle = self.touches.angle();

        let stale: Vec<PointerId> = self
            .touches
            .ids()
            .into_iter()
            .filter(|id| !inputs.iter().any(|input| input.id == *id))
            .collect();
        for id in stale {
            self.touches.release(id);
        }
        for input in inputs {
            if self.touches.move_to(input.id, input.position).is_none() {
                self.touches.press(input.id, touch(input.position));
            }
        }

        let fingers = self.touches.count();
        let mut gesture = TouchGesture {
            fingers,
            started: fingers != before,
            ..TouchGesture::default()
        };
        match fingers {
            1 => gesture.hit = inputs.first().and_then(|input| input.hit),
            2 if !gesture.started => {
                gesture.pinch = match (span, self.touches.span()) {
                    (Some(before), Some(after)) if before > f32::EPSILON => Some(after / before),
                    _ => None,
                };
                gesture.twist = match (angle, self.touches.angle()) {
                    (Some(before), Some(after)) => Some(shortest_arc(before, after)),
                    _ => None,
                };
            }
            _ => {}
        }
        gesture
    }
}

fn touch(position: Vec2) -> PointerInfo {
    PointerInfo {
        kind: PointerKind::Touch,
        button: MouseButton::LEFT,
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: PointerId, x: f32, y: f32) -> XrInput {
        XrInput {
            id,
            position: Vec2::new(x, y),
            hit: None,
        }
    }

    #[test]
    fn pinch_reports_span_ratio() {
        let mut tracker = TouchTracker::new();
        let first = tracker.advance(&[input(1, -0.1, 0.0), input(2, 0.1, 0.0)]);
        assert!(first.started);
        assert_eq!(first.pinch, None);

        let second = tracker.advance(&[input(1, -0.2, 0.0), input(2, 0.2, 0.0)]);
        assert!(!second.started);
        assert!((second.pinch.unwrap() - 2.0).abs() < 1e-5);
        assert!(second.twist.unwrap().abs() < 1e-4);
    }

    #[test]
    fn twist_reports_turn_in_degrees() {
        let mut tracker = TouchTracker::new();
        tracker.advance(&[input(1, 0.0, 0.0), input(2, 1.0, 0.0)]);
        let gesture = tracker.advance(&[input(1, 0.0, 0.0), input(2, 0.0, 1.0)]);
        assert!((gesture.twist.unwrap() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn lifted_fingers_are_forgotten() {
        let mut tracker = TouchTracker::new();
        tracker.advance(&[input(1, 0.0, 0.0), input(2, 1.0, 0.0)]);
        let gesture = tracker.advance(&[input(2, 1.0, 0.0)]);
        assert_eq!(gesture.fingers, 1);
        assert!(gesture.started);
        assert_eq!(tracker.advance(&[]).fingers, 0);
    }

    #[test]
    fn large_touch_ids_stay_distinct() {
        let mut tracker = TouchTracker::new();
        let first = PointerId::MAX;
        let second = PointerId::MAX - 1;
        tracker.advance(&[input(first, 0.0, 0.0), input(second, 1.0, 0.0)]);
        let gesture = tracker.advance(&[input(first, 0.0, 0.0), input(second, 2.0, 0.0)]);
        assert_eq!(gesture.fingers, 2);
        assert!(!gesture.started);
        assert!((gesture.pinch.unwrap() - 2.0).abs() < 1e-5);

        let lifted = tracker.advance(&[input(second, 2.0, 0.0)]);
        assert_eq!(lifted.fingers, 1);
    }
}
