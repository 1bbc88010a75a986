//! Corner-handle editing: hit testing, drag sessions, and the edit-mode
//! toggle. Owns the destination quad; the view recomputes the mapping
//! whenever a drag step reports a geometry change.

use crate::events::{PointerEvent, PointerPhase};
use crate::geometry::{Point, Quad};

/// Editor state. `Dragging` is only reachable while edit mode is enabled and a
/// pointer is down inside a handle's hit radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Handles hidden, dragging impossible; pointer events pass through.
    Disabled,
    /// Edit mode on, no active drag.
    Idle,
    /// One corner follows the pointer by delta accumulation.
    Dragging(usize),
}

/// Outcome of feeding one pointer event to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorResponse {
    /// Whether the event was consumed (a drag started, moved, or ended).
    pub consumed: bool,
    /// Whether a corner moved, requiring a mapping recompute and redraw.
    pub geometry_changed: bool,
}

impl EditorResponse {
    const PASS: Self = Self {
        consumed: false,
        geometry_changed: false,
    };
}

#[derive(Debug)]
pub struct HandleEditor {
    quad: Quad,
    state: EditorState,
    hit_radius: f64,
    last_pointer: Point,
}

impl HandleEditor {
    pub fn new(view_w: f64, view_h: f64, hit_radius: f64) -> Self {
        Self {
            quad: Quad::from_rect(view_w, view_h),
            state: EditorState::Disabled,
            hit_radius,
            last_pointer: Point::new(0.0, 0.0),
        }
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn edit_enabled(&self) -> bool {
        self.state != EditorState::Disabled
    }

    /// Reset corners to the view's bounding rectangle. Any drag in flight is
    /// cancelled; the edit-mode flag is kept.
    pub fn reset_to_rect(&mut self, view_w: f64, view_h: f64) {
        self.quad = Quad::from_rect(view_w, view_h);
        if matches!(self.state, EditorState::Dragging(_)) {
            self.state = EditorState::Idle;
        }
    }

    /// Double-tap: flip edit mode and cancel any in-flight drag.
    pub fn toggle(&mut self) {
        self.state = match self.state {
            EditorState::Disabled => EditorState::Idle,
            EditorState::Idle | EditorState::Dragging(_) => EditorState::Disabled,
        };
    }

    /// Nearest handle within the hit radius; exact distance ties go to the
    /// lowest index in corner order.
    fn hit_test(&self, p: Point) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, corner) in self.quad.corners.iter().enumerate() {
            let d = p.distance_to(*corner);
            if d <= self.hit_radius && best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Feed one pointer event through the state machine.
    pub fn on_pointer(&mut self, ev: PointerEvent) -> EditorResponse {
        let p = Point::new(ev.x, ev.y);
        match (self.state, ev.phase) {
            (EditorState::Disabled, _) => EditorResponse::PASS,

            (EditorState::Idle, PointerPhase::Down) => match self.hit_test(p) {
                Some(i) => {
                    self.state = EditorState::Dragging(i);
                    self.last_pointer = p;
                    EditorResponse {
                        consumed: true,
                        geometry_changed: false,
                    }
                }
                None => EditorResponse::PASS,
            },
            (EditorState::Idle, _) => EditorResponse::PASS,

            (EditorState::Dragging(i), PointerPhase::Moved) => {
                // Delta accumulation: the touch point need not sit on the
                // handle center.
                let dx = p.x - self.last_pointer.x;
                let dy = p.y - self.last_pointer.y;
                self.quad.corners[i].x += dx;
                self.quad.corners[i].y += dy;
                self.last_pointer = p;
                EditorResponse {
                    consumed: true,
                    geometry_changed: dx != 0.0 || dy != 0.0,
                }
            }
            (EditorState::Dragging(_), PointerPhase::Up | PointerPhase::Cancelled) => {
                self.state = EditorState::Idle;
                EditorResponse {
                    consumed: true,
                    geometry_changed: false,
                }
            }
            (EditorState::Dragging(_), PointerPhase::Down) => {
                // Single-drag model: a second down while dragging is ignored.
                EditorResponse {
                    consumed: true,
                    geometry_changed: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(phase: PointerPhase, x: f64, y: f64) -> PointerEvent {
        PointerEvent { phase, x, y }
    }

    fn editor_in_edit_mode() -> HandleEditor {
        let mut ed = HandleEditor::new(200.0, 100.0, 40.0);
        ed.toggle();
        ed
    }

    #[test]
    fn double_tap_toggles_edit_mode() {
        let mut ed = HandleEditor::new(200.0, 100.0, 40.0);
        assert_eq!(ed.state(), EditorState::Disabled);
        ed.toggle();
        assert_eq!(ed.state(), EditorState::Idle);
        ed.toggle();
        assert_eq!(ed.state(), EditorState::Disabled);
    }

    #[test]
    fn toggle_cancels_in_flight_drag() {
        let mut ed = editor_in_edit_mode();
        ed.on_pointer(ev(PointerPhase::Down, 2.0, 3.0));
        assert_eq!(ed.state(), EditorState::Dragging(0));
        ed.toggle();
        assert_eq!(ed.state(), EditorState::Disabled);
    }

    #[test]
    fn events_pass_through_while_disabled() {
        let mut ed = HandleEditor::new(200.0, 100.0, 40.0);
        let r = ed.on_pointer(ev(PointerPhase::Down, 0.0, 0.0));
        assert!(!r.consumed);
        assert_eq!(ed.state(), EditorState::Disabled);
    }

    #[test]
    fn drag_moves_only_the_grabbed_corner_by_the_delta() {
        let mut ed = editor_in_edit_mode();
        let before = *ed.quad();

        ed.on_pointer(ev(PointerPhase::Down, 195.0, 5.0)); // near top-right
        assert_eq!(ed.state(), EditorState::Dragging(1));
        let r = ed.on_pointer(ev(PointerPhase::Moved, 188.0, 17.0));
        assert!(r.consumed && r.geometry_changed);
        ed.on_pointer(ev(PointerPhase::Up, 188.0, 17.0));
        assert_eq!(ed.state(), EditorState::Idle);

        let after = *ed.quad();
        assert!((after.corners[1].x - (before.corners[1].x - 7.0)).abs() < 1e-9);
        assert!((after.corners[1].y - (before.corners[1].y + 12.0)).abs() < 1e-9);
        for i in [0, 2, 3] {
            assert_eq!(after.corners[i], before.corners[i]);
        }
    }

    #[test]
    fn nearest_handle_wins_when_several_are_in_radius() {
        // Small view: (0,0) and (50,0) are both within a 40px radius of the
        // touch point, but top-right is closer.
        let mut ed = HandleEditor::new(50.0, 50.0, 40.0);
        ed.toggle();
        ed.on_pointer(ev(PointerPhase::Down, 45.0, 0.0));
        assert_eq!(ed.state(), EditorState::Dragging(1));
    }

    #[test]
    fn miss_leaves_event_unconsumed() {
        let mut ed = editor_in_edit_mode();
        let r = ed.on_pointer(ev(PointerPhase::Down, 100.0, 50.0));
        assert!(!r.consumed);
        assert_eq!(ed.state(), EditorState::Idle);
    }

    #[test]
    fn cancel_ends_the_drag() {
        let mut ed = editor_in_edit_mode();
        ed.on_pointer(ev(PointerPhase::Down, 0.0, 100.0));
        assert_eq!(ed.state(), EditorState::Dragging(3));
        let r = ed.on_pointer(ev(PointerPhase::Cancelled, 0.0, 100.0));
        assert!(r.consumed);
        assert_eq!(ed.state(), EditorState::Idle);
    }

    #[test]
    fn resize_resets_corners_to_view_rect() {
        let mut ed = editor_in_edit_mode();
        ed.on_pointer(ev(PointerPhase::Down, 0.0, 0.0));
        ed.on_pointer(ev(PointerPhase::Moved, 30.0, 30.0));
        ed.reset_to_rect(640.0, 480.0);
        assert_eq!(*ed.quad(), Quad::from_rect(640.0, 480.0));
        assert_eq!(ed.state(), EditorState::Idle);
    }
}
