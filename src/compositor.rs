//! Stereo compositor geometry.
//!
//! One scale factor is shared by both eyes, while the horizontal anchor of
//! each eye and a common offset are adjusted independently, so the operator
//! can retune interocular placement while the graph keeps running. Every
//! mutation is immediately followed by a full recompute and push; nothing is
//! cached between pushes.

use crate::display::DisplayTarget;

pub const SCALE_MIN: i32 = 20;
pub const SCALE_MAX: i32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Mutable geometry state. Owned by [`CompositorController`] and mutated only
/// through its discrete step operations.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorState {
    /// Shared scale percent, kept within [`SCALE_MIN`, `SCALE_MAX`].
    pub scale_percent: i32,
    pub left_anchor_x: i32,
    pub right_anchor_x: i32,
    pub horizontal_offset: i32,
}

impl CompositorState {
    /// Initial state: left eye anchored at 0, right eye at half the display
    /// width, no offset.
    pub fn new(scale_percent: i32, display_width: u32) -> Self {
        Self {
            scale_percent,
            left_anchor_x: 0,
            right_anchor_x: display_width as i32 / 2,
            horizontal_offset: 0,
        }
    }

    /// Step the shared scale, clamped to the valid range.
    pub fn step_scale(&mut self, delta: i32) {
        self.scale_percent = (self.scale_percent + delta).clamp(SCALE_MIN, SCALE_MAX);
    }

    pub fn nudge_offset(&mut self, delta: i32) {
        self.horizontal_offset += delta;
    }

    /// Move the anchors symmetrically: the left anchor by `delta`, the right
    /// anchor by `-delta`. Their sum is invariant.
    pub fn adjust_anchors(&mut self, delta: i32) {
        self.left_anchor_x += delta;
        self.right_anchor_x -= delta;
    }
}

/// Placement computed for one eye. Derived on every change, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeGeometry {
    pub scaled_width: i32,
    pub scaled_height: i32,
    pub horizontal_pad: i32,
    pub vertical_pad: i32,
    pub x_position: i32,
    pub y_position: i32,
}

/// Where recomputed geometry is pushed. The live graph implements this; tests
/// substitute a recording double to check values and ordering.
pub trait GeometrySink {
    /// Momentarily lift the format constraint so renegotiation cannot
    /// deadlock against the previous, now-impossible format.
    fn clear_format(&mut self);
    fn set_format(&mut self, width: i32, height: i32);
    fn set_eye_position(&mut self, eye: Eye, x: i32, y: i32);
}

/// Owns the geometry state and pushes it into the live graph on every change.
pub struct CompositorController {
    state: CompositorState,
    per_eye_width: i32,
    per_eye_height: i32,
}

impl CompositorController {
    pub fn new(initial_scale: i32, target: &DisplayTarget) -> Self {
        Self {
            state: CompositorState::new(initial_scale, target.width),
            per_eye_width: target.width as i32 / 2,
            per_eye_height: target.height as i32,
        }
    }

    pub fn state(&self) -> &CompositorState {
        &self.state
    }

    /// Apply a state mutation, then recompute and push in one step.
    pub fn update<F>(&mut self, sink: &mut dyn GeometrySink, mutate: F) -> [EyeGeometry; 2]
    where
        F: FnOnce(&mut CompositorState),
    {
        mutate(&mut self.state);
        self.apply(sink)
    }

    /// Recompute both eyes and push the result into the graph. The push is
    /// ordered: clear the format constraint, install the new one, then set
    /// the per-eye positions.
    pub fn apply(&mut self, sink: &mut dyn GeometrySink) -> [EyeGeometry; 2] {
        let left = self.eye_geometry(self.state.left_anchor_x);
        let right = self.eye_geometry(self.state.right_anchor_x);

        sink.clear_format();
        sink.set_format(left.scaled_width, left.scaled_height);
        sink.set_eye_position(Eye::Left, left.x_position, left.y_position);
        sink.set_eye_position(Eye::Right, right.x_position, right.y_position);

        [left, right]
    }

    fn eye_geometry(&self, anchor_x: i32) -> EyeGeometry {
        let scaled_width = self.per_eye_width * self.state.scale_percent / 100;
        let scaled_height = self.per_eye_height * self.state.scale_percent / 100;
        let horizontal_pad = (self.per_eye_width - scaled_width) / 2;
        let vertical_pad = (self.per_eye_height - scaled_height) / 2;
        EyeGeometry {
            scaled_width,
            scaled_height,
            horizontal_pad,
            vertical_pad,
            x_position: anchor_x + self.state.horizontal_offset + horizontal_pad,
            y_position: vertical_pad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DisplayTarget {
        DisplayTarget {
            width: 1920,
            height: 1080,
            origin_x: 0,
            origin_y: 0,
            output_name: "HDMI1".to_string(),
        }
    }

    /// Records every push in call order.
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<String>,
    }

    impl GeometrySink for RecordingSink {
        fn clear_format(&mut self) {
            self.calls.push("clear".to_string());
        }

        fn set_format(&mut self, width: i32, height: i32) {
            self.calls.push(format!("format {width}x{height}"));
        }

        fn set_eye_position(&mut self, eye: Eye, x: i32, y: i32) {
            self.calls.push(format!("{eye:?} {x},{y}"));
        }
    }

    #[test]
    fn test_full_scale_geometry() {
        let mut controller = CompositorController::new(100, &target());
        let mut sink = RecordingSink::default();
        let [left, right] = controller.apply(&mut sink);
        assert_eq!(
            left,
            EyeGeometry {
                scaled_width: 960,
                scaled_height: 1080,
                horizontal_pad: 0,
                vertical_pad: 0,
                x_position: 0,
                y_position: 0,
            }
        );
        assert_eq!(right.x_position, 960);
    }

    #[test]
    fn test_half_scale_geometry() {
        let mut controller = CompositorController::new(50, &target());
        let mut sink = RecordingSink::default();
        let [left, _] = controller.apply(&mut sink);
        assert_eq!(left.scaled_width, 480);
        assert_eq!(left.scaled_height, 540);
        assert_eq!(left.horizontal_pad, 240);
        assert_eq!(left.vertical_pad, 270);
        assert_eq!(left.x_position, 240);
        assert_eq!(left.y_position, 270);
    }

    #[test]
    fn test_scale_clamped_at_floor() {
        let mut state = CompositorState::new(25, 1920);
        state.step_scale(-5);
        assert_eq!(state.scale_percent, 20);
        state.step_scale(-5);
        assert_eq!(state.scale_percent, 20);
    }

    #[test]
    fn test_scale_clamped_at_ceiling() {
        let mut state = CompositorState::new(115, 1920);
        state.step_scale(5);
        assert_eq!(state.scale_percent, 120);
        state.step_scale(5);
        assert_eq!(state.scale_percent, 120);
    }

    #[test]
    fn test_anchor_sum_is_invariant() {
        let mut state = CompositorState::new(100, 1920);
        let sum = state.left_anchor_x + state.right_anchor_x;
        for delta in [-1, -1, 1, -1, 1, 1, 1] {
            state.adjust_anchors(delta);
            assert_eq!(state.left_anchor_x + state.right_anchor_x, sum);
        }
        assert_eq!(state.left_anchor_x, 1);
        assert_eq!(state.right_anchor_x, 959);
    }

    #[test]
    fn test_offset_shifts_both_eyes() {
        let mut controller = CompositorController::new(100, &target());
        let mut sink = RecordingSink::default();
        let [left, right] = controller.update(&mut sink, |state| state.nudge_offset(4));
        assert_eq!(left.x_position, 4);
        assert_eq!(right.x_position, 964);
    }

    #[test]
    fn test_update_mutates_owned_state() {
        let mut controller = CompositorController::new(100, &target());
        let mut sink = RecordingSink::default();
        controller.update(&mut sink, |state| state.step_scale(5));
        controller.update(&mut sink, |state| state.step_scale(5));
        controller.update(&mut sink, |state| state.step_scale(5));
        controller.update(&mut sink, |state| state.step_scale(5));
        controller.update(&mut sink, |state| state.step_scale(5));
        assert_eq!(controller.state().scale_percent, 120);
    }

    #[test]
    fn test_push_ordering_clear_then_format_then_positions() {
        let mut controller = CompositorController::new(100, &target());
        let mut sink = RecordingSink::default();
        controller.apply(&mut sink);
        assert_eq!(
            sink.calls,
            vec!["clear", "format 960x1080", "Left 0,0", "Right 960,0"]
        );
    }

    #[test]
    fn test_apply_is_idempotent_but_never_suppressed() {
        let mut controller = CompositorController::new(100, &target());
        let mut sink = RecordingSink::default();
        let first = controller.apply(&mut sink);
        let second = controller.apply(&mut sink);
        assert_eq!(first, second);
        // Both pushes issued the full clear-then-set sequence.
        assert_eq!(sink.calls.len(), 8);
        assert_eq!(sink.calls[0], sink.calls[4]);
    }
}
