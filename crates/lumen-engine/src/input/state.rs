use std::collections::HashSet;

use glam::Vec2;

use super::types::{Key, Modifiers, MouseButton, MouseEvent, MouseEventType};

/// Current input state for the window.
///
/// Tracks what platform events only report incrementally (modifiers, pointer
/// position) so translated events can be self-contained.
#[derive(Debug, Default)]
pub struct InputState {
    /// Current modifier state.
    pub modifiers: Modifiers,

    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in logical pixels.
    pub pointer_pos: Option<Vec2>,

    /// Window size in logical pixels.
    pub window_size: Vec2,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,
}

impl InputState {
    pub fn new(window_size: Vec2) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    /// Converts a logical position to window-normalized coordinates.
    ///
    /// A degenerate window (zero extent on an axis) maps that axis to 0.
    pub fn normalize(&self, screen_pos: Vec2) -> Vec2 {
        let axis = |v: f32, extent: f32| if extent > 0.0 { v / extent } else { 0.0 };
        Vec2::new(
            axis(screen_pos.x, self.window_size.x),
            axis(screen_pos.y, self.window_size.y),
        )
    }

    /// Builds a mouse event at the last known pointer position.
    pub fn mouse_event(
        &self,
        kind: MouseEventType,
        button: Option<MouseButton>,
        wheel_delta: Vec2,
    ) -> MouseEvent {
        let screen_pos = self.pointer_pos.unwrap_or(Vec2::ZERO);
        MouseEvent {
            kind,
            button,
            pos: self.normalize(screen_pos),
            screen_pos,
            wheel_delta,
            modifiers: self.modifiers,
        }
    }

    /// Records a key transition. Returns `false` for a press of a key already held.
    pub fn record_key(&mut self, key: Key, pressed: bool) -> bool {
        if pressed {
            self.keys_down.insert(key)
        } else {
            self.keys_down.remove(&key)
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            // Avoid stuck keys when focus changes mid-press.
            self.keys_down.clear();
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_window_corners() {
        let state = InputState::new(Vec2::new(1280.0, 720.0));
        assert_eq!(state.normalize(Vec2::ZERO), Vec2::ZERO);
        assert_eq!(state.normalize(Vec2::new(1280.0, 720.0)), Vec2::ONE);
        assert_eq!(state.normalize(Vec2::new(640.0, 180.0)), Vec2::new(0.5, 0.25));
    }

    #[test]
    fn normalize_degenerate_window_is_zero() {
        let state = InputState::new(Vec2::new(0.0, 100.0));
        assert_eq!(state.normalize(Vec2::new(50.0, 50.0)), Vec2::new(0.0, 0.5));
    }

    #[test]
    fn mouse_event_uses_last_pointer_position() {
        let mut state = InputState::new(Vec2::new(200.0, 100.0));
        state.pointer_pos = Some(Vec2::new(100.0, 25.0));
        state.modifiers.shift = true;

        let ev = state.mouse_event(MouseEventType::ButtonDown, Some(MouseButton::Left), Vec2::ZERO);
        assert_eq!(ev.screen_pos, Vec2::new(100.0, 25.0));
        assert_eq!(ev.pos, Vec2::new(0.5, 0.25));
        assert!(ev.modifiers.shift);
    }

    #[test]
    fn record_key_reports_first_press_only() {
        let mut state = InputState::default();
        assert!(state.record_key(Key::A, true));
        assert!(!state.record_key(Key::A, true));
        assert!(state.key_down(Key::A));
        assert!(state.record_key(Key::A, false));
        assert!(!state.key_down(Key::A));
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        state.record_key(Key::Space, true);
        state.set_focused(false);
        assert!(!state.key_down(Key::Space));
    }
}
