use std::fmt;

use glam::Vec2;

/// Keyboard key identifier.
///
/// The runtime maps platform key codes into these variants where possible.
/// For unsupported keys, `Key::Unknown(u32)` carries the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,
    Meta,

    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Modifier keys state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyboardEventType {
    KeyPressed,
    KeyReleased,
    /// Committed text; `KeyboardEvent::codepoint` is set.
    Input,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyboardEvent {
    pub kind: KeyboardEventType,
    pub key: Key,
    pub modifiers: Modifiers,
    pub repeat: bool,
    pub codepoint: Option<char>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseEventType {
    ButtonDown,
    ButtonUp,
    Move,
    Wheel,
}

/// Mouse event.
///
/// `pos` is normalized to the window (`[0, 1]` on both axes, top-left origin);
/// `screen_pos` is in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventType,
    pub button: Option<MouseButton>,
    pub pos: Vec2,
    pub screen_pos: Vec2,
    /// Wheel delta in lines; zero for non-wheel events.
    pub wheel_delta: Vec2,
    pub modifiers: Modifiers,
}

/// Translated input event, ready for app dispatch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    Keyboard(KeyboardEvent),
    Mouse(MouseEvent),
}
