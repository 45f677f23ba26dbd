use anyhow::Result;

use crate::input::{KeyboardEvent, MouseEvent};

use super::ctx::{FrameCtx, LoadCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Sample contract: the callbacks the runtime drives.
///
/// Order: `on_load` once, `on_resize_swap_chain` with the initial size, then
/// input and `on_frame_render` as they occur, and finally `on_shutdown` once.
pub trait App {
    /// Called once after the window and GPU exist, before the first frame.
    fn on_load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<()>;

    /// Called once per frame.
    fn on_frame_render(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once before the runtime exits.
    fn on_shutdown(&mut self) {}

    /// Returns `true` if the event was handled.
    fn on_key_event(&mut self, event: &KeyboardEvent) -> bool {
        let _ = event;
        false
    }

    /// Returns `true` if the event was handled.
    fn on_mouse_event(&mut self, event: &MouseEvent) -> bool {
        let _ = event;
        false
    }

    /// Called after the swap chain was resized. Sizes are physical pixels and non-zero.
    fn on_resize_swap_chain(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }
}
