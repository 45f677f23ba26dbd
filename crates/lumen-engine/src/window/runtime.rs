use anyhow::{Context, Result};
use glam::Vec2;
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, LoadCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputEvent, InputState, Key, KeyboardEvent, KeyboardEventType};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    /// Logical pixels.
    pub height: u32,
    pub resizable: bool,
    pub gpu: GpuInit,
    /// Raw command line, forwarded to the app.
    pub args: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
            gpu: GpuInit::default(),
            args: Vec::new(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, drives `app` until it exits, and returns the load
    /// error if `on_load` failed.
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.load_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    app: A,

    entry: Option<WindowEntry>,
    load_error: Option<anyhow::Error>,
    shut_down: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app,
            entry: None,
            load_error: None,
            shut_down: false,
        }
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let logical = window.inner_size().to_logical::<f32>(window.scale_factor());
        let gpu_init = self.config.gpu.clone();

        WindowEntryTryBuilder {
            input_state: InputState::new(Vec2::new(logical.width, logical.height)),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| {
                pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed for window")
            },
        }
        .try_build()
    }

    /// Calls `on_load`, then reports the initial swap-chain size.
    fn load(&mut self) -> Result<()> {
        let (app, args) = (&mut self.app, self.config.args.as_slice());
        let Some(entry) = self.entry.as_ref() else {
            return Ok(());
        };

        let size = entry.with_gpu(|gpu| {
            let size = gpu.size();
            let mut ctx = LoadCtx {
                device: gpu.device(),
                queue: gpu.queue(),
                surface_format: gpu.surface_format(),
                size: (size.width, size.height),
                args,
            };
            app.on_load(&mut ctx).map(|()| size)
        })?;

        forward_resize(app, size);
        Ok(())
    }

    /// Runs `on_shutdown` once, releases the window, and stops the loop.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if !self.shut_down {
            self.shut_down = true;
            if self.load_error.is_none() {
                self.app.on_shutdown();
            }
            self.entry = None;
            log::info!("runtime shut down");
        }
        event_loop.exit();
    }

    fn dispatch_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Keyboard(key) => {
                let handled = self.app.on_key_event(&key);
                closes_on_unhandled(&key, handled)
            }
            InputEvent::Mouse(mouse) => {
                self.app.on_mouse_event(&mouse);
                false
            }
        }
    }

    fn resize(&mut self) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        let new_size = entry.with_window(|w| w.inner_size());
        entry.with_gpu_mut(|gpu| gpu.resize(new_size));
        entry.with_window(|w| w.request_redraw());

        if forward_resize(&mut self.app, new_size) {
            log::debug!("swap chain resized to {}x{}", new_size.width, new_size.height);
        }
    }

    fn redraw(&mut self, window_id: WindowId) -> AppControl {
        let (app, args) = (&mut self.app, self.config.args.as_slice());
        let Some(entry) = self.entry.as_mut() else {
            return AppControl::Continue;
        };

        entry.with_mut(|fields| {
            let ft: FrameTime = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: fields.window,
                },
                gpu: fields.gpu,
                time: ft,
                args,
            };
            app.on_frame_render(&mut ctx)
        })
    }
}

/// Reports a swap-chain size to the app. Zero sizes are dropped.
///
/// Returns whether `on_resize_swap_chain` was called.
fn forward_resize<A: App>(app: &mut A, size: PhysicalSize<u32>) -> bool {
    if size.width == 0 || size.height == 0 {
        return false;
    }
    app.on_resize_swap_chain(size.width, size.height);
    true
}

/// Unhandled Escape presses close the window.
fn closes_on_unhandled(event: &KeyboardEvent, handled: bool) -> bool {
    !handled && event.kind == KeyboardEventType::KeyPressed && event.key == Key::Escape
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.shut_down {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => self.entry = Some(entry),
            Err(e) => {
                log::error!("failed to create initial window: {e:#}");
                self.load_error = Some(e);
                self.shutdown(event_loop);
                return;
            }
        }

        if let Err(e) = self.load() {
            log::error!("on_load failed: {e:#}");
            self.load_error = Some(e);
            self.shutdown(event_loop);
            return;
        }

        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.shut_down {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Poll);

        // Continuous redraw.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.shut_down {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let translated = entry.with_mut(|fields| {
            translate_window_event(fields.window, fields.input_state, &event)
        });

        if let Some(ev) = translated {
            if self.dispatch_input(ev) {
                log::info!("escape pressed, closing window");
                self.shutdown(event_loop);
                return;
            }
        }

        match &event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.resize(),

            WindowEvent::RedrawRequested => {
                if self.redraw(window_id) == AppControl::Exit {
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown(event_loop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn key(kind: KeyboardEventType, key: Key) -> KeyboardEvent {
        KeyboardEvent {
            kind,
            key,
            modifiers: Modifiers::default(),
            repeat: false,
            codepoint: None,
        }
    }

    // ── RuntimeConfig ─────────────────────────────────────────────────────

    #[test]
    fn default_config_is_resizable_720p_with_vsync() {
        let cfg = RuntimeConfig::default();
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert!(cfg.resizable);
        assert!(cfg.gpu.vsync);
        assert!(cfg.args.is_empty());
    }

    // ── Escape handling ───────────────────────────────────────────────────

    #[test]
    fn unhandled_escape_press_closes() {
        let ev = key(KeyboardEventType::KeyPressed, Key::Escape);
        assert!(closes_on_unhandled(&ev, false));
    }

    #[test]
    fn handled_escape_does_not_close() {
        let ev = key(KeyboardEventType::KeyPressed, Key::Escape);
        assert!(!closes_on_unhandled(&ev, true));
    }

    #[test]
    fn escape_release_and_other_keys_do_not_close() {
        assert!(!closes_on_unhandled(&key(KeyboardEventType::KeyReleased, Key::Escape), false));
        assert!(!closes_on_unhandled(&key(KeyboardEventType::KeyPressed, Key::Space), false));
    }

    // ── resize forwarding ─────────────────────────────────────────────────

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        sizes: Vec<(u32, u32)>,
    }

    impl App for Recorder {
        fn on_load(&mut self, _ctx: &mut LoadCtx<'_>) -> Result<()> {
            self.calls.push("load");
            Ok(())
        }

        fn on_frame_render(&mut self, _ctx: &mut FrameCtx<'_, '_>) -> AppControl {
            self.calls.push("frame");
            AppControl::Continue
        }

        fn on_resize_swap_chain(&mut self, width: u32, height: u32) {
            self.calls.push("resize");
            self.sizes.push((width, height));
        }
    }

    #[test]
    fn initial_size_is_forwarded() {
        let mut app = Recorder::default();
        assert!(forward_resize(&mut app, PhysicalSize::new(1280, 720)));
        assert_eq!(app.calls, ["resize"]);
        assert_eq!(app.sizes, [(1280, 720)]);
    }

    #[test]
    fn zero_sizes_are_not_forwarded() {
        let mut app = Recorder::default();
        assert!(!forward_resize(&mut app, PhysicalSize::new(0, 0)));
        assert!(!forward_resize(&mut app, PhysicalSize::new(1280, 0)));
        assert!(!forward_resize(&mut app, PhysicalSize::new(0, 720)));
        assert!(app.calls.is_empty());
    }

    #[test]
    fn resizes_arrive_in_order() {
        let mut app = Recorder::default();
        forward_resize(&mut app, PhysicalSize::new(1280, 720));
        forward_resize(&mut app, PhysicalSize::new(0, 0));
        forward_resize(&mut app, PhysicalSize::new(800, 600));
        assert_eq!(app.sizes, [(1280, 720), (800, 600)]);
    }
}
