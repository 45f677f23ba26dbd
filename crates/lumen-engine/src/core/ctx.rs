use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{RenderCtx, RenderTarget};
use crate::time::FrameTime;

use super::app::AppControl;

/// Context passed to `App::on_load`.
pub struct LoadCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Physical pixels.
    pub size: (u32, u32),
    /// Raw command line, program name included.
    pub args: &'a [String],
}

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(self.window.scale_factor());
        (logi.width as f32, logi.height as f32)
    }
}

/// Per-frame context passed to `App::on_frame_render`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub args: &'a [String],
}

impl FrameCtx<'_, '_> {
    /// Seconds since the sample started.
    pub fn current_time(&self) -> f64 {
        self.time.elapsed
    }

    /// Acquires the surface, clears it with `clear`, calls `draw` with a ready
    /// [`RenderCtx`] and [`RenderTarget`], then presents the frame.
    ///
    /// A `draw` error is logged and turns into [`AppControl::Exit`].
    pub fn render<F>(&mut self, clear: wgpu::Color, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>) -> anyhow::Result<()>,
    {
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return AppControl::Continue;
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                log::warn!("surface error: {err}");
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        let Some(extent) = target_size(self.gpu.size(), frame.surface_texture.texture.size())
        else {
            return AppControl::Continue;
        };
        let depth = self.gpu.depth_target();

        // Clear pass; dropped before the encoder is used again.
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: depth.map(|d| wgpu::RenderPassDepthStencilAttachment {
                    view: d.view,
                    depth_ops: d.format.has_depth_aspect().then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: d.format.has_stencil_aspect().then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let rctx = RenderCtx::new(self.gpu.device(), self.gpu.queue());

        // RenderTarget borrows frame.encoder; dropped before submit() takes frame.
        let result = {
            let mut target = RenderTarget::new(
                &mut frame.encoder,
                &frame.view,
                self.gpu.surface_format(),
                extent,
            )
            .with_depth(depth);
            draw(&rctx, &mut target)
        };

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        match result {
            Ok(()) => AppControl::Continue,
            Err(e) => {
                log::error!("frame render failed: {e:#}");
                AppControl::Exit
            }
        }
    }
}

/// Size a frame renders at: the acquired texture's extent.
///
/// `None` while the window is minimized (zero cached size) or for an empty texture;
/// the frame is then skipped.
fn target_size(cached: PhysicalSize<u32>, texture: wgpu::Extent3d) -> Option<(u32, u32)> {
    let minimized = cached.width == 0 || cached.height == 0;
    let empty = texture.width == 0 || texture.height == 0;
    (!minimized && !empty).then_some((texture.width, texture.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    // ── target size ───────────────────────────────────────────────────────

    #[test]
    fn target_uses_texture_extent() {
        let cached = PhysicalSize::new(1280, 720);
        assert_eq!(target_size(cached, extent(1280, 720)), Some((1280, 720)));
        // The texture wins when the cache ran ahead of a reconfigure.
        assert_eq!(target_size(cached, extent(1024, 768)), Some((1024, 768)));
    }

    #[test]
    fn minimized_window_skips_frame() {
        assert_eq!(target_size(PhysicalSize::new(0, 0), extent(1280, 720)), None);
        assert_eq!(target_size(PhysicalSize::new(1280, 0), extent(1280, 720)), None);
    }

    #[test]
    fn empty_texture_skips_frame() {
        assert_eq!(target_size(PhysicalSize::new(1280, 720), extent(0, 720)), None);
    }
}
