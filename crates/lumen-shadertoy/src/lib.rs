//! Full-screen shader toy.
//!
//! Feeds `iResolution` and `iGlobalTime` through the `ToyCB` uniform block to a
//! single pixel shader and draws it over the whole window every frame.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec2;

use lumen_engine::core::{App, AppControl, FrameCtx, LoadCtx};
use lumen_engine::input::{KeyboardEvent, KeyboardEventType, MouseEvent};
use lumen_engine::render::{
    BindLocation, BlendDesc, BlendState, CullMode, DepthStencilDesc, DepthStencilState, Filter,
    FullScreenPass, GraphicsState, GraphicsVars, RasterizerDesc, RasterizerState, RenderResult,
    ResourceKind, Sampler, SamplerDesc,
};

/// Fragment source used when no shader file is given.
pub const TOY_CONTAINER: &str = include_str!("../shaders/toy_container.wgsl");

/// Name of the uniform block the toy writes.
pub const TOY_CB: &str = "ToyCB";

const CLEAR: wgpu::Color = wgpu::Color::BLACK;

/// Where the toy's fragment stage comes from.
#[derive(Debug, Clone, Default)]
pub enum ToySource {
    #[default]
    Embedded,
    File(PathBuf),
}

/// GPU objects created in `on_load`.
struct ToyResources {
    state: GraphicsState,
    // Kept alive for shaders that declare samplers.
    _linear_sampler: Arc<Sampler>,
    pass: FullScreenPass,
    vars: GraphicsVars,
    toy_cb: BindLocation,
}

pub struct ShaderToy {
    source: ToySource,
    aspect_ratio: f32,
    resources: Option<ToyResources>,
}

impl ShaderToy {
    pub fn new(source: ToySource) -> Self {
        Self {
            source,
            aspect_ratio: 1.0,
            resources: None,
        }
    }

    /// Width over height of the swap chain, as of the last resize.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    fn create_pass(&self, device: &wgpu::Device) -> Result<FullScreenPass> {
        let pass = match &self.source {
            ToySource::Embedded => {
                FullScreenPass::from_source(device, "toy_container.wgsl", TOY_CONTAINER)
            }
            ToySource::File(path) => FullScreenPass::create(device, path),
        };
        pass.context("failed to create the toy pass")
    }
}

impl Default for ShaderToy {
    fn default() -> Self {
        Self::new(ToySource::Embedded)
    }
}

/// Fixed-function state of the toy: no culling, no depth test, opaque.
pub fn toy_state() -> GraphicsState {
    GraphicsState::new(
        RasterizerState::create(RasterizerDesc::default().set_cull_mode(CullMode::None)),
        DepthStencilState::create(DepthStencilDesc::default().set_depth_test(false)),
        BlendState::create(BlendDesc::default()),
    )
}

/// Trilinear sampler with 8x anisotropy.
pub fn linear_sampler_desc() -> SamplerDesc {
    SamplerDesc::default()
        .set_filter_mode(Filter::Linear, Filter::Linear, Filter::Linear)
        .set_max_anisotropy(8)
}

/// Looks up the `ToyCB` binding in the default parameter block.
pub fn find_toy_cb(vars: &GraphicsVars) -> Result<BindLocation> {
    vars.reflection()
        .default_parameter_block()
        .resource_binding(TOY_CB)
        .with_context(|| format!("shader does not declare the `{TOY_CB}` uniform block"))
}

/// Writes the per-frame toy uniforms.
pub fn write_toy_uniforms(
    vars: &mut GraphicsVars,
    toy_cb: BindLocation,
    (width, height): (u32, u32),
    time: f64,
) -> RenderResult<()> {
    let mut cb = vars.default_block_mut().constant_buffer(toy_cb, 0)?;
    cb.set("iResolution", Vec2::new(width as f32, height as f32))?;
    cb.set("iGlobalTime", time as f32)?;
    Ok(())
}

/// Binds `sampler` to every sampler the default parameter block declares.
fn bind_samplers(vars: &mut GraphicsVars, sampler: &Arc<Sampler>) -> RenderResult<()> {
    let names: Vec<String> = vars
        .reflection()
        .default_parameter_block()
        .resources()
        .iter()
        .filter(|r| matches!(r.kind, ResourceKind::Sampler { comparison: false }))
        .map(|r| r.name.clone())
        .collect();

    for name in names {
        vars.default_block_mut().set_sampler(&name, sampler)?;
    }
    Ok(())
}

impl App for ShaderToy {
    fn on_load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<()> {
        let state = toy_state();

        let linear_sampler = Sampler::create(ctx.device, linear_sampler_desc())
            .context("failed to create the linear sampler")?;

        let pass = self.create_pass(ctx.device)?;
        let mut vars = GraphicsVars::new(pass.program().reflector().clone());
        let toy_cb = find_toy_cb(&vars)?;
        bind_samplers(&mut vars, &linear_sampler)?;

        log::info!(
            "shader toy loaded `{}` ({}x{}, {:?})",
            pass.program().label(),
            ctx.size.0,
            ctx.size.1,
            ctx.surface_format
        );

        self.resources = Some(ToyResources {
            state,
            _linear_sampler: linear_sampler,
            pass,
            vars,
            toy_cb,
        });
        Ok(())
    }

    fn on_frame_render(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(res) = self.resources.as_mut() else {
            return AppControl::Continue;
        };
        let time = ctx.current_time();

        ctx.render(CLEAR, |rctx, target| {
            write_toy_uniforms(&mut res.vars, res.toy_cb, (target.width, target.height), time)?;
            res.pass.execute(rctx, target, &res.state, &mut res.vars)?;
            Ok(())
        })
    }

    fn on_shutdown(&mut self) {
        self.resources = None;
        log::info!("shader toy shut down");
    }

    fn on_key_event(&mut self, event: &KeyboardEvent) -> bool {
        if event.kind == KeyboardEventType::KeyPressed {
            log::trace!("key pressed: {:?}", event.key);
        }
        false
    }

    fn on_mouse_event(&mut self, _event: &MouseEvent) -> bool {
        false
    }

    fn on_resize_swap_chain(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect_ratio = width as f32 / height as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_engine::input::{Key, Modifiers, MouseEventType};
    use lumen_engine::render::UniformType;

    fn toy_vars(source: &str) -> GraphicsVars {
        let reflection = FullScreenPass::reflect("toy", source).expect("toy reflects");
        GraphicsVars::new(Arc::new(reflection))
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_updates_aspect_ratio() {
        let mut toy = ShaderToy::default();
        toy.on_resize_swap_chain(1280, 720);
        assert!((toy.aspect_ratio() - 1280.0 / 720.0).abs() < 1e-6);

        toy.on_resize_swap_chain(800, 800);
        assert_eq!(toy.aspect_ratio(), 1.0);
    }

    #[test]
    fn zero_height_resize_keeps_aspect_ratio() {
        let mut toy = ShaderToy::default();
        toy.on_resize_swap_chain(1920, 1080);
        let before = toy.aspect_ratio();
        toy.on_resize_swap_chain(1920, 0);
        assert_eq!(toy.aspect_ratio(), before);
    }

    // ── input ─────────────────────────────────────────────────────────────

    #[test]
    fn input_is_never_handled() {
        let mut toy = ShaderToy::default();
        for kind in [KeyboardEventType::KeyPressed, KeyboardEventType::KeyReleased] {
            let ev = KeyboardEvent {
                kind,
                key: Key::Space,
                modifiers: Modifiers::default(),
                repeat: false,
                codepoint: None,
            };
            assert!(!toy.on_key_event(&ev));
        }

        let mouse = MouseEvent {
            kind: MouseEventType::ButtonDown,
            button: None,
            pos: Vec2::new(0.5, 0.5),
            screen_pos: Vec2::new(640.0, 360.0),
            wheel_delta: Vec2::ZERO,
            modifiers: Modifiers::default(),
        };
        assert!(!toy.on_mouse_event(&mouse));
    }

    // ── toy container ─────────────────────────────────────────────────────

    #[test]
    fn container_declares_toy_cb_in_default_block() {
        let vars = toy_vars(TOY_CONTAINER);
        let loc = find_toy_cb(&vars).expect("ToyCB bound");
        assert_eq!(loc, BindLocation { group: 0, binding: 0 });

        let block = vars
            .reflection()
            .default_parameter_block()
            .uniform_block(loc)
            .expect("uniform block");
        let field = |name: &str| block.field(name).map(|f| (f.offset, f.ty));
        assert_eq!(field("iResolution"), Some((0, UniformType::Float2)));
        assert_eq!(field("iGlobalTime"), Some((8, UniformType::Float)));
    }

    #[test]
    fn missing_toy_cb_fails_load() {
        let source = "@fragment fn fs_main(in: FullScreenVarying) -> @location(0) vec4<f32> { return vec4<f32>(in.uv, 0.0, 1.0); }";
        let vars = toy_vars(source);
        assert!(find_toy_cb(&vars).is_err());
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn frame_uniforms_match_target_and_time() {
        let mut vars = toy_vars(TOY_CONTAINER);
        let loc = find_toy_cb(&vars).expect("ToyCB bound");

        write_toy_uniforms(&mut vars, loc, (1280, 720), 2.5).expect("write");
        let cb = vars.default_block_mut().constant_buffer(loc, 0).expect("cb");
        assert_eq!(cb.get::<Vec2>("iResolution").expect("res"), Vec2::new(1280.0, 720.0));
        assert_eq!(cb.get::<f32>("iGlobalTime").expect("time"), 2.5);
    }

    #[test]
    fn later_frames_overwrite_uniforms() {
        let mut vars = toy_vars(TOY_CONTAINER);
        let loc = find_toy_cb(&vars).expect("ToyCB bound");

        write_toy_uniforms(&mut vars, loc, (1280, 720), 1.0).expect("first");
        write_toy_uniforms(&mut vars, loc, (640, 480), 1.75).expect("second");

        let cb = vars.default_block_mut().constant_buffer(loc, 0).expect("cb");
        let bytes = cb.bytes();
        let res: [f32; 2] = bytemuck::pod_read_unaligned(&bytes[0..8]);
        let time: f32 = bytemuck::pod_read_unaligned(&bytes[8..12]);
        assert_eq!(res, [640.0, 480.0]);
        assert_eq!(time, 1.75);
    }

    // ── state ─────────────────────────────────────────────────────────────

    #[test]
    fn toy_state_is_no_cull_no_depth_opaque() {
        let state = toy_state();
        assert_eq!(state.rasterizer.desc().cull_mode, CullMode::None);
        assert!(!state.depth_stencil.desc().needs_attachment());
        assert_eq!(state.blend.desc(), BlendDesc::default());
    }

    #[test]
    fn linear_sampler_is_valid_with_anisotropy() {
        let desc = linear_sampler_desc();
        assert_eq!(desc.max_anisotropy, 8);
        assert!(desc.validate().is_ok());
    }
}
