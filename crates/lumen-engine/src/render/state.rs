//! Fixed-function pipeline state.
//!
//! States are immutable once created and shared through `Arc`. Their descriptors
//! are hashable so pipelines can be cached per state combination.

use std::sync::Arc;

// ── rasterizer ────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

/// `Wireframe` needs `wgpu::Features::POLYGON_MODE_LINE` on the device.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

/// Rasterizer descriptor.
///
/// Defaults: back-face culling, solid fill, clockwise front faces.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RasterizerDesc {
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
    pub front_ccw: bool,
    pub conservative: bool,
}

impl RasterizerDesc {
    pub fn set_cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    pub fn set_fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn set_front_counter_cw(mut self, ccw: bool) -> Self {
        self.front_ccw = ccw;
        self
    }

    pub(crate) fn to_wgpu(self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: if self.front_ccw {
                wgpu::FrontFace::Ccw
            } else {
                wgpu::FrontFace::Cw
            },
            cull_mode: match self.cull_mode {
                CullMode::None => None,
                CullMode::Front => Some(wgpu::Face::Front),
                CullMode::Back => Some(wgpu::Face::Back),
            },
            polygon_mode: match self.fill_mode {
                FillMode::Solid => wgpu::PolygonMode::Fill,
                FillMode::Wireframe => wgpu::PolygonMode::Line,
            },
            unclipped_depth: false,
            conservative: self.conservative,
        }
    }
}

#[derive(Debug)]
pub struct RasterizerState {
    desc: RasterizerDesc,
}

impl RasterizerState {
    pub fn create(desc: RasterizerDesc) -> Arc<Self> {
        Arc::new(Self { desc })
    }

    pub fn desc(&self) -> RasterizerDesc {
        self.desc
    }
}

// ── depth / stencil ───────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComparisonFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl ComparisonFunc {
    fn to_wgpu(self) -> wgpu::CompareFunction {
        match self {
            Self::Never => wgpu::CompareFunction::Never,
            Self::Less => wgpu::CompareFunction::Less,
            Self::Equal => wgpu::CompareFunction::Equal,
            Self::LessEqual => wgpu::CompareFunction::LessEqual,
            Self::Greater => wgpu::CompareFunction::Greater,
            Self::NotEqual => wgpu::CompareFunction::NotEqual,
            Self::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            Self::Always => wgpu::CompareFunction::Always,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increase,
    IncreaseSaturate,
    Decrease,
    DecreaseSaturate,
    Invert,
}

impl StencilOp {
    fn to_wgpu(self) -> wgpu::StencilOperation {
        match self {
            Self::Keep => wgpu::StencilOperation::Keep,
            Self::Zero => wgpu::StencilOperation::Zero,
            Self::Replace => wgpu::StencilOperation::Replace,
            Self::Increase => wgpu::StencilOperation::IncrementWrap,
            Self::IncreaseSaturate => wgpu::StencilOperation::IncrementClamp,
            Self::Decrease => wgpu::StencilOperation::DecrementWrap,
            Self::DecreaseSaturate => wgpu::StencilOperation::DecrementClamp,
            Self::Invert => wgpu::StencilOperation::Invert,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StencilFaceDesc {
    pub func: ComparisonFunc,
    pub stencil_fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub depth_stencil_pass_op: StencilOp,
}

impl Default for StencilFaceDesc {
    fn default() -> Self {
        Self {
            func: ComparisonFunc::Always,
            stencil_fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            depth_stencil_pass_op: StencilOp::Keep,
        }
    }
}

impl StencilFaceDesc {
    fn to_wgpu(self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.func.to_wgpu(),
            fail_op: self.stencil_fail_op.to_wgpu(),
            depth_fail_op: self.depth_fail_op.to_wgpu(),
            pass_op: self.depth_stencil_pass_op.to_wgpu(),
        }
    }
}

/// Depth-stencil descriptor.
///
/// Defaults: depth test and write enabled with `Less`, stencil disabled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: ComparisonFunc,
    pub stencil_test: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub stencil_front: StencilFaceDesc,
    pub stencil_back: StencilFaceDesc,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: ComparisonFunc::Less,
            stencil_test: false,
            stencil_read_mask: u8::MAX,
            stencil_write_mask: u8::MAX,
            stencil_front: StencilFaceDesc::default(),
            stencil_back: StencilFaceDesc::default(),
        }
    }
}

impl DepthStencilDesc {
    pub fn set_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn set_depth_write(mut self, enabled: bool) -> Self {
        self.depth_write = enabled;
        self
    }

    pub fn set_depth_func(mut self, func: ComparisonFunc) -> Self {
        self.depth_func = func;
        self
    }

    pub fn set_stencil_test(mut self, enabled: bool) -> Self {
        self.stencil_test = enabled;
        self
    }

    pub fn set_stencil_faces(mut self, front: StencilFaceDesc, back: StencilFaceDesc) -> Self {
        self.stencil_front = front;
        self.stencil_back = back;
        self
    }

    /// Whether draws with this state need a depth-stencil attachment.
    pub fn needs_attachment(&self) -> bool {
        self.depth_test || self.stencil_test
    }

    /// `None` when neither depth nor stencil testing is enabled.
    pub(crate) fn to_wgpu(self, format: wgpu::TextureFormat) -> Option<wgpu::DepthStencilState> {
        if !self.needs_attachment() {
            return None;
        }

        let (depth_write_enabled, depth_compare) = if self.depth_test {
            (self.depth_write, self.depth_func.to_wgpu())
        } else {
            (false, wgpu::CompareFunction::Always)
        };

        let stencil = if self.stencil_test {
            wgpu::StencilState {
                front: self.stencil_front.to_wgpu(),
                back: self.stencil_back.to_wgpu(),
                read_mask: u32::from(self.stencil_read_mask),
                write_mask: u32::from(self.stencil_write_mask),
            }
        } else {
            wgpu::StencilState::default()
        };

        Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled,
            depth_compare,
            stencil,
            bias: wgpu::DepthBiasState::default(),
        })
    }
}

#[derive(Debug)]
pub struct DepthStencilState {
    desc: DepthStencilDesc,
}

impl DepthStencilState {
    pub fn create(desc: DepthStencilDesc) -> Arc<Self> {
        Arc::new(Self { desc })
    }

    pub fn desc(&self) -> DepthStencilDesc {
        self.desc
    }
}

// ── blend ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
    BlendConstant,
    OneMinusBlendConstant,
}

impl BlendFactor {
    fn to_wgpu(self) -> wgpu::BlendFactor {
        match self {
            Self::Zero => wgpu::BlendFactor::Zero,
            Self::One => wgpu::BlendFactor::One,
            Self::SrcColor => wgpu::BlendFactor::Src,
            Self::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            Self::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            Self::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            Self::DstColor => wgpu::BlendFactor::Dst,
            Self::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            Self::DstAlpha => wgpu::BlendFactor::DstAlpha,
            Self::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
            Self::SrcAlphaSaturate => wgpu::BlendFactor::SrcAlphaSaturated,
            Self::BlendConstant => wgpu::BlendFactor::Constant,
            Self::OneMinusBlendConstant => wgpu::BlendFactor::OneMinusConstant,
        }
    }
}

/// `Min` and `Max` ignore the factors; wgpu requires them to be `One`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendOp {
    fn to_wgpu(self) -> wgpu::BlendOperation {
        match self {
            Self::Add => wgpu::BlendOperation::Add,
            Self::Subtract => wgpu::BlendOperation::Subtract,
            Self::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            Self::Min => wgpu::BlendOperation::Min,
            Self::Max => wgpu::BlendOperation::Max,
        }
    }
}

/// Color channel write mask as `[r, g, b, a]`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WriteMask(pub [bool; 4]);

impl Default for WriteMask {
    fn default() -> Self {
        Self([true; 4])
    }
}

impl WriteMask {
    fn to_wgpu(self) -> wgpu::ColorWrites {
        let [r, g, b, a] = self.0;
        let mut writes = wgpu::ColorWrites::empty();
        if r {
            writes |= wgpu::ColorWrites::RED;
        }
        if g {
            writes |= wgpu::ColorWrites::GREEN;
        }
        if b {
            writes |= wgpu::ColorWrites::BLUE;
        }
        if a {
            writes |= wgpu::ColorWrites::ALPHA;
        }
        writes
    }
}

/// Blend descriptor for the single color target.
///
/// Default is opaque: blending disabled, all channels written.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendDesc {
    pub enabled: bool,
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub op_rgb: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_alpha: BlendOp,
    pub write_mask: WriteMask,
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self {
            enabled: false,
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            op_rgb: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            op_alpha: BlendOp::Add,
            write_mask: WriteMask::default(),
        }
    }
}

impl BlendDesc {
    pub fn set_blend(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn set_blend_params(
        mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Self {
        self.src_rgb = src_rgb;
        self.dst_rgb = dst_rgb;
        self.src_alpha = src_alpha;
        self.dst_alpha = dst_alpha;
        self
    }

    pub fn set_blend_ops(mut self, rgb: BlendOp, alpha: BlendOp) -> Self {
        self.op_rgb = rgb;
        self.op_alpha = alpha;
        self
    }

    pub fn set_write_mask(mut self, mask: WriteMask) -> Self {
        self.write_mask = mask;
        self
    }

    pub(crate) fn to_wgpu(self) -> (Option<wgpu::BlendState>, wgpu::ColorWrites) {
        let blend = self.enabled.then(|| wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: self.src_rgb.to_wgpu(),
                dst_factor: self.dst_rgb.to_wgpu(),
                operation: self.op_rgb.to_wgpu(),
            },
            alpha: wgpu::BlendComponent {
                src_factor: self.src_alpha.to_wgpu(),
                dst_factor: self.dst_alpha.to_wgpu(),
                operation: self.op_alpha.to_wgpu(),
            },
        });
        (blend, self.write_mask.to_wgpu())
    }
}

#[derive(Debug)]
pub struct BlendState {
    desc: BlendDesc,
}

impl BlendState {
    pub fn create(desc: BlendDesc) -> Arc<Self> {
        Arc::new(Self { desc })
    }

    pub fn desc(&self) -> BlendDesc {
        self.desc
    }
}

// ── graphics state ────────────────────────────────────────────────────────

/// The pipeline-affecting state a pass is executed with.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub rasterizer: Arc<RasterizerState>,
    pub depth_stencil: Arc<DepthStencilState>,
    pub blend: Arc<BlendState>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            rasterizer: RasterizerState::create(RasterizerDesc::default()),
            depth_stencil: DepthStencilState::create(DepthStencilDesc::default()),
            blend: BlendState::create(BlendDesc::default()),
        }
    }
}

impl GraphicsState {
    pub fn new(
        rasterizer: Arc<RasterizerState>,
        depth_stencil: Arc<DepthStencilState>,
        blend: Arc<BlendState>,
    ) -> Self {
        Self {
            rasterizer,
            depth_stencil,
            blend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rasterizer_culls_back_faces_clockwise_front() {
        let p = RasterizerDesc::default().to_wgpu();
        assert_eq!(p.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(p.front_face, wgpu::FrontFace::Cw);
        assert_eq!(p.polygon_mode, wgpu::PolygonMode::Fill);
    }

    #[test]
    fn no_cull_rasterizer() {
        let p = RasterizerDesc::default().set_cull_mode(CullMode::None).to_wgpu();
        assert_eq!(p.cull_mode, None);
    }

    #[test]
    fn disabled_depth_test_needs_no_attachment() {
        let desc = DepthStencilDesc::default().set_depth_test(false);
        assert!(!desc.needs_attachment());
        assert!(desc.to_wgpu(wgpu::TextureFormat::Depth32Float).is_none());
    }

    #[test]
    fn default_depth_state_tests_less_and_writes() {
        let ds = DepthStencilDesc::default()
            .to_wgpu(wgpu::TextureFormat::Depth32Float)
            .expect("depth state");
        assert!(ds.depth_write_enabled);
        assert_eq!(ds.depth_compare, wgpu::CompareFunction::Less);
        assert!(!ds.stencil.is_enabled());
    }

    #[test]
    fn stencil_only_state_never_writes_depth() {
        let face = StencilFaceDesc {
            func: ComparisonFunc::Equal,
            ..StencilFaceDesc::default()
        };
        let ds = DepthStencilDesc::default()
            .set_depth_test(false)
            .set_stencil_test(true)
            .set_stencil_faces(face, face)
            .to_wgpu(wgpu::TextureFormat::Depth24PlusStencil8)
            .expect("stencil state");
        assert!(!ds.depth_write_enabled);
        assert_eq!(ds.depth_compare, wgpu::CompareFunction::Always);
        assert_eq!(ds.stencil.front.compare, wgpu::CompareFunction::Equal);
        assert_eq!(ds.stencil.read_mask, 0xff);
    }

    #[test]
    fn default_blend_is_opaque() {
        let (blend, writes) = BlendDesc::default().to_wgpu();
        assert!(blend.is_none());
        assert_eq!(writes, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn enabled_blend_maps_factors() {
        let (blend, _) = BlendDesc::default()
            .set_blend(true)
            .set_blend_params(
                BlendFactor::SrcAlpha,
                BlendFactor::OneMinusSrcAlpha,
                BlendFactor::One,
                BlendFactor::Zero,
            )
            .to_wgpu();
        let blend = blend.expect("blend enabled");
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::Zero);
    }

    #[test]
    fn write_mask_maps_channels() {
        let (_, writes) = BlendDesc::default()
            .set_write_mask(WriteMask([true, false, true, false]))
            .to_wgpu();
        assert_eq!(writes, wgpu::ColorWrites::RED | wgpu::ColorWrites::BLUE);
    }
}
