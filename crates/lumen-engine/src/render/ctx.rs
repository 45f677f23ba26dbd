/// Renderer-facing context (device + queue).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

/// Depth-stencil attachment of a target.
#[derive(Copy, Clone)]
pub struct DepthTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

/// Target for drawing: the current surface (encoder + views + size).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    /// Physical pixels.
    pub width: u32,
    /// Physical pixels.
    pub height: u32,
    pub depth: Option<DepthTarget<'a>>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            encoder,
            color_view,
            format,
            width,
            height,
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: Option<DepthTarget<'a>>) -> Self {
        self.depth = depth;
        self
    }
}
