use std::sync::Arc;

use super::{RenderError, RenderResult};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Filter {
    Point,
    Linear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressMode {
    Wrap,
    Mirror,
    Clamp,
    /// Needs `wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER`; samples transparent black.
    Border,
}

impl AddressMode {
    fn to_wgpu(self) -> wgpu::AddressMode {
        match self {
            Self::Wrap => wgpu::AddressMode::Repeat,
            Self::Mirror => wgpu::AddressMode::MirrorRepeat,
            Self::Clamp => wgpu::AddressMode::ClampToEdge,
            Self::Border => wgpu::AddressMode::ClampToBorder,
        }
    }
}

/// Sampler descriptor.
///
/// Defaults: linear filtering everywhere, wrap addressing, no anisotropy.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: Filter,
    pub max_anisotropy: u16,
    pub min_lod: f32,
    pub max_lod: f32,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mip_filter: Filter::Linear,
            max_anisotropy: 1,
            min_lod: 0.0,
            max_lod: 32.0,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
            address_w: AddressMode::Wrap,
        }
    }
}

impl SamplerDesc {
    pub fn set_filter_mode(mut self, min: Filter, mag: Filter, mip: Filter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self.mip_filter = mip;
        self
    }

    pub fn set_max_anisotropy(mut self, max_anisotropy: u16) -> Self {
        self.max_anisotropy = max_anisotropy;
        self
    }

    pub fn set_lod_params(mut self, min_lod: f32, max_lod: f32) -> Self {
        self.min_lod = min_lod;
        self.max_lod = max_lod;
        self
    }

    pub fn set_addressing_mode(mut self, u: AddressMode, v: AddressMode, w: AddressMode) -> Self {
        self.address_u = u;
        self.address_v = v;
        self.address_w = w;
        self
    }

    /// Checks the constraints wgpu enforces at creation time.
    pub fn validate(&self) -> RenderResult<()> {
        if !(1..=16).contains(&self.max_anisotropy) {
            return Err(RenderError::InvalidSampler(format!(
                "max anisotropy {} is outside 1..=16",
                self.max_anisotropy
            )));
        }

        let all_linear = [self.min_filter, self.mag_filter, self.mip_filter]
            .iter()
            .all(|f| *f == Filter::Linear);
        if self.max_anisotropy > 1 && !all_linear {
            return Err(RenderError::InvalidSampler(
                "anisotropic filtering requires linear min, mag and mip filters".into(),
            ));
        }

        if self.min_lod < 0.0 || self.min_lod > self.max_lod {
            return Err(RenderError::InvalidSampler(format!(
                "lod range {}..{} is invalid",
                self.min_lod, self.max_lod
            )));
        }

        Ok(())
    }

    fn to_wgpu(&self) -> wgpu::SamplerDescriptor<'static> {
        let filter = |f: Filter| match f {
            Filter::Point => wgpu::FilterMode::Nearest,
            Filter::Linear => wgpu::FilterMode::Linear,
        };
        let uses_border = [self.address_u, self.address_v, self.address_w].contains(&AddressMode::Border);

        wgpu::SamplerDescriptor {
            label: Some("lumen sampler"),
            address_mode_u: self.address_u.to_wgpu(),
            address_mode_v: self.address_v.to_wgpu(),
            address_mode_w: self.address_w.to_wgpu(),
            mag_filter: filter(self.mag_filter),
            min_filter: filter(self.min_filter),
            mipmap_filter: match self.mip_filter {
                Filter::Point => wgpu::MipmapFilterMode::Nearest,
                Filter::Linear => wgpu::MipmapFilterMode::Linear,
            },
            lod_min_clamp: self.min_lod,
            lod_max_clamp: self.max_lod,
            compare: None,
            anisotropy_clamp: self.max_anisotropy,
            border_color: uses_border.then_some(wgpu::SamplerBorderColor::TransparentBlack),
        }
    }
}

/// GPU sampler plus the descriptor it was created from.
#[derive(Debug)]
pub struct Sampler {
    desc: SamplerDesc,
    raw: wgpu::Sampler,
}

impl Sampler {
    pub fn create(device: &wgpu::Device, desc: SamplerDesc) -> RenderResult<Arc<Self>> {
        desc.validate()?;
        let raw = device.create_sampler(&desc.to_wgpu());
        Ok(Arc::new(Self { desc, raw }))
    }

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    pub fn raw(&self) -> &wgpu::Sampler {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_anisotropic_sampler_is_valid() {
        let desc = SamplerDesc::default()
            .set_filter_mode(Filter::Linear, Filter::Linear, Filter::Linear)
            .set_max_anisotropy(8);
        assert!(desc.validate().is_ok());
        assert_eq!(desc.to_wgpu().anisotropy_clamp, 8);
    }

    #[test]
    fn anisotropy_with_point_filter_is_rejected() {
        let desc = SamplerDesc::default()
            .set_filter_mode(Filter::Point, Filter::Linear, Filter::Linear)
            .set_max_anisotropy(4);
        assert!(matches!(desc.validate(), Err(RenderError::InvalidSampler(_))));
    }

    #[test]
    fn anisotropy_out_of_range_is_rejected() {
        assert!(SamplerDesc::default().set_max_anisotropy(0).validate().is_err());
        assert!(SamplerDesc::default().set_max_anisotropy(17).validate().is_err());
    }

    #[test]
    fn inverted_lod_range_is_rejected() {
        assert!(SamplerDesc::default().set_lod_params(4.0, 1.0).validate().is_err());
    }

    #[test]
    fn border_addressing_sets_border_color() {
        let desc = SamplerDesc::default().set_addressing_mode(
            AddressMode::Border,
            AddressMode::Clamp,
            AddressMode::Clamp,
        );
        let raw = desc.to_wgpu();
        assert_eq!(raw.address_mode_u, wgpu::AddressMode::ClampToBorder);
        assert_eq!(raw.border_color, Some(wgpu::SamplerBorderColor::TransparentBlack));
        assert_eq!(SamplerDesc::default().to_wgpu().border_color, None);
    }
}
