//! Fixed-function state and layout entry shorthands.

use std::num::NonZeroU64;

// ── shaders ───────────────────────────────────────────────────────────────

pub fn shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

pub fn pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    })
}

/// Compute pipeline with entry point `main`.
pub fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
) -> wgpu::ComputePipeline {
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

// ── blend ─────────────────────────────────────────────────────────────────

/// Straight (non-premultiplied) alpha blending.
pub fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

pub fn color_target(
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })
}

// ── primitive / depth / msaa ──────────────────────────────────────────────

/// Counter-clockwise front faces, filled polygons.
pub fn primitive(
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Depth test with `Less`, stencil unused.
pub fn depth_stencil(format: wgpu::TextureFormat, depth_write: bool) -> wgpu::DepthStencilState {
    depth_stencil_with(format, depth_write, wgpu::CompareFunction::Less)
}

pub fn depth_stencil_with(
    format: wgpu::TextureFormat,
    depth_write: bool,
    compare: wgpu::CompareFunction,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: depth_write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub fn multisample(count: u32) -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: count.max(1),
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

// ── bind group layout entries ─────────────────────────────────────────────

pub fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size,
        },
        count: None,
    }
}

pub fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size,
        },
        count: None,
    }
}

/// Filterable float texture.
pub fn texture_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

pub fn sampler_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Binds `size` bytes of `buffer` from offset 0.
///
/// Used for uniforms read through dynamic offsets, where the binding covers a
/// single slot rather than the whole buffer.
pub fn buffer_slot(buffer: &wgpu::Buffer, size: u64) -> wgpu::BindingResource<'_> {
    wgpu::BindingResource::Buffer(wgpu::BufferBinding {
        buffer,
        offset: 0,
        size: NonZeroU64::new(size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multisample_count_never_zero() {
        assert_eq!(multisample(0).count, 1);
        assert_eq!(multisample(4).count, 4);
    }

    #[test]
    fn depth_state_defaults_to_less() {
        let d = depth_stencil(wgpu::TextureFormat::Depth24PlusStencil8, false);
        assert!(!d.depth_write_enabled);
        assert_eq!(d.depth_compare, wgpu::CompareFunction::Less);
    }

    #[test]
    fn primitive_is_ccw() {
        let p = primitive(wgpu::PrimitiveTopology::LineList, Some(wgpu::Face::Back));
        assert_eq!(p.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(p.cull_mode, Some(wgpu::Face::Back));
    }
}
