//! Startup generation of the image based lighting inputs.
//!
//! Every target is filled by drawing a single fullscreen triangle into a 2D
//! view of one face (and one mip for the prefiltered cube). The face index and
//! roughness of each pass come from a dynamic uniform slot.

use bytemuck::{Pod, Zeroable};
use lumen_engine::render::{self, pipeline, BufferKind};
use wgpu::ShaderStages as S;

pub const BRDF_LUT_SIZE: u32 = 512;
pub const IRRADIANCE_SIZE: u32 = 64;
pub const PREFILTERED_SIZE: u32 = 512;

const BRDF_LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;
const CUBE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const PRELUDE: &str = include_str!("shaders/ibl_common.wgsl");

/// Per pass parameters, one 256-byte slot each.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct FaceParams {
    pub face: u32,
    pub roughness: f32,
    pub _pad: [f32; 2],
}

/// Roughness the prefilter pass for `mip` integrates with.
pub fn prefilter_roughness(mip: u32, mip_count: u32) -> f32 {
    if mip_count <= 1 {
        return 0.0;
    }
    mip as f32 / (mip_count - 1) as f32
}

/// Passes in submission order: mip-major, then face.
pub fn face_passes(mip_count: u32) -> Vec<(u32, FaceParams)> {
    (0..mip_count)
        .flat_map(|mip| {
            (0..6u32).map(move |face| {
                (
                    mip,
                    FaceParams {
                        face,
                        roughness: prefilter_roughness(mip, mip_count),
                        ..FaceParams::default()
                    },
                )
            })
        })
        .collect()
}

/// The view keeps its texture alive.
pub struct IblTexture {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

pub struct IblTextures {
    pub brdf_lut: IblTexture,
    pub irradiance: IblTexture,
    pub prefiltered: IblTexture,
}

fn linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

fn target_texture(
    device: &wgpu::Device,
    label: &str,
    size: u32,
    layers: u32,
    mips: u32,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    log::debug!("ibl target {label}: {size}x{size}, {layers} layers, {mips} mips, {format:?}");
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: layers,
        },
        mip_level_count: mips,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn cube_view(texture: &wgpu::Texture) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    })
}

fn face_view(texture: &wgpu::Texture, face: u32, mip: u32) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("ibl face"),
        dimension: Some(wgpu::TextureViewDimension::D2),
        base_mip_level: mip,
        mip_level_count: Some(1),
        base_array_layer: face,
        array_layer_count: Some(1),
        ..Default::default()
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let source = format!("{PRELUDE}\n{source}");
    let module = pipeline::shader_module(device, label, &source);
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[pipeline::color_target(format, None)],
        }),
        primitive: pipeline::primitive(wgpu::PrimitiveTopology::TriangleList, None),
        depth_stencil: None,
        multisample: pipeline::multisample(1),
        multiview_mask: None,
        cache: None,
    })
}

fn draw_fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    offset: u32,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("ibl pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[offset]);
    pass.draw(0..3, 0..1);
}

/// Renders the BRDF LUT, the irradiance cube and the prefiltered cube from
/// `environment` and submits the work.
pub fn generate(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    environment: &wgpu::TextureView,
) -> IblTextures {
    let prefiltered_mips = render::mip_level_count(PREFILTERED_SIZE);
    let passes = face_passes(prefiltered_mips);
    let slot = render::calc_constant_buffer_byte_size(std::mem::size_of::<FaceParams>() as u64);

    let params = passes.iter().map(|(_, p)| *p).collect::<Vec<_>>();
    let params_buffer = render::create_buffer_with_data(
        device,
        "ibl face params",
        &render::pack_constant_slots(&params),
        BufferKind::Uniform,
    );

    let env_sampler = linear_sampler(device, "ibl environment sampler");

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("ibl layout"),
        entries: &[
            pipeline::uniform_entry(0, S::FRAGMENT, true, render::min_binding_size::<FaceParams>()),
            pipeline::texture_entry(1, S::FRAGMENT, wgpu::TextureViewDimension::Cube),
            pipeline::sampler_entry(2, S::FRAGMENT),
        ],
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("ibl bind group"),
        layout: &layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: pipeline::buffer_slot(&params_buffer, std::mem::size_of::<FaceParams>() as u64),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(environment),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&env_sampler),
            },
        ],
    });
    let pipeline_layout = pipeline::pipeline_layout(device, "ibl pipeline layout", &[&layout]);

    let brdf_pipeline = fullscreen_pipeline(
        device,
        "brdf lut",
        include_str!("shaders/brdf_lut.wgsl"),
        &pipeline_layout,
        BRDF_LUT_FORMAT,
    );
    let irradiance_pipeline = fullscreen_pipeline(
        device,
        "irradiance cube",
        include_str!("shaders/irradiance.wgsl"),
        &pipeline_layout,
        CUBE_FORMAT,
    );
    let prefilter_pipeline = fullscreen_pipeline(
        device,
        "prefiltered cube",
        include_str!("shaders/prefilter.wgsl"),
        &pipeline_layout,
        CUBE_FORMAT,
    );

    let brdf_texture = target_texture(device, "brdf lut", BRDF_LUT_SIZE, 1, 1, BRDF_LUT_FORMAT);
    let irradiance_texture = target_texture(device, "irradiance cube", IRRADIANCE_SIZE, 6, 1, CUBE_FORMAT);
    let prefiltered_texture = target_texture(
        device,
        "prefiltered cube",
        PREFILTERED_SIZE,
        6,
        prefiltered_mips,
        CUBE_FORMAT,
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("ibl generation"),
    });

    let brdf_view = brdf_texture.create_view(&wgpu::TextureViewDescriptor::default());
    draw_fullscreen(&mut encoder, &brdf_view, &brdf_pipeline, &bind_group, 0);

    // Mip 0 slots carry faces 0..6 with roughness 0, which is all the irradiance pass reads.
    for face in 0..6u32 {
        let target = face_view(&irradiance_texture, face, 0);
        let offset = face as u64 * slot;
        draw_fullscreen(&mut encoder, &target, &irradiance_pipeline, &bind_group, offset as u32);
    }

    for (i, (mip, params)) in passes.iter().enumerate() {
        let target = face_view(&prefiltered_texture, params.face, *mip);
        let offset = i as u64 * slot;
        draw_fullscreen(&mut encoder, &target, &prefilter_pipeline, &bind_group, offset as u32);
    }

    queue.submit(std::iter::once(encoder.finish()));
    log::info!(
        "generated ibl textures ({} prefilter passes over {prefiltered_mips} mips)",
        passes.len()
    );

    IblTextures {
        brdf_lut: IblTexture {
            view: brdf_view,
            sampler: linear_sampler(device, "brdf lut sampler"),
        },
        irradiance: IblTexture {
            view: cube_view(&irradiance_texture),
            sampler: linear_sampler(device, "irradiance sampler"),
        },
        prefiltered: IblTexture {
            view: cube_view(&prefiltered_texture),
            sampler: linear_sampler(device, "prefiltered sampler"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_params_fill_one_vec4() {
        assert_eq!(std::mem::size_of::<FaceParams>(), 16);
    }

    #[test]
    fn roughness_spans_the_mip_chain() {
        let mips = render::mip_level_count(PREFILTERED_SIZE);
        assert_eq!(mips, 10);
        assert_eq!(prefilter_roughness(0, mips), 0.0);
        assert_eq!(prefilter_roughness(mips - 1, mips), 1.0);
        assert!((prefilter_roughness(3, mips) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(prefilter_roughness(0, 1), 0.0);
    }

    #[test]
    fn passes_cover_every_face_of_every_mip() {
        let passes = face_passes(10);
        assert_eq!(passes.len(), 60);
        for (i, (mip, p)) in passes.iter().enumerate() {
            assert_eq!(*mip, i as u32 / 6);
            assert_eq!(p.face, i as u32 % 6);
        }
        // The irradiance pass reuses the first six slots.
        assert!(passes[..6].iter().all(|(_, p)| p.roughness == 0.0));
    }
}
