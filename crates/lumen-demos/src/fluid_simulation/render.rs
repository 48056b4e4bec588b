//! Draws the rgb field buffers as a full-screen quad.

use lumen_engine::render::{self, BufferKind, pipeline};

use super::dynamic_buffer::DynamicBuffer;
use super::simulation::{Fields, Simulation};
use super::uniforms::{GridUniform, ScalarUniform, UniformBlock};

const QUAD: [[f32; 4]; 6] = [
    [-1.0, -1.0, 0.0, 1.0],
    [-1.0, 1.0, 0.0, 1.0],
    [1.0, -1.0, 0.0, 1.0],
    [1.0, -1.0, 0.0, 1.0],
    [-1.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
];

/// Field shown on screen.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RenderField {
    #[default]
    Dye,
    Velocity,
    Divergence,
    Pressure,
    Vorticity,
}

impl RenderField {
    /// `1..=5` in the order dye, velocity, divergence, pressure, vorticity.
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(RenderField::Dye),
            2 => Some(RenderField::Velocity),
            3 => Some(RenderField::Divergence),
            4 => Some(RenderField::Pressure),
            5 => Some(RenderField::Vorticity),
            _ => None,
        }
    }

    /// Brightness scale bringing typical values of the field into `[0, 1]`.
    pub fn multiplier(self) -> f32 {
        match self {
            RenderField::Dye => 1.0,
            RenderField::Velocity => 0.1,
            RenderField::Divergence => 1.0,
            RenderField::Pressure => 0.2,
            RenderField::Vorticity => 1.0,
        }
    }

    /// Only the dye lives on the dye grid; everything else uses the velocity grid.
    pub fn is_dye(self) -> bool {
        self == RenderField::Dye
    }

    pub fn source(self, fields: &Fields) -> &DynamicBuffer {
        match self {
            RenderField::Dye => &fields.dye,
            RenderField::Velocity => &fields.velocity,
            RenderField::Divergence => &fields.divergence,
            RenderField::Pressure => &fields.pressure,
            RenderField::Vorticity => &fields.vorticity,
        }
    }
}

pub struct RenderProgram {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    intensity: UniformBlock<ScalarUniform>,
    render_dye: UniformBlock<ScalarUniform>,
}

impl RenderProgram {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, field: RenderField) -> Self {
        let fs = wgpu::ShaderStages::FRAGMENT;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fluid render bgl"),
            entries: &[
                pipeline::storage_entry(0, fs, true, None),
                pipeline::storage_entry(1, fs, true, None),
                pipeline::storage_entry(2, fs, true, None),
                pipeline::uniform_entry(3, fs, false, render::min_binding_size::<GridUniform>()),
                pipeline::uniform_entry(4, fs, false, None),
                pipeline::uniform_entry(5, fs, false, None),
            ],
        });

        let shader = pipeline::shader_module(device, "fluid render", include_str!("shaders/render.wgsl"));
        let pipeline_layout = pipeline::pipeline_layout(device, "fluid render layout", &[&layout]);

        let attrs = wgpu::vertex_attr_array![0 => Float32x4];
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fluid render pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 4]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attrs,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[pipeline::color_target(format, None)],
            }),
            primitive: pipeline::primitive(wgpu::PrimitiveTopology::TriangleList, None),
            depth_stencil: None,
            multisample: pipeline::multisample(1),
            multiview_mask: None,
            cache: None,
        });

        let vertex_buffer =
            render::create_buffer_with_data(device, "fluid quad", &QUAD, BufferKind::Vertex);

        Self {
            layout,
            pipeline,
            vertex_buffer,
            intensity: UniformBlock::new(
                device,
                "fluid render intensity",
                ScalarUniform::new(field.multiplier()),
                false,
            ),
            render_dye: UniformBlock::new(
                device,
                "fluid render dye",
                ScalarUniform::new(if field.is_dye() { 1.0 } else { 0.0 }),
                false,
            ),
        }
    }

    /// Bind group over the rgb buffers and grid uniform of `sim`.
    pub fn bind(&self, device: &wgpu::Device, sim: &Simulation) -> wgpu::BindGroup {
        let rgb = &sim.fields.rgb;
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fluid render bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: rgb.buffer(0).as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: rgb.buffer(1).as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: rgb.buffer(2).as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: sim.grid.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.intensity.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: self.render_dye.buffer().as_entire_binding(),
                },
            ],
        })
    }

    pub fn set_field(&mut self, field: RenderField) {
        self.intensity.set(ScalarUniform::new(field.multiplier()));
        self.render_dye
            .set(ScalarUniform::new(if field.is_dye() { 1.0 } else { 0.0 }));
    }

    pub fn draw(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        self.intensity.update(queue);
        self.render_dye.update(queue);

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fluid render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..QUAD.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_select_fields_in_order() {
        let fields: Vec<_> = (1..=5).filter_map(RenderField::from_number).collect();
        assert_eq!(
            fields,
            vec![
                RenderField::Dye,
                RenderField::Velocity,
                RenderField::Divergence,
                RenderField::Pressure,
                RenderField::Vorticity,
            ]
        );
        assert_eq!(RenderField::from_number(0), None);
        assert_eq!(RenderField::from_number(6), None);
    }

    #[test]
    fn only_dye_renders_at_dye_resolution() {
        assert!(RenderField::Dye.is_dye());
        assert!(!RenderField::Pressure.is_dye());
    }

    #[test]
    fn quad_covers_clip_space() {
        let min = QUAD.iter().fold([f32::MAX; 2], |m, v| [m[0].min(v[0]), m[1].min(v[1])]);
        let max = QUAD.iter().fold([f32::MIN; 2], |m, v| [m[0].max(v[0]), m[1].max(v[1])]);
        assert_eq!(min, [-1.0, -1.0]);
        assert_eq!(max, [1.0, 1.0]);
    }
}
