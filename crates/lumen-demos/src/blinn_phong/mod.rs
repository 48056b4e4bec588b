//! Blinn-Phong shading of a rotating procedural shape with a wireframe overlay.

use std::f32::consts::TAU;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use lumen_engine::core::{Example, FrameCtx, InitCtx};
use lumen_engine::device::GpuFrame;
use lumen_engine::input::Key;
use lumen_engine::render::{self, pipeline, BufferKind, DepthTexture, MsaaTarget};

use crate::mesh::{self, Mesh};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

const EYE: Vec3 = Vec3::new(2.0, 2.0, 4.0);

/// Surface facts every frame needs, captured at init and on resize.
#[derive(Debug, Copy, Clone)]
pub struct SceneInit {
    pub format: wgpu::TextureFormat,
    pub size: (u32, u32),
    pub background: wgpu::Color,
    pub msaa_count: u32,
}

pub fn init_web_gpu(ctx: &InitCtx<'_, '_>, msaa_count: u32) -> SceneInit {
    SceneInit {
        format: ctx.surface_format(),
        size: ctx.size(),
        background: wgpu::Color {
            r: 0.009,
            g: 0.0125,
            b: 0.0164,
            a: 1.0,
        },
        msaa_count,
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ViewUniforms {
    pub vp: Mat4,
    pub model: Mat4,
    pub normal: Mat4,
}

impl ViewUniforms {
    pub fn new(projection: Mat4, view: Mat4, model: Mat4) -> Self {
        Self {
            vp: projection * view,
            model,
            normal: model.inverse().transpose(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LightUniforms {
    pub light_position: Vec4,
    pub eye_position: Vec4,
    pub specular_color: Vec4,
    pub object_color: Vec4,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for MaterialUniforms {
    fn default() -> Self {
        Self {
            ambient: 0.2,
            diffuse: 0.8,
            specular: 0.4,
            shininess: 30.0,
        }
    }
}

impl MaterialUniforms {
    /// Changes shininess by `delta`, kept within `[1, 256]`.
    pub fn adjust_shininess(&mut self, delta: f32) {
        self.shininess = (self.shininess + delta).clamp(1.0, 256.0);
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Shape {
    Sphere,
    Torus,
    Cube,
}

impl Shape {
    pub fn next(self) -> Self {
        match self {
            Shape::Sphere => Shape::Torus,
            Shape::Torus => Shape::Cube,
            Shape::Cube => Shape::Sphere,
        }
    }

    pub fn mesh(self) -> Mesh {
        match self {
            Shape::Sphere => mesh::sphere(1.5, 24, 16),
            Shape::Torus => mesh::torus(1.2, 0.45, 36, 18),
            Shape::Cube => mesh::cube(2.0),
        }
    }
}

/// GPU buffers for one shape plus the uniform blocks shared by both pipelines.
pub struct PipelineBuffers {
    pub position: wgpu::Buffer,
    pub normal: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
    pub line_index: wgpu::Buffer,
    pub line_index_count: u32,

    pub view_uniform: wgpu::Buffer,
    pub shape_light_uniform: wgpu::Buffer,
    pub wireframe_light_uniform: wgpu::Buffer,
    pub material_uniform: wgpu::Buffer,
}

fn create_mesh_buffers(device: &wgpu::Device, mesh: &Mesh) -> [(wgpu::Buffer, u32); 4] {
    let lines = mesh.line_indices();
    [
        (
            render::create_buffer_with_data(device, "shape positions", &mesh.positions, BufferKind::Vertex),
            mesh.positions.len() as u32,
        ),
        (
            render::create_buffer_with_data(device, "shape normals", &mesh.normals, BufferKind::Vertex),
            mesh.normals.len() as u32,
        ),
        // u32 data requested as vertex data ends up as index buffers.
        (
            render::create_buffer_with_data(device, "shape indices", &mesh.indices, BufferKind::Vertex),
            mesh.indices.len() as u32,
        ),
        (
            render::create_buffer_with_data(device, "wireframe indices", &lines, BufferKind::Vertex),
            lines.len() as u32,
        ),
    ]
}

pub fn prepare_render_pipelines(device: &wgpu::Device, mesh: &Mesh) -> PipelineBuffers {
    let [(position, _), (normal, _), (index, index_count), (line_index, line_index_count)] =
        create_mesh_buffers(device, mesh);

    PipelineBuffers {
        position,
        normal,
        index,
        index_count,
        line_index,
        line_index_count,
        view_uniform: render::create_buffer(device, "view uniforms", 192, BufferKind::Uniform),
        shape_light_uniform: render::create_buffer(device, "shape light", 64, BufferKind::Uniform),
        wireframe_light_uniform: render::create_buffer(
            device,
            "wireframe light",
            64,
            BufferKind::Uniform,
        ),
        material_uniform: render::create_buffer(device, "material", 16, BufferKind::Uniform),
    }
}

pub struct BlinnPhong {
    init: SceneInit,
    buffers: PipelineBuffers,

    shape_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: wgpu::RenderPipeline,
    shape_bind_group: wgpu::BindGroup,
    wireframe_bind_group: wgpu::BindGroup,

    msaa: MsaaTarget,
    depth: DepthTexture,
    projection: Mat4,

    shape: Shape,
    material: MaterialUniforms,
    show_wireframe: bool,
}

fn projection_for(size: (u32, u32)) -> Mat4 {
    let aspect = size.0 as f32 / size.1.max(1) as f32;
    Mat4::perspective_rh(TAU / 5.0, aspect, 0.1, 100.0)
}

fn model_matrix(timer: f32) -> Mat4 {
    let a = timer * TAU;
    Mat4::from_euler(glam::EulerRot::XYZ, a, a * 2.0, 0.0)
}

impl Example for BlinnPhong {
    const TITLE: &'static str = "Blinn-Phong Lighting";

    fn init(ctx: &mut InitCtx<'_, '_>) -> Result<Self> {
        let init = init_web_gpu(ctx, ctx.settings.sample_count);
        let device = ctx.device();

        let shape = Shape::Sphere;
        let buffers = prepare_render_pipelines(device, &shape.mesh());

        let vs = wgpu::ShaderStages::VERTEX;
        let fs = wgpu::ShaderStages::FRAGMENT;

        let shape_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blinn-phong shape bgl"),
            entries: &[
                pipeline::uniform_entry(0, vs, false, render::min_binding_size::<ViewUniforms>()),
                pipeline::uniform_entry(1, fs, false, render::min_binding_size::<LightUniforms>()),
                pipeline::uniform_entry(2, fs, false, render::min_binding_size::<MaterialUniforms>()),
            ],
        });
        let wireframe_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blinn-phong wireframe bgl"),
            entries: &[
                pipeline::uniform_entry(0, vs, false, render::min_binding_size::<ViewUniforms>()),
                pipeline::uniform_entry(1, fs, false, render::min_binding_size::<LightUniforms>()),
            ],
        });

        let shape_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blinn-phong shape bind group"),
            layout: &shape_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.view_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.shape_light_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.material_uniform.as_entire_binding(),
                },
            ],
        });
        let wireframe_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blinn-phong wireframe bind group"),
            layout: &wireframe_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.view_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.wireframe_light_uniform.as_entire_binding(),
                },
            ],
        });

        let vec3_layout = |location: u32| -> [wgpu::VertexAttribute; 1] {
            [wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: location,
            }]
        };
        let position_attrs = vec3_layout(0);
        let normal_attrs = vec3_layout(1);
        let stride = std::mem::size_of::<[f32; 3]>() as u64;

        let shape_shader =
            pipeline::shader_module(device, "blinn-phong shape", include_str!("shaders/shape.wgsl"));
        let shape_layout = pipeline::pipeline_layout(device, "blinn-phong shape layout", &[&shape_bgl]);
        let shape_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blinn-phong shape pipeline"),
            layout: Some(&shape_layout),
            vertex: wgpu::VertexState {
                module: &shape_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &position_attrs,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &normal_attrs,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shape_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[pipeline::color_target(init.format, None)],
            }),
            primitive: pipeline::primitive(
                wgpu::PrimitiveTopology::TriangleList,
                Some(wgpu::Face::Back),
            ),
            depth_stencil: Some(pipeline::depth_stencil(DEPTH_FORMAT, true)),
            multisample: pipeline::multisample(init.msaa_count),
            multiview_mask: None,
            cache: None,
        });

        let wireframe_shader = pipeline::shader_module(
            device,
            "blinn-phong wireframe",
            include_str!("shaders/wireframe.wgsl"),
        );
        let wireframe_layout =
            pipeline::pipeline_layout(device, "blinn-phong wireframe layout", &[&wireframe_bgl]);
        let wireframe_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blinn-phong wireframe pipeline"),
            layout: Some(&wireframe_layout),
            vertex: wgpu::VertexState {
                module: &wireframe_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &position_attrs,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &wireframe_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[pipeline::color_target(init.format, None)],
            }),
            primitive: pipeline::primitive(wgpu::PrimitiveTopology::LineList, None),
            // Lines sit exactly on the shaded surface.
            depth_stencil: Some(pipeline::depth_stencil_with(
                DEPTH_FORMAT,
                false,
                wgpu::CompareFunction::LessEqual,
            )),
            multisample: pipeline::multisample(init.msaa_count),
            multiview_mask: None,
            cache: None,
        });

        let msaa = MsaaTarget::new(device, init.size, init.format, init.msaa_count);
        let depth = DepthTexture::new(device, init.size, DEPTH_FORMAT, init.msaa_count);

        Ok(Self {
            init,
            buffers,
            shape_pipeline,
            wireframe_pipeline,
            shape_bind_group,
            wireframe_bind_group,
            msaa,
            depth,
            projection: projection_for(init.size),
            shape,
            material: MaterialUniforms::default(),
            show_wireframe: true,
        })
    }

    fn resize(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()> {
        self.init.size = ctx.size();
        self.msaa.ensure_size(ctx.device(), self.init.size);
        self.depth.ensure_size(ctx.device(), self.init.size);
        self.projection = projection_for(self.init.size);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        if ctx.key_pressed(Key::Tab) {
            self.shape = self.shape.next();
            let mesh = self.shape.mesh();
            let [(position, _), (normal, _), (index, index_count), (line_index, line_count)] =
                create_mesh_buffers(ctx.device(), &mesh);
            self.buffers.position = position;
            self.buffers.normal = normal;
            self.buffers.index = index;
            self.buffers.index_count = index_count;
            self.buffers.line_index = line_index;
            self.buffers.line_index_count = line_count;
            log::info!("shape: {:?}", self.shape);
        }
        if ctx.key_pressed(Key::W) {
            self.show_wireframe = !self.show_wireframe;
        }
        if ctx.key_pressed(Key::ArrowUp) {
            self.material.adjust_shininess(5.0);
            log::info!("shininess {}", self.material.shininess);
        }
        if ctx.key_pressed(Key::ArrowDown) {
            self.material.adjust_shininess(-5.0);
            log::info!("shininess {}", self.material.shininess);
        }
        if ctx.key_pressed(Key::Space) {
            ctx.runtime.set_paused(!ctx.time.paused);
        }
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>, frame: &mut GpuFrame) -> Result<()> {
        let queue = ctx.queue();
        let b = &self.buffers;

        let view = Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y);
        let uniforms = ViewUniforms::new(self.projection, view, model_matrix(ctx.time.timer));
        queue.write_buffer(&b.view_uniform, 0, bytemuck::bytes_of(&uniforms));

        let shape_light = LightUniforms {
            light_position: EYE.extend(1.0),
            eye_position: EYE.extend(1.0),
            specular_color: Vec4::ONE,
            object_color: Vec4::new(0.9, 0.55, 0.2, 1.0),
        };
        let wireframe_light = LightUniforms {
            object_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            ..shape_light
        };
        queue.write_buffer(&b.shape_light_uniform, 0, bytemuck::bytes_of(&shape_light));
        queue.write_buffer(&b.wireframe_light_uniform, 0, bytemuck::bytes_of(&wireframe_light));
        queue.write_buffer(&b.material_uniform, 0, bytemuck::bytes_of(&self.material));

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blinn-phong pass"),
            color_attachments: &[Some(
                self.msaa.color_attachment(&frame.view, self.init.background),
            )],
            depth_stencil_attachment: Some(self.depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.shape_pipeline);
        rpass.set_bind_group(0, &self.shape_bind_group, &[]);
        rpass.set_vertex_buffer(0, b.position.slice(..));
        rpass.set_vertex_buffer(1, b.normal.slice(..));
        rpass.set_index_buffer(b.index.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..b.index_count, 0, 0..1);

        if self.show_wireframe {
            rpass.set_pipeline(&self.wireframe_pipeline);
            rpass.set_bind_group(0, &self.wireframe_bind_group, &[]);
            rpass.set_vertex_buffer(0, b.position.slice(..));
            rpass.set_index_buffer(b.line_index.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..b.line_index_count, 0, 0..1);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_buffers() {
        assert_eq!(std::mem::size_of::<ViewUniforms>(), 192);
        assert_eq!(std::mem::size_of::<LightUniforms>(), 64);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 16);
    }

    #[test]
    fn normal_matrix_of_rotation_is_rotation() {
        let model = model_matrix(0.3);
        let u = ViewUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, model);
        assert!(u.normal.abs_diff_eq(model, 1e-5));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = ViewUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, model);
        let n = u.normal.transform_vector3(Vec3::X);
        assert!((n.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn model_rotation_wraps_with_timer() {
        assert!(model_matrix(0.0).abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(model_matrix(1.0).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn shapes_cycle() {
        let mut s = Shape::Sphere;
        for _ in 0..3 {
            s = s.next();
        }
        assert_eq!(s, Shape::Sphere);
    }

    #[test]
    fn shininess_is_clamped() {
        let mut m = MaterialUniforms::default();
        m.adjust_shininess(-100.0);
        assert_eq!(m.shininess, 1.0);
        m.adjust_shininess(1000.0);
        assert_eq!(m.shininess, 256.0);
    }
}
