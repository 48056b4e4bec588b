//! Physically based shading lit by an environment map.
//!
//! A row of objects sweeps metallic and roughness from one end to the other.
//! The irradiance cube, prefiltered cube and BRDF LUT are rendered once at
//! startup from the environment (see [`ibl`]). Per-object material and position
//! live in 256-byte slots selected with dynamic offsets.

mod environment;
mod ibl;
mod materials;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3, Vec4};
use lumen_engine::camera::Camera;
use lumen_engine::core::{Example, FrameCtx, InitCtx};
use lumen_engine::device::GpuFrame;
use lumen_engine::input::Key;
use lumen_engine::render::{self, pipeline, BufferKind, DepthTexture, CONSTANT_BUFFER_ALIGNMENT};
use wgpu::ShaderStages as S;

use crate::mesh::{self, Mesh};
use materials::{Material, MATERIALS};

pub const SINGLE_ROW_OBJECT_COUNT: usize = 10;
const OBJECT_SPACING: f32 = 2.15;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

const TONEMAP: &str = include_str!("shaders/tonemap.wgsl");

// ── uniforms ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ObjectMatrices {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
    pub cam_pos: Vec3,
    pub _pad: f32,
}

/// Y rotation applied to every object; the second object is turned a further 45 degrees.
pub fn object_model(object_index: usize) -> Mat4 {
    let degrees = -90.0 + if object_index == 1 { 45.0 } else { 0.0 };
    Mat4::from_rotation_y(f32::to_radians(degrees))
}

impl ObjectMatrices {
    pub fn for_objects(camera: &Camera, object_index: usize) -> Self {
        Self {
            projection: camera.perspective(),
            model: object_model(object_index),
            view: camera.view(),
            cam_pos: camera.eye(),
            _pad: 0.0,
        }
    }

    /// The skybox follows the camera rotation but never its translation.
    pub fn for_skybox(camera: &Camera) -> Self {
        Self {
            projection: camera.perspective(),
            model: Mat4::from_mat3(Mat3::from_mat4(camera.view())),
            view: camera.view(),
            cam_pos: camera.eye(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SharedParams {
    pub lights: [Vec4; 4],
    pub exposure: f32,
    pub gamma: f32,
    pub _pad: [f32; 2],
}

impl Default for SharedParams {
    fn default() -> Self {
        let p = 15.0;
        Self {
            lights: [
                Vec4::new(-p, -p * 0.5, -p, 1.0),
                Vec4::new(-p, -p * 0.5, p, 1.0),
                Vec4::new(p, -p * 0.5, p, 1.0),
                Vec4::new(p, -p * 0.5, -p, 1.0),
            ],
            exposure: 4.5,
            gamma: 2.2,
            _pad: [0.0; 2],
        }
    }
}

impl SharedParams {
    pub fn adjust_exposure(&mut self, delta: f32) {
        self.exposure = (self.exposure + delta).max(0.1);
    }

    pub fn adjust_gamma(&mut self, delta: f32) {
        self.gamma = (self.gamma + delta).max(0.1);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialParams {
    pub roughness: f32,
    pub metallic: f32,
    pub specular: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ObjectParams {
    pub position: [f32; 3],
    pub _pad: f32,
}

/// Objects are spread along x, centered on the origin.
pub fn object_params(count: usize) -> Vec<ObjectParams> {
    (0..count)
        .map(|x| ObjectParams {
            position: [(x as f32 - count as f32 / 2.0) * OBJECT_SPACING, 0.0, 0.0],
            _pad: 0.0,
        })
        .collect()
}

/// Metallic rises and roughness falls along the row.
pub fn material_params(count: usize, material: &Material) -> Vec<MaterialParams> {
    let [r, g, b] = material.color;
    (0..count)
        .map(|x| {
            let t = (x as f32 / count as f32).clamp(0.005, 1.0);
            MaterialParams {
                roughness: 1.0 - t,
                metallic: t,
                specular: 0.0,
                r,
                g,
                b,
            }
        })
        .collect()
}

/// Offsets for the material (binding 2) and object (binding 3) slots of draw `i`.
pub fn dynamic_offsets(i: usize) -> [u32; 2] {
    let offset = (i as u64 * CONSTANT_BUFFER_ALIGNMENT) as u32;
    [offset, offset]
}

// ── scene objects ─────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObjectKind {
    Sphere,
    Torus,
    TorusKnot,
    Cube,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [Self::Sphere, Self::Torus, Self::TorusKnot, Self::Cube];

    pub fn mesh(self) -> Mesh {
        match self {
            Self::Sphere => mesh::sphere(1.0, 48, 32),
            Self::Torus => mesh::torus(0.7, 0.3, 48, 24),
            Self::TorusKnot => mesh::torus_knot(0.6, 0.2, 128, 16, 2, 3),
            Self::Cube => mesh::cube(1.4),
        }
    }
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        log::debug!(
            "mesh {label}: {} vertices, {} indices",
            mesh.vertex_count(),
            mesh.indices.len()
        );
        Self {
            vertices: render::create_buffer_with_data(
                device,
                &format!("{label} vertices"),
                &mesh.interleaved(),
                BufferKind::Vertex,
            ),
            indices: render::create_buffer_with_data(
                device,
                &format!("{label} indices"),
                &mesh.indices,
                BufferKind::Index,
            ),
            index_count: mesh.indices.len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct UniformBuffers {
    object: wgpu::Buffer,
    skybox: wgpu::Buffer,
    params: wgpu::Buffer,
    material_params: wgpu::Buffer,
    object_params: wgpu::Buffer,
}

impl UniformBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let matrices = std::mem::size_of::<ObjectMatrices>() as u64;
        let slots = |size: usize| {
            render::calc_constant_buffer_byte_size(size as u64) * SINGLE_ROW_OBJECT_COUNT as u64
        };
        Self {
            object: render::create_buffer(device, "pbr object matrices", matrices, BufferKind::Uniform),
            skybox: render::create_buffer(device, "pbr skybox matrices", matrices, BufferKind::Uniform),
            params: render::create_buffer(
                device,
                "pbr shared params",
                std::mem::size_of::<SharedParams>() as u64,
                BufferKind::Uniform,
            ),
            material_params: render::create_buffer(
                device,
                "pbr material params",
                slots(std::mem::size_of::<MaterialParams>()),
                BufferKind::Uniform,
            ),
            object_params: render::create_buffer(
                device,
                "pbr object params",
                slots(std::mem::size_of::<ObjectParams>()),
                BufferKind::Uniform,
            ),
        }
    }
}

fn mesh_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    let source = format!("{TONEMAP}\n{source}");
    let module = pipeline::shader_module(device, label, &source);
    let layout = pipeline::pipeline_layout(device, label, &[layout]);
    let attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 6]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[pipeline::color_target(format, None)],
        }),
        primitive: pipeline::primitive(wgpu::PrimitiveTopology::TriangleList, cull_mode),
        depth_stencil: Some(pipeline::depth_stencil(DEPTH_FORMAT, depth_write)),
        multisample: pipeline::multisample(1),
        multiview_mask: None,
        cache: None,
    })
}

fn buffer_entry(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}

fn view_entry(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

fn sampler_entry(binding: u32, sampler: &wgpu::Sampler) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::Sampler(sampler),
    }
}

pub struct PbrIbl {
    camera: Camera,
    depth: DepthTexture,
    size: (u32, u32),

    objects: Vec<GpuMesh>,
    skybox: GpuMesh,
    buffers: UniformBuffers,

    skybox_pipeline: wgpu::RenderPipeline,
    pbr_pipeline: wgpu::RenderPipeline,
    skybox_bind_group: wgpu::BindGroup,
    objects_bind_group: wgpu::BindGroup,

    params: SharedParams,
    object_index: usize,
    material_index: usize,
    display_skybox: bool,

    matrices_dirty: bool,
    params_dirty: bool,
    dynamic_dirty: bool,
}

impl PbrIbl {
    fn upload(&mut self, queue: &wgpu::Queue) {
        if self.matrices_dirty {
            let objects = ObjectMatrices::for_objects(&self.camera, self.object_index);
            let skybox = ObjectMatrices::for_skybox(&self.camera);
            queue.write_buffer(&self.buffers.object, 0, bytemuck::bytes_of(&objects));
            queue.write_buffer(&self.buffers.skybox, 0, bytemuck::bytes_of(&skybox));
            self.matrices_dirty = false;
        }
        if self.params_dirty {
            queue.write_buffer(&self.buffers.params, 0, bytemuck::bytes_of(&self.params));
            self.params_dirty = false;
        }
        if self.dynamic_dirty {
            let material = &MATERIALS[self.material_index];
            let materials = material_params(SINGLE_ROW_OBJECT_COUNT, material);
            let objects = object_params(SINGLE_ROW_OBJECT_COUNT);
            queue.write_buffer(
                &self.buffers.material_params,
                0,
                &render::pack_constant_slots(&materials),
            );
            queue.write_buffer(
                &self.buffers.object_params,
                0,
                &render::pack_constant_slots(&objects),
            );
            self.dynamic_dirty = false;
        }
    }
}

impl Example for PbrIbl {
    const TITLE: &'static str = "PBR With Image Based Lighting";
    const SRGB_SURFACE: bool = false;

    fn init(ctx: &mut InitCtx<'_, '_>) -> Result<Self> {
        let device = ctx.device();
        let queue = ctx.queue();
        let format = ctx.surface_format();
        let size = ctx.size();

        let mut camera = Camera::default();
        camera.set_perspective(60.0, ctx.aspect_ratio(), 0.1, 256.0);
        camera.movement_speed = 4.0;
        camera.rotation_speed = 0.25;
        camera.set_rotation(Vec3::new(-3.75, 180.0, 0.0));
        camera.set_position(Vec3::new(0.55, 0.85, 12.0));

        let (_, environment) = environment::create_environment(device, queue, ctx.settings)?;
        let ibl = ibl::generate(device, queue, &environment);
        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let objects = ObjectKind::ALL
            .iter()
            .map(|kind| GpuMesh::new(device, &format!("{kind:?}"), &kind.mesh()))
            .collect();
        let skybox = GpuMesh::new(device, "skybox", &mesh::cube(2.0));
        let buffers = UniformBuffers::new(device);

        let matrices_size = render::min_binding_size::<ObjectMatrices>();
        let params_size = render::min_binding_size::<SharedParams>();

        let skybox_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox layout"),
            entries: &[
                pipeline::uniform_entry(0, S::VERTEX, false, matrices_size),
                pipeline::uniform_entry(1, S::FRAGMENT, false, params_size),
                pipeline::texture_entry(2, S::FRAGMENT, wgpu::TextureViewDimension::Cube),
                pipeline::sampler_entry(3, S::FRAGMENT),
            ],
        });
        let objects_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pbr objects layout"),
            entries: &[
                pipeline::uniform_entry(0, S::VERTEX | S::FRAGMENT, false, matrices_size),
                pipeline::uniform_entry(1, S::FRAGMENT, false, params_size),
                pipeline::uniform_entry(2, S::FRAGMENT, true, render::min_binding_size::<MaterialParams>()),
                pipeline::uniform_entry(3, S::VERTEX, true, render::min_binding_size::<ObjectParams>()),
                pipeline::texture_entry(4, S::FRAGMENT, wgpu::TextureViewDimension::Cube),
                pipeline::sampler_entry(5, S::FRAGMENT),
                pipeline::texture_entry(6, S::FRAGMENT, wgpu::TextureViewDimension::D2),
                pipeline::sampler_entry(7, S::FRAGMENT),
                pipeline::texture_entry(8, S::FRAGMENT, wgpu::TextureViewDimension::Cube),
                pipeline::sampler_entry(9, S::FRAGMENT),
            ],
        });

        let skybox_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox bind group"),
            layout: &skybox_layout,
            entries: &[
                buffer_entry(0, &buffers.skybox),
                buffer_entry(1, &buffers.params),
                view_entry(2, &environment),
                sampler_entry(3, &env_sampler),
            ],
        });
        let objects_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pbr objects bind group"),
            layout: &objects_layout,
            entries: &[
                buffer_entry(0, &buffers.object),
                buffer_entry(1, &buffers.params),
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: pipeline::buffer_slot(
                        &buffers.material_params,
                        std::mem::size_of::<MaterialParams>() as u64,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: pipeline::buffer_slot(
                        &buffers.object_params,
                        std::mem::size_of::<ObjectParams>() as u64,
                    ),
                },
                view_entry(4, &ibl.irradiance.view),
                sampler_entry(5, &ibl.irradiance.sampler),
                view_entry(6, &ibl.brdf_lut.view),
                sampler_entry(7, &ibl.brdf_lut.sampler),
                view_entry(8, &ibl.prefiltered.view),
                sampler_entry(9, &ibl.prefiltered.sampler),
            ],
        });

        // Seen from inside, so the outward faces are the ones to drop.
        let skybox_pipeline = mesh_pipeline(
            device,
            "skybox pipeline",
            include_str!("shaders/skybox.wgsl"),
            &skybox_layout,
            format,
            Some(wgpu::Face::Front),
            false,
        );
        let pbr_pipeline = mesh_pipeline(
            device,
            "pbr pipeline",
            include_str!("shaders/pbr.wgsl"),
            &objects_layout,
            format,
            None,
            true,
        );

        log::info!(
            "pbr ready: material {}, {} objects per row",
            MATERIALS[materials::DEFAULT_MATERIAL].name,
            SINGLE_ROW_OBJECT_COUNT
        );

        Ok(Self {
            camera,
            depth: DepthTexture::new(device, size, DEPTH_FORMAT, 1),
            size,
            objects,
            skybox,
            buffers,
            skybox_pipeline,
            pbr_pipeline,
            skybox_bind_group,
            objects_bind_group,
            params: SharedParams::default(),
            object_index: 0,
            material_index: materials::DEFAULT_MATERIAL,
            display_skybox: true,
            matrices_dirty: true,
            params_dirty: true,
            dynamic_dirty: true,
        })
    }

    fn resize(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()> {
        self.size = ctx.size();
        self.depth.ensure_size(ctx.device(), self.size);
        self.camera.set_aspect_ratio(ctx.aspect_ratio());
        self.matrices_dirty = true;
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        if self.camera.update(ctx.time.dt, ctx.input, ctx.input_frame) {
            self.matrices_dirty = true;
        }

        let material_step = match (ctx.key_pressed(Key::M), ctx.key_pressed(Key::N)) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        };
        if material_step != 0 {
            self.material_index = materials::cycle(self.material_index, material_step, MATERIALS.len());
            self.dynamic_dirty = true;
            log::info!("material: {}", MATERIALS[self.material_index].name);
        }
        if ctx.key_pressed(Key::O) {
            self.object_index = (self.object_index + 1) % ObjectKind::ALL.len();
            // The model rotation depends on the object.
            self.matrices_dirty = true;
            log::info!("object: {:?}", ObjectKind::ALL[self.object_index]);
        }
        if ctx.key_pressed(Key::Plus) {
            self.params.adjust_exposure(0.1);
            self.params_dirty = true;
        }
        if ctx.key_pressed(Key::Minus) {
            self.params.adjust_exposure(-0.1);
            self.params_dirty = true;
        }
        if ctx.key_pressed(Key::G) {
            self.params.adjust_gamma(0.1);
            self.params_dirty = true;
        }
        if ctx.key_pressed(Key::H) {
            self.params.adjust_gamma(-0.1);
            self.params_dirty = true;
        }
        if ctx.key_pressed(Key::B) {
            self.display_skybox = !self.display_skybox;
        }
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>, frame: &mut GpuFrame) -> Result<()> {
        self.upload(ctx.queue());

        let (width, height) = self.size;
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pbr pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(self.depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        pass.set_scissor_rect(0, 0, width, height);

        if self.display_skybox {
            pass.set_pipeline(&self.skybox_pipeline);
            pass.set_bind_group(0, &self.skybox_bind_group, &[]);
            self.skybox.draw(&mut pass);
        }

        pass.set_pipeline(&self.pbr_pipeline);
        let object = &self.objects[self.object_index];
        for i in 0..SINGLE_ROW_OBJECT_COUNT {
            pass.set_bind_group(0, &self.objects_bind_group, &dynamic_offsets(i));
            object.draw(&mut pass);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_match_shaders() {
        assert_eq!(std::mem::size_of::<ObjectMatrices>(), 208);
        assert_eq!(std::mem::size_of::<SharedParams>(), 80);
        assert_eq!(std::mem::size_of::<MaterialParams>(), 24);
        assert_eq!(std::mem::size_of::<ObjectParams>(), 16);
    }

    #[test]
    fn objects_are_centered_on_the_row() {
        let params = object_params(SINGLE_ROW_OBJECT_COUNT);
        assert_eq!(params.len(), 10);
        assert!((params[0].position[0] + 10.75).abs() < 1e-5);
        assert_eq!(params[5].position, [0.0, 0.0, 0.0]);
        assert!((params[9].position[0] - 8.6).abs() < 1e-5);
    }

    #[test]
    fn metallic_and_roughness_sweep_the_row() {
        let gold = &MATERIALS[0];
        let params = material_params(SINGLE_ROW_OBJECT_COUNT, gold);
        assert!((params[0].metallic - 0.005).abs() < 1e-6);
        assert!((params[0].roughness - 0.995).abs() < 1e-6);
        assert!((params[5].metallic - 0.5).abs() < 1e-6);
        assert!((params[9].roughness - 0.1).abs() < 1e-6);
        assert!(params.iter().all(|p| [p.r, p.g, p.b] == gold.color));
    }

    #[test]
    fn dynamic_offsets_step_by_alignment() {
        assert_eq!(dynamic_offsets(0), [0, 0]);
        assert_eq!(dynamic_offsets(3), [768, 768]);
        let packed = render::pack_constant_slots(&material_params(SINGLE_ROW_OBJECT_COUNT, &MATERIALS[9]));
        assert_eq!(packed.len(), SINGLE_ROW_OBJECT_COUNT * 256);
    }

    #[test]
    fn second_object_is_turned_further() {
        let base = object_model(0).transform_vector3(Vec3::X);
        let turned = object_model(1).transform_vector3(Vec3::X);
        assert!(base.abs_diff_eq(Vec3::Z, 1e-5));
        assert!((base.dot(turned) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn skybox_ignores_camera_translation() {
        let mut camera = Camera::default();
        camera.set_rotation(Vec3::new(-3.75, 180.0, 0.0));
        camera.set_position(Vec3::new(0.55, 0.85, 12.0));
        let m = ObjectMatrices::for_skybox(&camera);
        assert_eq!(m.model.w_axis, Vec4::W);
        assert!(m.model.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::ZERO, 1e-6));
        assert_eq!(m.cam_pos, -Vec3::new(0.55, 0.85, 12.0));
    }

    #[test]
    fn shared_params_defaults_and_limits() {
        let mut p = SharedParams::default();
        assert_eq!(p.lights[2], Vec4::new(15.0, -7.5, 15.0, 1.0));
        p.adjust_exposure(-10.0);
        assert_eq!(p.exposure, 0.1);
        p.adjust_gamma(0.1);
        assert!((p.gamma - 2.3).abs() < 1e-6);
    }

    #[test]
    fn every_object_mesh_is_indexed_triangles() {
        for kind in ObjectKind::ALL {
            let m = kind.mesh();
            assert!(!m.indices.is_empty(), "{kind:?}");
            assert_eq!(m.indices.len() % 3, 0);
            assert!(m.indices.iter().all(|&i| (i as usize) < m.positions.len()));
        }
    }
}
