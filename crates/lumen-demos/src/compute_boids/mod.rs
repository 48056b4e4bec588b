//! Flocking boids simulated in a compute pass and drawn as instanced triangles.
//!
//! Two particle buffers are used ping-pong: step `n` reads buffer `n % 2` and
//! writes buffer `(n + 1) % 2`, which is then drawn.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use lumen_engine::core::{Example, FrameCtx, InitCtx};
use lumen_engine::device::GpuFrame;
use lumen_engine::input::Key;
use lumen_engine::render::{self, pipeline, BufferKind};

use crate::rng::Rng;

pub const NUM_PARTICLES: u32 = 1500;
pub const PARTICLES_PER_GROUP: u32 = 64;

const PARTICLE_BUFFER_SIZE: u64 = NUM_PARTICLES as u64 * std::mem::size_of::<Particle>() as u64;

/// Flocking rule parameters, laid out as the compute shader's uniform block.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    pub delta_t: f32,
    pub rule1_distance: f32,
    pub rule2_distance: f32,
    pub rule3_distance: f32,
    pub rule1_scale: f32,
    pub rule2_scale: f32,
    pub rule3_scale: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            delta_t: 0.04,
            rule1_distance: 0.1,
            rule2_distance: 0.025,
            rule3_distance: 0.025,
            rule1_scale: 0.02,
            rule2_scale: 0.05,
            rule3_scale: 0.005,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
}

impl Particle {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Particle>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

const SPRITE_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

const SPRITE_VERTICES: [[f32; 2]; 3] = [[-0.01, -0.02], [0.01, -0.02], [0.0, 0.02]];

pub fn work_group_count(particles: u32, per_group: u32) -> u32 {
    particles.div_ceil(per_group.max(1))
}

/// Random positions in `[-1, 1]` and velocities in `[-0.1, 0.1]` for every particle.
pub fn initial_particles(rng: &mut Rng, count: u32) -> Vec<Particle> {
    (0..count)
        .map(|_| Particle {
            pos: [rng.range(-1.0, 1.0), rng.range(-1.0, 1.0)],
            vel: [rng.range(-0.1, 0.1), rng.range(-0.1, 0.1)],
        })
        .collect()
}

/// Bind group used by simulation step `step` (reads buffer `step % 2`).
pub fn compute_bind_group_index(step: u64) -> usize {
    (step % 2) as usize
}

/// Buffer holding the result of simulation step `step`.
pub fn render_buffer_index(step: u64) -> usize {
    ((step % 2) ^ 1) as usize
}

/// GPU work for one frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramePlan {
    /// Compute bind group to dispatch, or `None` while paused.
    pub dispatch: Option<usize>,
    pub drawn: usize,
}

/// Plans the frame and advances `step` when a simulation step runs.
/// A paused frame redraws the last completed step.
pub fn plan_frame(step: &mut u64, paused: bool) -> FramePlan {
    if paused {
        return FramePlan {
            dispatch: None,
            drawn: render_buffer_index(step.wrapping_sub(1)),
        };
    }
    let plan = FramePlan {
        dispatch: Some(compute_bind_group_index(*step)),
        drawn: render_buffer_index(*step),
    };
    *step += 1;
    plan
}

pub struct ComputeBoids {
    particle_buffers: [wgpu::Buffer; 2],
    sprite_buffer: wgpu::Buffer,
    _sim_param_buffer: wgpu::Buffer,

    bind_groups: [wgpu::BindGroup; 2],
    compute_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,

    work_group_count: u32,
    rng: Rng,
    /// Number of simulation steps run so far.
    step: u64,
}

impl Example for ComputeBoids {
    const TITLE: &'static str = "Compute Boids";

    fn init(ctx: &mut InitCtx<'_, '_>) -> Result<Self> {
        let device = ctx.device();

        let sprite_buffer = render::create_buffer_with_data(
            device,
            "boids sprite vertices",
            &SPRITE_VERTICES,
            BufferKind::Vertex,
        );

        let sim_params = SimParams::default();
        let sim_param_buffer = render::create_buffer_with_data(
            device,
            "boids sim params",
            std::slice::from_ref(&sim_params),
            BufferKind::Uniform,
        );

        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        let mut rng = Rng::new(seed);
        let initial = initial_particles(&mut rng, NUM_PARTICLES);
        let particle_buffers = [0, 1].map(|i| {
            render::create_buffer_with_data(
                device,
                &format!("boids particles {i}"),
                &initial,
                BufferKind::VertexStorage,
            )
        });

        let compute_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("boids compute bgl"),
            entries: &[
                pipeline::uniform_entry(
                    0,
                    wgpu::ShaderStages::COMPUTE,
                    false,
                    render::min_binding_size::<SimParams>(),
                ),
                pipeline::storage_entry(
                    1,
                    wgpu::ShaderStages::COMPUTE,
                    false,
                    wgpu::BufferSize::new(PARTICLE_BUFFER_SIZE),
                ),
                pipeline::storage_entry(
                    2,
                    wgpu::ShaderStages::COMPUTE,
                    false,
                    wgpu::BufferSize::new(PARTICLE_BUFFER_SIZE),
                ),
            ],
        });

        let bind_groups = [0usize, 1].map(|i| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("boids compute bind group"),
                layout: &compute_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: sim_param_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: particle_buffers[i].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: particle_buffers[(i + 1) % 2].as_entire_binding(),
                    },
                ],
            })
        });

        let compute_shader =
            pipeline::shader_module(device, "boids compute", include_str!("shaders/boids.wgsl"));
        let compute_layout = pipeline::pipeline_layout(device, "boids compute layout", &[&compute_bgl]);
        let compute_pipeline =
            pipeline::compute_pipeline(device, "boids compute pipeline", &compute_layout, &compute_shader);

        let sprite_shader =
            pipeline::shader_module(device, "boids sprite", include_str!("shaders/sprite.wgsl"));
        // Drawing reads particles as vertex attributes only.
        let render_layout = pipeline::pipeline_layout(device, "boids render layout", &[]);
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("boids render pipeline"),
            layout: Some(&render_layout),
            vertex: wgpu::VertexState {
                module: &sprite_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    Particle::layout(),
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &SPRITE_ATTRS,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &sprite_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[pipeline::color_target(
                    ctx.surface_format(),
                    Some(pipeline::alpha_blend()),
                )],
            }),
            primitive: pipeline::primitive(
                wgpu::PrimitiveTopology::TriangleList,
                Some(wgpu::Face::Back),
            ),
            depth_stencil: None,
            multisample: pipeline::multisample(1),
            multiview_mask: None,
            cache: None,
        });

        let work_group_count = work_group_count(NUM_PARTICLES, PARTICLES_PER_GROUP);
        log::debug!("boids: {NUM_PARTICLES} particles, {work_group_count} work groups");

        Ok(Self {
            particle_buffers,
            sprite_buffer,
            _sim_param_buffer: sim_param_buffer,
            bind_groups,
            compute_pipeline,
            render_pipeline,
            work_group_count,
            rng,
            step: 0,
        })
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        if ctx.key_pressed(Key::Space) {
            ctx.runtime.set_paused(!ctx.time.paused);
        }

        if ctx.key_pressed(Key::R) {
            let particles = initial_particles(&mut self.rng, NUM_PARTICLES);
            for buffer in &self.particle_buffers {
                ctx.queue().write_buffer(buffer, 0, bytemuck::cast_slice(&particles));
            }
            log::info!("boids reseeded");
        }
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>, frame: &mut GpuFrame) -> Result<()> {
        let encoder = &mut frame.encoder;

        let plan = plan_frame(&mut self.step, ctx.time.paused);
        if let Some(group) = plan.dispatch {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("boids compute pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&self.compute_pipeline);
            cpass.set_bind_group(0, &self.bind_groups[group], &[]);
            cpass.dispatch_workgroups(self.work_group_count, 1, 1);
        }

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("boids render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_vertex_buffer(0, self.particle_buffers[plan.drawn].slice(..));
        rpass.set_vertex_buffer(1, self.sprite_buffer.slice(..));
        rpass.draw(0..3, 0..NUM_PARTICLES);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_groups_cover_all_particles() {
        assert_eq!(work_group_count(NUM_PARTICLES, PARTICLES_PER_GROUP), 24);
        assert_eq!(work_group_count(64, 64), 1);
        assert_eq!(work_group_count(65, 64), 2);
    }

    #[test]
    fn every_particle_is_initialized() {
        let mut rng = Rng::new(1);
        let particles = initial_particles(&mut rng, NUM_PARTICLES);
        assert_eq!(particles.len(), NUM_PARTICLES as usize);
        for p in &particles {
            assert!(p.pos.iter().all(|c| (-1.0..=1.0).contains(c)));
            assert!(p.vel.iter().all(|c| (-0.1..=0.1).contains(c)));
        }
        // Zero-filled tails would show up as many identical particles.
        let zeros = particles.iter().filter(|p| p.pos == [0.0, 0.0]).count();
        assert_eq!(zeros, 0);
    }

    #[test]
    fn ping_pong_draws_what_was_written() {
        for step in 0..6u64 {
            let read = compute_bind_group_index(step);
            let written = (read + 1) % 2;
            assert_eq!(render_buffer_index(step), written);
            // The next step reads what this step wrote.
            assert_eq!(compute_bind_group_index(step + 1), written);
        }
    }

    #[test]
    fn pause_redraws_last_step_without_advancing() {
        let mut step = 0;
        // Nothing has run yet; buffer 0 holds the seed.
        assert_eq!(
            plan_frame(&mut step, true),
            FramePlan { dispatch: None, drawn: 0 }
        );
        assert_eq!(step, 0);

        let first = plan_frame(&mut step, false);
        assert_eq!(first, FramePlan { dispatch: Some(0), drawn: 1 });
        assert_eq!(step, 1);

        for _ in 0..3 {
            assert_eq!(plan_frame(&mut step, true).drawn, first.drawn);
        }
        assert_eq!(step, 1);

        // Resuming reads what the last step wrote.
        assert_eq!(
            plan_frame(&mut step, false),
            FramePlan { dispatch: Some(1), drawn: 0 }
        );
        assert_eq!(step, 2);
    }

    #[test]
    fn reseed_draws_fresh_particles() {
        let mut rng = Rng::new(7);
        let seeded = initial_particles(&mut rng, 32);
        let reseeded = initial_particles(&mut rng, 32);
        assert_eq!(reseeded.len(), seeded.len());
        assert_ne!(seeded, reseeded);
        assert!(reseeded.iter().all(|p| p.pos.iter().all(|c| (-1.0..=1.0).contains(c))));
    }

    #[test]
    fn layouts_match_shader_expectations() {
        assert_eq!(std::mem::size_of::<SimParams>(), 28);
        assert_eq!(std::mem::size_of::<Particle>(), 16);
        assert_eq!(PARTICLE_BUFFER_SIZE, 24_000);
    }
}
