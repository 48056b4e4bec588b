//! Field buffers, bind groups and per-frame encoding of the simulation step.

use anyhow::Result;

use super::dynamic_buffer::DynamicBuffer;
use super::programs::{self, Programs};
use super::settings::Sizes;
use super::uniforms::{GridUniform, SimUniform, UniformBlock};

pub struct Fields {
    pub velocity: DynamicBuffer,
    pub velocity0: DynamicBuffer,
    pub dye: DynamicBuffer,
    pub dye0: DynamicBuffer,
    pub divergence: DynamicBuffer,
    pub pressure: DynamicBuffer,
    pub pressure0: DynamicBuffer,
    pub vorticity: DynamicBuffer,
    /// The three channels drawn to the screen.
    pub rgb: DynamicBuffer,
}

impl Fields {
    pub fn new(device: &wgpu::Device, sizes: &Sizes) -> Result<Self> {
        let grid = |label, dims| DynamicBuffer::new(device, label, dims, sizes.grid_w, sizes.grid_h);
        let dye = |label, dims| DynamicBuffer::new(device, label, dims, sizes.dye_w, sizes.dye_h);

        Ok(Self {
            velocity: grid("velocity", 2)?,
            velocity0: grid("velocity0", 2)?,
            dye: dye("dye", 3)?,
            dye0: dye("dye0", 3)?,
            divergence: grid("divergence", 1)?,
            pressure: grid("pressure", 1)?,
            pressure0: grid("pressure0", 1)?,
            vorticity: grid("vorticity", 1)?,
            rgb: dye("rgb", 3)?,
        })
    }

    pub fn clear(&self, queue: &wgpu::Queue) {
        for field in [
            &self.velocity,
            &self.velocity0,
            &self.dye,
            &self.dye0,
            &self.divergence,
            &self.pressure,
            &self.pressure0,
            &self.vorticity,
            &self.rgb,
        ] {
            field.clear(queue);
        }
    }
}

fn components(buffer: &DynamicBuffer) -> impl Iterator<Item = &wgpu::Buffer> {
    (0..buffer.dims()).map(move |d| buffer.buffer(d))
}

/// Concatenates the component buffers of `fields`, in order.
fn bindings<'a>(fields: &[&'a DynamicBuffer]) -> Vec<&'a wgpu::Buffer> {
    fields.iter().flat_map(|f| components(*f)).collect()
}

struct BindGroups {
    uniforms: wgpu::BindGroup,
    update_velocity: wgpu::BindGroup,
    update_dye: wgpu::BindGroup,
    advect: wgpu::BindGroup,
    boundary: wgpu::BindGroup,
    divergence: wgpu::BindGroup,
    vorticity: wgpu::BindGroup,
    vorticity_confinement: wgpu::BindGroup,
    clear_pressure: wgpu::BindGroup,
    pressure: [wgpu::BindGroup; 2],
    gradient_subtract: wgpu::BindGroup,
    advect_dye: wgpu::BindGroup,
}

impl BindGroups {
    fn new(
        device: &wgpu::Device,
        programs: &Programs,
        f: &Fields,
        grid: &UniformBlock<GridUniform>,
        sim: &UniformBlock<SimUniform>,
    ) -> Self {
        let uniforms = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fluid uniforms"),
            layout: &programs.uniform_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: grid.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sim.buffer().as_entire_binding(),
                },
            ],
        });

        Self {
            uniforms,
            update_velocity: programs
                .update_velocity
                .bind(device, &bindings(&[&f.velocity, &f.velocity0])),
            update_dye: programs.update_dye.bind(device, &bindings(&[&f.dye, &f.dye0])),
            advect: programs.advect.bind(device, &bindings(&[&f.velocity0, &f.velocity])),
            boundary: programs.boundary.bind(device, &bindings(&[&f.velocity, &f.velocity0])),
            divergence: programs
                .divergence
                .bind(device, &bindings(&[&f.velocity0, &f.divergence])),
            vorticity: programs
                .vorticity
                .bind(device, &bindings(&[&f.velocity0, &f.vorticity])),
            vorticity_confinement: programs.vorticity_confinement.bind(
                device,
                &bindings(&[&f.velocity0, &f.vorticity, &f.velocity]),
            ),
            clear_pressure: programs
                .clear_pressure
                .bind(device, &bindings(&[&f.pressure, &f.pressure0])),
            pressure: [
                programs
                    .pressure
                    .bind(device, &bindings(&[&f.pressure0, &f.divergence, &f.pressure])),
                programs
                    .pressure
                    .bind(device, &bindings(&[&f.pressure, &f.divergence, &f.pressure0])),
            ],
            gradient_subtract: programs.gradient_subtract.bind(
                device,
                &bindings(&[&f.pressure, &f.velocity, &f.velocity0]),
            ),
            advect_dye: programs
                .advect_dye
                .bind(device, &bindings(&[&f.dye0, &f.velocity0, &f.dye])),
        }
    }
}

/// Everything sized by the grid dimensions; rebuilt when the surface resizes.
pub struct Simulation {
    pub sizes: Sizes,
    pub fields: Fields,
    pub grid: UniformBlock<GridUniform>,
    pub sim: UniformBlock<SimUniform>,
    bind_groups: BindGroups,
}

impl Simulation {
    pub fn new(
        device: &wgpu::Device,
        programs: &Programs,
        sizes: Sizes,
        sim_values: SimUniform,
    ) -> Result<Self> {
        let fields = Fields::new(device, &sizes)?;
        let grid = UniformBlock::new(device, "fluid grid", GridUniform::from(&sizes), false);
        let sim = UniformBlock::new(device, "fluid sim params", sim_values, true);
        let bind_groups = BindGroups::new(device, programs, &fields, &grid, &sim);

        Ok(Self {
            sizes,
            fields,
            grid,
            sim,
            bind_groups,
        })
    }

    /// Records one simulation step. Uniforms must be uploaded beforehand.
    pub fn encode_step(
        &self,
        programs: &Programs,
        pressure_iterations: u32,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let bg = &self.bind_groups;
        let u = &bg.uniforms;
        let sizes = &self.sizes;

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("fluid forces + pressure"),
                timestamp_writes: None,
            });
            programs.update_velocity.dispatch(&mut pass, &bg.update_velocity, u, sizes);
            programs.update_dye.dispatch(&mut pass, &bg.update_dye, u, sizes);
            programs.advect.dispatch(&mut pass, &bg.advect, u, sizes);
            programs.boundary.dispatch(&mut pass, &bg.boundary, u, sizes);
            programs.divergence.dispatch(&mut pass, &bg.divergence, u, sizes);
            programs.vorticity.dispatch(&mut pass, &bg.vorticity, u, sizes);
            programs
                .vorticity_confinement
                .dispatch(&mut pass, &bg.vorticity_confinement, u, sizes);
            programs.clear_pressure.dispatch(&mut pass, &bg.clear_pressure, u, sizes);
            for i in 0..pressure_iterations {
                let group = &bg.pressure[programs::pressure_bind_group_index(i)];
                programs.pressure.dispatch(&mut pass, group, u, sizes);
            }
        }

        if programs::pressure_result_needs_copy(pressure_iterations) {
            self.fields.pressure0.copy_to(&self.fields.pressure, encoder);
        }

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("fluid projection + dye"),
                timestamp_writes: None,
            });
            programs
                .gradient_subtract
                .dispatch(&mut pass, &bg.gradient_subtract, u, sizes);
            programs.advect_dye.dispatch(&mut pass, &bg.advect_dye, u, sizes);
        }

        self.fields.velocity0.copy_to(&self.fields.velocity, encoder);
    }
}
