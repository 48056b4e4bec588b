//! Compute pipelines of the simulation step.
//!
//! Every program binds its fields as group 0 (one storage buffer per component)
//! and the shared grid + simulation uniforms as group 1.

use lumen_engine::render::{self, pipeline};

use super::settings::Sizes;
use super::uniforms::{GridUniform, SimUniform};

pub const WORKGROUP_SIZE: u32 = 8;

const COMMON: &str = include_str!("shaders/common.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Access {
    Read,
    ReadWrite,
}

use Access::{Read, ReadWrite};

/// Which grid a program runs over.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Extent {
    Grid,
    Dye,
}

impl Extent {
    pub fn size(self, sizes: &Sizes) -> (u32, u32) {
        match self {
            Extent::Grid => (sizes.grid_w, sizes.grid_h),
            Extent::Dye => (sizes.dye_w, sizes.dye_h),
        }
    }
}

/// Workgroup counts covering a `w x h` grid.
pub fn workgroups(w: u32, h: u32) -> (u32, u32) {
    (w.div_ceil(WORKGROUP_SIZE), h.div_ceil(WORKGROUP_SIZE))
}

/// Jacobi iteration `i` reads `pressure0` when even and `pressure` when odd.
pub fn pressure_bind_group_index(iteration: u32) -> usize {
    (iteration % 2) as usize
}

/// After `iterations` Jacobi steps the solution sits in `pressure0` when the count
/// is even and has to be copied back into `pressure`.
pub fn pressure_result_needs_copy(iterations: u32) -> bool {
    iterations % 2 == 0
}

pub struct ComputeProgram {
    label: &'static str,
    extent: Extent,
    bindings: usize,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl ComputeProgram {
    fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        label: &'static str,
        source: &str,
        extent: Extent,
        access: &[Access],
    ) -> Self {
        let entries: Vec<_> = access
            .iter()
            .enumerate()
            .map(|(i, a)| {
                pipeline::storage_entry(i as u32, wgpu::ShaderStages::COMPUTE, *a == Read, None)
            })
            .collect();
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });

        let module = pipeline::shader_module(device, label, &[COMMON, source].concat());
        let pipeline_layout = pipeline::pipeline_layout(device, label, &[&layout, uniform_layout]);
        let pipeline = pipeline::compute_pipeline(device, label, &pipeline_layout, &module);

        Self {
            label,
            extent,
            bindings: access.len(),
            layout,
            pipeline,
        }
    }

    /// Bind group over `buffers`, in binding order.
    pub fn bind(&self, device: &wgpu::Device, buffers: &[&wgpu::Buffer]) -> wgpu::BindGroup {
        debug_assert_eq!(buffers.len(), self.bindings, "{}", self.label);
        let entries: Vec<_> = buffers
            .iter()
            .enumerate()
            .map(|(i, b)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: b.as_entire_binding(),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &entries,
        })
    }

    pub fn dispatch(
        &self,
        pass: &mut wgpu::ComputePass<'_>,
        fields: &wgpu::BindGroup,
        uniforms: &wgpu::BindGroup,
        sizes: &Sizes,
    ) {
        let (w, h) = self.extent.size(sizes);
        let (x, y) = workgroups(w, h);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, fields, &[]);
        pass.set_bind_group(1, uniforms, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }
}

pub struct Programs {
    pub uniform_layout: wgpu::BindGroupLayout,

    pub update_velocity: ComputeProgram,
    pub update_dye: ComputeProgram,
    pub advect: ComputeProgram,
    pub boundary: ComputeProgram,
    pub divergence: ComputeProgram,
    pub vorticity: ComputeProgram,
    pub vorticity_confinement: ComputeProgram,
    pub clear_pressure: ComputeProgram,
    pub pressure: ComputeProgram,
    pub gradient_subtract: ComputeProgram,
    pub advect_dye: ComputeProgram,
}

impl Programs {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fluid uniforms"),
            entries: &[
                pipeline::uniform_entry(
                    0,
                    wgpu::ShaderStages::COMPUTE,
                    false,
                    render::min_binding_size::<GridUniform>(),
                ),
                pipeline::uniform_entry(
                    1,
                    wgpu::ShaderStages::COMPUTE,
                    false,
                    render::min_binding_size::<SimUniform>(),
                ),
            ],
        });

        let program = |label, source, extent, access: &[Access]| {
            ComputeProgram::new(device, &uniform_layout, label, source, extent, access)
        };

        let update_velocity = program(
            "update velocity",
            include_str!("shaders/update_velocity.wgsl"),
            Extent::Grid,
            &[Read, Read, ReadWrite, ReadWrite],
        );
        let update_dye = program(
            "update dye",
            include_str!("shaders/update_dye.wgsl"),
            Extent::Dye,
            &[Read, Read, Read, ReadWrite, ReadWrite, ReadWrite],
        );
        let advect = program(
            "advect velocity",
            include_str!("shaders/advect.wgsl"),
            Extent::Grid,
            &[Read, Read, ReadWrite, ReadWrite],
        );
        let boundary = program(
            "boundary",
            include_str!("shaders/boundary.wgsl"),
            Extent::Grid,
            &[Read, Read, ReadWrite, ReadWrite],
        );
        let divergence = program(
            "divergence",
            include_str!("shaders/divergence.wgsl"),
            Extent::Grid,
            &[Read, Read, ReadWrite],
        );
        let vorticity = program(
            "vorticity",
            include_str!("shaders/vorticity.wgsl"),
            Extent::Grid,
            &[Read, Read, ReadWrite],
        );
        let vorticity_confinement = program(
            "vorticity confinement",
            include_str!("shaders/vorticity_confinement.wgsl"),
            Extent::Grid,
            &[Read, Read, Read, ReadWrite, ReadWrite],
        );
        let clear_pressure = program(
            "clear pressure",
            include_str!("shaders/clear_pressure.wgsl"),
            Extent::Grid,
            &[Read, ReadWrite],
        );
        let pressure = program(
            "pressure",
            include_str!("shaders/pressure.wgsl"),
            Extent::Grid,
            &[Read, Read, ReadWrite],
        );
        let gradient_subtract = program(
            "gradient subtract",
            include_str!("shaders/gradient_subtract.wgsl"),
            Extent::Grid,
            &[Read, Read, Read, ReadWrite, ReadWrite],
        );
        let advect_dye = program(
            "advect dye",
            include_str!("shaders/advect_dye.wgsl"),
            Extent::Dye,
            &[Read, Read, Read, Read, Read, ReadWrite, ReadWrite, ReadWrite],
        );

        log::debug!("fluid compute programs created");

        Self {
            uniform_layout,
            update_velocity,
            update_dye,
            advect,
            boundary,
            divergence,
            vorticity,
            vorticity_confinement,
            clear_pressure,
            pressure,
            gradient_subtract,
            advect_dye,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workgroups_cover_partial_tiles() {
        assert_eq!(workgroups(910, 512), (114, 64));
        assert_eq!(workgroups(1, 1), (1, 1));
        assert_eq!(workgroups(8, 16), (1, 2));
    }

    #[test]
    fn pressure_ping_pong_alternates() {
        let order: Vec<_> = (0..4).map(pressure_bind_group_index).collect();
        assert_eq!(order, vec![0, 1, 0, 1]);
    }

    #[test]
    fn pressure_copy_only_for_even_iteration_counts() {
        // Odd counts end on an even iteration, which writes `pressure`.
        assert!(!pressure_result_needs_copy(1));
        assert!(!pressure_result_needs_copy(99));
        assert!(pressure_result_needs_copy(100));
        assert!(pressure_result_needs_copy(0));
    }

    #[test]
    fn extent_picks_grid_or_dye() {
        let sizes = Sizes {
            grid_w: 10,
            grid_h: 20,
            dye_w: 40,
            dye_h: 80,
            rdx: 0,
            dye_rdx: 0,
            dx: 0.0,
        };
        assert_eq!(Extent::Grid.size(&sizes), (10, 20));
        assert_eq!(Extent::Dye.size(&sizes), (40, 80));
    }
}
