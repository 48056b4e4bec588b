//! Uniform blocks shared by the compute and render programs.

use bytemuck::{Pod, Zeroable};
use lumen_engine::render::{self, BufferKind};

use super::settings::{Settings, Sizes};

/// Grid dimensions as seen by the shaders (`GridSize` in WGSL).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GridUniform {
    pub w: f32,
    pub h: f32,
    pub dye_w: f32,
    pub dye_h: f32,
    pub dx: f32,
    pub rdx: f32,
    pub dye_rdx: f32,
    pub _pad: f32,
}

impl From<&Sizes> for GridUniform {
    fn from(s: &Sizes) -> Self {
        Self {
            w: s.grid_w as f32,
            h: s.grid_h as f32,
            dye_w: s.dye_w as f32,
            dye_h: s.dye_h as f32,
            dx: s.dx,
            rdx: s.rdx as f32,
            dye_rdx: s.dye_rdx as f32,
            _pad: 0.0,
        }
    }
}

/// Per-frame simulation inputs (`SimParams` in WGSL).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SimUniform {
    pub time: f32,
    pub dt: f32,
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub mouse_vx: f32,
    pub mouse_vy: f32,
    pub sim_speed: f32,
    pub velocity_add_intensity: f32,
    pub velocity_add_radius: f32,
    pub velocity_diffusion: f32,
    pub dye_add_intensity: f32,
    pub dye_add_radius: f32,
    pub dye_diffusion: f32,
    pub viscosity: f32,
    pub vorticity: f32,
    pub contain_fluid: f32,
    pub symmetry: f32,
    pub splat_active: f32,
    pub _pad: [f32; 2],
}

impl SimUniform {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            time: 0.0,
            dt: 0.0,
            mouse_x: 0.0,
            mouse_y: 0.0,
            mouse_vx: 0.0,
            mouse_vy: 0.0,
            sim_speed: settings.sim_speed,
            velocity_add_intensity: settings.velocity_add_intensity,
            velocity_add_radius: settings.velocity_add_radius,
            velocity_diffusion: settings.velocity_diffusion,
            dye_add_intensity: settings.dye_add_intensity,
            dye_add_radius: settings.dye_add_radius,
            dye_diffusion: settings.dye_diffusion,
            viscosity: settings.viscosity,
            vorticity: settings.vorticity,
            contain_fluid: if settings.contain_fluid { 1.0 } else { 0.0 },
            symmetry: settings.symmetry.as_index(),
            splat_active: 0.0,
            _pad: [0.0; 2],
        }
    }
}

/// A single scalar padded to a 16-byte uniform slot.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ScalarUniform {
    pub value: f32,
    pub _pad: [f32; 3],
}

impl ScalarUniform {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            _pad: [0.0; 3],
        }
    }
}

/// CPU copy of a uniform value with dirty tracking.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    value: T,
    needs_update: bool,
    always_update: bool,
}

impl<T: Copy + PartialEq> Tracked<T> {
    /// The initial value is considered uploaded.
    pub fn new(value: T, always_update: bool) -> Self {
        Self {
            value,
            needs_update: false,
            always_update,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        if value != self.value {
            self.value = value;
            self.needs_update = true;
        }
    }

    /// Returns the value to upload, if any, and marks it clean.
    pub fn take_update(&mut self) -> Option<T> {
        if !(self.needs_update || self.always_update) {
            return None;
        }
        self.needs_update = false;
        Some(self.value)
    }
}

pub struct UniformBlock<T> {
    tracked: Tracked<T>,
    buffer: wgpu::Buffer,
}

impl<T: Pod + PartialEq> UniformBlock<T> {
    pub fn new(device: &wgpu::Device, label: &str, value: T, always_update: bool) -> Self {
        let buffer = render::create_buffer_with_data(
            device,
            label,
            std::slice::from_ref(&value),
            BufferKind::Uniform,
        );
        Self {
            tracked: Tracked::new(value, always_update),
            buffer,
        }
    }

    pub fn value(&self) -> &T {
        self.tracked.value()
    }

    pub fn set(&mut self, value: T) {
        self.tracked.set(value);
    }

    /// Uploads the value when it changed (or always, for per-frame blocks).
    pub fn update(&mut self, queue: &wgpu::Queue) {
        if let Some(value) = self.tracked.take_update() {
            queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&value));
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<GridUniform>(), 32);
        assert_eq!(std::mem::size_of::<SimUniform>(), 80);
        assert_eq!(std::mem::size_of::<ScalarUniform>(), 16);
    }

    #[test]
    fn tracked_uploads_only_after_change() {
        let mut t = Tracked::new(1.0f32, false);
        assert_eq!(t.take_update(), None);

        t.set(1.0);
        assert_eq!(t.take_update(), None);

        t.set(2.0);
        assert_eq!(t.take_update(), Some(2.0));
        assert_eq!(t.take_update(), None);
    }

    #[test]
    fn always_update_uploads_every_time() {
        let mut t = Tracked::new(3u32, true);
        assert_eq!(t.take_update(), Some(3));
        assert_eq!(t.take_update(), Some(3));
    }

    #[test]
    fn grid_uniform_mirrors_sizes() {
        let sizes = Sizes {
            grid_w: 910,
            grid_h: 512,
            dye_w: 3640,
            dye_h: 2048,
            rdx: 2048,
            dye_rdx: 8192,
            dx: 1.0 / 2048.0,
        };
        let g = GridUniform::from(&sizes);
        assert_eq!((g.w, g.h, g.dye_w, g.dye_h), (910.0, 512.0, 3640.0, 2048.0));
        assert_eq!(g.rdx, 2048.0);
    }

    #[test]
    fn sim_uniform_encodes_flags_as_floats() {
        let settings = Settings {
            contain_fluid: false,
            ..Settings::default()
        };
        let s = SimUniform::from_settings(&settings);
        assert_eq!(s.contain_fluid, 0.0);
        assert_eq!(s.symmetry, 0.0);
    }
}
