use crate::device::Gpu;
use crate::input::{InputFrame, InputState, Key};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::ExampleSettings;

/// Context for resource creation (`Example::init` and `Example::resize`).
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct InitCtx<'a, 'w> {
    pub gpu: &'a Gpu<'w>,
    pub settings: &'a ExampleSettings,
}

impl<'a, 'w> InitCtx<'a, 'w> {
    pub fn new(gpu: &'a Gpu<'w>, settings: &'a ExampleSettings) -> Self {
        Self { gpu, settings }
    }

    pub fn device(&self) -> &wgpu::Device {
        self.gpu.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.gpu.queue()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.gpu.surface_format()
    }

    /// Drawable size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        let s = self.gpu.size();
        (s.width.max(1), s.height.max(1))
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.gpu.aspect_ratio()
    }
}

/// Per-frame context passed to `Example::update` and `Example::render`.
pub struct FrameCtx<'a, 'w> {
    pub gpu: &'a Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
    pub settings: &'a ExampleSettings,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    pub fn device(&self) -> &wgpu::Device {
        self.gpu.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.gpu.queue()
    }

    /// Drawable size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        let s = self.gpu.size();
        (s.width.max(1), s.height.max(1))
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.gpu.aspect_ratio()
    }

    /// True if `key` went down this frame.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.input_frame.key_pressed(key)
    }
}
