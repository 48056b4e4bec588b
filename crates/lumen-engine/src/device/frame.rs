/// A single acquired swap-chain frame.
///
/// Holding the surface texture prevents acquisition of the next frame, so the
/// frame is submitted (and presented) at the end of the same render callback.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
