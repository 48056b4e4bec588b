use std::path::PathBuf;

use anyhow::Result;

use crate::device::GpuFrame;

use super::ctx::{FrameCtx, InitCtx};

/// Control directive for the runtime loop.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Options shared by every scene, filled in from the command line.
#[derive(Debug, Clone)]
pub struct ExampleSettings {
    /// MSAA sample count for scenes that support multisampling (1 or 4).
    pub sample_count: u32,

    /// Directory with six cubemap faces (`px.png`, `nx.png`, ...).
    pub cubemap_dir: Option<PathBuf>,
}

impl Default for ExampleSettings {
    fn default() -> Self {
        Self {
            sample_count: 4,
            cubemap_dir: None,
        }
    }
}

/// A self-contained GPU scene.
///
/// The value only exists after a successful [`Example::init`], and every GPU
/// resource it allocates is owned by it, so dropping the value tears the scene
/// down. The runtime drops it before the device.
pub trait Example: Sized + 'static {
    /// Window title.
    const TITLE: &'static str;

    /// Whether the swap chain should use an sRGB format. Scenes that apply
    /// their own gamma curve turn this off.
    const SRGB_SURFACE: bool = true;

    /// Creates buffers, textures and pipelines.
    fn init(ctx: &mut InitCtx<'_, '_>) -> Result<Self>;

    /// Called after the surface was reconfigured to a new non-zero size.
    fn resize(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Input handling and CPU-side state updates, once per frame before rendering.
    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        let _ = ctx;
    }

    /// Encodes the frame's passes into `frame.encoder`.
    ///
    /// The runtime submits and presents afterwards. An error ends the run.
    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>, frame: &mut GpuFrame) -> Result<()>;
}
