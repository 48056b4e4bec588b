use std::path::Path;

use anyhow::{ensure, Context, Result};

/// File stems of the six cubemap faces, in array-layer order.
pub const CUBE_FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// Number of mips in a full chain for a square texture of `size` texels.
pub fn mip_level_count(size: u32) -> u32 {
    u32::BITS - size.max(1).leading_zeros()
}

// ── depth ─────────────────────────────────────────────────────────────────

/// Depth attachment sized to the surface.
pub struct DepthTexture {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    size: (u32, u32),
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    pub fn new(
        device: &wgpu::Device,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let (texture, view) = attachment(device, "lumen depth", size, format, sample_count);
        Self {
            format,
            sample_count,
            size,
            _texture: texture,
            view,
        }
    }

    /// Recreates the texture if `size` differs. Returns `true` when recreated.
    pub fn ensure_size(&mut self, device: &wgpu::Device, size: (u32, u32)) -> bool {
        if self.size == size {
            return false;
        }
        *self = Self::new(device, size, self.format, self.sample_count);
        true
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Attachment that clears depth to 1.0 (and stencil to 0 when present).
    pub fn attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        let stencil_ops = self.format.has_stencil_aspect().then_some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(0),
            store: wgpu::StoreOp::Store,
        });
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops,
        }
    }
}

// ── msaa ──────────────────────────────────────────────────────────────────

/// Multisampled color target resolved into the swap-chain view.
///
/// With a sample count of 1 no texture is allocated and rendering goes straight
/// to the swap chain.
pub struct MsaaTarget {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    size: (u32, u32),
    target: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl MsaaTarget {
    pub fn new(
        device: &wgpu::Device,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let sample_count = sample_count.max(1);
        let target = (sample_count > 1)
            .then(|| attachment(device, "lumen msaa color", size, format, sample_count));
        Self {
            format,
            sample_count,
            size,
            target,
        }
    }

    pub fn ensure_size(&mut self, device: &wgpu::Device, size: (u32, u32)) -> bool {
        if self.size == size {
            return false;
        }
        *self = Self::new(device, size, self.format, self.sample_count);
        true
    }

    /// Color attachment that clears to `clear` and ends up in `surface_view`.
    pub fn color_attachment<'a>(
        &'a self,
        surface_view: &'a wgpu::TextureView,
        clear: wgpu::Color,
    ) -> wgpu::RenderPassColorAttachment<'a> {
        let (view, resolve_target) = match &self.target {
            Some((_, msaa_view)) => (msaa_view, Some(surface_view)),
            None => (surface_view, None),
        };
        wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                // The multisampled contents are not needed after the resolve.
                store: if self.target.is_some() {
                    wgpu::StoreOp::Discard
                } else {
                    wgpu::StoreOp::Store
                },
            },
            depth_slice: None,
        }
    }
}

fn attachment(
    device: &wgpu::Device,
    label: &str,
    (width, height): (u32, u32),
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    log::debug!("{label}: {width}x{height} {format:?} x{sample_count}");
    (texture, view)
}

// ── cubemaps ──────────────────────────────────────────────────────────────

/// Six square RGBA8 faces in [`CUBE_FACE_NAMES`] order.
#[derive(Debug, Clone)]
pub struct CubemapFaces {
    pub size: u32,
    pub faces: [Vec<u8>; 6],
}

impl CubemapFaces {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.size > 0, "cubemap face size is zero");
        let expected = self.size as usize * self.size as usize * 4;
        for (name, face) in CUBE_FACE_NAMES.iter().zip(&self.faces) {
            ensure!(
                face.len() == expected,
                "cubemap face {name} has {} bytes, expected {expected}",
                face.len()
            );
        }
        Ok(())
    }
}

/// Uploads six faces into a cube texture (`Rgba8UnormSrgb`, one mip).
///
/// Returns the texture and a `Cube` view.
pub fn create_cubemap(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    faces: &CubemapFaces,
) -> Result<(wgpu::Texture, wgpu::TextureView)> {
    faces.validate()?;

    let size = faces.size;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (layer, data) in faces.faces.iter().enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * 4),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });

    log::debug!("{label}: cubemap {size}x{size}");
    Ok((texture, view))
}

/// Loads `px.png, nx.png, py.png, ny.png, pz.png, nz.png` from `dir`.
///
/// Faces are flipped vertically on load and must be square and equally sized.
pub fn load_cubemap_faces(dir: &Path) -> Result<CubemapFaces> {
    let mut size = None;
    let mut faces: [Vec<u8>; 6] = Default::default();

    for (name, slot) in CUBE_FACE_NAMES.iter().zip(faces.iter_mut()) {
        let path = dir.join(format!("{name}.png"));
        let img = image::open(&path)
            .with_context(|| format!("failed to load cubemap face {}", path.display()))?
            .flipv()
            .to_rgba8();

        let (w, h) = img.dimensions();
        ensure!(w == h, "cubemap face {} is not square ({w}x{h})", path.display());
        match size {
            None => size = Some(w),
            Some(s) => ensure!(
                s == w,
                "cubemap face {} is {w}px, expected {s}px",
                path.display()
            ),
        }
        *slot = img.into_raw();
    }

    let size = size.context("cubemap has no faces")?;
    log::info!("loaded cubemap from {} ({size}px faces)", dir.display());
    Ok(CubemapFaces { size, faces })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        assert_eq!(mip_level_count(1), 1);
        assert_eq!(mip_level_count(2), 2);
        assert_eq!(mip_level_count(512), 10);
        assert_eq!(mip_level_count(513), 10);
        assert_eq!(mip_level_count(0), 1);
    }

    #[test]
    fn face_validation_checks_lengths() {
        let faces = CubemapFaces {
            size: 2,
            faces: std::array::from_fn(|_| vec![0u8; 16]),
        };
        assert!(faces.validate().is_ok());

        let mut bad = faces.clone();
        bad.faces[3].pop();
        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("ny"), "{err}");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_cubemap_faces(Path::new("/nonexistent/lumen-cubemap")).unwrap_err();
        assert!(format!("{err:#}").contains("px.png"));
    }
}
