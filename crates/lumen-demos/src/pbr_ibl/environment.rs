//! Environment cubemap: PNG faces from disk or a generated sky.

use anyhow::Result;
use glam::{Vec2, Vec3};
use lumen_engine::core::ExampleSettings;
use lumen_engine::render::{self, CubemapFaces};

const SKY_FACE_SIZE: u32 = 256;

/// Direction through texel `uv` (`[0, 1]`, v pointing down) of cube face `face`,
/// using the `px, nx, py, ny, pz, nz` layer order. Not normalized.
pub fn cube_dir(face: usize, uv: Vec2) -> Vec3 {
    let s = uv.x * 2.0 - 1.0;
    let t = uv.y * 2.0 - 1.0;
    match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    }
}

fn sky_color(dir: Vec3) -> Vec3 {
    let zenith = Vec3::new(0.10, 0.28, 0.65);
    let horizon = Vec3::new(0.75, 0.82, 0.90);
    let ground = Vec3::new(0.22, 0.19, 0.16);
    let sun_dir = Vec3::new(0.4, 0.6, -0.7).normalize();

    let mut color = if dir.y >= 0.0 {
        horizon.lerp(zenith, dir.y.sqrt())
    } else {
        horizon.lerp(ground, (-dir.y * 4.0).min(1.0))
    };

    let sun = dir.dot(sun_dir).max(0.0);
    color += Vec3::splat(sun.powf(256.0) * 4.0 + sun.powf(8.0) * 0.25);
    color.min(Vec3::ONE)
}

fn encode_srgb(linear: f32) -> u8 {
    (linear.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0).round() as u8
}

/// Gradient sky with a sun, above a flat ground color.
pub fn procedural_sky(size: u32) -> CubemapFaces {
    let faces = std::array::from_fn(|face| {
        let mut data = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size as f32;
                let c = sky_color(cube_dir(face, uv).normalize());
                data.extend_from_slice(&[encode_srgb(c.x), encode_srgb(c.y), encode_srgb(c.z), 255]);
            }
        }
        data
    });
    CubemapFaces { size, faces }
}

/// Loads the cubemap directory from the settings, or generates a sky without one.
pub fn create_environment(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    settings: &ExampleSettings,
) -> Result<(wgpu::Texture, wgpu::TextureView)> {
    let faces = match &settings.cubemap_dir {
        Some(dir) => render::load_cubemap_faces(dir)?,
        None => {
            log::info!("no cubemap directory given, using a generated sky");
            procedural_sky(SKY_FACE_SIZE)
        }
    };
    render::create_cubemap(device, queue, "environment cube", &faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_centers_point_along_axes() {
        let center = Vec2::splat(0.5);
        let axes = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        for (face, axis) in axes.iter().enumerate() {
            assert_eq!(cube_dir(face, center), *axis, "face {face}");
        }
    }

    #[test]
    fn top_row_of_side_faces_looks_up() {
        for face in [0, 1, 4, 5] {
            assert!(cube_dir(face, Vec2::new(0.5, 0.0)).y > 0.0, "face {face}");
        }
    }

    #[test]
    fn adjacent_faces_share_edges() {
        // Right edge of +Z meets the left edge of +X.
        let pz = cube_dir(4, Vec2::new(1.0, 0.3));
        let px = cube_dir(0, Vec2::new(0.0, 0.3));
        assert!((pz - px).length() < 1e-6);
    }

    #[test]
    fn sky_is_brighter_above_than_below() {
        let up = sky_color(Vec3::Y);
        let down = sky_color(-Vec3::Y);
        assert!(up.z > down.z);
    }

    #[test]
    fn procedural_sky_faces_validate() {
        let faces = procedural_sky(8);
        assert!(faces.validate().is_ok());
        assert!(faces.faces.iter().all(|f| f.chunks(4).all(|p| p[3] == 255)));
    }
}
