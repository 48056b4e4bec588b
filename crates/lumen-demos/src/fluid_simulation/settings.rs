//! Simulation settings and grid sizing.

/// Mirroring applied to mouse splats.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Symmetry {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
    Center,
}

impl Symmetry {
    pub fn next(self) -> Self {
        match self {
            Symmetry::None => Symmetry::Horizontal,
            Symmetry::Horizontal => Symmetry::Vertical,
            Symmetry::Vertical => Symmetry::Both,
            Symmetry::Both => Symmetry::Center,
            Symmetry::Center => Symmetry::None,
        }
    }

    /// Mode index read by the splat shaders.
    pub fn as_index(self) -> f32 {
        match self {
            Symmetry::None => 0.0,
            Symmetry::Horizontal => 1.0,
            Symmetry::Vertical => 2.0,
            Symmetry::Both => 3.0,
            Symmetry::Center => 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Target cell count along the short side of the velocity grid.
    pub grid_size: u32,
    /// Target cell count along the short side of the dye grid.
    pub dye_size: u32,
    pub sim_speed: f32,
    pub contain_fluid: bool,
    pub velocity_add_intensity: f32,
    pub velocity_add_radius: f32,
    pub velocity_diffusion: f32,
    pub dye_add_intensity: f32,
    pub dye_add_radius: f32,
    pub dye_diffusion: f32,
    pub viscosity: f32,
    pub vorticity: f32,
    pub pressure_iterations: u32,
    pub symmetry: Symmetry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_size: 512,
            dye_size: 2048,
            sim_speed: 5.0,
            contain_fluid: true,
            velocity_add_intensity: 0.1,
            velocity_add_radius: 0.0001,
            velocity_diffusion: 0.9999,
            dye_add_intensity: 4.0,
            dye_add_radius: 0.001,
            dye_diffusion: 0.994,
            viscosity: 0.8,
            vorticity: 2.0,
            pressure_iterations: 100,
            symmetry: Symmetry::None,
        }
    }
}

/// Grid dimensions derived from the surface size and device limits.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sizes {
    pub grid_w: u32,
    pub grid_h: u32,
    pub dye_w: u32,
    pub dye_h: u32,
    pub rdx: u32,
    pub dye_rdx: u32,
    pub dx: f32,
}

/// Scales `(w, h)` down until one f32 per cell fits in `max_buffer_size` bytes
/// and neither side exceeds `max_canvas_size`.
pub fn get_valid_dimensions(
    w: u32,
    h: u32,
    max_buffer_size: u64,
    max_canvas_size: u64,
) -> (u32, u32) {
    let mut down_ratio = 1.0f64;

    let bytes = w as u64 * h as u64 * 4;
    if bytes >= max_buffer_size {
        down_ratio = (max_buffer_size as f64 / bytes as f64).sqrt();
    }

    if w as u64 > max_canvas_size {
        down_ratio = max_canvas_size as f64 / w as f64;
    } else if h as u64 > max_canvas_size {
        down_ratio = max_canvas_size as f64 / h as f64;
    }

    (
        (w as f64 * down_ratio).floor() as u32,
        (h as f64 * down_ratio).floor() as u32,
    )
}

/// Fits `size` cells to the short side of the surface, keeping its aspect ratio.
pub fn get_preferred_dimensions(
    size: u32,
    (surface_w, surface_h): (u32, u32),
    max_buffer_size: u64,
    max_canvas_size: u64,
) -> (u32, u32) {
    let aspect = surface_w.max(1) as f64 / surface_h.max(1) as f64;

    let (w, h) = if surface_h < surface_w {
        ((size as f64 * aspect).floor() as u32, size)
    } else {
        (size, (size as f64 / aspect).floor() as u32)
    };

    get_valid_dimensions(w, h, max_buffer_size, max_canvas_size)
}

pub fn init_sizes(settings: &Settings, surface: (u32, u32), limits: &wgpu::Limits) -> Sizes {
    let max_buffer_size = limits.max_storage_buffer_binding_size as u64;
    let max_canvas_size = limits.max_texture_dimension_2d as u64;

    let (grid_w, grid_h) =
        get_preferred_dimensions(settings.grid_size, surface, max_buffer_size, max_canvas_size);
    let (dye_w, dye_h) =
        get_preferred_dimensions(settings.dye_size, surface, max_buffer_size, max_canvas_size);

    let rdx = settings.grid_size * 4;
    let sizes = Sizes {
        grid_w: grid_w.max(1),
        grid_h: grid_h.max(1),
        dye_w: dye_w.max(1),
        dye_h: dye_h.max(1),
        rdx,
        dye_rdx: settings.dye_size * 4,
        dx: 1.0 / rdx.max(1) as f32,
    };
    log::debug!(
        "fluid grid {}x{}, dye {}x{}",
        sizes.grid_w,
        sizes.grid_h,
        sizes.dye_w,
        sizes.dye_h
    );
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIG: u64 = 1 << 30;

    #[test]
    fn valid_dimensions_untouched_within_limits() {
        assert_eq!(get_valid_dimensions(512, 512, BIG, 8192), (512, 512));
    }

    #[test]
    fn valid_dimensions_shrink_to_buffer_limit() {
        let limit = 512 * 512 * 4 / 4;
        assert_eq!(get_valid_dimensions(512, 512, limit, 8192), (256, 256));
    }

    #[test]
    fn buffer_limit_is_inclusive() {
        let limit = 512 * 512 * 4;
        assert_eq!(get_valid_dimensions(512, 512, limit, 8192), (512, 512));
    }

    #[test]
    fn valid_dimensions_shrink_to_canvas_limit() {
        assert_eq!(get_valid_dimensions(16384, 4096, BIG, 8192), (8192, 2048));
        assert_eq!(get_valid_dimensions(4096, 16384, BIG, 8192), (2048, 8192));
    }

    #[test]
    fn preferred_dimensions_follow_surface_aspect() {
        assert_eq!(get_preferred_dimensions(512, (1280, 720), BIG, 8192), (910, 512));
        assert_eq!(get_preferred_dimensions(512, (720, 1280), BIG, 8192), (512, 910));
        assert_eq!(get_preferred_dimensions(512, (800, 800), BIG, 8192), (512, 512));
    }

    #[test]
    fn init_sizes_uses_settings_resolution() {
        let limits = wgpu::Limits::default();
        let sizes = init_sizes(&Settings::default(), (1280, 720), &limits);
        assert_eq!((sizes.grid_w, sizes.grid_h), (910, 512));
        assert_eq!((sizes.dye_w, sizes.dye_h), (3640, 2048));
        assert_eq!(sizes.rdx, 2048);
        assert_eq!(sizes.dye_rdx, 8192);
        assert!((sizes.dx - 1.0 / 2048.0).abs() < f32::EPSILON);
    }

    #[test]
    fn symmetry_cycles_through_all_modes() {
        let mut s = Symmetry::default();
        let mut seen = vec![s.as_index()];
        for _ in 0..4 {
            s = s.next();
            seen.push(s.as_index());
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.next(), Symmetry::None);
    }
}
