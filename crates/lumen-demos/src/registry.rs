//! Named examples selectable from the command line.

use anyhow::Result;
use lumen_engine::core::Example;
use lumen_engine::device::GpuInit;
use lumen_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use crate::blinn_phong::BlinnPhong;
use crate::compute_boids::ComputeBoids;
use crate::config::DemoConfig;
use crate::fluid_simulation::FluidSimulation;
use crate::pbr_ibl::PbrIbl;

pub struct ExampleEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub run: fn(&DemoConfig) -> Result<()>,
}

pub const EXAMPLES: &[ExampleEntry] = &[
    ExampleEntry {
        name: "blinn_phong",
        title: BlinnPhong::TITLE,
        run: run_example::<BlinnPhong>,
    },
    ExampleEntry {
        name: "compute_boids",
        title: ComputeBoids::TITLE,
        run: run_example::<ComputeBoids>,
    },
    ExampleEntry {
        name: "fluid_simulation",
        title: FluidSimulation::TITLE,
        run: run_example::<FluidSimulation>,
    },
    ExampleEntry {
        name: "pbr_ibl",
        title: PbrIbl::TITLE,
        run: run_example::<PbrIbl>,
    },
];

/// Looks up an example; case-insensitive, `-` and `_` are interchangeable.
pub fn find(name: &str) -> Option<&'static ExampleEntry> {
    let wanted = normalize(name);
    EXAMPLES.iter().find(|e| e.name == wanted)
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

fn run_example<E: Example>(cfg: &DemoConfig) -> Result<()> {
    let config = RuntimeConfig {
        title: E::TITLE.to_string(),
        initial_size: LogicalSize::new(cfg.width, cfg.height),
    };
    log::info!(
        "starting {} ({}x{}, msaa {}, vsync {})",
        E::TITLE,
        cfg.width,
        cfg.height,
        cfg.settings.sample_count,
        cfg.vsync
    );
    let gpu_init = GpuInit {
        prefer_srgb: E::SRGB_SURFACE,
        ..GpuInit::default()
    }
    .with_vsync(cfg.vsync);
    Runtime::run::<E>(config, gpu_init, cfg.settings.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_forgiving() {
        assert_eq!(find("compute_boids").map(|e| e.name), Some("compute_boids"));
        assert_eq!(find("Fluid-Simulation").map(|e| e.name), Some("fluid_simulation"));
        assert_eq!(find(" PBR_IBL ").map(|e| e.name), Some("pbr_ibl"));
        assert!(find("shadow_mapping").is_none());
    }

    #[test]
    fn names_are_unique_and_normalized() {
        for (i, e) in EXAMPLES.iter().enumerate() {
            assert_eq!(normalize(e.name), e.name);
            assert!(!e.title.is_empty());
            assert!(EXAMPLES[i + 1..].iter().all(|o| o.name != e.name));
        }
    }
}
