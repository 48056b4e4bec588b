//! Jos Stam's stable fluids on compute shaders.
//!
//! Velocity, pressure and helper fields live on a grid sized from the surface;
//! dye lives on a finer grid. Each frame the selected field is copied into the
//! rgb buffers and drawn with a full-screen quad.

mod dynamic_buffer;
mod programs;
mod render;
mod settings;
mod simulation;
mod uniforms;

use anyhow::Result;
use glam::Vec2;
use lumen_engine::core::{Example, FrameCtx, InitCtx};
use lumen_engine::device::GpuFrame;
use lumen_engine::input::{Key, MouseButton};

use programs::Programs;
use render::{RenderField, RenderProgram};
use settings::Settings;
use simulation::Simulation;
use uniforms::SimUniform;

/// Longest frame the solver integrates in one step, before `sim_speed`.
const MAX_FRAME_DT: f32 = 1.0 / 30.0;

pub fn sim_dt(frame_dt: f32, sim_speed: f32) -> f32 {
    frame_dt.min(MAX_FRAME_DT) * sim_speed
}

/// Pointer position in `[0, 1]` with y pointing up.
pub fn normalized_pointer((x, y): (f32, f32), (w, h): (u32, u32)) -> Vec2 {
    Vec2::new(x / w.max(1) as f32, 1.0 - y / h.max(1) as f32)
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct MouseInfo {
    pub current: Vec2,
    pub last: Vec2,
    pub velocity: Vec2,
    tracking: bool,
}

impl MouseInfo {
    /// Records this frame's pointer. Velocity is zero on the first frame after
    /// the pointer (re)enters the window.
    pub fn update(&mut self, pointer: Option<Vec2>) {
        match pointer {
            Some(p) => {
                self.last = if self.tracking { self.current } else { p };
                self.current = p;
                self.velocity = self.current - self.last;
                self.tracking = true;
            }
            None => {
                self.velocity = Vec2::ZERO;
                self.tracking = false;
            }
        }
    }
}

/// Splats follow the held left button; a still pointer keeps adding dye.
pub fn splat_active(left_down: bool, pointer: Option<Vec2>) -> bool {
    left_down && pointer.is_some()
}

/// Key presses of one frame.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Controls {
    pub field: Option<RenderField>,
    pub toggle_contain: bool,
    pub next_symmetry: bool,
    pub clear: bool,
    pub toggle_pause: bool,
}

impl Controls {
    fn read(ctx: &FrameCtx<'_, '_>) -> Self {
        const FIELD_KEYS: [(Key, u32); 5] = [
            (Key::Digit1, 1),
            (Key::Digit2, 2),
            (Key::Digit3, 3),
            (Key::Digit4, 4),
            (Key::Digit5, 5),
        ];
        Self {
            field: FIELD_KEYS
                .iter()
                .find(|(k, _)| ctx.key_pressed(*k))
                .and_then(|(_, n)| RenderField::from_number(*n)),
            toggle_contain: ctx.key_pressed(Key::C),
            next_symmetry: ctx.key_pressed(Key::S),
            clear: ctx.key_pressed(Key::R),
            toggle_pause: ctx.key_pressed(Key::Space),
        }
    }
}

/// Work left for the frame once the settings are updated.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ControlEffects {
    pub clear_fields: bool,
    pub paused: Option<bool>,
}

pub fn apply_controls(settings: &mut Settings, controls: Controls, paused: bool) -> ControlEffects {
    if controls.toggle_contain {
        settings.contain_fluid = !settings.contain_fluid;
    }
    if controls.next_symmetry {
        settings.symmetry = settings.symmetry.next();
    }
    ControlEffects {
        clear_fields: controls.clear,
        paused: controls.toggle_pause.then_some(!paused),
    }
}

pub struct FluidSimulation {
    settings: Settings,
    programs: Programs,
    sim: Simulation,
    render: RenderProgram,
    render_bind_group: wgpu::BindGroup,
    field: RenderField,
    mouse: MouseInfo,
    splat_active: bool,
}

impl FluidSimulation {
    fn sim_values(&self, ctx: &FrameCtx<'_, '_>) -> SimUniform {
        let s = &self.settings;
        SimUniform {
            time: ctx.time.run_time,
            dt: sim_dt(ctx.time.dt, s.sim_speed),
            mouse_x: self.mouse.current.x,
            mouse_y: self.mouse.current.y,
            mouse_vx: self.mouse.velocity.x,
            mouse_vy: self.mouse.velocity.y,
            splat_active: if self.splat_active { 1.0 } else { 0.0 },
            ..SimUniform::from_settings(s)
        }
    }

    fn set_field(&mut self, field: RenderField) {
        if field != self.field {
            log::info!("rendering {field:?}");
            self.field = field;
            self.render.set_field(field);
        }
    }
}

impl Example for FluidSimulation {
    const TITLE: &'static str = "Fluid Simulation";

    fn init(ctx: &mut InitCtx<'_, '_>) -> Result<Self> {
        let settings = Settings::default();
        let device = ctx.device();

        let sizes = settings::init_sizes(&settings, ctx.size(), &ctx.gpu.limits());
        let programs = Programs::new(device);
        let sim = Simulation::new(device, &programs, sizes, SimUniform::from_settings(&settings))?;

        let field = RenderField::default();
        let render = RenderProgram::new(device, ctx.surface_format(), field);
        let render_bind_group = render.bind(device, &sim);

        Ok(Self {
            settings,
            programs,
            sim,
            render,
            render_bind_group,
            field,
            mouse: MouseInfo::default(),
            splat_active: false,
        })
    }

    fn resize(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()> {
        let sizes = settings::init_sizes(&self.settings, ctx.size(), &ctx.gpu.limits());
        if sizes == self.sim.sizes {
            return Ok(());
        }
        let device = ctx.device();
        self.sim = Simulation::new(device, &self.programs, sizes, *self.sim.sim.value())?;
        self.render_bind_group = self.render.bind(device, &self.sim);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        let controls = Controls::read(ctx);
        if let Some(field) = controls.field {
            self.set_field(field);
        }

        let effects = apply_controls(&mut self.settings, controls, ctx.time.paused);
        if controls.toggle_contain {
            log::info!("contain fluid: {}", self.settings.contain_fluid);
        }
        if controls.next_symmetry {
            log::info!("symmetry: {:?}", self.settings.symmetry);
        }
        if effects.clear_fields {
            self.sim.fields.clear(ctx.queue());
        }
        if let Some(paused) = effects.paused {
            ctx.runtime.set_paused(paused);
        }

        let pointer = ctx
            .input
            .pointer_pos
            .map(|p| normalized_pointer(p, ctx.size()));
        self.mouse.update(pointer);
        self.splat_active = splat_active(ctx.input.button_down(MouseButton::Left), pointer);
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>, frame: &mut GpuFrame) -> Result<()> {
        let queue = ctx.queue();

        if !ctx.time.paused {
            let values = self.sim_values(ctx);
            self.sim.sim.set(values);
            self.sim.sim.update(queue);
            self.sim.grid.update(queue);
            self.sim.encode_step(
                &self.programs,
                self.settings.pressure_iterations,
                &mut frame.encoder,
            );
        }

        let fields = &self.sim.fields;
        self.field.source(fields).copy_to(&fields.rgb, &mut frame.encoder);

        self.render
            .draw(queue, &mut frame.encoder, &frame.view, &self.render_bind_group);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_dt_clamps_long_frames() {
        assert!((sim_dt(1.0 / 60.0, 5.0) - 5.0 / 60.0).abs() < 1e-6);
        assert!((sim_dt(0.25, 5.0) - 5.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn pointer_is_normalized_with_y_up() {
        let p = normalized_pointer((320.0, 180.0), (1280, 720));
        assert!((p - Vec2::new(0.25, 0.75)).length() < 1e-6);
        assert_eq!(normalized_pointer((0.0, 720.0), (1280, 720)), Vec2::ZERO);
    }

    #[test]
    fn mouse_velocity_is_frame_delta() {
        let mut m = MouseInfo::default();
        m.update(Some(Vec2::new(0.5, 0.5)));
        assert_eq!(m.velocity, Vec2::ZERO);

        m.update(Some(Vec2::new(0.6, 0.4)));
        assert!((m.velocity - Vec2::new(0.1, -0.1)).length() < 1e-6);
        assert_eq!(m.last, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn held_button_splats_without_motion() {
        let mut m = MouseInfo::default();
        let p = Some(Vec2::new(0.5, 0.5));
        m.update(p);
        m.update(p);
        assert_eq!(m.velocity, Vec2::ZERO);
        assert!(splat_active(true, p));

        assert!(!splat_active(false, p));
        assert!(!splat_active(true, None));
    }

    #[test]
    fn controls_toggle_settings() {
        let mut settings = Settings::default();
        let contain = settings.contain_fluid;
        let symmetry = settings.symmetry;

        let effects = apply_controls(&mut settings, Controls::default(), false);
        assert_eq!(effects, ControlEffects::default());
        assert_eq!(settings, Settings::default());

        let press = Controls {
            toggle_contain: true,
            next_symmetry: true,
            ..Controls::default()
        };
        apply_controls(&mut settings, press, false);
        assert_eq!(settings.contain_fluid, !contain);
        assert_eq!(settings.symmetry, symmetry.next());

        apply_controls(&mut settings, press, false);
        assert_eq!(settings.contain_fluid, contain);
    }

    #[test]
    fn clear_and_pause_are_reported() {
        let mut settings = Settings::default();
        let press = Controls {
            clear: true,
            toggle_pause: true,
            ..Controls::default()
        };
        let effects = apply_controls(&mut settings, press, false);
        assert!(effects.clear_fields);
        assert_eq!(effects.paused, Some(true));

        let effects = apply_controls(&mut settings, press, true);
        assert_eq!(effects.paused, Some(false));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn mouse_reentry_does_not_jump() {
        let mut m = MouseInfo::default();
        m.update(Some(Vec2::new(0.1, 0.1)));
        m.update(None);
        assert_eq!(m.velocity, Vec2::ZERO);

        m.update(Some(Vec2::new(0.9, 0.9)));
        assert_eq!(m.velocity, Vec2::ZERO);
        assert_eq!(m.current, Vec2::new(0.9, 0.9));
    }
}
