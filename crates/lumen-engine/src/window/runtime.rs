use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{AppControl, Example, ExampleSettings, FrameCtx, InitCtx};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputEvent, InputFrame, InputState, Key};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Runtime commands issued by the running example.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }

    /// Replaces the base window title. The FPS suffix is kept.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.commands.push(Command::SetTitle(title.into()));
    }

    /// Freezes or resumes the animation timer reported in `FrameTime`.
    pub fn set_paused(&mut self, paused: bool) {
        self.commands.push(Command::SetPaused(paused));
    }
}

#[derive(Debug)]
enum Command {
    SetTitle(String),
    SetPaused(bool),
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens a window, initializes `E` and drives it until the window closes.
    ///
    /// Initialization and render errors are returned after the loop ends.
    pub fn run<E: Example>(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        settings: ExampleSettings,
    ) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::<E>::new(config, gpu_init, settings);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.shutdown();
        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Field order matters: the example is dropped before the window entry that
/// owns the device.
struct AppState<E: Example> {
    example: Option<E>,
    entry: Option<WindowEntry>,

    config: RuntimeConfig,
    gpu_init: GpuInit,
    settings: ExampleSettings,

    base_title: String,
    last_fps: Option<u32>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<E: Example> AppState<E> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, settings: ExampleSettings) -> Self {
        let base_title = config.title.clone();
        Self {
            example: None,
            entry: None,
            config,
            gpu_init,
            settings,
            base_title,
            last_fps: None,
            exit_requested: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    /// Releases scene resources, then the GPU context and window.
    fn shutdown(&mut self) {
        if self.example.take().is_some() {
            log::info!("{} torn down", E::TITLE);
        }
        self.entry = None;
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let settings = &self.settings;
        let example = entry
            .with_gpu(|gpu| E::init(&mut InitCtx::new(gpu, settings)))
            .with_context(|| format!("failed to initialize {}", E::TITLE))?;

        log::info!("{} initialized", E::TITLE);

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        self.example = Some(example);
        Ok(())
    }

    fn resize(&mut self) -> Result<()> {
        let (Some(entry), Some(example)) = (self.entry.as_mut(), self.example.as_mut()) else {
            return Ok(());
        };

        let new_size = entry.with_window(|w| w.inner_size());
        let configured = entry.with_gpu_mut(|gpu| gpu.resize(new_size));
        if !configured {
            return Ok(());
        }

        let settings = &self.settings;
        entry.with_gpu(|gpu| example.resize(&mut InitCtx::new(gpu, settings)))?;
        entry.with_window(|w| w.request_redraw());
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(entry), Some(example)) = (self.entry.as_mut(), self.example.as_mut()) else {
            return Ok(());
        };

        let settings = &self.settings;
        let mut runtime_ctx = RuntimeCtx::default();
        let mut fps = None;

        let result = entry.with_mut(|fields| -> Result<()> {
            let time = fields.clock.tick();
            fps = fields.clock.poll_fps();

            let acquired = {
                let mut ctx = FrameCtx {
                    gpu: &*fields.gpu,
                    input: &*fields.input_state,
                    input_frame: &*fields.input_frame,
                    time,
                    runtime: &mut runtime_ctx,
                    settings,
                };

                example.update(&mut ctx);

                match ctx.gpu.begin_frame() {
                    Ok(mut frame) => example.render(&mut ctx, &mut frame).map(|()| {
                        fields.window.pre_present_notify();
                        ctx.gpu.submit(frame);
                        Ok(())
                    }),
                    Err(err) => Ok(Err(err)),
                }
            };

            if let Some(err) = finish_frame(fields.input_frame, acquired)? {
                match fields.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => anyhow::bail!("surface lost beyond recovery"),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {}
                }
            }
            Ok(())
        });
        result?;

        if let Some(fps) = fps {
            self.last_fps = Some(fps);
            self.refresh_title();
        }

        if self.apply_commands(runtime_ctx) == AppControl::Exit {
            self.exit_requested = true;
        }
        Ok(())
    }

    fn apply_commands(&mut self, mut ctx: RuntimeCtx) -> AppControl {
        let mut control = AppControl::Continue;
        for cmd in ctx.commands.drain(..) {
            match cmd {
                Command::SetTitle(title) => {
                    self.base_title = title;
                    self.refresh_title();
                }
                Command::SetPaused(paused) => {
                    if let Some(entry) = self.entry.as_mut() {
                        entry.with_clock_mut(|c| c.set_paused(paused));
                    }
                    log::info!("{}", if paused { "paused" } else { "resumed" });
                }
                Command::Exit => control = AppControl::Exit,
            }
        }
        control
    }

    fn refresh_title(&self) {
        let title = format_title(&self.base_title, self.last_fps);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.set_title(&title));
        }
    }
}

/// Consumes the frame's input deltas, whether it was presented, skipped or
/// failed, and hands back a surface error for recovery.
fn finish_frame<E>(input_frame: &mut InputFrame, outcome: Result<Result<(), E>>) -> Result<Option<E>> {
    input_frame.clear();
    Ok(outcome?.err())
}

fn format_title(base: &str, fps: Option<u32>) -> String {
    match fps {
        Some(fps) => format!("{base} - {fps} fps"),
        None => base.to_string(),
    }
}

impl<E: Example> ApplicationHandler for AppState<E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Demos animate every frame.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        if let Some(ev) = translate_window_event(&event) {
            if let InputEvent::Key { key: Key::Escape, .. } = ev {
                self.exit_requested = true;
            }
            entry.with_mut(|fields| fields.input_state.apply_event(fields.input_frame, ev));
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.exit_requested = true;
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Err(e) = self.resize() {
                    self.fail(event_loop, e.context("resize failed"));
                    return;
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e.context("render failed"));
                    return;
                }
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonState;

    #[test]
    fn title_without_fps_is_base() {
        assert_eq!(format_title("Compute boids", None), "Compute boids");
    }

    #[test]
    fn title_carries_fps_suffix() {
        assert_eq!(format_title("PBR", Some(144)), "PBR - 144 fps");
    }

    fn frame_with_space_pressed() -> InputFrame {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key: Key::Space,
                state: ButtonState::Pressed,
                repeat: false,
            },
        );
        assert!(frame.key_pressed(Key::Space));
        frame
    }

    #[test]
    fn failed_render_still_consumes_input() {
        let mut frame = frame_with_space_pressed();
        let outcome: Result<Result<(), ()>> = Err(anyhow::anyhow!("render failed"));
        assert!(finish_frame(&mut frame, outcome).is_err());
        assert!(!frame.key_pressed(Key::Space));
    }

    #[test]
    fn surface_error_is_handed_back() {
        let mut frame = frame_with_space_pressed();
        let outcome: Result<Result<(), &str>> = Ok(Err("outdated"));
        assert_eq!(finish_frame(&mut frame, outcome).ok(), Some(Some("outdated")));
        assert!(!frame.key_pressed(Key::Space));

        let presented: Result<Result<(), &str>> = Ok(Ok(()));
        assert_eq!(finish_frame(&mut frame, presented).ok(), Some(None));
    }

    #[test]
    fn commands_are_buffered_in_order() {
        let mut ctx = RuntimeCtx::default();
        ctx.set_title("a");
        ctx.set_paused(true);
        ctx.exit();
        assert!(matches!(ctx.commands[0], Command::SetTitle(ref t) if t == "a"));
        assert!(matches!(ctx.commands[1], Command::SetPaused(true)));
        assert!(matches!(ctx.commands[2], Command::Exit));
    }
}
