//! Contracts between the window runtime and the demo scenes.
//!
//! A scene implements [`Example`]; the runtime owns the window, GPU context and
//! frame loop and hands the scene an [`InitCtx`] or [`FrameCtx`] at each step.

mod app;
mod ctx;

pub use app::{AppControl, Example, ExampleSettings};
pub use ctx::{FrameCtx, InitCtx};
