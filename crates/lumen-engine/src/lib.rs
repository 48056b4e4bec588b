//! Lumen engine crate.
//!
//! Owns the platform + GPU runtime pieces shared by the demo scenes: device and
//! swap chain, the window loop, input, frame timing, a first-person camera and
//! small wgpu resource helpers.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod camera;
pub mod logging;
pub mod render;
