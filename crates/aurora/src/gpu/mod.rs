//! wgpu implementation of the backend traits.
//!
//! - `context` owns the instance/device/surface wiring for one mount and
//!   reconfigures the swapchain on resize.
//! - `pipeline` compiles the GLSL program into a premultiplied-alpha render
//!   pipeline with a single uniform bind group.
//! - `backend` ties both together behind [`crate::surface::GpuBackend`].

mod backend;
mod context;
mod pipeline;

pub use backend::{WgpuBackend, WindowSurfaceFactory};
