use std::sync::Arc;

use winit::window::Window;

use crate::program::{ProgramSource, UniformBlock};
use crate::surface::{BackendFactory, DrawError, GpuBackend, MountError};
use crate::types::SurfaceOptions;

use super::context::GpuContext;
use super::pipeline::{AuroraPipeline, MultisampleTarget};

/// [`GpuBackend`] drawing into a window surface with wgpu.
pub struct WgpuBackend {
    // Declared first so GPU objects drop before the context that owns them.
    pipeline: Option<AuroraPipeline>,
    msaa: Option<MultisampleTarget>,
    context: Option<GpuContext>,
}

impl WgpuBackend {
    fn rebuild_msaa(&mut self) {
        self.msaa = self.context.as_ref().and_then(|context| {
            (context.sample_count > 1).then(|| {
                MultisampleTarget::new(
                    &context.device,
                    context.format(),
                    context.config.width,
                    context.config.height,
                    context.sample_count,
                )
            })
        });
    }
}

impl GpuBackend for WgpuBackend {
    fn compile(&mut self, program: &ProgramSource) -> Result<(), MountError> {
        let context = self.context.as_ref().ok_or_else(|| {
            MountError::ContextUnavailable("GPU context already released".into())
        })?;
        let pipeline = AuroraPipeline::new(
            &context.device,
            context.format(),
            context.sample_count,
            program,
        )?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(context) = self.context.as_mut() {
            context.resize(width, height);
        }
        self.rebuild_msaa();
    }

    fn draw(&mut self, uniforms: &UniformBlock) -> Result<(), DrawError> {
        let (Some(context), Some(pipeline)) = (self.context.as_ref(), self.pipeline.as_ref()) else {
            return Ok(());
        };

        let frame = context.surface.get_current_texture().map_err(|err| match err {
            wgpu::SurfaceError::Lost => DrawError::Lost,
            wgpu::SurfaceError::Outdated => DrawError::Outdated,
            wgpu::SurfaceError::Timeout => DrawError::Timeout,
            wgpu::SurfaceError::OutOfMemory => DrawError::OutOfMemory,
            other => DrawError::Other(other.to_string()),
        })?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        pipeline.write_uniforms(&context.queue, uniforms);

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("aurora frame"),
            });
        {
            let (attachment, resolve_target) = match self.msaa.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("aurora pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, &pipeline.uniform_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn release(&mut self) {
        self.pipeline = None;
        self.msaa = None;
        if let Some(context) = self.context.take() {
            // Forces context loss so the driver frees everything now rather
            // than whenever the last handle happens to drop.
            context.device.destroy();
            tracing::debug!("GPU device destroyed");
        }
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates a fresh device and surface on a window for every mount.
pub struct WindowSurfaceFactory {
    window: Arc<Window>,
    options: SurfaceOptions,
}

impl WindowSurfaceFactory {
    pub fn new(window: Arc<Window>, options: SurfaceOptions) -> Self {
        Self { window, options }
    }
}

impl BackendFactory for WindowSurfaceFactory {
    type Backend = WgpuBackend;

    fn create(&mut self, width: u32, height: u32) -> Result<WgpuBackend, MountError> {
        let context = GpuContext::new(Arc::clone(&self.window), width, height, self.options)?;
        let mut backend = WgpuBackend {
            pipeline: None,
            msaa: None,
            context: Some(context),
        };
        backend.rebuild_msaa();
        Ok(backend)
    }
}
