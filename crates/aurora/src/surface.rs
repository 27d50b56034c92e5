use tracing::{debug, trace};

use crate::program::{ProgramSource, UniformBlock};

/// Failures that abort a mount attempt. Neither is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    #[error("no GPU-capable surface is available: {0}")]
    ContextUnavailable(String),
    #[error("shader program failed to compile: {0}")]
    ShaderCompile(String),
}

/// Per-frame presentation failures reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("surface lost")]
    Lost,
    #[error("surface outdated")]
    Outdated,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("{0}")]
    Other(String),
}

/// The GPU half of a mount: one context plus its drawable.
pub trait GpuBackend {
    /// Compiles and binds the program. Called once, right after creation.
    fn compile(&mut self, program: &ProgramSource) -> Result<(), MountError>;
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, uniforms: &UniformBlock) -> Result<(), DrawError>;
    /// Releases every GPU object. Called at most once.
    fn release(&mut self);
}

/// Creates a fresh backend for each lifecycle instance.
pub trait BackendFactory {
    type Backend: GpuBackend;

    fn create(&mut self, width: u32, height: u32) -> Result<Self::Backend, MountError>;
}

/// Owns the backend and the bound program's uniform state for one mount.
///
/// Once destroyed the surface stays inert: resizes and draws become no-ops.
pub struct RenderSurface<B: GpuBackend> {
    backend: Option<B>,
    uniforms: Option<UniformBlock>,
    width: u32,
    height: u32,
}

impl<B: GpuBackend> RenderSurface<B> {
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        Self {
            backend: Some(backend),
            uniforms: None,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Validates and compiles `program` on the backend, then binds `initial`
    /// as its uniforms.
    pub fn bind_program(
        &mut self,
        program: &ProgramSource,
        initial: UniformBlock,
    ) -> Result<(), MountError> {
        let backend = self.backend.as_mut().ok_or_else(|| {
            MountError::ContextUnavailable("surface was destroyed before compilation".into())
        })?;
        program.validate()?;
        backend.compile(program)?;
        self.uniforms = Some(initial);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.uniforms.is_some()
    }

    /// Recomputes the drawable size and pushes the new resolution uniform.
    /// Zero-sized requests (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            trace!(width, height, "ignoring zero-sized resize");
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        self.width = width;
        self.height = height;
        backend.resize(width, height);
        if let Some(uniforms) = self.uniforms.as_mut() {
            uniforms.set_resolution(width, height);
        }
    }

    pub fn uniforms(&self) -> Option<&UniformBlock> {
        self.uniforms.as_ref()
    }

    pub fn uniforms_mut(&mut self) -> Option<&mut UniformBlock> {
        self.uniforms.as_mut()
    }

    /// Draws one frame with the current uniforms. Returns `false` when there is
    /// nothing to draw with (destroyed, or no program bound).
    pub fn draw(&mut self) -> Result<bool, DrawError> {
        match (self.backend.as_mut(), self.uniforms.as_ref()) {
            (Some(backend), Some(uniforms)) => backend.draw(uniforms).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Releases the backend. Safe to call repeatedly and on surfaces whose
    /// program never compiled; returns whether anything was released.
    pub fn destroy(&mut self) -> bool {
        self.uniforms = None;
        match self.backend.take() {
            Some(mut backend) => {
                backend.release();
                debug!(width = self.width, height = self.height, "render surface destroyed");
                true
            }
            None => false,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.backend.is_none()
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }
}

impl<B: GpuBackend> Drop for RenderSurface<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::testing::{BackendLog, RecordingBackend};

    fn block() -> UniformBlock {
        UniformBlock::new(800, 600, &[Rgb::BLACK; 3], 1.0, 0.5)
    }

    fn surface(log: &BackendLog) -> RenderSurface<RecordingBackend> {
        RenderSurface::new(RecordingBackend::new(log.clone()), 800, 600)
    }

    #[test]
    fn resize_pushes_resolution_only_when_bound() {
        let log = BackendLog::default();
        let mut surface = surface(&log);
        surface.resize(1024, 768);
        assert!(surface.uniforms().is_none());
        assert_eq!(surface.size(), (1024, 768));

        surface.bind_program(&ProgramSource::aurora(), block()).unwrap();
        let before = *surface.uniforms().unwrap();
        surface.resize(1280, 720);
        let after = *surface.uniforms().unwrap();
        assert_eq!(after.resolution, [1280.0, 720.0]);
        assert_eq!(after.time, before.time);
        assert_eq!(after.amplitude, before.amplitude);
        assert_eq!(after.blend, before.blend);
        assert_eq!(log.resizes(), vec![(1024, 768), (1280, 720)]);
    }

    #[test]
    fn zero_sized_resizes_are_ignored() {
        let log = BackendLog::default();
        let mut surface = surface(&log);
        surface.bind_program(&ProgramSource::aurora(), block()).unwrap();
        surface.resize(0, 600);
        assert_eq!(surface.size(), (800, 600));
        assert_eq!(surface.uniforms().unwrap().resolution, [800.0, 600.0]);
        assert!(log.resizes().is_empty());
    }

    #[test]
    fn destroy_is_idempotent_and_disables_drawing() {
        let log = BackendLog::default();
        let mut surface = surface(&log);
        surface.bind_program(&ProgramSource::aurora(), block()).unwrap();
        assert_eq!(surface.draw(), Ok(true));

        assert!(surface.destroy());
        assert!(!surface.destroy());
        assert!(surface.is_destroyed());
        assert_eq!(surface.draw(), Ok(false));
        surface.resize(10, 10);
        drop(surface);

        assert_eq!(log.releases(), 1);
        assert_eq!(log.draws().len(), 1);
        assert!(log.resizes().is_empty());
    }

    #[test]
    fn unbound_surfaces_can_be_destroyed() {
        let log = BackendLog::default();
        let mut surface = surface(&log);
        assert_eq!(surface.draw(), Ok(false));
        assert!(surface.destroy());
        assert_eq!(log.releases(), 1);
    }

    #[test]
    fn compile_failure_leaves_the_program_unbound() {
        let log = BackendLog::default();
        log.fail_compile("syntax error");
        let mut surface = surface(&log);
        let err = surface
            .bind_program(&ProgramSource::aurora(), block())
            .unwrap_err();
        assert_eq!(err, MountError::ShaderCompile("syntax error".into()));
        assert!(!surface.is_bound());
        assert!(surface.backend().is_some());
    }
}
