//! In-memory backend that records every GPU call.
//!
//! Lets the lifecycle, driver and host binding run headless: tests inspect
//! the [`BackendLog`] shared by a [`RecordingFactory`] and the backends it
//! creates, and can inject failures at each step.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::program::{ProgramSource, UniformBlock};
use crate::surface::{BackendFactory, DrawError, GpuBackend, MountError};

#[derive(Debug, Default)]
struct LogState {
    created: Vec<(u32, u32)>,
    compiles: usize,
    resizes: Vec<(u32, u32)>,
    draws: Vec<UniformBlock>,
    releases: usize,
    create_failure: Option<String>,
    compile_failure: Option<String>,
    draw_failures: VecDeque<DrawError>,
}

/// Shared record of backend activity.
#[derive(Debug, Clone, Default)]
pub struct BackendLog {
    state: Rc<RefCell<LogState>>,
}

impl BackendLog {
    /// Sizes passed to [`BackendFactory::create`], one per mount.
    pub fn created(&self) -> Vec<(u32, u32)> {
        self.state.borrow().created.clone()
    }

    pub fn compiles(&self) -> usize {
        self.state.borrow().compiles
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.state.borrow().resizes.clone()
    }

    /// Uniforms of every submitted frame, oldest first.
    pub fn draws(&self) -> Vec<UniformBlock> {
        self.state.borrow().draws.clone()
    }

    pub fn last_draw(&self) -> Option<UniformBlock> {
        self.state.borrow().draws.last().copied()
    }

    pub fn releases(&self) -> usize {
        self.state.borrow().releases
    }

    /// Makes every following `create` fail with `ContextUnavailable`.
    pub fn fail_create(&self, message: &str) {
        self.state.borrow_mut().create_failure = Some(message.to_string());
    }

    /// Makes every following `compile` fail with `ShaderCompile`.
    pub fn fail_compile(&self, message: &str) {
        self.state.borrow_mut().compile_failure = Some(message.to_string());
    }

    /// Queues an error for the next draw.
    pub fn fail_next_draw(&self, err: DrawError) {
        self.state.borrow_mut().draw_failures.push_back(err);
    }
}

/// Backend that only records what it is asked to do.
#[derive(Debug)]
pub struct RecordingBackend {
    log: BackendLog,
}

impl RecordingBackend {
    pub fn new(log: BackendLog) -> Self {
        Self { log }
    }
}

impl GpuBackend for RecordingBackend {
    fn compile(&mut self, _program: &ProgramSource) -> Result<(), MountError> {
        let mut state = self.log.state.borrow_mut();
        state.compiles += 1;
        match &state.compile_failure {
            Some(message) => Err(MountError::ShaderCompile(message.clone())),
            None => Ok(()),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.state.borrow_mut().resizes.push((width, height));
    }

    fn draw(&mut self, uniforms: &UniformBlock) -> Result<(), DrawError> {
        let mut state = self.log.state.borrow_mut();
        if let Some(err) = state.draw_failures.pop_front() {
            return Err(err);
        }
        state.draws.push(*uniforms);
        Ok(())
    }

    fn release(&mut self) {
        self.log.state.borrow_mut().releases += 1;
    }
}

/// Factory handing out [`RecordingBackend`]s that share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    log: BackendLog,
}

impl RecordingFactory {
    pub fn new(log: BackendLog) -> Self {
        Self { log }
    }
}

impl BackendFactory for RecordingFactory {
    type Backend = RecordingBackend;

    fn create(&mut self, width: u32, height: u32) -> Result<RecordingBackend, MountError> {
        let mut state = self.log.state.borrow_mut();
        if let Some(message) = &state.create_failure {
            return Err(MountError::ContextUnavailable(message.clone()));
        }
        state.created.push((width, height));
        drop(state);
        Ok(RecordingBackend::new(self.log.clone()))
    }
}
