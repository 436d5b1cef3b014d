//! The public driver facade.
//!
//! [`NttDriver`] owns the buffer pool, the pipeline scheduler, and a handle
//! to the execution backend, and exposes the operations callers actually
//! use: acquire/release a slot, write input, run the pipeline (async or
//! sync), wait, and read output.

use std::path::Path;
use std::sync::Arc;

use nttfpga_backend::ExecutionBackend;
use snafu::ensure;
use tracing::info;

use crate::error::{AllBuffersInFlightSnafu, AlreadyLoadedSnafu, DeviceProgramSnafu, Result};
use crate::pool::{BufferPool, DEFAULT_POOL_SIZE};
use crate::scheduler::PipelineScheduler;
use crate::slot::{BufferSlot, SlotHandle};
use crate::timing::timed;
use crate::variant::Variant;

#[derive(Debug)]
pub struct NttDriver {
    variant: Variant,
    backend: Arc<dyn ExecutionBackend>,
    pool: BufferPool,
    scheduler: PipelineScheduler,
    program_loaded: bool,
}

impl NttDriver {
    /// Build a driver for `variant` with the default pool size.
    pub fn new(variant: Variant, backend: Arc<dyn ExecutionBackend>) -> Result<Self> {
        Self::with_pool_size(variant, backend, DEFAULT_POOL_SIZE)
    }

    /// Build a driver with an explicit number of buffers in flight.
    ///
    /// The pool size is fixed for the driver's lifetime.
    pub fn with_pool_size(variant: Variant, backend: Arc<dyn ExecutionBackend>, pool_size: usize) -> Result<Self> {
        let pool = BufferPool::new(&backend, &variant, pool_size)?;
        let scheduler = PipelineScheduler::new(Arc::clone(&backend), variant);
        info!(
            core_type = %variant.core_type(),
            log_row_size = variant.log_row_size(),
            capacity = variant.capacity(),
            pool_size,
            "driver constructed"
        );
        Ok(Self { variant, backend, pool, scheduler, program_loaded: false })
    }

    /// Load and activate the accelerator program.
    ///
    /// Must be called exactly once per driver; a second call fails with
    /// `AlreadyLoaded`. A `DeviceProgram` failure is fatal — no device
    /// means no possible progress, and binaries are expected to exit on it.
    pub fn load_program(&mut self, path: &Path) -> Result<()> {
        ensure!(!self.program_loaded, AlreadyLoadedSnafu);
        self.backend.load_program(path).map_err(|err| {
            DeviceProgramSnafu { path: path.display().to_string(), reason: err.to_string() }.build()
        })?;
        self.program_loaded = true;
        info!(path = %path.display(), "accelerator program loaded");
        Ok(())
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Buffer capacity in elements (`row_size²`).
    pub fn capacity(&self) -> usize {
        self.variant.capacity()
    }

    /// Number of buffers that can be in flight simultaneously.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Number of slots currently held.
    pub fn buffers_in_use(&self) -> usize {
        self.pool.in_use()
    }

    /// Hand out a free slot, or `None` if all are in flight (backpressure).
    pub fn acquire_buffer(&mut self) -> Option<SlotHandle> {
        self.pool.acquire()
    }

    /// Return a slot to the pool. `DoubleFree` if it is not held.
    pub fn release_buffer(&mut self, handle: SlotHandle) -> Result<()> {
        self.pool.release(handle)
    }

    /// Inspect a slot (state, data length).
    pub fn slot(&self, handle: SlotHandle) -> &BufferSlot {
        self.pool.slot(handle)
    }

    /// Copy caller data into the slot's input region, zero-padded to
    /// capacity. Fails with `CapacityExceeded` before any submission if the
    /// data does not fit.
    pub fn write_input(&mut self, handle: SlotHandle, data: &[u64]) -> Result<()> {
        self.pool.slot_mut(handle).write_input(data)
    }

    /// Read back the first `data_length` elements of the slot's output.
    pub fn read_output(&self, handle: SlotHandle) -> Result<Vec<u64>> {
        self.pool.slot(handle).read_output()
    }

    /// Submit all four pipeline stages for the slot; returns once the last
    /// submission call is made, not once work completes.
    pub fn evaluate_async(&mut self, handle: SlotHandle) -> Result<()> {
        self.scheduler.evaluate_async(self.pool.slot_mut(handle))
    }

    /// Block until the slot's results have landed in its output region.
    pub fn wait(&self, handle: SlotHandle) -> Result<()> {
        self.scheduler.wait(self.pool.slot(handle))
    }

    /// Synchronous convenience composition: acquire, write, run the four
    /// stages, wait, read, release.
    pub fn evaluate_sync(&mut self, data: &[u64]) -> Result<Vec<u64>> {
        let handle = self.acquire_for_sync()?;
        let result = self.run_sync(handle, data);
        // The slot goes back even when the pass failed.
        let released = self.release_buffer(handle);
        let output = result?;
        released?;
        Ok(output)
    }

    /// `evaluate_sync` with a blocking wait after each stage and per-stage
    /// timing logs. Much slower than the pipelined path; useful when
    /// attributing latency to individual stages.
    pub fn evaluate_sync_profiled(&mut self, data: &[u64]) -> Result<Vec<u64>> {
        let handle = self.acquire_for_sync()?;
        let result = timed("evaluate (profiled)", || self.run_sync_profiled(handle, data));
        let released = self.release_buffer(handle);
        let output = result?;
        released?;
        Ok(output)
    }

    fn acquire_for_sync(&mut self) -> Result<SlotHandle> {
        // The submitting thread is the only releaser, so blocking here on an
        // exhausted pool could never make progress.
        self.acquire_buffer().ok_or_else(|| AllBuffersInFlightSnafu.build())
    }

    fn run_sync(&mut self, handle: SlotHandle, data: &[u64]) -> Result<Vec<u64>> {
        self.write_input(handle, data)?;
        self.evaluate_async(handle)?;
        self.wait(handle)?;
        self.read_output(handle)
    }

    fn run_sync_profiled(&mut self, handle: SlotHandle, data: &[u64]) -> Result<Vec<u64>> {
        timed("copy input to staging", || self.write_input(handle, data))?;

        timed("transfer input to device", || -> Result<()> {
            let slot = self.pool.slot_mut(handle);
            self.scheduler.submit_transfer_in(slot)?;
            wait_stage(slot.tokens.transfer_in.as_ref())
        })?;

        timed("compute (phase1 + phase2)", || -> Result<()> {
            self.scheduler.submit_phase1(self.pool.slot_mut(handle))?;
            let slot = self.pool.slot_mut(handle);
            self.scheduler.submit_phase2(slot)?;
            wait_stage(slot.tokens.phase2.as_ref())
        })?;

        timed("transfer result to host", || -> Result<()> {
            let slot = self.pool.slot_mut(handle);
            self.scheduler.submit_transfer_out(slot)?;
            wait_stage(slot.tokens.transfer_out.as_ref())
        })?;

        timed("copy output from staging", || self.read_output(handle))
    }
}

fn wait_stage(token: Option<&nttfpga_backend::CompletionToken>) -> Result<()> {
    match token {
        Some(token) => Ok(token.wait()?),
        // Unreachable: each submit_* call above just stored its token.
        None => Ok(()),
    }
}
