//! Stage submission interface.
//!
//! [`ExecutionBackend`] is the seam between the pipeline scheduler and
//! whatever actually runs the accelerator: a vendor command-queue wrapper in
//! production, [`SimBackend`](crate::sim::SimBackend) in tests. The contract
//! is deliberately narrow — "submit with dependencies, get a token" plus a
//! blocking wait on the token — so the scheduler's ordering logic never
//! depends on a particular hardware API.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{RegionSizeSnafu, Result};
use crate::token::CompletionToken;

/// Opaque handle to backend-owned device memory.
///
/// Allocated through [`ExecutionBackend::alloc_device`]; the host never
/// addresses device memory directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceBufferId(u64);

impl DeviceBufferId {
    /// Wrap a backend-assigned raw id. Only backend implementations mint
    /// these; the driver treats them as opaque.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Raw id, for diagnostics only.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Fixed-capacity host staging region of `u64` elements.
///
/// Shared between the driver (which fills inputs and reads outputs) and the
/// backend's transfer machinery (which copies to and from device memory).
/// The pipeline's stage ordering guarantees the two never touch a region at
/// the same time; the mutex makes that guarantee checkable rather than
/// assumed.
#[derive(Debug, Clone)]
pub struct HostRegion {
    data: Arc<Mutex<Box<[u64]>>>,
    len: usize,
}

impl HostRegion {
    /// Allocate a zeroed region of `len` elements.
    pub fn new(len: usize) -> Self {
        Self { data: Arc::new(Mutex::new(vec![0u64; len].into_boxed_slice())), len }
    }

    /// Capacity of the region in elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region has zero capacity.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `src` into the head of the region and zero-fill the tail.
    ///
    /// Fails with `RegionSize` if `src` is longer than the region.
    pub fn fill_from(&self, src: &[u64]) -> Result<()> {
        snafu::ensure!(src.len() <= self.len, RegionSizeSnafu { expected: self.len, actual: src.len() });

        let mut data = self.data.lock();
        data[..src.len()].copy_from_slice(src);
        data[src.len()..].fill(0);
        Ok(())
    }

    /// Copy out the first `len` elements.
    pub fn read_prefix(&self, len: usize) -> Result<Vec<u64>> {
        snafu::ensure!(len <= self.len, RegionSizeSnafu { expected: self.len, actual: len });
        Ok(self.data.lock()[..len].to_vec())
    }

    /// Lock the whole region for direct access (backend transfer machinery).
    pub fn lock(&self) -> MutexGuard<'_, Box<[u64]>> {
        self.data.lock()
    }
}

/// Which of the two dependent compute invocations a request addresses.
///
/// One full transform pass is phase-1 followed by phase-2 on the same shared
/// compute core; the phases of different pipeline slots must never interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputePhase {
    Phase1,
    Phase2,
}

impl ComputePhase {
    /// The phase-select bitmask the controller core expects.
    pub fn select_mask(self) -> u8 {
        match self {
            ComputePhase::Phase1 => 0b01,
            ComputePhase::Phase2 => 0b10,
        }
    }
}

impl fmt::Display for ComputePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputePhase::Phase1 => write!(f, "phase1"),
            ComputePhase::Phase2 => write!(f, "phase2"),
        }
    }
}

/// One asynchronous unit of work handed to the backend.
#[derive(Debug, Clone)]
pub enum StageRequest {
    /// Move a host region's contents into a device buffer.
    TransferIn { src: HostRegion, dst: DeviceBufferId },
    /// Run one compute phase over a slot's device buffers.
    Compute {
        phase: ComputePhase,
        input: DeviceBufferId,
        intermediate: DeviceBufferId,
        output: DeviceBufferId,
        row_size: u64,
    },
    /// Explicitly (re-)start the transform core.
    ///
    /// Only handshaking core variants need this; free-running streaming cores
    /// run continuously once the program is active. The resulting token is
    /// not chained into the pipeline.
    CoreLaunch { row_size: u64 },
    /// Move a device buffer's contents back into a host region.
    TransferOut { src: DeviceBufferId, dst: HostRegion },
}

impl StageRequest {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StageRequest::TransferIn { .. } => "transfer_in",
            StageRequest::Compute { phase: ComputePhase::Phase1, .. } => "phase1",
            StageRequest::Compute { phase: ComputePhase::Phase2, .. } => "phase2",
            StageRequest::CoreLaunch { .. } => "core_launch",
            StageRequest::TransferOut { .. } => "transfer_out",
        }
    }
}

/// Asynchronous stage execution with dependency tokens.
///
/// Implementations accept submissions from a single thread at a time (the
/// scheduler's contract) but may execute stages concurrently and out of
/// submission order, subject only to the declared dependencies.
pub trait ExecutionBackend: Send + Sync + fmt::Debug {
    /// Load and activate the accelerator program.
    ///
    /// At-most-once discipline is the driver's responsibility; a backend may
    /// assume it is called a single time. Failure to activate on any device
    /// is unrecoverable below this layer.
    fn load_program(&self, path: &Path) -> Result<()>;

    /// Allocate a device buffer of `len` elements.
    fn alloc_device(&self, len: usize) -> Result<DeviceBufferId>;

    /// Submit one stage, to start only after every token in `deps` completes.
    ///
    /// Non-blocking: returns a token for the stage's own completion.
    fn submit(&self, request: StageRequest, deps: &[CompletionToken]) -> Result<CompletionToken>;

    /// Single-shot blocking streaming evaluation.
    ///
    /// Feeds `input` words through the streaming path and returns exactly
    /// `output_words` result words. Used only by the streaming self-test;
    /// does not touch the pipeline's buffers or ordering state.
    fn stream(&self, input: &[u32], output_words: usize) -> Result<Vec<u32>>;
}
