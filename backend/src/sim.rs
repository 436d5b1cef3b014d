//! CPU simulation of the execution backend.
//!
//! [`SimBackend`] runs every submitted stage on a single worker thread,
//! against an in-memory device-buffer arena. It exists for tests and for
//! bring-up on machines without the accelerator; the transform itself is
//! opaque to this layer, so compute phases are modeled as element-wise
//! copies (phase-1 input → intermediate, phase-2 intermediate → output).
//! That keeps length and zero-padding behavior observable end to end without
//! modeling the algorithm.
//!
//! The worker drains jobs in submission order. Dependency tokens always
//! belong to earlier submissions, so waiting on them can never deadlock; the
//! waits are still performed, which keeps the scheduler's dependency edges
//! exercised rather than merely declared.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{BackendShutdownSnafu, Error, RegionSizeSnafu, Result};
use crate::submit::{ComputePhase, DeviceBufferId, ExecutionBackend, StageRequest};
use crate::token::{CompletionToken, StageSignal};

/// One stage handed to the worker thread.
struct Job {
    request: StageRequest,
    deps: Vec<CompletionToken>,
    signal: Arc<StageSignal>,
}

type Arena = Arc<Mutex<HashMap<u64, Box<[u64]>>>>;

/// Worker-thread CPU backend.
pub struct SimBackend {
    arena: Arena,
    next_id: AtomicU64,
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    loaded_program: Mutex<Option<String>>,
}

impl std::fmt::Debug for SimBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBackend")
            .field("buffers", &self.arena.lock().len())
            .field("loaded_program", &*self.loaded_program.lock())
            .finish()
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    /// Start the worker thread and return a ready backend.
    pub fn new() -> Self {
        let arena: Arena = Arc::new(Mutex::new(HashMap::new()));
        let (sender, receiver) = mpsc::channel::<Job>();

        let worker_arena = Arc::clone(&arena);
        let worker = std::thread::Builder::new()
            .name("nttfpga-sim".into())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    Self::run_job(&worker_arena, job);
                }
            })
            .expect("failed to spawn simulation worker thread");

        Self {
            arena,
            next_id: AtomicU64::new(0),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            loaded_program: Mutex::new(None),
        }
    }

    fn run_job(arena: &Arena, job: Job) {
        for dep in &job.deps {
            if let Err(err) = dep.wait() {
                job.signal.fail(format!("dependency failed: {err}"));
                return;
            }
        }

        debug!(stage = job.request.kind(), "sim backend executing stage");
        match Self::execute(arena, job.request) {
            Ok(()) => job.signal.complete(),
            Err(err) => job.signal.fail(err.to_string()),
        }
    }

    fn execute(arena: &Arena, request: StageRequest) -> Result<()> {
        match request {
            StageRequest::TransferIn { src, dst } => {
                let mut buffers = arena.lock();
                let dst_buf = buffers.get_mut(&dst.raw()).ok_or(Error::UnknownBuffer { id: dst.raw() })?;
                let host = src.lock();
                snafu::ensure!(
                    host.len() == dst_buf.len(),
                    RegionSizeSnafu { expected: dst_buf.len(), actual: host.len() }
                );
                dst_buf.copy_from_slice(&host);
                Ok(())
            }
            StageRequest::Compute { phase, input, intermediate, output, .. } => {
                let (src_id, dst_id) = match phase {
                    ComputePhase::Phase1 => (input, intermediate),
                    ComputePhase::Phase2 => (intermediate, output),
                };
                Self::copy_device(arena, src_id, dst_id)
            }
            StageRequest::CoreLaunch { row_size } => {
                debug!(row_size, "sim backend core launch (no-op)");
                Ok(())
            }
            StageRequest::TransferOut { src, dst } => {
                let buffers = arena.lock();
                let src_buf = buffers.get(&src.raw()).ok_or(Error::UnknownBuffer { id: src.raw() })?;
                let mut host = dst.lock();
                snafu::ensure!(
                    host.len() == src_buf.len(),
                    RegionSizeSnafu { expected: src_buf.len(), actual: host.len() }
                );
                host.copy_from_slice(src_buf);
                Ok(())
            }
        }
    }

    /// Copy one device buffer's contents over another of the same length.
    fn copy_device(arena: &Arena, src: DeviceBufferId, dst: DeviceBufferId) -> Result<()> {
        let mut buffers = arena.lock();
        let src_buf = buffers.get(&src.raw()).ok_or(Error::UnknownBuffer { id: src.raw() })?;
        // Copy out first: two disjoint &mut into one map would need unstable APIs.
        let staged = src_buf.clone();
        let dst_buf = buffers.get_mut(&dst.raw()).ok_or(Error::UnknownBuffer { id: dst.raw() })?;
        snafu::ensure!(
            staged.len() == dst_buf.len(),
            RegionSizeSnafu { expected: dst_buf.len(), actual: staged.len() }
        );
        dst_buf.copy_from_slice(&staged);
        Ok(())
    }
}

impl ExecutionBackend for SimBackend {
    fn load_program(&self, path: &Path) -> Result<()> {
        // The simulation has no bitstream to parse; it records the path so
        // diagnostics show what a real device would have been programmed with.
        let displayed = path.display().to_string();
        info!(program = %displayed, "sim backend: program activated");
        *self.loaded_program.lock() = Some(displayed);
        Ok(())
    }

    fn alloc_device(&self, len: usize) -> Result<DeviceBufferId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.arena.lock().insert(id, vec![0u64; len].into_boxed_slice());
        Ok(DeviceBufferId::from_raw(id))
    }

    fn submit(&self, request: StageRequest, deps: &[CompletionToken]) -> Result<CompletionToken> {
        let signal = StageSignal::new();
        let token = CompletionToken::new(Arc::clone(&signal));
        let job = Job { request, deps: deps.to_vec(), signal };

        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(Error::BackendShutdown)?;
        sender.send(job).map_err(|_| Error::BackendShutdown)?;
        Ok(token)
    }

    fn stream(&self, input: &[u32], output_words: usize) -> Result<Vec<u32>> {
        snafu::ensure!(self.sender.lock().is_some(), BackendShutdownSnafu);
        debug!(input_words = input.len(), output_words, "sim backend streaming pass");
        // No software model of the streaming core: the result is all zeros.
        Ok(vec![0u32; output_words])
    }
}

impl Drop for SimBackend {
    fn drop(&mut self) {
        // Close the channel so the worker's recv loop ends, then join.
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}
