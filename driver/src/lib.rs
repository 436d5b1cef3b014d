//! Host-side pipeline driver for the two-phase NTT FPGA accelerator.
//!
//! The accelerator performs one transform pass as two dependent compute
//! phases on a single shared core, bracketed by host↔device transfers. This
//! crate overlaps transfer latency with compute latency across a fixed pool
//! of reusable buffers while keeping the shared core strictly serialized:
//!
//! - [`variant`]: the closed set of supported core/row-size configurations.
//! - [`slot`] / [`pool`]: reusable staging buffers and their lifecycle.
//! - [`scheduler`]: the four-stage submission pipeline and the cross-slot
//!   serialization edge.
//! - [`driver`]: the [`NttDriver`] facade callers use.
//! - [`streaming`]: the unrelated single-shot streaming self-test.
//!
//! All hardware access goes through the `nttfpga-backend` crate's
//! [`ExecutionBackend`](nttfpga_backend::ExecutionBackend) seam.

pub mod driver;
pub mod error;
pub mod pool;
pub mod scheduler;
pub mod slot;
pub mod streaming;
pub mod timing;
pub mod variant;


pub use driver::NttDriver;
pub use error::{Error, Result};
pub use pool::{BufferPool, DEFAULT_POOL_SIZE};
pub use scheduler::PipelineScheduler;
pub use slot::{BufferSlot, SlotHandle, SlotState};
pub use variant::{CoreType, Variant};
