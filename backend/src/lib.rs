//! Execution-backend boundary for the NTT FPGA host driver.
//!
//! The driver crate never talks to hardware directly: every stage of the
//! pipeline (host-to-device transfer, the two compute phases, device-to-host
//! transfer) is handed to an [`ExecutionBackend`] as a [`StageRequest`] plus
//! a list of dependency [`CompletionToken`]s, and the backend answers with a
//! fresh token for the stage's own completion.
//!
//! Two implementations matter in practice:
//! - a vendor backend wrapping the accelerator's command-submission API
//!   (out of tree), and
//! - [`SimBackend`], a worker-thread CPU simulation used by tests and for
//!   software bring-up.

pub mod error;
pub mod sim;
pub mod submit;
pub mod token;


pub use error::{Error, Result};
pub use sim::SimBackend;
pub use submit::{ComputePhase, DeviceBufferId, ExecutionBackend, HostRegion, StageRequest};
pub use token::{CompletionToken, StageSignal};
