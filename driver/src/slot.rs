//! Buffer slots: one reusable unit of in-flight work.
//!
//! A slot carries host staging regions, the device buffers backing one
//! pipeline pass, and the completion tokens of the four stages it cycles
//! through. Slots are created once at driver construction and recycled
//! `Free → Acquired → … → Free` for the life of the process.

use std::sync::Arc;

use nttfpga_backend::{CompletionToken, DeviceBufferId, ExecutionBackend, HostRegion};
use strum::Display;

use crate::error::{CapacityExceededSnafu, Result};
use crate::variant::Variant;

/// Where a slot sits in its lifecycle.
///
/// Only `Free ↔ Acquired` is caller-controlled; the scheduler owns every
/// other transition, and while acquired the states advance strictly in
/// pipeline order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Acquired,
    TransferringIn,
    Phase1,
    Phase2,
    TransferringOut,
}

impl SlotState {
    /// Whether the slot is held by a caller (acquired or later).
    pub fn in_use(self) -> bool {
        self != SlotState::Free
    }
}

/// Handle to a slot in the pool's arena.
///
/// Just an index; the pool validates state on every use, so a stale handle
/// surfaces as `DoubleFree` rather than touching another caller's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHandle {
    pub(crate) index: usize,
}

impl SlotHandle {
    /// The slot's pool index (stable for its lifetime).
    pub fn index(self) -> usize {
        self.index
    }
}

/// Completion tokens of the four in-flight stages.
///
/// Each field is valid only once its stage has been submitted in the current
/// cycle; releasing the slot clears all of them so a token can never leak
/// into the next cycle.
#[derive(Debug, Default, Clone)]
pub(crate) struct StageTokens {
    pub transfer_in: Option<CompletionToken>,
    pub phase1: Option<CompletionToken>,
    pub phase2: Option<CompletionToken>,
    pub transfer_out: Option<CompletionToken>,
}

/// One reusable pipeline buffer.
#[derive(Debug)]
pub struct BufferSlot {
    index: usize,
    state: SlotState,
    capacity: usize,
    log_row_size: u32,
    /// Caller-visible input staging, exactly `capacity` elements.
    host_input: HostRegion,
    /// Caller-visible output staging, exactly `capacity` elements.
    host_output: HostRegion,
    /// Device-resident input, written by transfer-in.
    pub(crate) device_input: DeviceBufferId,
    /// Device-resident scratch between the phases; the host never reads it.
    pub(crate) device_intermediate: DeviceBufferId,
    /// Device-resident output, read by transfer-out.
    pub(crate) device_output: DeviceBufferId,
    /// Elements of real caller data in the current cycle.
    data_length: usize,
    pub(crate) tokens: StageTokens,
}

impl BufferSlot {
    /// Allocate a slot's regions and device buffers.
    pub(crate) fn new(index: usize, variant: &Variant, backend: &Arc<dyn ExecutionBackend>) -> Result<Self> {
        let capacity = variant.capacity();
        Ok(Self {
            index,
            state: SlotState::Free,
            capacity,
            log_row_size: variant.log_row_size(),
            host_input: HostRegion::new(capacity),
            host_output: HostRegion::new(capacity),
            device_input: backend.alloc_device(capacity)?,
            device_intermediate: backend.alloc_device(capacity)?,
            device_output: backend.alloc_device(capacity)?,
            data_length: 0,
            tokens: StageTokens::default(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SlotState) {
        self.state = state;
    }

    /// Elements of caller data written in the current cycle.
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    pub(crate) fn host_input(&self) -> &HostRegion {
        &self.host_input
    }

    pub(crate) fn host_output(&self) -> &HostRegion {
        &self.host_output
    }

    /// Copy caller data into the input region, zero-padding up to capacity.
    ///
    /// Fails fast with `CapacityExceeded` before any hardware state is
    /// touched if `data` does not fit.
    pub(crate) fn write_input(&mut self, data: &[u64]) -> Result<()> {
        snafu::ensure!(
            data.len() <= self.capacity,
            CapacityExceededSnafu {
                data_length: data.len(),
                capacity: self.capacity,
                log_row_size: self.log_row_size,
            }
        );
        self.host_input.fill_from(data)?;
        self.data_length = data.len();
        Ok(())
    }

    /// Read back the first `data_length` elements of the output region.
    pub(crate) fn read_output(&self) -> Result<Vec<u64>> {
        Ok(self.host_output.read_prefix(self.data_length)?)
    }

    /// Return the slot to `Free`, dropping every token from the finished
    /// cycle. Stale tokens must never be observable after this point.
    pub(crate) fn recycle(&mut self) {
        self.state = SlotState::Free;
        self.data_length = 0;
        self.tokens = StageTokens::default();
    }
}
