//! Fixed-size pool of buffer slots.
//!
//! The pool is the only place slots change hands: `acquire` returns a free
//! slot (or `None` under exhaustion, which is backpressure rather than an
//! error) and `release` returns it. No fairness order is defined for which
//! free slot is handed out; the scan just takes the first one.

use std::sync::Arc;

use nttfpga_backend::ExecutionBackend;
use tracing::trace;

use crate::error::{DoubleFreeSnafu, Result};
use crate::slot::{BufferSlot, SlotHandle, SlotState};
use crate::variant::Variant;

/// Default number of buffers in flight.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Index-addressed arena of [`BufferSlot`]s.
#[derive(Debug)]
pub struct BufferPool {
    slots: Vec<BufferSlot>,
}

impl BufferPool {
    /// Allocate `pool_size` slots, each with its device buffers.
    pub fn new(backend: &Arc<dyn ExecutionBackend>, variant: &Variant, pool_size: usize) -> Result<Self> {
        let slots = (0..pool_size)
            .map(|index| BufferSlot::new(index, variant, backend))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { slots })
    }

    /// Hand out any free slot, marking it acquired.
    ///
    /// `None` means every slot is in flight; callers handle that by waiting
    /// or queuing, not by treating it as failure.
    pub fn acquire(&mut self) -> Option<SlotHandle> {
        let slot = self.slots.iter_mut().find(|slot| !slot.state().in_use())?;
        slot.set_state(SlotState::Acquired);
        trace!(slot = slot.index(), "slot acquired");
        Some(SlotHandle { index: slot.index() })
    }

    /// Return a slot to the free state, clearing its cycle's tokens.
    ///
    /// Releasing a slot that is not currently held is a `DoubleFree`
    /// programming error and leaves the pool unchanged.
    pub fn release(&mut self, handle: SlotHandle) -> Result<()> {
        let slot = &mut self.slots[handle.index];
        snafu::ensure!(slot.state().in_use(), DoubleFreeSnafu { slot: handle.index });
        slot.recycle();
        trace!(slot = handle.index, "slot released");
        Ok(())
    }

    pub fn slot(&self, handle: SlotHandle) -> &BufferSlot {
        &self.slots[handle.index]
    }

    pub fn slot_mut(&mut self, handle: SlotHandle) -> &mut BufferSlot {
        &mut self.slots[handle.index]
    }

    /// Number of slots currently acquired or later.
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.state().in_use()).count()
    }

    /// Total number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
