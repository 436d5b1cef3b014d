//! Pipeline scheduler: the four-stage sequence and the cross-slot
//! serialization edge.
//!
//! Every slot runs transfer-in → phase-1 → phase-2 → transfer-out, chained
//! by completion tokens so per-slot order never depends on caller timing.
//! The two compute phases of every slot address the same physical core, so
//! slot *N*'s phase-1 additionally depends on slot *N−1*'s phase-2 token:
//! compute work is strict FIFO across slots by submission order, while
//! transfers of different slots overlap freely. That single extra edge is
//! the entire scheduling policy — submissions are never reordered.

use std::sync::Arc;

use nttfpga_backend::{CompletionToken, ComputePhase, ExecutionBackend, StageRequest};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Result, StageOrderSnafu};
use crate::slot::{BufferSlot, SlotState};
use crate::variant::Variant;

/// At most two tokens are ever pending for one submission: the slot's own
/// predecessor stage plus the serialization edge.
type Deps = SmallVec<[CompletionToken; 2]>;

#[derive(Debug)]
pub struct PipelineScheduler {
    backend: Arc<dyn ExecutionBackend>,
    variant: Variant,
    /// The slot whose phase-2 was submitted last, with a clone of that
    /// token. This is the only cross-slot state: written once per
    /// `submit_phase2`, read once by the next `submit_phase1`. Not
    /// ownership — just the token the serialization edge needs.
    last_submitted: Option<(usize, CompletionToken)>,
}

impl PipelineScheduler {
    pub fn new(backend: Arc<dyn ExecutionBackend>, variant: Variant) -> Self {
        Self { backend, variant, last_submitted: None }
    }

    /// Index of the most recently submitted slot, if any.
    pub fn last_submitted_slot(&self) -> Option<usize> {
        self.last_submitted.as_ref().map(|(index, _)| *index)
    }

    /// Stage 1: host input region → device input buffer.
    ///
    /// Depends on nothing from other slots and may start immediately.
    pub fn submit_transfer_in(&mut self, slot: &mut BufferSlot) -> Result<()> {
        let token = self.backend.submit(
            StageRequest::TransferIn { src: slot.host_input().clone(), dst: slot.device_input },
            &[],
        )?;
        debug!(slot = slot.index(), "submitted transfer-in");
        slot.tokens.transfer_in = Some(token);
        slot.set_state(SlotState::TransferringIn);
        Ok(())
    }

    /// Stage 2: first compute phase.
    ///
    /// Depends on this slot's transfer-in and, when another slot went
    /// through the core before us, on that slot's phase-2 completion. The
    /// second edge is what keeps the shared core single-occupancy without
    /// stalling anyone's transfers.
    pub fn submit_phase1(&mut self, slot: &mut BufferSlot) -> Result<()> {
        let mut deps = Deps::new();
        deps.push(self.stage_token(slot, slot.tokens.transfer_in.as_ref(), "transfer-in")?);
        if let Some((prev_index, prev_phase2)) = &self.last_submitted {
            debug!(slot = slot.index(), prev = *prev_index, "serializing phase-1 behind previous slot's phase-2");
            deps.push(prev_phase2.clone());
        }

        self.launch_core_if_needed()?;
        let token = self.backend.submit(self.compute_request(slot, ComputePhase::Phase1), &deps)?;
        slot.tokens.phase1 = Some(token);
        slot.set_state(SlotState::Phase1);
        Ok(())
    }

    /// Stage 3: second compute phase.
    ///
    /// Depends on this slot's phase-1; afterwards this slot becomes the one
    /// the next slot's phase-1 serializes behind.
    pub fn submit_phase2(&mut self, slot: &mut BufferSlot) -> Result<()> {
        let dep = self.stage_token(slot, slot.tokens.phase1.as_ref(), "phase-1")?;

        self.launch_core_if_needed()?;
        let token = self.backend.submit(self.compute_request(slot, ComputePhase::Phase2), &[dep])?;
        debug!(slot = slot.index(), "submitted phase-2");
        self.last_submitted = Some((slot.index(), token.clone()));
        slot.tokens.phase2 = Some(token);
        slot.set_state(SlotState::Phase2);
        Ok(())
    }

    /// Stage 4: device output buffer → host output region.
    pub fn submit_transfer_out(&mut self, slot: &mut BufferSlot) -> Result<()> {
        let dep = self.stage_token(slot, slot.tokens.phase2.as_ref(), "phase-2")?;
        let token = self.backend.submit(
            StageRequest::TransferOut { src: slot.device_output, dst: slot.host_output().clone() },
            &[dep],
        )?;
        debug!(slot = slot.index(), "submitted transfer-out");
        slot.tokens.transfer_out = Some(token);
        slot.set_state(SlotState::TransferringOut);
        Ok(())
    }

    /// Submit all four stages in order; returns after the last submission
    /// call, not after completion.
    pub fn evaluate_async(&mut self, slot: &mut BufferSlot) -> Result<()> {
        self.submit_transfer_in(slot)?;
        self.submit_phase1(slot)?;
        self.submit_phase2(slot)?;
        self.submit_transfer_out(slot)
    }

    /// Block until the slot's transfer-out completes.
    ///
    /// A backend failure for any stage in the chain surfaces here as
    /// `StageFailed`, since failed dependencies poison their dependents.
    pub fn wait(&self, slot: &BufferSlot) -> Result<()> {
        let token = self.stage_token(slot, slot.tokens.transfer_out.as_ref(), "transfer-out")?;
        token.wait()?;
        Ok(())
    }

    fn compute_request(&self, slot: &BufferSlot, phase: ComputePhase) -> StageRequest {
        StageRequest::Compute {
            phase,
            input: slot.device_input,
            intermediate: slot.device_intermediate,
            output: slot.device_output,
            row_size: self.variant.row_size(),
        }
    }

    /// Handshaking cores must be re-launched before every compute phase;
    /// free-running cores ignore this. The launch token is deliberately not
    /// chained: the core's own handshake orders it against the controller.
    fn launch_core_if_needed(&self) -> Result<()> {
        if self.variant.needs_core_launch() {
            self.backend.submit(StageRequest::CoreLaunch { row_size: self.variant.row_size() }, &[])?;
        }
        Ok(())
    }

    fn stage_token(
        &self,
        slot: &BufferSlot,
        token: Option<&CompletionToken>,
        stage: &'static str,
    ) -> Result<CompletionToken> {
        match token {
            Some(token) => Ok(token.clone()),
            None => StageOrderSnafu { slot: slot.index(), missing: stage }.fail(),
        }
    }
}
