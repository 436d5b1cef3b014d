//! Core variant configuration.
//!
//! The accelerator ships as a small closed set of bitstream variants, each
//! fixing a logarithmic row size. A transform over `2^(2r)` elements is laid
//! out as a `2^r × 2^r` matrix, so the buffer capacity is always the square
//! of the row size.

use strum::Display;

use crate::error::{Result, UnsupportedVariantSnafu};

/// Which transform core the bitstream carries.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreType {
    /// Bit-reverse core with explicit start/stop handshaking.
    Reverse,
    /// Free-running streaming NTT over 2^12 elements.
    Ntt2_12,
    /// Free-running streaming NTT over 2^18 elements.
    Ntt2_18,
    /// Free-running streaming NTT over 2^24 elements.
    Ntt2_24,
}

/// A supported (core type, row size) configuration.
///
/// Immutable once constructed; the driver derives its buffer capacity and
/// launch behavior from it for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    core_type: CoreType,
    log_row_size: u32,
}

impl Variant {
    /// Largest row-size exponent any shipped reverse core supports.
    const MAX_REVERSE_LOG_ROW_SIZE: u32 = 12;

    /// Validate a (core type, log row size) pair against the closed set of
    /// shipped bitstreams.
    pub fn new(core_type: CoreType, log_row_size: u32) -> Result<Self> {
        let supported = match core_type {
            CoreType::Reverse => (1..=Self::MAX_REVERSE_LOG_ROW_SIZE).contains(&log_row_size),
            CoreType::Ntt2_12 => log_row_size == 6,
            CoreType::Ntt2_18 => log_row_size == 9,
            CoreType::Ntt2_24 => log_row_size == 12,
        };
        snafu::ensure!(supported, UnsupportedVariantSnafu { core_type, log_row_size });
        Ok(Self { core_type, log_row_size })
    }

    /// The 2^12-element NTT core.
    pub fn ntt_2_12() -> Self {
        Self { core_type: CoreType::Ntt2_12, log_row_size: 6 }
    }

    /// The 2^18-element NTT core.
    pub fn ntt_2_18() -> Self {
        Self { core_type: CoreType::Ntt2_18, log_row_size: 9 }
    }

    /// The 2^24-element NTT core.
    pub fn ntt_2_24() -> Self {
        Self { core_type: CoreType::Ntt2_24, log_row_size: 12 }
    }

    /// A reverse core for the given row-size exponent.
    pub fn reverse(log_row_size: u32) -> Result<Self> {
        Self::new(CoreType::Reverse, log_row_size)
    }

    pub fn core_type(&self) -> CoreType {
        self.core_type
    }

    pub fn log_row_size(&self) -> u32 {
        self.log_row_size
    }

    /// Elements per matrix row: `2^log_row_size`.
    pub fn row_size(&self) -> u64 {
        1u64 << self.log_row_size
    }

    /// Buffer capacity in elements: `row_size²`.
    pub fn capacity(&self) -> usize {
        (self.row_size() * self.row_size()) as usize
    }

    /// Whether the core needs an explicit launch before each compute phase.
    ///
    /// The reverse core uses a start/stop handshake; the streaming NTT cores
    /// run continuously off their AXI streams once the program is active.
    pub fn needs_core_launch(&self) -> bool {
        matches!(self.core_type, CoreType::Reverse)
    }
}
