//! Error types for the driver crate.

use snafu::Snafu;

use crate::variant::CoreType;

/// Result type for driver operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while driving the accelerator pipeline.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Caller data does not fit the active variant's buffer capacity.
    ///
    /// Recoverable: retry with a chunk of at most `capacity` elements.
    #[snafu(display(
        "data length {data_length} exceeds buffer capacity {capacity} (log_row_size = {log_row_size})"
    ))]
    CapacityExceeded { data_length: usize, capacity: usize, log_row_size: u32 },

    /// Release of a slot that is not currently held. Programming error.
    #[snafu(display("cannot release slot {slot}: it is not in use"))]
    DoubleFree { slot: usize },

    /// `load_program` called more than once on the same driver. Programming error.
    #[snafu(display("the accelerator program has already been loaded"))]
    AlreadyLoaded,

    /// No available hardware device could be programmed.
    ///
    /// Fatal: there is no recovery path below this layer. Binary entry
    /// points are expected to exit on it.
    #[snafu(display("failed to program any device with {path}: {reason}"))]
    DeviceProgram { path: String, reason: String },

    /// The (core type, log row size) pair is not a supported configuration.
    #[snafu(display("unsupported variant: {core_type} with log_row_size = {log_row_size}"))]
    UnsupportedVariant { core_type: CoreType, log_row_size: u32 },

    /// A stage was submitted before its predecessor produced a token.
    /// Programming error; the composed evaluation paths cannot hit it.
    #[snafu(display("slot {slot}: {missing} has not been submitted yet"))]
    StageOrder { slot: usize, missing: &'static str },

    /// `evaluate_sync` found every slot in flight. The submitting thread is
    /// the only releaser, so waiting here would deadlock. Programming error.
    #[snafu(display("no free buffer slot for synchronous evaluation: all are in flight"))]
    AllBuffersInFlight,

    /// The execution backend reported an error.
    #[snafu(display("backend error: {source}"))]
    #[snafu(context(false))]
    Backend { source: nttfpga_backend::Error },

    /// File I/O in the streaming self-test.
    #[snafu(display("io error on {path}: {source}"))]
    Io { path: String, source: std::io::Error },

    /// A point file line could not be parsed.
    #[snafu(display("bad point line {line_number}: {reason}"))]
    PointParse { line_number: usize, reason: String },
}
