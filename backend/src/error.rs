use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A submitted stage was reported failed by the backend.
    #[snafu(display("stage failed: {reason}"))]
    StageFailed { reason: String },

    /// The backend's worker has shut down and no longer accepts submissions.
    #[snafu(display("backend is shut down"))]
    BackendShutdown,

    /// A stage request referenced a device buffer the backend never allocated.
    #[snafu(display("unknown device buffer id {id}"))]
    UnknownBuffer { id: u64 },

    /// A host region's length did not match the device buffer it is paired with.
    #[snafu(display("region size mismatch: expected {expected} elements, got {actual}"))]
    RegionSize { expected: usize, actual: usize },

    /// The accelerator program could not be loaded/activated on any device.
    #[snafu(display("failed to load program {path}: {reason}"))]
    ProgramLoad { path: String, reason: String },
}
