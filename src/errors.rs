use thiserror::Error;

/// Errors returned by local, non-fatal operations (buffer map/copy/flush,
/// picker staging setup). Fatal initialization failures are propagated as
/// plain `anyhow::Error` instead, since the contract for those is to abort.
#[derive(Debug, Error)]
pub enum EvkError {
    #[error("memory is not host-visible")]
    NotHostVisible,

    #[error("sub-buffer {0} is not currently mapped")]
    NotMapped(usize),

    #[error("copy of {size} bytes at offset {offset} overruns buffer of size {capacity}")]
    CopyOutOfBounds {
        size: u64,
        offset: u64,
        capacity: u64,
    },

    #[error("no suitable memory type for the requested properties")]
    NoSuitableMemoryType,

    #[error("failed to find a supported depth/stencil format")]
    NoSupportedDepthFormat,
}

#[derive(Debug, Error)]
#[error("device is unsuitable: {0}")]
pub struct SuitabilityError(pub &'static str);
