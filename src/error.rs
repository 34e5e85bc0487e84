use thiserror::Error;

/// Errors surfaced by the search engine.
///
/// `OutOfMemory` mirrors the allocation-failure contract of the original
/// C implementation; Rust's allocator aborts the process rather than
/// returning, so in practice this variant is only reachable from the
/// test-only allocation hook in `bitvector`.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("allocation failure")]
    OutOfMemory,

    #[error("invalid parameters: {detail}")]
    InvalidParams { detail: String },

    #[error("numeric failure: {detail}")]
    NumericFailure { detail: String },
}

pub type Result<T> = std::result::Result<T, TrainError>;
