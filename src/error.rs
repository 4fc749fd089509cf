use thiserror::Error;

/// Errors produced by the reconstruction core.
///
/// All variants are fatal for the event being processed: no partial output
/// arrays are ever produced once one of these is raised. Data-absence
/// conditions (no trigger collection, no candidate surviving a selection)
/// are represented as empty results, never as errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A configured working-point name has no counterpart in the input data.
    #[error("unknown {kind} working point: '{name}'")]
    UnknownWorkingPoint { kind: &'static str, name: String },

    /// An accessor was invoked with an index outside its collection.
    #[error("{kind} index {index} out of range (collection size {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// Parallel per-object arrays of an input collection disagree in length.
    #[error("{collection} collection malformed: '{field}' has {got} entries, expected {expected}")]
    LengthMismatch {
        collection: &'static str,
        field: &'static str,
        got: usize,
        expected: usize,
    },
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
