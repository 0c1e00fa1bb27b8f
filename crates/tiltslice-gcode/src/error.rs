//! Error types for G-code output.

use thiserror::Error;

/// Errors raised while writing a program.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// The output could not be written.
    #[error("failed to write G-code: {0}")]
    Io(#[from] std::io::Error),

    /// The layer count handed to the templates disagrees with the layers
    /// actually emitted.
    #[error("layer count mismatch: expected {expected}, emitted {emitted}")]
    LayerCountMismatch {
        /// Count announced by the instruction stream.
        expected: usize,
        /// Layers written.
        emitted: usize,
    },
}

/// Result type for G-code operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
