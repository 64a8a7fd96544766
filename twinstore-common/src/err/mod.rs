pub mod error;

pub use error::CoreError;

/// Result alias used across every twinstore crate.
pub type CoreResult<T> = Result<T, CoreError>;
