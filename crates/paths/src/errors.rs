//! Errors raised while building paths and ARNs.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathBuilderError {
    /// A path segment (id or name) was empty
    #[error("path segment `{0}` must not be empty")]
    EmptySegment(&'static str),

    /// The region could not be mapped to an AWS partition
    #[error("invalid region `{0}`")]
    InvalidRegion(String),
}
