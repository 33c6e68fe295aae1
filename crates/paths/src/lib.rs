//! Shared API Gateway path definitions
//!
//! This crate centralizes the resource paths API Gateway uses to address
//! taggable entities, the ARNs built from them, and the JSON-pointer
//! encoding used by patch operations, so the controller and its in-memory
//! gateway agree on every string.
//!
//! ## ResourcePath
//!
//! `ResourcePath` is the typed form of `/restapis/{id}`,
//! `/restapis/{id}/stages/{name}`, `/apikeys/{id}` and `/vpclinks/{id}`.
//!
//! ## Arn
//!
//! `Arn` renders `arn:{partition}:apigateway:{region}::{path}`, deriving the
//! partition from the region.

pub mod arn;
pub mod errors;
pub mod pointer;
pub mod resource;

pub use arn::{partition_for_region, Arn};
pub use errors::PathBuilderError;
pub use pointer::{decode_key, encode_key, join};
pub use resource::ResourcePath;
