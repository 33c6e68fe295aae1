//! # Remote Client
//!
//! Abstraction over the API Gateway management API.
//!
//! The reconciler only ever talks to a [`RemoteClient`]. Two implementations
//! exist:
//!
//! - [`aws::ApiGatewayClient`] over `aws-sdk-apigateway`
//! - [`memory::InMemoryGateway`], an in-process fake used by tests and local runs
//!
//! Every entity is addressed by its composite key ([`RemoteKey`]) and
//! described by a [`FieldMap`] keyed by patch path, so both implementations
//! speak the same vocabulary as the descriptors.

pub mod aws;
pub mod memory;
pub mod patch;
pub mod tags;

use crate::descriptor::{FieldMap, Identifiers, Kind};
use async_trait::async_trait;
use paths::{Arn, ResourcePath};
use std::collections::BTreeMap;
use thiserror::Error;

pub use patch::{PatchOp, PatchOperation, PatchSet};
pub use tags::{TagDelta, TagPolicy};

/// Composite remote key, e.g. `restApiId` + `resourceId` + `httpMethod`
pub type RemoteKey = Identifiers;

/// A remote entity as returned by the management API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteEntity {
    pub key: RemoteKey,
    /// Spec-mirroring attributes keyed by patch path
    pub fields: FieldMap,
    /// Remote-only attributes (rootResourceId, path, status...)
    pub read_only: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    pub arn: Option<String>,
}

impl RemoteEntity {
    pub fn read_only(&self, name: &str) -> Option<&str> {
        self.read_only.get(name).map(String::as_str)
    }
}

/// Everything needed to create an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    /// Spec-supplied key components (parent ids, httpMethod, stageName...)
    pub identifiers: Identifiers,
    pub fields: FieldMap,
    /// User tags merged with system tags
    pub tags: BTreeMap<String, String>,
}

/// An in-place modification of an existing entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDelta {
    pub patch: PatchSet,
    pub tags: TagDelta,
}

impl UpdateDelta {
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty() && self.tags.is_empty()
    }
}

/// Errors returned by the remote management API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("throttled: {0}")]
    Throttled(String),

    #[error("conflict: {message}")]
    Conflict {
        /// Key of the entity that already exists, when derivable
        existing: Option<RemoteKey>,
        message: String,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown remote error: {0}")]
    Unknown(String),
}

/// How the reconciler treats a remote error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The entity does not exist
    Absent,
    /// Retry with backoff
    Transient,
    /// Stop until the spec changes
    Terminal,
}

impl RemoteError {
    /// `Unknown` is transient here; the reconciler bounds how often it is retried.
    pub fn classify(&self) -> ErrorClass {
        match self {
            RemoteError::NotFound(_) => ErrorClass::Absent,
            RemoteError::Throttled(_) | RemoteError::Unknown(_) => ErrorClass::Transient,
            RemoteError::Conflict { .. }
            | RemoteError::Unauthorized(_)
            | RemoteError::InvalidInput(_) => ErrorClass::Terminal,
        }
    }

    /// Short reason used in conditions and metric labels
    pub fn reason(&self) -> &'static str {
        match self {
            RemoteError::NotFound(_) => "NotFound",
            RemoteError::Throttled(_) => "Throttled",
            RemoteError::Conflict { .. } => "Conflict",
            RemoteError::Unauthorized(_) => "Unauthorized",
            RemoteError::InvalidInput(_) => "InvalidInput",
            RemoteError::Unknown(_) => "Unknown",
        }
    }
}

/// ARN of a taggable entity, `None` for kinds API Gateway cannot tag
pub fn resource_arn(
    kind: Kind,
    key: &RemoteKey,
    region: &str,
) -> Result<Option<String>, RemoteError> {
    let part = |name: &str| key.get(name).map(String::as_str).unwrap_or_default();
    let path = match kind {
        Kind::RestApi => ResourcePath::rest_api(part("restApiId")),
        Kind::Stage => ResourcePath::stage(part("restApiId"), part("stageName")),
        Kind::ApiKey => ResourcePath::api_key(part("apiKeyId")),
        Kind::VpcLink => ResourcePath::vpc_link(part("vpcLinkId")),
        _ => return Ok(None),
    };
    let arn = path
        .and_then(|path| Arn::new(region, path))
        .map_err(|e| RemoteError::InvalidInput(e.to_string()))?;
    Ok(Some(arn.to_string()))
}

/// The API Gateway management API
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn fetch(&self, kind: Kind, key: &RemoteKey) -> Result<RemoteEntity, RemoteError>;

    async fn create(&self, kind: Kind, request: CreateRequest)
        -> Result<RemoteEntity, RemoteError>;

    async fn update(
        &self,
        kind: Kind,
        key: &RemoteKey,
        delta: UpdateDelta,
    ) -> Result<RemoteEntity, RemoteError>;

    async fn delete(&self, kind: Kind, key: &RemoteKey) -> Result<(), RemoteError>;
}
