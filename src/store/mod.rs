//! # Object Store
//!
//! Access to the custom resources themselves: reading desired state,
//! writing status, and managing the finalizer.
//!
//! [`KubeStore`] talks to the cluster API; [`InMemoryStore`] backs tests and
//! local runs.

mod kube;
mod memory;

pub use self::kube::KubeStore;
pub use self::memory::InMemoryStore;

use crate::crd::{ManagedObject, ObjectRef, ResourceStatus};
use crate::descriptor::Kind;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(ObjectRef),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] ::kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Custom resource storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, object: &ObjectRef) -> Result<Option<ManagedObject>, StoreError>;

    /// Every live object of `kind`
    async fn list(&self, kind: Kind) -> Result<Vec<ManagedObject>, StoreError>;

    async fn patch_status(
        &self,
        object: &ObjectRef,
        status: &ResourceStatus,
    ) -> Result<(), StoreError>;

    async fn ensure_finalizer(&self, object: &ObjectRef) -> Result<(), StoreError>;

    /// Drop the finalizer so a pending deletion can complete
    async fn release(&self, object: &ObjectRef) -> Result<(), StoreError>;
}
