//! # In-Memory Store
//!
//! Mimics the API server semantics the controller relies on: `generation`
//! bumps on spec changes only, a deletion with a finalizer present only sets
//! the deletion marker, and releasing the finalizer of a deleted object
//! removes it.

use super::{ObjectStore, StoreError};
use crate::crd::{KindSpec, ManagedObject, ObjectKey, ObjectRef, ResourceStatus};
use crate::descriptor::Kind;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<ObjectRef, ManagedObject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update an object's spec, returning its generation
    pub async fn apply(&self, key: ObjectKey, spec: KindSpec) -> i64 {
        let mut objects = self.objects.write().await;
        let reference = ObjectRef {
            kind: spec.kind(),
            key: key.clone(),
        };
        match objects.get_mut(&reference) {
            Some(existing) => {
                if existing.spec != spec {
                    existing.spec = spec;
                    existing.generation += 1;
                }
                existing.generation
            }
            None => {
                let object = ManagedObject::new(key, spec);
                let generation = object.generation;
                objects.insert(reference, object);
                generation
            }
        }
    }

    /// Request deletion; returns false when the object does not exist
    pub async fn delete(&self, object: &ObjectRef) -> bool {
        let mut objects = self.objects.write().await;
        match objects.get_mut(object) {
            Some(existing) if existing.has_finalizer => {
                existing.deletion_requested = true;
                true
            }
            Some(_) => {
                objects.remove(object);
                true
            }
            None => false,
        }
    }

    pub async fn snapshot(&self, object: &ObjectRef) -> Option<ManagedObject> {
        self.objects.read().await.get(object).cloned()
    }

    pub async fn refs(&self) -> Vec<ObjectRef> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, object: &ObjectRef) -> Result<Option<ManagedObject>, StoreError> {
        Ok(self.snapshot(object).await)
    }

    async fn list(&self, kind: Kind) -> Result<Vec<ManagedObject>, StoreError> {
        Ok(self
            .objects
            .read()
            .await
            .values()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect())
    }

    async fn patch_status(
        &self,
        object: &ObjectRef,
        status: &ResourceStatus,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let existing = objects
            .get_mut(object)
            .ok_or_else(|| StoreError::NotFound(object.clone()))?;
        existing.status = status.clone();
        Ok(())
    }

    async fn ensure_finalizer(&self, object: &ObjectRef) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let existing = objects
            .get_mut(object)
            .ok_or_else(|| StoreError::NotFound(object.clone()))?;
        existing.has_finalizer = true;
        Ok(())
    }

    async fn release(&self, object: &ObjectRef) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let deleted = match objects.get_mut(object) {
            Some(existing) => {
                existing.has_finalizer = false;
                existing.deletion_requested
            }
            None => return Ok(()),
        };
        if deleted {
            objects.remove(object);
        }
        Ok(())
    }
}
