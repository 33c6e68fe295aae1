//! # Reconciler
//!
//! Drives one custom resource's remote entity toward its spec.
//!
//! A pass reads the object from the store, resolves references, then either
//! creates, adopts, patches, replaces or deletes the remote entity. Remote
//! errors never escape a pass: they are classified into a
//! [`ReconcileOutcome`] and surfaced through conditions. Only store failures
//! are returned as errors, and the caller treats them as transient.

pub mod diff;
pub mod state_machine;

use crate::config::ControllerConfig;
use crate::constants::{CONDITION_REFERENCES_RESOLVED, CONDITION_RESOURCE_SYNCED, CONDITION_TERMINAL};
use crate::controller::conditions::{remove_condition, set_condition, ConditionStatus};
use crate::controller::dependency::{DependencyResolver, Resolution, ResolveError};
use crate::crd::{ManagedObject, ObjectRef, ResourceStatus, SpecView};
use crate::descriptor::{DescriptorError, DescriptorRegistry, FieldMap, KindDescriptor};
use crate::observability::metrics;
use crate::provider::{
    CreateRequest, ErrorClass, RemoteClient, RemoteEntity, RemoteError, RemoteKey, TagDelta,
    TagPolicy, UpdateDelta,
};
use crate::store::{ObjectStore, StoreError};
use state_machine::{LifecycleEvent, Phase, TransitionResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

impl From<ResolveError> for ReconcileError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Store(e) => ReconcileError::Store(e),
            ResolveError::Descriptor(e) => ReconcileError::Descriptor(e),
        }
    }
}

/// Why a pass stopped short of convergence without failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Remote entity not visible yet after create
    Consistency,
    /// Remote entity in a state that forbids modification
    Busy,
    /// Deletion deferred while other objects reference this one
    Dependents,
    /// Existing entity adopted; spec changes apply on the next pass
    Adopted,
}

impl WaitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitReason::Consistency => "Consistency",
            WaitReason::Busy => "Busy",
            WaitReason::Dependents => "DependentsExist",
            WaitReason::Adopted => "Adopted",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Remote entity matches the spec
    Synced,
    /// Waiting on referents that are missing or unsynced
    Pending(Vec<ObjectRef>),
    Waiting(WaitReason),
    /// Retryable remote failure
    Transient(RemoteError),
    /// Not retried until the spec changes
    Terminal(String),
    /// Remote entity deleted and finalizer released
    Deleted,
    /// Object no longer exists
    Gone,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Synced => "synced",
            ReconcileOutcome::Pending(_) => "pending",
            ReconcileOutcome::Waiting(_) => "waiting",
            ReconcileOutcome::Transient(_) => "transient",
            ReconcileOutcome::Terminal(_) => "terminal",
            ReconcileOutcome::Deleted => "deleted",
            ReconcileOutcome::Gone => "gone",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// After a create, a missing remote entity is awaited rather than recreated
    pub consistency_window: Duration,
    /// Unknown remote errors tolerated per object before going terminal
    pub max_unknown_retries: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

impl From<&ControllerConfig> for ReconcilerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            consistency_window: config.consistency_window,
            max_unknown_retries: config.max_unknown_retries,
        }
    }
}

/// Mutable state of one reconcile pass
struct Pass<'a> {
    object: &'a ManagedObject,
    descriptor: &'static KindDescriptor,
    status: ResourceStatus,
    written: ResourceStatus,
}

impl<'a> Pass<'a> {
    fn new(object: &'a ManagedObject, descriptor: &'static KindDescriptor) -> Self {
        Self {
            object,
            descriptor,
            status: object.status.clone(),
            written: object.status.clone(),
        }
    }

    fn reference(&self) -> ObjectRef {
        self.object.object_ref()
    }

    fn condition(&mut self, condition_type: &str, status: ConditionStatus, reason: &str, message: Option<&str>) {
        set_condition(&mut self.status.conditions, condition_type, status, reason, message);
    }

    fn advance(&mut self, event: LifecycleEvent) {
        let current = Phase::from_status(self.status.phase.as_deref());
        match state_machine::transition(current, event) {
            TransitionResult::Success { to, description, .. } => {
                if to != current {
                    debug!(from = %current, to = %to, event = %event, "{}", description);
                }
                self.status.phase = Some(to.to_string());
            }
            TransitionResult::InvalidTransition { current, event } => {
                warn!(phase = %current, event = %event, "Invalid lifecycle transition, phase unchanged");
            }
        }
    }

    /// Copy identity and remote-only attributes of `entity` into status
    fn record(&mut self, entity: &RemoteEntity, applied: Option<FieldMap>) {
        self.status.key.clone_from(&entity.key);
        self.status.id = entity.key.get(self.descriptor.primary_key()).cloned();
        self.status.arn.clone_from(&entity.arn);
        self.status.remote = self
            .descriptor
            .read_only
            .iter()
            .filter_map(|name| {
                entity
                    .read_only(name)
                    .map(|value| ((*name).to_string(), value.to_string()))
            })
            .collect();
        if applied.is_some() {
            self.status.last_applied = applied;
        }
    }

    fn forget_remote(&mut self) {
        self.status.key.clear();
        self.status.id = None;
        self.status.arn = None;
        self.status.remote.clear();
        self.status.last_applied = None;
        self.status.created_at = None;
    }
}

pub struct Reconciler {
    registry: DescriptorRegistry,
    store: Arc<dyn ObjectStore>,
    remote: Arc<dyn RemoteClient>,
    resolver: DependencyResolver,
    tags: TagPolicy,
    settings: ReconcilerSettings,
    unknown_retries: Mutex<HashMap<ObjectRef, u32>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("tags", &self.tags)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        registry: DescriptorRegistry,
        store: Arc<dyn ObjectStore>,
        remote: Arc<dyn RemoteClient>,
        tags: TagPolicy,
        settings: ReconcilerSettings,
    ) -> Self {
        let resolver = DependencyResolver::new(registry.clone(), Arc::clone(&store));
        Self {
            registry,
            store,
            remote,
            resolver,
            tags,
            settings,
            unknown_retries: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Run one reconcile pass for `object`
    #[instrument(skip_all, fields(kind = %object.kind, namespace = %object.key.namespace, name = %object.key.name))]
    pub async fn reconcile(&self, object: &ObjectRef) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(managed) = self.store.get(object).await? else {
            self.reset_retries(object);
            return Ok(ReconcileOutcome::Gone);
        };
        let descriptor = self.registry.get(object.kind)?;

        if managed.deletion_requested {
            return self.finalize(Pass::new(&managed, descriptor)).await;
        }

        let phase = Phase::from_status(managed.status.phase.as_deref());
        if phase == Phase::Terminal && managed.status.observed_generation == Some(managed.generation) {
            debug!(generation = managed.generation, "Terminal at current generation, skipping");
            let message = managed
                .status
                .condition(CONDITION_TERMINAL)
                .and_then(|c| c.message.clone())
                .unwrap_or_default();
            return Ok(ReconcileOutcome::Terminal(message));
        }

        if !managed.has_finalizer {
            self.store.ensure_finalizer(object).await?;
        }

        let mut pass = Pass::new(&managed, descriptor);
        let mut desired = match managed.spec.view() {
            Ok(view) => view,
            Err(e) => return self.fail(&mut pass, "InvalidInput", &e.to_string()).await,
        };

        let has_references = !desired.references.is_empty();
        match self.resolver.resolve(&managed, &desired).await? {
            Resolution::Resolved(refs) => {
                refs.apply(&mut desired);
                if has_references {
                    pass.condition(CONDITION_REFERENCES_RESOLVED, ConditionStatus::True, "Resolved", None);
                }
            }
            Resolution::Pending(waiting_on) => {
                let message = waiting_on
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                info!(waiting_on = %message, "References not yet resolvable");
                pass.advance(LifecycleEvent::ReferencesUnresolved);
                remove_condition(&mut pass.status.conditions, CONDITION_TERMINAL);
                pass.condition(
                    CONDITION_REFERENCES_RESOLVED,
                    ConditionStatus::False,
                    "ReferencesPending",
                    Some(&message),
                );
                pass.condition(
                    CONDITION_RESOURCE_SYNCED,
                    ConditionStatus::Unknown,
                    "ReferencesPending",
                    Some(&message),
                );
                pass.status.observed_generation = Some(managed.generation);
                self.write(&mut pass).await?;
                return Ok(ReconcileOutcome::Pending(waiting_on));
            }
            Resolution::Cyclic(path) => {
                let message = path
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return self.fail(&mut pass, "CyclicReference", &message).await;
            }
        }

        if pass.status.key.is_empty() {
            return self.create(&mut pass, &desired).await;
        }

        let identity_changed = desired
            .identifiers
            .iter()
            .any(|(name, value)| pass.status.key.get(name) != Some(value));
        if identity_changed {
            info!("Identifying fields changed, replacing remote entity");
            return self.replace(&mut pass, &desired).await;
        }

        let key = pass.status.key.clone();
        match self.remote_fetch(object, &key).await {
            Ok(entity) => self.sync(&mut pass, &desired, entity).await,
            Err(e) if e.classify() == ErrorClass::Absent => {
                if self.within_consistency_window(&pass.status) {
                    debug!("Remote entity not visible yet, waiting");
                    self.write(&mut pass).await?;
                    return Ok(ReconcileOutcome::Waiting(WaitReason::Consistency));
                }
                info!("🔄 Remote entity missing, recreating");
                pass.forget_remote();
                self.create(&mut pass, &desired).await
            }
            Err(e) => self.remote_error(&mut pass, e).await,
        }
    }

    async fn create(
        &self,
        pass: &mut Pass<'_>,
        desired: &SpecView,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let kind = pass.object.kind;
        pass.advance(LifecycleEvent::CreateStarted);

        let request = CreateRequest {
            identifiers: desired.identifiers.clone(),
            fields: desired.fields.clone(),
            tags: if pass.descriptor.taggable {
                self.tags.create_tags(&pass.object.key, &desired.tags)
            } else {
                BTreeMap::new()
            },
        };

        metrics::increment_remote_calls(kind.as_str(), "create");
        match self.remote.create(kind, request).await {
            Ok(entity) => {
                info!(id = ?entity.key.get(pass.descriptor.primary_key()), "Created remote entity");
                pass.status.created_at = Some(chrono::Utc::now().to_rfc3339());
                pass.record(&entity, Some(desired.fields.clone()));
                self.succeed(pass, "Created").await
            }
            Err(RemoteError::Conflict { existing, message }) if pass.descriptor.name_unique => {
                match existing.or_else(|| self.derived_key(pass.descriptor, desired)) {
                    Some(key) => self.adopt(pass, desired, key).await,
                    None => {
                        self.remote_error(pass, RemoteError::Conflict { existing: None, message })
                            .await
                    }
                }
            }
            Err(e) => self.remote_error(pass, e).await,
        }
    }

    /// Remote key derivable from the spec alone, for kinds without an assigned id
    fn derived_key(&self, descriptor: &KindDescriptor, desired: &SpecView) -> Option<RemoteKey> {
        if descriptor.assigned_key().is_some() {
            return None;
        }
        descriptor
            .key
            .iter()
            .map(|part| {
                desired
                    .identifiers
                    .get(part.name)
                    .map(|value| (part.name.to_string(), value.clone()))
            })
            .collect()
    }

    /// Take over an entity that already exists remotely; nothing is written this pass
    async fn adopt(
        &self,
        pass: &mut Pass<'_>,
        desired: &SpecView,
        key: RemoteKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let entity = match self.remote_fetch(&pass.reference(), &key).await {
            Ok(entity) => entity,
            Err(e) => return self.remote_error(pass, e).await,
        };
        info!(key = ?entity.key, "Adopting existing remote entity");

        pass.status.created_at = Some(chrono::Utc::now().to_rfc3339());
        pass.record(&entity, Some(entity.fields.clone()));

        let delta = self.delta(pass, desired, &entity);
        if delta.is_empty() {
            pass.status.last_applied = Some(desired.fields.clone());
            return self.succeed(pass, "Adopted").await;
        }

        pass.advance(LifecycleEvent::Succeeded);
        pass.condition(
            CONDITION_RESOURCE_SYNCED,
            ConditionStatus::False,
            WaitReason::Adopted.as_str(),
            Some("adopted existing remote entity; spec differences are applied on the next pass"),
        );
        pass.status.observed_generation = Some(pass.object.generation);
        self.write(pass).await?;
        Ok(ReconcileOutcome::Waiting(WaitReason::Adopted))
    }

    fn delta(&self, pass: &Pass<'_>, desired: &SpecView, entity: &RemoteEntity) -> UpdateDelta {
        UpdateDelta {
            patch: diff::compute_patch(
                pass.descriptor,
                &desired.fields,
                &entity.fields,
                pass.status.last_applied.as_ref(),
            ),
            tags: if pass.descriptor.taggable {
                self.tags.compute_delta(&entity.tags, &desired.tags)
            } else {
                TagDelta::default()
            },
        }
    }

    /// Bring an existing remote entity in line with the spec
    async fn sync(
        &self,
        pass: &mut Pass<'_>,
        desired: &SpecView,
        entity: RemoteEntity,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let kind = pass.object.kind;
        pass.record(&entity, None);

        let immutable = diff::immutable_changes(
            pass.descriptor,
            &desired.fields,
            &entity.fields,
            pass.status.last_applied.as_ref(),
        );
        let delta = self.delta(pass, desired, &entity);
        if immutable.is_empty() && delta.is_empty() {
            pass.status.last_applied = Some(desired.fields.clone());
            return self.succeed(pass, "Synced").await;
        }

        if self.is_busy(pass.descriptor, &entity) {
            return self.wait_busy(pass).await;
        }

        if !immutable.is_empty() {
            info!(fields = ?immutable, "Immutable fields changed, replacing remote entity");
            return self.replace(pass, desired).await;
        }

        pass.advance(LifecycleEvent::UpdateStarted);
        info!(
            operations = delta.patch.len(),
            tags_set = delta.tags.set.len(),
            tags_removed = delta.tags.remove.len(),
            "Patching remote entity"
        );
        metrics::increment_remote_calls(kind.as_str(), "update");
        match self.remote.update(kind, &entity.key, delta).await {
            Ok(updated) => {
                pass.record(&updated, Some(desired.fields.clone()));
                self.succeed(pass, "Updated").await
            }
            Err(e) => self.remote_error(pass, e).await,
        }
    }

    /// Delete and recreate the remote entity as one logical operation
    async fn replace(
        &self,
        pass: &mut Pass<'_>,
        desired: &SpecView,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let kind = pass.object.kind;
        let key = pass.status.key.clone();
        pass.advance(LifecycleEvent::CreateStarted);

        metrics::increment_remote_calls(kind.as_str(), "delete");
        match self.remote.delete(kind, &key).await {
            Ok(()) => {}
            Err(e) if e.classify() == ErrorClass::Absent => {}
            Err(e) => return self.remote_error(pass, e).await,
        }
        pass.forget_remote();
        self.create(pass, desired).await
    }

    /// Remove the remote entity, then release the finalizer
    async fn finalize(&self, mut pass: Pass<'_>) -> Result<ReconcileOutcome, ReconcileError> {
        let object = pass.reference();
        if !pass.object.has_finalizer {
            return Ok(ReconcileOutcome::Deleted);
        }
        pass.advance(LifecycleEvent::DeletionRequested);

        let dependents = self.resolver.dependents(pass.object).await?;
        if !dependents.is_empty() {
            let message = dependents
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            info!(dependents = %message, "Deletion deferred while dependents exist");
            pass.condition(
                CONDITION_RESOURCE_SYNCED,
                ConditionStatus::False,
                WaitReason::Dependents.as_str(),
                Some(&message),
            );
            self.write(&mut pass).await?;
            return Ok(ReconcileOutcome::Waiting(WaitReason::Dependents));
        }

        let kind = object.kind;
        let key = pass.status.key.clone();
        if !key.is_empty() {
            if pass.descriptor.busy.is_some() {
                match self.remote_fetch(&object, &key).await {
                    Ok(entity) if self.is_busy(pass.descriptor, &entity) => {
                        pass.record(&entity, None);
                        return self.wait_busy(&mut pass).await;
                    }
                    Ok(_) => {}
                    Err(e) if e.classify() == ErrorClass::Absent => {}
                    Err(e) => return self.remote_error(&mut pass, e).await,
                }
            }

            metrics::increment_remote_calls(kind.as_str(), "delete");
            match self.remote.delete(kind, &key).await {
                Ok(()) => info!("Deleted remote entity"),
                Err(e) if e.classify() == ErrorClass::Absent => {
                    debug!("Remote entity already gone");
                }
                Err(e) => return self.remote_error(&mut pass, e).await,
            }
        }

        pass.advance(LifecycleEvent::DeletionConfirmed);
        self.store.release(&object).await?;
        self.reset_retries(&object);
        Ok(ReconcileOutcome::Deleted)
    }

    async fn remote_fetch(
        &self,
        object: &ObjectRef,
        key: &RemoteKey,
    ) -> Result<RemoteEntity, RemoteError> {
        metrics::increment_remote_calls(object.kind.as_str(), "fetch");
        self.remote.fetch(object.kind, key).await
    }

    fn is_busy(&self, descriptor: &KindDescriptor, entity: &RemoteEntity) -> bool {
        descriptor.busy.is_some_and(|guard| {
            entity
                .read_only(guard.field)
                .is_some_and(|state| guard.states.contains(&state))
        })
    }

    async fn wait_busy(&self, pass: &mut Pass<'_>) -> Result<ReconcileOutcome, ReconcileError> {
        let state = pass
            .descriptor
            .busy
            .and_then(|guard| pass.status.remote.get(guard.field).cloned())
            .unwrap_or_default();
        debug!(state = %state, "Remote entity busy, waiting");
        pass.condition(
            CONDITION_RESOURCE_SYNCED,
            ConditionStatus::False,
            WaitReason::Busy.as_str(),
            Some(&format!("remote entity is {state}")),
        );
        self.write(pass).await?;
        Ok(ReconcileOutcome::Waiting(WaitReason::Busy))
    }

    fn within_consistency_window(&self, status: &ResourceStatus) -> bool {
        let Some(created_at) = status
            .created_at
            .as_deref()
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        else {
            return false;
        };
        let elapsed = chrono::Utc::now().signed_duration_since(created_at);
        elapsed
            .to_std()
            .map_or(true, |elapsed| elapsed < self.settings.consistency_window)
    }

    async fn succeed(
        &self,
        pass: &mut Pass<'_>,
        reason: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.reset_retries(&pass.reference());
        pass.advance(LifecycleEvent::Succeeded);
        pass.condition(CONDITION_RESOURCE_SYNCED, ConditionStatus::True, reason, None);
        pass.status.observed_generation = Some(pass.object.generation);
        self.write(pass).await?;
        Ok(ReconcileOutcome::Synced)
    }

    async fn fail(
        &self,
        pass: &mut Pass<'_>,
        reason: &str,
        message: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.reset_retries(&pass.reference());
        warn!(reason, message, "❌ Terminal reconcile error");
        pass.advance(LifecycleEvent::Failed);
        pass.condition(CONDITION_TERMINAL, ConditionStatus::True, reason, Some(message));
        pass.status.observed_generation = Some(pass.object.generation);
        self.write(pass).await?;
        Ok(ReconcileOutcome::Terminal(message.to_string()))
    }

    /// Translate a remote failure into an outcome
    async fn remote_error(
        &self,
        pass: &mut Pass<'_>,
        error: RemoteError,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let class = error.classify();
        metrics::increment_remote_errors(pass.object.kind.as_str(), error.reason());
        match class {
            ErrorClass::Absent => {
                debug!(error = %error, "Remote entity vanished mid-pass");
                self.write(pass).await?;
                Ok(ReconcileOutcome::Waiting(WaitReason::Consistency))
            }
            ErrorClass::Terminal => self.fail(pass, error.reason(), &error.to_string()).await,
            ErrorClass::Transient => {
                if matches!(error, RemoteError::Unknown(_)) {
                    let attempts = self.count_unknown(&pass.reference());
                    if attempts > self.settings.max_unknown_retries {
                        let message = format!("{error} (gave up after {attempts} attempts)");
                        return self.fail(pass, error.reason(), &message).await;
                    }
                }
                warn!(error = %error, "Transient remote error");
                pass.condition(
                    CONDITION_RESOURCE_SYNCED,
                    ConditionStatus::False,
                    error.reason(),
                    Some(&error.to_string()),
                );
                self.write(pass).await?;
                Ok(ReconcileOutcome::Transient(error))
            }
        }
    }

    fn count_unknown(&self, object: &ObjectRef) -> u32 {
        let mut retries = self
            .unknown_retries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let attempts = retries.entry(object.clone()).or_insert(0);
        *attempts += 1;
        *attempts
    }

    fn reset_retries(&self, object: &ObjectRef) {
        self.unknown_retries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(object);
    }

    /// Persist status when the pass changed it
    async fn write(&self, pass: &mut Pass<'_>) -> Result<(), StoreError> {
        if pass.status == pass.written {
            return Ok(());
        }
        pass.status.last_reconciled = Some(chrono::Utc::now().to_rfc3339());
        self.store.patch_status(&pass.reference(), &pass.status).await?;
        pass.written = pass.status.clone();
        Ok(())
    }
}
