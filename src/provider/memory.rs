//! # In-Memory Gateway
//!
//! An in-process fake of the API Gateway management API.
//!
//! It behaves like the real service where the controller can observe it:
//!
//! - ids are assigned on create, composite keys are unique
//! - enumerations are validated (`apiKeySource`, endpoint types, ...)
//! - patch sets are applied element-wise; immutable paths are rejected
//! - deleting a REST API cascades to everything under it
//! - after a create, `fetch` may miss the entity for a configurable number of reads
//! - VPC links start `PENDING` and become `AVAILABLE` after a number of reads
//!
//! Tests drive it further with fault injection ([`InMemoryGateway::fail_next`]),
//! out-of-band drift ([`InMemoryGateway::modify`]) and a mutation counter.

use crate::descriptor::{
    DescriptorRegistry, FieldMap, FieldShape, FieldValue, KeySource, Kind, KindDescriptor,
};
use crate::provider::{
    resource_arn, CreateRequest, PatchOp, PatchOperation, RemoteClient, RemoteEntity, RemoteError,
    RemoteKey, UpdateDelta,
};
use async_trait::async_trait;
use paths::decode_key;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const API_KEY_SOURCES: &[&str] = &["HEADER", "AUTHORIZER"];
const ENDPOINT_TYPES: &[&str] = &["EDGE", "REGIONAL", "PRIVATE"];
const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "ANY",
];
const AUTHORIZATION_TYPES: &[&str] = &["NONE", "AWS_IAM", "CUSTOM", "COGNITO_USER_POOLS"];
const INTEGRATION_TYPES: &[&str] = &["HTTP", "HTTP_PROXY", "AWS", "AWS_PROXY", "MOCK"];
const AUTHORIZER_TYPES: &[&str] = &["TOKEN", "REQUEST", "COGNITO_USER_POOLS"];
const CACHE_CLUSTER_SIZES: &[&str] = &["0.5", "1.6", "6.1", "13.5", "28.4", "58.2", "118", "237"];

type EntityId = (Kind, RemoteKey);

#[derive(Debug, Default)]
struct GatewayState {
    entities: BTreeMap<EntityId, RemoteEntity>,
    faults: VecDeque<RemoteError>,
    /// Remaining reads that miss a freshly created entity
    unseen: HashMap<EntityId, u32>,
    /// Remaining reads before a VPC link leaves PENDING
    provisioning: HashMap<EntityId, u32>,
    mutations: u64,
}

/// In-process API Gateway
#[derive(Debug)]
pub struct InMemoryGateway {
    registry: DescriptorRegistry,
    region: String,
    consistency_misses: u32,
    vpc_link_pending_reads: u32,
    state: Mutex<GatewayState>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new("us-west-2")
    }
}

impl InMemoryGateway {
    pub fn new(region: &str) -> Self {
        Self {
            registry: DescriptorRegistry::default(),
            region: region.to_string(),
            consistency_misses: 0,
            vpc_link_pending_reads: 1,
            state: Mutex::new(GatewayState::default()),
        }
    }

    /// Number of `fetch` calls that return `NotFound` right after a create
    pub fn with_consistency_misses(mut self, misses: u32) -> Self {
        self.consistency_misses = misses;
        self
    }

    /// Number of `fetch` calls a new VPC link stays `PENDING` for
    pub fn with_vpc_link_pending_reads(mut self, reads: u32) -> Self {
        self.vpc_link_pending_reads = reads;
        self
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call (of any operation) with `error`
    pub fn fail_next(&self, error: RemoteError) {
        self.state().faults.push_back(error);
    }

    /// Successful creates, updates and deletes so far
    pub fn mutation_count(&self) -> u64 {
        self.state().mutations
    }

    /// Read an entity bypassing consistency and provisioning simulation
    pub fn get(&self, kind: Kind, key: &RemoteKey) -> Option<RemoteEntity> {
        self.state().entities.get(&(kind, key.clone())).cloned()
    }

    pub fn entities(&self, kind: Kind) -> Vec<RemoteEntity> {
        self.state()
            .entities
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, entity)| entity.clone())
            .collect()
    }

    /// Change an entity out of band, as another client would
    pub fn modify<F>(&self, kind: Kind, key: &RemoteKey, change: F) -> bool
    where
        F: FnOnce(&mut RemoteEntity),
    {
        match self.state().entities.get_mut(&(kind, key.clone())) {
            Some(entity) => {
                change(entity);
                true
            }
            None => false,
        }
    }

    /// Delete an entity out of band
    pub fn remove(&self, kind: Kind, key: &RemoteKey) -> Option<RemoteEntity> {
        self.state().entities.remove(&(kind, key.clone()))
    }

    fn take_fault(state: &mut GatewayState) -> Result<(), RemoteError> {
        match state.faults.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn descriptor(&self, kind: Kind) -> Result<&'static KindDescriptor, RemoteError> {
        self.registry
            .get(kind)
            .map_err(|e| RemoteError::InvalidInput(e.to_string()))
    }

    fn build_key(
        descriptor: &KindDescriptor,
        request: &CreateRequest,
    ) -> Result<RemoteKey, RemoteError> {
        let mut key = RemoteKey::new();
        for part in descriptor.key {
            let value = match part.source {
                KeySource::Identifier => request
                    .identifiers
                    .get(part.name)
                    .cloned()
                    .ok_or_else(|| RemoteError::InvalidInput(format!("{} is required", part.name)))?,
                KeySource::Assigned => new_id(),
            };
            key.insert(part.name.to_string(), value);
        }
        Ok(key)
    }

    fn require_parents(
        state: &GatewayState,
        kind: Kind,
        key: &RemoteKey,
        fields: &FieldMap,
    ) -> Result<(), RemoteError> {
        let rest_api = key.get("restApiId").map(String::as_str);
        if let Some(rest_api_id) = rest_api {
            require(state, Kind::RestApi, &key_of(&[("restApiId", rest_api_id)]))?;
        }
        if let (Some(rest_api_id), Some(resource_id)) =
            (rest_api, key.get("resourceId").map(String::as_str)) {
            if kind != Kind::Resource {
                require(
                    state,
                    Kind::Resource,
                    &key_of(&[("restApiId", rest_api_id), ("resourceId", resource_id)]),
                )?;
            }
        }
        let parent_method = match kind {
            Kind::MethodResponse | Kind::Integration => Some(Kind::Method),
            Kind::IntegrationResponse => Some(Kind::Integration),
            _ => None,
        };
        if let Some(parent) = parent_method {
            let mut parent_key = key.clone();
            parent_key.remove("statusCode");
            require(state, parent, &parent_key)?;
        }
        if let (Kind::Stage, Some(rest_api_id)) = (kind, rest_api) {
            if let Some(deployment_id) = fields.get("/deploymentId").and_then(FieldValue::as_text) {
                require(
                    state,
                    Kind::Deployment,
                    &key_of(&[("restApiId", rest_api_id), ("deploymentId", deployment_id)]),
                )?;
            }
        }
        Ok(())
    }

    fn resource_path(
        state: &GatewayState,
        key: &RemoteKey,
        fields: &FieldMap,
    ) -> Result<String, RemoteError> {
        let rest_api_id = key.get("restApiId").map(String::as_str).unwrap_or_default();
        let parent_id = fields
            .get("/parentId")
            .and_then(FieldValue::as_text)
            .ok_or_else(|| RemoteError::InvalidInput("parentId is required".to_string()))?;
        let path_part = fields
            .get("/pathPart")
            .and_then(FieldValue::as_text)
            .ok_or_else(|| RemoteError::InvalidInput("pathPart is required".to_string()))?;
        let parent_key = key_of(&[("restApiId", rest_api_id), ("resourceId", parent_id)]);
        let parent = require(state, Kind::Resource, &parent_key)?;
        let parent_path = parent.read_only("path").unwrap_or("/");
        Ok(if parent_path == "/" {
            format!("/{path_part}")
        } else {
            format!("{parent_path}/{path_part}")
        })
    }

    fn apply_defaults(kind: Kind, fields: &mut FieldMap) {
        if kind == Kind::RestApi {
            fields
                .entry("/apiKeySource".to_string())
                .or_insert_with(|| "HEADER".into());
            fields
                .entry("/endpointConfiguration/types/0".to_string())
                .or_insert_with(|| "EDGE".into());
            fields
                .entry("/disableExecuteApiEndpoint".to_string())
                .or_insert(FieldValue::Bool(false));
        }
        if kind == Kind::Method {
            fields
                .entry("/authorizationType".to_string())
                .or_insert_with(|| "NONE".into());
        }
    }

    fn insert_root_resource(state: &mut GatewayState, rest_api_id: &str) -> String {
        let root_id = new_id();
        let key = key_of(&[("restApiId", rest_api_id), ("resourceId", root_id.as_str())]);
        let entity = RemoteEntity {
            key: key.clone(),
            read_only: BTreeMap::from([("path".to_string(), "/".to_string())]),
            ..Default::default()
        };
        state.entities.insert((Kind::Resource, key), entity);
        root_id
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

fn key_of(parts: &[(&str, &str)]) -> RemoteKey {
    parts
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn require<'a>(
    state: &'a GatewayState,
    kind: Kind,
    key: &RemoteKey,
) -> Result<&'a RemoteEntity, RemoteError> {
    state
        .entities
        .get(&(kind, key.clone()))
        .ok_or_else(|| RemoteError::NotFound(format!("{kind} {key:?}")))
}

fn one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<(), RemoteError> {
    match value {
        Some(value) if !allowed.contains(&value) => Err(RemoteError::InvalidInput(format!(
            "{field} must be one of {allowed:?}, got {value}"
        ))),
        _ => Ok(()),
    }
}

fn text<'a>(fields: &'a FieldMap, path: &str) -> Option<&'a str> {
    fields.get(path).and_then(FieldValue::as_text)
}

/// The request validation API Gateway performs on create and update
fn validate(kind: Kind, key: &RemoteKey, fields: &FieldMap) -> Result<(), RemoteError> {
    match kind {
        Kind::RestApi => {
            if text(fields, "/name").is_none_or(str::is_empty) {
                return Err(RemoteError::InvalidInput("name is required".to_string()));
            }
            one_of("apiKeySource", text(fields, "/apiKeySource"), API_KEY_SOURCES)?;
            one_of(
                "endpointConfiguration.types",
                text(fields, "/endpointConfiguration/types/0"),
                ENDPOINT_TYPES,
            )?;
        }
        Kind::Method | Kind::MethodResponse | Kind::Integration | Kind::IntegrationResponse => {
            one_of(
                "httpMethod",
                key.get("httpMethod").map(String::as_str),
                HTTP_METHODS,
            )?;
            if kind == Kind::Method {
                let authorization = text(fields, "/authorizationType");
                one_of("authorizationType", authorization, AUTHORIZATION_TYPES)?;
                if authorization == Some("CUSTOM") && !fields.contains_key("/authorizerId") {
                    return Err(RemoteError::InvalidInput(
                        "CUSTOM authorization requires authorizerId".to_string(),
                    ));
                }
            }
            if kind == Kind::Integration {
                let integration_type = text(fields, "/type");
                one_of("type", integration_type, INTEGRATION_TYPES)?;
                if integration_type.is_some_and(|t| t != "MOCK") && !fields.contains_key("/uri") {
                    return Err(RemoteError::InvalidInput(
                        "uri is required for non-MOCK integrations".to_string(),
                    ));
                }
                if text(fields, "/connectionType") == Some("VPC_LINK")
                    && !fields.contains_key("/connectionId")
                {
                    return Err(RemoteError::InvalidInput(
                        "VPC_LINK connections require connectionId".to_string(),
                    ));
                }
            }
        }
        Kind::Authorizer => {
            one_of("type", text(fields, "/type"), AUTHORIZER_TYPES)?;
        }
        Kind::Stage => {
            one_of(
                "cacheClusterSize",
                text(fields, "/cacheClusterSize"),
                CACHE_CLUSTER_SIZES,
            )?;
            if let Some(percent) = text(fields, "/canarySettings/percentTraffic") {
                if !percent
                    .parse::<f64>()
                    .is_ok_and(|p| (0.0..=100.0).contains(&p))
                {
                    return Err(RemoteError::InvalidInput(format!(
                        "canarySettings.percentTraffic must be between 0 and 100, got {percent}"
                    )));
                }
            }
        }
        Kind::VpcLink => {
            if fields
                .get("/targetArns")
                .is_none_or(|targets| targets.as_list().is_empty())
            {
                return Err(RemoteError::InvalidInput(
                    "targetArns is required".to_string(),
                ));
            }
        }
        Kind::Resource | Kind::Deployment | Kind::ApiKey => {}
    }
    Ok(())
}

/// Apply one patch operation to a field map
fn apply_operation(
    descriptor: &KindDescriptor,
    fields: &mut FieldMap,
    operation: &PatchOperation,
) -> Result<(), RemoteError> {
    let invalid = || {
        RemoteError::InvalidInput(format!(
            "invalid patch path {} for {}",
            operation.path, descriptor.kind
        ))
    };

    if descriptor.sections.contains(&operation.path.as_str()) {
        if operation.op != PatchOp::Remove {
            return Err(invalid());
        }
        fields.retain(|path, _| descriptor.section_of(path) != Some(operation.path.as_str()));
        return Ok(());
    }

    if let Some(field) = descriptor.field(&operation.path) {
        if descriptor.is_immutable(field.path) {
            return Err(RemoteError::InvalidInput(format!(
                "{} cannot be modified",
                field.path
            )));
        }
        return match (field.shape, operation.op, &operation.value) {
            (FieldShape::ValueList, PatchOp::Add, Some(value)) => {
                let mut list = fields
                    .get(field.path)
                    .map(|v| v.as_list().to_vec())
                    .unwrap_or_default();
                if !list.contains(value) {
                    list.push(value.clone());
                }
                fields.insert(field.path.to_string(), FieldValue::List(list));
                Ok(())
            }
            (FieldShape::ValueList, PatchOp::Remove, Some(value)) => {
                if let Some(FieldValue::List(list)) = fields.get_mut(field.path) {
                    list.retain(|v| v != value);
                }
                Ok(())
            }
            (_, PatchOp::Remove, _) | (_, PatchOp::Replace, None) => {
                fields.remove(field.path);
                Ok(())
            }
            (FieldShape::Scalar, _, Some(value)) => {
                fields.insert(field.path.to_string(), FieldValue::Text(value.clone()));
                Ok(())
            }
            _ => Err(invalid()),
        };
    }

    let (base, element) = operation.path.rsplit_once('/').ok_or_else(invalid)?;
    let field = descriptor.field(base).ok_or_else(invalid)?;
    let element = decode_key(element);
    match field.shape {
        FieldShape::List => {
            let mut list = fields
                .get(field.path)
                .map(|v| v.as_list().to_vec())
                .unwrap_or_default();
            match operation.op {
                PatchOp::Add if !list.contains(&element) => list.push(element),
                PatchOp::Remove => list.retain(|v| *v != element),
                _ => {}
            }
            if list.is_empty() {
                fields.remove(field.path);
            } else {
                fields.insert(field.path.to_string(), FieldValue::List(list));
            }
            Ok(())
        }
        FieldShape::Map { add_supported } => {
            let mut map = fields
                .get(field.path)
                .and_then(FieldValue::as_map)
                .cloned()
                .unwrap_or_default();
            match (operation.op, &operation.value) {
                (PatchOp::Remove, _) => {
                    map.remove(&element);
                }
                (PatchOp::Add, Some(value)) if add_supported => {
                    map.insert(element, value.clone());
                }
                (PatchOp::Replace, Some(value)) => {
                    map.insert(element, value.clone());
                }
                _ => return Err(invalid()),
            }
            if map.is_empty() {
                fields.remove(field.path);
            } else {
                fields.insert(field.path.to_string(), FieldValue::Map(map));
            }
            Ok(())
        }
        FieldShape::Scalar | FieldShape::ValueList => Err(invalid()),
    }
}

#[async_trait]
impl RemoteClient for InMemoryGateway {
    async fn fetch(&self, kind: Kind, key: &RemoteKey) -> Result<RemoteEntity, RemoteError> {
        let mut state = self.state();
        Self::take_fault(&mut state)?;
        let id = (kind, key.clone());

        if let Some(remaining) = state.unseen.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                debug!(%kind, ?key, "simulating read-after-create miss");
                return Err(RemoteError::NotFound(format!("{kind} {key:?}")));
            }
        }

        let provisioned = match state.provisioning.get_mut(&id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if provisioned {
            state.provisioning.remove(&id);
        }

        let entity = state
            .entities
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("{kind} {key:?}")))?;
        if provisioned {
            entity
                .read_only
                .insert("status".to_string(), "AVAILABLE".to_string());
        }
        Ok(entity.clone())
    }

    async fn create(
        &self,
        kind: Kind,
        request: CreateRequest,
    ) -> Result<RemoteEntity, RemoteError> {
        let descriptor = self.descriptor(kind)?;
        let mut state = self.state();
        Self::take_fault(&mut state)?;

        let key = Self::build_key(descriptor, &request)?;
        let mut fields = request.fields;
        Self::apply_defaults(kind, &mut fields);
        validate(kind, &key, &fields)?;
        Self::require_parents(&state, kind, &key, &fields)?;

        if state.entities.contains_key(&(kind, key.clone())) {
            return Err(RemoteError::Conflict {
                existing: Some(key),
                message: format!("{kind} already exists"),
            });
        }

        let mut read_only = BTreeMap::new();
        match kind {
            Kind::RestApi => {
                let rest_api_id = key.get("restApiId").cloned().unwrap_or_default();
                let root_id = Self::insert_root_resource(&mut state, &rest_api_id);
                read_only.insert("rootResourceId".to_string(), root_id);
                read_only.insert("createdDate".to_string(), now());
            }
            Kind::Resource => {
                let path = Self::resource_path(&state, &key, &fields)?;
                let duplicate = state.entities.iter().any(|((k, existing_key), existing)| {
                    *k == Kind::Resource
                        && existing_key.get("restApiId") == key.get("restApiId")
                        && existing.read_only("path") == Some(path.as_str())
                });
                if duplicate {
                    return Err(RemoteError::Conflict {
                        existing: None,
                        message: format!("resource {path} already exists"),
                    });
                }
                read_only.insert("path".to_string(), path);
            }
            Kind::Deployment | Kind::ApiKey => {
                read_only.insert("createdDate".to_string(), now());
            }
            Kind::Stage => {
                read_only.insert("createdDate".to_string(), now());
                read_only.insert("lastUpdatedDate".to_string(), now());
            }
            Kind::VpcLink => {
                read_only.insert("status".to_string(), "PENDING".to_string());
                read_only.insert(
                    "statusMessage".to_string(),
                    "VPC link is provisioning".to_string(),
                );
                state
                    .provisioning
                    .insert((kind, key.clone()), self.vpc_link_pending_reads);
            }
            _ => {}
        }

        let arn = resource_arn(kind, &key, &self.region)?;
        let entity = RemoteEntity {
            key: key.clone(),
            fields,
            read_only,
            tags: if descriptor.taggable {
                request.tags
            } else {
                BTreeMap::new()
            },
            arn,
        };
        state.entities.insert((kind, key.clone()), entity.clone());
        if self.consistency_misses > 0 {
            state.unseen.insert((kind, key), self.consistency_misses);
        }
        state.mutations += 1;
        Ok(entity)
    }

    async fn update(
        &self,
        kind: Kind,
        key: &RemoteKey,
        delta: UpdateDelta,
    ) -> Result<RemoteEntity, RemoteError> {
        let descriptor = self.descriptor(kind)?;
        let mut state = self.state();
        Self::take_fault(&mut state)?;

        let current = require(&state, kind, key)?.clone();
        let mut updated = current.clone();
        for operation in delta.patch.operations() {
            apply_operation(descriptor, &mut updated.fields, operation)?;
        }
        validate(kind, key, &updated.fields)?;
        if kind == Kind::Stage {
            Self::require_parents(&state, kind, key, &updated.fields)?;
        }
        if kind == Kind::Resource && updated.fields != current.fields {
            let path = Self::resource_path(&state, key, &updated.fields)?;
            updated.read_only.insert("path".to_string(), path);
        }

        if !delta.tags.is_empty() {
            if !descriptor.taggable {
                return Err(RemoteError::InvalidInput(format!("{kind} is not taggable")));
            }
            delta.tags.apply(&mut updated.tags);
        }

        if updated != current {
            if kind == Kind::Stage {
                updated
                    .read_only
                    .insert("lastUpdatedDate".to_string(), now());
            }
            state.mutations += 1;
        }
        state.entities.insert((kind, key.clone()), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, kind: Kind, key: &RemoteKey) -> Result<(), RemoteError> {
        let mut state = self.state();
        Self::take_fault(&mut state)?;

        let id = (kind, key.clone());
        if state.entities.remove(&id).is_none() {
            return Err(RemoteError::NotFound(format!("{kind} {key:?}")));
        }
        state.unseen.remove(&id);
        state.provisioning.remove(&id);

        // Children live under the REST API (and resource) they were created in
        if matches!(kind, Kind::RestApi | Kind::Resource) {
            state
                .entities
                .retain(|(_, child_key), _| !key.iter().all(|(k, v)| child_key.get(k) == Some(v)));
        }
        state.mutations += 1;
        Ok(())
    }
}
