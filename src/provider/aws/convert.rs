//! Conversions between field maps and SDK shapes.
//!
//! Create and get outputs of the same kind expose identical getters, so the
//! mapping to [`RemoteEntity`] is written once per kind and stamped onto both
//! output types.

use crate::descriptor::{FieldMap, FieldValue};
use crate::provider::{PatchOp, PatchOperation, RemoteEntity, RemoteKey};
use aws_sdk_apigateway::operation::{
    create_api_key::CreateApiKeyOutput, create_authorizer::CreateAuthorizerOutput,
    create_deployment::CreateDeploymentOutput, create_resource::CreateResourceOutput,
    create_rest_api::CreateRestApiOutput, create_stage::CreateStageOutput,
    create_vpc_link::CreateVpcLinkOutput, get_api_key::GetApiKeyOutput,
    get_authorizer::GetAuthorizerOutput, get_deployment::GetDeploymentOutput,
    get_integration::GetIntegrationOutput, get_integration_response::GetIntegrationResponseOutput,
    get_method::GetMethodOutput, get_method_response::GetMethodResponseOutput,
    get_resource::GetResourceOutput, get_rest_api::GetRestApiOutput, get_stage::GetStageOutput,
    get_vpc_link::GetVpcLinkOutput, put_integration::PutIntegrationOutput,
    put_integration_response::PutIntegrationResponseOutput, put_method::PutMethodOutput,
    put_method_response::PutMethodResponseOutput,
};
use aws_sdk_apigateway::primitives::{DateTime, DateTimeFormat};
use aws_sdk_apigateway::types::{
    CanarySettings, DeploymentCanarySettings, Op, PatchOperation as SdkPatchOperation,
};
use std::collections::{BTreeMap, HashMap};

/// Accumulates a [`RemoteEntity`] from SDK getters
pub(super) struct EntityBuilder {
    entity: RemoteEntity,
    assigned: Option<&'static str>,
}

impl EntityBuilder {
    pub(super) fn new(key: RemoteKey, assigned: Option<&'static str>) -> Self {
        Self {
            entity: RemoteEntity {
                key,
                ..Default::default()
            },
            assigned,
        }
    }

    /// Record the remote-assigned id under the kind's assigned key name
    fn id(&mut self, id: Option<&str>) {
        if let (Some(name), Some(id)) = (self.assigned, id) {
            self.entity.key.insert(name.to_string(), id.to_string());
        }
    }

    fn text<S: AsRef<str>>(&mut self, path: &str, value: Option<S>) {
        if let Some(value) = value {
            self.entity
                .fields
                .insert(path.to_string(), FieldValue::Text(value.as_ref().to_string()));
        }
    }

    fn flag(&mut self, path: &str, value: Option<bool>) {
        if let Some(value) = value {
            self.entity
                .fields
                .insert(path.to_string(), FieldValue::Bool(value));
        }
    }

    fn int(&mut self, path: &str, value: Option<i32>) {
        if let Some(value) = value {
            self.entity
                .fields
                .insert(path.to_string(), FieldValue::Int(i64::from(value)));
        }
    }

    fn list(&mut self, path: &str, values: &[String]) {
        if !values.is_empty() {
            self.entity
                .fields
                .insert(path.to_string(), FieldValue::List(values.to_vec()));
        }
    }

    fn map(&mut self, path: &str, values: Option<&HashMap<String, String>>) {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            let map: BTreeMap<String, String> =
                values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            self.entity
                .fields
                .insert(path.to_string(), FieldValue::Map(map));
        }
    }

    fn bool_map(&mut self, path: &str, values: Option<&HashMap<String, bool>>) {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            let map: BTreeMap<String, String> = values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect();
            self.entity
                .fields
                .insert(path.to_string(), FieldValue::Map(map));
        }
    }

    fn read_only<S: AsRef<str>>(&mut self, name: &str, value: Option<S>) {
        if let Some(value) = value {
            self.entity
                .read_only
                .insert(name.to_string(), value.as_ref().to_string());
        }
    }

    fn date(&mut self, name: &str, value: Option<&DateTime>) {
        let formatted = value.and_then(|d| d.fmt(DateTimeFormat::DateTime).ok());
        self.read_only(name, formatted);
    }

    fn tags(&mut self, tags: Option<&HashMap<String, String>>) {
        if let Some(tags) = tags {
            self.entity.tags = tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        }
    }

    pub(super) fn build(self) -> RemoteEntity {
        self.entity
    }
}

/// An SDK output that describes a remote entity
pub(super) trait ToEntity {
    fn fill(&self, entity: &mut EntityBuilder);

    fn to_entity(&self, key: RemoteKey, assigned: Option<&'static str>) -> RemoteEntity {
        let mut entity = EntityBuilder::new(key, assigned);
        self.fill(&mut entity);
        entity.build()
    }
}

macro_rules! to_entity {
    ($($output:ty),+ => |$out:ident, $b:ident| $body:block) => {
        $(
            impl ToEntity for $output {
                fn fill(&self, $b: &mut EntityBuilder) {
                    let $out = self;
                    $body
                }
            }
        )+
    };
}

to_entity!(CreateRestApiOutput, GetRestApiOutput => |out, b| {
    b.id(out.id());
    b.text("/name", out.name());
    b.text("/description", out.description());
    b.text("/apiKeySource", out.api_key_source().map(|s| s.as_str()));
    b.list("/binaryMediaTypes", out.binary_media_types());
    b.flag("/disableExecuteApiEndpoint", Some(out.disable_execute_api_endpoint()));
    if let Some(endpoint) = out.endpoint_configuration() {
        b.text(
            "/endpointConfiguration/types/0",
            endpoint.types().first().map(|t| t.as_str()),
        );
        b.list("/endpointConfiguration/vpcEndpointIds", endpoint.vpc_endpoint_ids());
    }
    b.int("/minimumCompressionSize", out.minimum_compression_size());
    b.text("/policy", out.policy());
    b.text("/version", out.version());
    b.read_only("rootResourceId", out.root_resource_id());
    b.date("createdDate", out.created_date());
    b.tags(out.tags());
});

to_entity!(CreateResourceOutput, GetResourceOutput => |out, b| {
    b.id(out.id());
    b.text("/parentId", out.parent_id());
    b.text("/pathPart", out.path_part());
    b.read_only("path", out.path());
});

to_entity!(PutMethodOutput, GetMethodOutput => |out, b| {
    b.text("/authorizationType", out.authorization_type());
    b.text("/authorizerId", out.authorizer_id());
    b.flag("/apiKeyRequired", out.api_key_required());
    b.text("/operationName", out.operation_name());
    b.text("/requestValidatorId", out.request_validator_id());
    b.list("/authorizationScopes", out.authorization_scopes());
    b.bool_map("/requestParameters", out.request_parameters());
    b.map("/requestModels", out.request_models());
});

to_entity!(PutMethodResponseOutput, GetMethodResponseOutput => |out, b| {
    b.bool_map("/responseParameters", out.response_parameters());
    b.map("/responseModels", out.response_models());
});

to_entity!(PutIntegrationOutput, GetIntegrationOutput => |out, b| {
    b.text("/type", out.r#type().map(|t| t.as_str()));
    b.list("/cacheKeyParameters", out.cache_key_parameters());
    b.text("/cacheNamespace", out.cache_namespace());
    b.text("/connectionId", out.connection_id());
    b.text("/connectionType", out.connection_type().map(|t| t.as_str()));
    b.text("/contentHandling", out.content_handling().map(|c| c.as_str()));
    b.text("/credentials", out.credentials());
    b.text("/httpMethod", out.http_method());
    b.text("/passthroughBehavior", out.passthrough_behavior());
    b.map("/requestParameters", out.request_parameters());
    b.map("/requestTemplates", out.request_templates());
    b.int("/timeoutInMillis", Some(out.timeout_in_millis()));
    b.flag(
        "/tlsConfig/insecureSkipVerification",
        out.tls_config().map(|tls| tls.insecure_skip_verification()),
    );
    b.text("/uri", out.uri());
});

to_entity!(PutIntegrationResponseOutput, GetIntegrationResponseOutput => |out, b| {
    b.text("/contentHandling", out.content_handling().map(|c| c.as_str()));
    b.text("/selectionPattern", out.selection_pattern());
    b.map("/responseParameters", out.response_parameters());
    b.map("/responseTemplates", out.response_templates());
});

to_entity!(CreateDeploymentOutput, GetDeploymentOutput => |out, b| {
    b.id(out.id());
    b.text("/description", out.description());
    b.date("createdDate", out.created_date());
});

to_entity!(CreateStageOutput, GetStageOutput => |out, b| {
    b.text("/deploymentId", out.deployment_id());
    b.text("/description", out.description());
    b.flag("/cacheClusterEnabled", Some(out.cache_cluster_enabled()));
    b.text("/cacheClusterSize", out.cache_cluster_size().map(|s| s.as_str()));
    b.flag("/tracingEnabled", Some(out.tracing_enabled()));
    b.text("/documentationVersion", out.documentation_version());
    b.map("/variables", out.variables());
    if let Some(canary) = out.canary_settings() {
        b.text("/canarySettings/deploymentId", canary.deployment_id());
        b.text("/canarySettings/percentTraffic", Some(canary.percent_traffic().to_string()));
        b.map("/canarySettings/stageVariableOverrides", canary.stage_variable_overrides());
        b.flag("/canarySettings/useStageCache", Some(canary.use_stage_cache()));
    }
    b.date("createdDate", out.created_date());
    b.date("lastUpdatedDate", out.last_updated_date());
    b.tags(out.tags());
});

to_entity!(CreateAuthorizerOutput, GetAuthorizerOutput => |out, b| {
    b.id(out.id());
    b.text("/name", out.name());
    b.text("/type", out.r#type().map(|t| t.as_str()));
    b.text("/authType", out.auth_type());
    b.text("/authorizerUri", out.authorizer_uri());
    b.text("/authorizerCredentials", out.authorizer_credentials());
    b.int("/authorizerResultTtlInSeconds", out.authorizer_result_ttl_in_seconds());
    b.text("/identitySource", out.identity_source());
    b.text("/identityValidationExpression", out.identity_validation_expression());
    b.list("/providerARNs", out.provider_arns());
});

to_entity!(CreateApiKeyOutput, GetApiKeyOutput => |out, b| {
    b.id(out.id());
    b.text("/name", out.name());
    b.text("/description", out.description());
    b.flag("/enabled", Some(out.enabled()));
    b.text("/customerId", out.customer_id());
    b.list("/stages", out.stage_keys());
    b.text("/value", out.value());
    b.date("createdDate", out.created_date());
    b.tags(out.tags());
});

to_entity!(CreateVpcLinkOutput, GetVpcLinkOutput => |out, b| {
    b.id(out.id());
    b.text("/name", out.name());
    b.text("/description", out.description());
    b.list("/targetArns", out.target_arns());
    b.read_only("status", out.status().map(|s| s.as_str()));
    b.read_only("statusMessage", out.status_message());
    b.tags(out.tags());
});

pub(super) fn text(fields: &FieldMap, path: &str) -> Option<String> {
    fields.get(path).and_then(FieldValue::to_patch_value)
}

pub(super) fn flag(fields: &FieldMap, path: &str) -> Option<bool> {
    fields.get(path).and_then(FieldValue::as_bool)
}

pub(super) fn int(fields: &FieldMap, path: &str) -> Option<i32> {
    fields
        .get(path)
        .and_then(FieldValue::as_int)
        .and_then(|v| i32::try_from(v).ok())
}

pub(super) fn float(fields: &FieldMap, path: &str) -> Option<f64> {
    text(fields, path).and_then(|v| v.parse().ok())
}

fn sets_canary(fields: &FieldMap) -> bool {
    fields.keys().any(|path| path.starts_with("/canarySettings/"))
}

/// Stage canary from the `/canarySettings/...` fields, if any are set
pub(super) fn canary_settings(fields: &FieldMap) -> Option<CanarySettings> {
    sets_canary(fields).then(|| {
        CanarySettings::builder()
            .set_deployment_id(text(fields, "/canarySettings/deploymentId"))
            .set_percent_traffic(float(fields, "/canarySettings/percentTraffic"))
            .set_stage_variable_overrides(map(fields, "/canarySettings/stageVariableOverrides"))
            .set_use_stage_cache(flag(fields, "/canarySettings/useStageCache"))
            .build()
    })
}

/// Canary created together with a deployment's stage
pub(super) fn deployment_canary_settings(fields: &FieldMap) -> Option<DeploymentCanarySettings> {
    sets_canary(fields).then(|| {
        DeploymentCanarySettings::builder()
            .set_percent_traffic(float(fields, "/canarySettings/percentTraffic"))
            .set_stage_variable_overrides(map(fields, "/canarySettings/stageVariableOverrides"))
            .set_use_stage_cache(flag(fields, "/canarySettings/useStageCache"))
            .build()
    })
}

pub(super) fn list(fields: &FieldMap, path: &str) -> Option<Vec<String>> {
    fields.get(path).map(|v| v.as_list().to_vec())
}

pub(super) fn map(fields: &FieldMap, path: &str) -> Option<HashMap<String, String>> {
    fields
        .get(path)
        .and_then(FieldValue::as_map)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

pub(super) fn bool_map(fields: &FieldMap, path: &str) -> Option<HashMap<String, bool>> {
    fields.get(path).and_then(FieldValue::as_map).map(|m| {
        m.iter()
            .map(|(k, v)| (k.clone(), v.parse().unwrap_or(false)))
            .collect()
    })
}

pub(super) fn tags(tags: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    (!tags.is_empty()).then(|| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

pub(super) fn patch_operations(operations: &[PatchOperation]) -> Vec<SdkPatchOperation> {
    operations
        .iter()
        .map(|operation| {
            let op = match operation.op {
                PatchOp::Add => Op::Add,
                PatchOp::Remove => Op::Remove,
                PatchOp::Replace => Op::Replace,
            };
            SdkPatchOperation::builder()
                .op(op)
                .path(&operation.path)
                .set_value(operation.value.clone())
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PatchSet;

    #[test]
    fn test_bool_map_parses_flags() {
        let fields = FieldMap::from([(
            "/requestParameters".to_string(),
            FieldValue::Map(BTreeMap::from([
                ("method.request.header.a".to_string(), "true".to_string()),
                ("method.request.querystring.b".to_string(), "false".to_string()),
            ])),
        )]);
        let parsed = bool_map(&fields, "/requestParameters").unwrap();
        assert_eq!(parsed["method.request.header.a"], true);
        assert_eq!(parsed["method.request.querystring.b"], false);
    }

    #[test]
    fn test_patch_operations_keep_order_and_values() {
        let mut patch = PatchSet::new();
        patch.remove("/variables/old");
        patch.replace("/description", Some("v2".to_string()));
        let ops = patch_operations(patch.operations());
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].op(), Some(&Op::Remove));
        assert_eq!(ops[0].path(), Some("/variables/old"));
        assert_eq!(ops[1].value(), Some("v2"));
    }

    #[test]
    fn test_stage_canary_flattens_and_rebuilds() {
        let out = GetStageOutput::builder()
            .stage_name("prod")
            .canary_settings(
                CanarySettings::builder()
                    .percent_traffic(10.5)
                    .stage_variable_overrides("v1", "k1")
                    .build(),
            )
            .build();
        let entity = out.to_entity(RemoteKey::new(), None);
        assert_eq!(
            entity.fields["/canarySettings/percentTraffic"],
            FieldValue::from("10.5")
        );
        assert_eq!(
            entity.fields["/canarySettings/useStageCache"],
            FieldValue::Bool(false)
        );

        let canary = canary_settings(&entity.fields).unwrap();
        assert!((canary.percent_traffic() - 10.5).abs() < f64::EPSILON);
        assert_eq!(
            canary.stage_variable_overrides().unwrap().get("v1").map(String::as_str),
            Some("k1")
        );
        assert!(canary_settings(&FieldMap::new()).is_none());
    }

    #[test]
    fn test_entity_builder_records_assigned_id() {
        let out = GetRestApiOutput::builder()
            .id("a1b2c3")
            .name("orders")
            .root_resource_id("r00t")
            .build();
        let entity = out.to_entity(RemoteKey::new(), Some("restApiId"));
        assert_eq!(entity.key["restApiId"], "a1b2c3");
        assert_eq!(entity.fields["/name"], FieldValue::from("orders"));
        assert_eq!(entity.read_only("rootResourceId"), Some("r00t"));
    }
}
