//! # API Gateway Operations
//!
//! Per-kind SDK calls behind [`ApiGatewayClient`].

use super::convert::{self, ToEntity};
use super::errors::classify;
use super::{key_part, ApiGatewayClient};
use crate::descriptor::Kind;
use crate::provider::{
    resource_arn, CreateRequest, PatchOperation, RemoteEntity, RemoteError, RemoteKey, TagDelta,
};
use aws_sdk_apigateway::types::{
    ApiKeySourceType, AuthorizerType, CacheClusterSize, ConnectionType, ContentHandlingStrategy,
    EndpointConfiguration, EndpointType, IntegrationType, StageKey, TlsConfig,
};
use tracing::debug;

impl ApiGatewayClient {
    pub(super) async fn get_entity(
        &self,
        kind: Kind,
        key: &RemoteKey,
        assigned: Option<&'static str>,
    ) -> Result<RemoteEntity, RemoteError> {
        let client = &self.client;
        let owned = key.clone();
        let mut entity = match kind {
            Kind::RestApi => client
                .get_rest_api()
                .rest_api_id(key_part(key, "restApiId")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::Resource => client
                .get_resource()
                .rest_api_id(key_part(key, "restApiId")?)
                .resource_id(key_part(key, "resourceId")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::Method => client
                .get_method()
                .rest_api_id(key_part(key, "restApiId")?)
                .resource_id(key_part(key, "resourceId")?)
                .http_method(key_part(key, "httpMethod")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::MethodResponse => client
                .get_method_response()
                .rest_api_id(key_part(key, "restApiId")?)
                .resource_id(key_part(key, "resourceId")?)
                .http_method(key_part(key, "httpMethod")?)
                .status_code(key_part(key, "statusCode")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::Integration => client
                .get_integration()
                .rest_api_id(key_part(key, "restApiId")?)
                .resource_id(key_part(key, "resourceId")?)
                .http_method(key_part(key, "httpMethod")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::IntegrationResponse => client
                .get_integration_response()
                .rest_api_id(key_part(key, "restApiId")?)
                .resource_id(key_part(key, "resourceId")?)
                .http_method(key_part(key, "httpMethod")?)
                .status_code(key_part(key, "statusCode")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::Deployment => client
                .get_deployment()
                .rest_api_id(key_part(key, "restApiId")?)
                .deployment_id(key_part(key, "deploymentId")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::Stage => client
                .get_stage()
                .rest_api_id(key_part(key, "restApiId")?)
                .stage_name(key_part(key, "stageName")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::Authorizer => client
                .get_authorizer()
                .rest_api_id(key_part(key, "restApiId")?)
                .authorizer_id(key_part(key, "authorizerId")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::ApiKey => client
                .get_api_key()
                .api_key(key_part(key, "apiKeyId")?)
                .include_value(true)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
            Kind::VpcLink => client
                .get_vpc_link()
                .vpc_link_id(key_part(key, "vpcLinkId")?)
                .send()
                .await
                .map_err(classify)?
                .to_entity(owned, assigned),
        };
        entity.arn = resource_arn(kind, &entity.key, &self.region)?;
        Ok(entity)
    }

    pub(super) async fn create_entity(
        &self,
        kind: Kind,
        request: &CreateRequest,
        assigned: Option<&'static str>,
    ) -> Result<RemoteEntity, RemoteError> {
        let client = &self.client;
        let fields = &request.fields;
        let ids = &request.identifiers;
        let key = request.identifiers.clone();
        debug!(%kind, fields = fields.len(), "creating remote entity");

        let entity = match kind {
            Kind::RestApi => {
                let endpoint = EndpointConfiguration::builder()
                    .set_types(
                        convert::text(fields, "/endpointConfiguration/types/0")
                            .map(|t| vec![EndpointType::from(t.as_str())]),
                    )
                    .set_vpc_endpoint_ids(convert::list(
                        fields,
                        "/endpointConfiguration/vpcEndpointIds",
                    ))
                    .build();
                client
                    .create_rest_api()
                    .set_name(convert::text(fields, "/name"))
                    .set_description(convert::text(fields, "/description"))
                    .set_api_key_source(
                        convert::text(fields, "/apiKeySource")
                            .map(|s| ApiKeySourceType::from(s.as_str())),
                    )
                    .set_binary_media_types(convert::list(fields, "/binaryMediaTypes"))
                    .set_disable_execute_api_endpoint(convert::flag(
                        fields,
                        "/disableExecuteApiEndpoint",
                    ))
                    .endpoint_configuration(endpoint)
                    .set_minimum_compression_size(convert::int(fields, "/minimumCompressionSize"))
                    .set_policy(convert::text(fields, "/policy"))
                    .set_version(convert::text(fields, "/version"))
                    .set_tags(convert::tags(&request.tags))
                    .send()
                    .await
                    .map_err(classify)?
                    .to_entity(key, assigned)
            }
            Kind::Resource => client
                .create_resource()
                .rest_api_id(key_part(ids, "restApiId")?)
                .set_parent_id(convert::text(fields, "/parentId"))
                .set_path_part(convert::text(fields, "/pathPart"))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::Method => client
                .put_method()
                .rest_api_id(key_part(ids, "restApiId")?)
                .resource_id(key_part(ids, "resourceId")?)
                .http_method(key_part(ids, "httpMethod")?)
                .set_authorization_type(convert::text(fields, "/authorizationType"))
                .set_authorizer_id(convert::text(fields, "/authorizerId"))
                .set_api_key_required(convert::flag(fields, "/apiKeyRequired"))
                .set_operation_name(convert::text(fields, "/operationName"))
                .set_request_validator_id(convert::text(fields, "/requestValidatorId"))
                .set_authorization_scopes(convert::list(fields, "/authorizationScopes"))
                .set_request_parameters(convert::bool_map(fields, "/requestParameters"))
                .set_request_models(convert::map(fields, "/requestModels"))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::MethodResponse => client
                .put_method_response()
                .rest_api_id(key_part(ids, "restApiId")?)
                .resource_id(key_part(ids, "resourceId")?)
                .http_method(key_part(ids, "httpMethod")?)
                .status_code(key_part(ids, "statusCode")?)
                .set_response_parameters(convert::bool_map(fields, "/responseParameters"))
                .set_response_models(convert::map(fields, "/responseModels"))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::Integration => {
                let tls = convert::flag(fields, "/tlsConfig/insecureSkipVerification").map(
                    |skip| {
                        TlsConfig::builder()
                            .insecure_skip_verification(skip)
                            .build()
                    },
                );
                client
                    .put_integration()
                    .rest_api_id(key_part(ids, "restApiId")?)
                    .resource_id(key_part(ids, "resourceId")?)
                    .http_method(key_part(ids, "httpMethod")?)
                    .set_type(
                        convert::text(fields, "/type").map(|t| IntegrationType::from(t.as_str())),
                    )
                    .set_integration_http_method(convert::text(fields, "/httpMethod"))
                    .set_uri(convert::text(fields, "/uri"))
                    .set_connection_type(
                        convert::text(fields, "/connectionType")
                            .map(|t| ConnectionType::from(t.as_str())),
                    )
                    .set_connection_id(convert::text(fields, "/connectionId"))
                    .set_credentials(convert::text(fields, "/credentials"))
                    .set_request_parameters(convert::map(fields, "/requestParameters"))
                    .set_request_templates(convert::map(fields, "/requestTemplates"))
                    .set_passthrough_behavior(convert::text(fields, "/passthroughBehavior"))
                    .set_cache_namespace(convert::text(fields, "/cacheNamespace"))
                    .set_cache_key_parameters(convert::list(fields, "/cacheKeyParameters"))
                    .set_content_handling(
                        convert::text(fields, "/contentHandling")
                            .map(|c| ContentHandlingStrategy::from(c.as_str())),
                    )
                    .set_timeout_in_millis(convert::int(fields, "/timeoutInMillis"))
                    .set_tls_config(tls)
                    .send()
                    .await
                    .map_err(classify)?
                    .to_entity(key, assigned)
            }
            Kind::IntegrationResponse => client
                .put_integration_response()
                .rest_api_id(key_part(ids, "restApiId")?)
                .resource_id(key_part(ids, "resourceId")?)
                .http_method(key_part(ids, "httpMethod")?)
                .status_code(key_part(ids, "statusCode")?)
                .set_selection_pattern(convert::text(fields, "/selectionPattern"))
                .set_response_parameters(convert::map(fields, "/responseParameters"))
                .set_response_templates(convert::map(fields, "/responseTemplates"))
                .set_content_handling(
                    convert::text(fields, "/contentHandling")
                        .map(|c| ContentHandlingStrategy::from(c.as_str())),
                )
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::Deployment => client
                .create_deployment()
                .rest_api_id(key_part(ids, "restApiId")?)
                .set_description(convert::text(fields, "/description"))
                .set_stage_name(convert::text(fields, "/stageName"))
                .set_stage_description(convert::text(fields, "/stageDescription"))
                .set_canary_settings(convert::deployment_canary_settings(fields))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::Stage => client
                .create_stage()
                .rest_api_id(key_part(ids, "restApiId")?)
                .stage_name(key_part(ids, "stageName")?)
                .set_deployment_id(convert::text(fields, "/deploymentId"))
                .set_description(convert::text(fields, "/description"))
                .set_cache_cluster_enabled(convert::flag(fields, "/cacheClusterEnabled"))
                .set_cache_cluster_size(
                    convert::text(fields, "/cacheClusterSize")
                        .map(|s| CacheClusterSize::from(s.as_str())),
                )
                .set_tracing_enabled(convert::flag(fields, "/tracingEnabled"))
                .set_documentation_version(convert::text(fields, "/documentationVersion"))
                .set_variables(convert::map(fields, "/variables"))
                .set_canary_settings(convert::canary_settings(fields))
                .set_tags(convert::tags(&request.tags))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::Authorizer => client
                .create_authorizer()
                .rest_api_id(key_part(ids, "restApiId")?)
                .set_name(convert::text(fields, "/name"))
                .set_type(convert::text(fields, "/type").map(|t| AuthorizerType::from(t.as_str())))
                .set_auth_type(convert::text(fields, "/authType"))
                .set_authorizer_uri(convert::text(fields, "/authorizerUri"))
                .set_authorizer_credentials(convert::text(fields, "/authorizerCredentials"))
                .set_authorizer_result_ttl_in_seconds(convert::int(
                    fields,
                    "/authorizerResultTtlInSeconds",
                ))
                .set_identity_source(convert::text(fields, "/identitySource"))
                .set_identity_validation_expression(convert::text(
                    fields,
                    "/identityValidationExpression",
                ))
                .set_provider_arns(convert::list(fields, "/providerARNs"))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
            Kind::ApiKey => {
                let stage_keys = convert::list(fields, "/stages").map(|stages| {
                    stages
                        .iter()
                        .filter_map(|element| element.split_once('/'))
                        .map(|(rest_api_id, stage_name)| {
                            StageKey::builder()
                                .rest_api_id(rest_api_id)
                                .stage_name(stage_name)
                                .build()
                        })
                        .collect()
                });
                client
                    .create_api_key()
                    .set_name(convert::text(fields, "/name"))
                    .set_description(convert::text(fields, "/description"))
                    .set_enabled(convert::flag(fields, "/enabled"))
                    .set_customer_id(convert::text(fields, "/customerId"))
                    .set_generate_distinct_id(convert::flag(fields, "/generateDistinctId"))
                    .set_value(convert::text(fields, "/value"))
                    .set_stage_keys(stage_keys)
                    .set_tags(convert::tags(&request.tags))
                    .send()
                    .await
                    .map_err(classify)?
                    .to_entity(key, assigned)
            }
            Kind::VpcLink => client
                .create_vpc_link()
                .set_name(convert::text(fields, "/name"))
                .set_description(convert::text(fields, "/description"))
                .set_target_arns(convert::list(fields, "/targetArns"))
                .set_tags(convert::tags(&request.tags))
                .send()
                .await
                .map_err(classify)?
                .to_entity(key, assigned),
        };
        Ok(entity)
    }

    pub(super) async fn patch_entity(
        &self,
        kind: Kind,
        key: &RemoteKey,
        operations: &[PatchOperation],
    ) -> Result<(), RemoteError> {
        let client = &self.client;
        let ops = Some(convert::patch_operations(operations));
        match kind {
            Kind::RestApi => {
                client
                    .update_rest_api()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Resource => {
                client
                    .update_resource()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Method => {
                client
                    .update_method()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::MethodResponse => {
                client
                    .update_method_response()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .status_code(key_part(key, "statusCode")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Integration => {
                client
                    .update_integration()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::IntegrationResponse => {
                client
                    .update_integration_response()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .status_code(key_part(key, "statusCode")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Deployment => {
                client
                    .update_deployment()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .deployment_id(key_part(key, "deploymentId")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Stage => {
                client
                    .update_stage()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .stage_name(key_part(key, "stageName")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Authorizer => {
                client
                    .update_authorizer()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .authorizer_id(key_part(key, "authorizerId")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::ApiKey => {
                client
                    .update_api_key()
                    .api_key(key_part(key, "apiKeyId")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::VpcLink => {
                client
                    .update_vpc_link()
                    .vpc_link_id(key_part(key, "vpcLinkId")?)
                    .set_patch_operations(ops)
                    .send()
                    .await
                    .map_err(classify)?;
            }
        }
        Ok(())
    }

    pub(super) async fn delete_entity(&self, kind: Kind, key: &RemoteKey) -> Result<(), RemoteError> {
        let client = &self.client;
        match kind {
            Kind::RestApi => {
                client
                    .delete_rest_api()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Resource => {
                client
                    .delete_resource()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Method => {
                client
                    .delete_method()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::MethodResponse => {
                client
                    .delete_method_response()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .status_code(key_part(key, "statusCode")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Integration => {
                client
                    .delete_integration()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::IntegrationResponse => {
                client
                    .delete_integration_response()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .resource_id(key_part(key, "resourceId")?)
                    .http_method(key_part(key, "httpMethod")?)
                    .status_code(key_part(key, "statusCode")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Deployment => {
                client
                    .delete_deployment()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .deployment_id(key_part(key, "deploymentId")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Stage => {
                client
                    .delete_stage()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .stage_name(key_part(key, "stageName")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::Authorizer => {
                client
                    .delete_authorizer()
                    .rest_api_id(key_part(key, "restApiId")?)
                    .authorizer_id(key_part(key, "authorizerId")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::ApiKey => {
                client
                    .delete_api_key()
                    .api_key(key_part(key, "apiKeyId")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
            Kind::VpcLink => {
                client
                    .delete_vpc_link()
                    .vpc_link_id(key_part(key, "vpcLinkId")?)
                    .send()
                    .await
                    .map_err(classify)?;
            }
        }
        Ok(())
    }

    pub(super) async fn sync_tags(&self, arn: &str, delta: &TagDelta) -> Result<(), RemoteError> {
        if !delta.remove.is_empty() {
            self.client
                .untag_resource()
                .resource_arn(arn)
                .set_tag_keys(Some(delta.remove.clone()))
                .send()
                .await
                .map_err(classify)?;
        }
        if !delta.set.is_empty() {
            self.client
                .tag_resource()
                .resource_arn(arn)
                .set_tags(convert::tags(&delta.set))
                .send()
                .await
                .map_err(classify)?;
        }
        Ok(())
    }
}
