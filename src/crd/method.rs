//! # Method and MethodResponse

use crate::crd::{ResourceReference, ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::{bool_map, Kind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Method",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Method", "type":"string", "jsonPath":".spec.httpMethod"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"ACK.ResourceSynced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    #[serde(default, rename = "resourceID")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_ref: Option<ResourceReference>,
    pub http_method: String,
    /// NONE, AWS_IAM, CUSTOM or COGNITO_USER_POOLS
    #[serde(default = "default_authorization_type")]
    pub authorization_type: String,
    #[serde(default, rename = "authorizerID")]
    pub authorizer_id: Option<String>,
    #[serde(default)]
    pub authorizer_ref: Option<ResourceReference>,
    #[serde(default)]
    pub api_key_required: Option<bool>,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default, rename = "requestValidatorID")]
    pub request_validator_id: Option<String>,
    #[serde(default)]
    pub authorization_scopes: Option<Vec<String>>,
    #[serde(default)]
    pub request_parameters: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub request_models: Option<BTreeMap<String, String>>,
}

fn default_authorization_type() -> String {
    "NONE".to_string()
}

impl SpecFields for MethodSpec {
    const KIND: Kind = Kind::Method;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.identifier_or_ref(
            "restApiId",
            self.rest_api_id.as_ref(),
            "restAPIRef",
            self.rest_api_ref.as_ref(),
        )?;
        view.identifier_or_ref(
            "resourceId",
            self.resource_id.as_ref(),
            "resourceRef",
            self.resource_ref.as_ref(),
        )?;
        view.identifier("httpMethod", &self.http_method.to_uppercase());
        view.field("/authorizationType", Some(self.authorization_type.as_str()));
        view.field_or_ref(
            "/authorizerId",
            self.authorizer_id.as_ref(),
            "authorizerRef",
            self.authorizer_ref.as_ref(),
        )?;
        view.field("/apiKeyRequired", self.api_key_required);
        view.field("/operationName", self.operation_name.clone());
        view.field("/requestValidatorId", self.request_validator_id.clone());
        view.field("/authorizationScopes", self.authorization_scopes.clone());
        view.field("/requestParameters", self.request_parameters.as_ref().map(bool_map));
        view.field("/requestModels", self.request_models.clone());
        Ok(view)
    }
}

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "MethodResponse",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Method", "type":"string", "jsonPath":".spec.httpMethod"}, {"name":"Status", "type":"string", "jsonPath":".spec.statusCode"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponseSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    #[serde(default, rename = "resourceID")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_ref: Option<ResourceReference>,
    pub http_method: String,
    pub status_code: String,
    #[serde(default)]
    pub response_parameters: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub response_models: Option<BTreeMap<String, String>>,
}

impl SpecFields for MethodResponseSpec {
    const KIND: Kind = Kind::MethodResponse;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.identifier_or_ref(
            "restApiId",
            self.rest_api_id.as_ref(),
            "restAPIRef",
            self.rest_api_ref.as_ref(),
        )?;
        view.identifier_or_ref(
            "resourceId",
            self.resource_id.as_ref(),
            "resourceRef",
            self.resource_ref.as_ref(),
        )?;
        view.identifier("httpMethod", &self.http_method.to_uppercase());
        view.identifier("statusCode", &self.status_code);
        view.field(
            "/responseParameters",
            self.response_parameters.as_ref().map(bool_map),
        );
        view.field("/responseModels", self.response_models.clone());
        Ok(view)
    }
}
