//! # Integration and IntegrationResponse

use crate::crd::{ResourceReference, ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Integration",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Method", "type":"string", "jsonPath":".spec.httpMethod"}, {"name":"Type", "type":"string", "jsonPath":".spec.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    #[serde(default, rename = "resourceID")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_ref: Option<ResourceReference>,
    /// Method the integration is attached to
    pub http_method: String,
    /// HTTP, HTTP_PROXY, AWS, AWS_PROXY or MOCK
    #[serde(rename = "type")]
    pub integration_type: String,
    /// Method used to call the backend
    #[serde(default)]
    pub integration_http_method: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    /// INTERNET or VPC_LINK
    #[serde(default)]
    pub connection_type: Option<String>,
    #[serde(default, rename = "connectionID")]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub connection_ref: Option<ResourceReference>,
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub cache_namespace: Option<String>,
    #[serde(default)]
    pub cache_key_parameters: Option<Vec<String>>,
    #[serde(default)]
    pub content_handling: Option<String>,
    #[serde(default)]
    pub passthrough_behavior: Option<String>,
    #[serde(default)]
    pub request_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub request_templates: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub timeout_in_millis: Option<i64>,
    #[serde(default)]
    pub tls_config: Option<TlsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    #[serde(default)]
    pub insecure_skip_verification: Option<bool>,
}

impl SpecFields for IntegrationSpec {
    const KIND: Kind = Kind::Integration;

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
        view.field("/type", Some(self.integration_type.as_str()));
        view.field("/httpMethod", self.integration_http_method.clone());
        view.field("/uri", self.uri.clone());
        view.field("/connectionType", self.connection_type.clone());
        view.field_or_ref(
            "/connectionId",
            self.connection_id.as_ref(),
            "connectionRef",
            self.connection_ref.as_ref(),
        )?;
        view.field("/credentials", self.credentials.clone());
        view.field("/cacheNamespace", self.cache_namespace.clone());
        view.field("/cacheKeyParameters", self.cache_key_parameters.clone());
        view.field("/contentHandling", self.content_handling.clone());
        view.field("/passthroughBehavior", self.passthrough_behavior.clone());
        view.field("/requestParameters", self.request_parameters.clone());
        view.field("/requestTemplates", self.request_templates.clone());
        view.field("/timeoutInMillis", self.timeout_in_millis);
        view.field(
            "/tlsConfig/insecureSkipVerification",
            self.tls_config
                .as_ref()
                .and_then(|tls| tls.insecure_skip_verification),
        );

        let uses_vpc_link = self.connection_type.as_deref() == Some("VPC_LINK");
        if uses_vpc_link && self.connection_id.is_none() && self.connection_ref.is_none() {
            return Err(SpecError::Invalid {
                field: "connectionID",
                message: "VPC_LINK connections require connectionID or connectionRef".to_string(),
            });
        }
        Ok(view)
    }
}

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "IntegrationResponse",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResponseSpec {
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
    pub selection_pattern: Option<String>,
    #[serde(default)]
    pub content_handling: Option<String>,
    #[serde(default)]
    pub response_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub response_templates: Option<BTreeMap<String, String>>,
}

impl SpecFields for IntegrationResponseSpec {
    const KIND: Kind = Kind::IntegrationResponse;

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
        view.field("/selectionPattern", self.selection_pattern.clone());
        view.field("/contentHandling", self.content_handling.clone());
        view.field("/responseParameters", self.response_parameters.clone());
        view.field("/responseTemplates", self.response_templates.clone());
        Ok(view)
    }
}
