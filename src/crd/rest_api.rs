//! # RestAPI
//!
//! ```yaml
//! apiVersion: apigateway.services.k8s.aws/v1alpha1
//! kind: RestAPI
//! metadata:
//!   name: orders-api
//! spec:
//!   name: orders-api
//!   apiKeySource: HEADER
//!   endpointConfiguration:
//!     types: [REGIONAL]
//!   tags:
//!     team: payments
//! ```

use crate::crd::{ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "RestAPI",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "restapi",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.id"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"ACK.ResourceSynced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RestApiSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// HEADER or AUTHORIZER
    #[serde(default)]
    pub api_key_source: Option<String>,
    #[serde(default)]
    pub binary_media_types: Option<Vec<String>>,
    #[serde(default)]
    pub disable_execute_api_endpoint: Option<bool>,
    #[serde(default)]
    pub endpoint_configuration: Option<EndpointConfiguration>,
    #[serde(default)]
    pub minimum_compression_size: Option<i64>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfiguration {
    /// EDGE, REGIONAL or PRIVATE
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, rename = "vpcEndpointIDs")]
    pub vpc_endpoint_ids: Option<Vec<String>>,
}

impl SpecFields for RestApiSpec {
    const KIND: Kind = Kind::RestApi;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.field("/name", Some(self.name.as_str()));
        view.field("/description", self.description.clone());
        view.field("/apiKeySource", self.api_key_source.clone());
        view.field("/binaryMediaTypes", self.binary_media_types.clone());
        view.field("/disableExecuteApiEndpoint", self.disable_execute_api_endpoint);
        view.field("/minimumCompressionSize", self.minimum_compression_size);
        view.field("/policy", self.policy.clone());
        view.field("/version", self.version.clone());

        if let Some(endpoint) = &self.endpoint_configuration {
            // API Gateway only patches a single endpoint type in place
            match endpoint.types.as_slice() {
                [single] => view.field("/endpointConfiguration/types/0", Some(single.as_str())),
                [] => {}
                _ => {
                    return Err(SpecError::Invalid {
                        field: "endpointConfiguration.types",
                        message: "exactly one endpoint type must be specified".to_string(),
                    })
                }
            }
            view.field(
                "/endpointConfiguration/vpcEndpointIds",
                endpoint.vpc_endpoint_ids.clone(),
            );
        }

        view.tags(self.tags.as_ref());
        Ok(view)
    }
}
