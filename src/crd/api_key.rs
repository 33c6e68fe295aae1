//! # APIKey and VPCLink
//!
//! Account-level entities: neither hangs off a REST API, both are tagged by
//! ARN.

use crate::crd::{ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "APIKey",
    root = "ApiKey",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.id"}, {"name":"Enabled", "type":"boolean", "jsonPath":".spec.enabled"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, rename = "customerID")]
    pub customer_id: Option<String>,
    #[serde(default, rename = "generateDistinctID")]
    pub generate_distinct_id: Option<bool>,
    /// Key value; generated remotely when unset
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub stage_keys: Option<Vec<StageKey>>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageKey {
    #[serde(rename = "restAPIID")]
    pub rest_api_id: String,
    pub stage_name: String,
}

impl StageKey {
    /// `restApiId/stageName`, the element form API Gateway patches under `/stages`
    pub fn to_element(&self) -> String {
        format!("{}/{}", self.rest_api_id, self.stage_name)
    }
}

impl SpecFields for ApiKeySpec {
    const KIND: Kind = Kind::ApiKey;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.field("/name", Some(self.name.as_str()));
        view.field("/description", self.description.clone());
        view.field("/enabled", self.enabled);
        view.field("/customerId", self.customer_id.clone());
        view.field("/generateDistinctId", self.generate_distinct_id);
        view.field("/value", self.value.clone());
        view.field(
            "/stages",
            self.stage_keys
                .as_ref()
                .map(|keys| keys.iter().map(StageKey::to_element).collect::<Vec<_>>()),
        );
        view.tags(self.tags.as_ref());
        Ok(view)
    }
}

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "VPCLink",
    root = "VpcLink",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.id"}, {"name":"Status", "type":"string", "jsonPath":".status.remote.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VpcLinkSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Network load balancer ARNs
    #[serde(rename = "targetARNs")]
    pub target_arns: Vec<String>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

impl SpecFields for VpcLinkSpec {
    const KIND: Kind = Kind::VpcLink;

    fn view(&self) -> Result<SpecView, SpecError> {
        if self.target_arns.is_empty() {
            return Err(SpecError::Invalid {
                field: "targetARNs",
                message: "at least one target ARN is required".to_string(),
            });
        }
        let mut view = SpecView::default();
        view.field("/name", Some(self.name.as_str()));
        view.field("/description", self.description.clone());
        view.field("/targetArns", Some(self.target_arns.clone()));
        view.tags(self.tags.as_ref());
        Ok(view)
    }
}
