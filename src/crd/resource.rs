//! # Resource
//!
//! A path segment of a REST API. Parent is given either as a raw id (usually
//! the REST API's `rootResourceId`) or as a reference to another Resource.

use crate::crd::{ResourceReference, ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::Kind;
use serde::{Deserialize, Serialize};

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Resource",
    root = "GatewayResource",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.id"}, {"name":"Path", "type":"string", "jsonPath":".status.remote.path"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResourceSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    #[serde(default, rename = "parentID")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub parent_ref: Option<ResourceReference>,
    pub path_part: String,
}

impl SpecFields for GatewayResourceSpec {
    const KIND: Kind = Kind::Resource;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.identifier_or_ref(
            "restApiId",
            self.rest_api_id.as_ref(),
            "restAPIRef",
            self.rest_api_ref.as_ref(),
        )?;
        view.field_or_ref(
            "/parentId",
            self.parent_id.as_ref(),
            "parentRef",
            self.parent_ref.as_ref(),
        )?;
        view.field("/pathPart", Some(self.path_part.as_str()));
        Ok(view)
    }
}
