//! # Deployment and Stage
//!
//! A Deployment snapshots a REST API; a Stage points at a deployment and is
//! addressed by `restApiId` + `stageName`. Canary settings are flattened
//! under `/canarySettings/...` on both.

use crate::crd::{ResourceReference, ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Deployment",
    root = "GatewayDeployment",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.id"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayDeploymentSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    #[serde(default)]
    pub description: Option<String>,
    /// Stage created together with the deployment
    #[serde(default)]
    pub stage_name: Option<String>,
    #[serde(default)]
    pub stage_description: Option<String>,
    /// Canary created on the new stage; fixed once the deployment exists
    #[serde(default)]
    pub canary_settings: Option<DeploymentCanarySettings>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCanarySettings {
    #[serde(default)]
    pub percent_traffic: Option<f64>,
    #[serde(default)]
    pub stage_variable_overrides: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub use_stage_cache: Option<bool>,
}

/// Canary release settings of a stage
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanarySettings {
    /// Deployment receiving canary traffic
    #[serde(default, rename = "deploymentID")]
    pub deployment_id: Option<String>,
    /// Share of stage traffic routed to the canary, 0.0 to 100.0
    #[serde(default)]
    pub percent_traffic: Option<f64>,
    #[serde(default)]
    pub stage_variable_overrides: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub use_stage_cache: Option<bool>,
}

fn percent_traffic(view: &mut SpecView, value: Option<f64>) -> Result<(), SpecError> {
    if let Some(percent) = value {
        if !(0.0..=100.0).contains(&percent) {
            return Err(SpecError::Invalid {
                field: "canarySettings.percentTraffic",
                message: format!("{percent} is outside 0.0..=100.0"),
            });
        }
        view.field("/canarySettings/percentTraffic", Some(percent.to_string()));
    }
    Ok(())
}

impl SpecFields for GatewayDeploymentSpec {
    const KIND: Kind = Kind::Deployment;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.identifier_or_ref(
            "restApiId",
            self.rest_api_id.as_ref(),
            "restAPIRef",
            self.rest_api_ref.as_ref(),
        )?;
        view.field("/description", self.description.clone());
        view.field("/stageName", self.stage_name.clone());
        view.field("/stageDescription", self.stage_description.clone());
        if let Some(canary) = &self.canary_settings {
            percent_traffic(&mut view, canary.percent_traffic)?;
            view.field(
                "/canarySettings/stageVariableOverrides",
                canary.stage_variable_overrides.clone(),
            );
            view.field("/canarySettings/useStageCache", canary.use_stage_cache);
        }
        Ok(view)
    }
}

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Stage",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Stage", "type":"string", "jsonPath":".spec.stageName"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"ACK.ResourceSynced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StageSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    pub stage_name: String,
    #[serde(default, rename = "deploymentID")]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub deployment_ref: Option<ResourceReference>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cache_cluster_enabled: Option<bool>,
    /// 0.5, 1.6, 6.1, 13.5, 28.4, 58.2, 118 or 237
    #[serde(default)]
    pub cache_cluster_size: Option<String>,
    #[serde(default)]
    pub tracing_enabled: Option<bool>,
    #[serde(default)]
    pub documentation_version: Option<String>,
    #[serde(default)]
    pub variables: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub canary_settings: Option<CanarySettings>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

impl SpecFields for StageSpec {
    const KIND: Kind = Kind::Stage;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.identifier_or_ref(
            "restApiId",
            self.rest_api_id.as_ref(),
            "restAPIRef",
            self.rest_api_ref.as_ref(),
        )?;
        view.identifier("stageName", &self.stage_name);
        view.field_or_ref(
            "/deploymentId",
            self.deployment_id.as_ref(),
            "deploymentRef",
            self.deployment_ref.as_ref(),
        )?;
        view.field("/description", self.description.clone());
        view.field("/cacheClusterEnabled", self.cache_cluster_enabled);
        view.field("/cacheClusterSize", self.cache_cluster_size.clone());
        view.field("/tracingEnabled", self.tracing_enabled);
        view.field("/documentationVersion", self.documentation_version.clone());
        view.field("/variables", self.variables.clone());
        if let Some(canary) = &self.canary_settings {
            view.field("/canarySettings/deploymentId", canary.deployment_id.clone());
            percent_traffic(&mut view, canary.percent_traffic)?;
            view.field(
                "/canarySettings/stageVariableOverrides",
                canary.stage_variable_overrides.clone(),
            );
            view.field("/canarySettings/useStageCache", canary.use_stage_cache);
        }
        view.tags(self.tags.as_ref());
        Ok(view)
    }
}
