//! # Authorizer

use crate::crd::{ResourceReference, ResourceStatus, SpecError, SpecFields, SpecView};
use crate::descriptor::Kind;
use serde::{Deserialize, Serialize};

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Authorizer",
    group = "apigateway.services.k8s.aws",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.id"}, {"name":"Type", "type":"string", "jsonPath":".spec.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerSpec {
    #[serde(default, rename = "restAPIID")]
    pub rest_api_id: Option<String>,
    #[serde(default, rename = "restAPIRef")]
    pub rest_api_ref: Option<ResourceReference>,
    pub name: String,
    /// TOKEN, REQUEST or COGNITO_USER_POOLS
    #[serde(rename = "type")]
    pub authorizer_type: String,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default, rename = "authorizerURI")]
    pub authorizer_uri: Option<String>,
    #[serde(default)]
    pub authorizer_credentials: Option<String>,
    #[serde(default, rename = "authorizerResultTTLInSeconds")]
    pub authorizer_result_ttl_in_seconds: Option<i64>,
    #[serde(default)]
    pub identity_source: Option<String>,
    #[serde(default)]
    pub identity_validation_expression: Option<String>,
    /// Cognito user pool ARNs
    #[serde(default, rename = "providerARNs")]
    pub provider_arns: Option<Vec<String>>,
}

impl SpecFields for AuthorizerSpec {
    const KIND: Kind = Kind::Authorizer;

    fn view(&self) -> Result<SpecView, SpecError> {
        let mut view = SpecView::default();
        view.identifier_or_ref(
            "restApiId",
            self.rest_api_id.as_ref(),
            "restAPIRef",
            self.rest_api_ref.as_ref(),
        )?;
        view.field("/name", Some(self.name.as_str()));
        view.field("/type", Some(self.authorizer_type.as_str()));
        view.field("/authType", self.auth_type.clone());
        view.field("/authorizerUri", self.authorizer_uri.clone());
        view.field("/authorizerCredentials", self.authorizer_credentials.clone());
        view.field(
            "/authorizerResultTtlInSeconds",
            self.authorizer_result_ttl_in_seconds,
        );
        view.field("/identitySource", self.identity_source.clone());
        view.field(
            "/identityValidationExpression",
            self.identity_validation_expression.clone(),
        );
        view.field("/providerARNs", self.provider_arns.clone());

        if self.authorizer_type == "COGNITO_USER_POOLS"
            && self.provider_arns.as_ref().is_none_or(Vec::is_empty)
        {
            return Err(SpecError::Invalid {
                field: "providerARNs",
                message: "COGNITO_USER_POOLS authorizers need at least one provider ARN"
                    .to_string(),
            });
        }
        Ok(view)
    }
}
