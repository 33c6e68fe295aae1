//! # Resource Kinds
//!
//! The closed set of API Gateway kinds the controller manages.

use super::DescriptorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "RestAPI")]
    RestApi,
    Resource,
    Method,
    MethodResponse,
    Integration,
    IntegrationResponse,
    Deployment,
    Stage,
    Authorizer,
    #[serde(rename = "APIKey")]
    ApiKey,
    #[serde(rename = "VPCLink")]
    VpcLink,
}

impl Kind {
    pub const ALL: [Kind; 11] = [
        Kind::RestApi,
        Kind::Resource,
        Kind::Method,
        Kind::MethodResponse,
        Kind::Integration,
        Kind::IntegrationResponse,
        Kind::Deployment,
        Kind::Stage,
        Kind::Authorizer,
        Kind::ApiKey,
        Kind::VpcLink,
    ];

    /// Custom resource kind name as it appears in manifests
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::RestApi => "RestAPI",
            Kind::Resource => "Resource",
            Kind::Method => "Method",
            Kind::MethodResponse => "MethodResponse",
            Kind::Integration => "Integration",
            Kind::IntegrationResponse => "IntegrationResponse",
            Kind::Deployment => "Deployment",
            Kind::Stage => "Stage",
            Kind::Authorizer => "Authorizer",
            Kind::ApiKey => "APIKey",
            Kind::VpcLink => "VPCLink",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DescriptorError::UnknownKind(s.to_string()))
    }
}
