//! Typed API Gateway resource paths.

use crate::errors::PathBuilderError;
use std::fmt;

/// Resource path of a taggable API Gateway entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourcePath {
    RestApi { rest_api_id: String },
    Stage { rest_api_id: String, stage_name: String },
    ApiKey { api_key_id: String },
    VpcLink { vpc_link_id: String },
}

impl ResourcePath {
    pub fn rest_api(rest_api_id: &str) -> Result<Self, PathBuilderError> {
        Ok(Self::RestApi {
            rest_api_id: non_empty("restApiId", rest_api_id)?,
        })
    }

    pub fn stage(rest_api_id: &str, stage_name: &str) -> Result<Self, PathBuilderError> {
        Ok(Self::Stage {
            rest_api_id: non_empty("restApiId", rest_api_id)?,
            stage_name: non_empty("stageName", stage_name)?,
        })
    }

    pub fn api_key(api_key_id: &str) -> Result<Self, PathBuilderError> {
        Ok(Self::ApiKey {
            api_key_id: non_empty("apiKeyId", api_key_id)?,
        })
    }

    pub fn vpc_link(vpc_link_id: &str) -> Result<Self, PathBuilderError> {
        Ok(Self::VpcLink {
            vpc_link_id: non_empty("vpcLinkId", vpc_link_id)?,
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestApi { rest_api_id } => write!(f, "/restapis/{rest_api_id}"),
            Self::Stage {
                rest_api_id,
                stage_name,
            } => write!(f, "/restapis/{rest_api_id}/stages/{stage_name}"),
            Self::ApiKey { api_key_id } => write!(f, "/apikeys/{api_key_id}"),
            Self::VpcLink { vpc_link_id } => write!(f, "/vpclinks/{vpc_link_id}"),
        }
    }
}

fn non_empty(segment: &'static str, value: &str) -> Result<String, PathBuilderError> {
    if value.is_empty() {
        return Err(PathBuilderError::EmptySegment(segment));
    }
    Ok(value.to_string())
}
