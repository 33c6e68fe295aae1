//! # AWS API Gateway Client
//!
//! [`RemoteClient`] over `aws-sdk-apigateway`.
//!
//! This module provides functionality to:
//! - Create API Gateway entities from field maps
//! - Apply patch sets through the `Update*` operations
//! - Sync tags with `TagResource` / `UntagResource`
//! - Map SDK error codes onto [`RemoteError`]

mod auth;
mod convert;
mod errors;
mod operations;

use crate::descriptor::{DescriptorRegistry, Kind};
use crate::provider::{
    resource_arn, CreateRequest, RemoteClient, RemoteEntity, RemoteError, RemoteKey, UpdateDelta,
};
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_apigateway::Client as ApiGatewaySdkClient;
use tracing::{debug, info_span, Instrument};

use self::auth::create_sdk_config;

/// AWS API Gateway provider implementation
pub struct ApiGatewayClient {
    pub(crate) client: ApiGatewaySdkClient,
    pub(crate) region: String,
    registry: DescriptorRegistry,
}

impl std::fmt::Debug for ApiGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGatewayClient")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl ApiGatewayClient {
    /// Create a new API Gateway client
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn new(region: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let sdk_config = create_sdk_config(region, endpoint_url).await?;
        let client = ApiGatewaySdkClient::new(&sdk_config);

        Ok(Self {
            client,
            region: region.to_string(),
            registry: DescriptorRegistry::default(),
        })
    }

    fn assigned_key(&self, kind: Kind) -> Option<&'static str> {
        self.registry
            .get(kind)
            .ok()
            .and_then(|descriptor| descriptor.assigned_key())
    }
}

pub(super) fn key_part<'a>(key: &'a RemoteKey, name: &str) -> Result<&'a str, RemoteError> {
    key.get(name)
        .map(String::as_str)
        .ok_or_else(|| RemoteError::InvalidInput(format!("{name} is required")))
}

#[async_trait]
impl RemoteClient for ApiGatewayClient {
    async fn fetch(&self, kind: Kind, key: &RemoteKey) -> Result<RemoteEntity, RemoteError> {
        let span = info_span!("aws.apigateway.fetch", kind = %kind);
        async move {
            let entity = self
                .get_entity(kind, key, self.assigned_key(kind))
                .await?;
            debug!(?key, "fetched remote entity");
            Ok(entity)
        }
        .instrument(span)
        .await
    }

    async fn create(
        &self,
        kind: Kind,
        request: CreateRequest,
    ) -> Result<RemoteEntity, RemoteError> {
        let span = info_span!("aws.apigateway.create", kind = %kind);
        async move {
            let mut entity = self
                .create_entity(kind, &request, self.assigned_key(kind))
                .await?;
            entity.arn = resource_arn(kind, &entity.key, &self.region)?;
            Ok(entity)
        }
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        kind: Kind,
        key: &RemoteKey,
        delta: UpdateDelta,
    ) -> Result<RemoteEntity, RemoteError> {
        let span = info_span!(
            "aws.apigateway.update",
            kind = %kind,
            operations = delta.patch.len()
        );
        async move {
            if !delta.patch.is_empty() {
                self.patch_entity(kind, key, delta.patch.operations()).await?;
            }
            if !delta.tags.is_empty() {
                let arn = resource_arn(kind, key, &self.region)?
                    .ok_or_else(|| RemoteError::InvalidInput(format!("{kind} is not taggable")))?;
                self.sync_tags(&arn, &delta.tags).await?;
            }
            self.get_entity(kind, key, self.assigned_key(kind)).await
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, kind: Kind, key: &RemoteKey) -> Result<(), RemoteError> {
        let span = info_span!("aws.apigateway.delete", kind = %kind);
        self.delete_entity(kind, key).instrument(span).await
    }
}
