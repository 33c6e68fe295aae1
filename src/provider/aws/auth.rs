//! # AWS SDK Configuration
//!
//! Builds the shared SDK config from the default credential chain (IRSA,
//! environment, profile).

use anyhow::Result;
use aws_config::SdkConfig;
use tracing::info;

/// Create AWS SDK config using the default credential chain
///
/// `endpoint_url` routes requests to a local emulator instead of AWS.
pub async fn create_sdk_config(region: &str, endpoint_url: Option<&str>) -> Result<SdkConfig> {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(endpoint) = endpoint_url {
        info!("Routing API Gateway requests to {}", endpoint);
        builder = builder.endpoint_url(endpoint);
    }

    let sdk_config = builder.load().await;

    Ok(sdk_config)
}
