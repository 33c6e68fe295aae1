//! ARN construction for API Gateway resources.
//!
//! API Gateway ARNs carry no account id:
//! `arn:aws:apigateway:us-west-2::/restapis/a1b2c3/stages/prod`.

use crate::errors::PathBuilderError;
use crate::resource::ResourcePath;
use std::fmt;

const SERVICE: &str = "apigateway";

/// An API Gateway ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: &'static str,
    pub region: String,
    pub resource: ResourcePath,
}

impl Arn {
    pub fn new(region: &str, resource: ResourcePath) -> Result<Self, PathBuilderError> {
        Ok(Self {
            partition: partition_for_region(region)?,
            region: region.to_string(),
            resource,
        })
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}::{}",
            self.partition, SERVICE, self.region, self.resource
        )
    }
}

/// Map a region name to its partition id.
pub fn partition_for_region(region: &str) -> Result<&'static str, PathBuilderError> {
    let well_formed = !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && region.contains('-');
    if !well_formed {
        return Err(PathBuilderError::InvalidRegion(region.to_string()));
    }

    let partition = if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else {
        "aws"
    };
    Ok(partition)
}
