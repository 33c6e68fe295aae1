//! # Custom Resource Definitions
//!
//! CRD types for the API Gateway Controller.
//!
//! One custom resource per API Gateway kind, all in the
//! `apigateway.services.k8s.aws/v1alpha1` group and all sharing
//! [`ResourceStatus`]. Cross-resource references use `*Ref.from.name`.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: apigateway.services.k8s.aws/v1alpha1
//! kind: Stage
//! metadata:
//!   name: prod
//!   namespace: default
//! spec:
//!   stageName: prod
//!   restAPIRef:
//!     from:
//!       name: orders-api
//!   deploymentRef:
//!     from:
//!       name: orders-deployment
//!   variables:
//!     lambdaAlias: live
//! ```

mod api_key;
mod authorizer;
mod integration;
mod method;
mod object;
mod reference;
mod resource;
mod rest_api;
mod stage;
mod status;
mod view;

pub use api_key::{ApiKey, ApiKeySpec, StageKey, VpcLink, VpcLinkSpec};
pub use authorizer::{Authorizer, AuthorizerSpec};
pub use integration::{
    Integration, IntegrationResponse, IntegrationResponseSpec, IntegrationSpec, TlsConfig,
};
pub use method::{Method, MethodResponse, MethodResponseSpec, MethodSpec};
pub use object::{GatewayObject, KindSpec, ManagedObject, ObjectKey, ObjectRef};
pub use reference::{ReferenceTarget, ResourceReference};
pub use resource::{GatewayResource, GatewayResourceSpec};
pub use rest_api::{EndpointConfiguration, RestAPI, RestApiSpec};
pub use stage::{
    CanarySettings, DeploymentCanarySettings, GatewayDeployment, GatewayDeploymentSpec, Stage,
    StageSpec,
};
pub use status::{Condition, ResourceStatus};
pub use view::{SpecError, SpecFields, SpecView};
