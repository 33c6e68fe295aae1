//! # Managed Objects
//!
//! The kind-erased view of a custom resource the reconciliation core works
//! with. Typed kube objects convert into [`ManagedObject`] through
//! [`GatewayObject`]; the in-memory store holds them directly.

use crate::constants::FINALIZER;
use crate::crd::{
    ApiKey, ApiKeySpec, Authorizer, AuthorizerSpec, GatewayDeployment, GatewayDeploymentSpec,
    GatewayResource, GatewayResourceSpec, Integration, IntegrationResponse,
    IntegrationResponseSpec, IntegrationSpec, Method, MethodResponse, MethodResponseSpec,
    MethodSpec, ResourceStatus, RestAPI, RestApiSpec, SpecError, SpecFields, SpecView, Stage,
    StageSpec, VpcLink, VpcLinkSpec,
};
use crate::descriptor::Kind;
use kube::core::NamespaceResourceScope;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Namespace + name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of a custom resource across kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub kind: Kind,
    pub key: ObjectKey,
}

impl ObjectRef {
    pub fn new(kind: Kind, namespace: &str, name: &str) -> Self {
        Self {
            kind,
            key: ObjectKey::new(namespace, name),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Typed spec of any managed kind
#[derive(Debug, Clone, PartialEq)]
pub enum KindSpec {
    RestApi(RestApiSpec),
    Resource(GatewayResourceSpec),
    Method(MethodSpec),
    MethodResponse(MethodResponseSpec),
    Integration(IntegrationSpec),
    IntegrationResponse(IntegrationResponseSpec),
    Deployment(GatewayDeploymentSpec),
    Stage(StageSpec),
    Authorizer(AuthorizerSpec),
    ApiKey(ApiKeySpec),
    VpcLink(VpcLinkSpec),
}

macro_rules! dispatch {
    ($value:expr, $spec:ident => $body:expr) => {
        match $value {
            KindSpec::RestApi($spec) => $body,
            KindSpec::Resource($spec) => $body,
            KindSpec::Method($spec) => $body,
            KindSpec::MethodResponse($spec) => $body,
            KindSpec::Integration($spec) => $body,
            KindSpec::IntegrationResponse($spec) => $body,
            KindSpec::Deployment($spec) => $body,
            KindSpec::Stage($spec) => $body,
            KindSpec::Authorizer($spec) => $body,
            KindSpec::ApiKey($spec) => $body,
            KindSpec::VpcLink($spec) => $body,
        }
    };
}

fn kind_of<S: SpecFields>(_spec: &S) -> Kind {
    S::KIND
}

impl KindSpec {
    pub fn kind(&self) -> Kind {
        dispatch!(self, spec => kind_of(spec))
    }

    pub fn view(&self) -> Result<SpecView, SpecError> {
        dispatch!(self, spec => spec.view())
    }
}

/// A custom resource as seen by the reconciliation core
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub kind: Kind,
    pub key: ObjectKey,
    /// `metadata.generation`, bumped by the API server on every spec change
    pub generation: i64,
    pub spec: KindSpec,
    pub status: ResourceStatus,
    /// `metadata.deletionTimestamp` is set
    pub deletion_requested: bool,
    pub has_finalizer: bool,
}

impl ManagedObject {
    pub fn new(key: ObjectKey, spec: KindSpec) -> Self {
        Self {
            kind: spec.kind(),
            key,
            generation: 1,
            spec,
            status: ResourceStatus::default(),
            deletion_requested: false,
            has_finalizer: false,
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind,
            key: self.key.clone(),
        }
    }
}

/// A typed kube custom resource managed by this controller
pub trait GatewayObject:
    kube::Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: Kind;

    fn kind_spec(&self) -> KindSpec;

    fn resource_status(&self) -> Option<&ResourceStatus>;

    fn to_managed(&self) -> ManagedObject {
        ManagedObject {
            kind: Self::KIND,
            key: ObjectKey {
                namespace: self.namespace().unwrap_or_else(|| "default".to_string()),
                name: self.name_any(),
            },
            generation: self.meta().generation.unwrap_or(1),
            spec: self.kind_spec(),
            status: self.resource_status().cloned().unwrap_or_default(),
            deletion_requested: self.meta().deletion_timestamp.is_some(),
            has_finalizer: self.finalizers().iter().any(|f| f == FINALIZER),
        }
    }
}

macro_rules! gateway_object {
    ($ty:ty, $variant:ident) => {
        impl GatewayObject for $ty {
            const KIND: Kind = Kind::$variant;

            fn kind_spec(&self) -> KindSpec {
                KindSpec::$variant(self.spec.clone())
            }

            fn resource_status(&self) -> Option<&ResourceStatus> {
                self.status.as_ref()
            }
        }
    };
}

gateway_object!(RestAPI, RestApi);
gateway_object!(GatewayResource, Resource);
gateway_object!(Method, Method);
gateway_object!(MethodResponse, MethodResponse);
gateway_object!(Integration, Integration);
gateway_object!(IntegrationResponse, IntegrationResponse);
gateway_object!(GatewayDeployment, Deployment);
gateway_object!(Stage, Stage);
gateway_object!(Authorizer, Authorizer);
gateway_object!(ApiKey, ApiKey);
gateway_object!(VpcLink, VpcLink);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_object_converts_to_managed() {
        let mut api = RestAPI::new(
            "orders",
            RestApiSpec {
                name: "orders".into(),
                ..Default::default()
            },
        );
        api.metadata.namespace = Some("payments".into());
        api.metadata.generation = Some(3);
        api.metadata.finalizers = Some(vec![FINALIZER.to_string()]);

        let managed = api.to_managed();
        assert_eq!(managed.kind, Kind::RestApi);
        assert_eq!(managed.key, ObjectKey::new("payments", "orders"));
        assert_eq!(managed.generation, 3);
        assert!(managed.has_finalizer);
        assert!(!managed.deletion_requested);
        assert_eq!(managed.spec.kind(), Kind::RestApi);
    }

    #[test]
    fn test_object_ref_display() {
        let reference = ObjectRef::new(Kind::Stage, "default", "prod");
        assert_eq!(reference.to_string(), "Stage default/prod");
    }
}
