//! # crdgen
//!
//! Prints the CustomResourceDefinitions for every managed kind as a
//! multi-document YAML stream.
//!
//! ```bash
//! crdgen | kubectl apply -f -
//! crdgen --kind Stage --kind RestAPI
//! ```

use anyhow::{Context, Result};
use apigateway_controller::crd::{
    ApiKey, Authorizer, GatewayDeployment, GatewayResource, Integration, IntegrationResponse,
    Method, MethodResponse, RestAPI, Stage, VpcLink,
};
use apigateway_controller::descriptor::Kind;
use clap::Parser;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Print API Gateway controller CRDs as YAML")]
struct Cli {
    /// Only print these kinds (manifest kind names, repeatable)
    #[arg(long = "kind", value_name = "KIND")]
    kinds: Vec<Kind>,
}

fn crd_for(kind: Kind) -> CustomResourceDefinition {
    match kind {
        Kind::RestApi => RestAPI::crd(),
        Kind::Resource => GatewayResource::crd(),
        Kind::Method => Method::crd(),
        Kind::MethodResponse => MethodResponse::crd(),
        Kind::Integration => Integration::crd(),
        Kind::IntegrationResponse => IntegrationResponse::crd(),
        Kind::Deployment => GatewayDeployment::crd(),
        Kind::Stage => Stage::crd(),
        Kind::Authorizer => Authorizer::crd(),
        Kind::ApiKey => ApiKey::crd(),
        Kind::VpcLink => VpcLink::crd(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let kinds = if cli.kinds.is_empty() {
        Kind::ALL.to_vec()
    } else {
        cli.kinds
    };

    for kind in kinds {
        let yaml = serde_yaml::to_string(&crd_for(kind))
            .with_context(|| format!("Failed to serialize CRD for {kind}"))?;
        println!("---");
        print!("{yaml}");
    }
    Ok(())
}
