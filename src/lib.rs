//! # API Gateway Controller
//!
//! Reconciliation engine for API Gateway custom resources. The binary in
//! `main.rs` wires it to Kubernetes and AWS; tests drive it through the
//! in-memory [`store::InMemoryStore`] and [`provider::memory::InMemoryGateway`].

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod descriptor;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod store;
