/// Kubernetes workload objects and cluster operations
pub mod apply;
pub mod client;
pub mod error;
pub mod manifest;
pub mod objects;
pub mod status;

pub use client::KubernetesClient;
