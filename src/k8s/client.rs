/// Kubernetes API client
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Service};
use kube::api::{Api, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use super::error::ClusterError;
use super::objects::{WorkloadObject, NAMESPACE};
use crate::config::KubeAccess;

/// The cluster operations the deploy and status flows need
#[allow(async_fn_in_trait)]
pub trait WorkloadApi {
    /// Create `object` in the default namespace; fails if it already exists
    async fn create(&self, object: &WorkloadObject) -> Result<(), ClusterError>;

    /// List every pod in the default namespace
    async fn list_pods(&self) -> Result<Vec<Pod>, ClusterError>;
}

/// Client bound to one cluster, built once per invocation
pub struct KubernetesClient {
    client: Client,
}

impl KubernetesClient {
    /// Build a client from an explicit kubeconfig or, failing that, from the
    /// environment
    pub async fn connect(access: &KubeAccess) -> Result<Self, ClusterError> {
        let config = match &access.kubeconfig {
            Some(path) => {
                info!("Using kubeconfig {}", path.display());
                let kubeconfig =
                    Kubeconfig::read_from(path).map_err(|source| ClusterError::Kubeconfig {
                        path: path.clone(),
                        source,
                    })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|source| ClusterError::Kubeconfig {
                        path: path.clone(),
                        source,
                    })?
            }
            None => {
                info!("Inferring Kubernetes configuration from the environment");
                Config::infer().await.map_err(ClusterError::Infer)?
            }
        };

        debug!("Cluster API endpoint: {}", config.cluster_url);
        let client = Client::try_from(config).map_err(ClusterError::Connect)?;

        Ok(Self { client })
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), NAMESPACE)
    }

    fn claims(&self) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), NAMESPACE)
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), NAMESPACE)
    }
}

impl WorkloadApi for KubernetesClient {
    async fn create(&self, object: &WorkloadObject) -> Result<(), ClusterError> {
        let params = PostParams::default();
        let result = match object {
            WorkloadObject::Claim(claim) => self.claims().create(&params, claim).await.map(|_| ()),
            WorkloadObject::Pod(pod) => self.pods().create(&params, pod).await.map(|_| ()),
            WorkloadObject::Service(svc) => self.services().create(&params, svc).await.map(|_| ()),
        };

        result.map_err(|e| ClusterError::from_create(object.kind(), object.name(), e))
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, ClusterError> {
        let pods = self
            .pods()
            .list(&ListParams::default())
            .await
            .map_err(|e| ClusterError::List {
                namespace: NAMESPACE.to_string(),
                message: e.to_string(),
            })?;

        Ok(pods.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::objects::sql_claim;
    use std::io::Write;
    use std::path::PathBuf;

    /// Kubeconfig pointing at a local port nothing listens on
    fn unreachable_kubeconfig() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"apiVersion: v1
kind: Config
clusters:
- name: local
  cluster:
    server: http://127.0.0.1:1
contexts:
- name: local
  context:
    cluster: local
    user: local
current-context: local
users:
- name: local
  user:
    token: test-token
"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_missing_kubeconfig_is_config_error() {
        let access = KubeAccess {
            kubeconfig: Some(PathBuf::from("/nonexistent/tufin/kubeconfig.yaml")),
        };

        let result = tokio_test::block_on(KubernetesClient::connect(&access));

        match result {
            Err(ClusterError::Kubeconfig { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/tufin/kubeconfig.yaml"))
            }
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("connect should fail without a kubeconfig"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_cluster_reports_per_call_errors() {
        let file = unreachable_kubeconfig();
        let access = KubeAccess {
            kubeconfig: Some(file.path().to_path_buf()),
        };
        let client = KubernetesClient::connect(&access).await.unwrap();

        let err = client.list_pods().await.unwrap_err();
        assert!(matches!(err, ClusterError::List { .. }));

        let err = client
            .create(&WorkloadObject::Claim(sql_claim()))
            .await
            .unwrap_err();
        assert!(!err.is_already_exists());
        assert!(err.to_string().contains("sql-pv-claim"));
    }
}
