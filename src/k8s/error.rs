/// Errors from the cluster API seam
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("failed to load kubeconfig {}: {source}", .path.display())]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("failed to infer Kubernetes configuration: {0}")]
    Infer(#[source] kube::config::InferConfigError),

    #[error("failed to create Kubernetes client: {0}")]
    Connect(#[source] kube::Error),

    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("failed to create {kind} \"{name}\": {message}")]
    Create {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("failed to list pods in namespace {namespace}: {message}")]
    List { namespace: String, message: String },
}

impl ClusterError {
    /// Classify a failed create call; HTTP 409 means the object is already there
    pub fn from_create(kind: &'static str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 409 => ClusterError::AlreadyExists {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(resp) => ClusterError::Create {
                kind,
                name: name.to_string(),
                message: resp.message,
            },
            other => ClusterError::Create {
                kind,
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_conflict_is_already_exists() {
        let err = ClusterError::from_create(
            "pod",
            "sql",
            api_error(409, "AlreadyExists", "pods \"sql\" already exists"),
        );
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "pod \"sql\" already exists");
    }

    #[test]
    fn test_other_api_errors_keep_message() {
        let err = ClusterError::from_create(
            "service",
            "wordpress",
            api_error(403, "Forbidden", "services is forbidden"),
        );
        assert!(!err.is_already_exists());
        assert!(err.to_string().contains("services is forbidden"));
        assert!(err.to_string().contains("wordpress"));
    }
}
