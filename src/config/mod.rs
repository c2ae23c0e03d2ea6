/// Configuration management for tufin
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "tufin.yaml";

/// Kubeconfig written by the k3s installer
pub const K3S_KUBECONFIG: &str = "/etc/rancher/k3s/k3s.yaml";

/// Tool settings. Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Kubeconfig to use instead of the k3s default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Cluster runtime installer
    pub installer: InstallerConfig,

    /// What the deploy sequence does with steps whose prerequisite failed
    pub on_failure: FailurePolicy,
}

/// Remote installer invoked by `tufin cluster`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Installer script URL, piped into `sh -`
    pub url: String,

    /// Shell used to run the download pipeline
    pub shell: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            url: "https://get.k3s.io".to_string(),
            shell: "bash".to_string(),
        }
    }
}

/// Handling of apply steps after a failed prerequisite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Submit every step no matter what failed before it
    #[default]
    Continue,
    /// Skip every step that depends on a failed step
    SkipDependents,
}

/// How to reach the cluster API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeAccess {
    /// Explicit kubeconfig file; `None` falls back to client-side inference
    pub kubeconfig: Option<PathBuf>,
}

/// Pick the kubeconfig path when nothing was configured explicitly.
///
/// A user with a home directory gets the k3s system kubeconfig. Without one
/// there is no path and the client infers its configuration (`KUBECONFIG`,
/// `~/.kube/config`, then in-cluster service account).
pub fn kubeconfig_path_policy(home: Option<&Path>) -> Option<PathBuf> {
    home.map(|_| PathBuf::from(K3S_KUBECONFIG))
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path` if it exists, defaults otherwise
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            debug!("Loading settings from {}", path.display());
            Self::from_file(path)
        } else {
            debug!("No settings file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.installer.url)
            .map_err(|e| anyhow::anyhow!("Invalid installer url {}: {}", self.installer.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("installer url must be http or https: {}", self.installer.url);
        }

        if self.installer.shell.trim().is_empty() {
            anyhow::bail!("installer shell cannot be empty");
        }

        Ok(())
    }

    /// Resolve cluster access: command-line flag, then settings, then the
    /// home-directory policy
    pub fn kube_access(&self, flag: Option<&Path>, home: Option<&Path>) -> KubeAccess {
        let kubeconfig = flag
            .map(Path::to_path_buf)
            .or_else(|| self.kubeconfig.clone())
            .or_else(|| kubeconfig_path_policy(home));
        KubeAccess { kubeconfig }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_policy_with_home_uses_k3s_path() {
        let home = PathBuf::from("/home/someone");
        assert_eq!(
            kubeconfig_path_policy(Some(&home)),
            Some(PathBuf::from("/etc/rancher/k3s/k3s.yaml"))
        );
    }

    #[test]
    fn test_policy_without_home_infers() {
        assert_eq!(kubeconfig_path_policy(None), None);
    }

    #[test]
    fn test_kube_access_precedence() {
        let home = PathBuf::from("/root");
        let mut settings = Settings::default();

        let access = settings.kube_access(None, Some(&home));
        assert_eq!(access.kubeconfig, Some(PathBuf::from(K3S_KUBECONFIG)));

        settings.kubeconfig = Some(PathBuf::from("/tmp/from-settings"));
        let access = settings.kube_access(None, Some(&home));
        assert_eq!(access.kubeconfig, Some(PathBuf::from("/tmp/from-settings")));

        let flag = PathBuf::from("/tmp/from-flag");
        let access = settings.kube_access(Some(&flag), None);
        assert_eq!(access.kubeconfig, Some(flag));
    }

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.installer.url, "https://get.k3s.io");
        assert_eq!(settings.on_failure, FailurePolicy::Continue);
    }

    #[test]
    fn test_invalid_installer() {
        let mut settings = Settings::default();
        settings.installer.url = "not a url".to_string();
        assert!(settings.validate().is_err());

        settings.installer.url = "ftp://get.k3s.io".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.installer.shell = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "on_failure: skip-dependents").unwrap();
        writeln!(file, "kubeconfig: /srv/kube.yaml").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.on_failure, FailurePolicy::SkipDependents);
        assert_eq!(settings.kubeconfig, Some(PathBuf::from("/srv/kube.yaml")));
        assert_eq!(settings.installer, InstallerConfig::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
