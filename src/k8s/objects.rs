/// Builders for the WordPress + MySQL workload objects
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, Pod, PodSpec, Service, ServicePort, ServiceSpec, Volume,
    VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Namespace every object is created in
pub const NAMESPACE: &str = "default";

pub const WORDPRESS: &str = "wordpress";
pub const SQL: &str = "sql";
pub const SQL_CLAIM: &str = "sql-pv-claim";
pub const SQL_VOLUME: &str = "sqlvol";
pub const SQL_DATA_DIR: &str = "/var/lib/mysql";
pub const CLAIM_SIZE: &str = "20Gi";

/// How a service is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// Only inside the cluster (`ClusterIP`)
    Internal,
    /// Also from outside through a node port (`NodePort`)
    External,
}

impl Exposure {
    pub fn service_type(self) -> &'static str {
        match self {
            Exposure::Internal => "ClusterIP",
            Exposure::External => "NodePort",
        }
    }
}

/// One object of the deployment, tagged with its kind
#[derive(Debug, Clone)]
pub enum WorkloadObject {
    Claim(PersistentVolumeClaim),
    Pod(Pod),
    Service(Service),
}

impl WorkloadObject {
    /// Lowercase kind, as kubectl prints it
    pub fn kind(&self) -> &'static str {
        match self {
            WorkloadObject::Claim(_) => "persistentvolumeclaim",
            WorkloadObject::Pod(_) => "pod",
            WorkloadObject::Service(_) => "service",
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            WorkloadObject::Claim(claim) => &claim.metadata,
            WorkloadObject::Pod(pod) => &pod.metadata,
            WorkloadObject::Service(svc) => &svc.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }
}

fn app_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}

fn metadata(name: &str, app: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        labels: Some(app_labels(app)),
        ..Default::default()
    }
}

fn env(pairs: &[(&str, &str)]) -> Vec<EnvVar> {
    pairs
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        })
        .collect()
}

fn container_port(port: i32) -> Vec<ContainerPort> {
    vec![ContainerPort {
        container_port: port,
        ..Default::default()
    }]
}

/// WordPress front end, pointed at the `sql` service
pub fn wordpress_pod() -> Pod {
    Pod {
        metadata: metadata(WORDPRESS, WORDPRESS),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: WORDPRESS.to_string(),
                image: Some("wordpress".to_string()),
                ports: Some(container_port(8080)),
                env: Some(env(&[
                    ("WORDPRESS_DB_HOST", SQL),
                    ("WORDPRESS_DB_USER", "wordpress"),
                    ("WORDPRESS_DB_PASSWORD", "wordpress"),
                    ("WORDPRESS_DB_NAME", "wordpress"),
                ])),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// MySQL database with its data directory on the `sql-pv-claim` volume
pub fn sql_pod() -> Pod {
    Pod {
        metadata: metadata(SQL, SQL),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: SQL.to_string(),
                image: Some("mysql:5.7".to_string()),
                ports: Some(container_port(3306)),
                env: Some(env(&[
                    ("MYSQL_ROOT_PASSWORD", "somewordpress"),
                    ("MYSQL_DATABASE", "wordpress"),
                    ("MYSQL_USER", "wordpress"),
                    ("MYSQL_PASSWORD", "wordpress"),
                ])),
                volume_mounts: Some(vec![VolumeMount {
                    name: SQL_VOLUME.to_string(),
                    mount_path: SQL_DATA_DIR.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: SQL_VOLUME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: SQL_CLAIM.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Single-writer 20Gi claim backing the database
pub fn sql_claim() -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: metadata(SQL_CLAIM, SQL),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(CLAIM_SIZE.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Service named `name` selecting pods labelled `app=<name>`
pub fn service(name: &str, port: i32, exposure: Exposure) -> Service {
    Service {
        metadata: metadata(name, name),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            selector: Some(app_labels(name)),
            type_: Some(exposure.service_type().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn sql_service() -> Service {
    service(SQL, 3306, Exposure::Internal)
}

pub fn wordpress_service() -> Service {
    service(WORDPRESS, 80, Exposure::External)
}
