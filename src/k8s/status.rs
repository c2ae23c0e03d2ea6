/// Pod status report for the default namespace
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use std::io::Write;
use tracing::error;

use super::client::WorkloadApi;

/// Lifecycle phase as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodPhase::Pending => write!(f, "Pending"),
            PodPhase::Running => write!(f, "Running"),
            PodPhase::Succeeded => write!(f, "Succeeded"),
            PodPhase::Failed => write!(f, "Failed"),
            PodPhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// How rows are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// `<name> <phase>` per line
    #[default]
    Text,
    /// `<name> <phase> <age>` per line
    Wide,
    /// JSON array of rows
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct PodStatusRow {
    pub name: String,
    pub phase: PodPhase,
    pub created: Option<DateTime<Utc>>,
}

impl PodStatusRow {
    pub fn from_pod(pod: &Pod) -> Self {
        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::from)
            .unwrap_or_default();

        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase,
            created: pod.metadata.creation_timestamp.as_ref().map(|t| t.0),
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> String {
        self.created
            .map_or_else(|| "Unknown".to_string(), |created| format_age(now, created))
    }
}

/// Format age as human-readable string
fn format_age(now: DateTime<Utc>, creation: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(creation);

    if duration.num_days() > 0 {
        format!("{}d", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        format!("{}s", duration.num_seconds().max(0))
    }
}

/// List pods and print one row per pod. A listing failure is logged and
/// yields no rows. Returns the number of rows printed.
pub async fn report<A, W>(api: &A, format: OutputFormat, out: &mut W) -> anyhow::Result<usize>
where
    A: WorkloadApi,
    W: Write,
{
    let pods = match api.list_pods().await {
        Ok(pods) => pods,
        Err(e) => {
            error!("{}", e);
            return Ok(0);
        }
    };

    let rows: Vec<PodStatusRow> = pods.iter().map(PodStatusRow::from_pod).collect();
    let now = Utc::now();

    match format {
        OutputFormat::Text => {
            for row in &rows {
                writeln!(out, "{} {}", row.name, row.phase)?;
            }
        }
        OutputFormat::Wide => {
            for row in &rows {
                writeln!(out, "{} {} {}", row.name, row.phase, row.age(now))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &rows)?;
            writeln!(out)?;
        }
    }

    Ok(rows.len())
}
