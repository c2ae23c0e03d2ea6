/// Ordered submission of the deployment objects
use std::io::Write;
use tracing::{info, warn};

use super::client::WorkloadApi;
use super::error::ClusterError;
use super::objects::{
    sql_claim, sql_pod, sql_service, wordpress_pod, wordpress_service, WorkloadObject,
};
use crate::config::FailurePolicy;

const CLAIM: usize = 0;
const WORDPRESS_POD: usize = 1;
const SQL_POD: usize = 2;

/// One submission, with the indices of the steps it needs
#[derive(Debug, Clone)]
pub struct Step {
    pub object: WorkloadObject,
    pub after: Vec<usize>,
}

impl Step {
    fn new(object: WorkloadObject, after: &[usize]) -> Self {
        Self {
            object,
            after: after.to_vec(),
        }
    }
}

/// The deployment in submission order.
///
/// Edges: claim -> sql pod -> sql service, wordpress pod -> wordpress service.
/// Prerequisites always point to earlier steps.
pub fn deployment_plan() -> Vec<Step> {
    vec![
        Step::new(WorkloadObject::Claim(sql_claim()), &[]),
        Step::new(WorkloadObject::Pod(wordpress_pod()), &[]),
        Step::new(WorkloadObject::Pod(sql_pod()), &[CLAIM]),
        Step::new(WorkloadObject::Service(sql_service()), &[SQL_POD]),
        Step::new(WorkloadObject::Service(wordpress_service()), &[WORDPRESS_POD]),
    ]
}

#[derive(Debug)]
pub enum StepOutcome {
    Created,
    Failed(ClusterError),
    /// Not submitted because the named prerequisite failed
    Skipped { blocked_by: String },
}

impl StepOutcome {
    /// Whether dependents may go ahead. An object that already exists is
    /// as good as one we just created.
    fn satisfied(&self) -> bool {
        match self {
            StepOutcome::Created => true,
            StepOutcome::Failed(err) => err.is_already_exists(),
            StepOutcome::Skipped { .. } => false,
        }
    }
}

#[derive(Debug)]
pub struct StepReport {
    pub kind: &'static str,
    pub name: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub steps: Vec<StepReport>,
}

impl ApplyReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Created))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Submit `plan` in order. A failed step is reported on `out` and never stops
/// the steps after it; under [`FailurePolicy::SkipDependents`] the steps that
/// need it are skipped instead of submitted.
pub async fn apply<A, W>(
    api: &A,
    plan: Vec<Step>,
    policy: FailurePolicy,
    out: &mut W,
) -> std::io::Result<ApplyReport>
where
    A: WorkloadApi,
    W: Write,
{
    let mut report = ApplyReport::default();

    for step in plan {
        let kind = step.object.kind();
        let name = step.object.name().to_string();

        let blocked_by = match policy {
            FailurePolicy::Continue => None,
            FailurePolicy::SkipDependents => step
                .after
                .iter()
                .filter_map(|&i| report.steps.get(i))
                .find(|prereq| !prereq.outcome.satisfied())
                .map(|prereq| format!("{} \"{}\"", prereq.kind, prereq.name)),
        };

        let outcome = if let Some(blocked_by) = blocked_by {
            writeln!(out, "Skipped {} \"{}\": {} was not created", kind, name, blocked_by)?;
            StepOutcome::Skipped { blocked_by }
        } else {
            info!("Creating {} \"{}\"", kind, name);
            match api.create(&step.object).await {
                Ok(()) => {
                    writeln!(out, "Created {} \"{}\".", kind, name)?;
                    StepOutcome::Created
                }
                Err(e) => {
                    writeln!(out, "{}", e)?;
                    StepOutcome::Failed(e)
                }
            }
        };

        report.steps.push(StepReport {
            kind,
            name,
            outcome,
        });
    }

    if report.failed() > 0 || report.skipped() > 0 {
        warn!(
            "Deployment finished with {} created, {} failed, {} skipped",
            report.created(),
            report.failed(),
            report.skipped()
        );
    } else {
        info!("✓ Deployed {} objects", report.created());
    }

    Ok(report)
}
