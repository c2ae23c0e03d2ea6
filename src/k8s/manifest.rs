/// Static manifest rendering of the deployment
use super::apply::Step;
use super::objects::WorkloadObject;

impl WorkloadObject {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        match self {
            WorkloadObject::Claim(claim) => serde_yaml::to_string(claim),
            WorkloadObject::Pod(pod) => serde_yaml::to_string(pod),
            WorkloadObject::Service(svc) => serde_yaml::to_string(svc),
        }
    }
}

/// Render the plan as a multi-document YAML stream, one document per object,
/// in submission order. Applying it with `kubectl apply -f` creates the same
/// objects as `tufin deploy`.
pub fn render_manifest(plan: &[Step]) -> Result<String, serde_yaml::Error> {
    let documents = plan
        .iter()
        .map(|step| step.object.to_yaml())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(documents
        .iter()
        .map(|doc| format!("---\n{}", doc))
        .collect())
}
