use anyhow::{ensure, Context, Result};
use souvenir_core::{Backend, ClassLabelTable, ClassifierModel, Device, ModelArtifact};
use tracing::info;

/// Loads `instances` copies of the model and checks each against the label
/// table. Any failure aborts startup.
pub fn load_classifiers<B: Backend>(
    backend: &B,
    artifact: &ModelArtifact,
    device: Device,
    instances: usize,
    labels: &ClassLabelTable,
) -> Result<Vec<Box<dyn ClassifierModel>>> {
    ensure!(instances > 0, "at least one model instance is required");

    let mut models: Vec<Box<dyn ClassifierModel>> = Vec::with_capacity(instances);
    for instance in 0..instances {
        let model = backend.load(artifact, device.clone()).with_context(|| {
            format!(
                "{} failed to load {}",
                backend.name(),
                artifact.path().display()
            )
        })?;
        model
            .spec()
            .check_classifier_contract(labels.len())
            .context("model does not match the class label table")?;

        info!(
            backend = backend.name(),
            path = %artifact.path().display(),
            %device,
            instance,
            "model loaded"
        );
        models.push(Box::new(model));
    }
    Ok(models)
}
