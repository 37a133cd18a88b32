use anyhow::Result;

use crate::{ClassScores, Device, ModelArtifact, ModelSpec, NormalizedTensor};

pub trait Backend: Send + Sync + 'static {
    type Model: ClassifierModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
}

/// A loaded image classifier.
pub trait ClassifierModel: Send + 'static {
    fn spec(&self) -> &ModelSpec;

    /// Scores one normalized image. The result holds one value per class.
    fn predict(&mut self, input: &NormalizedTensor) -> Result<ClassScores>;
}

impl<M: ClassifierModel + ?Sized> ClassifierModel for Box<M> {
    fn spec(&self) -> &ModelSpec {
        (**self).spec()
    }

    fn predict(&mut self, input: &NormalizedTensor) -> Result<ClassScores> {
        (**self).predict(input)
    }
}
