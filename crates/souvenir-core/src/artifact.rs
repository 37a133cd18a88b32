use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub enum ModelArtifact {
    OnnxPath(PathBuf),
}

impl ModelArtifact {
    pub fn path(&self) -> &Path {
        match self {
            ModelArtifact::OnnxPath(path) => path,
        }
    }
}
