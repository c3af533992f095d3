use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Prd,
    Contract,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prd => "prd",
            Self::Contract => "contract",
        }
    }
}

/// A file produced by a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: String,
    /// Set when the file was written without content (degraded model output).
    pub empty: bool,
}

impl Artifact {
    pub fn prd(path: impl Into<String>, empty: bool) -> Self {
        Self { kind: ArtifactKind::Prd, path: path.into(), empty }
    }

    pub fn contract(path: impl Into<String>) -> Self {
        Self { kind: ArtifactKind::Contract, path: path.into(), empty: false }
    }
}
