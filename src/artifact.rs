//! Parses the `path,label` strings given to `--inputs`
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// An `ArtifactSpec` names a jar to check (`path`) and the build target that
/// produced it (`label`). The label is only used in messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Where the archive lives on disk
    pub path: PathBuf,
    /// The human-readable name of the archive's producer, e.g. `//java/com/example:lib`
    pub label: String,
}

/// Why a `path,label` string couldn't be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// There was no comma, so no label
    MissingLabel(String),
    /// Nothing before the comma
    EmptyPath(String),
    /// Nothing after the comma
    EmptyLabel(String),
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::MissingLabel(s) => {
                write!(f, "expected `path,label` but found no comma in '{s}'")
            }
            SpecError::EmptyPath(s) => write!(f, "the path part of '{s}' is empty"),
            SpecError::EmptyLabel(s) => write!(f, "the label part of '{s}' is empty"),
        }
    }
}

impl std::error::Error for SpecError {}

impl FromStr for ArtifactSpec {
    type Err = SpecError;

    /// Splits `s` at its first comma. Anything after that comma, further
    /// commas included, is the label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((path, label)) = s.split_once(',') else {
            return Err(SpecError::MissingLabel(s.to_owned()));
        };
        if path.is_empty() {
            return Err(SpecError::EmptyPath(s.to_owned()));
        }
        if label.is_empty() {
            return Err(SpecError::EmptyLabel(s.to_owned()));
        }
        Ok(ArtifactSpec { path: PathBuf::from(path), label: label.to_owned() })
    }
}
