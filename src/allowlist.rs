//! Loads the allowlist: the class files that may legitimately be provided by
//! more than one jar.
use anyhow::{Context, Result};
use fxhash::FxHashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// The set of entry names exempt from duplicate detection
#[derive(Debug, Default, Clone)]
pub struct Allowlist {
    names: FxHashSet<String>,
}

impl Allowlist {
    /// Read the allowlist from the JSON file at `path`. The file's top-level
    /// value must be an array of strings.
    pub fn from_path(path: &Path) -> Result<Allowlist> {
        let file = File::open(path)
            .with_context(|| format!("Can't open allowlist file: {}", path.display()))?;
        Allowlist::from_reader(BufReader::new(file))
            .with_context(|| format!("Can't parse allowlist file: {}", path.display()))
    }

    /// Read the allowlist from any JSON source
    pub fn from_reader(reader: impl Read) -> Result<Allowlist> {
        let names: Vec<String> = serde_json::from_reader(reader)
            .context("expected a JSON array of class file names")?;
        Ok(names.into_iter().collect())
    }

    /// Is `name` exempt?
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// The number of distinct names
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing is exempt
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for Allowlist {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Allowlist { names: iter.into_iter().collect() }
    }
}
