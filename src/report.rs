//! Writes violations to the output artifact and to standard error
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::ownership::Violation;

/// Create (or truncate) the file at `output` and write each violation to it,
/// one per line. Each line is also written to standard error. The file is
/// created even when `violations` is empty: an empty report means the check
/// passed.
pub fn write_report(output: &Path, violations: &[Violation]) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Can't create output file: {}", output.display()))?;
    write_to(BufWriter::new(file), io::stderr().lock(), violations)
        .with_context(|| format!("Error writing output file: {}", output.display()))
}

/// Write `violations` to both `out` and `diagnostics`
pub fn write_to(
    mut out: impl Write,
    mut diagnostics: impl Write,
    violations: &[Violation],
) -> Result<()> {
    for violation in violations {
        writeln!(diagnostics, "{violation}")?;
        writeln!(out, "{violation}")?;
    }
    diagnostics.flush()?;
    out.flush()?;
    Ok(())
}
