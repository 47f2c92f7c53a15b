//! The `run` function is the kernel of the application: it checks that no
//! class file is provided by more than one of a list of jars. The `args`
//! module parses the command line, the `archive` module lists the class files
//! in each jar, and the `ownership` module does the bookkeeping.
//!
//! Current Limitations:
//! * Only entry names are compared. Two jars providing byte-identical copies
//!   of a class are still reported.

#![cfg_attr(debug_assertions, allow(dead_code, unused_imports))]
#![deny(unused_must_use)]
#![deny(clippy::all)]
#![allow(clippy::needless_return)]
#![deny(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]

use anyhow::Result;
use std::path::Path;

pub mod allowlist;
pub mod archive;
pub mod args;
pub mod artifact;
pub mod ownership;
pub mod report;

use crate::allowlist::Allowlist;
use crate::archive::Listings;
use crate::artifact::ArtifactSpec;
use crate::ownership::find_duplicates;
use crate::report::write_report;

/// The outcome of a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// No violations, or violations that we were told to ignore
    Success,
    /// At least one class file was provided by more than one jar
    ViolationsFound,
}

impl ExitStatus {
    /// The process exit code for this status
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::ViolationsFound => 1,
        }
    }
}

/// Checks the archives named by `inputs`, in order, for class files provided
/// by more than one archive, ignoring the names listed in the JSON file at
/// `allowlist`. Each violation is written as a line to the file at `output`
/// (which is always created, even if there are no violations) and to standard
/// error.
///
/// An `Err` return means the check itself failed: the allowlist or an archive
/// couldn't be read, or the output couldn't be written. The allowlist is read
/// before any archive is opened, and nothing is written to `output` unless
/// every archive was read successfully.
pub fn run(
    allowlist: &Path,
    output: &Path,
    inputs: &[ArtifactSpec],
    succeed_on_found_violations: bool,
) -> Result<ExitStatus> {
    let allowlist = Allowlist::from_path(allowlist)?;
    tracing::debug!(names = allowlist.len(), "loaded allowlist");

    let violations = find_duplicates(&allowlist, Listings::from(inputs))?;
    write_report(output, &violations)?;

    if violations.is_empty() || succeed_on_found_violations {
        return Ok(ExitStatus::Success);
    }
    Ok(ExitStatus::ViolationsFound)
}
