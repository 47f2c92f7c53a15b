//! Code to parse the command line using `clap`, and definitions of the parsed
//! result. Arguments may also come from parameter files: an argument `@path`
//! is replaced by the lines of the file at `path`.

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use crate::artifact::ArtifactSpec;

/// Returns the parsed command line, after expanding any `@file` arguments.
/// Usage errors print a message and exit the way `clap` always does.
pub fn parsed() -> Result<Args> {
    parsed_from(std::env::args_os())
}

/// Like `parsed`, but takes the arguments (program name first) from `args`
pub fn parsed_from(args: impl IntoIterator<Item = OsString>) -> Result<Args> {
    let args = expand_param_files(args)?;
    Ok(CliArgs::parse_from(args).into())
}

/// The parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Where to write the violation report
    pub output: PathBuf,
    /// The JSON allowlist of class files that may be duplicated
    pub allowlist: PathBuf,
    /// The archives to check, in the order to check them
    pub inputs: Vec<ArtifactSpec>,
    /// Report violations, but exit successfully anyway
    pub succeed_on_found_violations: bool,
}

impl From<CliArgs> for Args {
    fn from(cli: CliArgs) -> Self {
        Args {
            output: cli.output,
            allowlist: cli.whitelist,
            inputs: cli.inputs,
            succeed_on_found_violations: cli.succeed_on_found_violations,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "oneversion", version)]
/// Checks that no class file is provided by more than one jar
struct CliArgs {
    #[arg(long, value_name = "PATH")]
    /// The output file
    output: PathBuf,

    #[arg(long = "succeed_on_found_violations")]
    /// Whether to succeed if any violations are found
    succeed_on_found_violations: bool,

    #[arg(long, visible_alias = "allowlist", value_name = "PATH")]
    /// Path to the allowlist file
    whitelist: PathBuf,

    #[arg(long, required = true, num_args = 1.., value_name = "PATH,LABEL")]
    /// List of inputs
    inputs: Vec<ArtifactSpec>,
}

/// The first byte of an argument naming a parameter file
const PARAM_FILE_PREFIX: &str = "@";

/// Replace each `@path` argument (after the program name) with the lines of
/// the file at `path`, one argument per line. A blank line is an empty
/// argument, and parameter files may themselves contain `@path` arguments.
pub fn expand_param_files(args: impl IntoIterator<Item = OsString>) -> Result<Vec<OsString>> {
    let mut args = args.into_iter();
    let mut expanded: Vec<OsString> = args.next().into_iter().collect();
    for arg in args {
        expand_into(arg, &mut expanded, 0)?;
    }
    Ok(expanded)
}

// Guards against a parameter file that includes itself
const MAX_PARAM_FILE_DEPTH: usize = 32;

fn expand_into(arg: OsString, expanded: &mut Vec<OsString>, depth: usize) -> Result<()> {
    let Some(path) = arg.to_str().and_then(|s| s.strip_prefix(PARAM_FILE_PREFIX)) else {
        expanded.push(arg);
        return Ok(());
    };
    anyhow::ensure!(
        depth < MAX_PARAM_FILE_DEPTH,
        "Parameter files nested too deeply at: {path}"
    );
    let contents =
        fs::read_to_string(path).with_context(|| format!("Can't read parameter file: {path}"))?;
    tracing::debug!(path, "expanding parameter file");
    for line in contents.lines() {
        expand_into(OsString::from(line), expanded, depth + 1)?;
    }
    Ok(())
}
