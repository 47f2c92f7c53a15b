use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit code for a check that couldn't be completed, as opposed to one that
/// found violations. Matches the code `clap` uses for usage errors.
const FAILURE: u8 = 2;

/// Environment variable holding the log filter, e.g. `ONEVERSION_LOG=debug`
const LOG_ENV: &str = "ONEVERSION_LOG";

fn main() -> ExitCode {
    init_logging();

    let result = oneversion::args::parsed().and_then(|args| {
        oneversion::run(&args.allowlist, &args.output, &args.inputs, args.succeed_on_found_violations)
    });
    match result {
        Ok(status) => ExitCode::from(u8::try_from(status.code()).unwrap_or(FAILURE)),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(FAILURE)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
