//! infra-verify - Verify infrastructure modules by driving terraform

use clap::Parser;
use tracing_subscriber::EnvFilter;

use infra_verify::cli::Cli;
use infra_verify::commands::Reported;
use infra_verify::output::json::format_error;

/// Log filter variable; `RUST_LOG` is read when it is unset.
const LOG_ENV: &str = "INFRA_VERIFY_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(e) = cli.run().await {
        if e.downcast_ref::<Reported>().is_none() {
            let message = format!("{e:#}");
            match format_error(&message, error_code(&e)) {
                Ok(obj) if json => println!("{obj}"),
                _ => eprintln!("Error: {message}"),
            }
        }
        std::process::exit(1);
    }
}

/// Stable `code` field of the JSON error object.
fn error_code(e: &anyhow::Error) -> &'static str {
    use infra_verify::domain::error::{ConfigError, InvocationError, ModuleError, SuiteError};
    if e.downcast_ref::<SuiteError>().is_some() {
        "invalid_suite"
    } else if e.downcast_ref::<ConfigError>().is_some() {
        "invalid_config"
    } else if e.downcast_ref::<ModuleError>().is_some() {
        "invalid_module"
    } else if e.downcast_ref::<InvocationError>().is_some() {
        "invocation_failed"
    } else {
        "error"
    }
}
