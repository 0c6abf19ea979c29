use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use fetch_core::transport::network_agent;
use fetch_core::Transport;
use fetch_ffi::{BridgeError, FetchRuntime, ScriptArtifact};
use tracing_subscriber::EnvFilter;

/// Evaluate a script with a promise-based `fetch` available.
#[derive(Debug, Parser)]
#[command(name = "fetch-eval", version, about)]
struct Args {
    /// Script file to evaluate.
    script: PathBuf,

    /// Send every request to this origin (e.g. http://127.0.0.1:3000).
    #[arg(long, env = "FETCH_ORIGIN")]
    origin: Option<String>,

    /// Per-request network timeout in milliseconds.
    #[arg(long, env = "FETCH_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Fetch implementation to load instead of the bundled one.
    #[arg(long)]
    bundle: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, script = %args.script.display(), "fetch-eval failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), BridgeError> {
    let artifact = match &args.bundle {
        Some(path) => ScriptArtifact::from_path(path)?,
        None => ScriptArtifact::bundled(),
    };
    let script = ScriptArtifact::from_path(&args.script)?;

    let runtime = FetchRuntime::new(&artifact, transport(args)?)?;
    runtime.eval(script.source())?;
    runtime.run_until_idle()
}

fn transport(args: &Args) -> Result<Transport, BridgeError> {
    let agent = network_agent(args.timeout_ms.map(Duration::from_millis));
    Ok(match &args.origin {
        Some(origin) => Transport::origin_with_agent(origin.parse()?, agent),
        None => Transport::with_agent(agent),
    })
}
