use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use storagebench_service::BenchmarkRequest;

use crate::config::Config;
use crate::state::State;
use crate::{healthcheck, observability, web};

/// Storage latency benchmark host.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Invoke(InvokeCommand),
    Healthcheck(HealthcheckCommand),
    Version(VersionCommand),
}

/// serve benchmark invocations over HTTP
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {}

/// run a single benchmark invocation and print the response as JSON
///
/// This uses the same configuration as the HTTP host, but runs the invocation in-process without
/// starting a server.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "invoke")]
struct InvokeCommand {
    /// name of the object to write and read back
    #[argh(positional)]
    file_name: String,

    /// size of the generated payload in bytes
    #[argh(positional)]
    file_size: u64,
}

/// perform a healthcheck against the running benchmark host
///
/// This command checks if the host is available on the configured address. This is used for
/// Docker healthchecks.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "healthcheck")]
struct HealthcheckCommand {}

/// print the storagebench version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if let Command::Version(_) = args.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    // Sentry should be initialized before creating the async runtime.
    let _sentry_guard = observability::init_sentry(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("main-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(async move {
        match args.command {
            Command::Run(RunCommand {}) => web::server(config).await,
            Command::Invoke(InvokeCommand {
                file_name,
                file_size,
            }) => invoke(config, BenchmarkRequest::new(file_name, file_size)).await,
            Command::Healthcheck(HealthcheckCommand {}) => healthcheck::healthcheck(config).await,
            Command::Version(VersionCommand {}) => unreachable!(),
        }
    })
}

async fn invoke(config: Config, request: BenchmarkRequest) -> Result<()> {
    let state = State::new(config);
    let report = state.runner.run(&request).await?;

    let response = serde_json::to_string_pretty(&report.into_response())?;
    println!("{response}");
    Ok(())
}
