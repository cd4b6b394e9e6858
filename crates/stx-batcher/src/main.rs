use std::process::ExitCode;

use stx_batcher::{
    orchestrator::OrchestratorError,
    telemetry,
    Batcher,
    Config,
};
use tracing::{
    error,
    info,
    warn,
};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed installing the error report hook:\n{e:?}");
        return ExitCode::FAILURE;
    }

    let cfg = match Config::get() {
        Err(e) => {
            eprintln!("failed reading configuration:\n{e}");
            return ExitCode::FAILURE;
        }
        Ok(cfg) => cfg,
    };
    match serde_json::to_string(&cfg) {
        Ok(json) => eprintln!("{json}"),
        Err(e) => eprintln!("failed serializing configuration: {e}"),
    }

    if let Err(e) = telemetry::init(std::io::stderr, &cfg.log, cfg.force_stdout) {
        eprintln!("initializing stx-batcher failed:\n{e:?}");
        return ExitCode::FAILURE;
    }
    info!("initializing stx-batcher");

    let run = async {
        let batcher = Batcher::new(&cfg).await?;
        batcher.run().await
    };
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed listening for the interrupt signal");
            std::future::pending::<()>().await;
        }
    };
    tokio::select!(
        () = interrupt => {
            error!("received interrupt; aborting the run");
            ExitCode::FAILURE
        }
        result = run => match result {
            Err(error) => {
                error!(%error, "batch run failed");
                eprintln!("{error:?}");
                if let Some(aborted) = error.downcast_ref::<OrchestratorError>() {
                    print!("{}", aborted.partial_report());
                }
                ExitCode::FAILURE
            }
            Ok(report) => {
                info!(
                    attempted = report.attempted(),
                    accepted = report.accepted(),
                    rejected = report.rejected(),
                    "batch run finished",
                );
                print!("{report}");
                ExitCode::SUCCESS
            }
        }
    )
}
