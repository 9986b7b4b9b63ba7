use std::process::ExitCode;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use kv_function_runtime::application::RuntimeBuilder;
use kv_function_runtime::config::{LoggingConfig, RuntimeConfig};
use kv_function_runtime::telemetry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match RuntimeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(&LoggingConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init_tracing(config.logging());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = %config.store().address(),
        input_key = %config.store().input_key,
        output_key = %config.store().output_key,
        period_secs = config.poll_interval().as_secs(),
        handler = %config.handler(),
        artifact = %config.artifact(),
        "Starting function runtime"
    );

    let runtime = match RuntimeBuilder::new(config).build().await {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    runtime.run(shutdown_rx).await;
    info!("Runtime stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
