// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! runnerd: the OpenRunner supervisor daemon.

use std::sync::Arc;

use runner_daemon::listener::Listener;
use runner_daemon::{env, startup, Config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("runnerd: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.state_dir) {
        eprintln!("runnerd: cannot create state dir: {e}");
        return std::process::ExitCode::FAILURE;
    }
    let file_appender = tracing_appender::rolling::never(
        &config.state_dir,
        config.log_path.file_name().unwrap_or(std::ffi::OsStr::new("runnerd.log")),
    );
    let (writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env::log_filter()))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("runnerd: cannot start runtime: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&config)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon failed");
            eprintln!("runnerd: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<(), runner_daemon::LifecycleError> {
    let state = startup(config).await?;
    let ctx = Arc::clone(&state.ctx);

    info!(socket = %config.socket_path.display(), "daemon ready");
    // The installer waits for this line before connecting the UI
    println!("READY");

    let listener = Listener::new(state.listener, Arc::clone(&ctx));
    let listener_task = tokio::spawn(listener.run());

    wait_for_shutdown(&ctx).await;
    info!("shutting down");

    // Stop every child (graceful, then force) and truncate the ledger
    ctx.supervisor.shutdown_all().await;
    listener_task.abort();
    let _ = std::fs::remove_file(&config.socket_path);
    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT/SIGTERM or a Shutdown request over the socket.
async fn wait_for_shutdown(ctx: &Arc<runner_daemon::listener::ListenCtx>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                error!(error = %e, "cannot install SIGTERM handler");
                ctx.shutdown.cancelled().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
            _ = ctx.shutdown.cancelled() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = ctx.shutdown.cancelled() => {}
        }
    }
    ctx.shutdown.cancel();
}
