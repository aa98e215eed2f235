use std::panic;
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::Server;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::core::domain::{CompileOutcome, RunKind, RunOutcome};
use crate::core::engine::Engine;
use crate::core::traits::executor::Executor;
use crate::core::workspace::WorkspaceManager;
use crate::grpc::models::engine_service_server::EngineServiceServer;
use crate::grpc::services::EngineServiceImpl;
use crate::native::executor::NativeExecutor;
use crate::native::toolchain::Toolchain;
use crate::stubs::executor::ExecutorStub;

mod config;
mod constants;
mod core;
mod grpc;
mod native;
mod stubs;

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let config = EngineConfig::from_env()?;
    tracing::info!(?config, "Loaded configuration");

    let workspaces = WorkspaceManager::new(&config.workspace_root)
        .with_cleanup_attempts(config.cleanup_attempts);
    let engine = Engine::new(executor(&config), workspaces, config.max_concurrent);
    let service = EngineServiceServer::new(EngineServiceImpl::new(engine.clone()));

    tracing::info!("gRPC server listening on {}", config.addr);
    Server::builder()
        .add_service(service)
        .serve_with_shutdown(config.addr, shutdown_signal(engine))
        .await?;

    Ok(())
}

fn executor(config: &EngineConfig) -> Arc<dyn Executor> {
    if config.use_stub {
        tracing::warn!("Serving with the stub executor, submissions are not compiled");
        return Arc::new(ExecutorStub::new(
            Ok(CompileOutcome::success()),
            RunOutcome {
                kind: RunKind::Completed,
                stdout: "Hello World\n".to_string(),
                stderr: "".to_string(),
                exit_status: Some(0),
                execution_time_ms: 100,
                diagnostic: None,
            },
            Duration::from_secs(1),
        ));
    }

    Arc::new(
        NativeExecutor::new(Toolchain::java(&config.javac_path, &config.java_path))
            .with_compile_timeout(config.compile_timeout)
            .with_max_output_bytes(config.max_output_bytes),
    )
}

async fn shutdown_signal(engine: Engine) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    engine.close();
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
