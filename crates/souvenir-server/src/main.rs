use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use souvenir_backend_ort::OrtBackend;
use souvenir_core::{Backend, ClassLabelTable, CredentialVerifier, ModelArtifact, Secret};
use souvenir_runtime::{ClassifierHandle, InferencePipeline};
use souvenir_server::cli::{load_env_file, parse_device, Cli, Command, ServeArgs};
use souvenir_server::http::{create_router, AppState};
use souvenir_server::model::load_classifiers;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_env_file(None)?;
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args, env_file).await,
    }
}

async fn serve(args: ServeArgs, env_file: Option<PathBuf>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log)),
        )
        .init();
    if let Some(path) = &env_file {
        info!(path = %path.display(), "loaded environment file");
    }

    let secret = Secret::new(args.secret_token);
    ensure!(!secret.is_empty(), "SECRET_TOKEN must not be empty");
    let device = parse_device(&args.device)?;
    let labels = ClassLabelTable::souvenirs();

    // Load every model instance before binding so a bad artifact fails startup.
    let backend = OrtBackend::new();
    let artifact = ModelArtifact::OnnxPath(args.model_path);
    let models = load_classifiers(
        &backend,
        &artifact,
        device,
        usize::from(args.workers),
        &labels,
    )?;
    let classifier = ClassifierHandle::spawn(models)?;

    let pipeline = InferencePipeline::new(CredentialVerifier::new(secret), classifier, labels);
    let state = Arc::new(AppState {
        pipeline,
        backend: backend.name(),
    });
    let app = create_router(state, args.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, workers = args.workers, classes = labels.len(), "souvenird listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("souvenird stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            error!(error = ?err, "failed to listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
