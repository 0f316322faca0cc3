//! Quiz Duel Back binary entrypoint wiring REST, WebSocket and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_duel_back::{
    config::{AppConfig, StorageBackend},
    dao::quiz_store::MemoryQuizStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let storage = config.storage();
    let app_state = AppState::new(config);

    match storage {
        StorageBackend::Memory => {
            info!("using in-memory storage; state is lost on restart");
            app_state
                .install_store(Arc::new(MemoryQuizStore::new()))
                .await;
        }
        StorageBackend::Mongo => spawn_mongo_supervisor(app_state.clone())?,
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the background task that connects to MongoDB and toggles degraded mode.
#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) -> anyhow::Result<()> {
    use quiz_duel_back::{
        dao::quiz_store::{
            QuizStore,
            mongodb::{MongoConfig, MongoQuizStore},
        },
        dao::storage::StorageError,
        services::storage_supervisor,
    };

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoQuizStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn QuizStore>)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: SharedState) -> anyhow::Result<()> {
    anyhow::bail!("MongoDB storage requested but the `mongo-store` feature is disabled")
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
