mod connections;
pub mod session;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{config::AppConfig, dao::quiz_store::QuizStore, error::ServiceError};

pub use self::connections::{ConnectionRegistry, PlayerConnection};

pub type SharedState = Arc<AppState>;

/// Central application state storing live player connections and the storage handle.
pub struct AppState {
    store: RwLock<Option<Arc<dyn QuizStore>>>,
    connections: ConnectionRegistry,
    degraded: watch::Sender<bool>,
    matchmaking_gate: Mutex<()>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            connections: ConnectionRegistry::default(),
            degraded: degraded_tx,
            matchmaking_gate: Mutex::new(()),
            config: Arc::new(config),
        })
    }

    /// Build a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn QuizStore>) -> SharedState {
        let state = Self::new(config);
        state.install_store(store).await;
        state
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when none is installed or it is unhealthy.
    pub async fn require_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        if *self.degraded.borrow() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none() || *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Routing table of connected players.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Serializes matchmaking so claim-or-enqueue runs as one step per process.
    pub fn matchmaking_gate(&self) -> &Mutex<()> {
        &self.matchmaking_gate
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}
