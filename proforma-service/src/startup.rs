//! Application startup and lifecycle management.

use crate::config::{ProformaConfig, StoreBackend};
use crate::handlers::{customers, drafts, health, sales};
use crate::services::{
    init_metrics, CustomerDirectory, Database, DraftSessions, HistoryPresenter, HistoryRevision,
    MemoryStore, RecordStore, SaleCommitter, StoreGateway,
};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ProformaConfig,
    pub store: Arc<dyn RecordStore>,
    pub customers: CustomerDirectory,
    pub drafts: DraftSessions,
    pub committer: SaleCommitter,
    pub history: HistoryPresenter,
}

impl AppState {
    /// Wire every service over `store`. Committer and history share one
    /// revision counter.
    pub fn new(config: ProformaConfig, store: Arc<dyn RecordStore>) -> Self {
        let gateway = StoreGateway::new(
            Arc::clone(&store),
            config.store.timeout(),
            config.store.read_retry(),
        );
        let revision = HistoryRevision::new();

        Self {
            customers: CustomerDirectory::new(gateway.clone()),
            drafts: DraftSessions::new(),
            committer: SaleCommitter::new(gateway.clone(), revision.clone()),
            history: HistoryPresenter::new(gateway, revision),
            store,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .route(
            "/customers",
            post(customers::create_customer).get(customers::list_customers),
        )
        .route("/drafts", post(drafts::create_draft))
        .route(
            "/drafts/:id",
            get(drafts::get_draft).delete(drafts::discard_draft),
        )
        .route("/drafts/:id/items", post(drafts::add_item))
        .route(
            "/drafts/:id/items/:index",
            put(drafts::update_item).delete(drafts::remove_item),
        )
        .route("/drafts/:id/expenses", post(drafts::add_expense))
        .route(
            "/drafts/:id/expenses/:index",
            put(drafts::update_expense).delete(drafts::remove_expense),
        )
        .route("/drafts/:id/commit", post(drafts::commit_draft))
        .route("/sales", get(sales::list_sales))
        .route("/sales/:id", get(sales::get_sale))
        .route("/sales/:id/advance", put(sales::update_advance))
        .route("/sales/:id/expenses", post(sales::add_expense))
        .route("/expenses/:id", delete(sales::delete_expense))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ProformaConfig) -> Result<Self, AppError> {
        init_metrics();

        let store: Arc<dyn RecordStore> = match config.backend {
            StoreBackend::Postgres => {
                let db = Database::new(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(db)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; records are lost on shutdown");
                Arc::new(MemoryStore::new())
            }
        };

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Proforma service listener bound");

        let state = AppState::new(config, store);
        state.drafts.spawn_sweeper(
            state.config.drafts.idle_ttl(),
            state.config.drafts.sweep_interval(),
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves, then let in-flight requests finish.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            port = self.port,
            "Service ready to accept connections"
        );

        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "HTTP server error");
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
