use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::robots::robot_router;
use crate::robot::{GrantGate, ProjectResolver, RobotManager, StaticCatalog};
use crate::store::{SqliteStore, Store};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub projects: Arc<dyn ProjectResolver>,
    pub catalog: Arc<StaticCatalog>,
    pub robots: Arc<RobotManager>,
    /// Deadline for a single robot operation.
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the robot manager over a SQLite store: the store resolves
    /// projects, persists robots and backs the grant gate.
    pub fn new(store: Arc<SqliteStore>, catalog: StaticCatalog, request_timeout: Duration) -> Self {
        let catalog = Arc::new(catalog);
        let robots = RobotManager::new(
            store.clone(),
            catalog.clone(),
            store.clone(),
            Arc::new(GrantGate::new(store.clone())),
        );

        Self {
            store: store.clone(),
            projects: store,
            catalog,
            robots: Arc::new(robots),
            request_timeout,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v2.0/admin", admin_router())
        .nest("/api/v2.0", robot_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
