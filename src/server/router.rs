use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};

use super::{certificates, pages, scores, users};
use crate::certificates::{CertificateStorage, CertificateStorageError};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub certificates: CertificateStorage,
    pub static_dir: PathBuf,
    /// Bound applied to every store call and blob operation.
    pub storage_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        Self {
            store,
            certificates: CertificateStorage::new(config.certificates_dir()),
            static_dir: config.static_dir.clone(),
            storage_timeout: config.storage_timeout(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Runs a store operation on the blocking pool, bounded by the storage timeout.
    ///
    /// The operation acquires and releases its own connection, so a timed-out
    /// call may still finish in the background.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(store.as_ref()));

        match tokio::time::timeout(self.storage_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(Error::Task(join_err.to_string())),
            Err(_) => Err(Error::Timeout),
        }
    }

    /// Bounds a blob operation by the storage timeout.
    pub async fn with_blob<T, F>(&self, op: F) -> Result<std::result::Result<T, CertificateStorageError>>
    where
        F: std::future::Future<Output = std::result::Result<T, CertificateStorageError>>,
    {
        tokio::time::timeout(self.storage_timeout, op)
            .await
            .map_err(|_| Error::Timeout)
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
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        // Login and pages
        .route("/", get(pages::login_page).post(pages::login))
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/admin_dashboard.html", get(pages::admin_dashboard))
        .route("/user_dashboard.html", get(pages::user_dashboard))
        // Registration and profiles
        .route("/add_user", post(users::add_user))
        .route("/get_profile/{regno}", get(users::get_profile))
        // Leaderboard
        .route("/add_score", post(scores::add_score))
        .route("/get_scores", get(scores::get_scores))
        // Certificates
        .route("/add_certificate", post(certificates::add_certificate))
        .route(
            "/download_certificate/{regno}",
            get(certificates::download_certificate),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::store::SqliteStore;

    fn test_app(temp_dir: &TempDir) -> Router {
        let config = ServerConfig {
            data_dir: temp_dir.path().join("data"),
            static_dir: temp_dir.path().join("static"),
            ..ServerConfig::default()
        };
        std::fs::create_dir_all(&config.data_dir).unwrap();
        std::fs::create_dir_all(&config.static_dir).unwrap();
        std::fs::write(config.static_dir.join("login.html"), "<h1>login</h1>").unwrap();

        let store = SqliteStore::new(config.db_path()).unwrap();
        store.initialize().unwrap();
        create_router(Arc::new(AppState::new(Arc::new(store), &config)))
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let resp = test_app(&temp_dir)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_login_page_served_at_root() {
        let temp_dir = TempDir::new().unwrap();
        let resp = test_app(&temp_dir)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>login</h1>");
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let resp = test_app(&temp_dir)
            .oneshot(
                Request::get("/admin_dashboard.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_with_store_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let store = SqliteStore::new(config.db_path()).unwrap();
        let mut state = AppState::new(Arc::new(store), &config);
        state.storage_timeout = Duration::from_millis(10);

        let result = state
            .with_store(|_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::Timeout)));
    }
}
