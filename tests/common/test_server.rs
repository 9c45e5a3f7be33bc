use std::path::PathBuf;
use std::sync::Arc;

use eventreg::config::ServerConfig;
use eventreg::server::{AppState, create_router};
use eventreg::store::{SqliteStore, Store};
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const LOGIN_HTML: &str = "<html><body>login</body></html>";
pub const ADMIN_HTML: &str = "<html><body>admin</body></html>";
pub const USER_HTML: &str = "<html><body>user</body></html>";

/// Serves the router in-process on an ephemeral port, backed by a temp dir.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub config: ServerConfig,
    server_task: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: temp_dir.path().join("data"),
            static_dir: temp_dir.path().join("frontend"),
            max_upload_bytes: 64 * 1024,
            ..ServerConfig::default()
        };

        std::fs::create_dir_all(&config.data_dir).expect("create data dir");
        std::fs::create_dir_all(&config.static_dir).expect("create static dir");
        for (name, body) in [
            ("login.html", LOGIN_HTML),
            ("admin_dashboard.html", ADMIN_HTML),
            ("user_dashboard.html", USER_HTML),
        ] {
            std::fs::write(config.static_dir.join(name), body).expect("write page");
        }

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(Arc::new(store), &config));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind(config.socket_addr().expect("addr"))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let server_task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url,
            config,
            server_task: Some(server_task),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A second handle on the same database, for asserting on stored rows.
    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.config.db_path()).expect("open store")
    }

    pub fn certificates_dir(&self) -> PathBuf {
        self.config.certificates_dir()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(task) = self.server_task.take() {
            task.abort();
        }
    }
}
