use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use robokey::auth::store_new_token;
use robokey::robot::StaticCatalog;
use robokey::server::{AppState, create_router};
use robokey::store::{SqliteStore, Store};
use robokey::types::{Permission, Project, ProjectGrant, User};

/// A server bound to an ephemeral port, backed by a fresh database.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub admin_token: String,
    pub store: Arc<SqliteStore>,
    server: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_timeout(Duration::from_secs(30)).await
    }

    pub async fn start_with_timeout(request_timeout: Duration) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_dir.path().join("robokey.db")).expect("open store"),
        );
        store.initialize().expect("initialize store");

        let admin_token = Self::issue_token(&store, None);

        let state = Arc::new(AppState::new(
            store.clone(),
            StaticCatalog::builtin(),
            request_timeout,
        ));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://127.0.0.1:{port}"),
            admin_token,
            store,
            server,
        }
    }

    fn issue_token(store: &SqliteStore, user_id: Option<&str>) -> String {
        let (_, raw) = store_new_token(store, user_id, None).expect("issue token");
        raw
    }

    pub fn create_project(&self, name: &str) -> Project {
        self.store.create_project(name).expect("create project")
    }

    /// Creates a user holding `allow` on `project_id` and returns their token.
    pub fn create_user(&self, name: &str, project_id: Option<(i64, Permission)>) -> String {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");

        if let Some((project_id, allow_bits)) = project_id {
            self.store
                .upsert_project_grant(&ProjectGrant {
                    user_id: user.id.clone(),
                    project_id,
                    allow_bits,
                    deny_bits: Permission::default(),
                    created_at: now,
                    updated_at: now,
                })
                .expect("grant");
        }

        Self::issue_token(&self.store, Some(&user.id))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}
