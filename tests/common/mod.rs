use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use dakregistry::auth::{self, password};
use dakregistry::config::AppConfig;
use dakregistry::db;
use dakregistry::models::NewUser;
use dakregistry::routes;
use dakregistry::state::AppState;
use dakregistry::storage::{AttachmentStore, LocalAttachmentStore};
use diesel::prelude::*;
use http_body_util::BodyExt;
use serde::Serialize;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// In-process app wired against a throwaway data directory: its own SQLite
/// file, upload dir, and downloads dir, so tests stay fully isolated.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    _data_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let data_dir = tempfile::tempdir().context("failed to create test data dir")?;
        let config = AppConfig {
            database_url: data_dir
                .path()
                .join("data.db")
                .to_string_lossy()
                .into_owned(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            upload_dir: data_dir.path().join("uploaded-files"),
            downloads_dir: data_dir.path().join("downloads"),
        };
        config.ensure_directories()?;

        let pool = db::init_pool(&config.database_url)?;
        db::run_migrations(&pool)?;
        {
            let mut conn = pool.get().context("failed to get seeding connection")?;
            auth::seed_default_users(&mut conn)?;
        }

        let attachments: Arc<dyn AttachmentStore> =
            Arc::new(LocalAttachmentStore::new(config.upload_dir.clone()));
        let state = AppState::new(pool, config, attachments);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            _data_dir: data_dir,
        })
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.state.config.upload_dir.clone()
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.state.config.downloads_dir.clone()
    }

    #[allow(dead_code)]
    pub fn insert_user(&self, username: &str, pass: &str, role: &str, account_type: &str) -> Result<()> {
        let user = NewUser {
            username: username.to_string(),
            password_hash: password::hash_password(pass)?,
            role: role.to_string(),
            account_type: account_type.to_string(),
        };
        let mut conn = self
            .state
            .pool
            .get()
            .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
        diesel::insert_into(dakregistry::schema::users::table)
            .values(&user)
            .execute(&mut conn)
            .context("failed to insert user")?;
        Ok(())
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<Response> {
        self.send_json(Method::POST, path, payload).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<Response> {
        self.send_json(Method::PATCH, path, payload).await
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<Response> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Registers a document through the multipart boundary, optionally with an
    /// attachment of (original file name, bytes).
    #[allow(dead_code)]
    pub async fn register_document(
        &self,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Result<Response> {
        let boundary = "test-boundary-7f1c9a";
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }

        if let Some((filename, data)) = file {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend(data);
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/documents")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
    ) -> Result<Response> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}
