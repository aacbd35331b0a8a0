#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use form_builder_api::config::AppConfig;
use form_builder_api::database::MemoryStore;
use form_builder_api::{app, AppState};

/// In-process server over a fresh `MemoryStore`, one per test
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
}

/// Registered user with a bearer token
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;

        let store = Arc::new(MemoryStore::new());
        let router = app(AppState::new(config, store.clone()));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            store,
        };
        server.wait_ready().await?;
        Ok(server)
    }

    async fn wait_ready(&self) -> Result<()> {
        for _ in 0..50 {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("test server on {} did not become ready", self.base_url)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request under `/api/v1` and returns status plus parsed body
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(&format!("/api/v1{}", path)));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, Some(token), None).await
    }

    pub async fn register(&self, name: &str) -> Result<TestUser> {
        let (status, body) = self
            .call(
                Method::POST,
                "/user/register",
                None,
                Some(json!({
                    "email": format!("{}@example.com", name),
                    "username": name,
                    "password": "Secret@1"
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        Ok(TestUser {
            id: body["data"]["user"]["id"].as_i64().context("missing user id")?,
            token: body["data"]["token"]
                .as_str()
                .context("missing token")?
                .to_string(),
        })
    }

    pub async fn create_form(&self, owner: &TestUser, title: &str) -> Result<i64> {
        let (status, body) = self
            .post(
                "/form",
                &owner.token,
                json!({ "form_title": title, "form_description": "test form" }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create form failed: {}", body);
        body["data"]["id"].as_i64().context("missing form id")
    }

    pub async fn add_field(
        &self,
        owner: &TestUser,
        form_id: i64,
        title: &str,
        required: bool,
    ) -> Result<i64> {
        let (status, body) = self
            .post(
                "/form/fields",
                &owner.token,
                json!({ "field_title": title, "required": required, "form_id": form_id }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "add field failed: {}", body);
        body["data"]["id"].as_i64().context("missing field id")
    }

    pub async fn form_is_ready(&self, token: &str, form_id: i64) -> Result<bool> {
        let (status, body) = self.get(&format!("/form/{}", form_id), token).await?;
        anyhow::ensure!(status == StatusCode::OK, "get form failed: {}", body);
        body["data"]["is_ready"].as_bool().context("missing is_ready")
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.api.enable_request_logging = false;
    config.security.password_hash_cost = 4;
    config
}
