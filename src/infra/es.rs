//! # Elasticsearch Client Module / Elasticsearch 客户端模块
//!
//! A minimal REST client: readiness polling for freshly started clusters and
//! the two component template endpoints the template updater needs.
//!
//! 一个最小的 REST 客户端：为新启动的集群轮询就绪状态，以及模板更新器所需的两个组件模板端点。

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::templates::{ComponentTemplateApi, ComponentTemplateEntry};

#[derive(Debug, Error)]
pub enum EsError {
    #[error("request to Elasticsearch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("REST layer at {url} did not become available after {attempts} attempts")]
    Unavailable { url: String, attempts: u32 },
}

/// Connection settings for [`EsClient`].
#[derive(Debug, Clone, Default)]
pub struct EsConnection {
    /// Base URL, e.g. `https://127.0.0.1:9200`
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Accept self-signed certificates (the elastic-package stack uses them).
    pub insecure: bool,
}

impl EsConnection {
    pub fn local(http_port: u16) -> Self {
        Self {
            url: format!("http://127.0.0.1:{http_port}"),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct EsClient {
    http: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct ComponentTemplatesResponse {
    component_templates: Vec<ComponentTemplateEntry>,
}

impl EsClient {
    pub fn new(connection: &EsConnection) -> Result<Self, EsError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(connection.insecure)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: connection.url.trim_end_matches('/').to_string(),
            username: connection.username.clone(),
            password: connection.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    /// Polls `GET /` until it answers with a success status.
    /// 轮询 `GET /` 直到其返回成功状态。
    pub async fn wait_for_rest_layer(&self, attempts: u32, interval: Duration) -> Result<(), EsError> {
        for attempt in 1..=attempts {
            match self.request(reqwest::Method::GET, "/").send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(url = %self.base_url, attempt, "REST layer is available");
                    return Ok(());
                }
                Ok(resp) => {
                    tracing::debug!(url = %self.base_url, attempt, status = %resp.status(), "REST layer not ready");
                }
                Err(e) => {
                    tracing::debug!(url = %self.base_url, attempt, error = %e, "REST layer not reachable");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(EsError::Unavailable {
            url: self.base_url.clone(),
            attempts,
        })
    }

    async fn check(method: &'static str, path: String, resp: reqwest::Response) -> Result<reqwest::Response, EsError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(EsError::Status {
                method,
                path,
                status,
                body,
            })
        }
    }
}

impl ComponentTemplateApi for EsClient {
    type Error = EsError;

    async fn get_component_templates(&self) -> Result<Vec<ComponentTemplateEntry>, EsError> {
        let path = "/_component_template".to_string();
        let resp = self.request(reqwest::Method::GET, &path).send().await?;
        let resp = Self::check("GET", path, resp).await?;
        let parsed: ComponentTemplatesResponse = resp.json().await?;
        Ok(parsed.component_templates)
    }

    async fn put_component_template(&self, name: &str, body: &Value) -> Result<(), EsError> {
        let path = format!("/_component_template/{name}");
        let resp = self
            .request(reqwest::Method::PUT, &path)
            .json(body)
            .send()
            .await?;
        Self::check("PUT", path, resp).await?;
        Ok(())
    }
}
