// mldata-core/src/api/http.rs

//! HTTP implementation of [`DatasetApi`] built on `reqwest`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::retry::{retry_async, RetryConfig, RetryResult};
use super::traits::{
    DatasetApi, DatasetDefinition, DatasetFields, ElementRecord, NewElement, ServerInfo,
};
use crate::config::ServerConfig;
use crate::error::{ClientError, Result};

/// Dataset service client speaking JSON over HTTP.
pub struct HttpDatasetApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
    retry_config: RetryConfig,
}

/// Request body variants.
enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Binary(Bytes),
}

impl HttpDatasetApi {
    /// Creates a client from the server section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ClientError::config_with_source("failed to build HTTP client", e))?;

        let base_url = Url::parse(&config.url)
            .map_err(|e| ClientError::config_with_source(format!("invalid server url {}", config.url), e))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::config(format!("server url {} cannot be a base", config.url)));
        }

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
            retry_config: RetryConfig::from(config),
        })
    }

    /// Base URL extended by `segments`, each percent-encoded as a single
    /// path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL under `datasets/<owner>/<name>`.
    fn dataset_url(&self, prefix: &str, tail: &[&str]) -> Url {
        let mut segments = vec!["datasets"];
        segments.extend(prefix.split('/'));
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    /// Sends one request, retrying transient failures when `idempotent`.
    async fn execute(
        &self,
        method: Method,
        url: &Url,
        query: &[(&str, String)],
        payload: Payload<'_>,
        idempotent: bool,
    ) -> Result<Response> {
        let path = url.path();
        let no_retry = RetryConfig::no_retry();
        let policy = if idempotent { &self.retry_config } else { &no_retry };

        retry_async(policy, || {
            let mut request = self.client.request(method.clone(), url.clone()).query(query);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            request = match &payload {
                Payload::Empty => request,
                Payload::Json(body) => request.json(*body),
                Payload::Binary(bytes) => request
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(bytes.clone()),
            };
            let endpoint = format!("{} {}", method, path);

            async move {
                match request.send().await {
                    Ok(response) if response.status().is_success() => RetryResult::Ok(response),
                    Ok(response) => {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        let error = ClientError::remote_status(
                            &endpoint,
                            status.as_u16(),
                            format!("server returned {}: {}", status, body),
                        );
                        if status.is_server_error() {
                            tracing::warn!("{} returned {}, retrying", endpoint, status);
                            RetryResult::Retry(error)
                        } else {
                            RetryResult::Fail(error)
                        }
                    }
                    Err(e) if e.is_timeout() || e.is_connect() => {
                        tracing::warn!("{} failed: {}, retrying", endpoint, e);
                        RetryResult::Retry(ClientError::remote_with_source(
                            &endpoint,
                            "request failed",
                            e,
                        ))
                    }
                    Err(e) => RetryResult::Fail(ClientError::remote_with_source(
                        &endpoint,
                        "request failed",
                        e,
                    )),
                }
            }
        })
        .await
    }

    async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            ClientError::serialization(format!("failed to decode response of {}: {}", path, e))
        })
    }
}

impl fmt::Debug for HttpDatasetApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDatasetApi")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

/// Extracts the identifier from a create response, which is either a bare
/// JSON string or an object carrying `_id`.
fn parse_created_id(value: Value) -> Result<String> {
    match value {
        Value::String(id) => Ok(id),
        Value::Object(map) => match map.get("_id").or_else(|| map.get("id")) {
            Some(Value::String(id)) => Ok(id.clone()),
            _ => Err(ClientError::serialization(
                "create response does not carry an element id",
            )),
        },
        other => Err(ClientError::serialization(format!(
            "unexpected create response: {}",
            other
        ))),
    }
}

#[async_trait]
impl DatasetApi for HttpDatasetApi {
    async fn server_info(&self) -> Result<ServerInfo> {
        let url = self.url(&["server", "info"]);
        let response = self.execute(Method::GET, &url, &[], Payload::Empty, true).await?;
        Self::read_json(url.path(), response).await
    }

    async fn get_dataset(&self, prefix: &str) -> Result<DatasetDefinition> {
        let url = self.dataset_url(prefix, &[]);
        let response = self.execute(Method::GET, &url, &[], Payload::Empty, true).await?;
        Self::read_json(url.path(), response).await
    }

    async fn update_dataset(&self, prefix: &str, fields: &DatasetFields) -> Result<()> {
        let url = self.dataset_url(prefix, &[]);
        let body = serde_json::to_value(fields)
            .map_err(|e| ClientError::serialization(e.to_string()))?;
        self.execute(Method::PATCH, &url, &[], Payload::Json(&body), true).await?;
        Ok(())
    }

    async fn list_elements(&self, prefix: &str, page: usize) -> Result<Vec<ElementRecord>> {
        let url = self.dataset_url(prefix, &["elements"]);
        let query = [("page", page.to_string())];
        let response = self.execute(Method::GET, &url, &query, Payload::Empty, true).await?;
        Self::read_json(url.path(), response).await
    }

    async fn get_element(&self, prefix: &str, id: &str) -> Result<ElementRecord> {
        let url = self.dataset_url(prefix, &["elements", id]);
        let response = self.execute(Method::GET, &url, &[], Payload::Empty, true).await?;
        Self::read_json(url.path(), response).await
    }

    async fn get_elements_bundle(&self, prefix: &str, ids: &[String]) -> Result<Vec<ElementRecord>> {
        let url = self.dataset_url(prefix, &["elements", "bundle"]);
        let body = json!({ "elements": ids });
        let response = self.execute(Method::POST, &url, &[], Payload::Json(&body), true).await?;
        Self::read_json(url.path(), response).await
    }

    async fn get_contents_bundle(&self, prefix: &str, ids: &[String]) -> Result<Bytes> {
        let url = self.dataset_url(prefix, &["elements", "content"]);
        let body = json!({ "elements": ids });
        let response = self.execute(Method::GET, &url, &[], Payload::Json(&body), true).await?;
        response.bytes().await.map_err(|e| {
            ClientError::remote_with_source(url.path(), "failed to read content body", e)
        })
    }

    async fn create_element(&self, prefix: &str, element: &NewElement) -> Result<String> {
        let url = self.dataset_url(prefix, &["elements"]);
        let body = serde_json::to_value(element)
            .map_err(|e| ClientError::serialization(e.to_string()))?;
        let response = self.execute(Method::POST, &url, &[], Payload::Json(&body), false).await?;
        parse_created_id(Self::read_json(url.path(), response).await?)
    }

    async fn delete_element(&self, prefix: &str, id: &str) -> Result<()> {
        let url = self.dataset_url(prefix, &["elements", id]);
        self.execute(Method::DELETE, &url, &[], Payload::Empty, true).await?;
        Ok(())
    }

    async fn upload_content(&self, prefix: &str, id: &str, content: Bytes) -> Result<()> {
        let url = self.dataset_url(prefix, &["elements", id, "content"]);
        self.execute(Method::PUT, &url, &[], Payload::Binary(content), true).await?;
        Ok(())
    }
}
