// mldata-core/src/api/traits.rs

//! The remote collaborator seam.
//!
//! Everything the element pipeline needs from the dataset service goes
//! through [`DatasetApi`], so the pipeline can run against the HTTP client
//! or an in-memory double.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Element metadata as returned by page listings and bundle lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub http_ref: String,
}

impl ElementRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Fields of a new element record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewElement {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub http_ref: String,
}

/// The editable, dataset-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFields {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub reference: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

/// A dataset definition as stored by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetDefinition {
    pub url_prefix: String,
    #[serde(flatten)]
    pub fields: DatasetFields,
    pub elements_count: usize,
    pub comments_count: usize,
}

/// Session information announced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "Page-Size")]
    pub page_size: usize,
}

/// Operations the client consumes from the dataset service.
///
/// `prefix` is always the fully qualified dataset prefix (`owner/name`).
/// Implementations must be safe to call concurrently from pool workers.
#[async_trait]
pub trait DatasetApi: Send + Sync {
    /// Returns the session information, including the page size.
    async fn server_info(&self) -> Result<ServerInfo>;

    /// Fetches the dataset definition with its current counts.
    async fn get_dataset(&self, prefix: &str) -> Result<DatasetDefinition>;

    /// Replaces the editable dataset fields.
    async fn update_dataset(&self, prefix: &str, fields: &DatasetFields) -> Result<()>;

    /// Lists one zero-based page of element records, in dataset order.
    async fn list_elements(&self, prefix: &str, page: usize) -> Result<Vec<ElementRecord>>;

    /// Fetches a single element record.
    async fn get_element(&self, prefix: &str, id: &str) -> Result<ElementRecord>;

    /// Fetches the records of several elements in one request.
    ///
    /// The response order is not guaranteed to match `ids`.
    async fn get_elements_bundle(&self, prefix: &str, ids: &[String]) -> Result<Vec<ElementRecord>>;

    /// Fetches the binary content of several elements as one opaque container.
    async fn get_contents_bundle(&self, prefix: &str, ids: &[String]) -> Result<Bytes>;

    /// Creates an element record and returns its identifier.
    async fn create_element(&self, prefix: &str, element: &NewElement) -> Result<String>;

    /// Deletes an element.
    async fn delete_element(&self, prefix: &str, id: &str) -> Result<()>;

    /// Stores the binary content of an element.
    async fn upload_content(&self, prefix: &str, id: &str, content: Bytes) -> Result<()>;
}
