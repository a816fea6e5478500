// mldata-core/src/dataset/element.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::api::{DatasetApi, ElementRecord};
use crate::content::{BinaryInterpreter, ContentBundle, ContentMap, ContentPromise};
use crate::error::{ClientError, Result};

/// One dataset element: its metadata plus a deferred handle to its content.
///
/// Metadata is available immediately. Content is fetched in the background
/// together with the rest of the segment the element was loaded with, and
/// only awaited when [`Element::content`] is called.
#[derive(Clone)]
pub struct Element {
    record: ElementRecord,
    content: ContentPromise,
    interpreter: Option<Arc<dyn BinaryInterpreter>>,
    api: Arc<dyn DatasetApi>,
    prefix: Arc<str>,
}

impl Element {
    pub(crate) fn new(
        record: ElementRecord,
        content: ContentPromise,
        interpreter: Option<Arc<dyn BinaryInterpreter>>,
        api: Arc<dyn DatasetApi>,
        prefix: Arc<str>,
    ) -> Self {
        Self {
            record,
            content,
            interpreter,
            api,
            prefix,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn description(&self) -> &str {
        &self.record.description
    }

    pub fn tags(&self) -> &[String] {
        &self.record.tags
    }

    pub fn http_ref(&self) -> &str {
        &self.record.http_ref
    }

    pub fn record(&self) -> &ElementRecord {
        &self.record
    }

    /// Prefix of the dataset this element belongs to.
    pub fn url_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn content_promise(&self) -> &ContentPromise {
        &self.content
    }

    /// Content as stored on the server.
    pub async fn raw_content(&self) -> Result<Bytes> {
        self.content.resolve().await
    }

    /// Content with the dataset's binary interpreter applied, if one is set.
    pub async fn content(&self) -> Result<Bytes> {
        let stored = self.content.resolve().await?;
        match &self.interpreter {
            Some(interpreter) => Ok(Bytes::from(interpreter.decipher(&stored)?)),
            None => Ok(stored),
        }
    }

    /// Uploads new content for this element.
    ///
    /// With `interpret` set and an interpreter configured, the bytes are
    /// ciphered before upload. Later reads of this handle return the
    /// uploaded bytes without another fetch.
    pub async fn set_content(&mut self, content: impl Into<Bytes>, interpret: bool) -> Result<()> {
        let content = content.into();
        let stored = match (&self.interpreter, interpret) {
            (Some(interpreter), true) => Bytes::from(interpreter.cipher(&content)?),
            _ => content,
        };

        self.api
            .upload_content(&self.prefix, &self.record.id, stored.clone())
            .await?;
        tracing::debug!(
            "uploaded {} bytes of content for {}/{}",
            stored.len(),
            self.prefix,
            self.record.id
        );

        let mut contents = ContentMap::new();
        contents.insert(self.record.id.clone(), stored);
        self.content = ContentBundle::ready(contents).promise(self.record.id.clone());
        Ok(())
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("prefix", &self.prefix)
            .field("record", &self.record)
            .field("content_resolved", &self.content.is_resolved())
            .finish()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.record.id, self.record.title)
    }
}

/// Content for a new element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementContent {
    Bytes(Bytes),
    /// Read from a local file when the element is added.
    Path(PathBuf),
}

impl ElementContent {
    /// The raw bytes this content stands for.
    pub(crate) async fn load(self) -> Result<Bytes> {
        match self {
            ElementContent::Bytes(bytes) => Ok(bytes),
            ElementContent::Path(path) => match tokio::fs::read(&path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ClientError::invalid_argument(format!(
                        "content file {} does not exist",
                        path.display()
                    )))
                }
                Err(e) => Err(ClientError::io(path, "failed to read content file", e)),
            },
        }
    }
}

impl From<Bytes> for ElementContent {
    fn from(bytes: Bytes) -> Self {
        ElementContent::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ElementContent {
    fn from(bytes: Vec<u8>) -> Self {
        ElementContent::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for ElementContent {
    fn from(bytes: &'static [u8]) -> Self {
        ElementContent::Bytes(Bytes::from_static(bytes))
    }
}

impl From<PathBuf> for ElementContent {
    fn from(path: PathBuf) -> Self {
        ElementContent::Path(path)
    }
}

impl From<&std::path::Path> for ElementContent {
    fn from(path: &std::path::Path) -> Self {
        ElementContent::Path(path.to_path_buf())
    }
}
