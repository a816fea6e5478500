// mldata-core/src/dataset/collection.rs

use std::fmt;
use std::sync::Arc;

use super::access::DatasetAccess;
use super::element::{Element, ElementContent};
use super::key::{ElementKey, Selection, SliceKey};
use super::stream::ElementStream;
use crate::api::{DatasetDefinition, DatasetFields, NewElement};
use crate::client::Client;
use crate::content::BinaryInterpreter;
use crate::error::{ClientError, Result};

/// A remote dataset: collection-level metadata plus keyed and ordered
/// access to its elements.
///
/// `len()` and `comments_count()` are client-side copies of server counts
/// and only change on [`Dataset::refresh`] (which adding or removing an
/// element performs).
pub struct Dataset {
    url_prefix: String,
    fields: DatasetFields,
    elements_count: usize,
    comments_count: usize,
    interpreter: Option<Arc<dyn BinaryInterpreter>>,
    access: DatasetAccess,
}

impl Dataset {
    /// A dataset handle from explicit fields, with zero counts.
    ///
    /// A `name` without `/` is qualified with the client's token prefix.
    /// No request is made.
    pub fn new(client: &Client, name: &str, fields: DatasetFields) -> Result<Self> {
        let url_prefix = client.qualify(name)?;
        let access = client.access(&url_prefix);
        Ok(Self {
            url_prefix,
            fields,
            elements_count: 0,
            comments_count: 0,
            interpreter: None,
            access,
        })
    }

    /// A dataset handle from a server-returned definition, counts included.
    pub fn from_definition(client: &Client, definition: DatasetDefinition) -> Result<Self> {
        let mut dataset = Self::new(client, &definition.url_prefix, definition.fields)?;
        dataset.elements_count = definition.elements_count;
        dataset.comments_count = definition.comments_count;
        Ok(dataset)
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn description(&self) -> &str {
        &self.fields.description
    }

    pub fn reference(&self) -> &str {
        &self.fields.reference
    }

    pub fn tags(&self) -> &[String] {
        &self.fields.tags
    }

    pub fn fields(&self) -> &DatasetFields {
        &self.fields
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.fields.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.fields.description = description.into();
    }

    pub fn set_reference(&mut self, reference: impl Into<String>) {
        self.fields.reference = reference.into();
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.fields.tags = tags;
    }

    /// Element count as of the last refresh.
    pub fn len(&self) -> usize {
        self.elements_count
    }

    pub fn is_empty(&self) -> bool {
        self.elements_count == 0
    }

    pub fn comments_count(&self) -> usize {
        self.comments_count
    }

    pub fn page_size(&self) -> usize {
        self.access.page_size()
    }

    pub fn access(&self) -> &DatasetAccess {
        &self.access
    }

    pub fn binary_interpreter(&self) -> Option<&Arc<dyn BinaryInterpreter>> {
        self.interpreter.as_ref()
    }

    /// Sets the transform applied to content on upload and read. Elements
    /// already fetched keep the interpreter they were fetched with.
    pub fn set_binary_interpreter(&mut self, interpreter: Option<Arc<dyn BinaryInterpreter>>) {
        if let Some(interpreter) = &interpreter {
            tracing::debug!("{} uses binary interpreter {}", self.url_prefix, interpreter.name());
        }
        self.access.set_interpreter(interpreter.clone());
        self.interpreter = interpreter;
    }

    /// Pushes the local title, description, reference and tags to the server.
    pub async fn update(&self) -> Result<()> {
        self.access
            .api()
            .update_dataset(&self.url_prefix, &self.fields)
            .await
    }

    /// Replaces fields and counts with the server's, and drops every cached
    /// page.
    pub async fn refresh(&mut self) -> Result<()> {
        let definition = self.access.api().get_dataset(&self.url_prefix).await?;
        self.fields = definition.fields;
        self.elements_count = definition.elements_count;
        self.comments_count = definition.comments_count;
        self.access.resolver().invalidate().await;
        tracing::debug!(
            "refreshed {}: {} elements, {} comments",
            self.url_prefix,
            self.elements_count,
            self.comments_count
        );
        Ok(())
    }

    /// Element at a logical position.
    pub async fn get(&self, index: usize) -> Result<Element> {
        let mut elements = self.access.fetch_indices(vec![index]).await?;
        elements
            .pop()
            .ok_or_else(|| ClientError::not_found(index.to_string()))
    }

    /// Elements in a run of logical positions, in position order.
    pub async fn slice(&self, slice: impl Into<SliceKey>) -> Result<Selection> {
        self.fetch(ElementKey::Slice(slice.into())).await
    }

    /// Element by identifier. Any failure, transport errors included, is
    /// reported as `NotFound`; use [`Dataset::try_get_by_id`] to tell them
    /// apart.
    pub async fn get_by_id(&self, id: &str) -> Result<Element> {
        self.access
            .fetch_id_compat(id)
            .await
            .ok_or_else(|| ClientError::not_found(id))
    }

    /// Element by identifier. `NotFound` only when the server has no such
    /// element.
    pub async fn try_get_by_id(&self, id: &str) -> Result<Element> {
        self.access.fetch_id(id).await
    }

    pub async fn fetch(&self, key: impl Into<ElementKey>) -> Result<Selection> {
        self.access.fetch(&key.into(), self.len()).await
    }

    /// Ordered iteration over the elements counted at the last refresh.
    pub fn iter(&self) -> ElementStream {
        self.access.stream(self.len())
    }

    /// Identifiers of every element, or of one page fetched directly.
    pub async fn keys(&self, page: Option<usize>) -> Result<Vec<String>> {
        match page {
            Some(page) => Ok(self
                .access
                .api()
                .list_elements(&self.url_prefix, page)
                .await?
                .into_iter()
                .map(|record| record.id)
                .collect()),
            None => {
                let indices: Vec<usize> = (0..self.len()).collect();
                self.access.resolve_all(&indices).await
            }
        }
    }

    /// Deletes an element and refreshes.
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        self.access.api().delete_element(&self.url_prefix, id).await?;
        tracing::debug!("deleted {} from {}", id, self.url_prefix);
        self.refresh().await
    }

    /// Creates an element, refreshes, and uploads its content.
    ///
    /// With an interpreter configured, the uploaded bytes are the ciphered
    /// content when `interpret` is set or the content is read from a file.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `content` names a file that does not exist.
    /// Nothing is created in that case. A failed lookup of the created
    /// element is reported as is.
    pub async fn add_element(
        &mut self,
        element: NewElement,
        content: impl Into<ElementContent>,
        interpret: bool,
    ) -> Result<Element> {
        let content = content.into();
        let interpret = interpret || matches!(content, ElementContent::Path(_));
        let content = content.load().await?;

        let id = self
            .access
            .api()
            .create_element(&self.url_prefix, &element)
            .await?;
        tracing::debug!("created element {} in {}", id, self.url_prefix);
        self.refresh().await?;

        let mut created = self.try_get_by_id(&id).await?;
        created.set_content(content, interpret).await?;
        Ok(created)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dataset {} ({} elements); tags: {}; description: {}; reference: {}",
            self.fields.title,
            self.elements_count,
            self.fields.tags.join(", "),
            self.fields.description,
            self.fields.reference
        )
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("url_prefix", &self.url_prefix)
            .field("fields", &self.fields)
            .field("elements_count", &self.elements_count)
            .field("comments_count", &self.comments_count)
            .field("page_size", &self.page_size())
            .finish()
    }
}
