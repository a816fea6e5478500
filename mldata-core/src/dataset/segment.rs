// mldata-core/src/dataset/segment.rs

//! Metadata and content retrieval for runs of element identifiers.

use std::collections::HashMap;
use std::sync::Arc;

use super::element::Element;
use crate::api::{DatasetApi, ElementRecord};
use crate::content::{BinaryInterpreter, BundleCodec, ContentBundle};
use crate::error::{ClientError, Result};
use crate::pool::WorkerPool;

/// Fetches element segments: one metadata-bundle request and one
/// content-bundle request per segment.
#[derive(Clone)]
pub struct SegmentFetcher {
    api: Arc<dyn DatasetApi>,
    codec: Arc<dyn BundleCodec>,
    prefix: Arc<str>,
    interpreter: Option<Arc<dyn BinaryInterpreter>>,
    content_pool: WorkerPool,
}

impl SegmentFetcher {
    pub fn new(
        api: Arc<dyn DatasetApi>,
        codec: Arc<dyn BundleCodec>,
        prefix: Arc<str>,
        content_pool: WorkerPool,
    ) -> Self {
        Self {
            api,
            codec,
            prefix,
            interpreter: None,
            content_pool,
        }
    }

    pub fn with_interpreter(mut self, interpreter: Option<Arc<dyn BinaryInterpreter>>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn interpreter(&self) -> Option<&Arc<dyn BinaryInterpreter>> {
        self.interpreter.as_ref()
    }

    /// Submits a content-bundle request for `ids` on the content pool.
    pub fn spawn_content(&self, ids: Vec<String>) -> ContentBundle {
        ContentBundle::spawn(
            &self.content_pool,
            self.api.clone(),
            self.codec.clone(),
            self.prefix.clone(),
            ids,
        )
    }

    /// Fetches one segment.
    ///
    /// The content request is submitted first and left running; the
    /// returned elements follow the order of `ids` regardless of the order
    /// the server answered in.
    ///
    /// # Errors
    ///
    /// `NotFound` for an identifier absent from the metadata response, or
    /// the metadata request error. Content errors surface later, when an
    /// element's content is read.
    pub async fn fetch_segment(&self, ids: Vec<String>) -> Result<Vec<Element>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let bundle = self.spawn_content(ids.clone());
        let records = self.api.get_elements_bundle(&self.prefix, &ids).await?;
        let records = order_by_request(&ids, records)?;
        tracing::debug!("fetched segment of {} elements from {}", records.len(), self.prefix);
        Ok(self.elements(records, &bundle))
    }

    /// Fetches a single element by identifier, with its own content request.
    pub async fn fetch_one(&self, id: &str) -> Result<Element> {
        let record = self.api.get_element(&self.prefix, id).await?;
        let bundle = self.spawn_content(vec![record.id.clone()]);
        Ok(self.element(record, &bundle))
    }

    /// Builds elements sharing `bundle` for their content.
    pub fn elements(&self, records: Vec<ElementRecord>, bundle: &ContentBundle) -> Vec<Element> {
        records
            .into_iter()
            .map(|record| self.element(record, bundle))
            .collect()
    }

    fn element(&self, record: ElementRecord, bundle: &ContentBundle) -> Element {
        let promise = bundle.promise(record.id.clone());
        Element::new(
            record,
            promise,
            self.interpreter.clone(),
            self.api.clone(),
            self.prefix.clone(),
        )
    }
}

/// Reorders `records` to match `ids`.
pub(crate) fn order_by_request(ids: &[String], records: Vec<ElementRecord>) -> Result<Vec<ElementRecord>> {
    let by_id: HashMap<&str, &ElementRecord> = records.iter().map(|r| (r.id.as_str(), r)).collect();
    ids.iter()
        .map(|id| {
            by_id
                .get(id.as_str())
                .map(|record| (*record).clone())
                .ok_or_else(|| ClientError::not_found(id.clone()))
        })
        .collect()
}
