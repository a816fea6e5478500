// mldata-core/src/dataset/stream.rs

//! Ordered, double-buffered iteration over a dataset.
//!
//! Pages are walked from 0. While the elements of page `p` are handed out,
//! page `p + 1` is already being fetched on the key pool. Each page's
//! content is requested as one bundle, shared by that page's elements.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::task::JoinHandle;

use super::element::Element;
use super::segment::SegmentFetcher;
use crate::api::{DatasetApi, ElementRecord};
use crate::error::Result;
use crate::pool::WorkerPool;

/// Single-pass element stream. Start over with a fresh call to
/// [`Dataset::iter`](super::Dataset::iter).
pub struct ElementStream {
    api: Arc<dyn DatasetApi>,
    prefix: Arc<str>,
    fetcher: SegmentFetcher,
    pool: WorkerPool,
    page_count: usize,
    /// Page the pending fetch is for.
    next_page: usize,
    pending: Option<JoinHandle<Result<Vec<ElementRecord>>>>,
    buffer: VecDeque<Element>,
}

impl ElementStream {
    pub(crate) fn new(
        api: Arc<dyn DatasetApi>,
        prefix: Arc<str>,
        fetcher: SegmentFetcher,
        pool: WorkerPool,
        len: usize,
        page_size: usize,
    ) -> Self {
        let page_count = len.div_ceil(page_size.max(1));
        let mut stream = Self {
            api,
            prefix,
            fetcher,
            pool,
            page_count,
            next_page: 0,
            pending: None,
            buffer: VecDeque::new(),
        };
        if page_count > 0 {
            stream.pending = Some(stream.spawn_page(0));
        }
        stream
    }

    /// Number of pages this stream walks.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    fn spawn_page(&self, page: usize) -> JoinHandle<Result<Vec<ElementRecord>>> {
        let api = self.api.clone();
        let prefix = self.prefix.clone();
        self.pool
            .spawn(async move { api.list_elements(&prefix, page).await })
    }

    /// Returns the next element, or `None` once every page is consumed.
    ///
    /// A failed page fetch ends the stream after its error is returned.
    pub async fn next_element(&mut self) -> Result<Option<Element>> {
        loop {
            if let Some(element) = self.buffer.pop_front() {
                return Ok(Some(element));
            }

            let Some(pending) = self.pending.take() else {
                return Ok(None);
            };
            let page = self.next_page;
            let records = pending.await??;

            self.next_page += 1;
            if self.next_page < self.page_count {
                self.pending = Some(self.spawn_page(self.next_page));
            }

            tracing::debug!(
                "page {} of {} for {}: {} elements",
                page + 1,
                self.page_count,
                self.prefix,
                records.len()
            );
            if !records.is_empty() {
                let ids = records.iter().map(|r| r.id.clone()).collect();
                let bundle = self.fetcher.spawn_content(ids);
                self.buffer.extend(self.fetcher.elements(records, &bundle));
            }
        }
    }

    /// Adapts this into a `futures` stream that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Element>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut elements = state?;
            match elements.next_element().await {
                Ok(Some(element)) => Some((Ok(element), Some(elements))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl Drop for ElementStream {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
