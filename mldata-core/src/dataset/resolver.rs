// mldata-core/src/dataset/resolver.rs

//! Logical index to element identifier resolution.
//!
//! Index `i` lives on page `i / page_size` at offset `i % page_size`. Pages
//! are cached for a fixed time-to-live measured from the last cache write;
//! once that elapses the whole cache is dropped, not just the entry being
//! looked up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::api::{DatasetApi, ElementRecord};
use crate::error::{ClientError, Result};

/// One cached page, in server order.
pub type Page = Arc<[ElementRecord]>;

#[derive(Debug)]
struct PageCache {
    pages: HashMap<usize, Page>,
    last_write: Instant,
}

impl PageCache {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            last_write: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_write) > ttl
    }

    fn get(&self, page: usize) -> Option<Page> {
        self.pages.get(&page).cloned()
    }

    fn store(&mut self, page: usize, records: Page, now: Instant) {
        self.pages.insert(page, records);
        self.last_write = now;
    }

    fn clear(&mut self) -> usize {
        let dropped = self.pages.len();
        self.pages.clear();
        dropped
    }
}

/// Maps logical element indices to identifiers through a shared page cache.
///
/// Clones share the cache. The cache lock is never held across a remote
/// call: concurrent misses on the same page may fetch it twice, and the
/// last write wins.
#[derive(Clone)]
pub struct KeyResolver {
    api: Arc<dyn DatasetApi>,
    prefix: Arc<str>,
    page_size: usize,
    ttl: Duration,
    cache: Arc<RwLock<PageCache>>,
}

impl KeyResolver {
    pub fn new(api: Arc<dyn DatasetApi>, prefix: Arc<str>, page_size: usize, ttl: Duration) -> Self {
        Self {
            api,
            prefix,
            page_size: page_size.max(1),
            ttl,
            cache: Arc::new(RwLock::new(PageCache::new())),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Page number and in-page offset of a logical index.
    pub fn locate(&self, index: usize) -> (usize, usize) {
        (index / self.page_size, index % self.page_size)
    }

    /// Returns the identifier of the element at `index`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the index lies past the end of its page, or the page
    /// fetch error.
    pub async fn resolve(&self, index: usize) -> Result<String> {
        let (page_no, offset) = self.locate(index);
        let page = self.page(page_no).await?;
        page.get(offset)
            .map(|record| record.id.clone())
            .ok_or_else(|| ClientError::not_found(index.to_string()))
    }

    /// Returns a page, from the cache when still valid.
    pub async fn page(&self, page_no: usize) -> Result<Page> {
        if let Some(page) = self.cached(page_no).await {
            return Ok(page);
        }

        tracing::debug!("page cache miss for {} page {}", self.prefix, page_no);
        let page: Page = self.api.list_elements(&self.prefix, page_no).await?.into();
        self.cache
            .write()
            .await
            .store(page_no, page.clone(), Instant::now());
        Ok(page)
    }

    async fn cached(&self, page_no: usize) -> Option<Page> {
        let now = Instant::now();
        {
            let cache = self.cache.read().await;
            if !cache.is_expired(self.ttl, now) {
                return cache.get(page_no);
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed the cache while we waited.
        if cache.is_expired(self.ttl, now) {
            let dropped = cache.clear();
            if dropped > 0 {
                tracing::debug!("page cache for {} expired, dropped {} pages", self.prefix, dropped);
            }
        }
        cache.get(page_no)
    }

    /// Drops every cached page.
    pub async fn invalidate(&self) {
        let dropped = self.cache.write().await.clear();
        tracing::debug!("page cache for {} invalidated, dropped {} pages", self.prefix, dropped);
    }

    /// Number of pages currently cached.
    pub async fn cached_pages(&self) -> usize {
        self.cache.read().await.pages.len()
    }
}
