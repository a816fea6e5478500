// mldata-core/src/dataset/access.rs

//! Keyed access to a dataset's elements.
//!
//! Index and slice lookups resolve identifiers through the [`KeyResolver`]
//! on the key pool, split them into page-sized segments, and fetch every
//! segment in parallel through the [`SegmentFetcher`]. Results are joined
//! in segment submission order, which is logical index order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::element::Element;
use super::key::{ElementKey, Selection};
use super::resolver::KeyResolver;
use super::segment::SegmentFetcher;
use super::stream::ElementStream;
use crate::api::DatasetApi;
use crate::content::{BinaryInterpreter, BundleCodec};
use crate::error::{ClientError, Result};
use crate::pool::Pools;

/// Composes the key resolver, the segment fetcher and the two worker pools.
///
/// Clones share the page cache and the pools.
#[derive(Clone)]
pub struct DatasetAccess {
    api: Arc<dyn DatasetApi>,
    prefix: Arc<str>,
    resolver: KeyResolver,
    fetcher: SegmentFetcher,
    pools: Pools,
}

impl DatasetAccess {
    pub fn new(
        api: Arc<dyn DatasetApi>,
        codec: Arc<dyn BundleCodec>,
        prefix: Arc<str>,
        page_size: usize,
        page_ttl: Duration,
        pools: Pools,
    ) -> Self {
        let resolver = KeyResolver::new(api.clone(), prefix.clone(), page_size, page_ttl);
        let fetcher = SegmentFetcher::new(api.clone(), codec, prefix.clone(), pools.content.clone());
        Self {
            api,
            prefix,
            resolver,
            fetcher,
            pools,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn page_size(&self) -> usize {
        self.resolver.page_size()
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &SegmentFetcher {
        &self.fetcher
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    pub(crate) fn api(&self) -> &Arc<dyn DatasetApi> {
        &self.api
    }

    /// Elements fetched from now on decode their content with `interpreter`.
    pub fn set_interpreter(&mut self, interpreter: Option<Arc<dyn BinaryInterpreter>>) {
        self.fetcher = self.fetcher.clone().with_interpreter(interpreter);
    }

    /// Looks up `key` in a collection of `len` elements.
    ///
    /// Identifier keys use the compatibility lookup: any failure becomes
    /// `NotFound`.
    pub async fn fetch(&self, key: &ElementKey, len: usize) -> Result<Selection> {
        let elements = match key {
            ElementKey::Index(index) => self.fetch_indices(vec![*index]).await?,
            ElementKey::Slice(slice) => self.fetch_indices(slice.indices(len)?).await?,
            ElementKey::Id(id) => self.fetch_id_compat(id).await.into_iter().collect(),
        };
        Selection::from_elements(key, elements)
    }

    /// Fetches the elements at `indices`, in the given order.
    pub async fn fetch_indices(&self, indices: Vec<usize>) -> Result<Vec<Element>> {
        let ids = self.resolve_all(&indices).await?;
        let segments: Vec<_> = ids
            .chunks(self.page_size())
            .map(|segment| {
                let fetcher = self.fetcher.clone();
                let segment = segment.to_vec();
                self.pools
                    .keys
                    .spawn(async move { fetcher.fetch_segment(segment).await })
            })
            .collect();
        tracing::debug!(
            "dispatched {} segments for {} elements of {}",
            segments.len(),
            ids.len(),
            self.prefix
        );

        let mut elements = Vec::with_capacity(ids.len());
        for segment in segments {
            elements.extend(segment.await??);
        }
        Ok(elements)
    }

    /// Resolves `indices` to identifiers, one key-pool task per distinct page.
    pub async fn resolve_all(&self, indices: &[usize]) -> Result<Vec<String>> {
        let mut pages = BTreeMap::new();
        for &index in indices {
            let (page_no, _) = self.resolver.locate(index);
            pages.entry(page_no).or_insert_with(|| {
                let resolver = self.resolver.clone();
                self.pools.keys.spawn(async move { resolver.page(page_no).await })
            });
        }

        let mut loaded = BTreeMap::new();
        for (page_no, handle) in pages {
            loaded.insert(page_no, handle.await??);
        }

        indices
            .iter()
            .map(|&index| {
                let (page_no, offset) = self.resolver.locate(index);
                loaded
                    .get(&page_no)
                    .and_then(|page| page.get(offset))
                    .map(|record| record.id.clone())
                    .ok_or_else(|| ClientError::not_found(index.to_string()))
            })
            .collect()
    }

    /// Strict identifier lookup: a remote 404 is `NotFound`, every other
    /// failure is returned as is.
    pub async fn fetch_id(&self, id: &str) -> Result<Element> {
        self.fetcher.fetch_one(id).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::not_found(id)
            } else {
                e
            }
        })
    }

    /// Compatibility identifier lookup: `None` on any failure.
    pub async fn fetch_id_compat(&self, id: &str) -> Option<Element> {
        match self.fetcher.fetch_one(id).await {
            Ok(element) => Some(element),
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!("lookup of {} in {} failed, reporting not found: {}", id, self.prefix, e);
                }
                None
            }
        }
    }

    /// Ordered single-pass iteration over `len` elements.
    pub fn stream(&self, len: usize) -> ElementStream {
        ElementStream::new(
            self.api.clone(),
            self.prefix.clone(),
            self.fetcher.clone(),
            self.pools.keys.clone(),
            len,
            self.page_size(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LengthPrefixedBundle;
    use crate::dataset::SliceKey;
    use crate::testing::{MockApi, PREFIX};

    const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

    fn access(api: &Arc<MockApi>) -> DatasetAccess {
        DatasetAccess::new(
            api.clone(),
            Arc::new(LengthPrefixedBundle::new()),
            Arc::from(PREFIX),
            2,
            Duration::from_secs(60),
            Pools::new(4, 4),
        )
    }

    fn ids_of(selection: Selection) -> Vec<String> {
        selection.into_iter().map(|e| e.id().to_string()).collect()
    }

    #[tokio::test]
    async fn test_slice_is_split_into_page_sized_segments() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        let selection = access.fetch(&ElementKey::from(1..4_usize), IDS.len()).await.unwrap();
        assert_eq!(ids_of(selection), vec!["b", "c", "d"]);

        let mut requests = api.bundle_requests();
        requests.sort();
        assert_eq!(requests, vec![vec!["b".to_string(), "c".to_string()], vec!["d".to_string()]]);
        assert!(api.content_requests().iter().all(|ids| ids.len() <= 2));
    }

    #[tokio::test]
    async fn test_slice_keeps_index_order_under_shuffled_responses() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        api.reverse_bundles(true);
        let access = access(&api);

        let selection = access.fetch(&ElementKey::from(0..5_usize), IDS.len()).await.unwrap();
        assert_eq!(ids_of(selection), IDS.to_vec());
    }

    #[tokio::test]
    async fn test_zero_stop_means_full_length() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        let zero = access
            .fetch(&SliceKey::new(0, Some(0)).into(), IDS.len())
            .await
            .unwrap();
        let full = access.fetch(&ElementKey::from(0..5_usize), IDS.len()).await.unwrap();
        assert_eq!(ids_of(zero), ids_of(full));
    }

    #[tokio::test]
    async fn test_single_result_is_one() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        match access.fetch(&ElementKey::Index(3), IDS.len()).await.unwrap() {
            Selection::One(element) => {
                assert_eq!(element.id(), "d");
                assert_eq!(element.content().await.unwrap(), api.content_of("d"));
            }
            other => panic!("expected one element, got {:?}", other),
        }
        assert_eq!(api.content_requests(), vec![vec!["d".to_string()]]);
    }

    #[tokio::test]
    async fn test_empty_slice_and_out_of_range() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        let err = access.fetch(&ElementKey::from(3..3_usize), IDS.len()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));

        let err = access.fetch(&ElementKey::Index(9), IDS.len()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { ref key } if key == "9"));
    }

    #[tokio::test]
    async fn test_slice_past_end_is_not_found_before_any_request() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        let err = access.fetch(&ElementKey::from(0..usize::MAX), IDS.len()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { ref key } if key == "5"));
        assert!(api.page_log().is_empty());
        assert!(api.bundle_requests().is_empty());
    }

    #[tokio::test]
    async fn test_page_failure_aborts_slice() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        api.fail_metadata(true);
        let access = access(&api);

        let err = access.fetch(&ElementKey::from(0..4_usize), IDS.len()).await.unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_resolve_all_fetches_each_page_once() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        let ids = access.resolve_all(&[4, 0, 1, 3, 2]).await.unwrap();
        assert_eq!(ids, vec!["e", "a", "b", "d", "c"]);

        let mut pages = api.page_log();
        pages.sort_unstable();
        assert_eq!(pages, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_identifier_lookup_modes() {
        let api = Arc::new(MockApi::with_elements(2, &IDS));
        let access = access(&api);

        let selection = access.fetch(&ElementKey::id("c"), IDS.len()).await.unwrap();
        assert_eq!(ids_of(selection), vec!["c"]);

        let err = access.fetch(&ElementKey::id("zz"), IDS.len()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { ref key } if key == "zz"));
        let err = access.fetch_id("zz").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));

        api.fail_get_element(true);
        // Compatibility mode hides the transport failure, strict mode does not.
        let err = access.fetch(&ElementKey::id("c"), IDS.len()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        let err = access.fetch_id("c").await.unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: Some(500), .. }));
    }
}
