// mldata-core/src/content/promise.rs

//! Deferred, shared element content.
//!
//! A [`ContentBundle`] wraps one content-bundle request. The request is
//! submitted to the content pool as soon as the bundle is created and its
//! outcome is memoised in a shared cell: every clone and every
//! [`ContentPromise`] cut from it observes the same single fetch.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};

use super::codec::{BundleCodec, ContentMap};
use crate::api::DatasetApi;
use crate::error::{ClientError, Result};
use crate::pool::WorkerPool;

type BundleOutcome = std::result::Result<Arc<ContentMap>, Arc<ClientError>>;

/// The content of one fetched segment, shared by all of its elements.
#[derive(Clone)]
pub struct ContentBundle {
    ids: Arc<[String]>,
    cell: Shared<BoxFuture<'static, BundleOutcome>>,
}

impl ContentBundle {
    /// Submits the bundle request for `ids` to `pool` and returns at once.
    pub fn spawn(
        pool: &WorkerPool,
        api: Arc<dyn DatasetApi>,
        codec: Arc<dyn BundleCodec>,
        prefix: Arc<str>,
        ids: Vec<String>,
    ) -> Self {
        let ids: Arc<[String]> = ids.into();
        let job_ids = ids.clone();

        let handle = pool.spawn(async move {
            let container = api.get_contents_bundle(&prefix, &job_ids).await?;
            let size = container.len();
            let contents = codec.decode(container)?;
            tracing::debug!(
                "decoded {} bundle for {}: {} bytes, {} of {} elements",
                codec.name(),
                prefix,
                size,
                contents.len(),
                job_ids.len()
            );
            Ok::<_, ClientError>(contents)
        });

        let cell = async move {
            match handle.await {
                Ok(Ok(contents)) => Ok(Arc::new(contents)),
                Ok(Err(e)) => Err(Arc::new(e)),
                Err(e) => Err(Arc::new(ClientError::from(e))),
            }
        }
        .boxed()
        .shared();

        Self { ids, cell }
    }

    /// A bundle whose contents are already known.
    pub fn ready(contents: ContentMap) -> Self {
        let ids: Arc<[String]> = contents.keys().cloned().collect::<Vec<_>>().into();
        let outcome: BundleOutcome = Ok(Arc::new(contents));
        let cell = futures::future::ready(outcome).boxed().shared();
        Self { ids, cell }
    }

    /// Identifiers this bundle was requested for.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// True once the underlying request has completed and been observed.
    pub fn is_resolved(&self) -> bool {
        self.cell.peek().is_some()
    }

    /// Waits for the bundle. Concurrent and repeated calls share one fetch.
    pub async fn resolve(&self) -> BundleOutcome {
        self.cell.clone().await
    }

    /// A handle to the content of one element of this bundle.
    pub fn promise(&self, id: impl Into<String>) -> ContentPromise {
        ContentPromise {
            id: id.into(),
            bundle: self.clone(),
        }
    }
}

impl fmt::Debug for ContentBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBundle")
            .field("ids", &self.ids.len())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// The deferred content of a single element.
#[derive(Clone, Debug)]
pub struct ContentPromise {
    id: String,
    bundle: ContentBundle,
}

impl ContentPromise {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bundle(&self) -> &ContentBundle {
        &self.bundle
    }

    pub fn is_resolved(&self) -> bool {
        self.bundle.is_resolved()
    }

    /// Waits for the shared bundle and returns this element's bytes.
    ///
    /// # Errors
    ///
    /// - `Content` if the bundle request failed.
    /// - `ContentMissing` if the bundle does not contain this element.
    pub async fn resolve(&self) -> Result<Bytes> {
        let contents = self
            .bundle
            .resolve()
            .await
            .map_err(|e| ClientError::content(&self.id, e))?;

        contents
            .get(&self.id)
            .cloned()
            .ok_or_else(|| ClientError::content_missing(&self.id))
    }
}
