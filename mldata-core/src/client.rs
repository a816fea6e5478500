// mldata-core/src/client.rs

//! Entry point of the library.
//!
//! A [`Client`] owns the configuration, the remote API handle, the bundle
//! codec and both worker pools. Every dataset opened through it shares the
//! same pools; separate clients never do.

use std::path::Path;
use std::sync::Arc;

use crate::api::{DatasetApi, DatasetDefinition, DatasetFields, HttpDatasetApi};
use crate::config::ClientConfig;
use crate::content::{BundleCodec, LengthPrefixedBundle};
use crate::dataset::{Dataset, DatasetAccess};
use crate::error::{ClientError, Result};
use crate::pool::Pools;

pub struct Client {
    config: ClientConfig,
    api: Arc<dyn DatasetApi>,
    codec: Arc<dyn BundleCodec>,
    pools: Pools,
    page_size: usize,
}

impl Client {
    /// Connects to the service described by `config` over HTTP, reading
    /// content bundles as [`LengthPrefixedBundle`] containers.
    pub async fn from_config(config: ClientConfig) -> Result<Self> {
        Self::from_config_with_codec(config, Arc::new(LengthPrefixedBundle::new())).await
    }

    /// Connects over HTTP, unpacking content bundles with `codec`.
    pub async fn from_config_with_codec(
        config: ClientConfig,
        codec: Arc<dyn BundleCodec>,
    ) -> Result<Self> {
        config.validate()?;
        let api = Arc::new(HttpDatasetApi::from_config(&config.server)?);
        Self::with_api(config, api, codec).await
    }

    /// Loads a TOML file, applies `MLDATA_*` overrides and connects.
    pub async fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ClientConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config).await
    }

    /// Builds a client over an arbitrary API implementation.
    ///
    /// Unless the configuration overrides it, the page size is taken from
    /// the server's session info.
    pub async fn with_api(
        config: ClientConfig,
        api: Arc<dyn DatasetApi>,
        codec: Arc<dyn BundleCodec>,
    ) -> Result<Self> {
        config.validate()?;

        let page_size = match config.server.page_size {
            Some(page_size) => page_size,
            None => api.server_info().await?.page_size,
        };
        if page_size == 0 {
            return Err(ClientError::remote("server_info", "server announced a page size of 0"));
        }

        let pools = Pools::new(config.pools.key_workers, config.pools.content_workers);
        tracing::info!(
            "client for {} ready: page size {}, {} key workers, {} content workers, {} codec",
            config.server.url,
            page_size,
            pools.keys.workers(),
            pools.content.workers(),
            codec.name()
        );

        Ok(Self {
            config,
            api,
            codec,
            pools,
            page_size,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn DatasetApi> {
        &self.api
    }

    /// Container format of content bundles.
    pub fn codec(&self) -> &Arc<dyn BundleCodec> {
        &self.codec
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    /// Page size of the current session.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Full `owner/name` prefix for `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bare name when no token prefix is configured.
    pub fn qualify(&self, name: &str) -> Result<String> {
        if name.contains('/') {
            return Ok(name.to_string());
        }
        match &self.config.server.token_prefix {
            Some(prefix) => Ok(format!("{}/{}", prefix, name)),
            None => Err(ClientError::invalid_argument(format!(
                "dataset name '{}' has no owner and no token prefix is configured",
                name
            ))),
        }
    }

    /// Fetches a dataset's definition and opens it.
    pub async fn dataset(&self, name: &str) -> Result<Dataset> {
        let url_prefix = self.qualify(name)?;
        let definition = self.api.get_dataset(&url_prefix).await?;
        tracing::debug!(
            "opened {} with {} elements",
            definition.url_prefix,
            definition.elements_count
        );
        Dataset::from_definition(self, definition)
    }

    /// Opens a dataset from a definition obtained elsewhere.
    pub fn dataset_from_definition(&self, definition: DatasetDefinition) -> Result<Dataset> {
        Dataset::from_definition(self, definition)
    }

    /// A local dataset handle with explicit fields. No request is made.
    pub fn new_dataset(&self, name: &str, fields: DatasetFields) -> Result<Dataset> {
        Dataset::new(self, name, fields)
    }

    pub(crate) fn access(&self, url_prefix: &str) -> DatasetAccess {
        DatasetAccess::new(
            self.api.clone(),
            self.codec.clone(),
            Arc::from(url_prefix),
            self.page_size,
            self.config.cache.page_ttl(),
            self.pools.clone(),
        )
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.config.server.url)
            .field("page_size", &self.page_size)
            .field("pools", &self.pools)
            .finish()
    }
}
