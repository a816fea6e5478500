// mldata-core/src/api/mod.rs

//! Remote dataset service access.
//!
//! [`DatasetApi`] is the only way the element pipeline talks to the
//! server. [`HttpDatasetApi`] is the production implementation; request
//! construction, authentication and retries live there and nowhere else.

mod http;
mod retry;
mod traits;

pub use http::HttpDatasetApi;
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use traits::{
    DatasetApi, DatasetDefinition, DatasetFields, ElementRecord, NewElement, ServerInfo,
};
