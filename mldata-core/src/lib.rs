// mldata-core/src/lib.rs

//! Client library for a remote dataset-hosting service.
//!
//! This crate provides paginated, cached and concurrently prefetched access
//! to the elements of remote datasets, element creation and deletion, and
//! export of a dataset to local disk.

pub mod api;
pub mod client;
pub mod config;
pub mod content;
pub mod dataset;
pub mod error;
pub mod export;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use api::{DatasetApi, DatasetDefinition, DatasetFields, ElementRecord, HttpDatasetApi, NewElement};
pub use client::Client;
pub use config::ClientConfig;
pub use content::{BinaryInterpreter, BundleCodec, ContentPromise, LengthPrefixedBundle};
pub use dataset::{Dataset, Element, ElementContent, ElementKey, ElementStream, Selection, SliceKey};
pub use error::{ClientError, Result};
pub use export::{ExportOptions, ExportSummary, MetadataFormat};
pub use pool::{Pools, WorkerPool};
