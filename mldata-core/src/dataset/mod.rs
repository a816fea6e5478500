// mldata-core/src/dataset/mod.rs

//! Paginated, cached and prefetched access to remote dataset elements.
//!
//! ```ignore
//! use mldata_core::{Client, ClientConfig};
//!
//! let client = Client::from_config(ClientConfig::from_file("mldata.toml")?).await?;
//! let dataset = client.dataset("cats").await?;
//!
//! // Random access, batched into page-sized segments.
//! for element in dataset.slice(10..20).await? {
//!     println!("{}", element.title());
//! }
//!
//! // Ordered iteration, one page ahead.
//! let mut elements = dataset.iter();
//! while let Some(element) = elements.next_element().await? {
//!     let bytes = element.content().await?;
//! }
//! ```

mod access;
mod collection;
mod element;
mod key;
mod resolver;
mod segment;
mod stream;

pub use access::DatasetAccess;
pub use collection::Dataset;
pub use element::{Element, ElementContent};
pub use key::{ElementKey, Selection, SliceKey};
pub use resolver::{KeyResolver, Page};
pub use segment::SegmentFetcher;
pub use stream::ElementStream;
