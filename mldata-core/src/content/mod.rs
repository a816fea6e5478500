// mldata-core/src/content/mod.rs

//! Element content handling: the bundle container codec, the optional
//! binary interpreter, and the shared deferred content handles.

mod codec;
mod interpreter;
mod promise;

pub use codec::{BundleCodec, ContentMap, LengthPrefixedBundle};
pub use interpreter::BinaryInterpreter;
pub use promise::{ContentBundle, ContentPromise};
