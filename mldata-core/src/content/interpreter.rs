// mldata-core/src/content/interpreter.rs

use crate::error::Result;

/// Transforms element content between its raw and stored forms.
///
/// `cipher` runs before upload, `decipher` after download. Both must be
/// pure functions of their input.
pub trait BinaryInterpreter: Send + Sync {
    /// Name of this interpreter
    fn name(&self) -> &str;

    /// Encodes raw bytes for storage.
    fn cipher(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decodes stored bytes back into their raw form.
    fn decipher(&self, stored: &[u8]) -> Result<Vec<u8>>;
}
