// mldata-core/src/content/codec.rs

use std::collections::HashMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ClientError, Result};

/// Element contents keyed by element identifier.
pub type ContentMap = HashMap<String, Bytes>;

/// Decodes the container returned by a content-bundle request.
///
/// The container format belongs to the server; the client only needs the
/// identifier to bytes mapping.
pub trait BundleCodec: Send + Sync {
    /// Name of this container format
    fn name(&self) -> &'static str;

    /// Unpacks a container into per-element contents.
    fn decode(&self, container: Bytes) -> Result<ContentMap>;

    /// Packs entries into a container, in the given order.
    fn encode(&self, entries: &[(String, Bytes)]) -> Result<Bytes>;
}

/// Length-prefixed entries: for each element a 4-byte big-endian id length,
/// the UTF-8 id, a 4-byte big-endian payload length and the payload.
#[derive(Debug, Clone, Default)]
pub struct LengthPrefixedBundle;

impl LengthPrefixedBundle {
    pub fn new() -> Self {
        Self
    }

    fn read_chunk(container: &mut Bytes, what: &str) -> Result<Bytes> {
        if container.remaining() < 4 {
            return Err(ClientError::serialization(format!(
                "truncated bundle: missing {} length",
                what
            )));
        }
        let length = container.get_u32() as usize;
        if container.remaining() < length {
            return Err(ClientError::serialization(format!(
                "truncated bundle: {} needs {} bytes, {} left",
                what,
                length,
                container.remaining()
            )));
        }
        Ok(container.split_to(length))
    }
}

impl BundleCodec for LengthPrefixedBundle {
    fn name(&self) -> &'static str {
        "length-prefixed"
    }

    fn decode(&self, mut container: Bytes) -> Result<ContentMap> {
        let mut contents = ContentMap::new();

        while container.has_remaining() {
            let id = Self::read_chunk(&mut container, "identifier")?;
            let id = String::from_utf8(id.to_vec()).map_err(|e| {
                ClientError::serialization(format!("bundle identifier is not UTF-8: {}", e))
            })?;
            let payload = Self::read_chunk(&mut container, "payload")?;
            contents.insert(id, payload);
        }

        Ok(contents)
    }

    fn encode(&self, entries: &[(String, Bytes)]) -> Result<Bytes> {
        let capacity = entries.iter().map(|(id, data)| 8 + id.len() + data.len()).sum();
        let mut out = BytesMut::with_capacity(capacity);

        for (id, data) in entries {
            let id_len = u32::try_from(id.len())
                .map_err(|_| ClientError::serialization("identifier too long for bundle"))?;
            let data_len = u32::try_from(data.len())
                .map_err(|_| ClientError::serialization(format!("content of '{}' too large for bundle", id)))?;
            out.put_u32(id_len);
            out.put_slice(id.as_bytes());
            out.put_u32(data_len);
            out.put_slice(data);
        }

        Ok(out.freeze())
    }
}
