//! Field-addressable binary record format
//!
//! Records are encoded so that single fields can be decoded without
//! touching the rest of the buffer.
//!
//! ## Record Format
//!
//! ```text
//! [version: u8][flags: u8][header_len: u32][header: bytes][payload: bytes][crc32: u32]
//! ```
//!
//! - **version**: Format version, currently 1
//! - **flags**: Bit 0 set for delta images
//! - **header_len**: Size of the header in bytes (little endian)
//! - **header**: bincode-serialized class name and field slots; each slot
//!   holds the field name, declared type, tombstone flag and the offset and
//!   length of its value inside the payload
//! - **payload**: bincode-serialized field values, back to back
//! - **crc32**: CRC32 checksum over everything before it

use crc32fast::Hasher;
use docrec_core::{Error, FieldType, Result};
use docrec_record::{ImageField, ImageValue, RecordImage, Serializer};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Current format version
pub const FORMAT_VERSION: u8 = 1;

/// Flag bit marking a delta image
pub const FLAG_DELTA: u8 = 0b0000_0001;

// version(1) + flags(1) + header_len(4)
const PREFIX_LEN: usize = 6;
const CRC_LEN: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    class_name: Option<String>,
    fields: Vec<FieldSlot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldSlot {
    name: String,
    field_type: Option<FieldType>,
    removed: bool,
    offset: u32,
    len: u32,
}

/// A validated view over an encoded record
struct Frame<'a> {
    flags: u8,
    header: Header,
    payload: &'a [u8],
}

impl Frame<'_> {
    fn value(&self, slot: &FieldSlot) -> Result<ImageValue> {
        let start = slot.offset as usize;
        let end = start + slot.len as usize;
        let bytes = self.payload.get(start..end).ok_or_else(|| {
            Error::Serialization(format!(
                "field '{}' spans {}..{} outside payload of {} bytes",
                slot.name,
                start,
                end,
                self.payload.len()
            ))
        })?;
        bincode::deserialize(bytes).map_err(|e| {
            Error::Serialization(format!("field '{}': bincode deserialize failed: {}", slot.name, e))
        })
    }
}

/// bincode-backed `Serializer` with a field slot table
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl BinarySerializer {
    /// Create a serializer
    pub fn new() -> Self {
        BinarySerializer
    }

    /// True if `buf` was encoded from a delta image
    pub fn is_delta(&self, buf: &[u8]) -> Result<bool> {
        Ok(open(buf)?.flags & FLAG_DELTA != 0)
    }
}

fn open(buf: &[u8]) -> Result<Frame<'_>> {
    if buf.len() < PREFIX_LEN + CRC_LEN {
        return Err(Error::Serialization(format!(
            "record buffer of {} bytes is shorter than the minimum of {}",
            buf.len(),
            PREFIX_LEN + CRC_LEN
        )));
    }

    let (body, crc_bytes) = buf.split_at(buf.len() - CRC_LEN);
    let mut crc_buf = [0u8; 4];
    crc_buf.copy_from_slice(crc_bytes);
    let expected_crc = u32::from_le_bytes(crc_buf);

    let mut hasher = Hasher::new();
    hasher.update(body);
    let actual_crc = hasher.finalize();
    if actual_crc != expected_crc {
        return Err(Error::Serialization(format!(
            "CRC mismatch (expected {:08x}, got {:08x})",
            expected_crc, actual_crc
        )));
    }

    let version = body[0];
    if version != FORMAT_VERSION {
        return Err(Error::Serialization(format!(
            "unsupported record format version {}",
            version
        )));
    }
    let flags = body[1];

    let mut len_buf = [0u8; 4];
    len_buf.copy_from_slice(&body[2..PREFIX_LEN]);
    let header_len = u32::from_le_bytes(len_buf) as usize;
    let header_bytes = body.get(PREFIX_LEN..PREFIX_LEN + header_len).ok_or_else(|| {
        Error::Serialization(format!(
            "header length {} exceeds buffer of {} bytes",
            header_len,
            body.len()
        ))
    })?;
    let header: Header = bincode::deserialize(header_bytes)
        .map_err(|e| Error::Serialization(format!("header: bincode deserialize failed: {}", e)))?;

    Ok(Frame {
        flags,
        header,
        payload: &body[PREFIX_LEN + header_len..],
    })
}

fn to_u32(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::Serialization(format!("{} of {} bytes is too large", what, n)))
}

impl Serializer for BinarySerializer {
    fn decode(&self, buf: &[u8], fields: Option<&[String]>) -> Result<RecordImage> {
        let frame = open(buf)?;
        let mut image = RecordImage {
            class_name: frame.header.class_name.clone(),
            fields: Vec::new(),
        };

        for slot in &frame.header.fields {
            if let Some(wanted) = fields {
                if !wanted.iter().any(|n| *n == slot.name) {
                    continue;
                }
            }
            let value = if slot.removed {
                ImageValue::Null
            } else {
                frame.value(slot)?
            };
            image.fields.push(ImageField {
                name: slot.name.clone(),
                field_type: slot.field_type,
                removed: slot.removed,
                value,
            });
        }

        trace!(
            bytes = buf.len(),
            decoded = image.fields.len(),
            stored = frame.header.fields.len(),
            "decoded record"
        );
        Ok(image)
    }

    fn encode(&self, image: &RecordImage, delta_only: bool) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        let mut slots = Vec::with_capacity(image.fields.len());

        for field in &image.fields {
            let offset = to_u32(payload.len(), "payload")?;
            if !field.removed {
                let bytes = bincode::serialize(&field.value).map_err(|e| {
                    Error::Serialization(format!(
                        "field '{}': bincode serialize failed: {}",
                        field.name, e
                    ))
                })?;
                payload.extend_from_slice(&bytes);
            }
            slots.push(FieldSlot {
                name: field.name.clone(),
                field_type: field.field_type,
                removed: field.removed,
                offset,
                len: to_u32(payload.len(), "payload")? - offset,
            });
        }

        let header = Header {
            class_name: image.class_name.clone(),
            fields: slots,
        };
        let header_bytes = bincode::serialize(&header)
            .map_err(|e| Error::Serialization(format!("header: bincode serialize failed: {}", e)))?;

        let mut buf =
            Vec::with_capacity(PREFIX_LEN + header_bytes.len() + payload.len() + CRC_LEN);
        buf.push(FORMAT_VERSION);
        buf.push(if delta_only { FLAG_DELTA } else { 0 });
        buf.extend_from_slice(&to_u32(header_bytes.len(), "header")?.to_le_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&payload);

        let mut hasher = Hasher::new();
        hasher.update(&buf);
        let crc = hasher.finalize();
        buf.extend_from_slice(&crc.to_le_bytes());

        trace!(bytes = buf.len(), fields = image.fields.len(), delta_only, "encoded record");
        Ok(buf)
    }

    fn field_names(&self, buf: &[u8]) -> Result<Option<Vec<String>>> {
        let frame = open(buf)?;
        Ok(Some(
            frame
                .header
                .fields
                .into_iter()
                .filter(|s| !s.removed)
                .map(|s| s.name)
                .collect(),
        ))
    }
}
