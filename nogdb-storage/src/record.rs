//! Record codec: encodes a property-id → bytes mapping into a blob with
//! variable-length per-property headers, prepending fixed-width fields for
//! edge src/dst and an optional version prefix.
//!
//! Block layout per property, host-native byte order throughout:
//!
//! ```text
//! +----------+----+-----------------+-----------+
//! | propId   | fl |  size (7/31 b)  |   value   |
//! | 16 bits  |    |                 | size bytes|
//! +----------+----+-----------------+-----------+
//! ```
//!
//! `fl = 0` packs `size << 1` into one byte (size < 128). `fl = 1` packs
//! `(size << 1) | 1` into a native-endian `u32` (size < 2^31). Block order
//! is insertion order, not propId order.

use crate::blob::Blob;
use nogdb_api::{ClassId, Error, PositionId, PropertyId, RecordId, Result};

pub const VERSION_PREFIX_LEN: usize = 8;
pub const SRC_DST_PREFIX_LEN: usize = 12;

/// A decoded property-list: insertion order preserved, as the spec requires
/// for block order in re-encoded records.
pub type PropertyList = Vec<(PropertyId, Vec<u8>)>;

fn encode_record_id(rid: RecordId) -> [u8; 6] {
    let mut out = [0u8; 6];
    out[0..2].copy_from_slice(&rid.class_id.to_ne_bytes());
    out[2..6].copy_from_slice(&rid.position_id.to_ne_bytes());
    out
}

fn decode_record_id(bytes: &[u8]) -> RecordId {
    let class_id = ClassId::from_ne_bytes(bytes[0..2].try_into().unwrap());
    let position_id = PositionId::from_ne_bytes(bytes[2..6].try_into().unwrap());
    RecordId::new(class_id, position_id)
}

/// Encodes the property-list portion of a record. An empty map encodes to
/// a single zero byte — the "no properties set" sentinel — so the payload
/// is never literally zero-length, which is what lets a caller tell "record
/// exists with no properties" apart from "record absent" by blob length.
pub fn encode_property_list(properties: &PropertyList) -> Result<Vec<u8>> {
    if properties.is_empty() {
        return Ok(vec![0u8]);
    }
    let mut out = Vec::new();
    for (prop_id, value) in properties {
        if value.is_empty() {
            return Err(Error::EmptyPropertyValue);
        }
        let size = value.len();
        if size >= (1usize << 31) {
            return Err(Error::Internal(format!(
                "property {prop_id} value too large: {size} bytes"
            )));
        }
        out.extend_from_slice(&prop_id.to_ne_bytes());
        if size < 128 {
            out.push(((size as u8) << 1) | 0);
        } else {
            let packed: u32 = ((size as u32) << 1) | 1;
            out.extend_from_slice(&packed.to_ne_bytes());
        }
        out.extend_from_slice(value);
    }
    Ok(out)
}

/// Decodes a property-list, skipping unknown property-ids is the caller's
/// job (the schema lookup happens above this layer); this just walks the
/// blocks. Stops as soon as fewer than 2 bytes remain, which is exactly
/// what the single-byte sentinel produces.
pub fn decode_property_list(bytes: &[u8]) -> Result<PropertyList> {
    let mut out = Vec::new();
    let mut off = 0usize;
    while off + 2 <= bytes.len() {
        let prop_id = PropertyId::from_ne_bytes(bytes[off..off + 2].try_into().unwrap());
        off += 2;
        if off >= bytes.len() {
            return Err(Error::Internal("truncated property header".into()));
        }
        let flag_byte = bytes[off];
        let size: usize;
        if flag_byte & 1 == 0 {
            size = (flag_byte >> 1) as usize;
            off += 1;
        } else {
            if off + 4 > bytes.len() {
                return Err(Error::Internal("truncated large property header".into()));
            }
            let packed = u32::from_ne_bytes(bytes[off..off + 4].try_into().unwrap());
            size = (packed >> 1) as usize;
            off += 4;
        }
        if off + size > bytes.len() {
            return Err(Error::Internal("truncated property value".into()));
        }
        out.push((prop_id, bytes[off..off + size].to_vec()));
        off += size;
    }
    Ok(out)
}

/// Encodes a vertex record blob: optional 8-byte version prefix, then the
/// property-list.
pub fn encode_vertex(version: Option<u64>, properties: &PropertyList) -> Result<Blob> {
    let payload = encode_property_list(properties)?;
    let prefix_len = if version.is_some() { VERSION_PREFIX_LEN } else { 0 };
    let mut blob = Blob::new(prefix_len + payload.len());
    if let Some(v) = version {
        blob.append(&v.to_ne_bytes());
    }
    blob.append(&payload);
    Ok(blob)
}

/// Encodes an edge record blob: optional 8-byte version prefix, then the
/// 12-byte src/dst region, then the property-list.
pub fn encode_edge(
    version: Option<u64>,
    src: RecordId,
    dst: RecordId,
    properties: &PropertyList,
) -> Result<Blob> {
    let payload = encode_property_list(properties)?;
    let prefix_len = if version.is_some() { VERSION_PREFIX_LEN } else { 0 };
    let mut blob = Blob::new(prefix_len + SRC_DST_PREFIX_LEN + payload.len());
    if let Some(v) = version {
        blob.append(&v.to_ne_bytes());
    }
    blob.append(&encode_record_id(src));
    blob.append(&encode_record_id(dst));
    blob.append(&payload);
    Ok(blob)
}

/// Reads the version prefix, if present. The version, when present, always
/// sits at offset 0.
pub fn get_version(bytes: &[u8], has_version: bool) -> Option<u64> {
    if !has_version || bytes.len() < VERSION_PREFIX_LEN {
        return None;
    }
    Some(u64::from_ne_bytes(
        bytes[0..VERSION_PREFIX_LEN].try_into().unwrap(),
    ))
}

/// Rewrites the version prefix in place; the rest of the blob is untouched.
pub fn set_version(bytes: &[u8], has_version: bool, v: u64) -> Vec<u8> {
    let mut out = bytes.to_vec();
    if has_version {
        out[0..VERSION_PREFIX_LEN].copy_from_slice(&v.to_ne_bytes());
    }
    out
}

fn src_dst_offset(has_version: bool) -> usize {
    if has_version { VERSION_PREFIX_LEN } else { 0 }
}

pub fn get_src(bytes: &[u8], has_version: bool) -> RecordId {
    let off = src_dst_offset(has_version);
    decode_record_id(&bytes[off..off + 6])
}

pub fn get_dst(bytes: &[u8], has_version: bool) -> RecordId {
    let off = src_dst_offset(has_version) + 6;
    decode_record_id(&bytes[off..off + 6])
}

pub fn set_src(bytes: &[u8], has_version: bool, rid: RecordId) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let off = src_dst_offset(has_version);
    out[off..off + 6].copy_from_slice(&encode_record_id(rid));
    out
}

pub fn set_dst(bytes: &[u8], has_version: bool, rid: RecordId) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let off = src_dst_offset(has_version) + 6;
    out[off..off + 6].copy_from_slice(&encode_record_id(rid));
    out
}

/// Offset where the property-list payload begins for a vertex or edge blob.
pub fn payload_offset(has_version: bool, is_edge: bool) -> usize {
    let mut off = if has_version { VERSION_PREFIX_LEN } else { 0 };
    if is_edge {
        off += SRC_DST_PREFIX_LEN;
    }
    off
}

/// Overwrites everything after the fixed prefixes, returning a new blob.
pub fn set_payload(bytes: &[u8], has_version: bool, is_edge: bool, new_payload: &[u8]) -> Vec<u8> {
    let off = payload_offset(has_version, is_edge);
    let mut out = Vec::with_capacity(off + new_payload.len());
    out.extend_from_slice(&bytes[..off]);
    out.extend_from_slice(new_payload);
    out
}
