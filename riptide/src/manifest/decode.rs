//! Tolerant manifest decoding.
//!
//! The manifest wire format is loose: key casing varies between CDN
//! deployments, and numeric fields sometimes arrive as strings. Decoding
//! therefore walks a generic `serde_json::Value` tree with case-insensitive
//! key lookup instead of binding typed structs to the wire shape.

use serde_json::Value;
use tracing::{debug, warn};

use super::fetch::ManifestError;
use super::{ChunkRange, ResourceEntry, ResourceIndex};

/// Decode a manifest document into a [`ResourceIndex`].
///
/// The top-level object must contain a `resource` array (key matched
/// case-insensitively). Non-object array elements and non-object chunk items
/// are skipped silently; entries with empty or whitespace `dest` are dropped.
pub fn decode_index(body: &[u8]) -> Result<ResourceIndex, ManifestError> {
    let root: Value = serde_json::from_slice(body)?;

    let items = get_ci(&root, "resource")
        .and_then(Value::as_array)
        .ok_or(ManifestError::MissingResource)?;
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        if !item.is_object() {
            continue;
        }

        let dest = get_ci(item, "dest")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if dest.trim().is_empty() {
            warn!("dropping manifest entry with empty dest");
            continue;
        }

        let checksum = get_ci(item, "md5")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let size = get_ci(item, "size").and_then(lenient_u64).unwrap_or(0);

        let chunks = match get_ci(item, "chunkInfos").and_then(Value::as_array) {
            Some(raw) => decode_chunks(raw),
            None => Vec::new(),
        };

        entries.push(ResourceEntry {
            dest: dest.to_string(),
            checksum,
            size,
            chunks,
        });
    }

    debug!(entries = entries.len(), "decoded resource index");
    Ok(ResourceIndex { entries })
}

fn decode_chunks(raw: &[Value]) -> Vec<ChunkRange> {
    let mut chunks = Vec::with_capacity(raw.len());
    for item in raw {
        if !item.is_object() {
            continue;
        }
        chunks.push(ChunkRange {
            start: get_ci(item, "start").and_then(lenient_u64).unwrap_or(0),
            end: get_ci(item, "end").and_then(lenient_u64).unwrap_or(0),
            checksum: get_ci(item, "md5")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        });
    }
    chunks
}

/// Case-insensitive object key lookup.
fn get_ci<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Accept a JSON number or a numeric string.
fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_index() {
        let body = br#"{
            "resource": [
                {"dest": "a/b.bin", "md5": "deadbeef", "size": 100},
                {"dest": "c.pak", "size": "2048"}
            ]
        }"#;

        let index = decode_index(body).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.entries[0].dest, "a/b.bin");
        assert_eq!(index.entries[0].checksum.as_deref(), Some("deadbeef"));
        assert_eq!(index.entries[0].size, 100);
        assert_eq!(index.entries[1].size, 2048);
        assert!(index.entries[1].checksum.is_none());
    }

    #[test]
    fn test_decode_case_insensitive_keys() {
        let body = br#"{
            "Resource": [
                {"Dest": "d.bin", "MD5": "abc", "SIZE": 7}
            ]
        }"#;

        let index = decode_index(body).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries[0].dest, "d.bin");
        assert_eq!(index.entries[0].checksum.as_deref(), Some("abc"));
        assert_eq!(index.entries[0].size, 7);
    }

    #[test]
    fn test_decode_drops_blank_dest() {
        let body = br#"{
            "resource": [
                {"dest": "", "size": 1},
                {"dest": "   ", "size": 2},
                {"size": 3},
                {"dest": "keep.bin", "size": 4}
            ]
        }"#;

        let index = decode_index(body).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries[0].dest, "keep.bin");
    }

    #[test]
    fn test_decode_chunk_infos() {
        let body = br#"{
            "resource": [
                {
                    "dest": "big.pak",
                    "size": 100,
                    "chunkInfos": [
                        {"start": 0, "end": 49, "md5": "aa"},
                        {"start": "50", "end": "99"},
                        "not an object"
                    ]
                }
            ]
        }"#;

        let index = decode_index(body).unwrap();
        let entry = &index.entries[0];
        assert!(entry.is_chunked());
        assert_eq!(entry.chunks.len(), 2);
        assert_eq!(entry.chunks[0].start, 0);
        assert_eq!(entry.chunks[0].end, 49);
        assert_eq!(entry.chunks[0].checksum.as_deref(), Some("aa"));
        assert_eq!(entry.chunks[1].start, 50);
        assert_eq!(entry.chunks[1].end, 99);
        assert!(entry.chunks[1].checksum.is_none());
    }

    #[test]
    fn test_decode_skips_non_object_entries() {
        let body = br#"{"resource": [42, "x", {"dest": "f.bin", "size": 1}]}"#;
        let index = decode_index(body).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_decode_missing_resource_key() {
        let body = br#"{"other": []}"#;
        assert!(matches!(
            decode_index(body),
            Err(ManifestError::MissingResource)
        ));
    }

    #[test]
    fn test_decode_resource_not_an_array() {
        let body = br#"{"resource": {"dest": "a"}}"#;
        assert!(matches!(
            decode_index(body),
            Err(ManifestError::MissingResource)
        ));
    }

    #[test]
    fn test_decode_malformed_json() {
        let body = b"{not json";
        assert!(matches!(decode_index(body), Err(ManifestError::Json(_))));
    }
}
