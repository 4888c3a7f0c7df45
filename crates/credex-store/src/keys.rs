//! Key construction and cursor encoding.
//!
//! Secondary-index entries are stored under `{dimension}/{key}/{index}`;
//! listing a dimension is a lexicographic range scan over that prefix.
//! Cursors are hex-encoded continuation keys: opaque to callers, stable
//! across backends.

use crate::error::{Result, StoreError};

/// The range-scan prefix for one dimension key: `{dimension}/{key}/`.
pub fn dimension_prefix(dimension: &str, key: &str) -> String {
    format!("{}/{}/", dimension, key)
}

/// The exclusive upper bound for a prefix range scan.
///
/// Returns `None` when no finite upper bound exists (prefix of all 0xff
/// bytes), in which case the scan is unbounded above.
pub fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(&last) = bytes.last() {
        if last < 0xff {
            *bytes.last_mut()? = last + 1;
            // Prefixes are ASCII key material; the increment stays ASCII.
            return String::from_utf8(bytes).ok();
        }
        bytes.pop();
    }
    None
}

/// Encode a continuation key as an opaque cursor.
pub fn encode_cursor(key: &str) -> String {
    hex::encode(key.as_bytes())
}

/// Decode an opaque cursor back to its continuation key.
pub fn decode_cursor(cursor: &str) -> Result<String> {
    let bytes =
        hex::decode(cursor).map_err(|_| StoreError::InvalidCursor(cursor.to_string()))?;
    String::from_utf8(bytes).map_err(|_| StoreError::InvalidCursor(cursor.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_prefix_shape() {
        assert_eq!(dimension_prefix("source", "CS101"), "source/CS101/");
        assert_eq!(dimension_prefix("status", "approved"), "status/approved/");
    }

    #[test]
    fn test_prefix_upper_bound_covers_prefix_range() {
        let prefix = dimension_prefix("source", "CS101");
        let upper = prefix_upper_bound(&prefix).unwrap();
        assert_eq!(upper, "source/CS1010");

        // Every key with the prefix sorts below the bound.
        assert!("source/CS101/1".to_string() >= prefix);
        assert!("source/CS101/999".to_string() < upper);
        // Keys of a sibling dimension key sort outside the range.
        assert!("source/CS102/1".to_string() >= upper);
    }

    #[test]
    fn test_cursor_roundtrip() {
        let key = "status/approved/15";
        let cursor = encode_cursor(key);
        assert_ne!(cursor, key);
        assert_eq!(decode_cursor(&cursor).unwrap(), key);
    }

    #[test]
    fn test_decode_cursor_rejects_garbage() {
        assert!(decode_cursor("not-hex!").is_err());
    }
}
