//! JSON-pointer key encoding for patch paths (RFC 6901).
//!
//! Map keys and list values become path segments (`/variables/{key}`,
//! `/binaryMediaTypes/{value}`), so `~` and `/` inside them must be escaped.

/// Encode a single path segment: `~` becomes `~0`, `/` becomes `~1`.
pub fn encode_key(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`encode_key`].
pub fn decode_key(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Append an encoded segment to a base path.
pub fn join(base: &str, key: &str) -> String {
    format!("{}/{}", base, encode_key(key))
}
