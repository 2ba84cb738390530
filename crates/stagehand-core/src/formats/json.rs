//! JSON codec for stage snapshots and metadata records.

use super::compress::{compress, decompress};
use super::{Codec, read_bytes, write_bytes};
use crate::{Compression, StagehandError};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::path::Path;

/// Pretty-printed JSON (4-space indent), optionally compressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    compress: Option<Compression>,
}

impl JsonCodec {
    /// Plain JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self { compress: None }
    }

    /// JSON codec wrapping its payload in `compress`.
    #[must_use]
    pub const fn compressed(compress: Option<Compression>) -> Self {
        Self { compress }
    }

    /// Get the compression kind.
    #[must_use]
    pub const fn compression(&self) -> Option<Compression> {
        self.compress
    }
}

impl Codec for JsonCodec {
    fn read(&self, path: &Path) -> Result<Value, StagehandError> {
        let decode = |reason: String| StagehandError::Decode {
            path: path.to_path_buf(),
            reason,
        };
        let raw = read_bytes(path)?;
        let bytes = decompress(self.compress, &raw).map_err(decode)?;
        serde_json::from_slice(&bytes).map_err(|e| decode(e.to_string()))
    }

    fn write(&self, path: &Path, value: &Value) -> Result<(), StagehandError> {
        let encode = |reason: String| StagehandError::Encode {
            path: path.to_path_buf(),
            reason,
        };
        let mut text = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut text, PrettyFormatter::with_indent(b"    "));
        value
            .serialize(&mut serializer)
            .map_err(|e| encode(e.to_string()))?;
        let bytes = compress(self.compress, &text).map_err(encode)?;
        write_bytes(path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_then_read_keeps_key_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/conn.json");
        let value = json!({"zeta": 1, "alpha": [true, null], "mid": {"b": 1, "a": 2}});

        JsonCodec::new().write(&path, &value).expect("write");
        let text = std::fs::read_to_string(&path).expect("read text");
        assert!(text.contains("\n    \"zeta\": 1"));

        let back = JsonCodec::new().read(&path).expect("read");
        let keys: Vec<_> = back.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(back, value);
    }

    #[test]
    fn gzip_payload_is_transparent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conn.json");
        let codec = JsonCodec::compressed(Some(Compression::Gzip));

        codec.write(&path, &json!({"a": 1})).expect("write");
        assert!(serde_json::from_slice::<Value>(&std::fs::read(&path).expect("raw")).is_err());
        assert_eq!(codec.read(&path).expect("read"), json!({"a": 1}));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = JsonCodec::new().read(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(StagehandError::NotFound(_))));
    }

    #[test]
    fn garbage_is_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            JsonCodec::new().read(&path),
            Err(StagehandError::Decode { .. })
        ));
    }

    #[test]
    fn unsupported_compression_is_encode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let codec = JsonCodec::compressed(Some(Compression::Xz));
        assert!(matches!(
            codec.write(&dir.path().join("x.json"), &json!({})),
            Err(StagehandError::Encode { .. })
        ));
    }
}
