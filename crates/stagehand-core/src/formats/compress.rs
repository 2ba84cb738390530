//! Compression wrappers for codec payloads.
//!
//! Only the gzip family is implemented. The other kinds are valid filename
//! tokens but fail here with a readable reason.

use crate::Compression;
use flate2::Compression as Level;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

pub(crate) fn compress(kind: Option<Compression>, bytes: &[u8]) -> Result<Vec<u8>, String> {
    match kind {
        None => Ok(bytes.to_vec()),
        Some(Compression::Gzip | Compression::Gz) => {
            let mut encoder = GzEncoder::new(Vec::new(), Level::default());
            encoder.write_all(bytes).map_err(|e| e.to_string())?;
            encoder.finish().map_err(|e| e.to_string())
        }
        Some(other) => Err(unsupported(other)),
    }
}

pub(crate) fn decompress(kind: Option<Compression>, bytes: &[u8]) -> Result<Vec<u8>, String> {
    match kind {
        None => Ok(bytes.to_vec()),
        Some(Compression::Gzip | Compression::Gz) => {
            let mut out = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(|e| e.to_string())?;
            Ok(out)
        }
        Some(other) => Err(unsupported(other)),
    }
}

fn unsupported(kind: Compression) -> String {
    format!("unsupported compression: {kind}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip() {
        let packed = compress(Some(Compression::Gzip), b"{\"a\": 1}").expect("compress");
        assert_ne!(packed.as_slice(), b"{\"a\": 1}");
        let unpacked = decompress(Some(Compression::Gz), &packed).expect("decompress");
        assert_eq!(unpacked.as_slice(), b"{\"a\": 1}");
    }

    #[test]
    fn other_kinds_are_unsupported() {
        for kind in [Compression::Bz2, Compression::Xz, Compression::Zip, Compression::Rar] {
            let err = compress(Some(kind), b"x").expect_err("unsupported");
            assert!(err.contains(kind.as_str()));
        }
    }
}
