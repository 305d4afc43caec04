//! gzip payload encoding shared by the HTTP transports

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GunzipError {
    #[error("decompressed body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("invalid gzip data: {0}")]
    Invalid(#[from] io::Error),
}

pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress at most `limit` bytes. Output past the limit is never buffered.
pub fn gunzip(data: &[u8], limit: usize) -> Result<Vec<u8>, GunzipError> {
    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut decoded)?;
    if decoded.len() > limit {
        return Err(GunzipError::TooLarge { limit });
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_gunzip() {
        let body = br#"{"jsonrpc":"2.0","method":"ping","id":1}"#;
        let compressed = gzip(body).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip(&compressed, body.len()).unwrap(), body.to_vec());
    }

    #[test]
    fn test_gunzip_stops_at_limit() {
        // 16 MiB of spaces shrinks to a few KiB
        let compressed = gzip(&vec![b' '; 16 * 1024 * 1024]).unwrap();
        assert!(compressed.len() < 64 * 1024);

        match gunzip(&compressed, 1024) {
            Err(GunzipError::TooLarge { limit }) => assert_eq!(limit, 1024),
            other => panic!("expected TooLarge, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_gunzip_rejects_garbage() {
        assert!(matches!(gunzip(b"not gzip", 1024), Err(GunzipError::Invalid(_))));
    }
}
