//! SHA-256 content digests
//!
//! File and in-memory digests use the same algorithm and encoding, so bytes
//! hashed while on disk match bytes hashed as they came off the network.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::types::ContentDigest;

/// Read buffer size for streaming digests
const CHUNK_SIZE: usize = 4 * 1024;

fn finish(hasher: Sha256) -> ContentDigest {
    ContentDigest::from_sha256_hex(format!("{:x}", hasher.finalize()))
}

/// Digest of an in-memory buffer
pub fn digest_bytes(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    finish(hasher)
}

/// Digest of everything readable from `reader`, consumed in fixed-size chunks
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(finish(hasher))
}

/// Digest of a file's contents
pub fn digest_file(path: &Path) -> std::io::Result<ContentDigest> {
    let file = std::fs::File::open(path)?;
    digest_reader(file)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn known_vector() {
        assert_eq!(digest_bytes(b"hello").as_str(), HELLO_SHA256);
    }

    #[test]
    fn empty_input() {
        assert_eq!(
            digest_bytes(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest_reader(std::io::empty()).unwrap(), digest_bytes(b""));
    }

    #[test]
    fn streaming_matches_buffer_across_chunk_boundaries() {
        // Not a multiple of CHUNK_SIZE so the last read is partial
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = digest_reader(std::io::Cursor::new(&data)).unwrap();
        assert_eq!(streamed, digest_bytes(&data));
    }

    #[test]
    fn file_matches_buffer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();
        assert_eq!(digest_file(file.path()).unwrap().as_str(), HELLO_SHA256);
    }

    #[test]
    fn concurrent_digests_do_not_interfere() {
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                std::thread::spawn(move || {
                    let data = vec![i; 10_000];
                    (digest_reader(std::io::Cursor::new(&data)).unwrap(), digest_bytes(&data))
                })
            })
            .collect();
        for handle in handles {
            let (streamed, buffered) = handle.join().unwrap();
            assert_eq!(streamed, buffered);
        }
    }
}
