//! Content digests for the upload cache.
//!
//! The cache is keyed by what a file *contains*, not what it is called: two
//! byte-identical images under different names must collapse to one cache
//! entry and one upload. blake3 gives a stable, fast digest; the hex string
//! form keeps the cache file human-inspectable.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read chunk size for streaming digests. Large images should not be pulled
/// into memory whole just to be hashed.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the lowercase-hex blake3 digest of a file's bytes.
///
/// The digest depends only on content, never on the filename, mtime, or
/// path, so renamed copies of the same image share a cache entry.
pub fn digest_file(path: impl AsRef<Path>) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Digest an in-memory byte slice. Used by tests and by callers that already
/// hold the file contents.
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_is_filename_independent() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"identical-bytes").unwrap();
        std::fs::write(&b, b"identical-bytes").unwrap();

        assert_eq!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn digest_differs_for_different_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"one").unwrap();
        std::fs::write(&b, b"two").unwrap();

        assert_ne!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn streaming_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&payload).unwrap();
        drop(f);

        assert_eq!(digest_file(&path).unwrap(), digest_bytes(&payload));
    }

    #[test]
    fn digest_is_hex() {
        let d = digest_bytes(b"x");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
