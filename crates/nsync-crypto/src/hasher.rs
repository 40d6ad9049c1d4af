use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use nsync_types::ContentDigest;
use tracing::trace;

/// Read buffer size used when streaming a file through the hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Computes content digests of files on disk.
///
/// The staging area only ever hashes through this trait, which lets callers
/// substitute an instrumented implementation (for example one that counts
/// invocations) without touching the classification logic.
pub trait FileHasher: Send + Sync {
    /// Hash the full contents of the file at `path`.
    fn hash_file(&self, path: &Path) -> Result<ContentDigest, HashError>;
}

/// BLAKE3 content hasher.
///
/// Files are streamed in fixed [`CHUNK_SIZE`] chunks so arbitrarily large
/// documents never have to fit in memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    pub const fn new() -> Self {
        Self
    }

    /// Hash an in-memory byte slice.
    pub fn hash_bytes(data: &[u8]) -> ContentDigest {
        ContentDigest::from_hash(*blake3::hash(data).as_bytes())
    }

    /// Hash everything readable from `reader`.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentDigest> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(ContentDigest::from_hash(*hasher.finalize().as_bytes()))
    }
}

impl FileHasher for ContentHasher {
    fn hash_file(&self, path: &Path) -> Result<ContentDigest, HashError> {
        let file = File::open(path).map_err(|source| HashError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let digest = Self::hash_reader(file).map_err(|source| HashError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        trace!(path = %path.display(), digest = %digest.short_hex(), "hashed file");
        Ok(digest)
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// The underlying I/O error kind.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Io { source, .. } => source.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_is_deterministic() {
        let a = ContentHasher::hash_bytes(b"hello world");
        let b = ContentHasher::hash_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_produces_different_digests() {
        assert_ne!(
            ContentHasher::hash_bytes(b"hello"),
            ContentHasher::hash_bytes(b"hello world")
        );
    }

    #[test]
    fn file_hash_matches_byte_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, b"hello").unwrap();

        let digest = ContentHasher.hash_file(&path).unwrap();
        assert_eq!(digest, ContentHasher::hash_bytes(b"hello"));
        assert_eq!(digest.to_hex().len(), 64);
    }

    #[test]
    fn streams_files_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.md");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let mut file = File::create(&path).unwrap();
        file.write_all(&data).unwrap();
        drop(file);

        assert_eq!(
            ContentHasher.hash_file(&path).unwrap(),
            ContentHasher::hash_bytes(&data)
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentHasher
            .hash_file(&dir.path().join("missing.md"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
