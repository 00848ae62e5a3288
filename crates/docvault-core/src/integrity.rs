//! Content integrity: single-pass SHA-256 digests over upload streams.
//!
//! The digest and byte length are produced in the same pass that drains the
//! caller's content stream; content is never buffered twice. The module is
//! stateless: the same bytes always yield the same digest.

use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("Content exceeds size limit of {limit_bytes} bytes")]
    TooLarge { bytes_seen: u64, limit_bytes: u64 },

    #[error("IO error while reading content: {0}")]
    Io(#[from] std::io::Error),
}

/// Digest and length observed while draining a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDigest {
    /// Lowercase hex SHA-256 of the content.
    pub checksum: String,
    pub size_bytes: u64,
}

/// Compute the hex SHA-256 digest of a byte slice.
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Drains an `AsyncRead` while hashing and counting it.
///
/// Aborts with `TooLarge` as soon as the stream exceeds `limit_bytes`, so an
/// oversized upload never occupies more than `limit_bytes` of memory.
pub struct DigestingReader<R> {
    inner: R,
    limit_bytes: u64,
}

impl<R: AsyncRead + Unpin> DigestingReader<R> {
    pub fn new(inner: R, limit_bytes: u64) -> Self {
        Self { inner, limit_bytes }
    }

    /// Read the stream to EOF, returning the buffered content and its digest.
    pub async fn drain(mut self) -> Result<(Bytes, StreamDigest), IntegrityError> {
        let mut hasher = Sha256::new();
        let mut buffer = BytesMut::new();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            if buffer.len() as u64 + n as u64 > self.limit_bytes {
                return Err(IntegrityError::TooLarge {
                    bytes_seen: buffer.len() as u64 + n as u64,
                    limit_bytes: self.limit_bytes,
                });
            }
            hasher.update(&chunk[..n]);
            buffer.extend_from_slice(&chunk[..n]);
        }

        let size_bytes = buffer.len() as u64;
        Ok((
            buffer.freeze(),
            StreamDigest {
                checksum: hex::encode(hasher.finalize()),
                size_bytes,
            },
        ))
    }
}
