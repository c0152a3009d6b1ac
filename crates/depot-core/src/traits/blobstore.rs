//! Blob store trait for pluggable binary content backends.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;
use crate::types::ContentId;

/// A byte stream type used for reading and writing blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// The content of an upload: a byte stream plus the length the caller
/// reported for it, when known.
///
/// The declared length is advisory. Stores write whatever the stream
/// yields; callers that record sizes fall back to 0 when no length was
/// declared.
pub struct BlobPayload {
    stream: ByteStream,
    declared_len: Option<u64>,
}

impl BlobPayload {
    /// Create a payload from an in-memory buffer. The declared length is
    /// the buffer length.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let bytes = data.into();
        let declared_len = Some(bytes.len() as u64);
        Self {
            stream: Box::pin(futures::stream::once(
                async move { Ok::<_, std::io::Error>(bytes) },
            )),
            declared_len,
        }
    }

    /// Create a payload from a stream and an optional reported length.
    pub fn from_stream(stream: ByteStream, declared_len: Option<u64>) -> Self {
        Self {
            stream,
            declared_len,
        }
    }

    /// The length the caller reported for this payload, if any.
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }

    /// Consume the payload, yielding the underlying stream.
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }
}

impl fmt::Debug for BlobPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobPayload")
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Trait for blob storage backends.
///
/// Implementations exist for the chunked local filesystem store and an
/// in-memory store. The trait is defined here in `depot-core` and
/// implemented in `depot-blobstore`.
///
/// Content identifiers are minted by the store on upload; callers never
/// choose them. A failed upload must never leave a retrievable object
/// behind.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug + 'static {
    /// Consume the payload and store it, returning the new content id.
    async fn upload(&self, payload: BlobPayload, name: &str) -> AppResult<ContentId>;

    /// Open the blob for reading as a forward-sequential byte stream.
    ///
    /// Returns a `BlobNotFound` error when no blob exists under the id.
    async fn download(&self, id: &ContentId) -> AppResult<ByteStream>;

    /// Delete the blob. Deleting an unknown id is a success.
    async fn delete(&self, id: &ContentId) -> AppResult<()>;

    /// Check whether the store is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_payload_from_bytes_declares_length() {
        let payload = BlobPayload::from_bytes(&b"hello world"[..]);
        assert_eq!(payload.declared_len(), Some(11));

        let mut stream = payload.into_stream();
        let chunk = stream.next().await.expect("one chunk").expect("ok chunk");
        assert_eq!(&chunk[..], b"hello world");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_payload_from_stream_keeps_reported_length() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]));
        let payload = BlobPayload::from_stream(stream, None);
        assert_eq!(payload.declared_len(), None);
    }
}
