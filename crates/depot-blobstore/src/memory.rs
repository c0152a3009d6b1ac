//! In-memory blob store for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::traits::{BlobPayload, BlobStore, ByteStream};
use depot_core::types::ContentId;

/// Blob store holding everything in process memory.
///
/// Intended for tests and local experiments. Contents vanish with the
/// process; the observable contract matches the chunked store, including
/// idempotent deletes and store-minted content ids.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<ContentId, (String, Bytes)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Name and bytes of a stored object, if present.
    pub fn get(&self, id: &ContentId) -> Option<(String, Bytes)> {
        self.objects().get(id).cloned()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<ContentId, (String, Bytes)>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, payload: BlobPayload, name: &str) -> AppResult<ContentId> {
        let mut stream = payload.into_stream();
        let mut buf = BytesMut::new();
        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|e| {
                AppError::with_source(ErrorKind::BlobWrite, "Payload stream failed mid-upload", e)
            })?;
            buf.extend_from_slice(&piece);
        }

        let id = ContentId::new();
        self.objects().insert(id, (name.to_string(), buf.freeze()));
        Ok(id)
    }

    async fn download(&self, id: &ContentId) -> AppResult<ByteStream> {
        let bytes = self
            .objects()
            .get(id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| {
                AppError::blob_not_found(format!("No stored object for content id {id}"))
            })?;
        Ok(Box::pin(stream::once(async move {
            Ok::<_, std::io::Error>(bytes)
        })))
    }

    async fn delete(&self, id: &ContentId) -> AppResult<()> {
        self.objects().remove(id);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
