//! Chunked blob store over a local filesystem directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use depot_core::config::blobstore::BlobStoreConfig;
use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::traits::{BlobPayload, BlobStore, ByteStream};
use depot_core::types::ContentId;

use super::manifest::BlobManifest;

/// Chunked blob store rooted at a local directory.
///
/// Objects live under `<root>/<bucket>/objects/<id>/` as fixed-size
/// `chunk_NNNNNN` files plus a [`BlobManifest`]. Uploads are assembled in
/// `<root>/<bucket>/staging/<id>/` and promoted with a single directory
/// rename, so an id only becomes addressable once every byte is on disk.
/// Deletes move the object directory back into staging before removing
/// it, so a half-deleted object is never addressable either.
#[derive(Debug, Clone)]
pub struct ChunkedBlobStore {
    /// Directory holding committed objects.
    objects_dir: PathBuf,
    /// Directory holding in-flight uploads and delete tombstones.
    staging_dir: PathBuf,
    /// Maximum bytes per chunk file.
    chunk_size: usize,
    /// Sync chunk files and the manifest to disk before commit.
    durable_writes: bool,
}

impl ChunkedBlobStore {
    /// Create a store rooted at `<root_path>/<bucket>`, creating the
    /// `objects/` and `staging/` directories if missing.
    pub async fn new(config: &BlobStoreConfig) -> AppResult<Self> {
        if config.chunk_size_bytes == 0 {
            return Err(AppError::invalid_argument(
                "chunk_size_bytes must be greater than zero",
            ));
        }

        let bucket_dir = PathBuf::from(&config.root_path).join(&config.bucket);
        let objects_dir = bucket_dir.join("objects");
        let staging_dir = bucket_dir.join("staging");
        for dir in [&objects_dir, &staging_dir] {
            fs::create_dir_all(dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::BlobWrite,
                    format!("Failed to create store directory: {}", dir.display()),
                    e,
                )
            })?;
        }

        Ok(Self {
            objects_dir,
            staging_dir,
            chunk_size: config.chunk_size_bytes as usize,
            durable_writes: config.durable_writes,
        })
    }

    /// Remove staging entries last touched before `older_than` ago.
    ///
    /// Covers uploads abandoned by a crash and delete tombstones whose
    /// final removal failed. Committed objects are never touched. Returns
    /// the number of entries removed.
    pub async fn sweep_staging(&self, older_than: Duration) -> AppResult<u64> {
        let cutoff = SystemTime::now()
            .checked_sub(older_than)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0u64;

        let mut dir = fs::read_dir(&self.staging_dir).await.map_err(|e| {
            AppError::with_source(ErrorKind::BlobWrite, "Failed to list staging directory", e)
        })?;

        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::BlobWrite, "Failed to read staging entry", e)
        })? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Lost a race with a concurrent commit or sweep.
                Err(_) => continue,
            };
            let modified = match meta.modified() {
                Ok(t) => t,
                Err(_) => continue,
            };
            if modified > cutoff {
                continue;
            }

            let path = entry.path();
            let result = if meta.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to sweep staging entry");
                }
            }
        }

        if removed > 0 {
            info!(removed, "Swept stale staging entries");
        }
        Ok(removed)
    }

    fn object_dir(&self, id: &ContentId) -> PathBuf {
        self.objects_dir.join(id.to_string())
    }

    fn staging_path(&self, id: &ContentId) -> PathBuf {
        self.staging_dir.join(id.to_string())
    }

    /// Drain the payload into a staging directory and return its manifest.
    async fn write_staged(
        &self,
        staging: &Path,
        payload: BlobPayload,
        name: &str,
    ) -> AppResult<BlobManifest> {
        fs::create_dir_all(staging).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BlobWrite,
                "Failed to create staging directory",
                e,
            )
        })?;

        let declared_len = payload.declared_len();
        let mut stream = payload.into_stream();
        let mut buf = BytesMut::new();
        let mut total_bytes = 0u64;
        let mut chunk_count = 0u32;

        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|e| {
                AppError::with_source(ErrorKind::BlobWrite, "Payload stream failed mid-upload", e)
            })?;
            total_bytes += piece.len() as u64;
            buf.extend_from_slice(&piece);
            while buf.len() >= self.chunk_size {
                let data = buf.split_to(self.chunk_size);
                self.write_chunk(staging, chunk_count, &data).await?;
                chunk_count += 1;
            }
        }
        if !buf.is_empty() {
            self.write_chunk(staging, chunk_count, &buf).await?;
            chunk_count += 1;
        }

        if let Some(declared) = declared_len {
            if declared != total_bytes {
                debug!(
                    declared,
                    actual = total_bytes,
                    "Declared payload length differed from bytes written"
                );
            }
        }

        let manifest = BlobManifest {
            name: name.to_string(),
            total_bytes,
            chunk_size: self.chunk_size as u64,
            chunk_count,
            created_at: Utc::now(),
        };
        self.write_file(
            &staging.join(BlobManifest::FILE_NAME),
            &serde_json::to_vec_pretty(&manifest).map_err(|e| {
                AppError::with_source(ErrorKind::BlobWrite, "Failed to encode manifest", e)
            })?,
        )
        .await?;

        Ok(manifest)
    }

    async fn write_chunk(&self, staging: &Path, index: u32, data: &[u8]) -> AppResult<()> {
        self.write_file(&staging.join(BlobManifest::chunk_file(index)), data)
            .await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> AppResult<()> {
        let describe = |verb: &str| format!("Failed to {verb} {}", path.display());

        let mut file = fs::File::create(path)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::BlobWrite, describe("create"), e))?;
        file.write_all(data)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::BlobWrite, describe("write"), e))?;
        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::BlobWrite, describe("flush"), e))?;
        if self.durable_writes {
            file.sync_all()
                .await
                .map_err(|e| AppError::with_source(ErrorKind::BlobWrite, describe("sync"), e))?;
        }
        Ok(())
    }

    async fn read_manifest(&self, dir: &Path, id: &ContentId) -> AppResult<BlobManifest> {
        let path = dir.join(BlobManifest::FILE_NAME);
        let raw = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::blob_not_found(format!("No stored object for content id {id}"))
            } else {
                AppError::with_source(
                    ErrorKind::BlobRead,
                    format!("Failed to read manifest for {id}"),
                    e,
                )
            }
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            AppError::with_source(ErrorKind::BlobRead, format!("Corrupt manifest for {id}"), e)
        })
    }

    /// Remove a staging directory after a failed upload, logging instead
    /// of masking the original error.
    async fn scrub_staging(&self, staging: &Path) {
        if let Err(e) = fs::remove_dir_all(staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %e, "Failed to clean staging directory");
            }
        }
    }
}

#[async_trait]
impl BlobStore for ChunkedBlobStore {
    async fn upload(&self, payload: BlobPayload, name: &str) -> AppResult<ContentId> {
        let id = ContentId::new();
        let staging = self.staging_path(&id);

        let manifest = match self.write_staged(&staging, payload, name).await {
            Ok(manifest) => manifest,
            Err(e) => {
                self.scrub_staging(&staging).await;
                return Err(e);
            }
        };

        // The rename is the commit point. Until it succeeds the id does
        // not resolve to anything.
        if let Err(e) = fs::rename(&staging, self.object_dir(&id)).await {
            self.scrub_staging(&staging).await;
            return Err(AppError::with_source(
                ErrorKind::BlobWrite,
                format!("Failed to commit object {id}"),
                e,
            ));
        }

        debug!(
            content_id = %id,
            bytes = manifest.total_bytes,
            chunks = manifest.chunk_count,
            "Stored blob"
        );
        Ok(id)
    }

    async fn download(&self, id: &ContentId) -> AppResult<ByteStream> {
        let dir = self.object_dir(id);
        let manifest = self.read_manifest(&dir, id).await?;

        let paths: Vec<PathBuf> = (0..manifest.chunk_count)
            .map(|index| dir.join(BlobManifest::chunk_file(index)))
            .collect();

        // Chunk files are opened lazily, one at a time, so serving a
        // large object never loads it into memory.
        let stream = stream::iter(paths)
            .then(|path| async move {
                let file = fs::File::open(&path).await?;
                Ok::<_, std::io::Error>(ReaderStream::new(file))
            })
            .try_flatten();

        Ok(Box::pin(stream))
    }

    async fn delete(&self, id: &ContentId) -> AppResult<()> {
        let tombstone = self.staging_dir.join(format!(".delete-{id}"));

        match fs::rename(self.object_dir(id), &tombstone).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(content_id = %id, "Delete of unknown blob ignored");
                return Ok(());
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::BlobWrite,
                    format!("Failed to unlink object {id}"),
                    e,
                ));
            }
        }

        fs::remove_dir_all(&tombstone).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BlobWrite,
                format!("Failed to remove object {id}"),
                e,
            )
        })?;
        debug!(content_id = %id, "Deleted blob");
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.objects_dir.is_dir() && self.staging_dir.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn test_config(root: &Path, chunk_size: u64) -> BlobStoreConfig {
        BlobStoreConfig {
            root_path: root.to_string_lossy().into_owned(),
            bucket: "fs".to_string(),
            chunk_size_bytes: chunk_size,
            durable_writes: false,
        }
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(piece) = stream.next().await {
            out.extend_from_slice(&piece.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_upload_download_round_trip_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        let data = Bytes::from_static(b"the quick brown fox jumps over the lazy dog");
        let id = store
            .upload(BlobPayload::from_bytes(data.clone()), "fox.txt")
            .await
            .unwrap();

        let body = collect(store.download(&id).await.unwrap()).await;
        assert_eq!(body, data);

        // 43 bytes at 8 bytes per chunk: six chunk files plus the manifest.
        let mut names: Vec<String> = std::fs::read_dir(store.object_dir(&id))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "chunk_000000",
                "chunk_000001",
                "chunk_000002",
                "chunk_000003",
                "chunk_000004",
                "chunk_000005",
                "manifest.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_items_are_repacked_into_fixed_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 5))
            .await
            .unwrap();

        let stream: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"defg")),
            Ok(Bytes::from_static(b"hijklm")),
        ]));
        let id = store
            .upload(BlobPayload::from_stream(stream, None), "mixed.bin")
            .await
            .unwrap();

        let body = collect(store.download(&id).await.unwrap()).await;
        assert_eq!(body, b"abcdefghijklm");

        let sizes: Vec<u64> = (0..3)
            .map(|index| {
                std::fs::metadata(store.object_dir(&id).join(BlobManifest::chunk_file(index)))
                    .unwrap()
                    .len()
            })
            .collect();
        assert_eq!(sizes, vec![5, 5, 3]);
    }

    #[tokio::test]
    async fn test_manifest_records_payload_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        let id = store
            .upload(
                BlobPayload::from_bytes(&b"abcdefghijklmnopqrst"[..]),
                "letters.bin",
            )
            .await
            .unwrap();

        let raw = std::fs::read(store.object_dir(&id).join(BlobManifest::FILE_NAME)).unwrap();
        let manifest: BlobManifest = serde_json::from_slice(&raw).unwrap();
        assert_eq!(manifest.name, "letters.bin");
        assert_eq!(manifest.total_bytes, 20);
        assert_eq!(manifest.chunk_size, 8);
        assert_eq!(manifest.chunk_count, 3);
    }

    #[tokio::test]
    async fn test_empty_payload_round_trips_with_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        let id = store
            .upload(BlobPayload::from_bytes(Bytes::new()), "empty.bin")
            .await
            .unwrap();

        let body = collect(store.download(&id).await.unwrap()).await;
        assert!(body.is_empty());

        let raw = std::fs::read(store.object_dir(&id).join(BlobManifest::FILE_NAME)).unwrap();
        let manifest: BlobManifest = serde_json::from_slice(&raw).unwrap();
        assert_eq!(manifest.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_durable_writes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), 8);
        config.durable_writes = true;
        let store = ChunkedBlobStore::new(&config).await.unwrap();

        let id = store
            .upload(BlobPayload::from_bytes(&b"synced to disk"[..]), "synced.txt")
            .await
            .unwrap();
        let body = collect(store.download(&id).await.unwrap()).await;
        assert_eq!(body, b"synced to disk");
    }

    #[tokio::test]
    async fn test_download_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        let err = store.download(&ContentId::new()).await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::BlobNotFound);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        let keep = store
            .upload(BlobPayload::from_bytes(&b"keep me"[..]), "keep.txt")
            .await
            .unwrap();
        let gone = store
            .upload(BlobPayload::from_bytes(&b"drop me"[..]), "gone.txt")
            .await
            .unwrap();

        store.delete(&gone).await.unwrap();
        store.delete(&gone).await.unwrap();
        store.delete(&ContentId::new()).await.unwrap();

        let err = store.download(&gone).await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::BlobNotFound);

        let body = collect(store.download(&keep).await.unwrap()).await;
        assert_eq!(body, b"keep me");
    }

    #[tokio::test]
    async fn test_torn_stream_leaves_nothing_addressable() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        let stream: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"partial payload ")),
            Err(std::io::Error::other("connection reset")),
        ]));
        let err = store
            .upload(BlobPayload::from_stream(stream, Some(64)), "torn.bin")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BlobWrite);

        assert_eq!(std::fs::read_dir(&store.objects_dir).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(&store.staging_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_staging_removes_stale_entries_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();

        // An abandoned upload and a delete tombstone left by a crash.
        std::fs::create_dir(store.staging_dir.join(ContentId::new().to_string())).unwrap();
        let tombstone = store.staging_dir.join(format!(".delete-{}", ContentId::new()));
        std::fs::create_dir(&tombstone).unwrap();
        std::fs::write(tombstone.join("chunk_000000"), b"x").unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let removed = store.sweep_staging(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(std::fs::read_dir(&store.staging_dir).unwrap().count(), 0);

        // Fresh entries survive a sweep with a real age floor.
        std::fs::create_dir(store.staging_dir.join(ContentId::new().to_string())).unwrap();
        let removed = store.sweep_staging(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(std::fs::read_dir(&store.staging_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_zero_chunk_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChunkedBlobStore::new(&test_config(dir.path(), 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_health_check_requires_store_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkedBlobStore::new(&test_config(dir.path(), 8))
            .await
            .unwrap();
        assert!(store.health_check().await.unwrap());

        std::fs::remove_dir_all(&store.staging_dir).unwrap();
        assert!(!store.health_check().await.unwrap());
    }
}
