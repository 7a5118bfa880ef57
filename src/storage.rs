//! Content-addressed blob storage: objects live under
//! `<root>/.linage/objects/<first 2 hex chars>/<remaining hex>`, written
//! once via a temp-file-then-rename so a reader never observes a partial
//! write. Puts are idempotent by digest.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::errors::{LinageError, Result};
use crate::hash::{Digest, Hasher};
use crate::utils::CountingReader;

/// On-disk, content-addressed object store rooted at `<repo>/.linage/objects`.
pub struct BlobStore {
    objects_dir: PathBuf,
    hasher: Hasher,
    object_count: AtomicU64,
}

impl BlobStore {
    pub fn open(objects_dir: impl Into<PathBuf>, hasher: Hasher) -> Result<Self> {
        let objects_dir = objects_dir.into();
        fs::create_dir_all(&objects_dir)?;
        let count = count_entries(&objects_dir)?;
        Ok(Self { objects_dir, hasher, object_count: AtomicU64::new(count) })
    }

    fn shard_path(&self, digest: &Digest) -> PathBuf {
        let hex = digest.to_hex();
        let (shard, rest) = hex.split_at(2);
        self.objects_dir.join(shard).join(rest)
    }

    /// Writes `bytes` under its content digest. Idempotent: an existing
    /// blob with the same digest is left untouched.
    pub fn put(&self, bytes: &[u8]) -> Result<Digest> {
        let digest = self.hasher.hash_bytes(bytes);
        let path = self.shard_path(&digest);
        if path.exists() {
            return Ok(digest);
        }
        self.write_atomic(&path, bytes)?;
        self.object_count.fetch_add(1, Ordering::Relaxed);
        debug!(digest = %digest, "blob stored");
        Ok(digest)
    }

    /// Streams `reader` to a temp file while hashing it, then renames into
    /// place. Avoids buffering the whole stream in memory.
    pub fn put_stream<R: Read>(&self, reader: R) -> Result<Digest> {
        let mut counting = CountingReader::new(reader);
        let tmp_path = self.objects_dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        let mut buf = [0u8; 64 * 1024];
        let mut tmp_file = fs::File::create(&tmp_path)?;
        let mut hash_buf = Vec::new();

        loop {
            let n = counting.read(&mut buf)?;
            if n == 0 {
                break;
            }
            tmp_file.write_all(&buf[..n])?;
            hash_buf.extend_from_slice(&buf[..n]);
        }
        tmp_file.flush()?;
        drop(tmp_file);

        let digest = self.hasher.hash_bytes(&hash_buf);
        let final_path = self.shard_path(&digest);

        if final_path.exists() {
            fs::remove_file(&tmp_path)?;
            return Ok(digest);
        }

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&tmp_path, &final_path)?;
        self.object_count.fetch_add(1, Ordering::Relaxed);
        debug!(digest = %digest, "blob stored via stream");
        Ok(digest)
    }

    fn write_atomic(&self, final_path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.objects_dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(bytes)?;
            f.flush()?;
        }
        fs::rename(&tmp_path, final_path)?;
        Ok(())
    }

    pub fn get(&self, digest: &Digest) -> Result<Vec<u8>> {
        let path = self.shard_path(digest);
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LinageError::NotFound(format!("blob {digest}")),
            _ => LinageError::IoError(e),
        })
    }

    pub fn open_reader(&self, digest: &Digest) -> Result<impl Read> {
        let path = self.shard_path(digest);
        fs::File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LinageError::NotFound(format!("blob {digest}")),
            _ => LinageError::IoError(e),
        })
    }

    pub fn exists(&self, digest: &Digest) -> bool {
        self.shard_path(digest).exists()
    }

    pub fn size(&self, digest: &Digest) -> Result<u64> {
        let path = self.shard_path(digest);
        let meta = fs::metadata(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LinageError::NotFound(format!("blob {digest}")),
            _ => LinageError::IoError(e),
        })?;
        Ok(meta.len())
    }

    pub fn count(&self) -> u64 {
        self.object_count.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> Result<u64> {
        let mut total = 0u64;
        for shard in fs::read_dir(&self.objects_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                total += entry?.metadata()?.len();
            }
        }
        Ok(total)
    }

    pub fn delete(&self, digest: &Digest) -> Result<()> {
        let path = self.shard_path(digest);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LinageError::NotFound(format!("blob {digest}")),
            _ => LinageError::IoError(e),
        })?;
        self.object_count.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn hasher(&self) -> Hasher {
        self.hasher
    }
}

fn count_entries(objects_dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for shard in fs::read_dir(objects_dir)? {
        let shard = shard?;
        if shard.file_type()?.is_dir() {
            total += fs::read_dir(shard.path())?.count() as u64;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;

    fn store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path().join("objects"), Hasher::new(HashAlgorithm::Sha256)).unwrap();
        (dir, store)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, store) = store();
        let digest = store.put(b"hello\n").unwrap();
        assert_eq!(store.get(&digest).unwrap(), b"hello\n");
        assert!(store.exists(&digest));
    }

    #[test]
    fn idempotent_put_leaves_count_unchanged() {
        let (_dir, store) = store();
        store.put(b"same content").unwrap();
        store.put(b"same content").unwrap();
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn missing_digest_is_not_found() {
        let (_dir, store) = store();
        let digest = Hasher::new(HashAlgorithm::Sha256).hash_bytes(b"never stored");
        assert!(matches!(store.get(&digest), Err(LinageError::NotFound(_))));
    }

    #[test]
    fn put_stream_matches_put() {
        let (_dir, store) = store();
        let d1 = store.put(b"stream me").unwrap();
        let d2 = store.put_stream(std::io::Cursor::new(b"stream me")).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn put_stream_accepts_an_async_source_via_sync_bridge() {
        use tokio::io::AsyncReadExt;

        let (_dir, store) = store();
        let async_reader = tokio::io::repeat(b'a').take(16);
        let sync_reader = tokio_util::io::SyncIoBridge::new(async_reader);
        let (store, digest) = tokio::task::spawn_blocking(move || {
            let digest = store.put_stream(sync_reader).unwrap();
            (store, digest)
        })
        .await
        .unwrap();
        assert_eq!(store.size(&digest).unwrap(), 16);
    }

    #[test]
    fn delete_removes_blob() {
        let (_dir, store) = store();
        let digest = store.put(b"gone soon").unwrap();
        store.delete(&digest).unwrap();
        assert!(!store.exists(&digest));
    }
}
