//! File-based image storage
//!
//! Every write lands in a temporary file next to its entry and is renamed
//! over `<key>.jpg` once complete, so readers never see a partial image.

use crate::error::{Result, StoreError};
use crate::key::CacheKey;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// Extension every cached image is stored under
const IMAGE_EXTENSION: &str = "jpg";

/// Suffix of in-progress writes; never produced by `path_for`
const TEMP_EXTENSION: &str = "tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Image store rooted at a single cache directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    cache_dir: PathBuf,
}

impl ImageStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Ensure the cache directory exists, creating parents as needed.
    ///
    /// Returns `true` if the directory had to be created. Only called at
    /// startup; the other operations assume the directory is present.
    pub async fn init(&self) -> Result<bool> {
        match fs::metadata(&self.cache_dir).await {
            Ok(meta) if meta.is_dir() => {
                debug!(cache_dir = ?self.cache_dir, "Cache directory already exists");
                Ok(false)
            }
            Ok(_) => Err(StoreError::NotADirectory(self.cache_dir.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.cache_dir).await?;
                info!(cache_dir = ?self.cache_dir, "Created cache directory");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Path of the entry for `key`
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", key.as_str(), IMAGE_EXTENSION))
    }

    /// Unique scratch path for a write to `key`
    fn temp_path_for(&self, key: &CacheKey) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.cache_dir.join(format!(
            "{}.{}.{}-{}.{}",
            key.as_str(),
            IMAGE_EXTENSION,
            std::process::id(),
            n,
            TEMP_EXTENSION
        ))
    }

    /// Whether a regular file is stored for `key`
    pub async fn exists(&self, key: &CacheKey) -> bool {
        fs::metadata(self.path_for(key))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Read a cached image. Absent and unreadable entries are both `NotFound`.
    pub async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(data) => {
                debug!(key = %key, size = data.len(), "Read cached image");
                Ok(data)
            }
            Err(e) => {
                debug!(key = %key, path = ?path, error = %e, "Cached image unavailable");
                Err(StoreError::NotFound(path))
            }
        }
    }

    /// Replace the entry for `key` with `data`.
    ///
    /// On failure the previous entry, if any, is left as it was.
    pub async fn write(&self, key: &CacheKey, data: &[u8]) -> Result<()> {
        let mut sink = self.stream_write(key).await?;
        if let Err(e) = sink.write_chunk(data).await {
            sink.abort().await;
            return Err(e);
        }
        sink.finish().await?;

        debug!(key = %key, size = data.len(), "Wrote cached image");
        Ok(())
    }

    /// Remove the entry for `key`.
    pub async fn delete(&self, key: &CacheKey) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, path = ?path, "Deleted cached image");
                Ok(())
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(key = %key, path = ?path, error = %e, "Failed to delete cached image");
                }
                Err(StoreError::NotFound(path))
            }
        }
    }

    /// Open a streaming write for `key`.
    ///
    /// Bytes pushed into the returned sink go to a scratch file; the entry is
    /// only replaced when the sink is finished.
    pub async fn stream_write(&self, key: &CacheKey) -> Result<ImageSink> {
        let temp_path = self.temp_path_for(key);
        let file = fs::File::create(&temp_path).await?;
        Ok(ImageSink {
            path: self.path_for(key),
            temp_path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Pipe a byte stream into the entry for `key`.
    ///
    /// Returns the number of bytes written. If the stream yields an error or a
    /// chunk cannot be written, the scratch file is removed and the error is
    /// returned.
    pub async fn write_stream<S, B, E>(&self, key: &CacheKey, mut stream: S) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut sink = self.stream_write(key).await?;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    sink.abort().await;
                    return Err(std::io::Error::other(e).into());
                }
            };

            if let Err(e) = sink.write_chunk(chunk.as_ref()).await {
                sink.abort().await;
                return Err(e);
            }
        }

        sink.finish().await
    }
}

/// Destination of a streaming write into the store
pub struct ImageSink {
    path: PathBuf,
    temp_path: PathBuf,
    writer: BufWriter<fs::File>,
    written: u64,
}

impl ImageSink {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush to disk and move the scratch file over the entry; the write has
    /// succeeded once this returns `Ok`.
    pub async fn finish(self) -> Result<u64> {
        let ImageSink {
            path,
            temp_path,
            mut writer,
            written,
        } = self;

        let flushed = writer.flush().await;
        drop(writer);

        let result = match flushed {
            Ok(()) => fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            remove_temp(&temp_path).await;
            return Err(e.into());
        }

        debug!(path = ?path, size = written, "Finished streaming write");
        Ok(written)
    }

    /// Drop the sink and discard whatever was written so far.
    pub async fn abort(self) {
        let ImageSink {
            temp_path, writer, ..
        } = self;
        drop(writer);
        remove_temp(&temp_path).await;
    }
}

async fn remove_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        warn!(path = ?temp_path, error = %e, "Failed to remove partial image");
    }
}
