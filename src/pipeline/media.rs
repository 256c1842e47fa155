use crate::config::PipelineConfig;
use crate::error::Error;
use crate::frigate::{Event, FrigateClient};
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Largest clip the chat channel accepts (50 MiB); clips this size or larger are dropped
pub const MAX_CLIP_BYTES: u64 = 50 * 1024 * 1024;

/// Whether a payload of `len` bytes stays under `limit`
pub fn within_limit(len: u64, limit: u64) -> bool {
    len < limit
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Image => ".jpg",
            Self::Video => ".mp4",
        }
    }

    /// Name the file is uploaded under
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Image => "thumbnail.jpg",
            Self::Video => "clip.mp4",
        }
    }
}

/// A verified, non-empty media file on local disk.
///
/// The file is deleted when the asset is dropped.
#[derive(Debug)]
pub struct MediaAsset {
    pub kind: MediaKind,
    pub size: u64,
    path: TempPath,
}

impl MediaAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
impl MediaAsset {
    pub(crate) fn from_bytes(kind: MediaKind, bytes: &[u8]) -> Self {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .suffix(kind.suffix())
            .tempfile()
            .unwrap();
        file.write_all(bytes).unwrap();
        Self {
            kind,
            size: bytes.len() as u64,
            path: file.into_temp_path(),
        }
    }
}

/// Media gathered for one notification plus the reasons any asset is missing
#[derive(Debug, Default)]
pub struct MediaSet {
    assets: Vec<MediaAsset>,
    pub failures: Vec<String>,
}

impl MediaSet {
    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    pub fn push(&mut self, asset: MediaAsset) {
        self.assets.push(asset);
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn image(&self) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.kind == MediaKind::Image)
    }

    pub fn video(&self) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.kind == MediaKind::Video)
    }
}

/// Resolves the thumbnail and clip for an event into temporary files
pub struct MediaAssembler {
    client: FrigateClient,
    temp_dir: PathBuf,
    clip_settle: Duration,
    max_clip_bytes: u64,
}

impl MediaAssembler {
    pub fn new(client: FrigateClient, config: &PipelineConfig) -> Self {
        Self {
            client,
            temp_dir: config.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            clip_settle: Duration::from_secs(config.clip_settle_secs),
            max_clip_bytes: MAX_CLIP_BYTES,
        }
    }

    pub fn with_max_clip_bytes(mut self, max_clip_bytes: u64) -> Self {
        self.max_clip_bytes = max_clip_bytes;
        self
    }

    /// Gather every asset that can be had; a failing asset never fails the set
    pub async fn assemble(&self, event: &Event) -> MediaSet {
        let mut set = MediaSet::default();

        match self.resolve_image(event).await {
            Ok(asset) => set.push(asset),
            Err(e) => {
                error!("No thumbnail for event {}: {}", event.id, e);
                set.failures.push(format!("thumbnail for event {}: {}", event.id, e));
            }
        }

        if event.has_clip && event.is_finished() {
            match self.resolve_clip(event).await {
                Ok(Some(asset)) => set.push(asset),
                Ok(None) => {}
                Err(e) => {
                    error!("No clip for event {}: {}", event.id, e);
                    set.failures.push(format!("clip for event {}: {}", event.id, e));
                }
            }
        }

        debug!(
            "Assembled {} media assets for event {}",
            set.assets.len(),
            event.id
        );
        set
    }

    /// Inline base64 thumbnail first, the thumbnail endpoint if that is unusable
    async fn resolve_image(&self, event: &Event) -> Result<MediaAsset> {
        if let Some(encoded) = event.inline_thumbnail() {
            match STANDARD.decode(encoded.trim()) {
                Ok(bytes) if !bytes.is_empty() => {
                    return self.write_asset(MediaKind::Image, &bytes).await;
                }
                Ok(_) => warn!("Inline thumbnail of event {} is empty", event.id),
                Err(e) => warn!("Error decoding inline thumbnail of {}: {}", event.id, e),
            }
        }

        debug!("Downloading thumbnail for event {}", event.id);
        let bytes = self.client.get_thumbnail(&event.id).await?;
        self.write_asset(MediaKind::Image, &bytes).await
    }

    async fn resolve_clip(&self, event: &Event) -> Result<Option<MediaAsset>> {
        if !self.clip_settle.is_zero() {
            tokio::time::sleep(self.clip_settle).await;
        }

        let mut response = self.client.open_clip(&event.id).await?;
        match response.content_length() {
            Some(0) => {
                warn!("Clip for event {} reports zero length, skipping", event.id);
                return Ok(None);
            }
            Some(len) if !within_limit(len, self.max_clip_bytes) => {
                info!("Clip for event {} is {} bytes, too large to send", event.id, len);
                return Ok(None);
            }
            _ => {}
        }

        let (mut file, path) = self.create_temp(MediaKind::Video)?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Source(format!("Error clip download: {}", e)))?
        {
            written += chunk.len() as u64;
            if !within_limit(written, self.max_clip_bytes) {
                info!("Clip for event {} exceeds {} bytes, dropping", event.id, self.max_clip_bytes);
                return Ok(None);
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::Io(format!("Error clip write: {}", e)))?;
        }
        file.sync_all()
            .await
            .map_err(|e| Error::Io(format!("Error clip sync: {}", e)))?;

        if written == 0 {
            return Err(Error::Media(format!("clip for event {} is empty", event.id)).into());
        }

        Ok(Some(MediaAsset {
            kind: MediaKind::Video,
            size: written,
            path,
        }))
    }

    async fn write_asset(&self, kind: MediaKind, bytes: &[u8]) -> Result<MediaAsset> {
        if bytes.is_empty() {
            return Err(Error::Media(format!("{} payload is empty", kind.file_name())).into());
        }

        let (mut file, path) = self.create_temp(kind)?;
        file.write_all(bytes)
            .await
            .map_err(|e| Error::Io(format!("Error writing {}: {}", kind.file_name(), e)))?;
        file.sync_all()
            .await
            .map_err(|e| Error::Io(format!("Error syncing {}: {}", kind.file_name(), e)))?;

        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::Io(format!("Error checking {}: {}", kind.file_name(), e)))?
            .len();
        if size == 0 {
            return Err(Error::Media(format!("{} was written empty", kind.file_name())).into());
        }

        Ok(MediaAsset { kind, size, path })
    }

    fn create_temp(&self, kind: MediaKind) -> Result<(tokio::fs::File, TempPath)> {
        let file = tempfile::Builder::new()
            .prefix("frigate-")
            .suffix(kind.suffix())
            .tempfile_in(&self.temp_dir)
            .map_err(|e| Error::Io(format!("Error when creating file: {}", e)))?;
        let (file, path) = file.into_parts();
        Ok((tokio::fs::File::from_std(file), path))
    }
}
