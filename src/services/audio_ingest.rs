use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::services::ai_service::AudioRef;
use crate::services::storage_service::ObjectStorage;
use crate::utils::time::{now, storage_stamp};

/// Local staging copy of an uploaded recording. The file is removed when the
/// value is dropped, whichever way the submission ends.
#[derive(Debug)]
pub struct StagedAudio {
    path: PathBuf,
    file: Option<fs::File>,
    len: usize,
    mime_type: String,
}

impl StagedAudio {
    pub async fn create(dir: &Path, mime_type: Option<&str>) -> Result<Self> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.part", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
            len: 0,
            mime_type: mime_type
                .filter(|m| m.starts_with("audio/") || m.starts_with("video/webm"))
                .unwrap_or("audio/webm")
                .to_string(),
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8], limit: usize) -> Result<()> {
        if self.len + chunk.len() > limit {
            return Err(Error::BadRequest(format!(
                "Audio exceeds the {} byte limit",
                limit
            )));
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("staged audio already sealed".to_string()))?;
        file.write_all(chunk).await?;
        self.len += chunk.len();
        Ok(())
    }

    pub async fn seal(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn extension(&self) -> &'static str {
        match self.mime_type.split(';').next().unwrap_or("") {
            "audio/ogg" => "ogg",
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" => "wav",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
            _ => "webm",
        }
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged audio");
            }
        }
    }
}

/// Moves a staged recording into durable object storage.
#[derive(Clone)]
pub struct AudioIngest {
    storage: Arc<dyn ObjectStorage>,
    config: IngestConfig,
}

impl AudioIngest {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: IngestConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub async fn stage(&self, mime_type: Option<&str>) -> Result<StagedAudio> {
        StagedAudio::create(&self.config.staging_dir, mime_type).await
    }

    /// Uploads the staged audio and returns a reference to the durable copy.
    /// The staged file is consumed and deleted on every path.
    pub async fn ingest(&self, candidate_id: Uuid, mut staged: StagedAudio) -> Result<AudioRef> {
        staged.seal().await?;
        if staged.is_empty() {
            return Err(Error::BadRequest("Audio file is required".to_string()));
        }

        let data = Bytes::from(fs::read(staged.path()).await?);
        let key = format!(
            "{}_{}.{}",
            candidate_id,
            storage_stamp(now()),
            staged.extension()
        );

        tracing::info!(%candidate_id, bytes = data.len(), key = %key, "Uploading interview audio");
        let stored = self
            .storage
            .upload(data, &self.config.folder, &key)
            .await
            .map_err(|e| {
                tracing::error!(%candidate_id, error = %e, "Audio upload failed");
                e
            })?;

        Ok(AudioRef {
            url: stored.url,
            mime_type: staged.mime_type().to_string(),
        })
    }
}
