use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
}

/// Upload-by-bytes object storage returning a durable URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, data: Bytes, folder: &str, key: &str) -> Result<StoredObject>;
}

fn check_segment(segment: &str) -> Result<()> {
    let ok = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !segment.contains("..");
    if ok {
        Ok(())
    } else {
        Err(Error::Storage(format!("invalid object path segment: {:?}", segment)))
    }
}

/// Writes objects under the uploads dir that the HTTP server exposes at
/// `/uploads`.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: Url,
}

impl LocalDiskStorage {
    pub fn new(root: PathBuf, public_base_url: &str) -> Result<Self> {
        let mut base = Url::parse(public_base_url)
            .map_err(|e| Error::Config(format!("Invalid PUBLIC_BASE_URL: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            root,
            public_base_url: base,
        })
    }
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn upload(&self, data: Bytes, folder: &str, key: &str) -> Result<StoredObject> {
        check_segment(folder)?;
        check_segment(key)?;

        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).await.map_err(|e| Error::Storage(e.to_string()))?;
        fs::write(dir.join(key), &data).await.map_err(|e| {
            tracing::error!("Failed to write audio object: {}", e);
            Error::Storage(e.to_string())
        })?;

        let url = self
            .public_base_url
            .join(&format!("uploads/{}/{}", folder, key))
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(StoredObject { url: url.to_string() })
    }
}

/// Signed multipart upload to a Cloudinary-compatible endpoint.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpObjectStorage {
    pub fn new(client: Client, upload_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            client,
            upload_url,
            api_key,
            api_secret,
        }
    }

    fn sign(&self, folder: &str, public_id: &str, timestamp: i64) -> String {
        // parameters are signed in alphabetical order with the secret appended
        let to_sign = format!(
            "folder={}&public_id={}&timestamp={}{}",
            folder, public_id, timestamp, self.api_secret
        );
        hex::encode(Sha256::digest(to_sign.as_bytes()))
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, data: Bytes, folder: &str, key: &str) -> Result<StoredObject> {
        check_segment(folder)?;
        check_segment(key)?;

        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.sign(folder, key, timestamp);
        let part = Part::stream(data).file_name(key.to_string());

        let form = Form::new()
            .part("file", part)
            .text("folder", folder.to_string())
            .text("public_id", key.to_string())
            .text("timestamp", timestamp.to_string())
            .text("api_key", self.api_key.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let res = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Storage(format!("upload rejected {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await.map_err(|e| Error::Storage(e.to_string()))?;
        body.get("secure_url")
            .or_else(|| body.get("url"))
            .and_then(|u| u.as_str())
            .map(|url| StoredObject { url: url.to_string() })
            .ok_or_else(|| Error::Storage("upload response carried no URL".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_storage_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path().to_path_buf(), "http://localhost:3045").unwrap();

        let stored = storage
            .upload(Bytes::from_static(b"webm"), "interviews", "abc_20261019.webm")
            .await
            .unwrap();

        assert_eq!(
            stored.url,
            "http://localhost:3045/uploads/interviews/abc_20261019.webm"
        );
        let written = std::fs::read(dir.path().join("interviews/abc_20261019.webm")).unwrap();
        assert_eq!(written, b"webm");
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path().to_path_buf(), "http://localhost").unwrap();
        let err = storage
            .upload(Bytes::new(), "interviews", "../escape")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn signature_is_hex_sha256() {
        let storage = HttpObjectStorage::new(
            Client::new(),
            "http://upload".into(),
            "key".into(),
            "secret".into(),
        );
        let sig = storage.sign("interviews", "a_b", 1700000000);
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, storage.sign("interviews", "a_b", 1700000000));
        assert_ne!(sig, storage.sign("interviews", "a_c", 1700000000));
    }
}
