//! Object storage for avatars and workout images.
//!
//! DESIGN
//! ======
//! Two buckets are used: `avatars` (keyed by user id) and `images` (keyed by
//! workout id). Writes are upserts so re-uploading replaces the object in
//! place and the stored URL stays stable.
//!
//! The `ObjectStore` trait is the seam: `LocalStore` writes to disk and is
//! served back by `tower_http::services::ServeDir`, while `HttpStore` talks to
//! a Supabase-compatible storage REST API.
//!
//! `ServeDir` picks the response type from the file name, so `LocalStore`
//! appends an extension derived from the upload's media type and returns the
//! suffixed path. `HttpStore` sends the media type as a header and keeps the
//! path as given.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const AVATARS_BUCKET: &str = "avatars";
pub const IMAGES_BUCKET: &str = "images";

const DEFAULT_STORAGE_DIR: &str = "./storage";
const DEFAULT_PUBLIC_BASE: &str = "/storage";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Image types stored with a known extension. Anything else (notably SVG) is
/// stored bare and served as `application/octet-stream`.
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
];

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("upload is empty")]
    Empty,
    #[error("upload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("storage not configured: {0}")]
    Config(String),
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local { root: PathBuf, public_base: String },
    Http { base_url: String, service_key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    /// Build storage config from environment variables.
    ///
    /// - `STORAGE_BACKEND`: `local` (default) or `http`
    /// - `STORAGE_DIR`, `STORAGE_PUBLIC_BASE`: local backend root and URL prefix
    /// - `STORAGE_URL`, `STORAGE_KEY`: HTTP backend base URL and service key
    /// - `UPLOAD_MAX_BYTES`: default 5 MiB
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Config` for an unknown backend or a missing
    /// HTTP backend variable.
    pub fn from_env() -> Result<Self, StorageError> {
        let max_upload_bytes = std::env::var("UPLOAD_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES);

        let kind = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let backend = match kind.trim().to_ascii_lowercase().as_str() {
            "local" => StorageBackend::Local {
                root: std::env::var("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR)),
                public_base: std::env::var("STORAGE_PUBLIC_BASE").unwrap_or_else(|_| DEFAULT_PUBLIC_BASE.into()),
            },
            "http" => StorageBackend::Http {
                base_url: std::env::var("STORAGE_URL")
                    .map_err(|_| StorageError::Config("STORAGE_URL not set".into()))?,
                service_key: std::env::var("STORAGE_KEY")
                    .map_err(|_| StorageError::Config("STORAGE_KEY not set".into()))?,
            },
            other => return Err(StorageError::Config(format!("unknown STORAGE_BACKEND: {other}"))),
        };

        Ok(Self { backend, max_upload_bytes })
    }

    /// URL prefix and directory to serve when the local backend publishes
    /// under a path on this server.
    #[must_use]
    pub fn local_mount(&self) -> Option<(String, PathBuf)> {
        match &self.backend {
            StorageBackend::Local { root, public_base } if public_base.starts_with('/') => {
                let prefix = public_base.trim_end_matches('/');
                (!prefix.is_empty()).then(|| (prefix.to_owned(), root.clone()))
            }
            _ => None,
        }
    }
}

// =============================================================================
// UPLOAD VALIDATION
// =============================================================================

/// A file received from a multipart request, not yet stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Lowercased `type/subtype` without parameters.
fn mime_essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// File extension for an image media type, if it is one we serve by name.
#[must_use]
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = mime_essence(content_type);
    IMAGE_EXTENSIONS.iter().find(|(mime, _)| *mime == essence).map(|(_, ext)| *ext)
}

impl Upload {
    /// Check size and media type before anything touches the store.
    ///
    /// # Errors
    ///
    /// Returns `Empty`, `TooLarge` or `UnsupportedType`.
    pub fn validate_image(&self, max_bytes: usize) -> Result<(), StorageError> {
        if self.bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if self.bytes.len() > max_bytes {
            return Err(StorageError::TooLarge { size: self.bytes.len(), max: max_bytes });
        }
        let essence = mime_essence(&self.content_type);
        if !essence.starts_with("image/") || essence.len() == "image/".len() {
            return Err(StorageError::UnsupportedType(self.content_type.clone()));
        }
        Ok(())
    }
}

/// Reject object paths that could escape the bucket.
///
/// # Errors
///
/// Returns `InvalidPath` for empty, absolute or parent-relative paths.
pub fn sanitize_object_path(path: &str) -> Result<PathBuf, StorageError> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath(path.to_owned()));
    }
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            _ => return Err(StorageError::InvalidPath(path.to_owned())),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath(path.to_owned()));
    }
    Ok(out)
}

fn sanitize_bucket(bucket: &str) -> Result<&str, StorageError> {
    if bucket.is_empty() || !bucket.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(StorageError::InvalidPath(bucket.to_owned()));
    }
    Ok(bucket)
}

// =============================================================================
// TRAIT
// =============================================================================

/// Bucketed object store with upsert semantics.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `bucket/path`, replacing any existing object.
    /// Returns the stored object path.
    async fn put(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    /// Remove `bucket/path`. Removing a missing object is not an error.
    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError>;

    /// Public URL for `bucket/path`.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Build the configured store.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match &config.backend {
        StorageBackend::Local { root, public_base } => Ok(Arc::new(LocalStore::new(root.clone(), public_base.clone()))),
        StorageBackend::Http { base_url, service_key } => {
            Ok(Arc::new(HttpStore::new(base_url.clone(), service_key.clone())?))
        }
    }
}

// =============================================================================
// LOCAL STORE
// =============================================================================

pub struct LocalStore {
    root: PathBuf,
    public_base: String,
}

impl LocalStore {
    #[must_use]
    pub fn new(root: PathBuf, public_base: String) -> Self {
        Self { root, public_base: public_base.trim_end_matches('/').to_owned() }
    }

    fn object_file(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        let bucket = sanitize_bucket(bucket)?;
        let rel = sanitize_object_path(path)?;
        Ok(self.root.join(bucket).join(rel))
    }

    /// `path` bare and with every known image extension.
    fn stored_variants(path: &str) -> impl Iterator<Item = String> + '_ {
        let mut exts: Vec<&str> = IMAGE_EXTENSIONS.iter().map(|(_, ext)| *ext).collect();
        exts.dedup();
        std::iter::once(path.to_owned()).chain(exts.into_iter().map(move |ext| format!("{path}.{ext}")))
    }

    async fn remove_file(file: &Path) -> Result<(), StorageError> {
        match tokio::fs::remove_file(file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let stored = match image_extension(content_type) {
            Some(ext) => format!("{path}.{ext}"),
            None => path.to_owned(),
        };
        let file = self.object_file(bucket, &stored)?;
        let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(StorageError::InvalidPath(stored));
        };
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // A re-upload under another type must not leave the old file behind.
        for variant in Self::stored_variants(path).filter(|v| *v != stored) {
            Self::remove_file(&self.object_file(bucket, &variant)?).await?;
        }

        // Temp file per write; readers only ever see a renamed, complete object.
        let tmp = file.with_file_name(format!("{name}.{}.upload-tmp", uuid::Uuid::new_v4()));
        let written = match tokio::fs::write(&tmp, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &file).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::Io(e));
        }
        Ok(stored)
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        for variant in Self::stored_variants(path) {
            Self::remove_file(&self.object_file(bucket, &variant)?).await?;
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base)
    }
}

// =============================================================================
// HTTP STORE
// =============================================================================

/// Client for a Supabase-compatible storage API rooted at `base_url`
/// (e.g. `https://<project>.supabase.co/storage/v1`).
pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpStore {
    /// # Errors
    ///
    /// Returns `Backend` if the HTTP client cannot be built.
    pub fn new(base_url: String, service_key: String) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), service_key })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/{bucket}/{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpStore {
    async fn put(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        sanitize_bucket(bucket)?;
        sanitize_object_path(path)?;

        let response = self
            .http
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header("cache-control", "max-age=3600")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Backend(format!("{status}: {body}")));
        }
        Ok(path.to_owned())
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        sanitize_bucket(bucket)?;
        sanitize_object_path(path)?;

        let response = self
            .http
            .delete(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Backend(format!("{status}: {body}")))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{bucket}/{path}", self.base_url)
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
