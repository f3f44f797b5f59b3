//! Listing photos and avatars in object storage.

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info};

use super::Marketplace;
use crate::error::QueryError;

/// An image about to be stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File extension without the dot, e.g. `png`.
    pub extension: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(extension: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            extension: extension.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Guess the content type from the extension.
    pub fn from_extension(extension: &str, bytes: Bytes) -> Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "heic" => "image/heic",
            _ => "application/octet-stream",
        };
        Self::new(extension, content_type, bytes)
    }

    /// Object name: upload time in unix milliseconds plus the extension.
    pub fn object_name(&self, now_millis: i64) -> String {
        format!("{}.{}", now_millis, self.extension)
    }
}

impl Marketplace {
    /// Store `image` in `bucket` and return its path there.
    pub async fn upload_image(&self, bucket: &str, image: ImageUpload) -> Result<String, QueryError> {
        let path = image.object_name(Utc::now().timestamp_millis());
        let backend = self.backend();
        let stored = self
            .client()
            .with_timeout(async {
                backend
                    .upload(bucket, &path, image.bytes.clone(), &image.content_type)
                    .await
                    .map_err(QueryError::from)
            })
            .await?;
        info!(bucket, path = %stored, size = image.bytes.len(), "uploaded image");
        Ok(stored)
    }

    pub async fn download_image(&self, bucket: &str, path: &str) -> Result<Bytes, QueryError> {
        let backend = self.backend();
        let bytes = self
            .client()
            .with_timeout(async { backend.download(bucket, path).await.map_err(QueryError::from) })
            .await?;
        debug!(bucket, path, size = bytes.len(), "downloaded image");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name() {
        let image = ImageUpload::from_extension(".JPG", Bytes::from_static(b"x"));
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.object_name(1_700_000_000_123), "1700000000123.jpg");
    }
}
