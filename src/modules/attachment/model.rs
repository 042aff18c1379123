use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::api::error;
use crate::constants::Env;
use crate::modules::attachment::schema::AttachmentEntity;

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub uploader_id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,
    pub allowed_mime_types: Vec<String>,
    pub upload_dir: String,
    pub base_url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_mime_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "application/pdf",
                "text/plain",
                "audio/mpeg",
                "video/mp4",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            upload_dir: "./uploads".to_string(),
            base_url: "/uploads".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn from_env(env: &Env) -> Self {
        Self {
            max_file_size: env.max_upload_size,
            upload_dir: env.upload_dir.clone(),
            base_url: env.upload_base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Resolves the MIME type (falling back to the file extension) and checks
    /// it together with the size against the limits.
    pub fn validate(
        &self,
        original_filename: &str,
        size: usize,
        declared_mime: Option<&str>,
    ) -> Result<String, error::SystemError> {
        if size == 0 {
            return Err(error::SystemError::bad_request("File is empty"));
        }
        if size > self.max_file_size {
            return Err(error::SystemError::bad_request(format!(
                "File size exceeds maximum allowed size of {} bytes",
                self.max_file_size
            )));
        }

        let mime_type = match declared_mime {
            Some(m) if m != "application/octet-stream" => m.to_string(),
            _ => mime_guess::from_path(original_filename).first_or_octet_stream().to_string(),
        };

        if !self.allowed_mime_types.iter().any(|allowed| allowed == &mime_type) {
            return Err(error::SystemError::bad_request(format!(
                "File type '{mime_type}' is not allowed"
            )));
        }

        Ok(mime_type)
    }

    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/{}", self.base_url, stored_name)
    }
}

/// `<uuid v7>.<original extension>`
pub fn stored_name(original_filename: &str) -> String {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("");

    let id = Uuid::now_v7();
    if extension.is_empty() {
        id.to_string()
    } else {
        format!("{id}.{}", extension.to_ascii_lowercase())
    }
}

/// Stored names are flat; anything that could leave the upload dir is rejected.
pub fn is_safe_stored_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

#[derive(Debug, Clone, Serialize, Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Attachment")]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AttachmentResponse {
    pub fn new(entity: AttachmentEntity, config: &UploadConfig) -> Self {
        AttachmentResponse {
            url: config.url_for(&entity.filename),
            id: entity.id,
            filename: entity.filename,
            original_filename: entity.original_filename,
            mime_type: entity.mime_type,
            size_bytes: entity.size_bytes,
            created_at: entity.created_at,
        }
    }
}
