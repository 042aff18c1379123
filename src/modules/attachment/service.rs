use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::attachment::{
    model::{is_safe_stored_name, stored_name, AttachmentResponse, NewAttachment, UploadConfig},
    repository::AttachmentRepository,
};

#[derive(Clone)]
pub struct AttachmentService {
    repo: Arc<dyn AttachmentRepository + Send + Sync>,
    config: UploadConfig,
}

impl AttachmentService {
    pub fn with_dependencies(
        repo: Arc<dyn AttachmentRepository + Send + Sync>,
        config: UploadConfig,
    ) -> Self {
        AttachmentService { repo, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Writes the file under a fresh name, then records its metadata. The file
    /// is removed again if the row cannot be written.
    pub async fn upload(
        &self,
        uploader_id: Uuid,
        original_filename: &str,
        bytes: Vec<u8>,
        declared_mime: Option<&str>,
    ) -> Result<AttachmentResponse, error::SystemError> {
        let original_filename = original_filename.trim();
        if original_filename.is_empty() {
            return Err(error::SystemError::bad_request("Missing filename"));
        }

        let mime_type = self.config.validate(original_filename, bytes.len(), declared_mime)?;
        let filename = stored_name(original_filename);

        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        let storage_path = PathBuf::from(&self.config.upload_dir).join(&filename);
        tokio::fs::write(&storage_path, &bytes).await?;

        let new_attachment = NewAttachment {
            uploader_id,
            filename,
            original_filename: original_filename.to_string(),
            mime_type,
            size_bytes: bytes.len() as i64,
            storage_path: storage_path.to_string_lossy().into_owned(),
        };

        let entity = match self.repo.create(&new_attachment).await {
            Ok(entity) => entity,
            Err(e) => {
                if let Err(io) = tokio::fs::remove_file(&storage_path).await {
                    log::warn!("Failed to remove orphaned upload {:?}: {io}", storage_path);
                }
                return Err(e);
            }
        };

        log::info!("User {uploader_id} uploaded {} ({} bytes)", entity.filename, entity.size_bytes);
        Ok(AttachmentResponse::new(entity, &self.config))
    }

    pub async fn get(&self, id: Uuid) -> Result<AttachmentResponse, error::SystemError> {
        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Attachment not found"))?;

        Ok(AttachmentResponse::new(entity, &self.config))
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), error::SystemError> {
        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Attachment not found"))?;

        if entity.uploader_id != user_id {
            return Err(error::SystemError::forbidden(
                "You don't have permission to delete this attachment",
            ));
        }

        self.repo.delete(&id).await?;
        if let Err(e) = tokio::fs::remove_file(&entity.storage_path).await {
            log::warn!("Failed to remove file {}: {e}", entity.storage_path);
        }
        Ok(())
    }

    /// Reads a stored file back for `/uploads/{name}`.
    pub async fn read_stored(&self, name: &str) -> Result<Vec<u8>, error::SystemError> {
        if !is_safe_stored_name(name) {
            return Err(error::SystemError::not_found("File not found"));
        }

        let path = PathBuf::from(&self.config.upload_dir).join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(error::SystemError::not_found("File not found"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
