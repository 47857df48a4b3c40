//! Upload target issuance.

use annotia_core::models::{FileScope, MediaType};
use annotia_core::{AppError, Config};
use annotia_db::FileRecordStore;
use annotia_storage::{keys, Storage};
use uuid::Uuid;

use crate::error::storage_error_to_app;
use crate::services::ingest::types::{
    content_type_for_extension, disambiguate, split_name, stored_file_name, UploadTarget,
};

/// Issues upload targets: reserves a file id, disambiguates the original
/// name against existing records, and asks the project's storage backend
/// for an upload address.
pub struct UploadTargetIssuer<'a> {
    records: &'a dyn FileRecordStore,
    storage: &'a dyn Storage,
    config: &'a Config,
}

impl<'a> UploadTargetIssuer<'a> {
    pub fn new(
        records: &'a dyn FileRecordStore,
        storage: &'a dyn Storage,
        config: &'a Config,
    ) -> Self {
        Self {
            records,
            storage,
            config,
        }
    }

    pub async fn issue(
        &self,
        scope: &FileScope,
        original_name: &str,
        media_type: MediaType,
    ) -> Result<UploadTarget, AppError> {
        let (stem, ext) = split_name(original_name)?;
        self.check_extension(&ext, media_type)?;

        // Check-then-act: a concurrent upload of the same name can slip
        // through, at worst producing a renamed file.
        let updated_original_name = match self
            .records
            .find_by_original_name(scope, original_name)
            .await?
        {
            Some(_) => disambiguate(&stem, &ext),
            None => original_name.to_string(),
        };

        let file_id = Uuid::new_v4();
        let stored_name = stored_file_name(file_id, &ext);
        let relative_path = format!("/{}", keys::file_key(scope, &stored_name));

        let upload_url = self
            .storage
            .reserve_upload_target(
                scope,
                file_id,
                &stored_name,
                content_type_for_extension(&ext),
            )
            .await
            .map_err(storage_error_to_app)?;

        tracing::info!(
            file_id = %file_id,
            stored_name = %stored_name,
            backend = %self.storage.backend(),
            "Upload target issued"
        );

        Ok(UploadTarget {
            file_id,
            upload_url,
            relative_path,
            stored_name,
            updated_original_name,
        })
    }

    fn check_extension(&self, ext: &str, media_type: MediaType) -> Result<(), AppError> {
        let bare = ext.trim_start_matches('.');
        let allowed = match media_type {
            MediaType::Image => self.config.image_allowed_extensions(),
            MediaType::Video => self.config.video_allowed_extensions(),
        };

        if !allowed.iter().any(|a| a == bare) {
            return Err(AppError::Validation(format!(
                "Invalid file extension '{}'. Allowed extensions: {}",
                bare,
                allowed.join(", ")
            )));
        }

        Ok(())
    }
}
