use shared::{ActorMode, UploadOutcome};

use super::ImageFile;
use crate::api::ScanApi;
use crate::error::{ScanError, UPLOAD_FAILED};

/// One submission of the selected image. Consumed by [`submit`].
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub image: ImageFile,
    pub mode: ActorMode,
}

/// Sends the image to the guest or authenticated upload endpoint. No retries.
pub async fn submit(
    api: &dyn ScanApi,
    request: UploadRequest,
    max_bytes: usize,
) -> Result<UploadOutcome, ScanError> {
    let UploadRequest { image, mode } = request;
    if image.is_empty() {
        return Err(ScanError::NoImage);
    }
    image.check_size(max_bytes)?;

    let response = api
        .upload_image(&image, mode)
        .await
        .map_err(ScanError::upload)?;

    response.into_outcome().ok_or_else(|| {
        log::warn!("Upload of {} returned neither a task nor an analysis", image.file_name);
        ScanError::Upload {
            message: UPLOAD_FAILED.to_string(),
            source: None,
        }
    })
}
