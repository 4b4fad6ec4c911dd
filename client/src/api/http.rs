use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    ActorMode, Analysis, AuthResponse, Credentials, FeedbackRequest, MeResponse, MessageResponse,
    ProgressResponse, ScanId, ScanPage, ScanRecord, SignupRequest, TaskId, UploadResponse,
    UserProfile,
};
use std::time::Duration;
use url::Url;

use super::{AuthApi, FeedbackApi, ProfileUpdate, ScanApi};
use crate::error::ApiError;
use crate::scan::ImageFile;

/// reqwest-backed client for the scan and session endpoints. Cookies set by the
/// server are kept and replayed, so a login carries over to later calls.
#[derive(Clone)]
pub struct HttpApi {
    http_client: HttpClient,
    base_url: Url,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Self::with_client(http_client, base_url)
    }

    pub fn with_client(http_client: HttpClient, base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn image_part(image: &ImageFile) -> Result<Part, ApiError> {
        Ok(Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)?)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_str("{}")?);
        }
        return Ok(serde_json::from_slice(&body)?);
    }

    let url = response.url().clone();
    let message = error_message(response).await;
    if status == StatusCode::UNAUTHORIZED {
        log::warn!("{} answered 401", url.path());
        return Err(ApiError::Unauthorized { message });
    }
    log::error!("{} failed with status {}: {:?}", url.path(), status, message);
    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn error_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    serde_json::from_str::<MessageResponse>(&text)
        .ok()
        .and_then(|body| body.message)
}

#[async_trait]
impl ScanApi for HttpApi {
    async fn upload_image(
        &self,
        image: &ImageFile,
        mode: ActorMode,
    ) -> Result<UploadResponse, ApiError> {
        let url = self.endpoint(&format!("scan/images/upload/{}", mode))?;
        log::info!("Uploading {} ({} bytes) as {}", image.file_name, image.len(), mode);

        let form = Form::new().part("image", Self::image_part(image)?);
        let response = self.http_client.post(url).multipart(form).send().await?;
        decode(response).await
    }

    async fn get_progress(&self, task_id: &TaskId) -> Result<ProgressResponse, ApiError> {
        let url = self.endpoint(&format!(
            "scan/progress/{}",
            urlencoding::encode(task_id.as_str())
        ))?;
        log::debug!("Polling task ID: {}", task_id);

        let response = self.http_client.get(url).send().await?;
        decode(response).await
    }

    async fn save_scan(
        &self,
        image: &ImageFile,
        extracted_text: &str,
        analysis: &Analysis,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint("scan/save/auth")?;
        let form = Form::new()
            .part("image", Self::image_part(image)?)
            .text("extractedText", extracted_text.to_string())
            .text("analysis", serde_json::to_string(analysis)?);

        log::info!("Saving scan for {}", image.file_name);
        let response = self.http_client.post(url).multipart(form).send().await?;
        decode(response).await
    }

    async fn list_scans(&self, page: u32, limit: u32) -> Result<ScanPage, ApiError> {
        let url = self.endpoint("scan/scans")?;
        let response = self
            .http_client
            .get(url)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;
        decode(response).await
    }

    async fn get_scan(&self, scan_id: &ScanId) -> Result<ScanRecord, ApiError> {
        let url = self.endpoint(&format!(
            "scan/scans/{}",
            urlencoding::encode(scan_id.as_str())
        ))?;
        let response = self.http_client.get(url).send().await?;
        decode(response).await
    }

    async fn delete_scan(&self, scan_id: &ScanId) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&format!(
            "scan/scans/{}",
            urlencoding::encode(scan_id.as_str())
        ))?;
        log::info!("Deleting scan {}", scan_id);
        let response = self.http_client.delete(url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl AuthApi for HttpApi {
    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("auth/me")?;
        let response = self.http_client.get(url).send().await?;
        Ok(decode::<MeResponse>(response).await?.into_user())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("auth/me")?;
        let fields = &update.fields;

        let mut form = Form::new()
            .text("name", fields.name.clone())
            .text("gender", fields.gender.clone())
            .text("email", fields.email.clone());
        if let Some(age) = fields.age {
            form = form.text("age", age.to_string());
        }
        if let Some(password) = fields.password.as_ref().filter(|p| !p.is_empty()) {
            form = form.text("password", password.clone());
        }
        if let Some(weight) = fields.weight.as_ref().filter(|w| !w.is_empty()) {
            form = form.text("weight", weight.clone());
        }
        for disease in &fields.diseases {
            form = form.text("diseases[]", disease.clone());
        }
        for allergy in &fields.allergies {
            form = form.text("allergies[]", allergy.clone());
        }
        if let Some(image) = &update.profile_image {
            form = form.part("profileImage", Self::image_part(image)?);
        }

        let response = self.http_client.put(url).multipart(form).send().await?;
        Ok(decode::<MeResponse>(response).await?.into_user())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint("auth/login")?;
        let response = self.http_client.post(url).json(credentials).send().await?;
        decode(response).await
    }

    async fn register(&self, signup: &SignupRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint("auth/register")?;
        let response = self.http_client.post(url).json(signup).send().await?;
        decode(response).await
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint("auth/logout")?;
        let response = self.http_client.post(url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl FeedbackApi for HttpApi {
    async fn send_feedback(&self, feedback: &FeedbackRequest) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint("feedback")?;
        let response = self.http_client.post(url).json(feedback).send().await?;
        decode(response).await
    }
}
