use crate::error::ApiError;
use crate::types::{
    CancelReply, ChatReply, ChatRequest, DeleteReply, DownloadReply, ErrorBody,
    ModuleListResponse, ModuleRequest,
};
use crate::{ChatService, ModuleService};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::modules::RegistrySnapshot;
use shared::settings::ApiSettings;
use std::env;
use std::time::Duration;
use url::Url;

/// HTTP client for the Freddie backend (`/api/modules/*` and `/api/chat/`).
pub struct BackendClient {
    http: Client,
    base: Url,
}

impl BackendClient {
    /// Build a client from settings. `FREDDIE_API_URL` overrides the base url.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base = env::var("FREDDIE_API_URL").unwrap_or_else(|_| settings.base_url.clone());
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(Self {
            http,
            base: normalize_base(&base)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let resp = self.http.post(url).json(body).send().await?;
        decode(resp).await
    }
}

/// Ensure the base url ends with `/` so relative joins append to its path.
fn normalize_base(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn decode<R: DeserializeOwned>(resp: Response) -> Result<R, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        return Err(ApiError::Remote {
            status: status.as_u16(),
            message: parsed.error.or(parsed.message),
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl ModuleService for BackendClient {
    async fn list_modules(&self) -> Result<RegistrySnapshot, ApiError> {
        let url = self.endpoint("api/modules/")?;
        let resp = self.http.get(url).send().await?;
        let body: ModuleListResponse = decode(resp).await?;
        Ok(RegistrySnapshot::new(body.modules))
    }

    async fn start_download(&self, module_id: &str) -> Result<DownloadReply, ApiError> {
        self.post("api/modules/download/", &ModuleRequest { module_id })
            .await
    }

    async fn cancel_download(&self, module_id: &str) -> Result<CancelReply, ApiError> {
        self.post("api/modules/cancel/", &ModuleRequest { module_id })
            .await
    }

    async fn delete_module(&self, module_id: &str) -> Result<DeleteReply, ApiError> {
        self.post("api/modules/delete/", &ModuleRequest { module_id })
            .await
    }
}

#[async_trait]
impl ChatService for BackendClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.post("api/chat/", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_join_onto_base_path() {
        let base = normalize_base("http://localhost:8000").unwrap();
        assert_eq!(
            base.join("api/modules/").unwrap().as_str(),
            "http://localhost:8000/api/modules/"
        );

        let base = normalize_base("https://example.com/freddie").unwrap();
        assert_eq!(
            base.join("api/chat/").unwrap().as_str(),
            "https://example.com/freddie/api/chat/"
        );
    }

    #[test]
    fn test_rejects_garbage_base() {
        assert!(matches!(
            normalize_base("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
