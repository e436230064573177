//! HTTP client for the search service.

use async_trait::async_trait;
use reqwest::multipart::{ Form, Part };
use reqwest::{ Client, Response };
use serde::de::DeserializeOwned;
use serde_json::{ Map, Value };
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{ Result, SearchError };
use crate::models::{ IndexResponse, IndexTextRequest, SearchResult, TextSearchQuery };

/// The two calls the search front end depends on.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search_text(&self, query: &str) -> Result<Vec<SearchResult>>;
    async fn search_image(&self, path: &Path) -> Result<Vec<SearchResult>>;
}

pub struct SearchClient {
    client: Client,
    base_url: String,
}

impl SearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json
                ::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(|s| s.to_string()))
                .unwrap_or(body);
            return Err(SearchError::Service {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn file_part(path: &Path) -> Result<Part> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Part::bytes(bytes).file_name(file_name).mime_str(mime.as_ref())?)
    }

    pub async fn health(&self) -> Result<Value> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::decode(response).await
    }

    pub async fn index_text(&self, text: &str, metadata: Option<Map<String, Value>>) -> Result<IndexResponse> {
        let request = IndexTextRequest {
            text: text.to_string(),
            metadata,
        };
        let response = self.client.post(self.url("/index/text")).json(&request).send().await?;
        Self::decode(response).await
    }

    pub async fn index_image(&self, path: &Path, metadata: Option<Map<String, Value>>) -> Result<IndexResponse> {
        let mut form = Form::new().part("file", Self::file_part(path).await?);
        if let Some(metadata) = metadata {
            form = form.text("metadata", serde_json::to_string(&metadata)?);
        }
        let response = self.client.post(self.url("/index/image")).multipart(form).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search_text(&self, query: &str) -> Result<Vec<SearchResult>> {
        debug!(url = %self.url("/search/text"), "POST text search");
        let request = TextSearchQuery {
            query: query.to_string(),
        };
        let response = self.client.post(self.url("/search/text")).json(&request).send().await?;
        Self::decode(response).await
    }

    async fn search_image(&self, path: &Path) -> Result<Vec<SearchResult>> {
        debug!(url = %self.url("/search/image"), file = %path.display(), "POST image search");
        let form = Form::new().part("file", Self::file_part(path).await?);
        let response = self.client.post(self.url("/search/image")).multipart(form).send().await?;
        Self::decode(response).await
    }
}
