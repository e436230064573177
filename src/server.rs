use axum::{
    extract::{ DefaultBodyLimit, Multipart, State },
    http::StatusCode,
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use serde_json::{ Map, Value };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use tracing::{ error, info, warn };

use crate::engine::SearchEngine;
use crate::error::SearchError;
use crate::models::{ IndexResponse, IndexTextRequest, SearchResult, TextSearchQuery };

type SharedEngine = Arc<SearchEngine>;

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = match &self {
            SearchError::InvalidInput(_) | SearchError::Json(_) => StatusCode::BAD_REQUEST,
            SearchError::UnsupportedImage(_) | SearchError::UnsupportedFileType(_) =>
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "rejected request");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// A file pulled out of a multipart body, plus the optional `metadata` form field.
struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
    metadata: Option<Map<String, Value>>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, SearchError> {
    let mut file = None;
    let mut metadata = None;

    while
        let Some(field) = multipart
            .next_field().await
            .map_err(|e| SearchError::InvalidInput(e.to_string()))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| SearchError::InvalidInput(e.to_string()))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("metadata") => {
                let text = field.text().await.map_err(|e| SearchError::InvalidInput(e.to_string()))?;
                if !text.trim().is_empty() {
                    let parsed: Map<String, Value> = serde_json::from_str(&text)?;
                    metadata = Some(parsed);
                }
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(||
        SearchError::InvalidInput("multipart field `file` is required".to_string())
    )?;
    Ok(Upload { file_name, bytes, metadata })
}

pub fn router(engine: SharedEngine, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search/text", post(search_text))
        .route("/search/image", post(search_image))
        .route("/index/text", post(index_text))
        .route("/index/image", post(index_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(engine)
}

pub async fn run_server(engine: SearchEngine, host: &str, port: u16, max_upload_bytes: usize) -> anyhow::Result<()> {
    let (texts, images) = engine.counts().await?;
    info!(texts, images, "search index loaded");

    let app = router(Arc::new(engine), max_upload_bytes);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(engine): State<SharedEngine>) -> Result<Json<Value>, SearchError> {
    let (texts, images) = engine.counts().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "indexed_texts": texts,
        "indexed_images": images,
    })))
}

async fn search_text(
    State(engine): State<SharedEngine>,
    Json(query): Json<TextSearchQuery>
) -> Result<Json<Vec<SearchResult>>, SearchError> {
    info!(query = %query.query, "text search");
    Ok(Json(engine.search_text(&query.query, None).await?))
}

async fn search_image(
    State(engine): State<SharedEngine>,
    multipart: Multipart
) -> Result<Json<Vec<SearchResult>>, SearchError> {
    let upload = read_upload(multipart).await?;
    info!(file = upload.file_name.as_deref().unwrap_or("<unnamed>"), bytes = upload.bytes.len(), "image search");
    Ok(Json(engine.search_image(&upload.bytes, upload.file_name.as_deref(), None).await?))
}

async fn index_text(
    State(engine): State<SharedEngine>,
    Json(request): Json<IndexTextRequest>
) -> Result<Json<IndexResponse>, SearchError> {
    Ok(Json(engine.index_text(&request.text, request.metadata).await?))
}

async fn index_image(
    State(engine): State<SharedEngine>,
    multipart: Multipart
) -> Result<Json<IndexResponse>, SearchError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(engine.index_image(&upload.bytes, upload.file_name.as_deref(), upload.metadata).await?))
}
