use chrono::Utc;
use serde_json::{ Map, Value };
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use tracing::{ debug, info, warn };
use uuid::Uuid;
use walkdir::WalkDir;

use crate::embedding::{ cosine_similarity, Embedder };
use crate::error::{ Result, SearchError };
use crate::media::{ self, MediaKind };
use crate::models::{ decode_metadata, ImageDocument, IndexResponse, ResultKind, SearchResult, TextDocument };
use crate::store::Store;

/// Placeholder returned as the content of image hits; pixels are never echoed back.
pub const IMAGE_CONTENT_PLACEHOLDER: &str = "[Image content]";

pub struct SearchEngine {
    store: Store,
    embedder: Arc<dyn Embedder>,
    default_k: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub texts: usize,
    pub images: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Score every stored vector against the query and keep the `k` best as `(position, score)`, highest first.
fn rank<'a>(query: &[f32], embeddings: impl Iterator<Item = &'a [f32]>, k: usize) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f32)> = embeddings
        .enumerate()
        .map(|(i, embedding)| (i, cosine_similarity(embedding, query)))
        .collect();

    // Stable sort keeps insertion order among equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(i, score)| (i, score as f64))
        .collect()
}

fn encode_metadata(metadata: Option<Map<String, Value>>) -> Result<Option<String>> {
    metadata
        .map(|m| serde_json::to_string(&m))
        .transpose()
        .map_err(SearchError::from)
}

impl SearchEngine {
    pub fn new(store: Store, embedder: Arc<dyn Embedder>, default_k: usize) -> Self {
        Self {
            store,
            embedder,
            default_k: default_k.max(1),
        }
    }

    pub async fn counts(&self) -> Result<(usize, usize)> {
        self.store.counts().await
    }

    pub async fn index_text(&self, text: &str, metadata: Option<Map<String, Value>>) -> Result<IndexResponse> {
        if text.trim().is_empty() {
            return Err(SearchError::InvalidInput("text must not be empty".to_string()));
        }

        let doc_id = Uuid::new_v4().to_string();
        let embedding = self.embedder.embed_text(text).await?;

        self.store.insert_text(TextDocument {
            doc_id: doc_id.clone(),
            content: text.to_string(),
            metadata_json: encode_metadata(metadata)?,
            embedding,
            indexed_at: Utc::now(),
        }).await?;

        info!(%doc_id, "indexed text document");
        Ok(IndexResponse::success(doc_id, "Text indexed successfully"))
    }

    pub async fn index_image(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
        metadata: Option<Map<String, Value>>
    ) -> Result<IndexResponse> {
        let mime_type = media::validate_image_upload(file_name, bytes)?;

        let doc_id = Uuid::new_v4().to_string();
        let embedding = self.embedder.embed_image(bytes).await?;
        debug!(%doc_id, dimensions = embedding.len(), "image embedding ready");

        self.store.insert_image(ImageDocument {
            doc_id: doc_id.clone(),
            file_name: file_name.unwrap_or_default().to_string(),
            mime_type: Some(mime_type.to_string()),
            size_bytes: bytes.len() as u64,
            metadata_json: encode_metadata(metadata)?,
            embedding,
            indexed_at: Utc::now(),
        }).await?;

        info!(%doc_id, "indexed image");
        Ok(IndexResponse::success(doc_id, "Image indexed successfully"))
    }

    pub async fn search_text(&self, query: &str, k: Option<usize>) -> Result<Vec<SearchResult>> {
        let documents = self.store.text_documents().await?;
        if documents.is_empty() {
            debug!("text index is empty");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_text(query).await?;
        let ranked = rank(
            &query_embedding,
            documents.iter().map(|doc| doc.embedding.as_slice()),
            k.unwrap_or(self.default_k)
        );

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .map(|(i, score)| {
                let doc = &documents[i];
                SearchResult {
                    id: Some(doc.doc_id.clone()),
                    kind: ResultKind::Text,
                    content: Some(doc.content.clone()),
                    score,
                    metadata: Some(decode_metadata(doc.metadata_json.as_deref())),
                }
            })
            .collect();
        debug!(total = documents.len(), returned = results.len(), "text search complete");
        Ok(results)
    }

    pub async fn search_image(&self, bytes: &[u8], file_name: Option<&str>, k: Option<usize>) -> Result<Vec<SearchResult>> {
        media::validate_image_upload(file_name, bytes)?;

        let documents = self.store.image_documents().await?;
        if documents.is_empty() {
            debug!("image index is empty");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_image(bytes).await?;
        let ranked = rank(
            &query_embedding,
            documents.iter().map(|doc| doc.embedding.as_slice()),
            k.unwrap_or(self.default_k)
        );

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .map(|(i, score)| {
                let doc = &documents[i];
                SearchResult {
                    id: Some(doc.doc_id.clone()),
                    kind: ResultKind::Image,
                    content: Some(IMAGE_CONTENT_PLACEHOLDER.to_string()),
                    score,
                    metadata: Some(decode_metadata(doc.metadata_json.as_deref())),
                }
            })
            .collect();
        debug!(total = documents.len(), returned = results.len(), "image search complete");
        Ok(results)
    }

    pub async fn index_file(&self, path: &Path) -> Result<MediaKind> {
        let kind = media::classify(path).ok_or_else(||
            SearchError::UnsupportedFileType(
                path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("unknown")
                    .to_string()
            )
        )?;

        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::String(path.to_string_lossy().to_string()));

        match kind {
            MediaKind::Image => {
                let bytes = std::fs::read(path)?;
                let name = path.file_name().map(|n| n.to_string_lossy().to_string());
                self.index_image(&bytes, name.as_deref(), Some(metadata)).await?;
            }
            MediaKind::Text => {
                let content = media::extract_text_content(path)?;
                self.index_text(&content, Some(metadata)).await?;
            }
        }
        Ok(kind)
    }

    /// Index every supported file below `dir`. Failures are logged and counted, not fatal.
    pub async fn index_directory(&self, dir: PathBuf) -> Result<DirectoryReport> {
        let mut report = DirectoryReport::default();
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "failed to read directory entry");
                    report.failed += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if media::classify(entry.path()).is_none() {
                debug!(path = %entry.path().display(), "skipping unsupported file");
                report.skipped += 1;
                continue;
            }
            match self.index_file(entry.path()).await {
                Ok(MediaKind::Image) => {
                    report.images += 1;
                }
                Ok(MediaKind::Text) => {
                    report.texts += 1;
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "failed to index file");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
