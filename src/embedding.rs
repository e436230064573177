use async_trait::async_trait;
use fastembed::{
    EmbeddingModel,
    ImageEmbedding,
    ImageEmbeddingModel,
    ImageInitOptions,
    InitOptions,
    TextEmbedding,
};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ Result, SearchError };
use crate::media;

/// Turns queries and documents into vectors.
///
/// Text and images live in separate vector spaces; scores are only ever
/// computed between vectors produced by the same method.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>>;
}

/// MiniLM sentence embeddings for text, CLIP ViT-B/32 for images.
///
/// Inference is synchronous, so every call runs on the blocking thread pool.
pub struct FastEmbedder {
    text_model: Arc<TextEmbedding>,
    image_model: Arc<ImageEmbedding>,
}

impl FastEmbedder {
    pub fn new() -> Result<Self> {
        let text_model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true)
        ).map_err(|e| SearchError::Embedding(e.to_string()))?;

        let image_model = ImageEmbedding::try_new(
            ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32).with_show_download_progress(true)
        ).map_err(|e| SearchError::Embedding(e.to_string()))?;

        Ok(Self {
            text_model: Arc::new(text_model),
            image_model: Arc::new(image_model),
        })
    }
}

fn first_embedding(mut embeddings: Vec<Vec<f32>>) -> Result<Vec<f32>> {
    embeddings.pop().ok_or_else(|| SearchError::Embedding("model returned no embedding".to_string()))
}

fn embed_image_file(model: &ImageEmbedding, bytes: &[u8]) -> Result<Vec<f32>> {
    // The image model reads from disk and picks the decoder by extension.
    let suffix = match media::sniff_image(bytes) {
        Some("image/jpeg") => ".jpg",
        _ => ".png",
    };
    let mut file = tempfile::Builder::new().prefix("mmsearch-").suffix(suffix).tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    let embeddings = model.embed(vec![file.path()], None).map_err(|e| SearchError::Embedding(e.to_string()))?;
    first_embedding(embeddings)
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.text_model);
        let text = text.to_string();
        let embedding = tokio::task
            ::spawn_blocking(move || {
                let embeddings = model.embed(vec![text], None).map_err(|e| SearchError::Embedding(e.to_string()))?;
                first_embedding(embeddings)
            }).await
            .map_err(|e| SearchError::Embedding(e.to_string()))??;
        debug!(dimensions = embedding.len(), "embedded text");
        Ok(embedding)
    }

    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.image_model);
        let bytes = bytes.to_vec();
        let embedding = tokio::task
            ::spawn_blocking(move || embed_image_file(&model, &bytes)).await
            .map_err(|e| SearchError::Embedding(e.to_string()))??;
        debug!(dimensions = embedding.len(), "embedded image");
        Ok(embedding)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x * y)
        .sum();
    let magnitude_a: f32 = a
        .iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();
    let magnitude_b: f32 = b
        .iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Deterministic bag-of-words embedder so tests never download models.
#[cfg(test)]
pub(crate) struct HashEmbedder;

#[cfg(test)]
impl HashEmbedder {
    const DIMENSIONS: usize = 64;

    fn bucket(token: &[u8]) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % (Self::DIMENSIONS as u64)) as usize
    }
}

#[cfg(test)]
#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; Self::DIMENSIONS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[Self::bucket(word.to_lowercase().as_bytes())] += 1.0;
        }
        Ok(vector)
    }

    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; Self::DIMENSIONS];
        for chunk in bytes.chunks(2) {
            vector[Self::bucket(chunk)] += 1.0;
        }
        Ok(vector)
    }
}
