use serde::Deserialize;
use std::path::Path;
use surrealdb::engine::local::{ Db, RocksDb };
use surrealdb::Surreal;
use tracing::info;

use crate::error::Result;
use crate::models::{ ImageDocument, TextDocument };

const TEXT_TABLE: &str = "text_docs";
const IMAGE_TABLE: &str = "image_docs";

#[derive(Debug, Deserialize)]
struct CountResult {
    count: i64,
}

/// Embedded document store. Every write is durable, so an index survives restarts.
#[derive(Clone)]
pub struct Store {
    db: Surreal<Db>,
}

impl Store {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Surreal::new::<RocksDb>(db_path).await?;
        db.use_ns("mmsearch").use_db("index").await?;
        db.query(
            "
            DEFINE TABLE text_docs SCHEMALESS;
            DEFINE INDEX idx_text_doc_id ON text_docs FIELDS doc_id UNIQUE;

            DEFINE TABLE image_docs SCHEMALESS;
            DEFINE INDEX idx_image_doc_id ON image_docs FIELDS doc_id UNIQUE;
        "
        ).await?;

        info!(path = %db_path.display(), "opened document store");
        Ok(Self { db })
    }

    pub async fn insert_text(&self, document: TextDocument) -> Result<()> {
        let _created: Vec<TextDocument> = self.db.create(TEXT_TABLE).content(document).await?;
        Ok(())
    }

    pub async fn insert_image(&self, document: ImageDocument) -> Result<()> {
        let _created: Vec<ImageDocument> = self.db.create(IMAGE_TABLE).content(document).await?;
        Ok(())
    }

    /// All text documents, oldest first.
    pub async fn text_documents(&self) -> Result<Vec<TextDocument>> {
        let mut docs: Vec<TextDocument> = self.db.query("SELECT * FROM text_docs").await?.take(0)?;
        docs.sort_by_key(|d| d.indexed_at);
        Ok(docs)
    }

    /// All image documents, oldest first.
    pub async fn image_documents(&self) -> Result<Vec<ImageDocument>> {
        let mut docs: Vec<ImageDocument> = self.db.query("SELECT * FROM image_docs").await?.take(0)?;
        docs.sort_by_key(|d| d.indexed_at);
        Ok(docs)
    }

    pub async fn counts(&self) -> Result<(usize, usize)> {
        Ok((self.count(TEXT_TABLE).await?, self.count(IMAGE_TABLE).await?))
    }

    async fn count(&self, table: &str) -> Result<usize> {
        let counts: Vec<CountResult> = self.db
            .query(format!("SELECT count() AS count FROM {} GROUP ALL", table)).await?
            .take(0)?;
        Ok(
            counts
                .first()
                .map_or(0, |c| c.count.max(0) as usize)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{ Duration, Utc };
    use tempfile::TempDir;

    fn text_doc(id: &str, content: &str, offset_secs: i64) -> TextDocument {
        TextDocument {
            doc_id: id.to_string(),
            content: content.to_string(),
            metadata_json: None,
            embedding: vec![1.0, 0.0, 0.5],
            indexed_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn text_documents_come_back_oldest_first() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = Store::open(&temp_dir.path().join("test_db")).await?;
        store.insert_text(text_doc("b", "second", 10)).await?;
        store.insert_text(text_doc("a", "first", 0)).await?;

        let docs = store.text_documents().await?;
        let ids: Vec<&str> = docs
            .iter()
            .map(|d| d.doc_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(docs[0].embedding, vec![1.0, 0.0, 0.5]);
        assert_eq!(store.counts().await?, (2, 0));
        Ok(())
    }

    #[tokio::test]
    async fn empty_store_counts_zero() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = Store::open(&temp_dir.path().join("test_db")).await?;
        assert_eq!(store.counts().await?, (0, 0));
        assert!(store.image_documents().await?.is_empty());
        Ok(())
    }
}
