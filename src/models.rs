use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };

/// Which index a result (or a query) belongs to. Serialized as `"text"` / `"image"`.
///
/// Any other `type` a service sends decodes as `Other` and is shown like text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Text,
    Image,
    #[serde(other)]
    Other,
}

/// One ranked hit as it travels over the wire.
///
/// Only `type` and `score` are required when decoding; the service always
/// fills `id`, `content` and `metadata`, but clients must tolerate their absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSearchQuery {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexTextRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub id: String,
    pub status: String,
    pub message: String,
}

impl IndexResponse {
    pub fn success(id: String, message: &str) -> Self {
        Self {
            id,
            status: "success".to_string(),
            message: message.to_string(),
        }
    }
}

/// A text document as persisted in the `text_docs` table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TextDocument {
    pub doc_id: String,
    pub content: String,
    /// Serialized JSON object; `None` is stored when no metadata was supplied.
    pub metadata_json: Option<String>,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

/// An image as persisted in the `image_docs` table. The pixels themselves are not kept.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageDocument {
    pub doc_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub metadata_json: Option<String>,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

/// Decode stored metadata; documents indexed without metadata report `{}`.
pub fn decode_metadata(raw: Option<&str>) -> Value {
    raw.and_then(|s| serde_json::from_str::<Value>(s).ok()).unwrap_or_else(|| Value::Object(Map::new()))
}
