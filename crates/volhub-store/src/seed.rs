//! Seed data loading.
//!
//! A seed file is a JSON object of the form
//! `{ "<collection>": { "<document id>": { <fields> } } }`.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use volhub_core::error::AppError;
use volhub_core::result::AppResult;
use volhub_core::types::{Document, DocumentRef};

use crate::memory::MemoryStore;

/// Parse seed JSON into documents.
pub fn parse_seed(json: &str) -> AppResult<Vec<Document>> {
    let root: Map<String, Value> = serde_json::from_str(json)?;
    let mut docs = Vec::new();

    for (collection, entries) in root {
        let Value::Object(entries) = entries else {
            return Err(AppError::validation(format!(
                "Seed collection '{collection}' must be an object"
            )));
        };
        for (id, fields) in entries {
            let Value::Object(fields) = fields else {
                return Err(AppError::validation(format!(
                    "Seed document '{collection}/{id}' must be an object"
                )));
            };
            docs.push(Document::new(DocumentRef::new(collection.clone(), id), fields));
        }
    }

    Ok(docs)
}

/// Render documents back into seed JSON.
pub fn render_seed(docs: &[Document]) -> AppResult<String> {
    let mut root = Map::new();
    for doc in docs {
        let collection = root
            .entry(doc.reference.collection.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(entries) = collection {
            entries.insert(doc.reference.id.clone(), Value::Object(doc.fields.clone()));
        }
    }
    Ok(serde_json::to_string_pretty(&Value::Object(root))?)
}

/// Read and parse a seed file.
pub async fn load_seed_file(path: impl AsRef<Path>) -> AppResult<Vec<Document>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::with_source(
            volhub_core::error::ErrorKind::Configuration,
            format!("Cannot read seed file {}", path.display()),
            e,
        )
    })?;
    parse_seed(&raw)
}

impl MemoryStore {
    /// Load a seed file into the store.
    pub async fn seed_from_file(&self, path: impl AsRef<Path>) -> AppResult<usize> {
        let path = path.as_ref();
        let docs = load_seed_file(path).await?;
        let count = docs.len();
        self.put_documents(docs).await;
        info!(path = %path.display(), documents = count, "Seed loaded");
        Ok(count)
    }

    /// Write every committed document to a seed file.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> AppResult<usize> {
        let path = path.as_ref();
        let docs = self.documents().await;
        tokio::fs::write(path, render_seed(&docs)?).await?;
        info!(path = %path.display(), documents = docs.len(), "Seed saved");
        Ok(docs.len())
    }
}
