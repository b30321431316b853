//! Write application against a staged copy of the collections.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use volhub_core::error::AppError;
use volhub_core::result::AppResult;
use volhub_core::types::{DocumentRef, FieldOp, Write};

/// Collection name → document id → fields.
pub type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// Apply one write to `state`.
pub fn apply_write(state: &mut Collections, write: &Write) -> AppResult<()> {
    match write {
        Write::Create { document, fields } => {
            let collection = state.entry(document.collection.clone()).or_default();
            if collection.contains_key(&document.id) {
                return Err(AppError::commit_failed(format!(
                    "Document {document} already exists"
                )));
            }
            collection.insert(document.id.clone(), fields.clone());
            Ok(())
        }
        Write::DeleteDocument { document } => state
            .get_mut(&document.collection)
            .and_then(|c| c.remove(&document.id))
            .map(|_| ())
            .ok_or_else(|| missing(document)),
        Write::Field {
            document,
            field_path,
            op,
        } => {
            let fields = state
                .get_mut(&document.collection)
                .and_then(|c| c.get_mut(&document.id))
                .ok_or_else(|| missing(document))?;
            apply_field(fields, field_path, op)
                .map_err(|e| AppError::commit_failed(format!("{document}: {}", e.message)))
        }
    }
}

fn missing(document: &DocumentRef) -> AppError {
    AppError::not_found(format!("Document {document} does not exist"))
}

fn apply_field(fields: &mut Map<String, Value>, path: &str, op: &FieldOp) -> AppResult<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(AppError::validation("Empty field path"));
    };

    let create_parents = matches!(op, FieldOp::Set(_) | FieldOp::ArrayUnion(_));
    let mut current = fields;
    for segment in parents {
        if !current.contains_key(*segment) {
            if !create_parents {
                return Ok(());
            }
            current.insert((*segment).to_string(), Value::Object(Map::new()));
        }
        current = match current.get_mut(*segment) {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(AppError::validation(format!(
                    "Field '{segment}' in path '{path}' is not a map"
                )));
            }
        };
    }

    match op {
        FieldOp::Set(value) => {
            current.insert((*leaf).to_string(), value.clone());
        }
        FieldOp::Delete => {
            current.remove(*leaf);
        }
        FieldOp::ArrayUnion(value) => {
            let slot = current
                .entry((*leaf).to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            let Value::Array(items) = slot else {
                return Err(AppError::validation(format!("Field '{path}' is not an array")));
            };
            if !items.contains(value) {
                items.push(value.clone());
            }
        }
        FieldOp::ArrayRemove(value) => match current.get_mut(*leaf) {
            Some(Value::Array(items)) => items.retain(|item| item != value),
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(AppError::validation(format!("Field '{path}' is not an array")));
            }
        },
    }

    Ok(())
}
