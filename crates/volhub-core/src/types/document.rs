//! Value types exchanged with the remote document store.
//!
//! Documents are schemaless JSON maps addressed by `(collection, id)`.
//! Writes address fields with dotted paths, so `attendanceRecords.<id>`
//! targets one entry of a nested map.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Collection name.
    pub collection: String,
    /// Document id within the collection.
    pub id: String,
}

impl DocumentRef {
    /// Creates a document reference.
    pub fn new(collection: impl Into<String>, id: impl ToString) -> Self {
        Self {
            collection: collection.into(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Where the document lives.
    pub reference: DocumentRef,
    /// Field values.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Creates a document.
    pub fn new(reference: DocumentRef, fields: Map<String, Value>) -> Self {
        Self { reference, fields }
    }

    /// Resolves a dotted field path.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.fields.get(first)?, |value, part| value.get(part))
    }
}

/// Filter applied to a collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldFilter {
    /// The field equals `value`.
    Equals {
        /// Dotted field path.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// The field is an array containing `value`.
    ArrayContains {
        /// Dotted field path.
        field: String,
        /// Element to look for.
        value: Value,
    },
}

impl FieldFilter {
    /// Whether `doc` passes this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Equals { field, value } => doc.get_path(field) == Some(value),
            Self::ArrayContains { field, value } => doc
                .get_path(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// A read-once or subscribable query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Query {
    /// A single document. Yields zero or one result.
    Document(DocumentRef),
    /// All documents of a collection passing an optional filter.
    Collection {
        /// Collection name.
        collection: String,
        /// Optional filter.
        filter: Option<FieldFilter>,
    },
}

impl Query {
    /// Query a whole collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self::Collection {
            collection: collection.into(),
            filter: None,
        }
    }

    /// Whether `doc` falls inside this query's result set.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Document(reference) => &doc.reference == reference,
            Self::Collection { collection, filter } => {
                &doc.reference.collection == collection
                    && filter.as_ref().is_none_or(|f| f.matches(doc))
            }
        }
    }

    /// Whether a change to `reference` may affect this query's result set.
    pub fn touches(&self, reference: &DocumentRef) -> bool {
        match self {
            Self::Document(target) => target == reference,
            Self::Collection { collection, .. } => &reference.collection == collection,
        }
    }
}

/// Operation applied to one field of an existing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FieldOp {
    /// Replace the field with a value.
    Set(Value),
    /// Remove the field.
    Delete,
    /// Add an element to an array field unless already present.
    ArrayUnion(Value),
    /// Remove every occurrence of an element from an array field.
    ArrayRemove(Value),
}

/// One entry of an atomic commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Write {
    /// Mutate one field of an existing document.
    Field {
        /// Target document.
        document: DocumentRef,
        /// Dotted field path.
        field_path: String,
        /// The mutation.
        op: FieldOp,
    },
    /// Create a document. Fails if it already exists.
    Create {
        /// Target document.
        document: DocumentRef,
        /// Initial fields.
        fields: Map<String, Value>,
    },
    /// Delete a whole document. Fails if it does not exist.
    DeleteDocument {
        /// Target document.
        document: DocumentRef,
    },
}

impl Write {
    /// Shorthand for a field write.
    pub fn field(document: DocumentRef, field_path: impl Into<String>, op: FieldOp) -> Self {
        Self::Field {
            document,
            field_path: field_path.into(),
            op,
        }
    }

    /// The document this write targets.
    pub fn document(&self) -> &DocumentRef {
        match self {
            Self::Field { document, .. }
            | Self::Create { document, .. }
            | Self::DeleteDocument { document } => document,
        }
    }
}
