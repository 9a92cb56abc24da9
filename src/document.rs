use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    button::{check_choice, non_empty},
    error::ApiError,
    store::{OwnedResource, Record, SqliteQuery},
};

pub const DOCUMENT_TYPES: [&str; 4] = ["contract", "terms", "ethics", "license"];

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewDocument {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
}

impl OwnedResource for Document {
    type Draft = NewDocument;
    type Patch = DocumentPatch;

    const TABLE: &'static str = "documents";
    const FIELDS: &'static [&'static str] = &["title", "content", "doc_type"];
    const SINGULAR: &'static str = "document";
    const PLURAL: &'static str = "documents";
    const NOT_FOUND: &'static str = "Document not found";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn from_draft(draft: NewDocument, record: Record) -> Result<Self, ApiError> {
        let (Some(title), Some(doc_type)) = (non_empty(draft.title), non_empty(draft.doc_type))
        else {
            return Err(ApiError::BadRequest(
                "Title and type are required".to_string(),
            ));
        };
        check_choice("type", Some(doc_type.as_str()), &DOCUMENT_TYPES)?;

        Ok(Self {
            record,
            title,
            content: draft.content.unwrap_or_default(),
            doc_type,
        })
    }

    fn validate_patch(patch: &DocumentPatch) -> Result<(), ApiError> {
        match patch.doc_type.as_deref() {
            // A document always has a type, so "" is not a way to clear it.
            Some("") => Err(ApiError::BadRequest("type cannot be empty".to_string())),
            doc_type => check_choice("type", doc_type, &DOCUMENT_TYPES),
        }
    }

    fn merge(&mut self, patch: DocumentPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(doc_type) = patch.doc_type {
            self.doc_type = doc_type;
        }
    }

    fn bind_fields<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.title.clone())
            .bind(self.content.clone())
            .bind(self.doc_type.clone())
    }
}
