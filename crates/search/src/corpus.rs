//! JSON-lines corpus files.
//!
//! Each non-empty line is one JSON object. Corrupted lines are skipped with a
//! warning; a missing or unreadable file is an error.

use ragline_core::error::RetrievalError;
use ragline_core::retrieval::{DocumentRecord, SupportingImageRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// A passage as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub title: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CorpusDocument {
    pub fn to_record(&self, score: f32) -> DocumentRecord {
        DocumentRecord {
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            score: Some(score),
        }
    }
}

/// An image as stored on disk. `url` is the unsigned blob URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusImage {
    pub title: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CorpusImage {
    pub fn to_record(&self) -> SupportingImageRecord {
        SupportingImageRecord {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Read a JSONL file into typed entries.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RetrievalError> {
    let content = std::fs::read_to_string(path).map_err(|e| RetrievalError::Corpus {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let entries: Vec<T> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<T>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), line = idx + 1, error = %e, "Skipping corrupted corpus line");
                None
            }
        })
        .collect();

    debug!(path = %path.display(), count = entries.len(), "Corpus file loaded");
    Ok(entries)
}
