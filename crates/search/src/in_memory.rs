//! In-memory retriever over JSONL documents and images.

use async_trait::async_trait;
use ragline_core::chat::RequestOverrides;
use ragline_core::error::RetrievalError;
use ragline_core::retrieval::{DocumentRecord, Retriever, SupportingImageRecord};
use std::path::Path;
use tracing::debug;

use crate::corpus::{CorpusDocument, CorpusImage, load_jsonl};
use crate::vector::{cosine_similarity, keyword_score, rank, reciprocal_rank_fusion};

const RRF_K: u32 = 60;

/// Documents and images held in a `Vec`, searched on every call.
///
/// With both a query and an embedding, keyword and vector rankings are merged
/// with RRF. With only one, that ranking is used. `exclude_category` removes
/// matching entries before ranking; `top` bounds the result count.
#[derive(Debug, Default)]
pub struct InMemorySearch {
    documents: Vec<CorpusDocument>,
    images: Vec<CorpusImage>,
}

impl InMemorySearch {
    pub fn new(documents: Vec<CorpusDocument>, images: Vec<CorpusImage>) -> Self {
        Self { documents, images }
    }

    /// Load documents (and optionally images) from JSONL files.
    pub fn load(corpus: &Path, images: Option<&Path>) -> Result<Self, RetrievalError> {
        let documents = load_jsonl(corpus)?;
        let images = match images {
            Some(path) => load_jsonl(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(documents, images))
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    fn documents_for<'a>(
        &'a self,
        overrides: &'a RequestOverrides,
    ) -> impl Iterator<Item = (usize, &'a CorpusDocument)> + 'a {
        self.documents
            .iter()
            .enumerate()
            .filter(move |(_, d)| !excluded(d.category.as_deref(), overrides))
    }

    fn images_for<'a>(
        &'a self,
        overrides: &'a RequestOverrides,
    ) -> impl Iterator<Item = (usize, &'a CorpusImage)> + 'a {
        self.images
            .iter()
            .enumerate()
            .filter(move |(_, img)| !excluded(img.category.as_deref(), overrides))
    }
}

fn excluded(category: Option<&str>, overrides: &RequestOverrides) -> bool {
    match (category, overrides.exclude_category.as_deref()) {
        (Some(c), Some(ex)) => c.eq_ignore_ascii_case(ex),
        _ => false,
    }
}

fn keyword_ranking<'a>(
    texts: impl Iterator<Item = (usize, &'a str)>,
    query: &str,
    limit: usize,
) -> Vec<(usize, f32)> {
    let scored = texts
        .map(|(idx, text)| (idx, keyword_score(text, query)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    rank(scored, limit)
}

fn vector_ranking<'a>(
    vectors: impl Iterator<Item = (usize, &'a [f32])>,
    embedding: &[f32],
    limit: usize,
) -> Vec<(usize, f32)> {
    let scored = vectors
        .map(|(idx, v)| (idx, cosine_similarity(v, embedding)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    rank(scored, limit)
}

fn fuse(
    keyword: Option<Vec<(usize, f32)>>,
    vector: Option<Vec<(usize, f32)>>,
    limit: usize,
) -> Vec<(usize, f32)> {
    match (keyword, vector) {
        (Some(k), Some(v)) => reciprocal_rank_fusion(&k, &v, RRF_K, limit),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => Vec::new(),
    }
}

#[async_trait]
impl Retriever for InMemorySearch {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query_documents(
        &self,
        query: Option<&str>,
        embedding: Option<&[f32]>,
        overrides: &RequestOverrides,
    ) -> Result<Vec<DocumentRecord>, RetrievalError> {
        let top = overrides.top();

        let keyword = query.filter(|q| !q.trim().is_empty()).map(|q| {
            // Titles take part in keyword matching.
            let texts: Vec<(usize, String)> = self
                .documents_for(overrides)
                .map(|(i, d)| (i, format!("{} {}", d.title, d.content)))
                .collect();
            keyword_ranking(texts.iter().map(|(i, t)| (*i, t.as_str())), q, top)
        });

        let vector = embedding.filter(|e| !e.is_empty()).map(|e| {
            vector_ranking(
                self.documents_for(overrides)
                    .filter_map(|(i, d)| d.embedding.as_deref().map(|v| (i, v))),
                e,
                top,
            )
        });

        let ranked = fuse(keyword, vector, top);
        debug!(
            query = query.unwrap_or(""),
            filter = overrides.search_filter().as_deref().unwrap_or(""),
            // Accepted for interface parity; this index has no semantic ranker.
            semantic_captions = overrides.semantic_captions(),
            semantic_ranker = overrides.semantic_ranker(),
            hits = ranked.len(),
            "Document search"
        );

        Ok(ranked
            .into_iter()
            .map(|(idx, score)| self.documents[idx].to_record(score))
            .collect())
    }

    async fn query_images(
        &self,
        query: Option<&str>,
        embedding: &[f32],
        overrides: &RequestOverrides,
    ) -> Result<Vec<SupportingImageRecord>, RetrievalError> {
        let top = overrides.top();

        let vector = vector_ranking(
            self.images_for(overrides)
                .filter_map(|(i, img)| img.embedding.as_deref().map(|v| (i, v))),
            embedding,
            top,
        );

        let ranked = if vector.is_empty() {
            match query {
                Some(q) => keyword_ranking(
                    self.images_for(overrides).map(|(i, img)| (i, img.title.as_str())),
                    q,
                    top,
                ),
                None => Vec::new(),
            }
        } else {
            vector
        };

        debug!(hits = ranked.len(), "Image search");
        Ok(ranked
            .into_iter()
            .map(|(idx, _)| self.images[idx].to_record())
            .collect())
    }
}
