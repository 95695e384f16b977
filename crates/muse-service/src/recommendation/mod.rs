//! Content-based product recommendations.
//!
//! Products are ranked by TF-IDF cosine similarity between the query and
//! each product description.

mod catalogue;

use std::collections::HashMap;
use std::sync::Arc;

pub use catalogue::CatalogueItem;

/// Number of recommendations returned when the caller does not ask for more.
pub const DEFAULT_TOP_K: usize = 3;

/// Ranks catalogue products against free-form text.
#[derive(Debug, Clone)]
pub struct RecommendationService {
    index: Arc<TfIdfIndex>,
}

impl RecommendationService {
    /// Creates a service over the built-in catalogue.
    pub fn new() -> Self {
        Self::with_catalogue(catalogue::default_catalogue())
    }

    /// Creates a service over a custom catalogue.
    pub fn with_catalogue(items: Vec<CatalogueItem>) -> Self {
        Self {
            index: Arc::new(TfIdfIndex::fit(items)),
        }
    }

    /// Catalogue the service ranks.
    pub fn catalogue(&self) -> &[CatalogueItem] {
        &self.index.items
    }

    /// Top [`DEFAULT_TOP_K`] product names for the query.
    pub fn recommend(&self, query: &str) -> Vec<String> {
        self.recommend_top(query, DEFAULT_TOP_K)
    }

    /// Top `k` product names for the query, best match first.
    ///
    /// An empty query returns the first `k` catalogue entries. Equal scores
    /// keep catalogue order.
    pub fn recommend_top(&self, query: &str, k: usize) -> Vec<String> {
        let items = &self.index.items;
        if query.trim().is_empty() {
            return items.iter().take(k).map(|item| item.name.clone()).collect();
        }

        let query_vector = self.index.transform(query);
        let mut scored: Vec<(usize, f64)> = self
            .index
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, dot(&query_vector, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(k)
            .map(|(position, _)| items[position].name.clone())
            .collect()
    }
}

impl Default for RecommendationService {
    fn default() -> Self {
        Self::new()
    }
}

/// Fitted vocabulary, smoothed inverse document frequencies and the
/// L2-normalised description vectors.
#[derive(Debug)]
struct TfIdfIndex {
    items: Vec<CatalogueItem>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<Vec<f64>>,
}

impl TfIdfIndex {
    fn fit(items: Vec<CatalogueItem>) -> Self {
        let documents: Vec<Vec<String>> =
            items.iter().map(|item| tokenize(&item.description)).collect();

        let mut terms: Vec<&str> = documents.iter().flatten().map(String::as_str).collect();
        terms.sort_unstable();
        terms.dedup();
        let vocabulary: HashMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(column, term)| (term.to_owned(), column))
            .collect();

        let mut document_frequency = vec![0usize; vocabulary.len()];
        for document in &documents {
            let mut seen = vec![false; vocabulary.len()];
            for token in document {
                let column = vocabulary[token];
                if !seen[column] {
                    seen[column] = true;
                    document_frequency[column] += 1;
                }
            }
        }

        let n = documents.len() as f64;
        let idf = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut index = Self {
            items,
            vocabulary,
            idf,
            vectors: Vec::new(),
        };
        index.vectors = documents
            .iter()
            .map(|document| index.weigh(document))
            .collect();
        index
    }

    fn transform(&self, text: &str) -> Vec<f64> {
        self.weigh(&tokenize(text))
    }

    /// Term counts scaled by idf and normalised to unit length. Tokens outside
    /// the vocabulary are ignored.
    fn weigh(&self, tokens: &[String]) -> Vec<f64> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                vector[column] += self.idf[column];
            }
        }

        let norm = vector.iter().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|w| *w /= norm);
        }
        vector
    }
}

/// Lowercased word tokens of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_owned)
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
