//! Resolving player input to catalog countries.
//!
//! Only [`NameMatcher::resolve_exact`] may turn input into a guess. Fuzzy
//! matching feeds the "did you mean" suggestion and nothing else, so garbled
//! input can never silently resolve to, or win as, the wrong country.

use crate::catalog::{Catalog, CatalogEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Number of autocomplete suggestions returned by default
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 3;

/// Fuzzy matches must score strictly above this (0-100 scale)
pub const FUZZY_CONFIDENCE_THRESHOLD: f64 = 80.0;

/// Matcher misses
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MatchError {
    #[error("no country named '{0}'")]
    NotFound(String),

    #[error("no confident match for '{0}'")]
    NoConfidentMatch(String),
}

/// Similarity of two names on a 0-100 scale, ignoring case
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    strsim::normalized_levenshtein(&a, &b) * 100.0
}

/// The best-scoring candidate, if it clears [`FUZZY_CONFIDENCE_THRESHOLD`].
///
/// Ties keep the earliest candidate.
pub fn fuzzy_best_match<'a, I>(input: &str, candidates: I) -> Result<&'a str, MatchError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = similarity(input, candidate);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((name, score)) if score > FUZZY_CONFIDENCE_THRESHOLD => Ok(name),
        _ => Err(MatchError::NoConfidentMatch(input.to_string())),
    }
}

/// Name lookups over a catalog
#[derive(Debug, Clone, Copy)]
pub struct NameMatcher<'a> {
    catalog: &'a Catalog,
}

impl<'a> NameMatcher<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Whole-name match ignoring case and surrounding whitespace
    pub fn resolve_exact(&self, input: &str) -> Result<&'a Arc<CatalogEntry>, MatchError> {
        let trimmed = input.trim();
        self.catalog
            .lookup(trimmed)
            .or_else(|| self.catalog.lookup_ignore_case(trimmed))
            .ok_or_else(|| MatchError::NotFound(trimmed.to_string()))
    }

    /// Up to `limit` names starting with `prefix` (ignoring case), sorted
    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<&'a str> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }

        // Catalog names are already sorted
        self.catalog
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .take(limit)
            .collect()
    }

    /// Best fuzzy match across the whole catalog
    pub fn fuzzy(&self, input: &str) -> Result<&'a str, MatchError> {
        fuzzy_best_match(input, self.catalog.entries().iter().map(|e| e.name.as_str()))
    }

    /// Suggestion for unresolved input: exact first, then fuzzy
    pub fn suggest(&self, input: &str) -> Option<&'a str> {
        match self.resolve_exact(input) {
            Ok(entry) => Some(entry.name.as_str()),
            Err(_) => self.fuzzy(input).ok(),
        }
    }
}
