//! Recommendation scorer — ranks the catalog against one job-preference query.
//!
//! `AppState` holds an `Arc<dyn Recommender>`; `CosineRecommender` is the
//! implementation used at startup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recommend::artifacts::ArtifactBundle;
use crate::recommend::vector::{cosine_similarity, EncodingError, SparseVector};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One recommendation request. Owned by the caller; never shared.
/// Missing fields fall back to empty text, zero and no locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQuery {
    pub title: String,
    pub skills: Vec<String>,
    pub section: String,
    pub experience: f64,
    pub salary: f64,
    pub locations: Vec<String>,
}

impl JobQuery {
    /// Title, section and skills joined into one document.
    pub fn text(&self) -> String {
        let mut parts = vec![self.title.as_str(), self.section.as_str()];
        parts.extend(self.skills.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// A matched posting as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub company: String,
    pub link: String,
}

/// A ranked catalog row with its similarity, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMatch {
    pub index: usize,
    pub similarity: f64,
    pub company: String,
    pub link: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Swap ranking backends without touching handlers.
///
/// Carried in `AppState` as `Arc<dyn Recommender>`.
pub trait Recommender: Send + Sync {
    /// Top `top_n` catalog rows, best first, with their similarity.
    fn rank(&self, query: &JobQuery, top_n: usize) -> Result<Vec<ScoredMatch>, EncodingError>;

    /// Same ranking reduced to what a job seeker sees.
    fn recommend(
        &self,
        query: &JobQuery,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, EncodingError> {
        Ok(self
            .rank(query, top_n)?
            .into_iter()
            .map(|m| Recommendation {
                company: m.company,
                link: m.link,
            })
            .collect())
    }

    /// Known location categories a query may select from.
    fn locations(&self) -> &[String];
}

// ────────────────────────────────────────────────────────────────────────────
// CosineRecommender
// ────────────────────────────────────────────────────────────────────────────

/// Cosine similarity over the bundle's combined feature vectors.
///
/// Algorithm:
/// 1. Encode text (title + section + skills), numeric pair and locations
///    into one vector laid out like every catalog row
/// 2. Cosine similarity against each row (0 when either norm is 0)
/// 3. Stable sort descending, so ties keep catalog order
/// 4. Take `top_n`
pub struct CosineRecommender {
    artifacts: Arc<ArtifactBundle>,
}

impl CosineRecommender {
    pub fn new(artifacts: Arc<ArtifactBundle>) -> Self {
        Self { artifacts }
    }

    /// Encodes a query into the bundle's feature space.
    pub fn encode(&self, query: &JobQuery) -> Result<SparseVector, EncodingError> {
        let vector = self.artifacts.space().encode(
            &query.text(),
            query.experience,
            query.salary,
            &query.locations,
        )?;

        let expected = self.artifacts.dim();
        if vector.dim() != expected {
            return Err(EncodingError::DimensionMismatch {
                expected,
                got: vector.dim(),
            });
        }
        Ok(vector)
    }
}

impl Recommender for CosineRecommender {
    fn rank(&self, query: &JobQuery, top_n: usize) -> Result<Vec<ScoredMatch>, EncodingError> {
        let catalog = self.artifacts.catalog();
        if top_n == 0 || catalog.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.encode(query)?;

        let mut scored: Vec<(usize, f64)> = catalog
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                cosine_similarity(&vector, &entry.features).map(|similarity| (index, similarity))
            })
            .collect::<Result<_, _>>()?;

        // sort_by is stable: equal scores stay in catalog order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);

        debug!(
            "Ranked {} catalog rows, returning {} (best similarity {:?})",
            catalog.len(),
            scored.len(),
            scored.first().map(|(_, s)| *s)
        );

        Ok(scored
            .into_iter()
            .map(|(index, similarity)| ScoredMatch {
                index,
                similarity,
                company: catalog[index].company.clone(),
                link: catalog[index].link.clone(),
            })
            .collect())
    }

    fn locations(&self) -> &[String] {
        self.artifacts.locations()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
