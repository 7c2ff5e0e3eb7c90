#![allow(dead_code)]

//! Feature encoders — text (TF-IDF), numeric (standard scaler) and location
//! (one-hot over a closed category set).
//!
//! Every query and every catalog row goes through the same `FeatureSpace`, so
//! their layouts agree by construction:
//!
//! ```text
//! [ text dims | experience, salary | location dims ]
//! ```

use std::collections::{BTreeSet, HashMap};

use crate::recommend::artifacts::ArtifactError;
use crate::recommend::vector::{EncodingError, SparseVector};

/// Number of numeric dimensions: (experience, salary).
pub const NUMERIC_DIMS: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Text
// ────────────────────────────────────────────────────────────────────────────

/// TF-IDF text encoder over a fixed vocabulary.
///
/// Tokens are lower-cased runs of two or more word characters. A document is
/// encoded as raw term count × idf, then L2-normalised. Out-of-vocabulary
/// tokens contribute nothing.
#[derive(Debug, Clone)]
pub struct TfidfEncoder {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfEncoder {
    /// Validates that vocabulary indices cover `0..idf.len()` exactly once.
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self, ArtifactError> {
        if vocabulary.len() != idf.len() {
            return Err(ArtifactError::Invalid(format!(
                "vocabulary has {} terms but idf has {} weights",
                vocabulary.len(),
                idf.len()
            )));
        }

        let mut seen = vec![false; idf.len()];
        for (term, &index) in &vocabulary {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(ArtifactError::Invalid(format!(
                        "vocabulary index {index} assigned twice (term '{term}')"
                    )))
                }
                None => {
                    return Err(ArtifactError::Invalid(format!(
                        "vocabulary index {index} for term '{term}' exceeds idf length {}",
                        idf.len()
                    )))
                }
            }
        }

        if let Some(pos) = idf.iter().position(|w| !w.is_finite()) {
            return Err(ArtifactError::Invalid(format!(
                "idf weight at index {pos} is not finite"
            )));
        }

        Ok(Self { vocabulary, idf })
    }

    /// Fits a vocabulary (terms in sorted order) and smooth idf weights
    /// `ln((1 + n) / (1 + df)) + 1` over the given documents.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<BTreeSet<String>> = documents
            .iter()
            .map(|doc| tokenize(doc.as_ref()).into_iter().collect())
            .collect();

        let terms: BTreeSet<&String> = tokenized.iter().flatten().collect();
        let vocabulary: HashMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        for doc in &tokenized {
            for term in doc {
                df[vocabulary[term]] += 1;
            }
        }

        let n = documents.len() as f64;
        let idf = df
            .into_iter()
            .map(|d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn encode(&self, text: &str) -> Result<SparseVector, EncodingError> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| {
                self.idf
                    .get(index)
                    .map(|weight| (index, tf * weight))
                    .ok_or(EncodingError::IndexOutOfBounds {
                        index,
                        dim: self.dim(),
                    })
            })
            .collect::<Result<_, _>>()?;
        let norm = weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();

        let normalised = weighted.into_iter().map(|(index, v)| {
            if norm > 0.0 {
                (index, v / norm)
            } else {
                (index, v)
            }
        });

        SparseVector::from_pairs(self.dim(), normalised)
    }
}

/// Lower-cases and splits on anything that is not a word character, keeping
/// tokens of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Numeric
// ────────────────────────────────────────────────────────────────────────────

/// Standard scaler over (experience, salary): `(x - mean) / scale`.
/// A zero scale is treated as 1. Inputs are not range-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; NUMERIC_DIMS],
    scale: [f64; NUMERIC_DIMS],
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        let mean: [f64; NUMERIC_DIMS] = mean.try_into().map_err(|v: Vec<f64>| {
            ArtifactError::Invalid(format!(
                "scaler mean has {} dimensions, expected {NUMERIC_DIMS}",
                v.len()
            ))
        })?;
        let scale: [f64; NUMERIC_DIMS] = scale.try_into().map_err(|v: Vec<f64>| {
            ArtifactError::Invalid(format!(
                "scaler scale has {} dimensions, expected {NUMERIC_DIMS}",
                v.len()
            ))
        })?;

        if mean.iter().chain(scale.iter()).any(|p| !p.is_finite()) {
            return Err(ArtifactError::Invalid(
                "scaler parameters must be finite".to_string(),
            ));
        }

        Ok(Self { mean, scale })
    }

    /// Population mean and standard deviation per dimension. An empty sample
    /// fits the identity transform.
    pub fn fit(samples: &[[f64; NUMERIC_DIMS]]) -> Self {
        if samples.is_empty() {
            return Self {
                mean: [0.0; NUMERIC_DIMS],
                scale: [1.0; NUMERIC_DIMS],
            };
        }

        let n = samples.len() as f64;
        let mut mean = [0.0; NUMERIC_DIMS];
        let mut scale = [0.0; NUMERIC_DIMS];
        for d in 0..NUMERIC_DIMS {
            mean[d] = samples.iter().map(|s| s[d]).sum::<f64>() / n;
            let variance = samples.iter().map(|s| (s[d] - mean[d]).powi(2)).sum::<f64>() / n;
            scale[d] = variance.sqrt();
        }

        Self { mean, scale }
    }

    pub fn mean(&self) -> &[f64; NUMERIC_DIMS] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; NUMERIC_DIMS] {
        &self.scale
    }

    pub fn transform(&self, experience: f64, salary: f64) -> SparseVector {
        let raw = [experience, salary];
        let mut scaled = [0.0; NUMERIC_DIMS];
        for d in 0..NUMERIC_DIMS {
            let scale = if self.scale[d] == 0.0 { 1.0 } else { self.scale[d] };
            scaled[d] = (raw[d] - self.mean[d]) / scale;
        }
        SparseVector::from_dense(&scaled)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Location
// ────────────────────────────────────────────────────────────────────────────

/// One-hot location encoder over a closed, ordered category set.
/// Matching is case-insensitive; unknown names are ignored.
#[derive(Debug, Clone)]
pub struct LocationEncoder {
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

impl LocationEncoder {
    pub fn new<I, S>(names: I) -> Result<Self, ArtifactError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut categories = Vec::new();
        let mut index = HashMap::new();
        for name in names {
            let key = normalise_location(name.as_ref());
            if key.is_empty() {
                return Err(ArtifactError::Invalid(
                    "location category names must be non-empty".to_string(),
                ));
            }
            if index.insert(key.clone(), categories.len()).is_some() {
                return Err(ArtifactError::Invalid(format!(
                    "duplicate location category '{key}'"
                )));
            }
            categories.push(key);
        }
        Ok(Self { categories, index })
    }

    /// Collects categories in first-seen order, skipping blanks and repeats.
    pub fn fit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut categories = Vec::new();
        let mut index = HashMap::new();
        for name in names {
            let key = normalise_location(name.as_ref());
            if key.is_empty() || index.contains_key(&key) {
                continue;
            }
            index.insert(key.clone(), categories.len());
            categories.push(key);
        }
        Self { categories, index }
    }

    pub fn dim(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn encode<I, S>(&self, locations: I) -> SparseVector
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hits: BTreeSet<usize> = locations
            .into_iter()
            .filter_map(|name| self.index.get(&normalise_location(name.as_ref())).copied())
            .collect();

        let mut slots = vec![0.0; self.dim()];
        for hit in hits {
            slots[hit] = 1.0;
        }
        SparseVector::from_dense(&slots)
    }
}

fn normalise_location(name: &str) -> String {
    name.trim().to_lowercase()
}

// ────────────────────────────────────────────────────────────────────────────
// Combined feature space
// ────────────────────────────────────────────────────────────────────────────

/// The three encoders in their fixed concatenation order.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    pub text: TfidfEncoder,
    pub numeric: StandardScaler,
    pub location: LocationEncoder,
}

impl FeatureSpace {
    /// text dims + 2 numeric dims + location dims.
    pub fn dim(&self) -> usize {
        self.text.dim() + NUMERIC_DIMS + self.location.dim()
    }

    pub fn encode<I, S>(
        &self,
        text: &str,
        experience: f64,
        salary: f64,
        locations: I,
    ) -> Result<SparseVector, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = self.text.encode(text)?;
        let numeric = self.numeric.transform(experience, salary);
        let location = self.location.encode(locations);
        Ok(SparseVector::concat(&[&text, &numeric, &location]))
    }
}
