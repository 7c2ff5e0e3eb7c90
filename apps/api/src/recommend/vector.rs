#![allow(dead_code)]

//! Sparse feature vectors shared by the query encoder and the catalog.

use thiserror::Error;

/// Raised when two feature layouts disagree. Always a configuration defect:
/// the encoder, scaler and catalog artifacts were built inconsistently.
#[derive(Debug, Error, PartialEq)]
pub enum EncodingError {
    #[error("feature dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("feature index {index} out of bounds for dimension {dim}")]
    IndexOutOfBounds { index: usize, dim: usize },
}

/// A sparse vector: explicit dimensionality plus non-zero `(index, value)`
/// pairs kept sorted by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// All-zero vector of the given dimensionality.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Builds a vector from unordered pairs. Duplicate indices are summed and
    /// zeros dropped.
    pub fn from_pairs<I>(dim: usize, pairs: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut entries: Vec<(usize, f64)> = Vec::new();
        for (index, value) in pairs {
            if index >= dim {
                return Err(EncodingError::IndexOutOfBounds { index, dim });
            }
            entries.push((index, value));
        }
        entries.sort_by_key(|(index, _)| *index);

        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (index, value) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == index => *acc += value,
                _ => merged.push((index, value)),
            }
        }
        merged.retain(|(_, value)| *value != 0.0);

        Ok(Self {
            dim,
            entries: merged,
        })
    }

    /// Dense slice, one slot per dimension.
    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            dim: values.len(),
            entries: values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Value at `index`, zero when absent.
    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    /// Largest absolute component, zero for an all-zero vector.
    pub fn max_abs(&self) -> f64 {
        self.entries.iter().fold(0.0, |acc, (_, v)| acc.max(v.abs()))
    }

    /// L2 norm, computed on components scaled by `max_abs` so squaring cannot
    /// overflow for large finite values.
    pub fn norm(&self) -> f64 {
        let max = self.max_abs();
        if max == 0.0 || !max.is_finite() {
            return max;
        }
        let sum: f64 = self.entries.iter().map(|(_, v)| (v / max).powi(2)).sum();
        max * sum.sqrt()
    }

    /// Every component multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            dim: self.dim,
            entries: self
                .entries
                .iter()
                .map(|(i, v)| (*i, v * factor))
                .filter(|(_, v)| *v != 0.0)
                .collect(),
        }
    }

    pub fn dot(&self, other: &SparseVector) -> Result<f64, EncodingError> {
        self.check_dim(other)?;

        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ai, av) = self.entries[i];
            let (bi, bv) = other.entries[j];
            match ai.cmp(&bi) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += av * bv;
                    i += 1;
                    j += 1;
                }
            }
        }
        Ok(sum)
    }

    /// Concatenates blocks in order, offsetting each block's indices by the
    /// dimensionality of the blocks before it.
    pub fn concat(blocks: &[&SparseVector]) -> Self {
        let mut dim = 0;
        let mut entries = Vec::new();
        for block in blocks {
            entries.extend(block.entries.iter().map(|(i, v)| (i + dim, *v)));
            dim += block.dim;
        }
        Self { dim, entries }
    }

    fn check_dim(&self, other: &SparseVector) -> Result<(), EncodingError> {
        if self.dim != other.dim {
            return Err(EncodingError::DimensionMismatch {
                expected: self.dim,
                got: other.dim,
            });
        }
        Ok(())
    }
}

/// Cosine similarity `(a·b) / (‖a‖·‖b‖)`, defined as 0 when either norm is 0.
///
/// Both vectors are first divided by their largest component; cosine is
/// scale-invariant, and this keeps the dot product and norms finite for any
/// finite input. The result is never negative zero.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> Result<f64, EncodingError> {
    a.check_dim(b)?;

    let a_max = a.max_abs();
    let b_max = b.max_abs();
    if a_max == 0.0 || b_max == 0.0 {
        return Ok(0.0);
    }

    let a = a.scaled(1.0 / a_max);
    let b = b.scaled(1.0 / b_max);
    let dot = a.dot(&b)?;

    let a_norm = a.norm();
    let b_norm = b.norm();
    if a_norm == 0.0 || b_norm == 0.0 {
        return Ok(0.0);
    }

    // -0.0 + 0.0 == +0.0, so underflowed negatives do not sort below zero
    Ok(dot / (a_norm * b_norm) + 0.0)
}
