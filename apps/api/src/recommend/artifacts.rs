//! Artifact bundle — the encoders plus the pre-encoded job catalog.
//!
//! Loaded once at startup, validated once, then shared read-only behind an
//! `Arc` by every request. Any validation failure is fatal: it means the
//! vectorizer, scaler and catalog were built inconsistently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::recommend::encoder::{FeatureSpace, LocationEncoder, StandardScaler, TfidfEncoder};
use crate::recommend::vector::{EncodingError, SparseVector};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid artifact: {0}")]
    Invalid(String),

    #[error("failed to encode artifact rows: {0}")]
    Encoding(#[from] EncodingError),
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One job posting in the catalog, already encoded into the bundle's
/// feature space. Its position in the catalog is its identity.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub company: String,
    pub link: String,
    pub features: SparseVector,
}

/// A raw job posting, before encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub company: String,
    pub link: String,
    pub text: String,
    pub experience: f64,
    pub salary: f64,
    pub location: String,
}

/// Immutable encoders + catalog. Every catalog row has `space.dim()`
/// dimensions.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    space: FeatureSpace,
    catalog: Vec<CatalogEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// On-disk layout
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    vectorizer: VectorizerFile,
    scaler: ScalerFile,
    locations: Vec<String>,
    catalog: Vec<CatalogRowFile>,
}

#[derive(Debug, Deserialize)]
struct VectorizerFile {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// A row is either precomputed (`features`) or raw (`text`, `experience`,
/// `salary`, `location`), in which case it is encoded at load.
#[derive(Debug, Deserialize)]
struct CatalogRowFile {
    company: String,
    link: String,
    features: Option<FeatureFile>,
    text: Option<String>,
    experience: Option<f64>,
    salary: Option<f64>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeatureFile {
    indices: Vec<usize>,
    values: Vec<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────────────────────────────────────

impl ArtifactBundle {
    /// Validates that every catalog row lives in `space`.
    pub fn new(space: FeatureSpace, catalog: Vec<CatalogEntry>) -> Result<Self, ArtifactError> {
        let dim = space.dim();
        for (row, entry) in catalog.iter().enumerate() {
            if entry.features.dim() != dim {
                return Err(ArtifactError::Invalid(format!(
                    "catalog row {row} has {} dimensions, feature space has {dim}",
                    entry.features.dim()
                )));
            }
        }
        Ok(Self { space, catalog })
    }

    /// Reads and validates a bundle from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let bundle = Self::from_json(&raw)?;
        info!(
            "Loaded artifact bundle from {}: {} catalog rows, {} dims ({} terms, {} locations)",
            path.display(),
            bundle.catalog.len(),
            bundle.dim(),
            bundle.space.text.dim(),
            bundle.space.location.dim()
        );
        Ok(bundle)
    }

    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        let file: ArtifactFile = serde_json::from_str(raw)?;

        let space = FeatureSpace {
            text: TfidfEncoder::new(file.vectorizer.vocabulary, file.vectorizer.idf)?,
            numeric: StandardScaler::new(file.scaler.mean, file.scaler.scale)?,
            location: LocationEncoder::new(&file.locations)?,
        };

        let catalog = file
            .catalog
            .into_iter()
            .enumerate()
            .map(|(row, record)| encode_row(&space, row, record))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(space, catalog)
    }

    /// Fits encoders over raw postings and encodes every posting with them.
    pub fn fit(postings: &[JobPosting]) -> Result<Self, ArtifactError> {
        let texts: Vec<&str> = postings.iter().map(|p| p.text.as_str()).collect();
        let numerics: Vec<[f64; 2]> = postings.iter().map(|p| [p.experience, p.salary]).collect();

        let space = FeatureSpace {
            text: TfidfEncoder::fit(&texts),
            numeric: StandardScaler::fit(&numerics),
            location: LocationEncoder::fit(postings.iter().map(|p| p.location.as_str())),
        };

        let catalog = postings
            .iter()
            .map(|p| {
                let features =
                    space.encode(&p.text, p.experience, p.salary, [p.location.as_str()])?;
                Ok(CatalogEntry {
                    company: p.company.clone(),
                    link: p.link.clone(),
                    features,
                })
            })
            .collect::<Result<Vec<_>, EncodingError>>()?;

        info!(
            "Fitted artifact bundle over {} postings ({} dims)",
            postings.len(),
            space.dim()
        );

        Ok(Self { space, catalog })
    }

    pub fn space(&self) -> &FeatureSpace {
        &self.space
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Dimensionality shared by every query and catalog row.
    pub fn dim(&self) -> usize {
        self.space.dim()
    }

    pub fn locations(&self) -> &[String] {
        self.space.location.categories()
    }
}

fn encode_row(
    space: &FeatureSpace,
    row: usize,
    record: CatalogRowFile,
) -> Result<CatalogEntry, ArtifactError> {
    let features = match record.features {
        Some(FeatureFile { indices, values }) => {
            let raw_columns = [
                ("text", record.text.is_some()),
                ("experience", record.experience.is_some()),
                ("salary", record.salary.is_some()),
                ("location", record.location.is_some()),
            ];
            if let Some((column, _)) = raw_columns.iter().find(|(_, present)| *present) {
                return Err(ArtifactError::Invalid(format!(
                    "catalog row {row}: has both 'features' and raw column '{column}'"
                )));
            }
            if indices.len() != values.len() {
                return Err(ArtifactError::Invalid(format!(
                    "catalog row {row}: {} indices but {} values",
                    indices.len(),
                    values.len()
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ArtifactError::Invalid(format!(
                    "catalog row {row}: feature values must be finite"
                )));
            }
            SparseVector::from_pairs(space.dim(), indices.into_iter().zip(values))
                .map_err(|e| ArtifactError::Invalid(format!("catalog row {row}: {e}")))?
        }
        None => {
            let missing = |column: &str| {
                ArtifactError::Invalid(format!("catalog row {row}: missing column '{column}'"))
            };
            let text = record.text.ok_or_else(|| missing("text"))?;
            let experience = record.experience.ok_or_else(|| missing("experience"))?;
            let salary = record.salary.ok_or_else(|| missing("salary"))?;
            let location = record.location.ok_or_else(|| missing("location"))?;
            space
                .encode(&text, experience, salary, [location])
                .map_err(|e| ArtifactError::Invalid(format!("catalog row {row}: {e}")))?
        }
    };

    Ok(CatalogEntry {
        company: record.company,
        link: record.link,
        features,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn posting(
        company: &str,
        text: &str,
        experience: f64,
        salary: f64,
        location: &str,
    ) -> JobPosting {
        JobPosting {
            company: company.to_string(),
            link: format!("{}.co", company.to_lowercase()),
            text: text.to_string(),
            experience,
            salary,
            location: location.to_string(),
        }
    }

    fn bundle_json() -> serde_json::Value {
        json!({
            "vectorizer": {
                "vocabulary": {"backend": 0, "java": 1, "ml": 2, "python": 3},
                "idf": [1.4, 1.4, 1.4, 1.4]
            },
            "scaler": {"mean": [3.5, 15.0], "scale": [1.5, 5.0]},
            "locations": ["Bangalore", "Pune"],
            "catalog": [
                {
                    "company": "A",
                    "link": "a.co",
                    "features": {"indices": [2, 3, 4, 5, 6], "values": [0.7, 0.7, -1.0, -1.0, 1.0]}
                },
                {
                    "company": "B",
                    "link": "b.co",
                    "text": "java backend",
                    "experience": 5.0,
                    "salary": 20.0,
                    "location": "pune"
                }
            ]
        })
    }

    #[test]
    fn test_from_json_mixes_precomputed_and_raw_rows() {
        let bundle = ArtifactBundle::from_json(&bundle_json().to_string()).unwrap();
        assert_eq!(bundle.dim(), 4 + 2 + 2);
        assert_eq!(bundle.catalog().len(), 2);
        assert_eq!(bundle.locations(), &["bangalore", "pune"]);

        let raw = &bundle.catalog()[1];
        assert_eq!(raw.company, "B");
        assert_eq!(raw.features.get(4), 1.0); // (5 - 3.5) / 1.5
        assert_eq!(raw.features.get(7), 1.0); // pune
        assert_eq!(raw.features.get(6), 0.0);
    }

    #[test]
    fn test_rejects_precomputed_index_out_of_bounds() {
        let mut doc = bundle_json();
        doc["catalog"][0]["features"] = json!({"indices": [8], "values": [1.0]});
        let err = ArtifactBundle::from_json(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("catalog row 0"), "{err}");
    }

    #[test]
    fn test_rejects_ragged_features() {
        let mut doc = bundle_json();
        doc["catalog"][0]["features"] = json!({"indices": [0, 1], "values": [1.0]});
        assert!(ArtifactBundle::from_json(&doc.to_string()).is_err());
    }

    #[test]
    fn test_rejects_vocabulary_idf_mismatch() {
        let mut doc = bundle_json();
        doc["vectorizer"]["idf"] = json!([1.0, 1.0]);
        let err = ArtifactBundle::from_json(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid(_)));
    }

    #[test]
    fn test_rejects_raw_row_missing_column() {
        let mut doc = bundle_json();
        doc["catalog"][1]
            .as_object_mut()
            .unwrap()
            .remove("salary");
        let err = ArtifactBundle::from_json(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("missing column 'salary'"), "{err}");
    }

    #[test]
    fn test_rejects_row_with_features_and_raw_columns() {
        let mut doc = bundle_json();
        doc["catalog"][0]["text"] = json!("python ml");
        let err = ArtifactBundle::from_json(&doc.to_string()).unwrap_err();
        assert!(
            err.to_string()
                .contains("has both 'features' and raw column 'text'"),
            "{err}"
        );
    }

    #[test]
    fn test_rejects_missing_company() {
        let mut doc = bundle_json();
        doc["catalog"][0].as_object_mut().unwrap().remove("company");
        let err = ArtifactBundle::from_json(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ArtifactError::Json(_)));
    }

    #[test]
    fn test_new_rejects_row_with_wrong_dimension() {
        let bundle = ArtifactBundle::fit(&[posting("A", "python ml", 2.0, 10.0, "bangalore")]).unwrap();
        let bad = CatalogEntry {
            company: "X".to_string(),
            link: "x.co".to_string(),
            features: SparseVector::zeros(bundle.dim() + 1),
        };
        assert!(ArtifactBundle::new(bundle.space().clone(), vec![bad]).is_err());
    }

    #[test]
    fn test_fit_encodes_every_posting() {
        let bundle = ArtifactBundle::fit(&[
            posting("A", "python ml", 2.0, 10.0, "bangalore"),
            posting("B", "java backend", 5.0, 20.0, "pune"),
        ]).unwrap();
        assert_eq!(bundle.dim(), 4 + 2 + 2);
        assert!(bundle.catalog().iter().all(|e| e.features.dim() == bundle.dim()));
    }

    #[test]
    fn test_fit_empty_catalog() {
        let bundle = ArtifactBundle::fit(&[]).unwrap();
        assert!(bundle.catalog().is_empty());
        assert_eq!(bundle.dim(), 2);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bundle_json().to_string().as_bytes()).unwrap();

        let bundle = ArtifactBundle::load(file.path()).unwrap();
        assert_eq!(bundle.catalog()[0].company, "A");
    }

    #[test]
    fn test_sample_bundle_is_valid() {
        let bundle =
            ArtifactBundle::from_json(include_str!("../../data/artifacts.sample.json")).unwrap();
        assert_eq!(bundle.catalog().len(), 4);
        assert_eq!(bundle.dim(), 10 + 2 + 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ArtifactBundle::load("/nonexistent/artifacts.json").unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
