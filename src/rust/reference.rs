//! Disease and supplement reference tables.
//!
//! Both tables are row-indexed by class index: row `k` describes the disease the
//! model reports as class `k` and the supplement suggested for it. They are
//! loaded once at startup and never modified.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

/// A row of the disease table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiseaseRecord {
    pub disease_name: String,
    pub description: String,
    #[serde(rename = "Possible Steps")]
    pub possible_steps: String,
    pub image_url: String,
}

/// A row of the supplement table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupplementRecord {
    pub disease_name: String,
    #[serde(rename = "supplement name")]
    pub supplement_name: String,
    #[serde(rename = "supplement image")]
    pub supplement_image: String,
    #[serde(rename = "buy link")]
    pub buy_link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("{table} table not found at {}", .path.display())]
    Missing { table: &'static str, path: PathBuf },
    #[error("Failed to read {table} table at {}: {source}", .path.display())]
    Io {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed {table} table: {source}")]
    Malformed {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table has no rows")]
    Empty { table: &'static str },
    #[error("Row count mismatch: disease table has {diseases} rows, supplement table has {supplements}")]
    RowCountMismatch { diseases: usize, supplements: usize },
}

/// The two reference tables, guaranteed non-empty and of equal length.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    diseases: Vec<DiseaseRecord>,
    supplements: Vec<SupplementRecord>,
}

impl ReferenceTables {
    /// Loads both tables from CSV files with a header row.
    ///
    /// # Errors
    /// - `Missing` if either file does not exist
    /// - `Malformed` if a row cannot be parsed or a required column is absent
    /// - `Empty` / `RowCountMismatch` from [`ReferenceTables::from_records`]
    pub fn load(
        disease_path: impl AsRef<Path>,
        supplement_path: impl AsRef<Path>,
    ) -> Result<Self, ReferenceError> {
        let diseases = read_table::<DiseaseRecord>("disease", disease_path.as_ref())?;
        let supplements = read_table::<SupplementRecord>("supplement", supplement_path.as_ref())?;
        let tables = Self::from_records(diseases, supplements)?;
        info!("Loaded reference tables with {} rows", tables.len());
        Ok(tables)
    }

    pub fn from_records(
        diseases: Vec<DiseaseRecord>,
        supplements: Vec<SupplementRecord>,
    ) -> Result<Self, ReferenceError> {
        if diseases.is_empty() {
            return Err(ReferenceError::Empty { table: "disease" });
        }
        if supplements.is_empty() {
            return Err(ReferenceError::Empty { table: "supplement" });
        }
        if diseases.len() != supplements.len() {
            return Err(ReferenceError::RowCountMismatch {
                diseases: diseases.len(),
                supplements: supplements.len(),
            });
        }
        Ok(Self { diseases, supplements })
    }

    /// Number of rows in each table.
    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    /// Maps an index outside the table to row 0.
    pub fn clamp_index(&self, index: usize) -> usize {
        if index < self.len() {
            index
        } else {
            warn!("Class index {} outside reference tables ({} rows), using row 0", index, self.len());
            0
        }
    }

    pub fn disease(&self, index: usize) -> &DiseaseRecord {
        &self.diseases[self.clamp_index(index)]
    }

    pub fn supplement(&self, index: usize) -> &SupplementRecord {
        &self.supplements[self.clamp_index(index)]
    }

    /// Disease and supplement rows side by side, in class order.
    pub fn rows(&self) -> impl Iterator<Item = (&DiseaseRecord, &SupplementRecord)> {
        self.diseases.iter().zip(self.supplements.iter())
    }
}

fn read_table<T>(table: &'static str, path: &Path) -> Result<Vec<T>, ReferenceError>
where
    T: for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Err(ReferenceError::Missing { table, path: path.to_path_buf() });
    }
    let bytes = fs::read(path).map_err(|source| ReferenceError::Io {
        table,
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_text(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| ReferenceError::Malformed { table, source })
}

/// UTF-8 when valid, Windows-1252 otherwise. The published tables are cp1252.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.trim_start_matches('\u{feff}')),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0,
    }
}
