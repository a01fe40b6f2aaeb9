use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{MarketValueRecord, RecordKind, RecordSet, StandingsRecord, Tier};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Directory of persisted tables, one CSV file per league season:
/// `{root}/standings/S_GB1_23.csv`, `{root}/market_values/MV_GB1_23.csv`.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: RecordKind, code: &str, tier: Tier, year: i32) -> PathBuf {
        self.root.join(kind.dir_name()).join(format!(
            "{}_{}{}_{:02}.csv",
            kind.prefix(),
            code,
            tier,
            year.rem_euclid(100)
        ))
    }

    /// Writes the record set, replacing any previous file of the same season.
    pub fn write(
        &self,
        code: &str,
        tier: Tier,
        year: i32,
        records: &RecordSet,
    ) -> Result<PathBuf, StoreError> {
        let path = self.path_for(records.kind(), code, tier, year);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        match records {
            RecordSet::Standings(rows) => write_rows(&path, rows)?,
            RecordSet::MarketValues(rows) => write_rows(&path, rows)?,
        }

        log::debug!("Wrote {} row(s) to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn load_standings(
        &self,
        code: &str,
        tier: Tier,
        year: i32,
    ) -> Result<Vec<StandingsRecord>, StoreError> {
        read_rows(&self.path_for(RecordKind::Standings, code, tier, year))
    }

    pub fn load_market_values(
        &self,
        code: &str,
        tier: Tier,
        year: i32,
    ) -> Result<Vec<MarketValueRecord>, StoreError> {
        read_rows(&self.path_for(RecordKind::MarketValues, code, tier, year))
    }
}

/// Sibling file rows are serialized to before replacing the target, so an
/// interrupted write never leaves a truncated table behind.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let staging = staging_path(path);
    let result = serialize_rows(&staging, rows).and_then(|()| {
        std::fs::rename(&staging, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        let _ = std::fs::remove_file(&staging);
    }
    result
}

fn serialize_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row).map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let csv_err = |source: csv::Error| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}
