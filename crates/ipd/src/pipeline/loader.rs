use super::cache::{BatchStamp, DatasetCache, SourceFingerprint};
use super::domain::{ActivityRecord, DatasetKind, NormalizedTable};
use super::normalizer::normalize_batch;
use super::PipelineError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Raw bytes of one input file.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub id: String,
    pub data: Vec<u8>,
}

/// Where batches for each dataset kind come from. Batches are returned sorted
/// by identifier.
pub trait BatchSource: Send + Sync {
    /// Human-readable location used in error messages.
    fn location(&self) -> String;
    fn fingerprint(&self, kind: DatasetKind) -> Result<SourceFingerprint, PipelineError>;
    fn read_batches(&self, kind: DatasetKind) -> Result<Vec<SourceBatch>, PipelineError>;
}

impl<S: BatchSource + ?Sized> BatchSource for Arc<S> {
    fn location(&self) -> String {
        (**self).location()
    }

    fn fingerprint(&self, kind: DatasetKind) -> Result<SourceFingerprint, PipelineError> {
        (**self).fingerprint(kind)
    }

    fn read_batches(&self, kind: DatasetKind) -> Result<Vec<SourceBatch>, PipelineError> {
        (**self).read_batches(kind)
    }
}

/// Reads `api_data_aadhar_<kind>_*.csv` files from a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn discover(&self, kind: DatasetKind) -> Result<Vec<(String, PathBuf)>, PipelineError> {
        let io_error = |source| PipelineError::Io {
            location: self.root.display().to_string(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(kind.file_prefix()) && name.ends_with(".csv") {
                files.push((name, entry.path()));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

impl BatchSource for DirectorySource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn fingerprint(&self, kind: DatasetKind) -> Result<SourceFingerprint, PipelineError> {
        let mut stamps = Vec::new();
        for (id, path) in self.discover(kind)? {
            let metadata = fs::metadata(&path).map_err(|source| PipelineError::Io {
                location: path.display().to_string(),
                source,
            })?;
            stamps.push(BatchStamp {
                id,
                len: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
        Ok(SourceFingerprint::new(stamps))
    }

    fn read_batches(&self, kind: DatasetKind) -> Result<Vec<SourceBatch>, PipelineError> {
        self.discover(kind)?
            .into_iter()
            .map(|(id, path)| {
                let data = fs::read(&path).map_err(|source| PipelineError::Io {
                    location: path.display().to_string(),
                    source,
                })?;
                Ok(SourceBatch { id, data })
            })
            .collect()
    }
}

/// Batches held in memory, mainly for tests and request-supplied uploads.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    batches: HashMap<DatasetKind, Vec<SourceBatch>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(mut self, kind: DatasetKind, id: &str, csv: &str) -> Self {
        let batches = self.batches.entry(kind).or_default();
        batches.push(SourceBatch {
            id: id.to_string(),
            data: csv.as_bytes().to_vec(),
        });
        batches.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }
}

impl BatchSource for InMemorySource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn fingerprint(&self, kind: DatasetKind) -> Result<SourceFingerprint, PipelineError> {
        let stamps = self
            .batches
            .get(&kind)
            .map(|batches| {
                batches
                    .iter()
                    .map(|batch| BatchStamp {
                        id: batch.id.clone(),
                        len: batch.data.len() as u64,
                        modified: None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(SourceFingerprint::new(stamps))
    }

    fn read_batches(&self, kind: DatasetKind) -> Result<Vec<SourceBatch>, PipelineError> {
        Ok(self.batches.get(&kind).cloned().unwrap_or_default())
    }
}

/// Loads one unified table per dataset kind, reusing cached tables while the
/// source fingerprint is unchanged.
#[derive(Debug)]
pub struct DatasetLoader<S> {
    source: S,
    cache: DatasetCache,
}

impl<S: BatchSource> DatasetLoader<S> {
    pub fn new(source: S, cache_ttl: Duration) -> Self {
        Self {
            source,
            cache: DatasetCache::new(cache_ttl),
        }
    }

    pub fn load(&self, kind: DatasetKind) -> Result<Arc<NormalizedTable>, PipelineError> {
        let fingerprint = self.source.fingerprint(kind)?;
        if fingerprint.is_empty() {
            return Err(self.missing(kind));
        }

        if let Some(table) = self.cache.get(kind, &fingerprint) {
            debug!(kind = %kind, rows = table.len(), "dataset cache hit");
            return Ok(table);
        }

        let batches = self.source.read_batches(kind)?;
        if batches.is_empty() {
            return Err(self.missing(kind));
        }

        let batch_count = batches.len();
        let tables = batches
            .into_iter()
            .map(|batch| {
                normalize_batch(&batch.id, batch.data.as_slice(), kind).map_err(|source| {
                    PipelineError::Csv {
                        batch: batch.id.clone(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let table = Arc::new(concat(kind, tables));
        info!(
            kind = %kind,
            batches = batch_count,
            rows = table.len(),
            total = table.total(),
            "dataset loaded"
        );
        self.cache.insert(kind, fingerprint, Arc::clone(&table));
        Ok(table)
    }

    fn missing(&self, kind: DatasetKind) -> PipelineError {
        PipelineError::MissingSourceData {
            kind,
            location: self.source.location(),
        }
    }
}

/// Concatenates normalized batches in order. Count columns are unioned in
/// first-seen order and a batch without a column contributes zeros for it.
pub fn concat(kind: DatasetKind, tables: Vec<NormalizedTable>) -> NormalizedTable {
    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        for column in table.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut merged = NormalizedTable::new(kind, columns.clone());
    for table in tables {
        let mapping: Vec<usize> = table
            .columns()
            .iter()
            .filter_map(|column| columns.iter().position(|name| name == column))
            .collect();

        for record in table.records() {
            let mut counts = vec![0u64; columns.len()];
            for (value, &target) in record.counts.iter().zip(&mapping) {
                counts[target] = *value;
            }
            merged.push(ActivityRecord {
                counts,
                ..record.clone()
            });
        }
    }
    merged
}
