use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::pollw::*;

#[derive(Debug, Snafu)]
pub enum CacheError {
    #[snafu(display("cache file {path}"))]
    Io {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("could not encode the snapshot"))]
    Encode { source: serde_json::Error },
    #[snafu(display("cache file {path} is not a snapshot"))]
    Decode {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("cache lock poisoned"))]
    Poisoned {},
}

/// Where the last extracted snapshot is kept between runs.
///
/// `put` replaces the whole snapshot. `get` returns `None` when nothing was
/// stored yet.
pub trait SnapshotCache {
    fn put(&self, snapshot: &MunicipalitySnapshot) -> Result<(), CacheError>;
    fn get(&self) -> Result<Option<MunicipalitySnapshot>, CacheError>;
}

/// The stored object.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CachedSnapshot {
    #[serde(rename = "generatedAt", alias = "lastUpdated")]
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub data: Vec<MunicipalityRecord>,
}

impl From<&MunicipalitySnapshot> for CachedSnapshot {
    fn from(snapshot: &MunicipalitySnapshot) -> Self {
        CachedSnapshot {
            generated_at: snapshot.generated_at,
            total: snapshot.records.len(),
            data: snapshot.records.clone(),
        }
    }
}

impl From<CachedSnapshot> for MunicipalitySnapshot {
    fn from(cached: CachedSnapshot) -> Self {
        MunicipalitySnapshot {
            generated_at: cached.generated_at,
            records: cached.data,
        }
    }
}

/// A snapshot stored as one JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn new<P: AsRef<Path>>(path: P) -> JsonFileCache {
        JsonFileCache {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

impl SnapshotCache for JsonFileCache {
    fn put(&self, snapshot: &MunicipalitySnapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context(IoSnafu {
                    path: parent.display().to_string(),
                })?;
            }
        }
        let js = serde_json::to_string_pretty(&CachedSnapshot::from(snapshot))
            .context(EncodeSnafu {})?;
        fs::write(&self.path, js).context(IoSnafu {
            path: self.path_str(),
        })?;
        debug!(
            "put: wrote {} records to {:?}",
            snapshot.records.len(),
            self.path
        );
        Ok(())
    }

    fn get(&self) -> Result<Option<MunicipalitySnapshot>, CacheError> {
        if !self.path.exists() {
            debug!("get: no cache file at {:?}", self.path);
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).context(IoSnafu {
            path: self.path_str(),
        })?;
        let cached: CachedSnapshot =
            serde_json::from_str(&contents).context(DecodeSnafu {
                path: self.path_str(),
            })?;
        if cached.total != cached.data.len() {
            warn!(
                "get: cache file {:?} announces {} records but holds {}",
                self.path,
                cached.total,
                cached.data.len()
            );
        }
        Ok(Some(cached.into()))
    }
}

/// A cache that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    snapshot: Mutex<Option<MunicipalitySnapshot>>,
}

impl SnapshotCache for MemoryCache {
    fn put(&self, snapshot: &MunicipalitySnapshot) -> Result<(), CacheError> {
        let mut guard = self.snapshot.lock().map_err(|_| CacheError::Poisoned {})?;
        *guard = Some(snapshot.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<MunicipalitySnapshot>, CacheError> {
        let guard = self.snapshot.lock().map_err(|_| CacheError::Poisoned {})?;
        Ok(guard.clone())
    }
}
