use crate::pollw::cache::SnapshotCache;
use crate::pollw::fetch::{FetchError, SpreadsheetSource};
use crate::pollw::io_common::TextEncoding;
use crate::pollw::io_csv::read_poll_csv;
use crate::pollw::io_ibge::extract_snapshot;
use crate::pollw::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RefreshErrorKind {
    Network,
    Parse,
    Cache,
}

#[derive(Debug, Snafu)]
pub enum RefreshError {
    #[snafu(display("could not download the population estimates"))]
    Download { source: FetchError },
    #[snafu(display("could not extract the population estimates"))]
    Extract { source: ExtractionError },
}

impl RefreshError {
    pub fn kind(&self) -> RefreshErrorKind {
        match self {
            RefreshError::Download { .. } => RefreshErrorKind::Network,
            RefreshError::Extract {
                source: ExtractionError::PersistFailure { .. },
            } => RefreshErrorKind::Cache,
            RefreshError::Extract { .. } => RefreshErrorKind::Parse,
        }
    }

    /// The snapshot computed before the cache failed, if any.
    pub fn recovered_records(&self) -> Option<&MunicipalitySnapshot> {
        match self {
            RefreshError::Extract {
                source: ExtractionError::PersistFailure { snapshot, .. },
            } => Some(&**snapshot),
            _ => None,
        }
    }

    /// Gives back the recovered snapshot, or the error itself when there is none.
    pub fn into_recovered(self) -> Result<MunicipalitySnapshot, RefreshError> {
        match self {
            RefreshError::Extract {
                source: ExtractionError::PersistFailure { snapshot, .. },
            } => Ok(*snapshot),
            e => Err(e),
        }
    }
}

/// Returns the cached municipalities, or downloads and extracts them when
/// the cache is empty or when `force` is set.
///
/// A cache that cannot be read counts as empty.
pub fn refresh_municipalities(
    source: &dyn SpreadsheetSource,
    cache: &dyn SnapshotCache,
    force: bool,
) -> Result<MunicipalitySnapshot, RefreshError> {
    if !force {
        match cache.get() {
            Ok(Some(snapshot)) => {
                info!(
                    "refresh_municipalities: using cached snapshot from {} ({} records)",
                    snapshot.generated_at,
                    snapshot.records.len()
                );
                return Ok(snapshot);
            }
            Ok(None) => debug!("refresh_municipalities: cache is empty"),
            Err(e) => warn!(
                "refresh_municipalities: ignoring unreadable cache: {}",
                report(&e)
            ),
        }
    }
    info!(
        "refresh_municipalities: fetching estimates from {}",
        source.describe()
    );
    let bytes = source.fetch().context(DownloadSnafu {})?;
    extract_snapshot(&bytes, cache).context(ExtractSnafu {})
}

#[derive(Debug, Snafu)]
pub enum UploadError {
    #[snafu(display("Failed to process file"))]
    Rejected { source: ExtractionError },
}

impl UploadError {
    pub fn cause(&self) -> &ExtractionError {
        match self {
            UploadError::Rejected { source } => source,
        }
    }
}

/// Decodes one uploaded poll file.
pub fn upload_poll(
    payload: &[u8],
    encoding_label: &str,
    columns: &PollColumns,
    not_available: &str,
) -> Result<Vec<PollRecord>, UploadError> {
    let encoding = TextEncoding::from_label(encoding_label)
        .context(EncodingSnafu {
            label: encoding_label,
        })
        .context(MalformedInputSnafu {})
        .context(RejectedSnafu {})?;
    let text = encoding.decode(payload);
    read_poll_csv(&text, columns, not_available).context(RejectedSnafu {})
}
