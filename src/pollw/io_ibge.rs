// Reads the yearly population estimates published by IBGE.
//
// The positions below follow the layout of the published workbook.

use std::io::Cursor;

use calamine::{Range, Reader, Xls, Xlsx};

use crate::pollw::cache::SnapshotCache;
use crate::pollw::io_common::RawCell;
use crate::pollw::*;

pub const DATA_SHEET_INDEX: usize = 1;
pub const HEADER_ROWS: usize = 2;
pub const STATE_COLUMN: usize = 0;
pub const NAME_COLUMN: usize = 3;
pub const POPULATION_COLUMN: usize = 4;

const XLS_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const XLSX_SIGNATURE: &[u8] = b"PK\x03\x04";

fn workbook_error<E>(e: E) -> ExtractionError
where
    calamine::Error: From<E>,
{
    ExtractionError::MalformedInput {
        source: DecodeError::Workbook {
            source: calamine::Error::from(e),
        },
    }
}

/// Non-blank rows of the grid, with the columns at their absolute position.
fn grid_rows(range: &Range<calamine::DataType>) -> Vec<Vec<RawCell>> {
    let col0 = range.start().map(|(_, c)| c as usize).unwrap_or(0);
    range
        .rows()
        .map(|row| {
            let mut cells = vec![RawCell::Blank; col0];
            cells.extend(row.iter().map(RawCell::from_calamine));
            cells
        })
        .filter(|cells| cells.iter().any(|c| *c != RawCell::Blank))
        .collect()
}

fn data_sheet_rows<R>(workbook: &mut R) -> Result<Vec<Vec<RawCell>>, ExtractionError>
where
    R: Reader,
    calamine::Error: From<R::Error>,
{
    let found = workbook.sheet_names().len();
    debug!("data_sheet_rows: {} sheet(s)", found);
    if found <= DATA_SHEET_INDEX {
        return NoSuchSheetSnafu { found }.fail();
    }
    let range = workbook
        .worksheet_range_at(DATA_SHEET_INDEX)
        .context(NoSuchSheetSnafu { found })?
        .map_err(workbook_error)?;
    Ok(grid_rows(&range))
}

/// The single place where a grid row is mapped to a municipality.
///
/// Returns `None` when the state, the name or the population is missing.
pub fn municipality_from_row(row: &[RawCell]) -> Option<MunicipalityRecord> {
    let state = row.get(STATE_COLUMN)?;
    let name = row.get(NAME_COLUMN)?;
    let population = row.get(POPULATION_COLUMN)?;
    if !(state.is_truthy() && name.is_truthy() && population.is_truthy()) {
        return None;
    }
    Some(MunicipalityRecord {
        state: state.to_text(),
        name: name.to_text(),
        population: population.to_population(),
    })
}

/// Decodes the workbook and returns the municipality records, in sheet order.
pub fn read_municipalities(bytes: &[u8]) -> Result<Vec<MunicipalityRecord>, ExtractionError> {
    let rows = if bytes.starts_with(XLS_SIGNATURE) {
        debug!("read_municipalities: legacy xls workbook");
        let mut workbook: Xls<_> =
            Xls::new(Cursor::new(bytes.to_vec())).map_err(workbook_error)?;
        data_sheet_rows(&mut workbook)?
    } else if bytes.starts_with(XLSX_SIGNATURE) {
        debug!("read_municipalities: xlsx workbook");
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes.to_vec())).map_err(workbook_error)?;
        data_sheet_rows(&mut workbook)?
    } else {
        return Err(ExtractionError::MalformedInput {
            source: DecodeError::UnknownFormat {},
        });
    };

    let mut records = Vec::new();
    let mut skipped = 0;
    for row in rows.iter().skip(HEADER_ROWS) {
        match municipality_from_row(row) {
            Some(r) => records.push(r),
            None => skipped += 1,
        }
    }
    let unknown = records.iter().filter(|r| r.population.is_none()).count();
    info!(
        "read_municipalities: {} records, {} rows skipped, {} with unknown population",
        records.len(),
        skipped,
        unknown
    );
    Ok(records)
}

/// Extracts the snapshot from the workbook and stores it in the cache.
pub fn extract_snapshot(
    bytes: &[u8],
    cache: &dyn SnapshotCache,
) -> Result<MunicipalitySnapshot, ExtractionError> {
    let snapshot = MunicipalitySnapshot::new(read_municipalities(bytes)?);
    if let Err(e) = cache.put(&snapshot) {
        return Err(ExtractionError::PersistFailure {
            source: e,
            snapshot: Box::new(snapshot),
        });
    }
    Ok(snapshot)
}
