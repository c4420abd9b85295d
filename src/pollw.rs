use log::{debug, info, warn};

use weighted_polls::builder::Session;
use weighted_polls::*;
use snafu::{prelude::*, Snafu};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod cache;
pub mod config_reader;
pub mod entry;
pub mod fetch;
pub mod io_common;
pub mod io_csv;
pub mod io_ibge;

use crate::pollw::cache::*;
use crate::pollw::config_reader::*;
use crate::pollw::entry::*;
use crate::pollw::fetch::*;
use crate::pollw::io_common::simplify_file_name;

/// The low-level reason why an input could not be decoded.
#[derive(Debug, Snafu)]
pub enum DecodeError {
    #[snafu(display("could not decode the workbook"))]
    Workbook { source: calamine::Error },
    #[snafu(display("not a workbook (no xls or xlsx signature)"))]
    UnknownFormat {},
    #[snafu(display("could not split the delimited text"))]
    Delimited { source: csv::Error },
    #[snafu(display("unsupported text encoding {label:?}"))]
    Encoding { label: String },
}

#[derive(Debug, Snafu)]
pub enum ExtractionError {
    #[snafu(display(
        "expected the municipality data on sheet #2, but the workbook has {found} sheet(s)"
    ))]
    NoSuchSheet { found: usize },
    #[snafu(display("malformed input"))]
    MalformedInput { source: DecodeError },
    #[snafu(display(
        "could not persist the municipality snapshot ({} records)",
        snapshot.records.len()
    ))]
    PersistFailure {
        source: CacheError,
        snapshot: Box<MunicipalitySnapshot>,
    },
}

#[derive(Debug, Snafu)]
pub enum PwError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV output"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Invalid value {value:?} for option {option}"))]
    InvalidRule { option: String, value: String },
    #[snafu(display("Could not load the municipality data"))]
    Refresh { source: RefreshError },
    #[snafu(display("Could not process poll file {path}"))]
    Upload { source: UploadError, path: String },
    #[snafu(display("No poll file provided (use --input or pollFileSources)"))]
    MissingPollSources {},
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},
}

type PwResult<T> = Result<T, PwError>;
type BPwResult<T> = Result<T, Box<PwError>>;

/// The message of an error followed by all its causes.
pub fn report(e: &dyn Error) -> String {
    let mut s = e.to_string();
    let mut cur = e.source();
    while let Some(c) = cur {
        s.push_str(": ");
        s.push_str(&c.to_string());
        cur = c.source();
    }
    s
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub title: Option<String>,
    #[serde(rename = "pollFiles")]
    pub poll_files: Vec<String>,
    pub municipalities: usize,
}

/// Everything computed by one run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub snapshot: MunicipalitySnapshot,
    pub series: AggregatedSeries,
}

fn build_summary_js(config: &PwConfig, analysis: &Analysis) -> JSValue {
    let c = OutputConfig {
        title: config.output_settings.title.clone(),
        poll_files: config
            .poll_file_sources
            .iter()
            .map(|pfs| simplify_file_name(&pfs.file_path))
            .collect(),
        municipalities: analysis.snapshot.records.len(),
    };
    json!({
        "config": c,
        "series": analysis.series })
}

fn load_municipalities(src: &MunicipalitySource) -> BPwResult<MunicipalitySnapshot> {
    let location = src.location();
    let source = source_for(&location, src.timeout());
    let cache: Box<dyn SnapshotCache> = if src.no_cache() {
        info!("Loading municipalities from {} (no cache)", location);
        Box::new(MemoryCache::default())
    } else {
        info!(
            "Loading municipalities from {} (cache {:?}, force refresh: {})",
            location,
            src.cache_path(),
            src.force_refresh()
        );
        Box::new(JsonFileCache::new(src.cache_path()))
    };
    let snapshot = match refresh_municipalities(source.as_ref(), cache.as_ref(), src.force_refresh())
    {
        Ok(s) => s,
        Err(e) if e.kind() == RefreshErrorKind::Cache => {
            warn!(
                "load_municipalities: {}, continuing with the {} extracted records",
                report(&e),
                e.recovered_records().map(|s| s.records.len()).unwrap_or(0)
            );
            e.into_recovered().context(RefreshSnafu {})?
        }
        Err(e) => return Err(Box::new(PwError::Refresh { source: e })),
    };
    info!(
        "Loaded {} municipalities (generated at {})",
        snapshot.records.len(),
        snapshot.generated_at
    );
    Ok(snapshot)
}

/// Loads the municipalities, then aggregates every poll file in order, each
/// file being one batch appended to the series.
pub fn run_pipeline(config: &PwConfig) -> BPwResult<Analysis> {
    let rules = validate_rules(&config.rules)?;
    debug!("run_pipeline: rules: {:?}", rules);

    if config.poll_file_sources.is_empty() {
        return Err(Box::new(PwError::MissingPollSources {}));
    }

    let snapshot = load_municipalities(&config.municipality_source)?;

    let columns = config.poll_format.columns();
    let not_available = config.poll_format.not_available_label();
    let mut session = Session::new(&rules).snapshot(&snapshot.records);
    for pfs in config.poll_file_sources.iter() {
        info!("Attempting to read poll file {:?}", pfs.file_path);
        let payload = fs::read(&pfs.file_path).context(OpeningFileSnafu {
            path: pfs.file_path.clone(),
        })?;
        let polls = match upload_poll(&payload, pfs.encoding(), &columns, not_available) {
            Ok(polls) => polls,
            Err(e) => {
                warn!("run_pipeline: {:?} rejected: {}", pfs.file_path, report(e.cause()));
                return Err(Box::new(PwError::Upload {
                    source: e,
                    path: pfs.file_path.clone(),
                }));
            }
        };
        info!("Read {} poll records from {:?}", polls.len(), pfs.file_path);
        for agg in session.add_batch(&polls) {
            info!(
                "  {:>12}  A: {:>6}  B: {:>6}",
                agg.date, agg.percent_a, agg.percent_b
            );
        }
    }

    Ok(Analysis {
        snapshot,
        series: session.into_series(),
    })
}

fn write_series_csv(path: &str, series: &[DailyAggregate]) -> BPwResult<()> {
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu {})?;
    for agg in series {
        wtr.serialize(agg).context(WritingCsvSnafu {})?;
    }
    wtr.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}

fn write_output(out: &str, pretty_js: &str, series: &[DailyAggregate]) -> BPwResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js);
    } else if out.ends_with(".csv") {
        info!("Writing series to {:?}", out);
        write_series_csv(out, series)?;
    } else {
        info!("Writing summary to {:?}", out);
        fs::write(out, pretty_js).context(WritingOutputSnafu { path: out })?;
    }
    Ok(())
}

fn check_reference(summary_p: &str, pretty_js_stats: &str) -> BPwResult<()> {
    let summary_ref = read_summary(summary_p)?;
    debug!("summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return Err(Box::new(PwError::ReferenceMismatch {}));
    }
    info!("Summary matches the reference {:?}", summary_p);
    Ok(())
}

/// Builds the configuration from the optional configuration file, then
/// applies the command line overrides.
pub fn prepare_config(args: &Args) -> BPwResult<PwConfig> {
    let mut config = match &args.config {
        Some(config_path) => {
            let mut c = read_config(config_path)?;
            let root: PathBuf = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            c.rebase(&root);
            c
        }
        None => PwConfig::default(),
    };

    if !args.input.is_empty() {
        config.poll_file_sources = args
            .input
            .iter()
            .map(|p| PollFileSource {
                file_path: p.clone(),
                encoding: args.encoding.clone(),
            })
            .collect();
    } else if let Some(enc) = &args.encoding {
        for pfs in config.poll_file_sources.iter_mut() {
            pfs.encoding = Some(enc.clone());
        }
    }
    if let Some(location) = &args.spreadsheet {
        if is_remote(location) {
            config.municipality_source.url = Some(location.clone());
            config.municipality_source.file_path = None;
        } else {
            config.municipality_source.file_path = Some(location.clone());
        }
    }
    if let Some(cache_path) = &args.cache {
        config.municipality_source.cache_path = Some(cache_path.clone());
    }
    if args.refresh {
        config.municipality_source.force_refresh = Some(true);
    }
    if args.no_cache {
        config.municipality_source.no_cache = Some(true);
    }
    if let Some(out) = &args.out {
        config.output_settings.output_path = Some(out.clone());
    }
    Ok(config)
}

pub fn run_analysis(args: &Args) -> BPwResult<()> {
    let config = prepare_config(args)?;
    info!("config: {:?}", config);

    let analysis = run_pipeline(&config)?;

    let result_js = build_summary_js(&config, &analysis);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let out = config
        .output_settings
        .output_path
        .clone()
        .unwrap_or_else(|| "stdout".to_string());
    write_output(&out, &pretty_js_stats, &analysis.series)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        check_reference(summary_p, &pretty_js_stats)?;
    }
    Ok(())
}
