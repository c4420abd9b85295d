use clap::Parser;

/// Population-weighted daily aggregation of poll files.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration of the analysis.
    /// Relative paths inside the configuration are resolved from its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference summary in JSON format. If provided, pollw will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the summary. A path ending
    /// in .csv receives the series only, as CSV. Overrides outputSettings.outputPath.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, repeatable) A poll file. Files are processed in the order
    /// given, each one appended to the series. Overrides pollFileSources.
    #[clap(short, long, value_parser)]
    pub input: Vec<String>,

    /// (default utf-8) The text encoding of the poll files (utf-8, or windows-1252 / latin1).
    #[clap(long, value_parser)]
    pub encoding: Option<String>,

    /// (URL or file path) The population estimates workbook.
    #[clap(long, value_parser)]
    pub spreadsheet: Option<String>,

    /// (file path, default public/data/municipalities.json) The municipality cache.
    #[clap(long, value_parser)]
    pub cache: Option<String>,

    /// If passed as an argument, ignores the cache and extracts the estimates again.
    #[clap(long, takes_value = false)]
    pub refresh: bool,

    /// If passed as an argument, the municipalities are neither read from nor
    /// written to the cache file.
    #[clap(long, takes_value = false)]
    pub no_cache: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
