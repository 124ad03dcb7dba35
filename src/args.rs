use clap::Parser;

/// This is a browser for multi-year institutional ranking tables.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the accepted keys.
    /// The other options take precedence over the values of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (URL) The base URL of the ranking service, for example http://localhost:8000.
    /// If not set, the NIRF_API_URL environment variable is used.
    #[clap(long, value_parser)]
    pub api: Option<String>,

    /// (file path) A local dump of the ranking records (JSON, CSV or XLSX), used instead of the service.
    #[clap(long, value_parser)]
    pub colleges: Option<String>,

    /// (file path) A local dump of the prediction records (JSON, CSV or XLSX).
    #[clap(long, value_parser)]
    pub predictions: Option<String>,

    /// (default cards) The view to produce: cards, detail, compare, predictions, status or summary.
    #[clap(long, value_parser)]
    pub view: Option<String>,

    /// (2017-2025) The year of the cards and of the comparison.
    #[clap(short, long, value_parser)]
    pub year: Option<i64>,

    /// Only keeps the entries whose name contains this text (case-insensitive).
    #[clap(short, long, value_parser)]
    pub search: Option<String>,

    /// (default rank) The order of the cards: rank, score or name.
    #[clap(long, value_parser)]
    pub sort: Option<String>,

    /// (repeatable) The identifier of a college to compare.
    #[clap(long, value_parser)]
    pub select: Vec<String>,

    /// The identifier of the college shown in the detail view.
    #[clap(long, value_parser)]
    pub college: Option<String>,

    /// (comma-separated, default all) The parameters shown in the comparison: tlr, rpc, go, oi, perception.
    #[clap(long, value_parser, use_value_delimiter = true)]
    pub params: Option<Vec<String>>,

    /// (file path) A CSV file to upload before producing the view. The data is reloaded after the upload.
    #[clap(short, long, value_parser)]
    pub upload: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the view in JSON format. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file in JSON format. If provided, nirfview checks that the
    /// produced view matches the reference and prints the differences otherwise.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
