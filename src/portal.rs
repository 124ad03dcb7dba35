use log::{debug, info, warn};

use college_rankings::normalize::normalize_records;
use college_rankings::predictions::{normalize_predictions, prediction_view, PredictionRow};
use college_rankings::resolver::{
    card, history_rows, parameter_chart, rank_score_chart, sub_metric_table,
};
use college_rankings::select::{
    comparison_table, filter_by_year, parameter_averages, radar_chart, suggestions, trend_chart,
    CollegeQuery, SelectOutcome,
};
use college_rankings::store::{ReplaceOutcome, Snapshot, Store};
use college_rankings::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::portal::config_reader::*;
use crate::portal::io_common::LocalSource;
use crate::portal::io_http::HttpSource;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod io_http;

#[derive(Debug, Snafu)]
pub enum PortalError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Request to {url} failed: {source}"))]
    Http { source: reqwest::Error, url: String },
    #[snafu(display("{url} answered with status {status}"))]
    HttpStatus {
        url: String,
        status: u16,
        detail: Option<String>,
    },
    #[snafu(display("Unexpected payload from {message}"))]
    UnexpectedPayload { message: String },
    #[snafu(display("Error reading CSV file {path}: {source}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no data"))]
    EmptyExcel { path: String },
    #[snafu(display("Only CSV files can be uploaded, got {path}"))]
    InvalidUploadFile { path: String },
    #[snafu(display("Error reading the upload {path}"))]
    ReadingUpload {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("This data source does not accept uploads"))]
    UploadUnsupported {},
    #[snafu(display("Invalid option {name}: {message}"))]
    InvalidOption { name: String, message: String },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PortalResult<T> = Result<T, PortalError>;

pub fn invalid_option(name: &str, e: RankingError) -> PortalError {
    InvalidOptionSnafu {
        name,
        message: e.to_string(),
    }
    .build()
}

// ******** Data sources *********

pub const COLLEGES_LOAD_FAILED: &str =
    "Failed to load data from backend. Please upload CSV file in Admin tab.";
pub const PREDICTIONS_LOAD_FAILED: &str = "Failed to load predictions from backend.";
pub const NOT_A_CSV: &str = "Error: Please upload a CSV file";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection.";

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Connected,
    Disconnected,
}

/// The answer of the service to an upload.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub message: Option<String>,
    pub status: Option<String>,
    pub row_count: Option<JSValue>,
}

impl UploadReceipt {
    /// The service may report a failure with a success status code.
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    fn loaded_label(&self) -> String {
        match &self.row_count {
            Some(JSValue::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
            Some(JSValue::String(s)) if !s.is_empty() => s.clone(),
            _ => "Data".to_string(),
        }
    }
}

/// Where the flat records come from.
pub trait RankingSource {
    fn describe(&self) -> String;

    fn fetch_colleges(&mut self) -> PortalResult<Vec<RawRecord>>;

    fn fetch_predictions(&mut self) -> PortalResult<Vec<RawRecord>>;

    fn upload(&mut self, path: &Path) -> PortalResult<UploadReceipt> {
        debug!("upload: {} not sent", path.display());
        UploadUnsupportedSnafu {}.fail()
    }

    fn check_status(&mut self) -> BackendStatus {
        match self.fetch_colleges() {
            Ok(_) => BackendStatus::Connected,
            Err(e) => {
                debug!("check_status: {}", e);
                BackendStatus::Disconnected
            }
        }
    }
}

/// Only files with a `.csv` extension (any case) may be uploaded.
pub fn validate_upload_file(path: &Path) -> PortalResult<()> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    ensure!(
        is_csv,
        InvalidUploadFileSnafu {
            path: path.display().to_string()
        }
    );
    Ok(())
}

fn upload_failure_notice(e: &PortalError) -> Notice {
    match e {
        PortalError::InvalidUploadFile { .. } => Notice::error(NOT_A_CSV),
        PortalError::Http { .. } => Notice::error(NETWORK_ERROR),
        PortalError::HttpStatus {
            detail: Some(d), ..
        } => Notice::error(format!("Upload failed: {}", d)),
        PortalError::HttpStatus { detail: None, .. } => Notice::error("Upload failed"),
        other => Notice::error(format!("Upload failed: {}", other)),
    }
}

// ******** Controller *********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UploadOutcome {
    /// Refused before anything was sent.
    Rejected,
    Failed,
    Uploaded { colleges: usize },
}

/// Owns the data source and the state of the session.
///
/// Failures of the source never escape: they end up as notices in the store,
/// and the affected collection is left empty (entities) or unset
/// (predictions).
pub struct Portal<S: RankingSource> {
    source: S,
    store: Store,
}

impl<S: RankingSource> Portal<S> {
    pub fn new(source: S, year: Year, max_compare: usize) -> PortalResult<Portal<S>> {
        let store = Store::new(year, max_compare).map_err(|e| invalid_option("settings", e))?;
        Ok(Portal { source, store })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Fetches both collections, then installs them as one snapshot.
    pub fn load(&mut self) -> ReplaceOutcome {
        let ticket = self.store.begin_load();
        let colleges = self.load_colleges();
        let predictions = self.load_predictions();
        self.store.complete_load(
            ticket,
            Snapshot {
                colleges,
                predictions,
            },
        )
    }

    fn load_colleges(&mut self) -> Vec<College> {
        match self.source.fetch_colleges() {
            Ok(records) => normalize_records(&records),
            Err(e) => {
                warn!("load_colleges: {}", e);
                self.store.push_notice(Notice::error(COLLEGES_LOAD_FAILED));
                Vec::new()
            }
        }
    }

    fn load_predictions(&mut self) -> Option<Vec<Prediction>> {
        match self.source.fetch_predictions() {
            Ok(records) => Some(normalize_predictions(&records)),
            Err(e) => {
                warn!("load_predictions: {}", e);
                self.store.push_notice(Notice::error(PREDICTIONS_LOAD_FAILED));
                None
            }
        }
    }

    /// Sends a CSV file to the source, then reloads everything.
    ///
    /// A file that is not a CSV file is refused before the source is
    /// contacted, and the state is left untouched.
    pub fn upload(&mut self, path: &Path) -> UploadOutcome {
        if let Err(e) = validate_upload_file(path) {
            self.store.push_notice(upload_failure_notice(&e));
            return UploadOutcome::Rejected;
        }
        info!("Uploading {}", path.display());
        let receipt = match self.source.upload(path) {
            Ok(r) => r,
            Err(e) => {
                warn!("upload: {}", e);
                self.store.push_notice(upload_failure_notice(&e));
                return UploadOutcome::Failed;
            }
        };
        if receipt.is_error() {
            let message = receipt.message.as_deref().unwrap_or("unknown error");
            self.store
                .push_notice(Notice::error(format!("Upload failed: {}", message)));
            return UploadOutcome::Failed;
        }
        self.store.push_notice(Notice::success(format!(
            "CSV uploaded successfully! {} loaded",
            receipt.loaded_label()
        )));

        let outcome = self.load();
        if outcome.stale {
            warn!("upload: the reload was overtaken by a newer load");
        }
        let colleges = self.store.colleges().len();
        self.store.push_notice(Notice::success(format!(
            "Data updated! Showing {} colleges",
            colleges
        )));
        UploadOutcome::Uploaded { colleges }
    }

    pub fn status(&mut self) -> BackendStatus {
        let status = self.source.check_status();
        info!("Backend status for {}: {:?}", self.source.describe(), status);
        status
    }

    /// Produces a view as a JSON document, followed by the pending notices.
    pub fn render(&mut self, view: View, options: &ViewOptions) -> PortalResult<JSValue> {
        let mut js = match view {
            View::Cards => self.render_cards(options),
            View::Detail => self.render_detail(options)?,
            View::Compare => self.render_compare(options),
            View::Predictions => self.render_predictions(options),
            View::Status => {
                let status = self.status();
                json!({ "source": self.source.describe(), "status": status })
            }
            View::Summary => self.render_summary(),
        };
        if let JSValue::Object(m) = &mut js {
            m.insert("view".to_string(), json!(view.name()));
            m.insert("notices".to_string(), json!(self.store.drain_notices()));
        }
        Ok(js)
    }

    fn render_cards(&self, options: &ViewOptions) -> JSValue {
        let year = self.store.current_year();
        let view = CollegeQuery::new(year)
            .search(options.search.as_deref().unwrap_or(""))
            .sort(options.sort)
            .apply(self.store.colleges());
        let cards: Vec<_> = view.iter().map(|c| card(c, year)).collect();
        json!({ "year": year, "count": cards.len(), "colleges": cards })
    }

    fn render_detail(&self, options: &ViewOptions) -> PortalResult<JSValue> {
        let id = options.college.as_deref().context(InvalidOptionSnafu {
            name: "college",
            message: "the detail view needs the identifier of a college",
        })?;
        let college = self.store.find(id).context(InvalidOptionSnafu {
            name: "college",
            message: format!("no college with identifier {:?}", id),
        })?;
        let year = college
            .latest_year_with_data()
            .unwrap_or_else(|| self.store.current_year());
        let sub_metrics: JSMap<String, JSValue> = Parameter::ALL
            .into_iter()
            .map(|p| {
                (
                    p.key().to_string(),
                    json!({ "title": p.title(), "rows": sub_metric_table(college, p) }),
                )
            })
            .collect();
        Ok(json!({
            "college": card(college, year),
            "latestYear": college.latest_year_with_data(),
            "history": history_rows(college),
            "rankChart": rank_score_chart(college),
            "parameterChart": parameter_chart(college),
            "subMetrics": sub_metrics,
        }))
    }

    fn render_compare(&mut self, options: &ViewOptions) -> JSValue {
        for id in options.select.iter() {
            match self.store.select(id) {
                None => self
                    .store
                    .push_notice(Notice::error(format!("Unknown college {}", id))),
                Some(SelectOutcome::Full(_)) => break,
                Some(_) => {}
            }
        }
        let year = self.store.current_year();
        let params: Vec<Parameter> = if options.params.is_empty() {
            Parameter::ALL.to_vec()
        } else {
            options.params.clone()
        };
        let selection = self.store.selection();
        let selected: Vec<JSValue> = selection
            .colored()
            .map(|(c, color)| json!({ "id": c.id, "name": c.name, "color": color }))
            .collect();
        let averages: JSMap<String, JSValue> = parameter_averages(selection, year, &params)
            .into_iter()
            .map(|(p, avg)| (p.key().to_string(), json!(avg)))
            .collect();
        let offered: Vec<JSValue> = suggestions(
            self.store.colleges(),
            selection,
            options.search.as_deref().unwrap_or(""),
            options.max_suggestions,
        )
        .iter()
        .map(|c| json!({ "id": c.id, "name": c.name }))
        .collect();
        json!({
            "year": year,
            "selected": selected,
            "table": comparison_table(selection, year, &params),
            "radar": radar_chart(selection, year, &params),
            "trend": trend_chart(selection),
            "averages": averages,
            "suggestions": offered,
        })
    }

    fn render_predictions(&self, options: &ViewOptions) -> JSValue {
        match self.store.predictions() {
            Some(predictions) => {
                let rows: Vec<PredictionRow> =
                    prediction_view(predictions, options.search.as_deref().unwrap_or(""))
                        .into_iter()
                        .map(PredictionRow::from)
                        .collect();
                json!({ "available": true, "count": rows.len(), "predictions": rows })
            }
            None => json!({ "available": false, "count": 0, "predictions": [] }),
        }
    }

    fn render_summary(&self) -> JSValue {
        let colleges = self.store.colleges();
        let per_year: JSMap<String, JSValue> = supported_years()
            .map(|y| (y.to_string(), json!(filter_by_year(colleges, y).len())))
            .collect();
        json!({
            "source": self.source.describe(),
            "generation": self.store.generation(),
            "currentYear": self.store.current_year(),
            "colleges": colleges.len(),
            "predictions": self.store.predictions().map(|p| p.len()),
            "collegesPerYear": per_year,
        })
    }
}

// ******** Views *********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum View {
    Cards,
    Detail,
    Compare,
    Predictions,
    Status,
    Summary,
}

impl View {
    pub fn name(self) -> &'static str {
        match self {
            View::Cards => "cards",
            View::Detail => "detail",
            View::Compare => "compare",
            View::Predictions => "predictions",
            View::Status => "status",
            View::Summary => "summary",
        }
    }
}

impl FromStr for View {
    type Err = PortalError;

    fn from_str(s: &str) -> PortalResult<View> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cards" => Ok(View::Cards),
            "detail" => Ok(View::Detail),
            "compare" => Ok(View::Compare),
            "predictions" => Ok(View::Predictions),
            "status" => Ok(View::Status),
            "summary" => Ok(View::Summary),
            x => InvalidOptionSnafu {
                name: "view",
                message: format!("unknown view {:?}", x),
            }
            .fail(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ViewOptions {
    pub search: Option<String>,
    pub sort: SortKey,
    pub select: Vec<String>,
    pub college: Option<String>,
    pub params: Vec<Parameter>,
    pub max_suggestions: usize,
}

pub fn view_options(args: &Args, settings: &Settings) -> PortalResult<ViewOptions> {
    let sort = match &args.sort {
        Some(s) => s.parse::<SortKey>().map_err(|e| invalid_option("sort", e))?,
        None => SortKey::default(),
    };
    let params = args
        .params
        .iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Parameter>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid_option("params", e))?;
    Ok(ViewOptions {
        search: args.search.clone(),
        sort,
        select: args.select.clone(),
        college: args.college.clone(),
        params,
        max_suggestions: settings.max_suggestions,
    })
}

// ******** Entry point *********

pub fn run(args: &Args) -> PortalResult<()> {
    let (config, config_dir) = match &args.config {
        Some(p) => (
            read_config(p)?,
            Path::new(p).parent().map(|d| d.to_path_buf()),
        ),
        None => (PortalConfig::default(), None),
    };
    let settings = resolve_settings(
        args,
        &config,
        config_dir.as_deref(),
        std::env::var(API_URL_ENV).ok(),
    )?;
    let view: View = args.view.as_deref().unwrap_or("cards").parse()?;
    let options = view_options(args, &settings)?;

    match &settings.source {
        SourceSettings::Http { base_url } => {
            run_with(HttpSource::new(base_url)?, &settings, view, &options, args)
        }
        SourceSettings::Local {
            colleges,
            predictions,
        } => run_with(
            LocalSource::new(colleges.clone(), predictions.clone()),
            &settings,
            view,
            &options,
            args,
        ),
    }
}

fn run_with<S: RankingSource>(
    source: S,
    settings: &Settings,
    view: View,
    options: &ViewOptions,
    args: &Args,
) -> PortalResult<()> {
    info!("Reading rankings from {}", source.describe());
    let mut portal = Portal::new(source, settings.year, settings.max_compare)?;
    portal.load();

    if let Some(path) = &args.upload {
        let outcome = portal.upload(Path::new(path));
        info!("Upload of {}: {:?}", path, outcome);
    }

    let result_js = portal.render(view, options)?;
    let pretty_js = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(&pretty_js, args.out.as_deref())?;

    // The reference view, if provided for comparison
    if let Some(reference_p) = &args.reference {
        check_reference(&pretty_js, reference_p)?;
    }
    Ok(())
}

fn write_output(pretty_js: &str, out: Option<&str>) -> PortalResult<()> {
    match out {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty_js);
            Ok(())
        }
        Some(path) => {
            info!("Writing view to {}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })
        }
    }
}

fn check_reference(pretty_js: &str, reference_p: &str) -> PortalResult<()> {
    let reference = read_summary(reference_p)?;
    let pretty_js_reference =
        serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_js_reference != pretty_js {
        warn!("Found differences with the reference view");
        print_diff(pretty_js_reference.as_str(), pretty_js, "\n");
        whatever!("Difference detected between the view and the reference view")
    }
    Ok(())
}
