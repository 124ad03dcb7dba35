// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A flat record as served by the data endpoints: a column name mapped to a scalar.
///
/// Columns follow the `<Metric>_<year>` or `<Metric Label> (100)_<year>` naming
/// convention. See the [manual](crate::manual) for the full description.
pub type RawRecord = Map<String, Value>;

pub type Year = u16;

/// The first year covered by the ranking tables.
pub const FIRST_YEAR: Year = 2017;
/// The last year covered by the ranking tables.
pub const LAST_YEAR: Year = 2025;

/// The text displayed in place of a missing value.
pub const PLACEHOLDER: &str = "N/A";

/// The default bound on the number of entities that can be compared at once.
pub const DEFAULT_MAX_COMPARE: usize = 6;

/// All the years that are probed when reading a record, in ascending order.
pub fn supported_years() -> RangeInclusive<Year> {
    FIRST_YEAR..=LAST_YEAR
}

/// Checks that a year falls in the supported range.
pub fn checked_year(year: i64) -> Result<Year, RankingError> {
    match Year::try_from(year) {
        Ok(y) if supported_years().contains(&y) => Ok(y),
        _ => Err(RankingError::YearOutOfRange(year)),
    }
}

/// A mapping from a year to the value of one metric.
///
/// A year is only present if the source carried a non-empty value for it.
/// Values that could not be understood as numbers are kept as NaN: they
/// count as present for [YearSeries::contains_year] but are treated as
/// missing by every display-oriented accessor.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct YearSeries(BTreeMap<Year, f64>);

impl YearSeries {
    pub fn new() -> YearSeries {
        YearSeries(BTreeMap::new())
    }

    pub fn insert(&mut self, year: Year, value: f64) {
        self.0.insert(year, value);
    }

    /// True if the source provided something for this year, even an unparseable value.
    pub fn contains_year(&self, year: Year) -> bool {
        self.0.contains_key(&year)
    }

    /// The stored value, including NaN.
    pub fn raw(&self, year: Year) -> Option<f64> {
        self.0.get(&year).copied()
    }

    /// The value for this year, if it carries data.
    pub fn get(&self, year: Year) -> Option<f64> {
        self.raw(year).filter(|v| !v.is_nan())
    }

    /// The years that carry data, in ascending order.
    pub fn years(&self) -> impl DoubleEndedIterator<Item = Year> + '_ {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_nan())
            .map(|(year, _)| *year)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(Year, f64); N]> for YearSeries {
    fn from(values: [(Year, f64); N]) -> YearSeries {
        YearSeries(BTreeMap::from(values))
    }
}

/// One item of a sub-metric group, as it appears in the column names.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct SubMetric {
    pub code: &'static str,
    pub name: &'static str,
}

const TLR_SUB_METRICS: [SubMetric; 4] = [
    SubMetric { code: "SS", name: "Student Strength" },
    SubMetric { code: "FSR", name: "Faculty-Student Ratio" },
    SubMetric { code: "FQE", name: "Faculty with PhD" },
    SubMetric { code: "FRU", name: "Financial Resources per Student" },
];

const RPC_SUB_METRICS: [SubMetric; 4] = [
    SubMetric { code: "PU", name: "Publications" },
    SubMetric { code: "QP", name: "Quality of Publications" },
    SubMetric { code: "IPR", name: "Intellectual Property Rights" },
    SubMetric {
        code: "FPPP",
        name: "Footprint of Projects and Professional Practice",
    },
];

const GO_SUB_METRICS: [SubMetric; 4] = [
    SubMetric { code: "GPHE", name: "Graduates in Higher Education" },
    SubMetric { code: "GUE", name: "University Examinations" },
    SubMetric { code: "MS", name: "Median Salary" },
    SubMetric { code: "GPHD", name: "Graduates pursuing PhD" },
];

const OI_SUB_METRICS: [SubMetric; 4] = [
    SubMetric { code: "RD", name: "Regional Diversity" },
    SubMetric { code: "WD", name: "Women Diversity" },
    SubMetric {
        code: "ESCS",
        name: "Economically and Socially Challenged Students",
    },
    SubMetric { code: "PCS", name: "Persons with Disabilities" },
];

const PERCEPTION_SUB_METRICS: [SubMetric; 1] = [SubMetric { code: "PR", name: "Peer Reputation" }];

/// The five category scores that contribute to the overall score.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    /// Teaching, learning and resources
    Tlr,
    /// Research and professional practice
    Rpc,
    /// Graduation outcomes
    Go,
    /// Outreach and inclusivity
    Oi,
    /// Peer perception
    Perception,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::Tlr,
        Parameter::Rpc,
        Parameter::Go,
        Parameter::Oi,
        Parameter::Perception,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Parameter::Tlr => "tlr",
            Parameter::Rpc => "rpc",
            Parameter::Go => "go",
            Parameter::Oi => "oi",
            Parameter::Perception => "perception",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Parameter::Tlr => "TLR",
            Parameter::Rpc => "RPC",
            Parameter::Go => "GO",
            Parameter::Oi => "OI",
            Parameter::Perception => "Perception",
        }
    }

    /// The column prefix used in the source tables, including the unit suffix.
    pub fn column_label(self) -> &'static str {
        match self {
            Parameter::Tlr => "TLR (100)",
            Parameter::Rpc => "RPC (100)",
            Parameter::Go => "GO (100)",
            Parameter::Oi => "OI (100)",
            Parameter::Perception => "PERCEPTION (100)",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Parameter::Tlr => "Teaching, Learning & Resources",
            Parameter::Rpc => "Research & Professional Practice",
            Parameter::Go => "Graduation Outcomes",
            Parameter::Oi => "Outreach & Inclusivity",
            Parameter::Perception => "Peer Reputation",
        }
    }

    pub fn sub_metrics(self) -> &'static [SubMetric] {
        match self {
            Parameter::Tlr => &TLR_SUB_METRICS,
            Parameter::Rpc => &RPC_SUB_METRICS,
            Parameter::Go => &GO_SUB_METRICS,
            Parameter::Oi => &OI_SUB_METRICS,
            Parameter::Perception => &PERCEPTION_SUB_METRICS,
        }
    }
}

impl FromStr for Parameter {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Parameter, RankingError> {
        let needle = s.trim();
        Parameter::ALL
            .into_iter()
            .find(|p| {
                p.key().eq_ignore_ascii_case(needle)
                    || p.short_label().eq_ignore_ascii_case(needle)
                    || p.column_label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| RankingError::UnknownParameter(s.to_string()))
    }
}

/// The year-series of the five category scores of one entity.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
pub struct Parameters {
    pub tlr: YearSeries,
    pub rpc: YearSeries,
    pub go: YearSeries,
    pub oi: YearSeries,
    pub perception: YearSeries,
}

impl Parameters {
    pub fn get(&self, parameter: Parameter) -> &YearSeries {
        match parameter {
            Parameter::Tlr => &self.tlr,
            Parameter::Rpc => &self.rpc,
            Parameter::Go => &self.go,
            Parameter::Oi => &self.oi,
            Parameter::Perception => &self.perception,
        }
    }

    pub fn get_mut(&mut self, parameter: Parameter) -> &mut YearSeries {
        match parameter {
            Parameter::Tlr => &mut self.tlr,
            Parameter::Rpc => &mut self.rpc,
            Parameter::Go => &mut self.go,
            Parameter::Oi => &mut self.oi,
            Parameter::Perception => &mut self.perception,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &YearSeries)> + '_ {
        Parameter::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// Source fields carried over verbatim from the raw record.
///
/// Every key is kept as it was received. Keys ending in `_<year>` are also
/// indexed by `(code, year)` so that detail tables do not have to rebuild
/// column names.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ExtraFields {
    raw: BTreeMap<String, Value>,
    by_code: BTreeMap<(String, Year), Value>,
}

impl ExtraFields {
    pub fn insert(&mut self, key: &str, value: Value) {
        if let Some((code, year)) = split_year_suffix(key) {
            self.by_code.insert((code.to_string(), year), value.clone());
        }
        self.raw.insert(key.to_string(), value);
    }

    /// The value stored under the exact source key.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// The value stored for a field code in a given year.
    pub fn get(&self, code: &str, year: Year) -> Option<&Value> {
        self.by_code.get(&(code.to_string(), year))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.raw.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl Serialize for ExtraFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

// Splits `PU_2021` into `("PU", 2021)`. The suffix must be a supported year.
fn split_year_suffix(key: &str) -> Option<(&str, Year)> {
    let (code, suffix) = key.rsplit_once('_')?;
    let year = suffix.parse::<Year>().ok()?;
    if supported_years().contains(&year) {
        Some((code, year))
    } else {
        None
    }
}

/// One ranked institution, across all the years and metrics.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct College {
    pub id: String,
    pub name: String,
    pub ranks: YearSeries,
    pub scores: YearSeries,
    pub parameters: Parameters,
    pub extra: ExtraFields,
}

impl College {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> College {
        College {
            id: id.into(),
            name: name.into(),
            ranks: YearSeries::new(),
            scores: YearSeries::new(),
            parameters: Parameters::default(),
            extra: ExtraFields::default(),
        }
    }
}

/// A normalized prediction for one institution.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct Prediction {
    pub college: String,
    /// 0 when the source value could not be read.
    pub predicted_rank: f64,
    /// 0 when the source value could not be read.
    pub predicted_score: f64,
    /// 0 when the source value could not be read.
    pub current_rank: f64,
    pub current_score: Option<f64>,
    /// `current_rank - predicted_rank`: positive values are improvements.
    pub change: f64,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message meant for the user.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Notice {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Notice {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Notice {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Errors raised when the library is given invalid settings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RankingError {
    InvalidSelectionBound(usize),
    UnknownSortKey(String),
    UnknownParameter(String),
    YearOutOfRange(i64),
}

impl Error for RankingError {}

impl Display for RankingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankingError::InvalidSelectionBound(n) => {
                write!(f, "selection bound must be at least 1, got {}", n)
            }
            RankingError::UnknownSortKey(s) => {
                write!(f, "unknown sort key {:?} (expected rank, score or name)", s)
            }
            RankingError::UnknownParameter(s) => write!(f, "unknown parameter {:?}", s),
            RankingError::YearOutOfRange(y) => write!(
                f,
                "year {} is outside of the covered range {}-{}",
                y, FIRST_YEAR, LAST_YEAR
            ),
        }
    }
}

// ********* Configuration **********

/// The orderings available for entity lists.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum SortKey {
    /// Ascending by rank, entities without a rank last.
    #[default]
    Rank,
    /// Descending by score, a missing score counting as 0.
    Score,
    /// Alphabetical by display name.
    Name,
}

impl FromStr for SortKey {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<SortKey, RankingError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rank" => Ok(SortKey::Rank),
            "score" => Ok(SortKey::Score),
            "name" => Ok(SortKey::Name),
            _ => Err(RankingError::UnknownSortKey(s.to_string())),
        }
    }
}
