//! Filtering, sorting and selection of entities for browsing and comparison.
//!
//! None of the operations here modify the source collection: they return
//! views made of references into it.

use std::cmp::Ordering;

use log::{debug, info};
use serde::Serialize;

use crate::config::*;
use crate::resolver::{format_value, value_or_placeholder, ChartData, Dataset};

/// The colours of the compared series. The first selected entity gets the
/// first colour, and so on.
pub const PALETTE: [&str; 6] = [
    "#1FB8CD", "#FFC185", "#B4413C", "#ECEBD5", "#5D878F", "#DB4545",
];

pub fn series_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// True if the entity has a rank or a score for this year.
pub fn has_data_for_year(college: &College, year: Year) -> bool {
    college.ranks.get(year).is_some() || college.scores.get(year).is_some()
}

/// Keeps the entities with a rank or a score for the given year.
pub fn filter_by_year<'a, I>(colleges: I, year: Year) -> Vec<&'a College>
where
    I: IntoIterator<Item = &'a College>,
{
    colleges
        .into_iter()
        .filter(|c| has_data_for_year(c, year))
        .collect()
}

/// Keeps the entities whose name contains the search text, ignoring case.
pub fn filter_by_search<'a, I>(colleges: I, search: &str) -> Vec<&'a College>
where
    I: IntoIterator<Item = &'a College>,
{
    let needle = search.to_lowercase();
    colleges
        .into_iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect()
}

// Missing ranks go last.
fn compare_ranks(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compares display names alphabetically, ignoring case and accents on
/// the first pass, then falling back to the exact text.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(s: &str) -> Vec<char> {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .map(fold_accent)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

/// Orders a view of entities for one year. The sort is stable.
pub fn sort_by(mut colleges: Vec<&College>, key: SortKey, year: Year) -> Vec<&College> {
    match key {
        SortKey::Rank => {
            colleges.sort_by(|a, b| compare_ranks(a.ranks.get(year), b.ranks.get(year)));
        }
        SortKey::Score => {
            colleges.sort_by(|a, b| {
                let sa = a.scores.get(year).unwrap_or(0.0);
                let sb = b.scores.get(year).unwrap_or(0.0);
                sb.total_cmp(&sa)
            });
        }
        SortKey::Name => {
            colleges.sort_by(|a, b| compare_names(&a.name, &b.name));
        }
    }
    colleges
}

/// The list shown when browsing: entities with data for the year, matching
/// the search text, in the requested order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CollegeQuery {
    pub year: Year,
    pub search: Option<String>,
    pub sort: SortKey,
}

impl CollegeQuery {
    pub fn new(year: Year) -> CollegeQuery {
        CollegeQuery {
            year,
            search: None,
            sort: SortKey::Rank,
        }
    }

    pub fn search(self, search: &str) -> CollegeQuery {
        CollegeQuery {
            search: Some(search.to_string()).filter(|s| !s.is_empty()),
            ..self
        }
    }

    pub fn sort(self, sort: SortKey) -> CollegeQuery {
        CollegeQuery { sort, ..self }
    }

    pub fn apply<'a>(&self, colleges: &'a [College]) -> Vec<&'a College> {
        let mut view = filter_by_year(colleges, self.year);
        if let Some(search) = self.search.as_deref() {
            view = filter_by_search(view, search);
        }
        let view = sort_by(view, self.sort, self.year);
        info!(
            "Displaying {} of {} colleges for year {}",
            view.len(),
            colleges.len(),
            self.year
        );
        view
    }
}

/// The result of trying to change a selection.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SelectOutcome {
    Added,
    Removed,
    AlreadySelected,
    /// The selection is at its bound and was left unchanged.
    Full(Notice),
}

/// An ordered, bounded set of entities picked for comparison.
///
/// Insertion order is preserved and drives the colour assignment of the
/// compared series.
#[derive(PartialEq, Debug, Clone)]
pub struct Selection {
    max: usize,
    items: Vec<College>,
}

impl Selection {
    pub fn new(max: usize) -> Result<Selection, RankingError> {
        if max == 0 {
            return Err(RankingError::InvalidSelectionBound(max));
        }
        Ok(Selection {
            max,
            items: Vec::new(),
        })
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|c| c.id == id)
    }

    pub fn items(&self) -> &[College] {
        &self.items
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|c| c.id.as_str()).collect()
    }

    /// Adds an entity at the end of the selection.
    ///
    /// When the selection is full, nothing changes and the outcome carries a
    /// notice for the user.
    pub fn select(&mut self, college: &College) -> SelectOutcome {
        if self.contains(&college.id) {
            return SelectOutcome::AlreadySelected;
        }
        if self.is_full() {
            let notice = Notice::error(format!(
                "Maximum {} colleges can be selected",
                self.max
            ));
            debug!("select: {} rejected: {}", college.id, notice.message);
            return SelectOutcome::Full(notice);
        }
        self.items.push(college.clone());
        debug!("select: {} added ({}/{})", college.id, self.len(), self.max);
        SelectOutcome::Added
    }

    /// Removes an entity. Returns false if it was not selected.
    pub fn deselect(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        self.items.len() != before
    }

    /// Removes the entity if it is selected, adds it otherwise.
    pub fn toggle(&mut self, college: &College) -> SelectOutcome {
        if self.deselect(&college.id) {
            SelectOutcome::Removed
        } else {
            self.select(college)
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replaces the selected entities with their copies from a new
    /// collection. Entities that are no longer present are dropped.
    pub fn refresh(&mut self, colleges: &[College]) {
        let before = self.items.len();
        self.items = self
            .items
            .iter()
            .filter_map(|old| colleges.iter().find(|c| c.id == old.id).cloned())
            .collect();
        if self.items.len() != before {
            debug!(
                "refresh: {} selected colleges no longer available",
                before - self.items.len()
            );
        }
    }

    /// The selected entities with the colour of their series.
    pub fn colored(&self) -> impl Iterator<Item = (&College, &'static str)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, c)| (c, series_color(idx)))
    }
}

/// Entities offered for addition to a selection: matching the search text,
/// not already selected, in name order, at most `limit` of them.
pub fn suggestions<'a>(
    colleges: &'a [College],
    selection: &Selection,
    search: &str,
    limit: usize,
) -> Vec<&'a College> {
    let candidates: Vec<&College> = filter_by_search(colleges, search)
        .into_iter()
        .filter(|c| !selection.contains(&c.id))
        .collect();
    sort_by(candidates, SortKey::Name, LAST_YEAR)
        .into_iter()
        .take(limit)
        .collect()
}

/// One line of the comparison table: a label and one cell per selected entity.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub label: String,
    pub cells: Vec<String>,
}

fn comparison_row(
    label: &str,
    selection: &Selection,
    f: impl Fn(&College) -> String,
) -> ComparisonRow {
    ComparisonRow {
        label: label.to_string(),
        cells: selection.items().iter().map(f).collect(),
    }
}

/// Rank, overall score, then the requested parameters for the compare year.
pub fn comparison_table(
    selection: &Selection,
    year: Year,
    parameters: &[Parameter],
) -> Vec<ComparisonRow> {
    let mut rows = vec![
        comparison_row("Rank", selection, |c| value_or_placeholder(&c.ranks, year)),
        comparison_row("Overall Score", selection, |c| {
            value_or_placeholder(&c.scores, year)
        }),
    ];
    for p in Parameter::ALL.into_iter().filter(|p| parameters.contains(p)) {
        rows.push(comparison_row(p.column_label(), selection, |c| {
            value_or_placeholder(c.parameters.get(p), year)
        }));
    }
    rows
}

/// The requested parameters of each selected entity for the compare year.
/// Missing values are drawn as 0.
pub fn radar_chart(selection: &Selection, year: Year, parameters: &[Parameter]) -> ChartData {
    let params: Vec<Parameter> = Parameter::ALL
        .into_iter()
        .filter(|p| parameters.contains(p))
        .collect();
    ChartData {
        labels: params.iter().map(|p| p.key().to_uppercase()).collect(),
        datasets: selection
            .colored()
            .map(|(c, color)| Dataset {
                label: c.name.clone(),
                color: Some(color),
                points: params
                    .iter()
                    .map(|p| Some(c.parameters.get(*p).get(year).unwrap_or(0.0)))
                    .collect(),
            })
            .collect(),
    }
}

/// The overall score of each selected entity over all the supported years.
pub fn trend_chart(selection: &Selection) -> ChartData {
    ChartData {
        labels: supported_years().map(|y| y.to_string()).collect(),
        datasets: selection
            .colored()
            .map(|(c, color)| Dataset {
                label: c.name.clone(),
                color: Some(color),
                points: supported_years().map(|y| c.scores.get(y)).collect(),
            })
            .collect(),
    }
}

/// The average of the requested parameters for the compare year, over the
/// entities that have them. Used as a reference line in comparisons.
pub fn parameter_averages(
    selection: &Selection,
    year: Year,
    parameters: &[Parameter],
) -> Vec<(Parameter, String)> {
    parameters
        .iter()
        .map(|p| {
            let values: Vec<f64> = selection
                .items()
                .iter()
                .filter_map(|c| c.parameters.get(*p).get(year))
                .collect();
            let avg = if values.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                format_value(values.iter().sum::<f64>() / values.len() as f64)
            };
            (*p, avg)
        })
        .collect()
}
