//! Queries over the sparse year coverage of an entity.
//!
//! Year coverage differs from one institution to the next: recent entrants
//! have no early years and some years may be withheld. Nothing here assumes
//! a uniform window, and every lookup of a missing year yields the
//! [PLACEHOLDER] rather than failing.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::*;
use crate::normalize::{is_present, parse_number};

/// The series considered when collecting the years of an entity.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Coverage {
    RanksAndScores,
    Parameters,
    All,
}

impl College {
    /// The years for which at least one of the covered series carries data.
    ///
    /// The set iterates in ascending order; use `.iter().rev()` for the most
    /// recent year first.
    pub fn years_with_data(&self, coverage: Coverage) -> BTreeSet<Year> {
        let mut years: BTreeSet<Year> = BTreeSet::new();
        if coverage != Coverage::Parameters {
            years.extend(self.ranks.years());
            years.extend(self.scores.years());
        }
        if coverage != Coverage::RanksAndScores {
            for (_, series) in self.parameters.iter() {
                years.extend(series.years());
            }
        }
        years
    }

    /// The most recent year with a rank. This selects the "current" snapshot of
    /// the entity in summary views.
    pub fn latest_year_with_data(&self) -> Option<Year> {
        supported_years().rev().find(|y| self.ranks.get(*y).is_some())
    }
}

/// Formats a value with two decimals.
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// The formatted value for a year, or the placeholder if the year has no data.
pub fn value_or_placeholder(series: &YearSeries, year: Year) -> String {
    series
        .get(year)
        .map(format_value)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// One line of the historical table of an entity.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub year: Year,
    pub rank: String,
    pub score: String,
    pub tlr: String,
    pub rpc: String,
    pub go: String,
    pub oi: String,
    pub perception: String,
}

/// The historical table, most recent year first. Only the years that have a
/// rank or a score are listed.
pub fn history_rows(college: &College) -> Vec<HistoryRow> {
    let params = &college.parameters;
    college
        .years_with_data(Coverage::RanksAndScores)
        .into_iter()
        .rev()
        .map(|year| HistoryRow {
            year,
            rank: value_or_placeholder(&college.ranks, year),
            score: value_or_placeholder(&college.scores, year),
            tlr: value_or_placeholder(&params.tlr, year),
            rpc: value_or_placeholder(&params.rpc, year),
            go: value_or_placeholder(&params.go, year),
            oi: value_or_placeholder(&params.oi, year),
            perception: value_or_placeholder(&params.perception, year),
        })
        .collect()
}

/// A named series of points, aligned with the labels of its chart.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct Dataset {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    /// `None` marks a gap in the line.
    pub points: Vec<Option<f64>>,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

fn line_dataset(label: &str, series: &YearSeries, years: &[Year]) -> Dataset {
    Dataset {
        label: label.to_string(),
        color: None,
        points: years.iter().map(|y| series.get(*y)).collect(),
    }
}

fn year_labels(years: &[Year]) -> Vec<String> {
    years.iter().map(|y| y.to_string()).collect()
}

/// Rank and score over the years where either is known, oldest first.
pub fn rank_score_chart(college: &College) -> ChartData {
    let years: Vec<Year> = college
        .years_with_data(Coverage::RanksAndScores)
        .into_iter()
        .collect();
    ChartData {
        labels: year_labels(&years),
        datasets: vec![
            line_dataset("Rank", &college.ranks, &years),
            line_dataset("Score", &college.scores, &years),
        ],
    }
}

/// The five parameters over the years where any of them is known, oldest first.
pub fn parameter_chart(college: &College) -> ChartData {
    let years: Vec<Year> = college
        .years_with_data(Coverage::Parameters)
        .into_iter()
        .collect();
    ChartData {
        labels: year_labels(&years),
        datasets: college
            .parameters
            .iter()
            .map(|(p, series)| line_dataset(p.short_label(), series, &years))
            .collect(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct YearCell {
    pub year: Year,
    pub value: String,
}

/// The detail of one sub-metric across all the supported years.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct SubMetricRow {
    pub code: &'static str,
    pub name: &'static str,
    pub cells: Vec<YearCell>,
}

/// The value of a sub-metric, read from the pass-through fields.
pub fn sub_metric_value(college: &College, code: &str, year: Year) -> Option<f64> {
    college
        .extra
        .get(code, year)
        .filter(|v| is_present(v))
        .map(parse_number)
        .filter(|v| !v.is_nan())
}

/// The sub-metric table of one parameter group: one row per sub-metric, one
/// cell per supported year.
pub fn sub_metric_table(college: &College, parameter: Parameter) -> Vec<SubMetricRow> {
    parameter
        .sub_metrics()
        .iter()
        .map(|sm| SubMetricRow {
            code: sm.code,
            name: sm.name,
            cells: supported_years()
                .map(|year| YearCell {
                    year,
                    value: sub_metric_value(college, sm.code, year)
                        .map(format_value)
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                })
                .collect(),
        })
        .collect()
}

/// The summary of an entity for one year, as shown on a card.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub year: Year,
    pub rank: String,
    pub score: String,
    pub tlr: String,
    pub rpc: String,
}

pub fn card(college: &College, year: Year) -> Card {
    Card {
        id: college.id.clone(),
        name: college.name.clone(),
        year,
        rank: value_or_placeholder(&college.ranks, year),
        score: value_or_placeholder(&college.scores, year),
        tlr: value_or_placeholder(&college.parameters.tlr, year),
        rpc: value_or_placeholder(&college.parameters.rpc, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> College {
        let mut c = College::new("IR-1", "Sample Institute");
        c.ranks = YearSeries::from([(2019, 14.0), (2021, 9.0), (2022, f64::NAN)]);
        c.scores = YearSeries::from([(2020, 60.126), (2021, 62.0)]);
        c.parameters.tlr = YearSeries::from([(2018, 70.0), (2021, 71.5)]);
        c.parameters.perception = YearSeries::from([(2023, 30.0)]);
        c.extra.insert("PU_2021", json!("44.444"));
        c.extra.insert("QP_2021", json!("n/a"));
        c
    }

    #[test]
    fn union_of_years() {
        let c = sample();
        let years: Vec<Year> = c
            .years_with_data(Coverage::RanksAndScores)
            .into_iter()
            .collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
        let params: Vec<Year> = c.years_with_data(Coverage::Parameters).into_iter().collect();
        assert_eq!(params, vec![2018, 2021, 2023]);
        assert_eq!(c.years_with_data(Coverage::All).len(), 5);
    }

    #[test]
    fn latest_year_skips_unparseable_ranks() {
        assert_eq!(sample().latest_year_with_data(), Some(2021));
        assert_eq!(College::new("a", "b").latest_year_with_data(), None);
    }

    #[test]
    fn placeholder_for_missing_years() {
        let c = sample();
        assert_eq!(value_or_placeholder(&c.scores, 2020), "60.13");
        assert_eq!(value_or_placeholder(&c.ranks, 2021), "9.00");
        assert_eq!(value_or_placeholder(&c.ranks, 2017), PLACEHOLDER);
        assert_eq!(value_or_placeholder(&c.ranks, 2022), PLACEHOLDER);
    }

    #[test]
    fn history_is_most_recent_first() {
        let rows = history_rows(&sample());
        let years: Vec<Year> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2021, 2020, 2019]);
        assert_eq!(rows[0].tlr, "71.50");
        assert_eq!(rows[1].rank, PLACEHOLDER);
        assert_eq!(rows[2].perception, PLACEHOLDER);
    }

    #[test]
    fn charts_have_gaps() {
        let chart = rank_score_chart(&sample());
        assert_eq!(chart.labels, vec!["2019", "2020", "2021"]);
        assert_eq!(chart.datasets[0].points, vec![Some(14.0), None, Some(9.0)]);
        assert_eq!(chart.datasets[1].points, vec![None, Some(60.126), Some(62.0)]);

        let chart = parameter_chart(&sample());
        assert_eq!(chart.datasets.len(), 5);
        assert_eq!(chart.datasets[4].label, "Perception");
        assert_eq!(chart.datasets[4].points, vec![None, None, Some(30.0)]);
    }

    #[test]
    fn sub_metrics_from_pass_through_fields() {
        let rows = sub_metric_table(&sample(), Parameter::Rpc);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].code, "PU");
        assert_eq!(rows[0].cells.len(), 9);
        let pu_2021 = rows[0].cells.iter().find(|c| c.year == 2021).unwrap();
        assert_eq!(pu_2021.value, "44.44");
        assert!(rows[1].cells.iter().all(|c| c.value == PLACEHOLDER));
    }

    #[test]
    fn card_for_year_without_data() {
        let c = card(&sample(), 2017);
        assert_eq!(c.rank, PLACEHOLDER);
        assert_eq!(c.score, PLACEHOLDER);
    }
}
