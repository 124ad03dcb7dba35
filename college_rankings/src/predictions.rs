//! Normalization of prediction records and the derived prediction view.

use std::cmp::Ordering;

use log::{debug, info};
use serde::Serialize;

use crate::config::*;
use crate::normalize::{lookup, lookup_text, parse_number};

pub const COLLEGE_FIELDS: &[&str] = &["College", "Name"];
pub const DEFAULT_COLLEGE: &str = "Unknown";
pub const PREDICTED_RANK_FIELDS: &[&str] = &["Predicted_Rank_2026", "Predicted_Rank_2025"];
pub const PREDICTED_SCORE_FIELDS: &[&str] = &["Predicted_Score_2026", "Predicted_Score_2025"];
pub const CURRENT_RANK_FIELDS: &[&str] = &["Actual_Rank_2025", "Current_Rank_2025"];
pub const CURRENT_SCORE_FIELDS: &[&str] = &["Actual_Score_2025", "Current_Score_2025"];

// The first present candidate, as a number. Unreadable values give None.
fn lookup_number(record: &RawRecord, candidates: &[&str]) -> Option<f64> {
    lookup(record, candidates)
        .map(parse_number)
        .filter(|v| !v.is_nan())
}

/// Builds a prediction out of one flat record.
///
/// Ranks and scores that are missing or unreadable are set to 0, and the
/// change is computed against that default.
pub fn normalize_prediction(record: &RawRecord) -> Prediction {
    let predicted_rank = lookup_number(record, PREDICTED_RANK_FIELDS).unwrap_or(0.0);
    let current_rank = lookup_number(record, CURRENT_RANK_FIELDS).unwrap_or(0.0);
    let p = Prediction {
        college: lookup_text(record, COLLEGE_FIELDS, DEFAULT_COLLEGE),
        predicted_rank,
        predicted_score: lookup_number(record, PREDICTED_SCORE_FIELDS).unwrap_or(0.0),
        current_rank,
        current_score: lookup_number(record, CURRENT_SCORE_FIELDS),
        change: current_rank - predicted_rank,
    };
    debug!(
        "normalize_prediction: {}: {} -> {} (change {})",
        p.college, p.current_rank, p.predicted_rank, p.change
    );
    p
}

pub fn normalize_predictions(records: &[RawRecord]) -> Vec<Prediction> {
    info!("Normalizing {} prediction records", records.len());
    records.iter().map(normalize_prediction).collect()
}

/// The direction of the expected move, with its magnitude.
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(tag = "direction", content = "by", rename_all = "lowercase")]
pub enum ChangeIndicator {
    /// Expected to improve, i.e. to move to a lower rank number.
    Up(f64),
    Down(f64),
    Same,
}

impl ChangeIndicator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeIndicator::Up(_) => "↑",
            ChangeIndicator::Down(_) => "↓",
            ChangeIndicator::Same => "→",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTier {
    Top10,
    Top50,
    Other,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Prediction {
    pub fn indicator(&self) -> ChangeIndicator {
        if self.change > 0.0 {
            ChangeIndicator::Up(self.change)
        } else if self.change < 0.0 {
            ChangeIndicator::Down(-self.change)
        } else {
            ChangeIndicator::Same
        }
    }

    /// The band of the predicted rank. A rank of 0 means unranked.
    pub fn tier(&self) -> RankTier {
        match self.predicted_rank {
            r if r > 0.0 && r <= 10.0 => RankTier::Top10,
            r if r > 0.0 && r <= 50.0 => RankTier::Top50,
            _ => RankTier::Other,
        }
    }

    /// How close the predicted score is to the current one.
    pub fn confidence(&self) -> Confidence {
        let current = match self.current_score {
            Some(s) if s != 0.0 && self.predicted_score != 0.0 => s,
            _ => return Confidence::Medium,
        };
        let gap = (current - self.predicted_score).abs();
        if gap < 1.0 {
            Confidence::High
        } else if gap < 3.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// One line of the prediction table.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct PredictionRow {
    pub college: String,
    pub predicted_rank: f64,
    pub predicted_score: f64,
    pub current_rank: f64,
    pub change: ChangeIndicator,
    pub tier: RankTier,
    pub confidence: Confidence,
}

impl From<&Prediction> for PredictionRow {
    fn from(p: &Prediction) -> PredictionRow {
        PredictionRow {
            college: p.college.clone(),
            predicted_rank: p.predicted_rank,
            predicted_score: p.predicted_score,
            current_rank: p.current_rank,
            change: p.indicator(),
            tier: p.tier(),
            confidence: p.confidence(),
        }
    }
}

// Unranked (0 or less) goes last.
fn compare_predicted(a: &Prediction, b: &Prediction) -> Ordering {
    let key = |p: &Prediction| Some(p.predicted_rank).filter(|r| *r > 0.0);
    match (key(a), key(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The predictions matching the search text, best predicted rank first.
pub fn prediction_view<'a>(predictions: &'a [Prediction], search: &str) -> Vec<&'a Prediction> {
    let needle = search.to_lowercase();
    let mut view: Vec<&Prediction> = predictions
        .iter()
        .filter(|p| p.college.to_lowercase().contains(&needle))
        .collect();
    view.sort_by(|a, b| compare_predicted(a, b));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(v: Value) -> RawRecord {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn prediction(college: &str, predicted: f64, current: f64) -> Prediction {
        Prediction {
            college: college.to_string(),
            predicted_rank: predicted,
            predicted_score: 0.0,
            current_rank: current,
            current_score: None,
            change: current - predicted,
        }
    }

    #[test]
    fn change_is_current_minus_predicted() {
        let _ = env_logger::try_init();
        let p = normalize_prediction(&record(json!({
            "College": "A",
            "Predicted_Rank_2026": "4",
            "Actual_Rank_2025": 10
        })));
        assert_eq!(p.change, 6.0);
        assert_eq!(p.indicator(), ChangeIndicator::Up(6.0));

        let p = normalize_prediction(&record(json!({
            "College": "B",
            "Predicted_Rank_2025": 10,
            "Current_Rank_2025": "4"
        })));
        assert_eq!(p.change, -6.0);
        assert_eq!(p.indicator(), ChangeIndicator::Down(6.0));
    }

    #[test]
    fn unparseable_ranks_default_to_zero() {
        let p = normalize_prediction(&record(json!({
            "Name": "C",
            "Predicted_Rank_2026": "TBD",
            "Actual_Rank_2025": "12"
        })));
        assert_eq!(p.college, "C");
        assert_eq!(p.predicted_rank, 0.0);
        assert_eq!(p.change, 12.0);
        assert_eq!(p.predicted_score, 0.0);
        assert_eq!(p.current_score, None);

        let p = normalize_prediction(&record(json!({})));
        assert_eq!(p.college, DEFAULT_COLLEGE);
        assert_eq!(p.change, 0.0);
        assert_eq!(p.indicator(), ChangeIndicator::Same);
    }

    #[test]
    fn newer_prediction_field_wins() {
        let p = normalize_prediction(&record(json!({
            "Predicted_Rank_2026": 3,
            "Predicted_Rank_2025": 8,
            "Predicted_Score_2026": "",
            "Predicted_Score_2025": "71.2"
        })));
        assert_eq!(p.predicted_rank, 3.0);
        assert_eq!(p.predicted_score, 71.2);
    }

    #[test]
    fn tiers() {
        assert_eq!(prediction("a", 10.0, 0.0).tier(), RankTier::Top10);
        assert_eq!(prediction("a", 11.0, 0.0).tier(), RankTier::Top50);
        assert_eq!(prediction("a", 51.0, 0.0).tier(), RankTier::Other);
        assert_eq!(prediction("a", 0.0, 0.0).tier(), RankTier::Other);
    }

    #[test]
    fn confidence_from_score_gap() {
        let mut p = prediction("a", 1.0, 1.0);
        assert_eq!(p.confidence(), Confidence::Medium);
        p.predicted_score = 70.0;
        p.current_score = Some(70.5);
        assert_eq!(p.confidence(), Confidence::High);
        p.current_score = Some(72.0);
        assert_eq!(p.confidence(), Confidence::Medium);
        p.current_score = Some(75.0);
        assert_eq!(p.confidence(), Confidence::Low);
    }

    #[test]
    fn view_sorts_unranked_last() {
        let all = vec![
            prediction("Zeta", 0.0, 5.0),
            prediction("Alpha", 7.0, 5.0),
            prediction("Beta", 2.0, 5.0),
        ];
        let names: Vec<&str> = prediction_view(&all, "")
            .iter()
            .map(|p| p.college.as_str())
            .collect();
        assert_eq!(names, vec!["Beta", "Alpha", "Zeta"]);
        assert_eq!(prediction_view(&all, "ALP").len(), 1);
    }

    #[test]
    fn row_serialization() {
        let row = PredictionRow::from(&prediction("a", 4.0, 10.0));
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["change"], json!({"direction": "up", "by": 6.0}));
        assert_eq!(v["tier"], json!("top10"));
        assert_eq!(v["confidence"], json!("Medium"));
    }
}
