//! Conversion of flat, year-suffixed records into structured entities.
//!
//! Logical attributes that may be stored under several column names are
//! resolved through ordered lists of candidate names (see [lookup]). The
//! first candidate carrying a value wins.

use log::{debug, info};
use serde_json::Value;

use crate::config::*;

/// Column names holding the institution identifier, in order of preference.
pub const ID_FIELDS: &[&str] = &["Institute ID", "id"];
pub const DEFAULT_ID: &str = "N/A";

/// Column names holding the display name, in order of preference.
pub const NAME_FIELDS: &[&str] = &["Name", "name"];
pub const DEFAULT_NAME: &str = "Unknown College";

pub const RANK_COLUMN: &str = "Rank";
pub const SCORE_COLUMN: &str = "Score";

/// The name of the column holding a metric for a given year, e.g. `Rank_2021`.
pub fn year_column(column: &str, year: Year) -> String {
    format!("{}_{}", column, year)
}

/// A field is present if it exists, is not null and is not the empty string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Returns the value of the first candidate field that is present.
pub fn lookup<'a>(record: &'a RawRecord, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|v| is_present(v))
}

/// Like [lookup], rendering the value as text and falling back to a default.
pub fn lookup_text(record: &RawRecord, candidates: &[&str], default: &str) -> String {
    match lookup(record, candidates) {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => default.to_string(),
    }
}

/// Reads a numeric value. Anything that is not a number yields NaN.
pub fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_float_prefix(s),
        _ => f64::NAN,
    }
}

/// Parses the longest numeric prefix of a string.
///
/// Leading whitespace is skipped and trailing garbage ignored, so that
/// `" 12.5 (est.)"` reads as 12.5. A string with no numeric prefix is NaN.
pub fn parse_float_prefix(s: &str) -> f64 {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if t[end..].starts_with("Infinity") {
        return if t.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return f64::NAN;
    }

    // The exponent only counts if at least one digit follows it.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    t[..end].parse::<f64>().unwrap_or(f64::NAN)
}

fn probe(record: &RawRecord, column: &str, year: Year, series: &mut YearSeries) {
    if let Some(v) = record.get(&year_column(column, year)) {
        if is_present(v) {
            series.insert(year, parse_number(v));
        }
    }
}

/// Builds an entity out of one flat record.
///
/// For each supported year, the rank, the score and the five parameters are
/// read from their fixed columns. Missing, null or empty fields leave the year
/// absent from the corresponding series. Then all the source fields whose name
/// contains an underscore are copied over verbatim, for the sub-metric tables.
pub fn normalize_record(record: &RawRecord) -> College {
    let mut college = College::new(
        lookup_text(record, ID_FIELDS, DEFAULT_ID),
        lookup_text(record, NAME_FIELDS, DEFAULT_NAME),
    );

    for year in supported_years() {
        probe(record, RANK_COLUMN, year, &mut college.ranks);
        probe(record, SCORE_COLUMN, year, &mut college.scores);
        for p in Parameter::ALL {
            probe(record, p.column_label(), year, college.parameters.get_mut(p));
        }
    }

    for (key, value) in record.iter().filter(|(k, _)| k.contains('_')) {
        college.extra.insert(key, value.clone());
    }

    debug!(
        "normalize_record: {} ({}): {} ranks, {} scores, {} extra fields",
        college.name,
        college.id,
        college.ranks.len(),
        college.scores.len(),
        college.extra.len()
    );
    college
}

/// Builds all the entities of a payload, in order.
pub fn normalize_records(records: &[RawRecord]) -> Vec<College> {
    info!("Normalizing {} college records", records.len());
    records.iter().map(normalize_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> RawRecord {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn single_year_record() {
        let _ = env_logger::try_init();
        let r = record(json!({
            "Institute ID": "X1",
            "Name": "Test U",
            "Rank_2025": "5",
            "Score_2025": "70.5"
        }));
        let c = normalize_record(&r);
        assert_eq!(c.id, "X1");
        assert_eq!(c.name, "Test U");
        assert_eq!(c.ranks, YearSeries::from([(2025, 5.0)]));
        assert_eq!(c.scores, YearSeries::from([(2025, 70.5)]));
        for (_, series) in c.parameters.iter() {
            assert!(series.is_empty());
        }
    }

    #[test]
    fn missing_years_stay_absent() {
        let r = record(json!({
            "Name": "Sparse",
            "Rank_2019": null,
            "Rank_2020": "",
            "Rank_2021": 12,
            "Score_2021": 55.25,
            "TLR (100)_2021": "61.5",
            "PERCEPTION (100)_2018": 40
        }));
        let c = normalize_record(&r);
        assert!(!c.ranks.contains_year(2019));
        assert!(!c.ranks.contains_year(2020));
        assert_eq!(c.ranks.get(2021), Some(12.0));
        assert_eq!(c.scores.len(), 1);
        assert_eq!(c.parameters.tlr.get(2021), Some(61.5));
        assert_eq!(c.parameters.perception.get(2018), Some(40.0));
        assert!(c.parameters.rpc.is_empty());
    }

    #[test]
    fn unparseable_values_are_kept_as_nan() {
        let r = record(json!({ "Name": "U", "Rank_2022": "N/A", "Score_2022": true }));
        let c = normalize_record(&r);
        assert!(c.ranks.contains_year(2022));
        assert_eq!(c.ranks.get(2022), None);
        assert!(c.scores.raw(2022).unwrap().is_nan());
    }

    #[test]
    fn fallback_chains() {
        let c = normalize_record(&record(json!({ "id": "B2", "name": "Lower" })));
        assert_eq!(c.id, "B2");
        assert_eq!(c.name, "Lower");

        let c = normalize_record(&record(json!({ "Institute ID": "", "id": 17 })));
        assert_eq!(c.id, "17");
        assert_eq!(c.name, DEFAULT_NAME);

        let c = normalize_record(&record(json!({})));
        assert_eq!(c.id, DEFAULT_ID);
    }

    #[test]
    fn underscore_fields_pass_through() {
        let r = record(json!({
            "Name": "U",
            "City": "Chennai",
            "PU_2021": "33.1",
            "MS_2024": null,
            "Rank_2024": "3"
        }));
        let c = normalize_record(&r);
        assert_eq!(c.extra.get("PU", 2021), Some(&json!("33.1")));
        assert_eq!(c.extra.raw("MS_2024"), Some(&Value::Null));
        assert_eq!(c.extra.raw("Rank_2024"), Some(&json!("3")));
        assert_eq!(c.extra.raw("City"), None);
    }

    #[test]
    fn float_prefix() {
        assert_eq!(parse_float_prefix("70.5"), 70.5);
        assert_eq!(parse_float_prefix("  -3"), -3.0);
        assert_eq!(parse_float_prefix("12abc"), 12.0);
        assert_eq!(parse_float_prefix(".5"), 0.5);
        assert_eq!(parse_float_prefix("7."), 7.0);
        assert_eq!(parse_float_prefix("1e3"), 1000.0);
        assert_eq!(parse_float_prefix("2e"), 2.0);
        assert_eq!(parse_float_prefix("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float_prefix("N/A").is_nan());
        assert!(parse_float_prefix("-.").is_nan());
        assert!(parse_float_prefix("").is_nan());
    }

    #[test]
    fn formatted_values_read_back() {
        for v in [0.0, 1.25, 70.5, 91.17, 100.0] {
            let s = format!("{:.2}", v);
            assert!((parse_float_prefix(&s) - v).abs() < 1e-9);
        }
    }
}
