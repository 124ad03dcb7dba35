use crate::portal::io_csv::read_csv_file;
use crate::portal::io_excel::read_excel_file;
use crate::portal::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Extracts the records of a JSON payload.
///
/// The payload must be an array of objects. An object carrying an `error`
/// field is how the service reports its own failures.
pub fn records_from_json(js: JSValue, origin: &str) -> PortalResult<Vec<RawRecord>> {
    match js {
        JSValue::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(idx, v)| match v {
                JSValue::Object(m) => Ok(m),
                other => UnexpectedPayloadSnafu {
                    message: format!("{}: item {} is not an object: {}", origin, idx, other),
                }
                .fail(),
            })
            .collect(),
        JSValue::Object(m) if m.contains_key("error") => UnexpectedPayloadSnafu {
            message: format!("{}: {}", origin, m["error"]),
        }
        .fail(),
        other => UnexpectedPayloadSnafu {
            message: format!("{}: expected an array of records, got {}", origin, other),
        }
        .fail(),
    }
}

/// Reads a file of records, dispatching on its extension (json, csv, xlsx).
pub fn read_records(path: &Path) -> PortalResult<Vec<RawRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => read_csv_file(path),
        Some("xlsx") => read_excel_file(path),
        Some("json") => {
            let p = path.display().to_string();
            let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: p.clone() })?;
            let js: JSValue =
                serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
            records_from_json(js, &simplify_file_name(&p))
        }
        x => whatever!(
            "Cannot read {}: unsupported file type {:?} (expected json, csv or xlsx)",
            path.display(),
            x
        ),
    }
}

/// Records read from files on the local disk.
///
/// An upload replaces the entity file with the uploaded one, so that the
/// reload which follows serves the new data.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LocalSource {
    colleges: PathBuf,
    predictions: Option<PathBuf>,
}

impl LocalSource {
    pub fn new(colleges: PathBuf, predictions: Option<PathBuf>) -> LocalSource {
        LocalSource {
            colleges,
            predictions,
        }
    }
}

impl RankingSource for LocalSource {
    fn describe(&self) -> String {
        match &self.predictions {
            Some(p) => format!("{} + {}", self.colleges.display(), p.display()),
            None => self.colleges.display().to_string(),
        }
    }

    fn fetch_colleges(&mut self) -> PortalResult<Vec<RawRecord>> {
        read_records(&self.colleges)
    }

    fn fetch_predictions(&mut self) -> PortalResult<Vec<RawRecord>> {
        match &self.predictions {
            Some(p) => read_records(p),
            None => whatever!("No predictions file configured"),
        }
    }

    fn upload(&mut self, path: &Path) -> PortalResult<UploadReceipt> {
        let records = read_csv_file(path)?;
        info!(
            "LocalSource: {} replaces {}",
            path.display(),
            self.colleges.display()
        );
        self.colleges = path.to_path_buf();
        Ok(UploadReceipt {
            message: Some(format!(
                "File {} loaded",
                simplify_file_name(&path.display().to_string())
            )),
            status: Some("success".to_string()),
            row_count: Some(json!(records.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_of_objects() {
        let records = records_from_json(json!([{"Name": "A"}, {"Name": "B"}]), "test").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["Name"], json!("B"));
    }

    #[test]
    fn service_errors() {
        let res = records_from_json(json!({"error": "file missing", "colleges": []}), "test");
        match res {
            Err(PortalError::UnexpectedPayload { message }) => {
                assert!(message.contains("file missing"))
            }
            x => panic!("unexpected {:?}", x),
        }
        assert!(records_from_json(json!([1]), "test").is_err());
        assert!(records_from_json(json!("x"), "test").is_err());
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/nirf/colleges.csv"), "colleges.csv");
        assert_eq!(simplify_file_name("colleges.csv"), "colleges.csv");
    }

    #[test]
    fn unknown_extensions() {
        assert!(read_records(Path::new("rankings.parquet")).is_err());
    }

    #[test]
    fn missing_predictions_file() {
        let mut source = LocalSource::new(PathBuf::from("c.json"), None);
        assert!(source.fetch_predictions().is_err());
        assert_eq!(source.describe(), "c.json");
    }
}
