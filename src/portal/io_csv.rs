// Primitives for reading CSV files.

use std::io::Read;

use crate::portal::*;

/// Reads the records of a CSV file. The first row holds the column names.
pub fn read_csv_file(path: &Path) -> PortalResult<Vec<RawRecord>> {
    let p = path.display().to_string();
    info!("read_csv_file: reading {:?}", p);
    let rdr = csv_builder()
        .from_path(path)
        .context(OpeningCsvSnafu { path: p.clone() })?;
    read_records(rdr, &p)
}

/// Reads CSV records from any reader. `name` only appears in errors.
pub fn read_csv_records<R: Read>(reader: R, name: &str) -> PortalResult<Vec<RawRecord>> {
    read_records(csv_builder().from_reader(reader), name)
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(csv::Trim::Headers);
    builder
}

fn read_records<R: Read>(mut rdr: csv::Reader<R>, name: &str) -> PortalResult<Vec<RawRecord>> {
    let header = rdr
        .headers()
        .context(OpeningCsvSnafu { path: name })?
        .clone();
    debug!("read_csv_records: header: {:?}", header);

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let line = line_r.context(OpeningCsvSnafu { path: name })?;
        // Short rows simply miss the last columns.
        let record: RawRecord = header
            .iter()
            .zip(line.iter())
            .map(|(column, cell)| (column.to_string(), csv_cell(cell)))
            .collect();
        debug!("read_csv_records: lineno: {} fields: {}", idx + 2, record.len());
        res.push(record);
    }
    info!("read_csv_records: {} records in {}", res.len(), name);
    Ok(res)
}

// Empty cells carry no data.
fn csv_cell(cell: &str) -> JSValue {
    if cell.trim().is_empty() {
        JSValue::Null
    } else {
        JSValue::String(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use college_rankings::normalize::normalize_records;

    #[test]
    fn header_names_the_fields() {
        let data = "Institute ID,Name,Rank_2025,Score_2025,TLR (100)_2024\n\
                    X1,Test U,5,70.5,\n\
                    X2,Other,,61.25\n";
        let records = read_csv_records(data.as_bytes(), "mem").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Name"], json!("Test U"));
        assert_eq!(records[0]["TLR (100)_2024"], JSValue::Null);
        assert!(!records[1].contains_key("TLR (100)_2024"));

        let colleges = normalize_records(&records);
        assert_eq!(colleges[0].ranks.get(2025), Some(5.0));
        assert!(!colleges[1].ranks.contains_year(2025));
        assert_eq!(colleges[1].scores.get(2025), Some(61.25));
    }

    #[test]
    fn quoted_cells() {
        let data = "Name,City_2025\n\"Institute of Science, Bengaluru\",\"Bengaluru\"\n";
        let records = read_csv_records(data.as_bytes(), "mem").unwrap();
        assert_eq!(records[0]["Name"], json!("Institute of Science, Bengaluru"));
    }
}
