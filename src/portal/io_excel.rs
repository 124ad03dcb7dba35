// Reading records out of the first worksheet of an Excel file.

use crate::portal::*;

use calamine::{open_workbook, DataType, Reader, Xlsx};

pub fn read_excel_file(path: &Path) -> PortalResult<Vec<RawRecord>> {
    let p = path.display().to_string();
    info!("read_excel_file: reading {:?}", p);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: p.clone() })?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu { path: p.clone() })?
        .context(OpeningExcelSnafu { path: p.clone() })?;

    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu { path: p.clone() })?
        .iter()
        .map(header_name)
        .collect();
    debug!("read_excel_file: header: {:?}", header);

    let res: Vec<RawRecord> = rows
        .map(|row| {
            header
                .iter()
                .zip(row.iter())
                .filter(|(column, _)| !column.is_empty())
                .map(|(column, cell)| (column.clone(), excel_cell(cell)))
                .collect()
        })
        .collect();
    info!("read_excel_file: {} records in {}", res.len(), p);
    Ok(res)
}

fn header_name(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => f.to_string(),
        _ => "".to_string(),
    }
}

fn excel_cell(cell: &DataType) -> JSValue {
    match cell {
        DataType::String(s) if s.trim().is_empty() => JSValue::Null,
        DataType::String(s) => JSValue::String(s.clone()),
        DataType::Int(i) => json!(i),
        DataType::Float(f) | DataType::DateTime(f) => {
            serde_json::Number::from_f64(*f).map_or(JSValue::Null, JSValue::Number)
        }
        DataType::Bool(b) => JSValue::Bool(*b),
        DataType::Empty => JSValue::Null,
        other => {
            debug!("excel_cell: ignoring cell {:?}", other);
            JSValue::Null
        }
    }
}
