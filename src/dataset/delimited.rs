use std::path::Path;

use crate::error::EvalError;

use super::{build_row, validate_header, Row};

pub(super) fn load(path: &Path, limit: Option<usize>) -> Result<Vec<Row>, EvalError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|err| EvalError::DataSource(format!("{}: {err}", path.display())))?;

    let header: Vec<String> = reader
        .headers()
        .map_err(|err| EvalError::DataSource(format!("{}: {err}", path.display())))?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    validate_header(&header)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        if limit.is_some_and(|cap| index >= cap) {
            break;
        }
        let record = record?;
        rows.push(build_row(
            index,
            &header,
            (0..header.len()).map(|col| record.get(col).map(str::to_string)),
        ));
    }
    Ok(rows)
}
