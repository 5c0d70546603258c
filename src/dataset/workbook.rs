use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::error::EvalError;

use super::{build_row, validate_header, Row};

pub(super) fn load(path: &Path, limit: Option<usize>) -> Result<Vec<Row>, EvalError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|err| EvalError::DataSource(format!("{}: {err}", path.display())))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            EvalError::DataSource(format!("{}: workbook has no worksheets", path.display()))
        })?
        .map_err(|err| EvalError::DataSource(format!("{}: {err}", path.display())))?;

    let mut cell_rows = range.rows();
    let header: Vec<String> = match cell_rows.next() {
        Some(cells) => cells
            .iter()
            .map(|cell| cell_text(cell).unwrap_or_default().trim().to_string())
            .collect(),
        None => {
            return Err(EvalError::DataSource(format!(
                "{}: first worksheet is empty",
                path.display()
            )))
        }
    };
    validate_header(&header)?;

    let mut rows = Vec::new();
    for (index, cells) in cell_rows.enumerate() {
        if limit.is_some_and(|cap| index >= cap) {
            break;
        }
        rows.push(build_row(index, &header, cells.iter().map(cell_text)));
    }
    Ok(rows)
}

/// Text content of a cell. Numeric and boolean cells are rendered as text
/// since every consumed field is natural language.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}
