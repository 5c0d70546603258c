//! Dataset loading for batch evaluation.
//!
//! A dataset is a tabular file whose first row names the fields
//! (`question`, `answer`, `context`, `ground_truth`, ...) and whose
//! remaining rows each hold one evaluation input.

mod delimited;
mod workbook;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::EvalError;

/// Supported dataset file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Xlsx,
}

/// One input row, keyed by the header field names.
///
/// Identity is the position in the source file. Cells that are absent or
/// blank after trimming are not stored, so `field` returning `None` covers
/// both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    pub fields: BTreeMap<String, String>,
}

impl Row {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Reads `path` into rows, in file order.
///
/// `limit` caps the number of data rows; `None` reads everything. The loader
/// validates the header itself (non-empty, uniquely named columns); whether a
/// row carries the fields a particular evaluator needs is checked per
/// invocation by the runner, so one sparse row never aborts a batch.
pub fn load_dataset(
    path: &Path,
    format: DatasetFormat,
    limit: Option<usize>,
) -> Result<Vec<Row>, EvalError> {
    match format {
        DatasetFormat::Csv => delimited::load(path, limit),
        DatasetFormat::Xlsx => workbook::load(path, limit),
    }
}

pub(crate) fn validate_header(header: &[String]) -> Result<(), EvalError> {
    if header.is_empty() {
        return Err(EvalError::DataSource("header row is empty".into()));
    }
    let mut seen = std::collections::BTreeSet::new();
    for name in header {
        if name.trim().is_empty() {
            return Err(EvalError::DataSource(
                "header contains an unnamed column".into(),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(EvalError::DataSource(format!(
                "duplicate column `{name}` in header"
            )));
        }
    }
    Ok(())
}

pub(crate) fn build_row(
    index: usize,
    header: &[String],
    cells: impl Iterator<Item = Option<String>>,
) -> Row {
    let mut fields = BTreeMap::new();
    for (name, cell) in header.iter().zip(cells) {
        if let Some(value) = cell {
            if !value.trim().is_empty() {
                fields.insert(name.clone(), value);
            }
        }
    }
    Row { index, fields }
}
