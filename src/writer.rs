//! Line-delimited JSON output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::EvalError;
use crate::runner::ResultRecord;

/// Writes one JSON object per record, in batch order.
///
/// An empty batch still creates the destination, so downstream consumers can
/// tell "ran with zero rows" from "never ran". Lines already flushed are left
/// in place when a later write fails.
pub fn write_records(path: &Path, records: &[ResultRecord]) -> Result<(), EvalError> {
    let file = File::create(path)
        .map_err(|err| EvalError::Write(format!("{}: {err}", path.display())))?;
    let mut out = BufWriter::new(file);

    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|err| EvalError::Write(format!("serializing row {}: {err}", record.row)))?;
        out.write_all(line.as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .map_err(|err| EvalError::Write(format!("{}: {err}", path.display())))?;
    }

    out.flush()
        .map_err(|err| EvalError::Write(format!("{}: {err}", path.display())))
}
