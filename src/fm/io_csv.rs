// Primitives for reading the CSV exports by column name.

use std::collections::HashMap;

use csv::ReaderBuilder;
use snafu::prelude::*;

use crate::fm::{io_common, CsvParseSnafu, FmResult, MissingColumnSnafu, MissingValueSnafu};

/// One parsed CSV export, with header-indexed access to the rows.
///
/// Values are trimmed; the header row is line 1, so the first data row
/// reports as line 2 in errors.
pub struct SourceTable {
    path: String,
    columns: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl SourceTable {
    pub fn open(path: &str) -> FmResult<SourceTable> {
        let text = io_common::decode_file(path)?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr.headers().context(CsvParseSnafu { path })?.clone();
        let mut columns: HashMap<String, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            if !name.is_empty() {
                columns.insert(name.to_string(), idx);
            }
        }

        let mut rows: Vec<csv::StringRecord> = Vec::new();
        for record in rdr.into_records() {
            rows.push(record.context(CsvParseSnafu { path })?);
        }
        Ok(SourceTable {
            path: path.to_string(),
            columns,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The 1-based file line of a data row.
    pub fn lineno(&self, row: usize) -> usize {
        row + 2
    }

    pub fn require_columns(&self, names: &[&str]) -> FmResult<()> {
        for name in names {
            ensure!(
                self.columns.contains_key(*name),
                MissingColumnSnafu {
                    column: name.to_string(),
                    path: self.path.clone(),
                }
            );
        }
        Ok(())
    }

    /// The value of `column` in `row`; an empty or absent cell is an error.
    pub fn required_value(&self, row: usize, column: &str) -> FmResult<&str> {
        let idx = *self.columns.get(column).context(MissingColumnSnafu {
            column: column.to_string(),
            path: self.path.clone(),
        })?;
        let value = self
            .rows
            .get(row)
            .and_then(|r| r.get(idx))
            .unwrap_or("");
        ensure!(
            !value.is_empty(),
            MissingValueSnafu {
                column: column.to_string(),
                lineno: self.lineno(row),
                path: self.path.clone(),
            }
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::FmError;
    use std::fs;
    use std::io::Write;

    fn table_from(text: &str) -> (tempfile::TempDir, SourceTable) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        let table = SourceTable::open(path.to_str().unwrap()).unwrap();
        (dir, table)
    }

    #[test]
    fn values_by_column_name() {
        let (_dir, t) = table_from("a,b\n1, 2 \n3,4\n");
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.required_value(0, "a").unwrap(), "1");
        // Trimmed.
        assert_eq!(t.required_value(0, "b").unwrap(), "2");
        assert_eq!(t.required_value(1, "b").unwrap(), "4");
    }

    #[test]
    fn missing_column() {
        let (_dir, t) = table_from("a,b\n1,2\n");
        assert!(t.require_columns(&["a", "b"]).is_ok());
        let err = t.require_columns(&["a", "c"]).unwrap_err();
        match err {
            FmError::MissingColumn { column, .. } => assert_eq!(column, "c"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn short_row_reports_line_and_column() {
        let (_dir, t) = table_from("a,b\n1,2\n3\n");
        let err = t.required_value(1, "b").unwrap_err();
        match err {
            FmError::MissingValue { column, lineno, .. } => {
                assert_eq!(column, "b");
                assert_eq!(lineno, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_cell_is_missing() {
        let (_dir, t) = table_from("a,b\n1,\n");
        assert!(matches!(
            t.required_value(0, "b").unwrap_err(),
            FmError::MissingValue { .. }
        ));
    }
}
