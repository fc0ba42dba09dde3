//! Named-column tables.
//!
//! [`Frame`] is the tabular currency of the pipeline: an ordered set of named
//! columns, each either numeric (NaN marks a missing value) or text (`None`
//! marks a missing value). Column kinds are inferred when reading CSV, the
//! same way a dataframe library would: a column is numeric when every
//! non-missing cell parses as a number.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Cell spellings that read as missing.
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "<NA>"];

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

// =============================================================================
// Column
// =============================================================================

/// A single column of a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values; `NaN` is missing.
    Numeric(Vec<f64>),
    /// Free text / categorical values; `None` is missing.
    Text(Vec<Option<String>>),
}

impl Column {
    /// An all-missing numeric column of `n` rows.
    pub fn missing_numeric(n: usize) -> Self {
        Column::Numeric(vec![f64::NAN; n])
    }

    /// Build a text column from string slices.
    pub fn text<S: AsRef<str>>(values: &[S]) -> Self {
        Column::Text(values.iter().map(|v| Some(v.as_ref().to_string())).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    /// Numeric values, if this is a numeric column.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    /// Value at `row` as a number.
    ///
    /// Text cells are parsed; unparseable or missing cells give `None`.
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        match self {
            Column::Numeric(v) => v.get(row).copied().filter(|x| !x.is_nan()),
            Column::Text(v) => v
                .get(row)
                .and_then(|cell| cell.as_deref())
                .and_then(|cell| cell.trim().parse::<f64>().ok())
                .filter(|x| !x.is_nan()),
        }
    }

    /// Value at `row` as text. Numbers are formatted with their shortest
    /// round-trip representation.
    pub fn get_str(&self, row: usize) -> Option<Cow<'_, str>> {
        match self {
            Column::Numeric(v) => v
                .get(row)
                .filter(|x| !x.is_nan())
                .map(|x| Cow::Owned(x.to_string())),
            Column::Text(v) => v.get(row).and_then(|c| c.as_deref()).map(Cow::Borrowed),
        }
    }

    /// Is the cell at `row` missing?
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Numeric(v) => v.get(row).is_none_or(|x| x.is_nan()),
            Column::Text(v) => v.get(row).is_none_or(|c| c.is_none()),
        }
    }

    /// Gather rows by index.
    pub fn take(&self, rows: &[usize]) -> Self {
        match self {
            Column::Numeric(v) => Column::Numeric(rows.iter().map(|&r| v[r]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Infer a column from raw CSV cells.
    fn from_cells(cells: Vec<String>) -> Self {
        let all_numeric = cells
            .iter()
            .filter(|c| !is_missing_token(c))
            .all(|c| c.trim().parse::<f64>().is_ok());

        if all_numeric {
            Column::Numeric(
                cells
                    .iter()
                    .map(|c| {
                        if is_missing_token(c) {
                            f64::NAN
                        } else {
                            c.trim().parse::<f64>().unwrap_or(f64::NAN)
                        }
                    })
                    .collect(),
            )
        } else {
            Column::Text(
                cells
                    .into_iter()
                    .map(|c| if is_missing_token(&c) { None } else { Some(c) })
                    .collect(),
            )
        }
    }

    fn cell_string(&self, row: usize) -> String {
        self.get_str(row).map(Cow::into_owned).unwrap_or_default()
    }
}

// =============================================================================
// Frame
// =============================================================================

/// An ordered table of named, equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    /// Build a frame from `(name, column)` pairs.
    ///
    /// # Errors
    ///
    /// [`Error::RaggedColumn`] when columns have different lengths.
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Column)>,
    ) -> Result<Self> {
        let mut frame = Frame::default();
        for (name, column) in columns {
            frame.set_column(name, column)?;
        }
        Ok(frame)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.position(name).map(move |i| &mut self.columns[i])
    }

    /// Iterate `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Insert or replace a column. New columns are appended.
    ///
    /// # Errors
    ///
    /// [`Error::RaggedColumn`] when the length disagrees with existing columns.
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(Error::RaggedColumn {
                column: name,
                expected: self.n_rows,
                got: column.len(),
            });
        }
        self.n_rows = column.len();
        match self.position(&name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Insert a column at `index`, or replace an existing column of that name
    /// in place.
    pub fn insert_column(
        &mut self,
        index: usize,
        name: impl Into<String>,
        column: Column,
    ) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return self.set_column(name, column);
        }
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(Error::RaggedColumn {
                column: name,
                expected: self.n_rows,
                got: column.len(),
            });
        }
        self.n_rows = column.len();
        let index = index.min(self.columns.len());
        self.names.insert(index, name);
        self.columns.insert(index, column);
        Ok(())
    }

    /// Rename columns in place. `f` returns the new name, or `None` to keep
    /// the current one. Order and data are untouched.
    pub fn rename_with(&mut self, mut f: impl FnMut(&str) -> Option<String>) {
        for name in &mut self.names {
            if let Some(new_name) = f(name) {
                *name = new_name;
            }
        }
    }

    /// Fail unless every column in `required` is present.
    ///
    /// # Errors
    ///
    /// [`Error::MissingColumns`] listing the absent columns and the columns
    /// actually present.
    pub fn require_columns<S: AsRef<str>>(&self, table: &str, required: &[S]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| !self.contains(c))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumns {
                table: table.to_string(),
                missing,
                found: self.names.clone(),
            })
        }
    }

    /// Project onto `columns` in the given order.
    pub fn select<S: AsRef<str>>(&self, table: &str, columns: &[S]) -> Result<Frame> {
        self.require_columns(table, columns)?;
        let mut out = Frame::default();
        for name in columns {
            let name = name.as_ref();
            if let Some(column) = self.column(name) {
                out.set_column(name, column.clone())?;
            }
        }
        out.n_rows = self.n_rows;
        Ok(out)
    }

    /// Gather rows by index, keeping every column.
    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        }
    }

    /// Drop rows whose value in `column` was already seen, keeping the first
    /// occurrence. Missing keys are never treated as duplicates. A frame
    /// without `column` is returned unchanged.
    pub fn drop_duplicates(&self, column: &str) -> Frame {
        let Some(col) = self.column(column) else {
            return self.clone();
        };
        let mut seen = HashSet::new();
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&row| match col.get_str(row) {
                Some(key) => seen.insert(key.into_owned()),
                None => true,
            })
            .collect();
        if keep.len() == self.n_rows {
            return self.clone();
        }
        self.take_rows(&keep)
    }

    // =========================================================================
    // CSV
    // =========================================================================

    /// Read a CSV file with a header row.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Frame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let frame = Self::from_csv_reader(file)?;
        tracing::debug!(
            path = %path.display(),
            rows = frame.n_rows(),
            cols = frame.n_cols(),
            "read csv"
        );
        Ok(frame)
    }

    /// Read CSV from any reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Frame> {
        let mut rdr = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (i, cell) in record.iter().enumerate() {
                cells[i].push(cell.to_string());
            }
        }

        let mut frame = Frame::default();
        for (name, column_cells) in headers.into_iter().zip(cells) {
            frame.set_column(name, Column::from_cells(column_cells))?;
        }
        Ok(frame)
    }

    /// Write the frame as CSV with a header row.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        self.to_csv_writer(file)?;
        tracing::debug!(path = %path.display(), rows = self.n_rows, "wrote csv");
        Ok(())
    }

    /// Write CSV to any writer.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.names)?;
        for row in 0..self.n_rows {
            wtr.write_record(self.columns.iter().map(|c| c.cell_string(row)))?;
        }
        wtr.flush().map_err(|e| Error::io("<csv writer>", e))?;
        Ok(())
    }

    /// Render the frame as CSV bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_csv_writer(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,tipo,torque,FDF
1,L,40.5,0
2,M,,1
3,H,-2,sim
";

    #[test]
    fn csv_infers_column_kinds() {
        let frame = Frame::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(frame.n_rows(), 3);
        assert_eq!(frame.column_names(), ["id", "tipo", "torque", "FDF"]);
        assert!(frame.column("id").unwrap().is_numeric());
        assert!(!frame.column("tipo").unwrap().is_numeric());
        assert!(frame.column("torque").unwrap().is_numeric());
        // One unparseable cell turns the whole column into text.
        assert!(!frame.column("FDF").unwrap().is_numeric());
        assert!(frame.column("torque").unwrap().is_missing(1));
    }

    #[test]
    fn require_columns_reports_missing_and_found() {
        let frame = Frame::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        let err = frame.require_columns("train", &["id", "FA", "FP"]).unwrap_err();
        match err {
            Error::MissingColumns { table, missing, found } => {
                assert_eq!(table, "train");
                assert_eq!(missing, ["FA", "FP"]);
                assert_eq!(found, ["id", "tipo", "torque", "FDF"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Frame::from_columns([
            ("a", Column::Numeric(vec![1.0, 2.0])),
            ("b", Column::Numeric(vec![1.0])),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::RaggedColumn { expected: 2, got: 1, .. }));
    }

    #[test]
    fn drop_duplicates_keeps_first() {
        let frame = Frame::from_columns([
            ("id", Column::Numeric(vec![1.0, 2.0, 1.0, 3.0])),
            ("x", Column::Numeric(vec![10.0, 20.0, 30.0, 40.0])),
        ])
        .unwrap();
        let dedup = frame.drop_duplicates("id");
        assert_eq!(dedup.n_rows(), 3);
        assert_eq!(dedup.column("x").unwrap().as_numeric().unwrap(), [10.0, 20.0, 40.0]);
    }

    #[test]
    fn csv_write_round_trips_missing_cells() {
        let frame = Frame::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        let bytes = frame.to_csv_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("id,tipo,torque,FDF\n1,L,40.5,0\n2,M,,1\n"));
    }

    #[test]
    fn insert_column_places_at_index() {
        let mut frame = Frame::from_columns([("b", Column::Numeric(vec![1.0]))]).unwrap();
        frame.insert_column(0, "a", Column::text(&["x"])).unwrap();
        assert_eq!(frame.column_names(), ["a", "b"]);
    }
}
