//! In-memory tabular source: named columns and ordered rows.
//!
//! The Catalogue Builder only needs column names and cell lookups by name,
//! so any reader can feed it by constructing a [`Table`]. [`load_table`]
//! reads delimited text with the `csv` crate and workbooks (first sheet)
//! with `calamine`.

use crate::error::Sheet2ImgError;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

/// A table with named columns. Absent cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Source name, usually the file stem.
    pub name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

/// Borrowed key-value view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Value of the first column named exactly `column`, if present and non-absent.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.cells.get(idx)?.as_deref()
    }

    /// Value at a column position.
    pub fn get_index(&self, idx: usize) -> Option<&'a str> {
        self.cells.get(idx)?.as_deref()
    }
}

impl Table {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row given as `(column, value)` pairs. Unknown columns are
    /// ignored, missing ones stay absent.
    pub fn push_row<I, K, V>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = vec![None; self.columns.len()];
        for (k, v) in cells {
            if let Some(idx) = self.columns.iter().position(|c| c == k.as_ref()) {
                row[idx] = Some(v.into());
            }
        }
        self.rows.push(row);
    }

    /// Append a row positionally; short rows are padded with absent cells.
    pub fn push_record(&mut self, mut cells: Vec<Option<String>>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }
}

/// Read a `.csv`/`.tsv` file or the first sheet of an `.xlsx`/`.xlsm`/`.xls`
/// workbook. The first row is the header; empty cells become absent values.
pub fn load_table(path: &Path) -> Result<Table, Sheet2ImgError> {
    if !path.exists() {
        return Err(Sheet2ImgError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let table = match extension.as_str() {
        "csv" => load_delimited(path, b',')?,
        "tsv" | "tab" => load_delimited(path, b'\t')?,
        "xlsx" | "xlsm" | "xls" => load_workbook(path)?,
        _ => {
            return Err(Sheet2ImgError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    debug!(
        "Loaded table '{}': {} columns, {} rows",
        table.name,
        table.columns.len(),
        table.len()
    );
    Ok(table)
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<Table, Sheet2ImgError> {
    let unreadable = |e: csv::Error| Sheet2ImgError::SourceUnreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(unreadable)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(unreadable)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(source_name(path), headers);
    for record in reader.records() {
        let record = record.map_err(unreadable)?;
        let cells = record
            .iter()
            .map(|cell| {
                let cell = cell.trim();
                (!cell.is_empty()).then(|| cell.to_string())
            })
            .collect();
        table.push_record(cells);
    }
    Ok(table)
}

fn load_workbook(path: &Path) -> Result<Table, Sheet2ImgError> {
    let unreadable = |detail: String| Sheet2ImgError::SourceUnreadable {
        path: path.to_path_buf(),
        detail,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| unreadable("workbook has no sheets".to_string()))?
        .map_err(|e| unreadable(e.to_string()))?;

    Ok(table_from_rows(source_name(path), range.rows()))
}

/// Build a table from sheet rows: the first row names the columns, blank
/// header cells become `Unnamed: <index>`.
fn table_from_rows<'a, I>(name: String, mut rows: I) -> Table
where
    I: Iterator<Item = &'a [Data]>,
{
    let headers: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(idx, cell)| cell_text(cell).unwrap_or_else(|| format!("Unnamed: {idx}")))
        .collect();

    let mut table = Table::new(name, headers);
    for row in rows {
        table.push_record(row.iter().map(cell_text).collect());
    }
    table
}

/// Cell as trimmed text. Integral floats lose their `.0` so numeric
/// article ids read as `1703127252`, not `1703127252.0`.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// File stem used as the table / catalogue name.
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn row_lookup_by_name() {
        let mut t = Table::new("t", ["ARTIKEL", "IMAGE_1"]);
        t.push_row([("ARTIKEL", "A1")]);
        let row = t.rows().next().unwrap();
        assert_eq!(row.get("ARTIKEL"), Some("A1"));
        assert_eq!(row.get("IMAGE_1"), None);
        assert_eq!(row.get("artikel"), None);
    }

    #[test]
    fn short_records_are_padded() {
        let mut t = Table::new("t", ["a", "b", "c"]);
        t.push_record(vec![Some("1".into())]);
        let row = t.rows().next().unwrap();
        assert_eq!(row.get_index(0), Some("1"));
        assert_eq!(row.get_index(2), None);
    }

    #[test]
    fn load_csv_with_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LINK IMAGE 1.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ARTIKEL,IMAGE_1,IMAGE_2").unwrap();
        writeln!(f, "A1, http://x/1.jpg ,").unwrap();
        writeln!(f, "A2").unwrap();
        drop(f);

        let t = load_table(&path).unwrap();
        assert_eq!(t.name, "LINK IMAGE 1");
        assert_eq!(t.columns(), ["ARTIKEL", "IMAGE_1", "IMAGE_2"]);
        assert_eq!(t.len(), 2);
        let rows: Vec<_> = t.rows().collect();
        assert_eq!(rows[0].get("IMAGE_1"), Some("http://x/1.jpg"));
        assert_eq!(rows[0].get("IMAGE_2"), None);
        assert_eq!(rows[1].get("IMAGE_1"), None);
    }

    #[test]
    fn load_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.tsv");
        std::fs::write(&path, "REF\tLINK\nR1\thttps://x/a.png\n").unwrap();
        let t = load_table(&path).unwrap();
        assert_eq!(t.rows().next().unwrap().get("LINK"), Some("https://x/a.png"));
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = load_table(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, Sheet2ImgError::SourceNotFound { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.ods");
        std::fs::write(&path, b"PK").unwrap();
        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, Sheet2ImgError::UnsupportedFormat { .. }));
    }

    #[test]
    fn corrupt_workbook_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LINK IMAGE 1.xlsx");
        std::fs::write(&path, b"PK not really a zip").unwrap();
        let err = load_table(&path).unwrap_err();
        assert!(
            matches!(err, Sheet2ImgError::SourceUnreadable { .. }),
            "got: {err}"
        );
    }

    #[test]
    fn numeric_cells_read_like_ids() {
        assert_eq!(cell_text(&Data::Float(1703127252.0)).as_deref(), Some("1703127252"));
        assert_eq!(cell_text(&Data::Float(12.5)).as_deref(), Some("12.5"));
        assert_eq!(cell_text(&Data::Int(42)).as_deref(), Some("42"));
        assert_eq!(cell_text(&Data::String("  ".into())), None);
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn sheet_rows_become_a_table() {
        let rows = vec![
            vec![
                Data::String("ARTIKEL".into()),
                Data::String("IMAGE_1".into()),
                Data::Empty,
            ],
            vec![
                Data::Float(1703127252.0),
                Data::String(" http://x/1.jpg ".into()),
            ],
            vec![Data::String("A2".into()), Data::Empty, Data::Int(7)],
        ];
        let t = table_from_rows("LINK IMAGE 1".into(), rows.iter().map(Vec::as_slice));

        assert_eq!(t.columns(), ["ARTIKEL", "IMAGE_1", "Unnamed: 2"]);
        let rows: Vec<_> = t.rows().collect();
        assert_eq!(rows[0].get("ARTIKEL"), Some("1703127252"));
        assert_eq!(rows[0].get("IMAGE_1"), Some("http://x/1.jpg"));
        assert_eq!(rows[0].get("Unnamed: 2"), None);
        assert_eq!(rows[1].get("IMAGE_1"), None);
        assert_eq!(rows[1].get("Unnamed: 2"), Some("7"));
    }
}
