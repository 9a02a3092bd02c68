// Tabular view data
//
// Exported view data arrives as CSV. A `Table` keeps every cell as text;
// typed columns are inferred on demand.

use serde::Serialize;
use thiserror::Error;

use crate::decode::{decode_text, sniff_delimiter};
use crate::text::{col_to_letter, display_width};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV parse error: {0}")]
    Csv(String),
}

/// Header plus data rows. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Inferred type of a column. Order of preference: Integer, Float, Boolean, Text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// No non-empty cells
    Empty,
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Empty => "empty",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Text => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl Table {
    /// Decode exported view data. The first record is the header.
    ///
    /// Tableau always exports comma-separated data, so the delimiter is
    /// fixed; a `;` or tab inside a field stays part of the field.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        Self::parse(&decode_text(bytes), b',')
    }

    /// Parse delimited text of unknown origin, sniffing the delimiter.
    pub fn from_csv_str(content: &str) -> Result<Self, TableError> {
        Self::parse(content, sniff_delimiter(content))
    }

    fn parse(content: &str, delimiter: u8) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut records: Vec<Vec<String>> = Vec::new();
        let mut max_cols = 0usize;
        for result in rdr.records() {
            let record = result.map_err(|e| TableError::Csv(e.to_string()))?;
            let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            max_cols = max_cols.max(row.len());
            records.push(row);
        }

        if records.is_empty() {
            return Ok(Self::default());
        }

        let header = records.remove(0);
        Ok(Self::from_parts(header, records, max_cols))
    }

    /// Build from a header and rows, padding ragged rows to the widest row.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).chain(std::iter::once(header.len())).max().unwrap_or(0);
        Self::from_parts(header, rows, width)
    }

    fn from_parts(header: Vec<String>, mut rows: Vec<Vec<String>>, width: usize) -> Self {
        let columns = (0..width)
            .map(|i| {
                header
                    .get(i)
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| col_to_letter(i))
            })
            .collect();
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { columns, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// No data rows (a header alone still counts as empty).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // ── Typed columns ───────────────────────────────────────────────

    pub fn column_type(&self, col: usize) -> ColumnType {
        infer_type(self.rows.iter().filter_map(|r| r.get(col)).map(String::as_str))
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.num_cols()).map(|c| self.column_type(c)).collect()
    }

    /// Cells of `col` converted according to the inferred column type.
    pub fn typed_column(&self, col: usize) -> Vec<CellValue> {
        let ty = self.column_type(col);
        self.rows
            .iter()
            .map(|r| convert(r.get(col).map(String::as_str).unwrap_or(""), ty))
            .collect()
    }

    // ── Serialization ───────────────────────────────────────────────

    /// CSV lines, header first, without trailing newlines.
    pub fn csv_lines(&self) -> Vec<String> {
        std::iter::once(&self.columns)
            .chain(self.rows.iter())
            .map(|record| csv_line(record))
            .collect()
    }

    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        for line in self.csv_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write as CSV to any writer.
    pub fn write_csv<W: std::io::Write>(&self, w: W) -> Result<(), TableError> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(w);
        writer.write_record(&self.columns).map_err(|e| TableError::Csv(e.to_string()))?;
        for row in &self.rows {
            writer.write_record(row).map_err(|e| TableError::Csv(e.to_string()))?;
        }
        writer.flush().map_err(|e| TableError::Csv(e.to_string()))
    }

    /// Column widths in display columns, clamped to [3, 40]. Scans up to
    /// `scan_rows` data rows (0 = all); header names always count.
    pub fn col_widths(&self, scan_rows: usize) -> Vec<usize> {
        let limit = if scan_rows == 0 { self.rows.len() } else { scan_rows.min(self.rows.len()) };
        (0..self.num_cols())
            .map(|c| {
                let header_w = display_width(&self.columns[c]);
                let max_cell = self.rows[..limit]
                    .iter()
                    .map(|row| row.get(c).map(|s| display_width(s)).unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                header_w.max(max_cell).clamp(3, 40)
            })
            .collect()
    }
}

fn csv_line(record: &[String]) -> String {
    record
        .iter()
        .map(|field| {
            if field.contains(&[',', '"', '\n', '\r'][..]) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ── Inference ───────────────────────────────────────────────────────

/// Integer with optional thousands separators ("1,234").
fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| strip_thousands(s)?.parse().ok())
}

fn parse_float(s: &str) -> Option<f64> {
    let direct = s.parse::<f64>().ok().filter(|f| f.is_finite());
    direct.or_else(|| strip_thousands(s)?.parse::<f64>().ok().filter(|f| f.is_finite()))
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// "1,234,567.8" -> "1234567.8". None unless every group after the first has
/// exactly three digits.
fn strip_thousands(s: &str) -> Option<String> {
    if !s.contains(',') {
        return None;
    }
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let int_part = unsigned.split('.').next().unwrap_or("");
    let mut groups = int_part.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 || !first.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    Some(s.replace(',', ""))
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut ty = ColumnType::Empty;
    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        let cell_ty = if parse_integer(cell).is_some() {
            ColumnType::Integer
        } else if parse_float(cell).is_some() {
            ColumnType::Float
        } else if parse_bool(cell).is_some() {
            ColumnType::Boolean
        } else {
            return ColumnType::Text;
        };
        ty = match (ty, cell_ty) {
            (ColumnType::Empty, t) => t,
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Float) | (ColumnType::Float, ColumnType::Integer) => {
                ColumnType::Float
            }
            _ => return ColumnType::Text,
        };
    }
    ty
}

fn convert(cell: &str, ty: ColumnType) -> CellValue {
    let cell = cell.trim();
    if cell.is_empty() {
        return CellValue::Empty;
    }
    let parsed = match ty {
        ColumnType::Integer => parse_integer(cell).map(CellValue::Integer),
        ColumnType::Float => parse_float(cell).map(CellValue::Float),
        ColumnType::Boolean => parse_bool(cell).map(CellValue::Boolean),
        ColumnType::Text | ColumnType::Empty => None,
    };
    parsed.unwrap_or_else(|| CellValue::Text(cell.to_string()))
}
