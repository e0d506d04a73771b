use std::fmt;
use std::path::PathBuf;

use calamine::{Data, Reader};

use crate::{
    core::Rgb8,
    error::{BarlapseError, BarlapseResult},
};

/// Where and how to read the tabular source.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DataSourceConfig {
    pub path: PathBuf,
    /// Sheet name; ignored for CSV sources.
    pub sheet: String,
    /// 0-indexed row holding the column headers (spreadsheet sources only).
    pub header_row: usize,
    pub columns: Columns,
}

/// Column selection, both modes seen in practice: a narrow positional
/// read ("A:B", name then value) and a wider table addressed by header
/// names, optionally carrying a precomputed display color and a year tag.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Columns {
    Positional { range: String },
    Named {
        name: String,
        value: String,
        color: Option<String>,
        year: Option<String>,
    },
}

impl Columns {
    pub fn validate(&self) -> BarlapseResult<()> {
        match self {
            Columns::Positional { range } => parse_positional_range(range).map(|_| ()),
            Columns::Named { name, value, .. } => {
                if name.is_empty() || value.is_empty() {
                    return Err(BarlapseError::config(
                        "named column selection requires non-empty name and value columns",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Parses a spreadsheet-style column span like "A:B" into a pair of
/// 0-based indices (name column, value column).
fn parse_positional_range(range: &str) -> BarlapseResult<(usize, usize)> {
    let err = || {
        BarlapseError::config(format!(
            "invalid column range '{range}': expected two columns like 'A:B'"
        ))
    };

    let (start, end) = range.split_once(':').ok_or_else(err)?;
    let start = column_letter_to_index(start).ok_or_else(err)?;
    let end = column_letter_to_index(end).ok_or_else(err)?;
    if end != start + 1 {
        return Err(BarlapseError::config(format!(
            "column range '{range}' must span exactly two adjacent columns (name, value)"
        )));
    }
    Ok((start, end))
}

fn column_letter_to_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    let mut idx = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        idx = idx * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(idx - 1)
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ConsumptionRecord {
    pub name: String,
    pub value: f64, // non-negative, checked at construction
    pub color: Option<Rgb8>,
    pub year: Option<i32>,
}

impl ConsumptionRecord {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            color: None,
            year: None,
        }
    }
}

/// Records sorted ascending by value. The sort is stable, so ties keep
/// their input order. Never mutated after construction.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Dataset {
    records: Vec<ConsumptionRecord>,
}

impl Dataset {
    pub fn from_records(mut records: Vec<ConsumptionRecord>) -> BarlapseResult<Self> {
        for rec in &records {
            if !rec.value.is_finite() || rec.value < 0.0 {
                return Err(BarlapseError::load(format!(
                    "record '{}' has invalid value {}: values must be finite and non-negative",
                    rec.name, rec.value
                )));
            }
        }

        // Stable sort; NaN was rejected above so the comparison is total.
        records.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ConsumptionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn max_value(&self) -> f64 {
        self.records.last().map(|r| r.value).unwrap_or(0.0)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .records
            .iter()
            .map(|r| r.name.chars().count())
            .max()
            .unwrap_or(4)
            .max(4);
        writeln!(f, "{:<name_width$}  {:>14}", "name", "value")?;
        for rec in &self.records {
            write!(f, "{:<name_width$}  {:>14.1}", rec.name, rec.value)?;
            if let Some(year) = rec.year {
                write!(f, "  {year}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Reads and sorts the dataset described by `cfg`. Dispatches on the file
/// extension: `.xlsx`/`.xlsm`/`.xls`/`.ods` via calamine, `.csv` via csv.
pub fn load_dataset(cfg: &DataSourceConfig) -> BarlapseResult<Dataset> {
    cfg.columns.validate()?;

    let ext = cfg
        .path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(cfg),
        "csv" => load_csv(cfg),
        other => Err(BarlapseError::load(format!(
            "unsupported data file extension '{other}' for '{}'",
            cfg.path.display()
        ))),
    }
}

/// Resolved 0-based column indices for one source.
struct ColumnIndices {
    name: usize,
    value: usize,
    color: Option<usize>,
    year: Option<usize>,
}

fn resolve_columns(columns: &Columns, headers: &[String]) -> BarlapseResult<ColumnIndices> {
    let find = |wanted: &str| {
        headers
            .iter()
            .position(|h| h == wanted)
            .ok_or_else(|| BarlapseError::load(format!("column '{wanted}' not found in header")))
    };

    match columns {
        Columns::Positional { range } => {
            let (name, value) = parse_positional_range(range)?;
            if value >= headers.len() {
                return Err(BarlapseError::load(format!(
                    "column range '{range}' is outside the table (found {} columns)",
                    headers.len()
                )));
            }
            Ok(ColumnIndices {
                name,
                value,
                color: None,
                year: None,
            })
        }
        Columns::Named {
            name,
            value,
            color,
            year,
        } => Ok(ColumnIndices {
            name: find(name)?,
            value: find(value)?,
            color: color.as_deref().map(find).transpose()?,
            year: year.as_deref().map(find).transpose()?,
        }),
    }
}

fn load_spreadsheet(cfg: &DataSourceConfig) -> BarlapseResult<Dataset> {
    let mut workbook = calamine::open_workbook_auto(&cfg.path).map_err(|e| {
        BarlapseError::load(format!(
            "failed to open spreadsheet '{}': {e}",
            cfg.path.display()
        ))
    })?;

    let sheet = workbook.worksheet_range(&cfg.sheet).map_err(|e| {
        BarlapseError::load(format!(
            "sheet '{}' not found in '{}': {e}",
            cfg.sheet,
            cfg.path.display()
        ))
    })?;

    let mut rows = sheet.rows().skip(cfg.header_row);
    let header_row = rows
        .next()
        .ok_or_else(|| BarlapseError::load(format!("sheet '{}' has no header row", cfg.sheet)))?;
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
    let idx = resolve_columns(&cfg.columns, &headers)?;

    let mut records = Vec::new();
    for row in rows {
        let name = row.get(idx.name).map(cell_to_string).unwrap_or_default();
        if name.is_empty() {
            // Trailing blank spreadsheet rows.
            continue;
        }

        let value_cell = row.get(idx.value);
        let value = value_cell.and_then(cell_to_f64).ok_or_else(|| {
            BarlapseError::load(format!(
                "row '{name}': value cell is not numeric ({value_cell:?})"
            ))
        })?;

        let mut rec = ConsumptionRecord::new(name, value);
        if let Some(color_idx) = idx.color
            && let Some(cell) = row.get(color_idx)
        {
            let hex = cell_to_string(cell);
            if !hex.is_empty() {
                rec.color = Some(Rgb8::from_hex(&hex)?);
            }
        }
        if let Some(year_idx) = idx.year
            && let Some(cell) = row.get(year_idx)
        {
            rec.year = cell_to_year(cell);
        }
        records.push(rec);
    }

    Dataset::from_records(records)
}

fn load_csv(cfg: &DataSourceConfig) -> BarlapseResult<Dataset> {
    if cfg.header_row != 0 {
        return Err(BarlapseError::load(
            "csv sources require the header on the first row",
        ));
    }

    let mut reader = csv::Reader::from_path(&cfg.path).map_err(|e| {
        BarlapseError::load(format!("failed to open csv '{}': {e}", cfg.path.display()))
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| BarlapseError::load(format!("failed to read csv header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let idx = resolve_columns(&cfg.columns, &headers)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| BarlapseError::load(format!("failed to read csv row: {e}")))?;

        let name = row.get(idx.name).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }

        let raw = row.get(idx.value).unwrap_or("").trim();
        let value: f64 = raw.parse().map_err(|_| {
            BarlapseError::load(format!("row '{name}': value '{raw}' is not numeric"))
        })?;

        let mut rec = ConsumptionRecord::new(name, value);
        if let Some(color_idx) = idx.color {
            let hex = row.get(color_idx).unwrap_or("").trim();
            if !hex.is_empty() {
                rec.color = Some(Rgb8::from_hex(hex)?);
            }
        }
        if let Some(year_idx) = idx.year {
            rec.year = row.get(year_idx).and_then(|y| y.trim().parse().ok());
        }
        records.push(rec);
    }

    Dataset::from_records(records)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Spreadsheets store years as floats; out-of-range values are dropped
/// rather than truncated.
fn cell_to_year(cell: &Data) -> Option<i32> {
    let y = cell_to_f64(cell)?.round();
    if y >= f64::from(i32::MIN) && y <= f64::from(i32::MAX) {
        Some(y as i32)
    } else {
        None
    }
}
