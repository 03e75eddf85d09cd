use crate::domain::model::Table;
use crate::utils::error::{ReconError, Result};
use calamine::{Data, Range, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

const SYNTHETIC_PREFIX: &str = "Unnamed";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xls,
    Xlsx,
    Csv,
}

impl SheetFormat {
    /// 依副檔名判斷格式（不分大小寫）
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("xls") => Ok(SheetFormat::Xls),
            Some("xlsx") => Ok(SheetFormat::Xlsx),
            Some("csv") => Ok(SheetFormat::Csv),
            _ => Err(ReconError::UnsupportedFormat {
                path: path.to_string(),
            }),
        }
    }
}

/// Parse raw file bytes into a [`Table`].
///
/// The first row is the header. Header names are trimmed, blank headers and
/// headers starting with `Unnamed` are dropped, and repeated names get a `.1`,
/// `.2`, ... suffix. Every cell is returned as text; fully blank rows are skipped.
pub fn load_table(bytes: &[u8], format: SheetFormat, source_name: &str) -> Result<Table> {
    let (headers, rows) = match format {
        SheetFormat::Xls => range_to_rows(read_first_sheet::<Xls<_>>(bytes, source_name)?),
        SheetFormat::Xlsx => range_to_rows(read_first_sheet::<Xlsx<_>>(bytes, source_name)?),
        SheetFormat::Csv => read_csv(bytes, source_name)?,
    };

    let table = build_table(source_name, headers, rows)?;
    tracing::debug!(
        "{}: loaded {} rows, columns {:?}",
        source_name,
        table.len(),
        table.columns()
    );
    Ok(table)
}

fn read_first_sheet<'a, R>(bytes: &'a [u8], source_name: &str) -> Result<Range<Data>>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: std::fmt::Display,
{
    let mut workbook = R::new(Cursor::new(bytes)).map_err(|e| ReconError::load(source_name, e))?;

    let sheet_names = workbook.sheet_names();
    let first = sheet_names
        .first()
        .ok_or_else(|| ReconError::load(source_name, "workbook contains no sheets"))?;

    workbook
        .worksheet_range(first)
        .map_err(|e| ReconError::load(source_name, format!("sheet '{}': {}", first, e)))
}

fn range_to_rows(range: Range<Data>) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    (headers, rows.collect())
}

/// 儲存格轉為文字，整數值的浮點數不帶小數
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if !dt.is_duration() => value.format(DATETIME_FORMAT).to_string(),
            _ => format!("{}", dt.as_f64()),
        },
        Data::DateTimeIso(s) => iso_datetime_text(s),
        Data::DurationIso(s) => s.clone(),
    }
}

/// ISO 日期統一成與數值日期相同的格式，無法解析時保留原字串
fn iso_datetime_text(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|value| value.format(DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn read_csv(bytes: &[u8], source_name: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ReconError::load(source_name, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::load(source_name, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((headers, rows))
}

fn build_table(
    source_name: &str,
    raw_headers: Vec<String>,
    raw_rows: Vec<Vec<String>>,
) -> Result<Table> {
    if raw_headers.is_empty() {
        return Err(ReconError::load(source_name, "no header row found"));
    }

    let mut keep: Vec<usize> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut used: HashSet<String> = HashSet::new();

    for (idx, raw) in raw_headers.iter().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(SYNTHETIC_PREFIX) {
            tracing::debug!("{}: dropping unnamed column at position {}", source_name, idx);
            continue;
        }

        let mut name = trimmed.to_string();
        let mut suffix = 1;
        while used.contains(&name) {
            name = format!("{}.{}", trimmed, suffix);
            suffix += 1;
        }
        used.insert(name.clone());
        keep.push(idx);
        names.push(name);
    }

    let rows = raw_rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            keep.iter()
                .map(|&idx| row.get(idx).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    Table::new(source_name, names, rows)
}
