use crate::utils::error::{ReconError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

pub const EWB_TABLE: &str = "EWB";
pub const GSTR_TABLE: &str = "GSTR-1";

/// 已解析的表格：欄名唯一且已去除前後空白，所有儲存格皆為文字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// 建立表格。列長度會補齊或截斷到欄數。
    pub fn new(name: &str, columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ReconError::load(
                    name,
                    format!("duplicate column name '{}'", column),
                ));
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    /// 測試與示範用的便利建構子
    pub fn from_rows(name: &str, columns: &[&str], rows: &[&[&str]]) -> Result<Self> {
        Self::new(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 依欄名查找位置，不存在時回傳 `InvalidColumn`
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| ReconError::invalid_column(&self.name, column))
    }

    /// 一次驗證多個欄名，回報第一個不存在的欄位
    pub fn column_indices<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|c| self.column_index(c.as_ref()))
            .collect()
    }

    /// 某欄的所有相異值（重複值合併）
    pub fn distinct_values(&self, column: &str) -> Result<BTreeSet<String>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|row| row[idx].clone()).collect())
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// 一組比對欄位：EWB 一欄對 GSTR-1 一欄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair {
    #[serde(rename = "ewb")]
    pub ewb_column: String,
    #[serde(rename = "gstr")]
    pub gstr_column: String,
}

impl ComparisonPair {
    pub fn new(ewb_column: &str, gstr_column: &str) -> Self {
        Self {
            ewb_column: ewb_column.to_string(),
            gstr_column: gstr_column.to_string(),
        }
    }

    /// 拆成兩側的欄名序列（位置對應）
    pub fn split(pairs: &[ComparisonPair]) -> (Vec<String>, Vec<String>) {
        pairs
            .iter()
            .map(|p| (p.ewb_column.clone(), p.gstr_column.clone()))
            .unzip()
    }

    pub fn ewb_header(&self) -> String {
        format!("{}_EWB", self.ewb_column)
    }

    pub fn gstr_header(&self) -> String {
        format!("{}_GSTR", self.gstr_column)
    }

    pub fn mismatch_header(&self) -> String {
        format!("Mismatch_{}", self.ewb_column)
    }
}

/// 解析 `EWB欄=GSTR欄`，以第一個 `=` 分隔
impl FromStr for ComparisonPair {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (ewb, gstr) = s
            .split_once('=')
            .ok_or_else(|| format!("expected EWB_COLUMN=GSTR_COLUMN, got '{}'", s))?;
        let (ewb, gstr) = (ewb.trim(), gstr.trim());
        if ewb.is_empty() || gstr.is_empty() {
            return Err(format!("both column names are required in '{}'", s));
        }
        Ok(Self::new(ewb, gstr))
    }
}

impl fmt::Display for ComparisonPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.ewb_column, self.gstr_column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub key: String,
    pub ewb_values: Vec<String>,
    pub gstr_values: Vec<String>,
    pub mismatches: Vec<bool>,
}

impl ComparisonRow {
    pub fn has_mismatch(&self) -> bool {
        self.mismatches.iter().any(|m| *m)
    }
}

/// 一次比對的結果：每個配對到的發票列一筆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub key_column: String,
    pub pairs: Vec<ComparisonPair>,
    pub rows: Vec<ComparisonRow>,
    /// 比對欄位不存在時的錯誤訊息，此時 `rows` 為空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonReport {
    /// 比對中止時的結果，保留欄位配對以便輸出表頭
    pub fn failed(key_column: &str, pairs: &[ComparisonPair], error: &ReconError) -> Self {
        Self {
            key_column: key_column.to_string(),
            pairs: pairs.to_vec(),
            rows: Vec::new(),
            error: Some(error.user_friendly_message()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![self.key_column.clone()];
        headers.extend(self.pairs.iter().map(ComparisonPair::ewb_header));
        headers.extend(self.pairs.iter().map(ComparisonPair::gstr_header));
        headers.extend(self.pairs.iter().map(ComparisonPair::mismatch_header));
        headers
    }

    /// 依 `headers()` 的順序展開一列
    pub fn flatten_row(row: &ComparisonRow) -> Vec<String> {
        let mut cells = vec![row.key.clone()];
        cells.extend(row.ewb_values.iter().cloned());
        cells.extend(row.gstr_values.iter().cloned());
        cells.extend(row.mismatches.iter().map(|m| m.to_string()));
        cells
    }

    pub fn mismatch_counts(&self) -> Vec<usize> {
        (0..self.pairs.len())
            .map(|i| self.rows.iter().filter(|r| r.mismatches[i]).count())
            .collect()
    }

    pub fn mismatched_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.has_mismatch()).count()
    }
}

/// 只出現在單一側的發票號碼
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingKeys {
    /// 在 GSTR-1 但不在 EWB
    pub only_in_gstr: BTreeSet<String>,
    /// 在 EWB 但不在 GSTR-1
    pub only_in_ewb: BTreeSet<String>,
}

impl MissingKeys {
    pub fn is_empty(&self) -> bool {
        self.only_in_gstr.is_empty() && self.only_in_ewb.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub ewb: Table,
    pub gstr: Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconReport {
    pub generated_at: DateTime<Utc>,
    pub ewb_rows: usize,
    pub gstr_rows: usize,
    pub gstr_groups: usize,
    pub comparison: ComparisonReport,
    pub missing: MissingKeys,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOutput {
    pub rendered: String,
    pub bundle_path: Option<String>,
    /// 比對中止時的訊息；缺漏清單仍在 `rendered` 中
    pub comparison_error: Option<String>,
}
