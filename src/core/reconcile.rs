use crate::domain::model::{ComparisonPair, ComparisonReport, ComparisonRow, Table};
use crate::utils::error::{ReconError, Result};
use std::collections::HashMap;

/// Inner-join `ewb` and `gstr` on their key columns and compare the columns in
/// `ewb_columns` / `gstr_columns` position by position.
///
/// Every column is validated before any join work, so a bad selection yields a
/// single `InvalidColumn` error and never a partial result. A key repeated on
/// either side produces one output row per matching pair of rows. Values are
/// compared as exact strings.
pub fn reconcile(
    ewb: &Table,
    ewb_key: &str,
    ewb_columns: &[String],
    gstr: &Table,
    gstr_key: &str,
    gstr_columns: &[String],
) -> Result<ComparisonReport> {
    if ewb_columns.len() != gstr_columns.len() {
        return Err(ReconError::InvalidConfigValueError {
            field: "comparison_pairs".to_string(),
            value: format!("{} vs {}", ewb_columns.len(), gstr_columns.len()),
            reason: "Both sides need the same number of columns".to_string(),
        });
    }

    let ewb_key_idx = ewb.column_index(ewb_key)?;
    let ewb_idx = ewb.column_indices(ewb_columns)?;
    let gstr_key_idx = gstr.column_index(gstr_key)?;
    let gstr_idx = gstr.column_indices(gstr_columns)?;

    // GSTR-1 側依鍵值建立索引，保留原始列順序
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row_idx, row) in gstr.rows().iter().enumerate() {
        index.entry(row[gstr_key_idx].as_str()).or_default().push(row_idx);
    }

    let mut rows = Vec::new();
    for ewb_row in ewb.rows() {
        let key = ewb_row[ewb_key_idx].as_str();
        let Some(matches) = index.get(key) else {
            continue;
        };

        let ewb_values: Vec<String> = ewb_idx.iter().map(|&i| ewb_row[i].clone()).collect();
        for &gstr_row_idx in matches {
            let gstr_row = &gstr.rows()[gstr_row_idx];
            let gstr_values: Vec<String> = gstr_idx.iter().map(|&i| gstr_row[i].clone()).collect();
            let mismatches = ewb_values
                .iter()
                .zip(&gstr_values)
                .map(|(a, b)| a != b)
                .collect();

            rows.push(ComparisonRow {
                key: key.to_string(),
                ewb_values: ewb_values.clone(),
                gstr_values,
                mismatches,
            });
        }
    }

    tracing::debug!(
        "Joined {} EWB rows with {} GSTR-1 rows: {} matched rows",
        ewb.len(),
        gstr.len(),
        rows.len()
    );

    Ok(ComparisonReport {
        key_column: ewb_key.to_string(),
        pairs: ewb_columns
            .iter()
            .zip(gstr_columns)
            .map(|(a, b)| ComparisonPair::new(a, b))
            .collect(),
        rows,
        error: None,
    })
}

/// 以欄位配對呼叫 [`reconcile`]
pub fn reconcile_pairs(
    ewb: &Table,
    ewb_key: &str,
    gstr: &Table,
    gstr_key: &str,
    pairs: &[ComparisonPair],
) -> Result<ComparisonReport> {
    let (ewb_columns, gstr_columns) = ComparisonPair::split(pairs);
    reconcile(ewb, ewb_key, &ewb_columns, gstr, gstr_key, &gstr_columns)
}
