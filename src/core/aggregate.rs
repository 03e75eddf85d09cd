use crate::domain::model::Table;
use crate::utils::error::{ReconError, Result};
use std::collections::HashMap;

/// 每個非鍵欄位的彙總方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// 以數值加總，無法解析的值視為 0
    Sum,
    /// 取該組第一列的值
    First,
}

impl AggregateFn {
    pub fn for_column(column: &str, numeric_columns: &[String]) -> Self {
        if numeric_columns.iter().any(|c| c == column) {
            AggregateFn::Sum
        } else {
            AggregateFn::First
        }
    }
}

/// Parse a cell for summation. Empty, non-numeric and non-finite cells yield `None`
/// and contribute zero to the sum.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 整數值不輸出小數點，其餘去掉浮點累加誤差
pub fn format_number(value: f64) -> String {
    // 超過 f64 精確整數範圍時不做捨入
    let rounded = if (value * 1e9).abs() < 9e15 {
        (value * 1e9).round() / 1e9
    } else {
        value
    };
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

struct Group {
    first_row: usize,
    sums: Vec<f64>,
}

/// Collapse `table` to one row per distinct value of `key_column`.
///
/// Columns in `numeric_columns` are summed, every other column keeps the value of
/// the first row seen for that key. Output rows follow the order in which each key
/// first appears, and the key column is moved to the front.
pub fn aggregate(table: &Table, key_column: &str, numeric_columns: &[String]) -> Result<Table> {
    let key_idx = table.column_index(key_column)?;
    table.column_indices(numeric_columns)?;
    if numeric_columns.iter().any(|c| c == key_column) {
        return Err(ReconError::InvalidConfigValueError {
            field: "numeric_columns".to_string(),
            value: key_column.to_string(),
            reason: "The key column cannot also be summed".to_string(),
        });
    }

    let plan: Vec<(usize, AggregateFn)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != key_idx)
        .map(|(idx, name)| (idx, AggregateFn::for_column(name, numeric_columns)))
        .collect();

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut coerced = 0usize;

    for (row_idx, row) in table.rows().iter().enumerate() {
        let key = row[key_idx].as_str();
        let group_idx = *positions.entry(key).or_insert_with(|| {
            groups.push(Group {
                first_row: row_idx,
                sums: vec![0.0; plan.len()],
            });
            groups.len() - 1
        });

        let group = &mut groups[group_idx];
        for (slot, (col_idx, func)) in plan.iter().enumerate() {
            if *func != AggregateFn::Sum {
                continue;
            }
            let raw = &row[*col_idx];
            match parse_numeric(raw) {
                Some(value) => group.sums[slot] += value,
                None if raw.trim().is_empty() => {}
                None => {
                    coerced += 1;
                    tracing::warn!(
                        "⚠️ {}: non-numeric value '{}' in column '{}' (key '{}') counted as 0",
                        table.name(),
                        raw,
                        table.columns()[*col_idx],
                        key
                    );
                }
            }
        }
    }

    let mut columns = vec![key_column.to_string()];
    columns.extend(plan.iter().map(|(idx, _)| table.columns()[*idx].clone()));

    let rows = groups
        .iter()
        .map(|group| {
            let first = &table.rows()[group.first_row];
            let mut out = Vec::with_capacity(columns.len());
            out.push(first[key_idx].clone());
            for (slot, (col_idx, func)) in plan.iter().enumerate() {
                match func {
                    AggregateFn::Sum => out.push(format_number(group.sums[slot])),
                    AggregateFn::First => out.push(first[*col_idx].clone()),
                }
            }
            out
        })
        .collect();

    tracing::debug!(
        "{}: aggregated {} rows into {} groups by '{}' ({} coerced cells)",
        table.name(),
        table.len(),
        groups.len(),
        key_column,
        coerced
    );

    Table::new(table.name(), columns, rows)
}
