use crate::domain::model::{MissingKeys, Table};
use crate::utils::error::Result;
use std::collections::BTreeSet;

/// 兩側鍵值集合的差集，值必須完全相同才算同一張發票
pub fn missing(ewb_keys: &BTreeSet<String>, gstr_keys: &BTreeSet<String>) -> MissingKeys {
    MissingKeys {
        only_in_gstr: gstr_keys.difference(ewb_keys).cloned().collect(),
        only_in_ewb: ewb_keys.difference(gstr_keys).cloned().collect(),
    }
}

pub fn missing_between(
    ewb: &Table,
    ewb_key: &str,
    gstr: &Table,
    gstr_key: &str,
) -> Result<MissingKeys> {
    let ewb_keys = ewb.distinct_values(ewb_key)?;
    let gstr_keys = gstr.distinct_values(gstr_key)?;
    Ok(missing(&ewb_keys, &gstr_keys))
}
