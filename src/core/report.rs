use crate::domain::model::{ComparisonReport, MissingKeys, ReconReport, Table};
use crate::utils::error::{ReconError, Result};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const BUNDLE_FILENAME: &str = "recon_report.zip";
const BLANK_KEY: &str = "(blank)";

/// 對齊欄寬輸出純文字表格
fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

pub fn render_preview(table: &Table, n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {} File Columns", table.name());
    let _ = writeln!(out, "{}", table.columns().join(", "));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "### Sample Data from {} ({} of {} rows)",
        table.name(),
        n.min(table.len()),
        table.len()
    );
    out.push_str(&render_grid(table.columns(), table.head(n).rows()));
    out
}

pub fn render_comparison(comparison: &ComparisonReport) -> String {
    let mut out = String::from("### Differences Report\n");
    if let Some(error) = &comparison.error {
        let _ = writeln!(out, "❌ {}", error);
        return out;
    }
    if comparison.is_empty() {
        out.push_str("No matching invoices found between EWB and GSTR-1.\n");
        return out;
    }

    let rows: Vec<Vec<String>> = comparison
        .rows
        .iter()
        .map(ComparisonReport::flatten_row)
        .collect();
    out.push_str(&render_grid(&comparison.headers(), &rows));

    let _ = writeln!(
        out,
        "\n{} matched rows, {} with at least one mismatch",
        comparison.rows.len(),
        comparison.mismatched_rows()
    );
    for (pair, count) in comparison.pairs.iter().zip(comparison.mismatch_counts()) {
        let _ = writeln!(out, "  {}: {} mismatches", pair, count);
    }
    out
}

/// 空白發票號碼顯示為 `(blank)`
fn display_key(key: &str) -> &str {
    if key.trim().is_empty() {
        BLANK_KEY
    } else {
        key
    }
}

fn format_key_set(keys: &BTreeSet<String>) -> String {
    if keys.is_empty() {
        return "(none)".to_string();
    }
    keys.iter()
        .map(|key| display_key(key))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_missing(missing: &MissingKeys) -> String {
    let mut out = String::from("### Missing Invoices\n");
    let _ = writeln!(
        out,
        "Invoices in GSTR-1 but missing in EWB ({}): {}",
        missing.only_in_gstr.len(),
        format_key_set(&missing.only_in_gstr)
    );
    let _ = writeln!(
        out,
        "Invoices in EWB but missing in GSTR-1 ({}): {}",
        missing.only_in_ewb.len(),
        format_key_set(&missing.only_in_ewb)
    );
    out
}

pub fn render_text(report: &ReconReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "EWB rows: {}, GSTR-1 rows: {} ({} invoices after grouping)\n",
        report.ewb_rows, report.gstr_rows, report.gstr_groups
    );
    out.push_str(&render_comparison(&report.comparison));
    out.push('\n');
    out.push_str(&render_missing(&report.missing));
    out
}

pub fn comparison_to_csv(comparison: &ComparisonReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(comparison.headers())?;
    for row in &comparison.rows {
        writer.write_record(ComparisonReport::flatten_row(row))?;
    }
    let bytes = writer.into_inner().map_err(|e| ReconError::ReportError {
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| ReconError::ReportError {
        message: e.to_string(),
    })
}

pub fn report_to_json(report: &ReconReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// 依指定格式輸出，多種格式以空行分隔
pub fn render(report: &ReconReport, formats: &[String]) -> Result<String> {
    let mut sections = Vec::new();
    for format in formats {
        let section = match format.as_str() {
            "text" => render_text(report),
            "csv" => comparison_to_csv(&report.comparison)?,
            "json" => report_to_json(report)?,
            other => {
                return Err(ReconError::ReportError {
                    message: format!("unknown output format '{}'", other),
                })
            }
        };
        sections.push(section);
    }
    Ok(sections.join("\n"))
}

/// Build the export bundle: comparison CSV, full JSON report and the two
/// missing-invoice lists, one key per line.
pub fn build_bundle(report: &ReconReport) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>("comparison.csv", FileOptions::default())?;
    zip.write_all(comparison_to_csv(&report.comparison)?.as_bytes())?;

    zip.start_file::<_, ()>("report.json", FileOptions::default())?;
    zip.write_all(report_to_json(report)?.as_bytes())?;

    zip.start_file::<_, ()>("missing_in_ewb.txt", FileOptions::default())?;
    for key in &report.missing.only_in_gstr {
        writeln!(zip, "{}", display_key(key))?;
    }

    zip.start_file::<_, ()>("missing_in_gstr.txt", FileOptions::default())?;
    for key in &report.missing.only_in_ewb {
        writeln!(zip, "{}", display_key(key))?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ComparisonPair, ComparisonRow};
    use std::io::Read;

    fn sample_report() -> ReconReport {
        ReconReport {
            generated_at: chrono::Utc::now(),
            ewb_rows: 2,
            gstr_rows: 3,
            gstr_groups: 2,
            comparison: ComparisonReport {
                key_column: "inv".to_string(),
                pairs: vec![ComparisonPair::new("amt", "amt")],
                rows: vec![ComparisonRow {
                    key: "I1".to_string(),
                    ewb_values: vec!["100.0".to_string()],
                    gstr_values: vec!["100".to_string()],
                    mismatches: vec![true],
                }],
                error: None,
            },
            missing: MissingKeys {
                only_in_gstr: ["I3".to_string()].into_iter().collect(),
                only_in_ewb: ["I2".to_string()].into_iter().collect(),
            },
        }
    }

    #[test]
    fn test_render_text_sections() {
        let text = render_text(&sample_report());
        assert!(text.contains("### Differences Report"));
        assert!(text.contains("inv | amt_EWB | amt_GSTR | Mismatch_amt"));
        assert!(text.contains("I1  | 100.0   | 100      | true"));
        assert!(text.contains("Invoices in GSTR-1 but missing in EWB (1): I3"));
        assert!(text.contains("Invoices in EWB but missing in GSTR-1 (1): I2"));
    }

    #[test]
    fn test_render_empty_comparison() {
        let mut report = sample_report();
        report.comparison.rows.clear();
        report.missing = MissingKeys::default();

        let text = render_text(&report);
        assert!(text.contains("No matching invoices found"));
        assert!(text.contains("missing in EWB (0): (none)"));
    }

    #[test]
    fn test_blank_key_is_visible() {
        let mut report = sample_report();
        report.missing.only_in_ewb.insert(String::new());

        let text = render_missing(&report.missing);
        assert!(text.contains("Invoices in EWB but missing in GSTR-1 (2): (blank), I2"));
    }

    #[test]
    fn test_failed_comparison_keeps_missing_lists() {
        let mut report = sample_report();
        let error = ReconError::invalid_column("GSTR-1", "Taxable Valu");
        report.comparison = ComparisonReport::failed("inv", &report.comparison.pairs, &error);

        let text = render_text(&report);
        assert!(text.contains("❌ Selected columns do not exist in the dataset"));
        assert!(text.contains("'Taxable Valu'"));
        assert!(!text.contains("No matching invoices found"));
        assert!(text.contains("Invoices in GSTR-1 but missing in EWB (1): I3"));

        let json = report_to_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["comparison"]["error"]
            .as_str()
            .unwrap()
            .contains("Taxable Valu"));
    }

    #[test]
    fn test_comparison_csv() {
        let csv = comparison_to_csv(&sample_report().comparison).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "inv,amt_EWB,amt_GSTR,Mismatch_amt");
        assert_eq!(lines[1], "I1,100.0,100,true");
    }

    #[test]
    fn test_render_rejects_unknown_format() {
        let result = render(&sample_report(), &["xml".to_string()]);
        assert!(matches!(result, Err(ReconError::ReportError { .. })));
    }

    #[test]
    fn test_json_round_trips_through_serde() {
        let json = report_to_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["gstr_groups"], 2);
        assert_eq!(value["comparison"]["rows"][0]["mismatches"][0], true);
        assert_eq!(value["missing"]["only_in_gstr"][0], "I3");
        assert!(value["comparison"].get("error").is_none());
    }

    #[test]
    fn test_bundle_contents() {
        let bytes = build_bundle(&sample_report()).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "comparison.csv",
                "report.json",
                "missing_in_ewb.txt",
                "missing_in_gstr.txt"
            ]
        );

        let mut content = String::new();
        archive
            .by_name("missing_in_ewb.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "I3\n");
    }

    #[test]
    fn test_preview_limits_rows() {
        let table = Table::from_rows(
            "EWB",
            &["inv", "amt"],
            &[&["I1", "1"], &["I2", "2"], &["I3", "3"]],
        )
        .unwrap();
        let text = render_preview(&table, 2);
        assert!(text.contains("### EWB File Columns"));
        assert!(text.contains("(2 of 3 rows)"));
        assert!(text.contains("I2"));
        assert!(!text.contains("I3"));
    }
}
