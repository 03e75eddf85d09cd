use anyhow::Result;
use ewb_recon::core::{Pipeline, ReconSettings};
use ewb_recon::{LocalStorage, ReconEngine, ReconPipeline, TomlConfig};
use tempfile::TempDir;

/// 以 TOML 工作檔跑完整流程，GSTR-1 依發票號碼彙總後比對三組欄位
#[tokio::test]
async fn test_toml_job_with_three_pairs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    std::fs::write(
        temp_dir.path().join("ewb.csv"),
        "EWB No,Doc.No,Doc.Date,Assessable Value,To GSTIN\n\
         331001,INV/001,01/04/2024,1500,29ABCDE1234F1Z5\n\
         331002,INV/002,02/04/2024,800,27ABCDE1234F1Z5\n\
         331003,INV/004,04/04/2024,250,33ABCDE1234F1Z5\n",
    )?;
    std::fs::write(
        temp_dir.path().join("gstr1.csv"),
        "Invoice number,Invoice date,Taxable Value,GSTIN/UIN of Recipient, Rate \n\
         INV/001,01/04/2024,1000,29ABCDE1234F1Z5,18\n\
         INV/001,01/04/2024,500,29ABCDE1234F1Z5,12\n\
         INV/002,03/04/2024,800,27ABCDE1234F1Z5,18\n\
         INV/003,03/04/2024,90,07ABCDE1234F1Z5,5\n",
    )?;

    let job = format!(
        r#"
[job]
name = "april-2024"
description = "EWB vs GSTR-1"

[ewb]
path = "{path}/ewb.csv"
key_column = "Doc.No"

[gstr]
path = "{path}/gstr1.csv"
key_column = "Invoice number"
numeric_columns = ["Taxable Value"]

[[compare]]
ewb = "Assessable Value"
gstr = "Taxable Value"

[[compare]]
ewb = "Doc.Date"
gstr = "Invoice date"

[[compare]]
ewb = "To GSTIN"
gstr = "GSTIN/UIN of Recipient"

[output]
path = "{path}/out"
formats = ["json"]
export = true
"#,
        path = temp_path
    );
    let job_path = temp_dir.path().join("recon-job.toml");
    std::fs::write(&job_path, job)?;

    let config = TomlConfig::from_file(&job_path)?;
    assert_eq!(config.comparison_pairs().len(), 3);

    let engine = ReconEngine::new(ReconPipeline::new(LocalStorage::default(), config));
    let output = engine.run().await?;

    let report: serde_json::Value = serde_json::from_str(&output.rendered)?;
    let rows = report["comparison"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);

    // INV/001：兩列加總 1000 + 500 = 1500
    assert_eq!(rows[0]["key"], "INV/001");
    assert_eq!(rows[0]["gstr_values"][0], "1500");
    assert_eq!(rows[0]["mismatches"], serde_json::json!([false, false, false]));

    // INV/002：日期不同
    assert_eq!(rows[1]["key"], "INV/002");
    assert_eq!(rows[1]["mismatches"], serde_json::json!([false, true, false]));

    assert_eq!(report["missing"]["only_in_gstr"], serde_json::json!(["INV/003"]));
    assert_eq!(report["missing"]["only_in_ewb"], serde_json::json!(["INV/004"]));

    assert!(temp_dir.path().join("out/recon_report.zip").exists());
    Ok(())
}

#[tokio::test]
async fn test_trimmed_header_can_be_selected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    std::fs::write(temp_dir.path().join("ewb.csv"), "inv,rate\nI1,18\n")?;
    std::fs::write(temp_dir.path().join("gstr1.csv"), "inv, Rate \nI1,18\nI1,12\n")?;

    let job = format!(
        r#"
[job]
name = "rates"

[ewb]
path = "{path}/ewb.csv"
key_column = "inv"

[gstr]
path = "{path}/gstr1.csv"
key_column = "inv"

[[compare]]
ewb = "rate"
gstr = "Rate"
"#,
        path = temp_path
    );
    let config = TomlConfig::from_toml_str(&job)?;
    let pipeline = ReconPipeline::new(LocalStorage::default(), config);

    let tables = pipeline.load().await?;
    assert_eq!(tables.gstr.columns(), &["inv", "Rate"]);

    // 沒有加總欄位時取第一列的值
    let report = pipeline.reconcile(tables).await?;
    assert_eq!(report.gstr_groups, 1);
    assert_eq!(report.comparison.rows[0].gstr_values, vec!["18"]);
    assert!(!report.comparison.rows[0].has_mismatch());
    Ok(())
}
