pub mod cli;
pub mod toml_config;

use crate::core::ReconSettings;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_disjoint_from_key, validate_file_extension, validate_non_empty_string,
    validate_output_formats, validate_path, validate_range, INPUT_EXTENSIONS,
    MAX_COMPARISON_PAIRS,
};

#[cfg(feature = "cli")]
use crate::core::ComparisonPair;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_required_field, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

/// 只檢查輸入檔案路徑（檢視模式也需要）
pub fn validate_inputs<C: ReconSettings + ?Sized>(config: &C) -> Result<()> {
    validate_path("ewb", config.ewb_path())?;
    validate_file_extension("ewb", config.ewb_path(), INPUT_EXTENSIONS)?;
    validate_path("gstr", config.gstr_path())?;
    validate_file_extension("gstr", config.gstr_path(), INPUT_EXTENSIONS)?;
    Ok(())
}

/// 完整對帳所需的設定檢查
pub fn validate_settings<C: ReconSettings + ?Sized>(config: &C) -> Result<()> {
    validate_inputs(config)?;
    validate_non_empty_string("ewb_key", config.ewb_key())?;
    validate_non_empty_string("gstr_key", config.gstr_key())?;
    validate_disjoint_from_key("numeric_columns", config.gstr_key(), config.numeric_columns())?;
    validate_range(
        "comparison_pairs",
        config.comparison_pairs().len(),
        1,
        MAX_COMPARISON_PAIRS,
    )?;
    validate_output_formats("output_formats", config.output_formats())?;
    if config.export_bundle() {
        validate_path("output_path", config.output_path())?;
    }
    Ok(())
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ewb-recon")]
#[command(about = "Reconcile e-way bill (EWB) records against GSTR-1 invoices")]
pub struct CliConfig {
    /// EWB file (.xls, .xlsx or .csv)
    #[arg(long)]
    pub ewb: String,

    /// GSTR-1 file (.xls, .xlsx or .csv)
    #[arg(long)]
    pub gstr: String,

    /// Invoice number column in the EWB file
    #[arg(long)]
    pub ewb_key: Option<String>,

    /// Invoice number column in the GSTR-1 file
    #[arg(long)]
    pub gstr_key: Option<String>,

    /// GSTR-1 columns summed per invoice (comma-separated)
    #[arg(long = "sum", value_delimiter = ',')]
    pub numeric_columns: Vec<String>,

    /// Column pair to compare, EWB_COLUMN=GSTR_COLUMN (repeat up to 3 times)
    #[arg(long = "pair")]
    pub pairs: Vec<ComparisonPair>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Report formats: text, csv, json (comma-separated)
    #[arg(long = "format", value_delimiter = ',', default_value = "text")]
    pub formats: Vec<String>,

    /// Write recon_report.zip into the output path
    #[arg(long)]
    pub export: bool,

    /// Show columns and sample rows of both files, then exit
    #[arg(long)]
    pub inspect: bool,

    /// Number of sample rows shown by --inspect
    #[arg(long, default_value = "5")]
    pub preview: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ReconSettings for CliConfig {
    fn ewb_path(&self) -> &str {
        &self.ewb
    }

    fn gstr_path(&self) -> &str {
        &self.gstr
    }

    fn ewb_key(&self) -> &str {
        self.ewb_key.as_deref().unwrap_or_default()
    }

    fn gstr_key(&self) -> &str {
        self.gstr_key.as_deref().unwrap_or_default()
    }

    fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    fn comparison_pairs(&self) -> &[ComparisonPair] {
        &self.pairs
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn export_bundle(&self) -> bool {
        self.export
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.inspect {
            return validate_inputs(self);
        }
        validate_required_field("ewb_key", &self.ewb_key)?;
        validate_required_field("gstr_key", &self.gstr_key)?;
        validate_settings(self)
    }
}
