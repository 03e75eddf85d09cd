use crate::core::{ComparisonPair, ReconSettings};
use crate::utils::error::{ReconError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub ewb: SourceConfig,
    pub gstr: GstrSourceConfig,
    #[serde(default)]
    pub compare: Vec<ComparisonPair>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: String,
    pub key_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GstrSourceConfig {
    pub path: String,
    pub key_column: String,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    pub export: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            formats: vec!["text".to_string()],
            export: false,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReconError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReconError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GSTR_FILE})，未設定的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReconError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        crate::config::validate_settings(self)
    }
}

impl ReconSettings for TomlConfig {
    fn ewb_path(&self) -> &str {
        &self.ewb.path
    }

    fn gstr_path(&self) -> &str {
        &self.gstr.path
    }

    fn ewb_key(&self) -> &str {
        &self.ewb.key_column
    }

    fn gstr_key(&self) -> &str {
        &self.gstr.key_column
    }

    fn numeric_columns(&self) -> &[String] {
        &self.gstr.numeric_columns
    }

    fn comparison_pairs(&self) -> &[ComparisonPair] {
        &self.compare
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn export_bundle(&self) -> bool {
        self.output.export
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[job]
name = "april-2024"
period = "2024-04"

[ewb]
path = "ewb.xlsx"
key_column = "Doc.No"

[gstr]
path = "gstr1.xls"
key_column = "Invoice number"
numeric_columns = ["Taxable Value"]

[[compare]]
ewb = "Assessable Value"
gstr = "Taxable Value"

[[compare]]
ewb = "Doc.Date"
gstr = "Invoice date"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.job.name, "april-2024");
        assert_eq!(config.ewb_key(), "Doc.No");
        assert_eq!(config.numeric_columns(), &["Taxable Value"]);
        assert_eq!(config.comparison_pairs().len(), 2);
        assert_eq!(
            config.comparison_pairs()[1],
            ComparisonPair::new("Doc.Date", "Invoice date")
        );
        // [output] 省略時使用預設值
        assert_eq!(config.output_formats(), &["text"]);
        assert!(!config.export_bundle());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("EWB_RECON_TEST_GSTR", "/data/gstr1-april.xlsx");

        let toml_content = r#"
[job]
name = "env"

[ewb]
path = "ewb.xlsx"
key_column = "Doc.No"

[gstr]
path = "${EWB_RECON_TEST_GSTR}"
key_column = "Invoice number"

[[compare]]
ewb = "a"
gstr = "b"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.gstr_path(), "/data/gstr1-april.xlsx");

        std::env::remove_var("EWB_RECON_TEST_GSTR");
    }

    #[test]
    fn test_config_validation() {
        let without_pairs = BASIC.split("[[compare]]").next().unwrap();
        let config = TomlConfig::from_toml_str(without_pairs).unwrap();
        assert!(config.validate().is_err());

        let bad_format = format!("{}\n[output]\nformats = [\"pdf\"]\n", BASIC);
        let config = TomlConfig::from_toml_str(&bad_format).unwrap();
        assert!(config.validate().is_err());

        let bad_extension = BASIC.replace("ewb.xlsx", "ewb.pdf");
        let config = TomlConfig::from_toml_str(&bad_extension).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[job\nname=");
        assert!(matches!(
            result,
            Err(ReconError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = format!("{}\n[output]\npath = \"./reports\"\nexport = true\n", BASIC);
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output_path(), "./reports");
        assert!(config.export_bundle());
        assert_eq!(config.output_formats(), &["text"]);
    }
}
