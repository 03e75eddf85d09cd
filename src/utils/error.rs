use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Column '{column}' does not exist in {table}")]
    InvalidColumn { table: String, column: String },

    #[error("Failed to load '{source_name}': {message}")]
    LoadError { source_name: String, message: String },

    #[error("Unsupported input format: {path}")]
    UnsupportedFormat { path: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Report generation error: {message}")]
    ReportError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Configuration,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReconError {
    pub fn invalid_column(table: &str, column: &str) -> Self {
        ReconError::InvalidColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn load(source_name: &str, message: impl std::fmt::Display) -> Self {
        ReconError::LoadError {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReconError::LoadError { .. }
            | ReconError::UnsupportedFormat { .. }
            | ReconError::CsvError(_) => ErrorCategory::Input,
            ReconError::InvalidColumn { .. } => ErrorCategory::Data,
            ReconError::ConfigError { .. }
            | ReconError::ConfigValidationError { .. }
            | ReconError::InvalidConfigValueError { .. }
            | ReconError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ReconError::SerializationError(_)
            | ReconError::ZipError(_)
            | ReconError::ReportError { .. } => ErrorCategory::Output,
            ReconError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 使用者修正選擇即可重跑
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ReconError::InvalidColumn { .. } => {
                "Check the column names with --inspect and pick columns that exist in each file"
            }
            ReconError::LoadError { .. } | ReconError::CsvError(_) => {
                "Make sure the file is a valid, non-corrupt spreadsheet with a header row"
            }
            ReconError::UnsupportedFormat { .. } => "Use an .xls, .xlsx or .csv file",
            ReconError::ConfigError { .. }
            | ReconError::ConfigValidationError { .. }
            | ReconError::InvalidConfigValueError { .. }
            | ReconError::MissingConfigError { .. } => {
                "Review the command line options or the job file and try again"
            }
            ReconError::SerializationError(_)
            | ReconError::ZipError(_)
            | ReconError::ReportError { .. } => "Check that the output directory is writable",
            ReconError::IoError(_) => "Check that the files exist and are readable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReconError::InvalidColumn { .. } => format!(
                "Selected columns do not exist in the dataset. Please check column names. ({})",
                self
            ),
            ReconError::LoadError { source_name, .. } => {
                format!("Could not read '{}' as a spreadsheet", source_name)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
