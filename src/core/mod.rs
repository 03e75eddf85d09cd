pub mod aggregate;
pub mod engine;
pub mod loader;
pub mod missing;
pub mod pipeline;
pub mod reconcile;
pub mod report;

pub use crate::domain::model::{
    ComparisonPair, ComparisonReport, ComparisonRow, LoadedTables, MissingKeys, ReconReport,
    ReportOutput, Table,
};
pub use crate::domain::ports::{Pipeline, ReconSettings, Storage};
pub use crate::utils::error::Result;
