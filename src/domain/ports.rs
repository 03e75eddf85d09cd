use crate::domain::model::{ComparisonPair, LoadedTables, ReconReport, ReportOutput};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 一次對帳所需的所有使用者選擇
pub trait ReconSettings: Send + Sync {
    fn ewb_path(&self) -> &str;
    fn gstr_path(&self) -> &str;
    fn ewb_key(&self) -> &str;
    fn gstr_key(&self) -> &str;
    fn numeric_columns(&self) -> &[String];
    fn comparison_pairs(&self) -> &[ComparisonPair];
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn export_bundle(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn load(&self) -> Result<LoadedTables>;
    async fn reconcile(&self, tables: LoadedTables) -> Result<ReconReport>;
    async fn report(&self, report: ReconReport) -> Result<ReportOutput>;
}
