use crate::core::aggregate::aggregate;
use crate::core::loader::{load_table, SheetFormat};
use crate::core::missing::missing_between;
use crate::core::reconcile::reconcile_pairs;
use crate::core::report::{self, BUNDLE_FILENAME};
use crate::core::{
    ComparisonReport, LoadedTables, Pipeline, ReconReport, ReconSettings, ReportOutput, Storage,
    Table,
};
use crate::domain::model::{EWB_TABLE, GSTR_TABLE};
use crate::utils::error::{ReconError, Result};

/// EWB 對 GSTR-1 的對帳流程：載入 → 彙總 → 比對 → 報表
pub struct ReconPipeline<S: Storage, C: ReconSettings> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ReconSettings> ReconPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn load_one(&self, path: &str, name: &str) -> Result<Table> {
        let format = SheetFormat::from_path(path)?;
        tracing::debug!("Reading {} file {} as {:?}", name, path, format);
        let bytes = self.storage.read_file(path).await?;
        load_table(&bytes, format, name)
    }

    /// 只顯示欄位清單與前幾列，不做對帳
    pub async fn inspect(&self, preview_rows: usize) -> Result<String> {
        let tables = self.load().await?;
        Ok(format!(
            "{}\n{}",
            report::render_preview(&tables.ewb, preview_rows),
            report::render_preview(&tables.gstr, preview_rows)
        ))
    }

    /// 彙總前檢查鍵欄位與加總欄位；比對欄位由 `reconcile_pairs` 自行檢查
    fn validate_keys(&self, tables: &LoadedTables) -> Result<()> {
        let config = &self.config;
        tables.ewb.column_index(config.ewb_key())?;
        tables.gstr.column_index(config.gstr_key())?;
        tables.gstr.column_indices(config.numeric_columns())?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ReconSettings> Pipeline for ReconPipeline<S, C> {
    async fn load(&self) -> Result<LoadedTables> {
        let ewb = self.load_one(self.config.ewb_path(), EWB_TABLE).await?;
        let gstr = self.load_one(self.config.gstr_path(), GSTR_TABLE).await?;
        tracing::info!(
            "📂 Loaded EWB ({} rows, {} columns) and GSTR-1 ({} rows, {} columns)",
            ewb.len(),
            ewb.columns().len(),
            gstr.len(),
            gstr.columns().len()
        );
        Ok(LoadedTables { ewb, gstr })
    }

    async fn reconcile(&self, tables: LoadedTables) -> Result<ReconReport> {
        self.validate_keys(&tables)?;
        let config = &self.config;

        let grouped = aggregate(&tables.gstr, config.gstr_key(), config.numeric_columns())?;
        tracing::info!(
            "🧮 Grouped GSTR-1 by '{}': {} rows -> {} invoices",
            config.gstr_key(),
            tables.gstr.len(),
            grouped.len()
        );

        // 比對欄位錯誤只中止比對，缺漏發票清單照常產出
        let comparison = match reconcile_pairs(
            &tables.ewb,
            config.ewb_key(),
            &grouped,
            config.gstr_key(),
            config.comparison_pairs(),
        ) {
            Ok(comparison) => comparison,
            Err(e @ ReconError::InvalidColumn { .. }) => {
                tracing::error!("❌ Comparison aborted: {}", e);
                ComparisonReport::failed(config.ewb_key(), config.comparison_pairs(), &e)
            }
            Err(e) => return Err(e),
        };
        if comparison.is_empty() && !comparison.is_failed() {
            tracing::warn!("No invoice numbers matched between EWB and GSTR-1");
        }

        let missing = missing_between(&tables.ewb, config.ewb_key(), &grouped, config.gstr_key())?;
        tracing::info!(
            "🔍 {} matched rows ({} with mismatches), {} missing in EWB, {} missing in GSTR-1",
            comparison.rows.len(),
            comparison.mismatched_rows(),
            missing.only_in_gstr.len(),
            missing.only_in_ewb.len()
        );

        Ok(ReconReport {
            generated_at: chrono::Utc::now(),
            ewb_rows: tables.ewb.len(),
            gstr_rows: tables.gstr.len(),
            gstr_groups: grouped.len(),
            comparison,
            missing,
        })
    }

    async fn report(&self, report: ReconReport) -> Result<ReportOutput> {
        let rendered = report::render(&report, self.config.output_formats())?;

        let bundle_path = if self.config.export_bundle() {
            let bundle = report::build_bundle(&report)?;
            let path = format!("{}/{}", self.config.output_path(), BUNDLE_FILENAME);
            tracing::debug!("Writing report bundle ({} bytes) to {}", bundle.len(), path);
            self.storage.write_file(&path, &bundle).await?;
            Some(path)
        } else {
            None
        };

        Ok(ReportOutput {
            rendered,
            bundle_path,
            comparison_error: report.comparison.error,
        })
    }
}
