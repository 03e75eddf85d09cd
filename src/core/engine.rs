use crate::core::{Pipeline, ReportOutput};
use crate::utils::error::Result;
use std::time::Instant;

pub struct ReconEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ReconEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<ReportOutput> {
        tracing::info!("Starting EWB vs GSTR-1 reconciliation...");
        let started = Instant::now();

        // Load
        let stage = Instant::now();
        let tables = self.pipeline.load().await?;
        tracing::debug!("Load finished in {:?}", stage.elapsed());

        // Aggregate + reconcile
        let stage = Instant::now();
        let report = self.pipeline.reconcile(tables).await?;
        tracing::debug!("Reconcile finished in {:?}", stage.elapsed());

        // Report
        let stage = Instant::now();
        let output = self.pipeline.report(report).await?;
        tracing::debug!("Report finished in {:?}", stage.elapsed());

        tracing::info!("Reconciliation finished in {:?}", started.elapsed());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        ComparisonReport, LoadedTables, MissingKeys, ReconReport, Table,
    };
    use crate::utils::error::ReconError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPipeline {
        fail_reconcile: bool,
        reports: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pipeline for CountingPipeline {
        async fn load(&self) -> Result<LoadedTables> {
            Ok(LoadedTables {
                ewb: Table::from_rows("EWB", &["inv"], &[&["I1"]])?,
                gstr: Table::from_rows("GSTR-1", &["inv"], &[&["I1"]])?,
            })
        }

        async fn reconcile(&self, tables: LoadedTables) -> Result<ReconReport> {
            if self.fail_reconcile {
                return Err(ReconError::invalid_column("EWB", "missing"));
            }
            Ok(ReconReport {
                generated_at: chrono::Utc::now(),
                ewb_rows: tables.ewb.len(),
                gstr_rows: tables.gstr.len(),
                gstr_groups: tables.gstr.len(),
                comparison: ComparisonReport {
                    key_column: "inv".to_string(),
                    pairs: Vec::new(),
                    rows: Vec::new(),
                    error: None,
                },
                missing: MissingKeys::default(),
            })
        }

        async fn report(&self, report: ReconReport) -> Result<ReportOutput> {
            self.reports.fetch_add(1, Ordering::SeqCst);
            Ok(ReportOutput {
                rendered: format!("{} rows", report.ewb_rows),
                bundle_path: None,
                comparison_error: None,
            })
        }
    }

    #[tokio::test]
    async fn test_engine_runs_all_stages() {
        let engine = ReconEngine::new(CountingPipeline {
            fail_reconcile: false,
            reports: AtomicUsize::new(0),
        });
        let output = engine.run().await.unwrap();
        assert_eq!(output.rendered, "1 rows");
        assert_eq!(engine.pipeline().reports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_stops_on_validation_error() {
        let engine = ReconEngine::new(CountingPipeline {
            fail_reconcile: true,
            reports: AtomicUsize::new(0),
        });
        assert!(engine.run().await.is_err());
        assert_eq!(engine.pipeline().reports.load(Ordering::SeqCst), 0);
    }
}
