use clap::Parser;
use ewb_recon::utils::error::{ErrorSeverity, ReconError};
use ewb_recon::utils::{logger, validation::Validate};
use ewb_recon::{CliConfig, LocalStorage, ReconEngine, ReconPipeline};

fn report_failure(e: &ReconError) -> i32 {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Reconciliation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting ewb-recon");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let inspect = config.inspect;
    let preview = config.preview;
    let pipeline = ReconPipeline::new(LocalStorage::default(), config);

    if inspect {
        match pipeline.inspect(preview).await {
            Ok(text) => println!("{}", text),
            Err(e) => std::process::exit(report_failure(&e)),
        }
        return Ok(());
    }

    let engine = ReconEngine::new(pipeline);
    match engine.run().await {
        Ok(output) => {
            println!("{}", output.rendered);
            if let Some(path) = output.bundle_path {
                tracing::info!("📁 Report bundle saved to: {}", path);
                println!("📁 Report bundle saved to: {}", path);
            }
            // 比對中止時缺漏清單已輸出，但仍以非零結束
            if output.comparison_error.is_some() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            let exit_code = report_failure(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
