use anyhow::Context;
use clap::Parser;
use ewb_recon::core::ReconSettings;
use ewb_recon::utils::error::{ErrorSeverity, ReconError};
use ewb_recon::utils::{logger, validation::Validate};
use ewb_recon::{LocalStorage, ReconEngine, ReconPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-recon")]
#[command(about = "EWB vs GSTR-1 reconciliation driven by a TOML job file")]
struct Args {
    /// Path to TOML job file
    #[arg(short, long, default_value = "recon-job.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Override the export setting from the job file
    #[arg(long)]
    export: Option<bool>,

    /// Show columns and sample rows of both files, then exit
    #[arg(long)]
    inspect: bool,

    /// Number of sample rows shown by --inspect
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Dry run - show the job without loading any file
    #[arg(long)]
    dry_run: bool,
}

fn report_failure(e: &ReconError) -> i32 {
    tracing::error!(
        "❌ Reconciliation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
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
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_logger(args.verbose, args.json_logs);

    tracing::info!("🚀 Starting TOML-based reconciliation");
    tracing::info!("📁 Loading job from: {}", args.config);

    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load job file '{}'", args.config))?;

    // 套用命令列覆蓋設定
    if let Some(export) = args.export {
        config.output.export = export;
        tracing::info!("🔧 Export overridden to: {}", export);
    }

    let validation = if args.inspect {
        ewb_recon::config::validate_inputs(&config)
    } else {
        config.validate()
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Job loaded and validated successfully");
    display_job_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no files will be read");
        return Ok(());
    }

    let pipeline = ReconPipeline::new(LocalStorage::default(), config);

    if args.inspect {
        match pipeline.inspect(args.preview).await {
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

fn display_job_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Job Summary:");
    println!("  Job: {}", config.job.name);
    if let Some(period) = &config.job.period {
        println!("  Period: {}", period);
    }
    if let Some(description) = &config.job.description {
        println!("  Description: {}", description);
    }
    println!("  EWB: {} (key: {})", config.ewb_path(), config.ewb_key());
    println!("  GSTR-1: {} (key: {})", config.gstr_path(), config.gstr_key());

    if config.numeric_columns().is_empty() {
        println!("  Summed columns: (none, first value per invoice)");
    } else {
        println!("  Summed columns: {}", config.numeric_columns().join(", "));
    }

    for (i, pair) in config.comparison_pairs().iter().enumerate() {
        println!("  Compare {}: {}", i + 1, pair);
    }

    println!("  Formats: {}", config.output_formats().join(", "));
    if config.export_bundle() {
        println!("  Export: {}/recon_report.zip", config.output_path());
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
