use anyhow::Context;
use certgen::utils::{logger, monitor::ResourceMonitor, validation::Validate};
use certgen::{preflight, read_names, BatchCoordinator, CliArgs};
use clap::Parser;

/// Exit code when some names failed but the batch ran.
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting certgen");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = args.resolve_config().context("failed to load configuration")?;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let monitor = ResourceMonitor::new(args.monitor_enabled(&config));
    if monitor.is_enabled() {
        tracing::info!("🔍 Resource monitoring enabled");
    }

    let names = read_names(config.names_file())
        .with_context(|| format!("failed to read names from {}", config.batch.names_file))?;

    let renderer = match preflight(config.render_settings(), config.font_source()) {
        Ok(renderer) => renderer,
        Err(e) => {
            tracing::error!("❌ Pre-flight failed: {}", e);
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    monitor.log_stats("Pre-flight");

    if args.dry_run {
        tracing::info!("🔍 DRY RUN - {} names would be rendered", names.len());
        println!("Dry run OK: {} names, {} workers", names.len(), config.workers());
        return Ok(());
    }

    let coordinator = BatchCoordinator::new(renderer, config.workers()).with_progress(!args.quiet);
    if !args.quiet {
        println!("Generating certificates for {} people...", names.len());
    }
    let report = coordinator.run(names).await;
    monitor.log_stats("Batch");

    if let Some(report_path) = &config.output.report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_path, json)
            .with_context(|| format!("failed to write report to {}", report_path))?;
        tracing::info!("📁 Report saved to: {}", report_path);
    }

    if report.is_complete_success() {
        println!(
            "✅ All {} certificates have been generated successfully!",
            report.rendered.len()
        );
        Ok(())
    } else {
        eprintln!(
            "⚠️  {} of {} certificates failed:",
            report.failed.len(),
            report.total
        );
        for failure in &report.failed {
            eprintln!("   {}: {}", failure.name, failure.error);
        }
        std::process::exit(EXIT_PARTIAL_FAILURE);
    }
}
