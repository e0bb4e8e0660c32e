use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Import from fileplacer-core
use fileplacer_core::{
    MetadataExtractor, ModelParser, Organizer, OrganizerConfig, ParserBackend,
    RunReport, RunSummary, Toggle,
};

// Import CLI utilities
use fileplacer::locations;

#[derive(Parser)]
#[command(name = "fileplacer")]
#[command(about = "Sort a drop folder into a destination tree using spreadsheet rules")]
struct Args {
    /// Path to the config file (YAML format).
    /// Created with defaults when missing.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder to scan (overrides paths.source_folder)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Destination root (overrides paths.destination_base)
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Rule workbook (overrides paths.rule_document)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Folder for model analysis reports (overrides paths.report_folder)
    #[arg(long)]
    reports: Option<PathBuf>,

    /// Skip model analysis for this run
    #[arg(long)]
    no_analysis: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Debug-level diagnostics on stderr (RUST_LOG still wins when set)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("🗂️  Fileplacer");

    if let Err(e) = run(&args) {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,fileplacer=debug,fileplacer_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => locations::default_config_path()?,
    };
    let loaded = OrganizerConfig::load_or_create(&config_path, locations::home_dir)?;
    if loaded.created {
        println!("📋 Default config written to: {}", config_path.display());
    } else {
        println!("📋 Loaded config from: {}", config_path.display());
    }

    let mut config = loaded.config;
    apply_overrides(&mut config, args);
    tracing::debug!("effective config: {:?}", config);

    if args.show_config {
        return show_config(&config);
    }

    let backend = ParserBackend::detect();
    if config.analysis_enabled() && !backend.is_available() {
        println!("ℹ️  No model parser compiled in, analysis disabled");
    }

    println!("📁 Source: {}", config.paths.source_folder.display());
    println!("📁 Destination: {}", config.paths.destination_base.display());
    println!("📑 Rules: {}", config.paths.rule_document.display());

    let extractor = MetadataExtractor::new(Box::new(backend));
    let mut organizer = Organizer::new(config, extractor);
    if organizer.analysis_active() {
        println!("🔧 Model analysis on ({} parser)", organizer.parser_name());
    }
    println!();

    match organizer.run() {
        Ok(RunReport::TemplateCreated(path)) => {
            println!("\n📝 Fill in {} and run again.", path.display());
            println!("   One sheet per category: file pattern in column A, subfolder in column B.");
            Ok(())
        }
        Ok(RunReport::Completed(summary)) => {
            print_summary(&summary);
            if let Some(path) = &args.summary {
                save_summary(&summary, path)?;
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Layer CLI flags on top of the loaded config
fn apply_overrides(config: &mut OrganizerConfig, args: &Args) {
    if let Some(source) = &args.source {
        config.paths.source_folder = source.clone();
    }
    if let Some(destination) = &args.destination {
        config.paths.destination_base = destination.clone();
    }
    if let Some(rules) = &args.rules {
        config.paths.rule_document = rules.clone();
    }
    if let Some(reports) = &args.reports {
        config.paths.report_folder = reports.clone();
    }
    if args.no_analysis {
        config.settings.analyze_models = Toggle::No;
    }
}

fn show_config(config: &OrganizerConfig) -> Result<()> {
    println!("\n📋 Effective configuration:");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n✓ Done: {}/{} files placed", summary.placed, summary.total);
    if summary.skipped_no_rule > 0 {
        println!("  ⚠ {} without a matching rule", summary.skipped_no_rule);
    }
    if summary.failed > 0 {
        println!("  ✗ {} failed", summary.failed);
    }
    for report in &summary.reports {
        println!("  📊 {}", report.display());
    }
}

fn save_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("Failed to write summary {}", path.display()))?;
    println!("💾 Summary saved to: {}", path.display());
    Ok(())
}
