use anyhow::{Context, Result};
use clap::Parser;
use pl_planner::logger::init_cli_logger;
use pl_planner::{Planner, PlannerError, PlannerOptions, YearMonth};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pl-planner")]
#[command(about = "Consolidate monthly P/L plans and actuals of several business units")]
#[command(version)]
struct Args {
    /// Data directory (planner.toml, snapshot.json, unit sheets)
    #[arg(short, long, default_value = "./data")]
    directory: PathBuf,

    /// First month of the report (YYYYMM), widened to its fiscal year
    #[arg(short, long, value_parser = YearMonth::parse)]
    start: Option<YearMonth>,

    /// Last month of the report (YYYYMM), widened to its fiscal year
    #[arg(short, long, value_parser = YearMonth::parse)]
    end: Option<YearMonth>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Consolidate and save the snapshot without writing sheets
    #[arg(long)]
    no_render: bool,
}

fn main() {
    let args = Args::parse();
    init_cli_logger(args.verbose);

    if let Err(err) = run(&args) {
        tracing::error!("{:#}", err);
        eprintln!("\n❌ {:#}", err);
        let code = err
            .downcast_ref::<PlannerError>()
            .map_or(2, PlannerError::exit_code);
        std::process::exit(code);
    }
}

fn run(args: &Args) -> Result<()> {
    println!("📊 P/L Planner v{}", pl_planner::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut options = PlannerOptions::new(&args.directory).with_window(args.start, args.end);
    if args.no_render {
        options = options.without_render();
    }

    let planner = Planner::new(options);
    let summary = planner
        .run()
        .with_context(|| format!("planning run in {}", args.directory.display()))?;

    println!("\n✓ Units: {}", summary.units);
    println!(
        "✓ Sheets ingested: {} ({} values, {} unresolved)",
        summary.ingest.sheets, summary.ingest.merged, summary.ingest.dropped
    );
    println!(
        "✓ Apportioned accounts: {}",
        summary.update.apportionment.accounts
    );
    println!("✓ Reporting window: {} - {}", summary.window.0, summary.window.1);
    println!("✓ Snapshot: {}", summary.snapshot.display());

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if summary.written.is_empty() {
        println!("✅ Snapshot saved (rendering skipped)");
    } else {
        println!("✅ Wrote {} sheets", summary.written.len());
        for path in &summary.written {
            println!("   {}", path.display());
        }
    }
    Ok(())
}
