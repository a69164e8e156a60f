use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wikimigrate_core::pipeline::{ConvertReport, convert_pages};
use wikimigrate_core::rename::{RenameReport, RenameStatus, rename_page_dirs};
use wikimigrate_core::runtime::{
    ResolutionContext, ResolvedSettings, SettingOverrides, resolve_settings,
};

#[derive(Debug, Parser)]
#[command(
    name = "wikimigrate",
    version,
    about = "Convert a MoinMoin pages directory into plain files or an Org-mode outline"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved settings diagnostics")]
    diagnostics: bool,
    #[arg(short, long, global = true, help = "Log per-article progress")]
    verbose: bool,
    #[arg(short, long, global = true, help = "Only log warnings and errors")]
    quiet: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Resolve, translate and write every article")]
    Convert(ConvertArgs),
    #[command(about = "Decode hex-escaped page directory names in place")]
    Rename(RenameArgs),
}

#[derive(Debug, Args)]
struct ConvertArgs {
    #[arg(short = 'p', long, value_name = "PATH")]
    pages_dir: Option<PathBuf>,
    #[arg(short = 'o', long, value_name = "PATH", help = "Write one file per article here")]
    output_dir: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Append every article to this Org document")]
    org_file: Option<PathBuf>,
    #[arg(long, help = "Remove an existing Org document before writing")]
    truncate_org: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[arg(value_name = "PAGES_DIR")]
    pages_dir: Option<PathBuf>,
    #[arg(long, help = "Report planned renames without touching the filesystem")]
    dry_run: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Some(Commands::Convert(ref args)) => run_convert(&cli, args),
        Some(Commands::Rename(ref args)) => run_rename(&cli, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "debug"
        } else if quiet {
            "warn"
        } else {
            "info"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_convert(cli: &Cli, args: &ConvertArgs) -> Result<()> {
    let settings = resolve_runtime_settings(SettingOverrides {
        config: cli.config.clone(),
        pages_dir: args.pages_dir.clone(),
        output_dir: args.output_dir.clone(),
        org_file: args.org_file.clone(),
    })?;
    if cli.diagnostics {
        eprintln!("[diagnostics]\n{}\n", settings.diagnostics());
    }

    let options = settings.convert_options(args.truncate_org)?;
    let report = convert_pages(&options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_convert_report(&report);
    }
    Ok(())
}

fn print_convert_report(report: &ConvertReport) {
    println!("convert");
    println!("pages_dir: {}", report.pages_dir);
    println!(
        "output_dir: {}",
        report.output_dir.as_deref().unwrap_or("<none>")
    );
    println!("org_file: {}", report.org_file.as_deref().unwrap_or("<none>"));
    if report.output_dir.is_none() && report.org_file.is_none() {
        println!("mode: resolve-only (no output configured)");
    }
    println!("articles.discovered: {}", report.discovered);
    println!("articles.converted: {}", report.converted());
    println!("articles.fallbacks: {}", report.fallbacks());
    let skipped: Vec<_> = report.skipped().collect();
    println!("articles.skipped: {}", skipped.len());
    for (name, reason) in skipped {
        println!("skipped.{name}: {reason}");
    }
    println!("interrupted: {}", format_flag(report.interrupted));
}

fn run_rename(cli: &Cli, args: &RenameArgs) -> Result<()> {
    let settings = resolve_runtime_settings(SettingOverrides {
        config: cli.config.clone(),
        pages_dir: args.pages_dir.clone(),
        ..SettingOverrides::default()
    })?;
    if cli.diagnostics {
        eprintln!("[diagnostics]\n{}\n", settings.diagnostics());
    }

    let pages_dir = settings.convert_options(false)?.pages_dir;
    let report = rename_page_dirs(&pages_dir, &settings.config.rename_table(), args.dry_run)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_rename_report(&report);
    }
    Ok(())
}

fn print_rename_report(report: &RenameReport) {
    println!("rename");
    println!("pages_dir: {}", report.pages_dir);
    println!("dry_run: {}", format_flag(report.dry_run));
    println!("unchanged: {}", report.unchanged);
    println!("renamed: {}", report.count(RenameStatus::Renamed));
    println!("planned: {}", report.count(RenameStatus::Planned));
    println!("collisions: {}", report.count(RenameStatus::Collision));
    for entry in &report.entries {
        let label = match entry.status {
            RenameStatus::Renamed => "renamed",
            RenameStatus::Planned => "planned",
            RenameStatus::Collision => "collision",
        };
        println!("{label}: {} -> {}", entry.from, entry.to);
    }
}

fn resolve_runtime_settings(overrides: SettingOverrides) -> Result<ResolvedSettings> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let settings = resolve_settings(&context, &overrides)?;
    tracing::debug!(
        config = %normalize_path(&settings.config_path),
        source = settings.config_source.as_str(),
        "resolved settings"
    );
    Ok(settings)
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
