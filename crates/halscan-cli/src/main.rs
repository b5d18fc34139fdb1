//! halscan CLI
//!
//! Runs the engine on a frontend dump of one translation unit and inspects
//! the persistent caches.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use halscan_analysis::run_dump;
use halscan_cache::{load_cache, ApiCache, CacheSpec, LoopCache, StructNameCache, SuccessCache};
use halscan_core::{CacheKind, CachePaths, Config};
use halscan_frontend::TuDump;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "halscan")]
#[command(author, version, about = "HAL fact extraction with build-wide caches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one translation unit dump and merge it into the caches
    Analyze {
        /// JSON dump written by the frontend
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /// Success value cache
        #[arg(long)]
        succ_ret: Option<PathBuf>,

        /// API name cache
        #[arg(long)]
        api: Option<PathBuf>,

        /// Loop span cache
        #[arg(long)]
        loops: Option<PathBuf>,

        /// Peripheral struct name cache
        #[arg(long)]
        periph_struct: Option<PathBuf>,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Compiler plugin arguments (`-out-file-succ-ret <path>` ...)
        #[arg(last = true, value_name = "PLUGIN_ARGS")]
        plugin_args: Vec<String>,
    },

    /// Print the content of a cache file
    Show {
        /// Cache kind (succ-ret, api, loops, periph-struct)
        #[arg(value_name = "KIND")]
        kind: CacheKind,

        /// Cache file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            dump,
            succ_ret,
            api,
            loops,
            periph_struct,
            config,
            format,
            plugin_args,
        } => {
            let mut config = match config {
                Some(path) => Config::load(&path)
                    .with_context(|| format!("cannot read config {}", path.display()))?,
                None => Config::default(),
            };
            if !plugin_args.is_empty() {
                config.outputs = CachePaths::from_plugin_args(&plugin_args)?;
            }
            let overrides = [
                (CacheKind::SuccessValue, succ_ret),
                (CacheKind::Api, api),
                (CacheKind::Loop, loops),
                (CacheKind::StructName, periph_struct),
            ];
            for (kind, path) in overrides {
                if let Some(path) = path {
                    *output_slot(&mut config.outputs, kind) = path;
                }
            }
            fill_default_outputs(&mut config.outputs);
            cmd_analyze(&dump, config, &format)?;
        }
        Commands::Show { kind, file, format } => {
            cmd_show(kind, &file, &format)?;
        }
    }

    Ok(())
}

fn output_slot(paths: &mut CachePaths, kind: CacheKind) -> &mut PathBuf {
    match kind {
        CacheKind::SuccessValue => &mut paths.succ_ret,
        CacheKind::Api => &mut paths.api,
        CacheKind::Loop => &mut paths.loops,
        CacheKind::StructName => &mut paths.periph_struct,
    }
}

/// Use the driver's default file name for every cache left unset
fn fill_default_outputs(paths: &mut CachePaths) {
    let defaults = CachePaths::with_defaults(Path::new("."));
    for kind in CacheKind::ALL {
        if paths.get(kind).as_os_str().is_empty() {
            let fallback = defaults.get(kind).to_path_buf();
            info!(
                "{} not specified, using default {}",
                CachePaths::option_for(kind),
                fallback.display()
            );
            *output_slot(paths, kind) = fallback;
        }
    }
}

fn cmd_analyze(dump_path: &Path, config: Config, format: &str) -> Result<()> {
    if !matches!(format, "text" | "json") {
        bail!("unknown format: {}", format);
    }
    let dump = TuDump::load(dump_path)
        .with_context(|| format!("cannot load dump {}", dump_path.display()))?;
    let outputs = config.outputs.clone();
    let report = run_dump(config, &dump)?;

    if format == "json" {
        let merges: Vec<_> = report
            .merges
            .iter()
            .map(|(kind, result)| match result {
                Ok(merge) => serde_json::json!({
                    "cache": kind.as_str(),
                    "path": outputs.get(*kind).to_string_lossy(),
                    "loaded": merge.loaded,
                    "written": merge.written,
                }),
                Err(err) => serde_json::json!({
                    "cache": kind.as_str(),
                    "path": outputs.get(*kind).to_string_lossy(),
                    "error": err.to_string(),
                }),
            })
            .collect();
        let result = serde_json::json!({
            "file": dump.unit.main_file,
            "success_values": report.facts.success,
            "api": report.facts.api_names().collect::<Vec<_>>(),
            "loops": report.facts.loops.len(),
            "periph_structs": report.facts.struct_names,
            "caches": merges,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Analyzed: {}", dump.unit.main_file);
        println!("   Success values: {}", report.facts.success.len());
        println!("   API names: {}", report.facts.api_names().count());
        println!("   Loops: {}", report.facts.loops.len());
        println!("   Peripheral structs: {}", report.facts.struct_names.len());
        println!();
        for (kind, result) in &report.merges {
            match result {
                Ok(merge) => println!(
                    "   {:<14} {} ({} loaded, {} written)",
                    kind.as_str(),
                    outputs.get(*kind).display(),
                    merge.loaded,
                    merge.written
                ),
                Err(err) => println!("   {:<14} skipped: {}", kind.as_str(), err),
            }
        }
    }

    let failed: Vec<_> = report.failed().map(CacheKind::as_str).collect();
    if !failed.is_empty() {
        bail!("failed to update caches: {}", failed.join(", "));
    }
    Ok(())
}

fn cmd_show(kind: CacheKind, file: &Path, format: &str) -> Result<()> {
    match kind {
        CacheKind::SuccessValue => show::<SuccessCache>(file, format, &["FUNCTION", "SUCC_VAL"], |r| {
            vec![r.function.clone(), r.value.to_string()]
        }),
        CacheKind::Api => show::<ApiCache>(file, format, &["API"], |r| vec![r.name.clone()]),
        CacheKind::Loop => show::<LoopCache>(file, format, &["FILE", "BEGIN", "END"], |span| {
            vec![
                span.file.clone(),
                format!("{}:{}", span.begin_line, span.begin_column),
                format!("{}:{}", span.end_line, span.end_column),
            ]
        }),
        CacheKind::StructName => show::<StructNameCache>(file, format, &["STRUCT"], |name| vec![name.clone()]),
    }
}

fn show<C: CacheSpec>(
    file: &Path,
    format: &str,
    header: &[&str],
    row: impl Fn(&C::Record) -> Vec<String>,
) -> Result<()> {
    let records = load_cache::<C>(file)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        "table" => {
            let rows: Vec<Vec<String>> = records.iter().map(row).collect();
            let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
            for cells in &rows {
                for (width, cell) in widths.iter_mut().zip(cells) {
                    *width = (*width).max(cell.len());
                }
            }
            print_row(header.iter().copied(), &widths);
            for cells in &rows {
                print_row(cells.iter().map(String::as_str), &widths);
            }
            println!("\n{} {} records", records.len(), C::KIND);
        }
        other => bail!("unknown format: {}", other),
    }
    Ok(())
}

fn print_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    println!("{}", line.join("  ").trim_end());
}
