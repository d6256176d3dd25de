use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pkt_index_core::importer::{
    discover_packets, import_files_with_progress, read_packet, Deletion, FileReport,
    ImportOptions,
};
use pkt_index_core::query::{count_messages, inspect_store};
use pkt_index_core::report::{
    area_summary, load_area_list, resolve_range, store_date_bounds, top_report, AreaFilters,
    Period, RangePreset, RangeSelection, DEFAULT_TOP_LIMIT,
};
use pkt_index_core::{open_store, open_store_read_only};
use tracing::debug;

use crate::render;

pub struct ImportArgs {
    pub folder: PathBuf,
    pub db: PathBuf,
    pub test: bool,
    pub delete: bool,
    pub recursive: bool,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn status_line(report: &FileReport) -> String {
    let name = display_name(&report.path);
    match &report.result {
        Ok(import) => match &report.deletion {
            Deletion::Deleted => format!(
                "[OK] {name}: {} msgs (inserted {}), deleted",
                import.decoded, import.inserted
            ),
            Deletion::Failed(err) => format!("[WARN] {name}: imported but could not delete: {err}"),
            Deletion::NotRequested | Deletion::Kept => {
                format!("[OK] {name}: {} msgs (inserted {})", import.decoded, import.inserted)
            }
        },
        Err(err) => format!("[ERROR] {}: {err}", report.path.display()),
    }
}

pub fn cmd_import(args: &ImportArgs) -> Result<()> {
    let folder = args
        .folder
        .canonicalize()
        .with_context(|| format!("Not a directory: {}", args.folder.display()))?;
    let files = discover_packets(&folder, args.recursive)?;
    if files.is_empty() {
        println!("No .pkt files found in {}", folder.display());
        return Ok(());
    }
    debug!(count = files.len(), folder = %folder.display(), "discovered packets");

    if args.test {
        let mut processed = 0usize;
        let mut total = 0usize;
        for path in &files {
            match read_packet(path) {
                Ok(messages) => {
                    println!("=== {}: {} messages ===", display_name(path), messages.len());
                    for msg in &messages {
                        println!("{}", render::decoded_message(msg));
                    }
                    processed += 1;
                    total += messages.len();
                }
                Err(err) => println!("[ERROR] {}: {err}", path.display()),
            }
        }
        println!();
        println!("Test complete: {processed} files, {total} messages (no DB writes, no deletes).");
        return Ok(());
    }

    let mut store = open_store(&args.db)
        .with_context(|| format!("opening store {}", args.db.display()))?;
    let summary = import_files_with_progress(
        &mut store,
        &files,
        ImportOptions { delete: args.delete },
        |report| println!("{}", status_line(report)),
    );

    println!();
    println!(
        "Done: {} files, {} messages, {} inserted into {}.",
        summary.files,
        summary.messages,
        summary.inserted,
        store.path.display()
    );
    if summary.failed > 0 {
        println!("({} files failed and were left in place)", summary.failed);
    }
    Ok(())
}

pub fn cmd_check(db: &Path, limit: i64, json: bool) -> Result<()> {
    let store = open_store_read_only(db)
        .with_context(|| format!("opening store {}", db.display()))?;
    let overview = if store.caps.has_messages {
        Some(inspect_store(&store, limit)?)
    } else {
        None
    };

    if json {
        let value = serde_json::json!({
            "db": db.display().to_string(),
            "capabilities": &store.caps,
            "overview": &overview,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!(
            "{}",
            render::inspection(&db.display().to_string(), &store.caps, overview.as_ref())
        );
    }
    Ok(())
}

pub struct ReportOptions {
    pub from: Option<String>,
    pub to: Option<String>,
    pub preset: Option<RangePreset>,
    pub days: Option<u32>,
    pub period: Period,
    pub known_areas: Option<PathBuf>,
    pub only_areas: Option<PathBuf>,
    pub exclude_areas: Option<PathBuf>,
    pub top: Option<String>,
    pub area_width: usize,
}

/// One range option wins: a preset, then `--days`, then explicit bounds.
pub fn range_selection(options: &ReportOptions) -> Result<RangeSelection> {
    if options.preset.is_some()
        && (options.days.is_some() || options.from.is_some() || options.to.is_some())
    {
        bail!("--date cannot be combined with --from/--to/--days; use only one date-range option");
    }
    if let Some(preset) = options.preset {
        return Ok(RangeSelection::Preset(preset));
    }
    if let Some(days) = options.days {
        if options.from.is_some() || options.to.is_some() {
            bail!("--days cannot be combined with --from/--to");
        }
        return Ok(RangeSelection::LastDays(days));
    }
    Ok(RangeSelection::Explicit {
        from: options.from.clone(),
        to: options.to.clone(),
    })
}

fn area_list(path: Option<&PathBuf>) -> Result<Vec<String>> {
    match path {
        Some(path) => load_area_list(path)
            .with_context(|| format!("reading area list {}", path.display())),
        None => Ok(Vec::new()),
    }
}

pub fn cmd_report(db: &Path, options: &ReportOptions, json: bool) -> Result<()> {
    if options.area_width < 2 {
        bail!("--area-width must be at least 2");
    }
    let selection = range_selection(options)?;
    let store = open_store_read_only(db)
        .with_context(|| format!("opening store {}", db.display()))?;
    if !store.caps.has_messages {
        bail!("No table pkt_messages found in {}. Are you pointing at the right file?", db.display());
    }

    let total = count_messages(&store)?;
    let zero_traffic =
        options.known_areas.is_some() && options.from.is_some() && options.to.is_some();
    if total == 0 && !zero_traffic {
        bail!("pkt_messages is empty (0 rows)");
    }
    let bounds = store_date_bounds(&store)?;
    if total > 0 && bounds.is_none() {
        bail!("rows exist, but all date fields are empty (date_iso/imported_at/date_raw)");
    }
    let range = resolve_range(&selection, bounds.as_ref())?;
    debug!(from = %range.from, to = %range.to, "report range");

    if let Some(area) = &options.top {
        let report = top_report(&store, &range, area, DEFAULT_TOP_LIMIT)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render::top_tables(&report));
        }
        return Ok(());
    }

    let filters = AreaFilters {
        known: area_list(options.known_areas.as_ref())?,
        only: area_list(options.only_areas.as_ref())?,
        exclude: area_list(options.exclude_areas.as_ref())?,
    };
    let report = area_summary(&store, &range, options.period, &filters)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::area_table(&report, options.area_width));
    }
    Ok(())
}
