use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Transaction};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::db::PktStore;
use crate::error::CoreError;
use crate::models::{FileImport, ImportSummary, PktMessage};
use crate::packet::decode_packet;

pub const PACKET_EXTENSION: &str = "pkt";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Remove each source file once all of its messages were newly stored.
    pub delete: bool,
}

#[derive(Debug)]
pub enum Deletion {
    NotRequested,
    /// The import failed or some decoded messages were already present.
    Kept,
    Deleted,
    Failed(String),
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<FileImport, CoreError>,
    pub deletion: Deletion,
}

/// Lists `*.pkt` files (any case) under `folder`, sorted by path.
pub fn discover_packets(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>, CoreError> {
    if !folder.is_dir() {
        return Err(CoreError::InvalidArgument(format!(
            "not a directory: {}",
            folder.display()
        )));
    }
    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 });
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_packet = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(PACKET_EXTENSION))
            .unwrap_or(false);
        if is_packet {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Reads a whole packet file and decodes it.
pub fn read_packet(path: &Path) -> Result<Vec<PktMessage>, CoreError> {
    let data = fs::read(path)?;
    Ok(decode_packet(&path.display().to_string(), &data)?)
}

/// Inserts decoded messages, skipping any `(pkt_file, msg_index)` already
/// stored. Returns the number of rows actually written.
pub fn insert_messages(tx: &Transaction, messages: &[PktMessage]) -> Result<usize, CoreError> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO pkt_messages \
         (pkt_file, msg_index, date_iso, date_raw, echo, size_bytes, msg_lines, pct_quoted, from_name, subject) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
    )?;
    let mut inserted = 0;
    for msg in messages {
        inserted += stmt.execute(params![
            msg.pkt_file,
            msg.msg_index,
            msg.date_iso,
            msg.date_raw,
            msg.echo,
            msg.size_bytes as i64,
            msg.msg_lines,
            msg.pct_quoted,
            msg.from_name,
            msg.subject,
        ])?;
    }
    Ok(inserted)
}

/// Persists one file's messages in a single transaction, so a store failure
/// leaves none of them behind.
pub fn store_messages(store: &mut PktStore, messages: &[PktMessage]) -> Result<usize, CoreError> {
    let tx = store.conn.transaction()?;
    let inserted = insert_messages(&tx, messages)?;
    tx.commit()?;
    Ok(inserted)
}

/// Decodes `data` as the packet `source` and stores it.
pub fn import_bytes(store: &mut PktStore, source: &str, data: &[u8]) -> Result<FileImport, CoreError> {
    let messages = decode_packet(source, data)?;
    let inserted = store_messages(store, &messages)?;
    Ok(FileImport {
        path: source.to_string(),
        decoded: messages.len(),
        inserted,
    })
}

pub fn import_packet(store: &mut PktStore, path: &Path) -> Result<FileImport, CoreError> {
    let data = fs::read(path)?;
    import_bytes(store, &path.display().to_string(), &data)
}

pub fn import_files(
    store: &mut PktStore,
    files: &[PathBuf],
    options: ImportOptions,
) -> ImportSummary {
    import_files_with_progress(store, files, options, |_| {})
}

/// Imports each file independently: a file that fails to decode or store is
/// reported and skipped, and the run carries on with the next one.
pub fn import_files_with_progress<F>(
    store: &mut PktStore,
    files: &[PathBuf],
    options: ImportOptions,
    mut on_file: F,
) -> ImportSummary
where
    F: FnMut(&FileReport),
{
    let mut summary = ImportSummary::default();
    for path in files {
        let result = import_packet(store, path);
        let deletion = match &result {
            Ok(import) => {
                summary.files += 1;
                summary.messages += import.decoded;
                summary.inserted += import.inserted;
                info!(
                    file = %path.display(),
                    decoded = import.decoded,
                    inserted = import.inserted,
                    "imported packet"
                );
                if !options.delete {
                    Deletion::NotRequested
                } else if !import.deletion_allowed() {
                    Deletion::Kept
                } else {
                    match fs::remove_file(path) {
                        Ok(()) => Deletion::Deleted,
                        Err(err) => {
                            warn!(file = %path.display(), error = %err, "imported but could not delete");
                            Deletion::Failed(err.to_string())
                        }
                    }
                }
            }
            Err(err) => {
                summary.failed += 1;
                error!(file = %path.display(), error = %err, "packet import failed");
                if options.delete {
                    Deletion::Kept
                } else {
                    Deletion::NotRequested
                }
            }
        };
        let report = FileReport {
            path: path.clone(),
            result,
            deletion,
        };
        on_file(&report);
    }
    summary
}
