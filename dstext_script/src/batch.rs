//! Batch driver: imports a set of files and directories into one database.
//!
//! Deferred title links are shared by every input of a batch and resolved
//! once, after the last file, so a title may be defined in any file of the
//! batch regardless of processing order.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use dstext_data::{ConversationId, DialogueDatabase};
use log::info;
use walkdir::WalkDir;

use crate::assemble::{PendingLink, assemble_conversation};
use crate::config::ImportOptions;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
use crate::resolve::{apply_resolution, resolve_pending};
use crate::tree::parse_script;

/// A conversation written by the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedConversation {
    pub id: ConversationId,
    pub title: String,
    pub file: Option<PathBuf>,
    pub replaced: bool,
    pub entries: usize,
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: Vec<ImportedConversation>,
    /// Files that produced no conversation.
    pub skipped: Vec<PathBuf>,
    /// Deferred title links resolved at the end of the batch.
    pub links_resolved: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

/// Accumulates one batch. Call [`Importer::finish`] to resolve deferred links.
pub struct Importer<'db> {
    db: &'db mut DialogueDatabase,
    options: ImportOptions,
    pending: Vec<PendingLink>,
    diags: Diagnostics,
    imported: Vec<ImportedConversation>,
    skipped: Vec<PathBuf>,
}

impl<'db> Importer<'db> {
    pub fn new(db: &'db mut DialogueDatabase, options: ImportOptions) -> Self {
        Self {
            db,
            options,
            pending: Vec::new(),
            diags: Diagnostics::new(),
            imported: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Import a script file, or every script file under a directory.
    ///
    /// Directory entries that cannot be read are reported and skipped; the
    /// rest of the directory is still imported.
    pub fn import_path(&mut self, path: &Path) {
        if path.is_dir() {
            let scan = collect_script_files(path, &self.options.extension);
            info!("{} script files under '{}'", scan.files.len(), path.display());
            for err in scan.errors {
                let unreadable = err.path().unwrap_or(path).to_path_buf();
                self.diags.set_file(Some(unreadable.as_path()));
                self.diags.error(None, DiagnosticKind::Io(format!("walking directory: {err}")));
                self.diags.set_file(None);
                self.skipped.push(unreadable);
            }
            for file in scan.files {
                self.import_file(&file);
            }
        } else if path.is_file() {
            self.import_file(path);
        } else {
            self.diags.set_file(Some(path));
            self.diags.error(None, DiagnosticKind::Io("no such file or directory".into()));
            self.diags.set_file(None);
            self.skipped.push(path.to_path_buf());
        }
    }

    /// Import one script file.
    pub fn import_file(&mut self, path: &Path) -> Option<ConversationId> {
        match fs::read_to_string(path) {
            Ok(source) => self.import_source(Some(path), &source),
            Err(e) => {
                self.diags.set_file(Some(path));
                self.diags.error(None, DiagnosticKind::Io(format!("reading file: {e}")));
                self.diags.set_file(None);
                self.skipped.push(path.to_path_buf());
                None
            },
        }
    }

    /// Import script text; `file` is only used to attribute diagnostics.
    pub fn import_source(&mut self, file: Option<&Path>, source: &str) -> Option<ConversationId> {
        self.diags.set_file(file);
        let result = parse_script(source, &mut self.diags).and_then(|nodes| {
            assemble_conversation(&nodes, self.db, &self.options, &mut self.pending, &mut self.diags)
        });
        let id = match result {
            Ok(assembly) => {
                let id = assembly.conversation;
                self.imported.push(ImportedConversation {
                    id,
                    title: assembly.title,
                    file: file.map(Path::to_path_buf),
                    replaced: assembly.replaced,
                    entries: assembly.entries,
                });
                Some(id)
            },
            Err(e) => {
                self.diags.error(None, e);
                if let Some(path) = file {
                    self.skipped.push(path.to_path_buf());
                }
                None
            },
        };
        self.diags.set_file(None);
        id
    }

    pub fn pending(&self) -> &[PendingLink] {
        &self.pending
    }

    /// Resolve deferred links against the whole database and close the batch.
    pub fn finish(mut self) -> ImportReport {
        let resolution = resolve_pending(self.db, &self.pending);
        let links_resolved = apply_resolution(self.db, &resolution);
        for issue in resolution.issues {
            issue.report(&mut self.diags);
        }
        info!(
            "batch done: {} conversations, {} deferred links resolved of {}",
            self.imported.len(),
            links_resolved,
            self.pending.len()
        );
        self.pending.clear();
        ImportReport {
            imported: self.imported,
            skipped: self.skipped,
            links_resolved,
            diagnostics: self.diags.into_vec(),
        }
    }
}

/// Import every input path as one batch.
pub fn import_batch(db: &mut DialogueDatabase, inputs: &[PathBuf], options: &ImportOptions) -> ImportReport {
    let mut importer = Importer::new(db, options.clone());
    for input in inputs {
        importer.import_path(input);
    }
    importer.finish()
}

/// Result of walking a script directory.
#[derive(Debug, Default)]
pub struct DirectoryScan {
    /// Script files, in file-name order.
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read.
    pub errors: Vec<walkdir::Error>,
}

/// Files under `dir` with the given extension, recursively, in file-name order.
///
/// Symlinks are followed. Unreadable entries (and broken links) are collected
/// in [`DirectoryScan::errors`] and the walk carries on past them.
pub fn collect_script_files(dir: &Path, extension: &str) -> DirectoryScan {
    let mut scan = DirectoryScan::default();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                scan.errors.push(err);
                continue;
            },
        };
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            scan.files.push(entry.into_path());
        }
    }
    scan
}
