//! Diagnostics raised while importing a batch.
//!
//! Nothing raised here aborts a batch: failures are scoped to the offending
//! line, file, or link, and recorded so the host can surface them.

use std::fmt;
use std::path::{Path, PathBuf};

use dstext_data::{ConversationId, EntryId};
use log::{error, warn};
use thiserror::Error;

/// A directive that was recognised but could not be turned into an element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("{marker} directive has no argument")]
    MissingArgument { marker: &'static str },
    #[error("{marker} block is never closed with '>>'")]
    Unterminated { marker: &'static str },
}

/// A problem with the overall shape of a file; the whole file is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("conversation file is empty")]
    Empty,
    #[error("conversation file must start with a title")]
    MissingTitle,
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("unrecognized line: {text}")]
    UnrecognizedLine { text: String },
    #[error(transparent)]
    MalformedDirective(#[from] DirectiveError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error("duplicate title line ignored: {title}")]
    DuplicateTitle { title: String },
    #[error("{what} has nothing to attach to and was dropped")]
    UnusedDirective { what: String },
    #[error("entry {entry} has no parent entry {parent} to link from")]
    MissingParent { entry: EntryId, parent: EntryId },
    #[error("couldn't find title to link to | {conversation} | {title}")]
    MissingLinkTarget { conversation: String, title: String },
    #[error("'{title}' is an entry title in {matches} conversations; linked to the first")]
    AmbiguousLinkTarget { title: String, matches: usize },
    #[error("link to '{title}' dropped: origin entry {conversation}:{entry} was replaced")]
    StaleLinkOrigin {
        title: String,
        conversation: ConversationId,
        entry: EntryId,
    },
    #[error("{0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A located diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: Option<PathBuf>,
    /// 1-based source line, when the problem maps to one.
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{line}: {}", file.display(), self.kind),
            (Some(file), None) => write!(f, "{}: {}", file.display(), self.kind),
            (None, Some(line)) => write!(f, "line {line}: {}", self.kind),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

/// Collects diagnostics for one import, logging each as it arrives.
#[derive(Debug, Default)]
pub struct Diagnostics {
    file: Option<PathBuf>,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent diagnostics to `file` (or to no file).
    pub fn set_file(&mut self, file: Option<&Path>) {
        self.file = file.map(Path::to_path_buf);
    }

    pub fn error(&mut self, line: Option<usize>, kind: impl Into<DiagnosticKind>) {
        self.push(Severity::Error, line, kind.into());
    }

    pub fn warn(&mut self, line: Option<usize>, kind: impl Into<DiagnosticKind>) {
        self.push(Severity::Warning, line, kind.into());
    }

    fn push(&mut self, severity: Severity, line: Option<usize>, kind: DiagnosticKind) {
        let diagnostic = Diagnostic {
            severity,
            file: self.file.clone(),
            line,
            kind,
        };
        match severity {
            Severity::Warning => warn!("{diagnostic}"),
            Severity::Error => error!("{diagnostic}"),
        }
        self.items.push(diagnostic);
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
