//! dstext_script: compiler for indentation-structured dialogue scripts.
//!
//! A script describes one conversation:
//!
//! ```text
//! title: Gatehouse
//! npc: Guard
//! ---
//! Guard: Halt! Who goes there?
//! 	A friend. ->
//! 		<<script Reputation += 1>>
//! 		Guard: Pass, friend.
//! 	<<title Bluff>>
//! 	Nobody important. ->
//! 		<<link Gatehouse Alarm>>
//! 		Guard: Hold it right there.
//! ===
//! ```
//!
//! Depth is the number of leading tabs. Each file goes through the line classifier
//! ([`lexer`]), the tree builder ([`tree`]) and the graph assembler
//! ([`assemble`]); title links that name entries in other files are resolved
//! once the whole batch is in ([`resolve`], driven by [`batch`]).

pub mod actors;
pub mod assemble;
pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod resolve;
pub mod store;
pub mod template;
pub mod tree;

pub use assemble::{Assembly, EntryRef, PendingLink, assemble_conversation};
pub use batch::{DirectoryScan, ImportReport, ImportedConversation, Importer, collect_script_files, import_batch};
pub use config::{ImportOptions, ProjectConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity, StructureError};
pub use lexer::{Element, ElementKind, Lexer, NumericLink};
pub use resolve::{Resolution, ResolveIssue, apply_resolution, resolve_pending};
pub use store::{StoreError, load_database, load_or_new, save_database};
pub use tree::{Node, NodeKind, TreeBuilder, parse_script};
