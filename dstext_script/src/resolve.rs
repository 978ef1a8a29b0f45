//! Batch-end resolution of deferred title links.
//!
//! [`resolve_pending`] only reads the database and reports what it would
//! link; [`apply_resolution`] performs the writes.

use dstext_data::{ConversationId, DialogueDatabase, EntryId, Link};

use crate::assemble::{EntryRef, PendingLink};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Something that kept a pending link from resolving cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveIssue {
    /// No entry anywhere carries the title; the link is omitted.
    Missing { conversation: String, title: String },
    /// Several conversations carry the title; the first was used.
    Ambiguous { title: String, matches: usize },
    /// The origin entry no longer exists.
    StaleOrigin { title: String, origin: EntryRef },
}

impl ResolveIssue {
    pub fn report(self, diags: &mut Diagnostics) {
        match self {
            ResolveIssue::Missing { conversation, title } => {
                diags.error(None, DiagnosticKind::MissingLinkTarget { conversation, title });
            },
            ResolveIssue::Ambiguous { title, matches } => {
                diags.warn(None, DiagnosticKind::AmbiguousLinkTarget { title, matches });
            },
            ResolveIssue::StaleOrigin { title, origin } => diags.warn(
                None,
                DiagnosticKind::StaleLinkOrigin {
                    title,
                    conversation: origin.conversation,
                    entry: origin.entry,
                },
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub links: Vec<Link>,
    pub issues: Vec<ResolveIssue>,
}

/// Resolve every pending link against the whole database.
///
/// The origin's own conversation is searched first; after that every
/// conversation in database order, entries in order, first match wins.
pub fn resolve_pending(db: &DialogueDatabase, pending: &[PendingLink]) -> Resolution {
    let mut resolution = Resolution::default();
    for link in pending {
        let Some(origin) = db
            .conversation(link.origin.conversation)
            .filter(|c| c.entry(link.origin.entry).is_some())
        else {
            resolution.issues.push(ResolveIssue::StaleOrigin {
                title: link.title.clone(),
                origin: link.origin,
            });
            continue;
        };

        let target = match origin.entry_by_title(&link.title) {
            Some(entry) => Some((origin.id, entry.id)),
            None => search_all(db, &link.title, &mut resolution.issues),
        };
        match target {
            Some((conversation, entry)) => resolution.links.push(Link::new(
                link.origin.conversation,
                link.origin.entry,
                conversation,
                entry,
            )),
            None => resolution.issues.push(ResolveIssue::Missing {
                conversation: origin.title.clone(),
                title: link.title.clone(),
            }),
        }
    }
    resolution
}

fn search_all(db: &DialogueDatabase, title: &str, issues: &mut Vec<ResolveIssue>) -> Option<(ConversationId, EntryId)> {
    let mut matches = db
        .conversations
        .iter()
        .filter_map(|c| c.entry_by_title(title).map(|e| (c.id, e.id)));
    let first = matches.next()?;
    let others = matches.count();
    if others > 0 {
        issues.push(ResolveIssue::Ambiguous {
            title: title.to_string(),
            matches: others + 1,
        });
    }
    Some(first)
}

/// Append resolved links to their origin entries; returns how many landed.
pub fn apply_resolution(db: &mut DialogueDatabase, resolution: &Resolution) -> usize {
    let mut applied = 0;
    for link in &resolution.links {
        if let Some(entry) = db
            .conversation_mut(link.origin_conversation)
            .and_then(|c| c.entry_mut(link.origin_entry))
        {
            entry.outgoing_links.push(*link);
            applied += 1;
        }
    }
    applied
}
