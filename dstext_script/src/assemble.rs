//! Graph assembler: lowers one file's node forest into a conversation.
//!
//! Title links that do not name an entry already assembled in the same
//! conversation are queued as [`PendingLink`]s for the batch-end resolver.

use dstext_data::{
    ActorId, Conversation, ConversationId, DialogueDatabase, DialogueEntry, EntryId, START_ENTRY_ID, START_ENTRY_TITLE,
};
use log::info;

use crate::actors::{get_or_create_actor, player_actor};
use crate::config::ImportOptions;
use crate::diagnostics::{DiagnosticKind, Diagnostics, StructureError};
use crate::tree::{EntryFields, Node, NodeKind};

/// Title given to sequence nodes without an override title.
pub const SEQUENCE_ENTRY_TITLE: &str = "Sequence";

/// Address of an entry in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub conversation: ConversationId,
    pub entry: EntryId,
}

/// A title link waiting for the whole batch to be assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    pub title: String,
    pub origin: EntryRef,
}

/// Summary of one assembled conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub conversation: ConversationId,
    pub title: String,
    /// A conversation with the same title was replaced.
    pub replaced: bool,
    /// Entry count including START.
    pub entries: usize,
}

/// Build a conversation from `nodes` and insert it into `db`.
///
/// A conversation already stored under the same title keeps its id but is
/// replaced, not merged. Pending links that originated in the replaced
/// conversation earlier in the batch are dropped with a warning.
///
/// # Errors
/// Returns [`StructureError::MissingTitle`] when the first node is not a title.
pub fn assemble_conversation(
    nodes: &[Node],
    db: &mut DialogueDatabase,
    options: &ImportOptions,
    pending: &mut Vec<PendingLink>,
    diags: &mut Diagnostics,
) -> Result<Assembly, StructureError> {
    let Some(Node {
        kind: NodeKind::Title(title),
        ..
    }) = nodes.first()
    else {
        return Err(StructureError::MissingTitle);
    };

    let replaced = db.conversation_by_title(title).map(|c| c.id);
    let id = match replaced {
        Some(id) => {
            db.remove_conversations_titled(title);
            info!("replacing conversation '{title}' ({id})");
            drop_stale_links(pending, id, diags);
            id
        },
        None => db.next_conversation_id(),
    };

    let player = player_actor(db, &options.player_name);
    let mut conversation = Conversation::new(id, title.clone());
    let mut start = DialogueEntry::new(START_ENTRY_ID, id, player);
    start.title = START_ENTRY_TITLE.to_string();
    start.sequence = options.start_sequence.clone();
    conversation.entries.push(start);

    for node in &nodes[1..] {
        let (entry, fields) = match &node.kind {
            NodeKind::Title(_) => continue,
            NodeKind::Conversant(name) => {
                let actor = get_or_create_actor(db, name, false);
                conversation.conversant_id = Some(actor);
                if let Some(start) = conversation.entry_mut(START_ENTRY_ID) {
                    start.conversant_id = Some(actor);
                }
                continue;
            },
            kind => (build_entry(node.id, kind, &conversation, db, player), kind.fields()),
        };
        let Some(fields) = fields else { continue };
        link_entry(nodes, node, entry, fields, &mut conversation, pending, diags);
    }

    let assembly = Assembly {
        conversation: id,
        title: title.clone(),
        replaced: replaced.is_some(),
        entries: conversation.entries.len(),
    };
    info!("Adding Conversation | {title} ({id}, {} entries)", assembly.entries);
    db.insert_conversation(conversation);
    Ok(assembly)
}

fn build_entry(
    id: EntryId,
    kind: &NodeKind,
    conversation: &Conversation,
    db: &mut DialogueDatabase,
    player: ActorId,
) -> DialogueEntry {
    let mut entry = DialogueEntry::new(id, conversation.id, player);
    entry.conversant_id = conversation.conversant_id;
    match kind {
        NodeKind::Speak { actor, text, fields } => {
            entry.actor_id = get_or_create_actor(db, actor, false);
            entry.conversant_id = Some(player);
            entry.text = text.clone();
            apply_fields(&mut entry, fields);
        },
        NodeKind::Reply { text, fields } => {
            entry.text = text.clone();
            apply_fields(&mut entry, fields);
        },
        NodeKind::Group { title, fields } => {
            entry.is_group = true;
            apply_fields(&mut entry, fields);
            if !title.trim().is_empty() {
                entry.title = title.clone();
            }
        },
        NodeKind::SequenceNode { sequence, fields } => {
            entry.title = SEQUENCE_ENTRY_TITLE.to_string();
            apply_fields(&mut entry, fields);
            entry.sequence = sequence.clone();
        },
        NodeKind::Title(_) | NodeKind::Conversant(_) => {},
    }
    entry
}

fn apply_fields(entry: &mut DialogueEntry, fields: &EntryFields) {
    if let Some(title) = &fields.title {
        entry.title = title.clone();
    }
    if let Some(script) = &fields.script {
        entry.script = script.clone();
    }
    if let Some(condition) = &fields.condition {
        entry.condition = condition.clone();
    }
    if let Some(sequence) = &fields.sequence {
        entry.sequence = sequence.clone();
    }
}

/// Add the parent edge and the node's own links, then store the entry.
fn link_entry(
    nodes: &[Node],
    node: &Node,
    mut entry: DialogueEntry,
    fields: &EntryFields,
    conversation: &mut Conversation,
    pending: &mut Vec<PendingLink>,
    diags: &mut Diagnostics,
) {
    let convo_id = conversation.id;
    let parent_id = node
        .parent
        .and_then(|p| nodes.get(p))
        .map_or(START_ENTRY_ID, |parent| parent.id);
    match conversation.entry_mut(parent_id) {
        Some(parent) => parent.link_to(convo_id, entry.id),
        None => diags.warn(
            Some(node.line),
            DiagnosticKind::MissingParent {
                entry: entry.id,
                parent: parent_id,
            },
        ),
    }

    for link in &fields.links {
        entry.link_to(link.conversation.unwrap_or(convo_id), link.entry);
    }

    for title in &fields.title_links {
        match conversation.entry_by_title(title) {
            Some(target) => entry.link_to(convo_id, target.id),
            None => pending.push(PendingLink {
                title: title.clone(),
                origin: EntryRef {
                    conversation: convo_id,
                    entry: entry.id,
                },
            }),
        }
    }

    conversation.entries.push(entry);
}

fn drop_stale_links(pending: &mut Vec<PendingLink>, replaced: ConversationId, diags: &mut Diagnostics) {
    let (stale, keep): (Vec<_>, Vec<_>) = std::mem::take(pending)
        .into_iter()
        .partition(|p| p.origin.conversation == replaced);
    *pending = keep;
    for link in stale {
        diags.warn(
            None,
            DiagnosticKind::StaleLinkOrigin {
                title: link.title,
                conversation: link.origin.conversation,
                entry: link.origin.entry,
            },
        );
    }
}
