use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::*;

/// Structural problem found in a [`DialogueDatabase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    DuplicateTitle { title: String },
    MissingReference { kind: &'static str, id: String, context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::DuplicateTitle { title } => {
                write!(f, "duplicate conversation title '{title}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate ids and cross-references in a dialogue database.
///
/// Numeric links written by hand can point at entries that do not exist;
/// those surface here as missing `entry` references.
///
/// ```
/// use dstext_data::{Actor, Conversation, DialogueDatabase, DialogueEntry, validate_database};
///
/// let mut db = DialogueDatabase::new();
/// db.insert_actor(Actor { id: 1, name: "Player".into(), is_player: true });
/// db.player_id = Some(1);
/// let mut convo = Conversation::new(1, "Demo");
/// convo.entries.push(DialogueEntry::new(0, 1, 1));
/// db.insert_conversation(convo);
/// assert!(validate_database(&db).is_empty());
/// ```
pub fn validate_database(db: &DialogueDatabase) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut actors = HashSet::new();
    track_ids("actor", db.actors.iter().map(|a| a.id), &mut actors, &mut errors);

    let mut conversations = HashSet::new();
    track_ids(
        "conversation",
        db.conversations.iter().map(|c| c.id),
        &mut conversations,
        &mut errors,
    );

    let mut titles = HashSet::new();
    for convo in &db.conversations {
        if convo.title.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("conversation {} has an empty title", convo.id),
            });
        } else if !titles.insert(convo.title.as_str()) {
            errors.push(ValidationError::DuplicateTitle {
                title: convo.title.clone(),
            });
        }
    }

    match db.player_id {
        Some(id) => check_ref("actor", id, &actors, "database player".to_string(), &mut errors),
        None if !db.conversations.is_empty() => errors.push(ValidationError::InvalidValue {
            context: "no player actor designated".to_string(),
        }),
        None => {},
    }

    // entry ids per conversation, for link destination checks
    let mut entry_ids: HashMap<ConversationId, HashSet<EntryId>> = HashMap::new();
    for convo in &db.conversations {
        let mut ids = HashSet::new();
        for entry in &convo.entries {
            if !ids.insert(entry.id) {
                errors.push(ValidationError::DuplicateId {
                    kind: "entry",
                    id: format!("{}:{}", convo.id, entry.id),
                });
            }
        }
        if !ids.contains(&START_ENTRY_ID) {
            errors.push(ValidationError::MissingReference {
                kind: "entry",
                id: format!("{}:{START_ENTRY_ID}", convo.id),
                context: format!("start entry of '{}'", convo.title),
            });
        }
        entry_ids.entry(convo.id).or_default().extend(ids);
    }

    for convo in &db.conversations {
        if let Some(conversant) = convo.conversant_id {
            check_ref(
                "actor",
                conversant,
                &actors,
                format!("conversant of '{}'", convo.title),
                &mut errors,
            );
        }
        for entry in &convo.entries {
            let context = format!("entry {} of '{}'", entry.id, convo.title);
            validate_entry(convo, entry, &actors, &entry_ids, &context, &mut errors);
        }
    }

    errors
}

fn validate_entry(
    convo: &Conversation,
    entry: &DialogueEntry,
    actors: &HashSet<ActorId>,
    entry_ids: &HashMap<ConversationId, HashSet<EntryId>>,
    context: &str,
    errors: &mut Vec<ValidationError>,
) {
    if entry.conversation_id != convo.id {
        errors.push(ValidationError::InvalidValue {
            context: format!("{context} claims conversation {}", entry.conversation_id),
        });
    }
    check_ref("actor", entry.actor_id, actors, format!("{context} actor"), errors);
    if let Some(conversant) = entry.conversant_id {
        check_ref("actor", conversant, actors, format!("{context} conversant"), errors);
    }
    for link in &entry.outgoing_links {
        if link.origin_conversation != convo.id || link.origin_entry != entry.id {
            errors.push(ValidationError::InvalidValue {
                context: format!(
                    "{context} holds a link originating at {}:{}",
                    link.origin_conversation, link.origin_entry
                ),
            });
        }
        match entry_ids.get(&link.destination_conversation) {
            None => errors.push(ValidationError::MissingReference {
                kind: "conversation",
                id: link.destination_conversation.to_string(),
                context: format!("{context} link"),
            }),
            Some(ids) if !ids.contains(&link.destination_entry) => {
                errors.push(ValidationError::MissingReference {
                    kind: "entry",
                    id: format!("{}:{}", link.destination_conversation, link.destination_entry),
                    context: format!("{context} link"),
                });
            },
            Some(_) => {},
        }
    }
}

fn track_ids(
    kind: &'static str,
    ids: impl Iterator<Item = u32>,
    set: &mut HashSet<u32>,
    errors: &mut Vec<ValidationError>,
) {
    for id in ids {
        if !set.insert(id) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

fn check_ref(kind: &'static str, id: u32, set: &HashSet<u32>, context: String, errors: &mut Vec<ValidationError>) {
    if !set.contains(&id) {
        errors.push(ValidationError::MissingReference {
            kind,
            id: id.to_string(),
            context,
        });
    }
}
