use serde::{Deserialize, Serialize};

/// Identifier of a conversation within a database.
pub type ConversationId = u32;
/// Identifier of an entry, unique within its conversation.
pub type EntryId = u32;
/// Identifier of an actor within a database.
pub type ActorId = u32;

/// Id of the synthetic entry every conversation starts from.
pub const START_ENTRY_ID: EntryId = 0;

/// Title given to the synthetic start entry.
pub const START_ENTRY_TITLE: &str = "START";

/// The persisted dialogue store: actors plus compiled conversations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DialogueDatabase {
    /// Actor that plays the player role, if one has been designated.
    #[serde(default)]
    pub player_id: Option<ActorId>,
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

impl DialogueDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// First conversation whose title matches exactly.
    pub fn conversation_by_title(&self, title: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.title == title)
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Remove every conversation carrying `title`; returns how many were dropped.
    pub fn remove_conversations_titled(&mut self, title: &str) -> usize {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.title != title);
        before - self.conversations.len()
    }

    pub fn insert_conversation(&mut self, conversation: Conversation) {
        self.conversations.push(conversation);
    }

    /// Next unused conversation id (`max + 1`, starting at 1).
    pub fn next_conversation_id(&self) -> ConversationId {
        self.conversations.iter().map(|c| c.id).max().map_or(1, |max| max + 1)
    }

    pub fn actor_by_name(&self, name: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.name == name)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn insert_actor(&mut self, actor: Actor) {
        self.actors.push(actor);
    }

    /// Next unused actor id (`max + 1`, starting at 1).
    pub fn next_actor_id(&self) -> ActorId {
        self.actors.iter().map(|a| a.id).max().map_or(1, |max| max + 1)
    }
}

/// A participant in conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub is_player: bool,
}

/// One compiled dialogue unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub conversant_id: Option<ActorId>,
    #[serde(default)]
    pub entries: Vec<DialogueEntry>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            conversant_id: None,
            entries: Vec::new(),
        }
    }

    pub fn entry(&self, id: EntryId) -> Option<&DialogueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut DialogueEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// First entry whose title matches exactly. Untitled entries never match.
    pub fn entry_by_title(&self, title: &str) -> Option<&DialogueEntry> {
        if title.is_empty() {
            return None;
        }
        self.entries.iter().find(|e| e.title == title)
    }

    pub fn start_entry(&self) -> Option<&DialogueEntry> {
        self.entry(START_ENTRY_ID)
    }
}

/// A node of the compiled dialogue graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueEntry {
    pub id: EntryId,
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub title: String,
    pub actor_id: ActorId,
    #[serde(default)]
    pub conversant_id: Option<ActorId>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub outgoing_links: Vec<Link>,
}

impl DialogueEntry {
    pub fn new(id: EntryId, conversation_id: ConversationId, actor_id: ActorId) -> Self {
        Self {
            id,
            conversation_id,
            title: String::new(),
            actor_id,
            conversant_id: None,
            text: String::new(),
            script: String::new(),
            condition: String::new(),
            sequence: String::new(),
            is_group: false,
            outgoing_links: Vec::new(),
        }
    }

    /// Append a link from this entry to `(conversation, entry)`.
    pub fn link_to(&mut self, conversation: ConversationId, entry: EntryId) {
        self.outgoing_links
            .push(Link::new(self.conversation_id, self.id, conversation, entry));
    }

    pub fn links_to(&self, conversation: ConversationId, entry: EntryId) -> bool {
        self.outgoing_links
            .iter()
            .any(|l| l.destination_conversation == conversation && l.destination_entry == entry)
    }
}

/// Directed edge between two entries, possibly across conversations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub origin_conversation: ConversationId,
    pub origin_entry: EntryId,
    pub destination_conversation: ConversationId,
    pub destination_entry: EntryId,
}

impl Link {
    pub fn new(
        origin_conversation: ConversationId,
        origin_entry: EntryId,
        destination_conversation: ConversationId,
        destination_entry: EntryId,
    ) -> Self {
        Self {
            origin_conversation,
            origin_entry,
            destination_conversation,
            destination_entry,
        }
    }
}
