//! Starter content for new script files.

pub const DEFAULT_NEW_TITLE: &str = "NewConversation";
pub const DEFAULT_NEW_NPC: &str = "System";

/// Text of a fresh script: a header, and an empty body between separators.
pub fn new_script(title: &str, npc: &str) -> String {
    format!("title: {title}\nnpc: {npc}\n---\n\n===\n")
}
