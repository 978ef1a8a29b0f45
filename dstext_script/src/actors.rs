//! Actor registry over the dialogue database's actor table.

use dstext_data::{Actor, ActorId, DialogueDatabase};
use log::info;

/// Id of the actor called `name`, creating it with the next free id if needed.
pub fn get_or_create_actor(db: &mut DialogueDatabase, name: &str, is_player: bool) -> ActorId {
    if let Some(actor) = db.actor_by_name(name) {
        return actor.id;
    }
    let id = db.next_actor_id();
    info!("creating actor '{name}' ({id})");
    db.insert_actor(Actor {
        id,
        name: name.to_string(),
        is_player,
    });
    id
}

/// The database's designated player actor.
///
/// Falls back to (and designates) the actor called `fallback_name` when no
/// valid player is set.
pub fn player_actor(db: &mut DialogueDatabase, fallback_name: &str) -> ActorId {
    if let Some(id) = db.player_id
        && db.actor(id).is_some()
    {
        return id;
    }
    let id = get_or_create_actor(db, fallback_name, true);
    db.player_id = Some(id);
    id
}
