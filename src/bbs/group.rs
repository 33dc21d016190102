//! Topic groups: membership, append-only message history, and fan-out.
//!
//! A group holds session *ids*, not session handles; the id is resolved
//! against the registry's live session table at delivery time. That keeps the
//! group↔session relationship a pair of index lookups instead of a cycle of
//! owning references.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::message::Message;
use super::session::{SessionId, SessionRecord};

/// A named topic with a membership set and its own message history.
///
/// `id` and `name` are fixed at startup; `members` changes with
/// join/leave/disconnect; `messages` only ever grows, and its insertion order
/// is both the visibility order and the broadcast order.
#[derive(Debug)]
pub struct Group {
    pub id: u32,
    pub name: String,
    members: HashSet<SessionId>,
    messages: Vec<Message>,
}

impl Group {
    pub fn new(id: u32, name: &str) -> Self {
        Group {
            id,
            name: name.to_string(),
            members: HashSet::new(),
            messages: Vec::new(),
        }
    }

    /// Add a session to the membership set. Returns false if it was already a
    /// member.
    pub fn add_member(&mut self, session_id: SessionId) -> bool {
        self.members.insert(session_id)
    }

    /// Remove a session from the membership set. Removing a non-member is a
    /// no-op, not an error.
    pub fn remove_member(&mut self, session_id: SessionId) -> bool {
        self.members.remove(&session_id)
    }

    pub fn is_member(&self, session_id: SessionId) -> bool {
        self.members.contains(&session_id)
    }

    pub fn members(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.members.iter().copied()
    }

    /// Append a message to the history.
    pub fn post(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `count` messages in post order (fewer if the history is
    /// shorter). Used to backfill a newly joined member.
    pub fn recent_messages(&self, count: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    /// Deliver `text` as one line to every current member except `exclude`.
    ///
    /// Delivery is an enqueue onto each member's outbound channel; a member
    /// whose channel has closed is skipped so one dead peer never fails the
    /// broadcast for the rest.
    pub fn broadcast(
        &self,
        text: &str,
        exclude: Option<SessionId>,
        sessions: &HashMap<SessionId, SessionRecord>,
    ) {
        for member in self.members() {
            if Some(member) == exclude {
                continue;
            }
            match sessions.get(&member) {
                Some(record) => {
                    if !record.send(text) {
                        debug!(
                            "group {}: session {} outbound closed, skipping",
                            self.id, member
                        );
                    }
                }
                None => debug!(
                    "group {}: member {} has no live session, skipping",
                    self.id, member
                ),
            }
        }
    }
}
