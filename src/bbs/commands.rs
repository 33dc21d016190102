//! Command execution for the line protocol.
//!
//! The primary entrypoint is [`CommandProcessor::process`], which takes a
//! parsed [`Command`], mutates registry/group state, and returns an explicit
//! [`Outcome`] instead of writing to a socket. Replies and notifications are
//! enqueued onto the relevant sessions' outbound channels while the registry
//! lock is still held; that is what makes a join's membership insertion and
//! backfill atomic with respect to concurrent posts and leaves in the same
//! group, and it keeps the per-group notification order equal to the history
//! append order.
//!
//! Protocol and state errors are plain `ERR <REASON>` reply lines; no command
//! here can fail the connection, let alone the process.

use log::{debug, info};

use super::dispatch::Command;
use super::group::Group;
use super::message::Message;
use super::server::{Registry, RegistryInner};
use super::session::{SessionId, SessionRecord, SessionState};
use crate::logutil::escape_log;
use crate::validation::validate_username;

/// Result of executing one command: the reply lines sent to the calling
/// session and whether the connection should close afterwards.
#[derive(Debug, Default)]
pub struct Outcome {
    pub replies: Vec<String>,
    pub close: bool,
}

impl Outcome {
    fn reply(line: impl Into<String>) -> Self {
        Outcome {
            replies: vec![line.into()],
            close: false,
        }
    }
}

/// Processes protocol commands on behalf of sessions.
pub struct CommandProcessor;

impl CommandProcessor {
    pub fn new() -> Self {
        CommandProcessor
    }

    /// Execute one command for `session_id`.
    ///
    /// Holds the registry lock for the whole command; replies are enqueued
    /// before the lock drops.
    pub async fn process(
        &self,
        registry: &Registry,
        session_id: SessionId,
        command: Command,
    ) -> Outcome {
        let mut inner = registry.lock().await;
        let outcome = match command {
            Command::Empty => Outcome::default(),
            Command::Ping => Outcome::reply("PONG"),
            Command::Quit => quit(&mut inner, session_id),
            Command::Groups => Outcome::reply(registry.groups_line()),
            Command::Unknown(verb) => {
                debug!(
                    "session {}: unknown command {}",
                    session_id,
                    escape_log(&verb)
                );
                Outcome::reply("ERR UNKNOWN_COMMAND")
            }
            Command::Login(name) => login(&mut inner, session_id, &name),
            Command::Join(ident) => join(&mut inner, registry, session_id, &ident),
            Command::Leave(ident) => leave(&mut inner, session_id, &ident),
            Command::Message { group, body } => {
                post_message(&mut inner, registry, session_id, &group, &body)
            }
            Command::GetMessage(arg) => get_message(&inner, session_id, &arg),
            Command::Users(ident) => users(&inner, session_id, &ident),
        };
        inner.send_lines(session_id, &outcome.replies);
        outcome
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn quit(inner: &mut RegistryInner, session_id: SessionId) -> Outcome {
    if let Some(record) = inner.sessions.get_mut(&session_id) {
        record.state = SessionState::Closed;
    }
    Outcome {
        replies: vec!["BYE".to_string()],
        close: true,
    }
}

fn login(inner: &mut RegistryInner, session_id: SessionId, raw_name: &str) -> Outcome {
    let Some(record) = inner.sessions.get(&session_id) else {
        return Outcome::default();
    };
    if record.is_logged_in() {
        return Outcome::reply("ERR ALREADY_LOGGED_IN");
    }

    let name = match validate_username(raw_name) {
        Ok(name) => name,
        Err(err) => {
            debug!(
                "session {}: rejected username '{}': {}",
                session_id,
                escape_log(raw_name),
                err
            );
            return Outcome::reply("ERR INVALID_USERNAME");
        }
    };

    // Check-then-set runs under the registry lock: of two concurrent logins
    // claiming the same name, exactly one sees it free.
    if inner.username_taken(&name) {
        return Outcome::reply("ERR USERNAME_EXISTS");
    }

    if let Some(record) = inner.sessions.get_mut(&session_id) {
        record.username = Some(name.clone());
        record.state = SessionState::Authenticated;
    }
    info!("session {} logged in as {}", session_id, name);
    Outcome::reply("OK LOGIN")
}

fn join(
    inner: &mut RegistryInner,
    registry: &Registry,
    session_id: SessionId,
    ident: &str,
) -> Outcome {
    let Some(username) = logged_in_name(inner, session_id) else {
        return Outcome::reply("ERR NOT_LOGGED_IN");
    };
    let Some(gidx) = inner.group_index(ident) else {
        return Outcome::reply("ERR GROUP_NOT_FOUND");
    };
    if inner.groups[gidx].is_member(session_id) {
        return Outcome::reply("ERR ALREADY_JOINED");
    }

    let RegistryInner { sessions, groups } = inner;
    let group = &mut groups[gidx];
    group.add_member(session_id);
    if let Some(record) = sessions.get_mut(&session_id) {
        record.joined.insert(group.id);
    }

    // Backfill: member list first, then the most recent messages in post
    // order, all enqueued under the same lock as the membership insertion.
    let mut replies = vec![format!("OK JOIN {}", group.name)];
    let others = member_names(group, sessions, session_id);
    replies.push(users_line(group.id, &others));
    for message in group.recent_messages(registry.backfill_count()) {
        replies.push(format!("MESSAGE_SUMMARY {} {}", group.id, message.summary()));
    }

    group.broadcast(
        &format!("USER_JOINED {} {}", group.id, username),
        Some(session_id),
        sessions,
    );
    info!("{} joined group {} ({})", username, group.id, group.name);

    Outcome {
        replies,
        close: false,
    }
}

fn leave(inner: &mut RegistryInner, session_id: SessionId, ident: &str) -> Outcome {
    let Some(username) = logged_in_name(inner, session_id) else {
        return Outcome::reply("ERR NOT_LOGGED_IN");
    };
    let Some(gidx) = inner.group_index(ident) else {
        return Outcome::reply("ERR GROUP_NOT_FOUND");
    };
    if !inner.groups[gidx].is_member(session_id) {
        return Outcome::reply("ERR NOT_MEMBER");
    }

    let RegistryInner { sessions, groups } = inner;
    let group = &mut groups[gidx];
    group.remove_member(session_id);
    if let Some(record) = sessions.get_mut(&session_id) {
        record.joined.remove(&group.id);
    }

    group.broadcast(
        &format!("USER_LEFT {} {}", group.id, username),
        Some(session_id),
        sessions,
    );
    info!("{} left group {} ({})", username, group.id, group.name);

    Outcome::reply(format!("OK LEAVE {}", group.name))
}

fn post_message(
    inner: &mut RegistryInner,
    registry: &Registry,
    session_id: SessionId,
    ident: &str,
    body: &str,
) -> Outcome {
    let Some(username) = logged_in_name(inner, session_id) else {
        return Outcome::reply("ERR NOT_LOGGED_IN");
    };
    let Some(gidx) = inner.group_index(ident) else {
        return Outcome::reply("ERR GROUP_NOT_FOUND");
    };
    if !inner.groups[gidx].is_member(session_id) {
        return Outcome::reply("ERR NOT_MEMBER");
    }
    if body.trim().is_empty() {
        return Outcome::reply("ERR INVALID_FORMAT");
    }

    // Split once on the first '|': left is the subject, right the content.
    // Without a '|' the whole body is content and the subject defaults.
    let (subject, content) = match body.split_once('|') {
        Some((subject, content)) => (subject.trim(), content.trim()),
        None => ("", body.trim()),
    };

    let message = Message::new(registry.allocate_message_id(), &username, subject, content);
    let summary = message.summary();

    let RegistryInner { sessions, groups } = inner;
    let group = &mut groups[gidx];
    group.broadcast(
        &format!("NEW_MESSAGE {} {}", group.id, summary),
        Some(session_id),
        sessions,
    );
    info!(
        "{} posted message {} to group {}",
        username, message.id, group.id
    );
    group.post(message);

    Outcome::reply("OK MESSAGE")
}

fn get_message(inner: &RegistryInner, session_id: SessionId, arg: &str) -> Outcome {
    if logged_in_name(inner, session_id).is_none() {
        return Outcome::reply("ERR NOT_LOGGED_IN");
    }
    let Ok(message_id) = arg.parse::<u64>() else {
        return Outcome::reply("ERR INVALID_MESSAGE_ID");
    };

    // Visibility is membership-gated: a message that exists only in a group
    // the caller never joined is reported as not found, not as forbidden.
    match inner.find_message(message_id) {
        Some((gidx, message)) if inner.groups[gidx].is_member(session_id) => {
            Outcome::reply(message.content.clone())
        }
        _ => Outcome::reply("ERR MESSAGE_NOT_FOUND"),
    }
}

fn users(inner: &RegistryInner, session_id: SessionId, ident: &str) -> Outcome {
    if logged_in_name(inner, session_id).is_none() {
        return Outcome::reply("ERR NOT_LOGGED_IN");
    }
    let Some(gidx) = inner.group_index(ident) else {
        return Outcome::reply("ERR GROUP_NOT_FOUND");
    };
    let group = &inner.groups[gidx];
    if !group.is_member(session_id) {
        return Outcome::reply("ERR NOT_MEMBER");
    }

    let names = member_names(group, &inner.sessions, session_id);
    Outcome::reply(users_line(group.id, &names))
}

fn logged_in_name(inner: &RegistryInner, session_id: SessionId) -> Option<String> {
    inner
        .sessions
        .get(&session_id)
        .and_then(|record| record.username.clone())
}

/// Usernames of the group's members excluding `exclude`, sorted for stable
/// output.
fn member_names(
    group: &Group,
    sessions: &std::collections::HashMap<SessionId, SessionRecord>,
    exclude: SessionId,
) -> Vec<String> {
    let mut names: Vec<String> = group
        .members()
        .filter(|member| *member != exclude)
        .filter_map(|member| sessions.get(&member)?.username.clone())
        .collect();
    names.sort();
    names
}

fn users_line(group_id: u32, names: &[String]) -> String {
    if names.is_empty() {
        format!("USERS {}", group_id)
    } else {
        format!("USERS {} {}", group_id, names.join(","))
    }
}
