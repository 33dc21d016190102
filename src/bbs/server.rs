//! # BBS Server - Core Application Controller
//!
//! [`BbsServer`] owns the TCP listener and the accept loop; [`Registry`] owns
//! everything the sessions share: the live session table, the fixed group
//! set, and the message-id allocator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  BbsServer      │ ← accept loop, one task per connection
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Registry       │ ← shared state: sessions, groups, id allocators
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Session /      │ ← per-connection line loop and command execution
//! │  Commands       │
//! └─────────────────┘
//! ```
//!
//! ## Locking
//!
//! All shared mutable state sits behind one mutex ([`Registry::lock`]). Every
//! command executes entirely under that lock, which gives the invariants the
//! protocol depends on: login's check-then-set is atomic, a member snapshot
//! taken for a broadcast or backfill never observes a half-applied
//! join/leave, and the per-group notification order equals the history
//! append order. Socket writes never happen under the lock; delivery is an
//! enqueue onto per-session channels drained by independent writer tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, MutexGuard};

use super::group::Group;
use super::message::Message;
use super::session::{Session, SessionId, SessionRecord};
use crate::config::Config;

/// The netbbs server: binds, accepts, and spawns one [`Session`] per
/// connection. There is no admission control; every connection that the
/// listener yields gets a session.
///
/// ## Usage
///
/// ```rust,no_run
/// use netbbs::bbs::BbsServer;
/// use netbbs::config::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config.toml").await?;
///     BbsServer::new(config).run().await
/// }
/// ```
pub struct BbsServer {
    config: Config,
    registry: Arc<Registry>,
}

impl BbsServer {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(Registry::new(&config));
        BbsServer { config, registry }
    }

    /// Bind the configured address and run the accept loop.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.bind, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Run the accept loop on an already-bound listener. Tests bind to an
    /// ephemeral port themselves and hand the listener over.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("server listening on {}", listener.local_addr()?);
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let session_id = self.registry.allocate_session_id();
                    info!("new client: {} (session {})", peer, session_id);
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(err) = Session::new(session_id, registry).run(stream).await {
                            debug!("session {} ended with error: {}", session_id, err);
                        }
                    });
                }
                Err(err) => warn!("failed to accept connection: {}", err),
            }
        }
    }
}

/// Shared server state and the allocators sessions draw from.
pub struct Registry {
    inner: Mutex<RegistryInner>,
    groups_banner: String,
    backfill_count: usize,
    next_session_id: AtomicU64,
    next_message_id: AtomicU64,
}

/// The lock-guarded portion of the registry. Groups hold member session ids;
/// session records hold joined group ids; both sides resolve through this
/// struct rather than referencing each other.
pub(crate) struct RegistryInner {
    pub(crate) sessions: HashMap<SessionId, SessionRecord>,
    pub(crate) groups: Vec<Group>,
}

impl Registry {
    /// Build the registry from configuration. The group set is instantiated
    /// here, once, and never changes afterwards.
    pub fn new(config: &Config) -> Self {
        let groups: Vec<Group> = config
            .groups
            .iter()
            .map(|g| Group::new(g.id, &g.name))
            .collect();
        let groups_banner = config
            .groups
            .iter()
            .map(|g| format!("{}:{}", g.id, g.name))
            .collect::<Vec<_>>()
            .join(",");

        Registry {
            inner: Mutex::new(RegistryInner {
                sessions: HashMap::new(),
                groups,
            }),
            groups_banner,
            backfill_count: config.server.backfill_count,
            next_session_id: AtomicU64::new(1),
            next_message_id: AtomicU64::new(1),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().await
    }

    pub fn allocate_session_id(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Message ids are unique for the process lifetime and reset only on
    /// restart.
    pub fn allocate_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn backfill_count(&self) -> usize {
        self.backfill_count
    }

    /// The full `GROUPS <id:name,...>` reply line, also used as part of the
    /// connection greeting.
    pub fn groups_line(&self) -> String {
        if self.groups_banner.is_empty() {
            "GROUPS".to_string()
        } else {
            format!("GROUPS {}", self.groups_banner)
        }
    }

    /// Insert a freshly accepted session into the live table.
    pub async fn register(&self, session_id: SessionId, outbound: mpsc::UnboundedSender<String>) {
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(session_id, SessionRecord::new(outbound));
        debug!("session {} registered", session_id);
    }

    /// Tear a session down: drop it from every group it had joined, notify
    /// each group's remaining members, then free its slot (and username).
    /// Removing an already-removed session is a no-op.
    pub async fn remove(&self, session_id: SessionId) {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.sessions.remove(&session_id) else {
            return;
        };
        let username = record.username;
        let joined = record.joined;

        let RegistryInner { sessions, groups } = &mut *inner;
        if let Some(username) = username {
            for group_id in joined {
                if let Some(group) = groups.iter_mut().find(|g| g.id == group_id) {
                    group.remove_member(session_id);
                    group.broadcast(
                        &format!("USER_LEFT {} {}", group.id, username),
                        None,
                        sessions,
                    );
                }
            }
            info!("user {} disconnected (session {})", username, session_id);
        } else {
            debug!("session {} closed before login", session_id);
        }
    }
}

impl RegistryInner {
    /// Resolve a group by exact numeric id or case-insensitive name.
    pub(crate) fn group_index(&self, ident: &str) -> Option<usize> {
        if ident.is_empty() {
            return None;
        }
        if let Ok(id) = ident.parse::<u32>() {
            if let Some(idx) = self.groups.iter().position(|g| g.id == id) {
                return Some(idx);
            }
        }
        let lowered = ident.to_lowercase();
        self.groups
            .iter()
            .position(|g| g.name.to_lowercase() == lowered)
    }

    /// Case-insensitive membership test over all live sessions' usernames.
    pub(crate) fn username_taken(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.sessions.values().any(|record| {
            record
                .username
                .as_deref()
                .is_some_and(|existing| existing.to_lowercase() == lowered)
        })
    }

    /// Linear scan across every group's history. Fine at this scale; an
    /// id index would be the next step if histories grew large.
    pub(crate) fn find_message(&self, message_id: u64) -> Option<(usize, &Message)> {
        self.groups.iter().enumerate().find_map(|(idx, group)| {
            group
                .messages()
                .iter()
                .find(|m| m.id == message_id)
                .map(|m| (idx, m))
        })
    }

    /// Enqueue reply lines onto one session's outbound channel.
    pub(crate) fn send_lines(&self, session_id: SessionId, lines: &[String]) {
        if let Some(record) = self.sessions.get(&session_id) {
            for line in lines {
                if !record.send(line) {
                    debug!("session {} outbound closed, dropping reply", session_id);
                    break;
                }
            }
        }
    }
}
