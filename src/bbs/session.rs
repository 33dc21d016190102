//! # User Session Management
//!
//! One [`Session`] drives one client connection. The reader half of the
//! socket is consumed line by line in [`Session::run`]; the writer half is
//! handed to a dedicated task that drains the session's outbound channel, so
//! writes to a slow or dead peer never stall command handling or broadcasts
//! originating from other sessions.
//!
//! ## Session Lifecycle
//!
//! 1. **Connected** - socket accepted, greeting sent, no username yet
//! 2. **Authenticated** - `LOGIN` succeeded; the session may join groups
//! 3. **Closed** - terminal; reached via `QUIT`, EOF, or a transport error
//!
//! Whatever the path into `Closed`, teardown runs exactly once: the session
//! is removed from every group it had joined (emitting `USER_LEFT` to the
//! remaining members) and dropped from the registry, which frees its
//! username for reuse.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::commands::CommandProcessor;
use super::dispatch;
use super::server::Registry;
use crate::logutil::escape_log;

pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Authenticated,
    Closed,
}

/// Registry-side record of a live session: authentication state, joined
/// groups, and the outbound channel to the connection's writer task.
#[derive(Debug)]
pub struct SessionRecord {
    /// None until a successful login; immutable once set.
    pub username: Option<String>,
    /// Ids of the groups this session currently belongs to. Always a subset
    /// of the corresponding groups' member sets.
    pub joined: HashSet<u32>,
    pub state: SessionState,
    outbound: mpsc::UnboundedSender<String>,
}

impl SessionRecord {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        SessionRecord {
            username: None,
            joined: HashSet::new(),
            state: SessionState::Connected,
            outbound,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    /// Get the username, or "guest" if not logged in
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("guest")
    }

    /// Enqueue one line for delivery. Returns false if the connection's
    /// writer task is gone.
    pub fn send(&self, line: &str) -> bool {
        self.outbound.send(line.to_string()).is_ok()
    }
}

/// Server-side handler bound to one client connection.
pub struct Session {
    id: SessionId,
    registry: Arc<Registry>,
}

impl Session {
    pub fn new(id: SessionId, registry: Arc<Registry>) -> Self {
        Session { id, registry }
    }

    /// Read protocol lines until the client quits or the transport fails,
    /// then tear the session down. A read or write failure is treated as an
    /// implicit QUIT: no error goes back to the peer and none is surfaced to
    /// other sessions.
    pub async fn run(self, stream: TcpStream) -> Result<()> {
        let peer = stream.peer_addr()?;
        let (reader, mut writer) = stream.into_split();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() {
                    break;
                }
            }
        });

        self.registry.register(self.id, tx.clone()).await;

        // Greeting goes out before the first read.
        let _ = tx.send("WELCOME".to_string());
        let _ = tx.send(self.registry.groups_line());

        let processor = CommandProcessor::new();
        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    debug!("session {}: read error: {}", self.id, err);
                    break;
                }
            };
            debug!("session {} <- {}", self.id, escape_log(&line));

            let command = dispatch::parse_line(&line);
            let outcome = processor.process(&self.registry, self.id, command).await;
            if outcome.close {
                break;
            }
        }

        // Teardown must finish before this task ends: afterwards no broadcast
        // can target this session and its username is free for reuse.
        self.registry.remove(self.id).await;

        // Close our sender and let the writer drain what is already queued
        // (the BYE reply, for one) before the socket drops.
        drop(tx);
        let _ = writer_task.await;

        info!("session {} closed ({})", self.id, peer);
        Ok(())
    }
}
