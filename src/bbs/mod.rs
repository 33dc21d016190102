//! # BBS (Bulletin Board System) Core Module
//!
//! Implements the server side of the bulletin board: accepting connections,
//! authenticating display names, group membership, posting, and fan-out of
//! notifications to group members.
//!
//! ## Components
//!
//! - [`server`] - TCP accept loop and the shared registry (sessions, groups)
//! - [`session`] - Per-connection line loop and lifecycle
//! - [`dispatch`] - Protocol line parsing into tagged commands
//! - [`commands`] - Command execution against shared state
//! - [`group`] - Topic groups: membership, history, broadcast
//! - [`message`] - Posted message records and summary rendering
//!
//! ## Session Lifecycle
//!
//! 1. Connection accepted; server sends `WELCOME` and the `GROUPS` banner
//! 2. Client authenticates with `LOGIN <name>` (unique, case-insensitive)
//! 3. Client joins groups, posts, and receives group-scoped notifications
//! 4. `QUIT`, EOF, or a transport error tears the session down: it leaves
//!    every group (members see `USER_LEFT`) and its username is freed

pub mod commands;
pub mod dispatch;
pub mod group;
pub mod message;
pub mod server;
pub mod session;

pub use server::BbsServer;
