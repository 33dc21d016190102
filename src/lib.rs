//! # Netbbs - Bulletin Board System for TCP Networks
//!
//! Netbbs is a multi-user bulletin board server. Clients connect over plain
//! TCP, claim a unique display name, join topic groups, post subject/body
//! messages, and receive near-real-time notifications (joins, leaves, new
//! posts) for the groups they belong to.
//!
//! ## Features
//!
//! - **Line Protocol**: Newline-delimited UTF-8 commands (`LOGIN`, `JOIN`,
//!   `MESSAGE`, ...) usable from any netcat-style client.
//! - **Topic Groups**: A fixed set of groups from configuration, each with its
//!   own membership and append-only message history.
//! - **Live Notifications**: Group-scoped `USER_JOINED`, `USER_LEFT` and
//!   `NEW_MESSAGE` pushes, excluding the session that triggered them.
//! - **Async Design**: Built with Tokio; one task per connection plus a
//!   dedicated writer task so a slow peer never stalls a broadcast.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netbbs::config::Config;
//! use netbbs::bbs::BbsServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = BbsServer::new(config);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bbs`] - Core server functionality: registry, sessions, groups, dispatch
//! - [`config`] - Configuration management
//! - [`validation`] - Username validation
//! - [`logutil`] - Log sanitization helpers

pub mod bbs;
pub mod config;
pub mod logutil;
pub mod validation;
