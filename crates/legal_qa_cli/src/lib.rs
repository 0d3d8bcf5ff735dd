//! Terminal front end for the legal Q&A client.
//!
//! - [`args`]: command-line flags and their configuration overrides.
//! - [`session`]: one-shot and interactive loops over a
//!   [`legal_qa::ConversationRuntime`].
//! - [`render`]: incremental transcript output.

pub mod args;
pub mod commands;
pub mod render;
pub mod session;
pub mod transport;
