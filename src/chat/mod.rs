//! Terminal front end for a [`ChatSession`](crate::ChatSession).
//!
//! This module provides the pieces the `parley-chat` binary is built from:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//!
//! Rendering lives in [`crate::render`] and is re-exported here.

mod commands;
mod config;

pub use crate::render::{
    PlainTextRenderer, Renderer, format_bubble, format_history_line, format_stats,
};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatArgsError, ChatConfig};
