//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to inspect the session without sending text to the API.

/// A parsed chat command.
///
/// These commands control the front end and are never submitted as prompts.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Reprint the transcript with timestamps.
    History,

    /// List outstanding requests.
    Pending,

    /// Block until every outstanding reply has arrived.
    Wait,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use parley::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "history" | "transcript" => ChatCommand::History,
        "pending" => ChatCommand::Pending,
        "wait" => ChatCommand::Wait,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    if let Some(argument) = argument {
        if !matches!(result, ChatCommand::Invalid(_)) {
            return Some(ChatCommand::Invalid(format!(
                "/{command} takes no arguments (got {argument:?})"
            )));
        }
    }

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /history               Show the conversation with timestamps
  /pending               List requests still waiting on a reply
  /wait                  Wait for all outstanding replies
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
