//! Output rendering for the chat front end.
//!
//! The session never prints.  A [`Renderer`] is the display side: it is handed each
//! transcript entry as it lands and draws it as a chat bubble.

use std::io::{self, Stdout, Write};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::session::{PendingRequest, SessionStats};
use crate::types::{Message, Sender};

/// ANSI escape code for blue text (used for the user's messages).
const ANSI_BLUE: &str = "\x1b[34m";

/// ANSI escape code for green text (used for bot replies).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for failures).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for dim text (used for status lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for bubble labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

const TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Full-screen UIs that re-render from the transcript
pub trait Renderer: Send {
    /// Draw one transcript entry.
    fn render_message(&mut self, message: &Message);

    /// Note that a reply is outstanding.
    fn print_pending(&mut self, request: &PendingRequest);

    /// Print an error message that is not part of the transcript.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn render_message(&mut self, message: &Message) {
        println!("{}", format_bubble(message, self.use_color));
        self.flush();
    }

    fn print_pending(&mut self, request: &PendingRequest) {
        if self.use_color {
            println!("{ANSI_DIM}  ... waiting on {}{ANSI_RESET}", request.id());
        } else {
            println!("  ... waiting on {}", request.id());
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}

/// Formats a message as a labelled bubble.
///
/// Continuation lines are indented under the first so multi-line replies stay grouped.
pub fn format_bubble(message: &Message, use_color: bool) -> String {
    let label = message.sender().to_string();
    let indent = " ".repeat(label.len() + 2);
    let body = message.text().lines().collect::<Vec<_>>().join(&format!("\n{indent}"));
    if use_color {
        let color = match message.sender() {
            Sender::User => ANSI_BLUE,
            Sender::Bot => ANSI_GREEN,
            Sender::Error => ANSI_RED,
        };
        format!("{ANSI_BOLD}{color}{label}:{ANSI_RESET} {color}{body}{ANSI_RESET}")
    } else {
        format!("{label}: {body}")
    }
}

/// Formats a message with its timestamp for history listings.
pub fn format_history_line(message: &Message) -> String {
    let stamp = message
        .created_at()
        .format(TIMESTAMP)
        .unwrap_or_else(|_| "--:--:--".to_string());
    format!("[{stamp}] {}", format_bubble(message, false))
}

/// Formats session statistics, one indented line per counter.
pub fn format_stats(stats: &SessionStats) -> String {
    let lines = [
        ("Messages", stats.message_count as u64),
        ("Submissions", stats.submissions),
        ("Replies", stats.replies),
        ("Empty replies dropped", stats.empty_replies),
        ("Failures", stats.failures),
        ("Replies after a newer prompt", stats.stale_results),
        ("Pending", stats.pending as u64),
    ];
    let mut out = String::from("Session Statistics:");
    for (label, value) in lines {
        out.push_str(&format!("\n  {label}: {value}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;

    #[test]
    fn stats_lines() {
        let stats = SessionStats {
            message_count: 5,
            submissions: 3,
            replies: 2,
            stale_results: 1,
            pending: 1,
            ..SessionStats::default()
        };
        let text = format_stats(&stats);
        assert!(text.starts_with("Session Statistics:\n  Messages: 5\n"));
        assert!(text.contains("\n  Replies after a newer prompt: 1\n"));
        assert!(!text.contains("Out-of-order"));
        assert!(text.ends_with("\n  Pending: 1"));
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn plain_bubbles() {
        assert_eq!(format_bubble(&Message::user("Hello"), false), "Me: Hello");
        assert_eq!(
            format_bubble(&Message::bot(RequestId::FIRST, "one\ntwo"), false),
            "Bot: one\n     two"
        );
        assert_eq!(
            format_bubble(&Message::error(RequestId::FIRST, "boom"), false),
            "Error: boom"
        );
    }

    #[test]
    fn colored_bubbles() {
        let user = format_bubble(&Message::user("Hello"), true);
        assert!(user.contains(ANSI_BLUE));
        assert!(user.ends_with(ANSI_RESET));

        let bot = format_bubble(&Message::bot(RequestId::FIRST, "Hi"), true);
        assert!(bot.contains(ANSI_GREEN));
    }

    #[test]
    fn history_line_has_timestamp() {
        let line = format_history_line(&Message::user("Hello"));
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Me: Hello"));
    }
}
