use std::fmt;

use time::OffsetDateTime;

/// Identifies one completion request within a session.
///
/// Ids are issued in increasing order, so comparing two ids tells which request was
/// submitted first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// The id of the first request in a session.
    pub const FIRST: RequestId = RequestId(1);

    /// The id issued after this one.
    pub fn next(self) -> RequestId {
        RequestId(self.0 + 1)
    }

    /// The raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who a transcript entry came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    /// Text typed by the user.
    User,

    /// Text returned by the completion service.
    Bot,

    /// A completion that failed; the text describes the failure.
    Error,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "Me"),
            Sender::Bot => write!(f, "Bot"),
            Sender::Error => write!(f, "Error"),
        }
    }
}

/// One transcript entry.
///
/// Messages are only created by the session, which guarantees the text is trimmed and
/// non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    sender: Sender,
    text: String,
    request_id: Option<RequestId>,
    created_at: OffsetDateTime,
}

impl Message {
    pub(crate) fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into(), None)
    }

    pub(crate) fn bot(request_id: RequestId, text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text.into(), Some(request_id))
    }

    pub(crate) fn error(request_id: RequestId, text: impl Into<String>) -> Self {
        Self::new(Sender::Error, text.into(), Some(request_id))
    }

    fn new(sender: Sender, text: String, request_id: Option<RequestId>) -> Self {
        Self {
            sender,
            text,
            request_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Who sent this message.
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// The trimmed message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The request a bot or error message answers.  `None` for user messages.
    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    /// When the message entered the transcript.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// True for messages typed by the user.
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}
