//! High-level message types used above the raw JAM record layer (C2/C5).

use crate::core::{ReceiverName, SenderName, Subject};
use crate::header::MessageHeader;

/// A message ready to be handed to the manager's `PostMessage`. Origin
/// line, tearline, and standard kludges (`MSGID`, `PID`, `TZUTC`, and
/// optionally `REPLY`) are added by the manager, not by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageDraft {
    pub from: SenderName,
    pub to: ReceiverName,
    pub subject: Subject,
    /// Body with `\n` line endings; the manager converts to JAM's `\r`
    /// convention before it reaches the base.
    pub body: String,
    /// `MSGID` of the message this one replies to, if any.
    pub reply_id: Option<String>,
    pub private: bool,
}

/// A fully decoded message as handed back to a reader.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub header: MessageHeader,
    /// Body with `\n` line endings (JAM's `\r` converted for display).
    pub body: String,
}
