use crate::errors::*;
use crate::headerinfo::HeaderInfo;

/// The mailbox operations a `Session` needs from the protocol client.
///
/// Implementations own a single connection and are driven sequentially:
/// one outstanding command at a time.
pub trait Transport {
    /// Number of messages in the mailbox.
    fn message_count(&mut self) -> Result<u32>;

    /// Header of message `seq`, or `None` when the mailbox has no such message.
    fn fetch_header(&mut self, seq: u32) -> Result<Option<HeaderInfo>>;

    /// Whether the server hands out real unique ids. When false the session
    /// emulates them from message headers.
    fn supports_native_uid(&self) -> bool;

    fn native_sequence(&mut self, uid: &str) -> Result<Option<u32>>;

    fn native_uid(&mut self, seq: u32) -> Result<Option<String>>;

    /// Commits pending deletions. Message numbers change afterwards.
    fn expunge(&mut self) -> Result<()>;

    /// Reopens the mailbox. Message numbers may change afterwards.
    fn reopen(&mut self) -> Result<()>;
}
