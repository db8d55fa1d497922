#[derive(Debug)]
pub struct EmailMetadata {
    pub msg_id: u32,
    pub msg_size: u32,
}

#[derive(Debug)]
pub struct POP3Stat {
    pub mbox_size: u32,
    pub num_mails: u32,
}

#[derive(Debug)]
pub struct POP3List {
    pub mailbox: Vec<EmailMetadata>,
}

/// One line of a `UIDL` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct UidlEntry {
    pub msg_id: u32,
    pub uid: String,
}

#[derive(Debug)]
pub struct POP3Uidl {
    pub mailbox: Vec<UidlEntry>,
}

#[derive(Debug)]
pub struct POP3Retr {
    /// The message as sent, CRLF line endings, dot-unstuffed.
    pub data: Vec<u8>,
}
