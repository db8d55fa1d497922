use crate::errors::*;
use crate::pop3result::{EmailMetadata, POP3List, POP3Retr, POP3Stat, POP3Uidl, UidlEntry};
use regex::{Captures, Regex};
use std::borrow::Cow;


lazy_static! {
    static ref STAT_REGEX: Regex = Regex::new(r"^(?:\+OK )?(?P<nmsg>\d+) (?P<size>\d+)").unwrap();
    static ref UIDL_REGEX: Regex = Regex::new(r"^(?:\+OK )?(?P<nmsg>\d+) (?P<uid>\S+)").unwrap();
}

fn capture<'t>(re: &Regex, line: &'t str) -> Result<Captures<'t>> {
    re.captures(line)
        .ok_or_else(|| ErrorKind::TransportFailure(format!("Un-parseable line: {:?}", line)).into())
}

fn number(cap: &Captures, name: &str) -> Result<u32> {
    cap[name].parse::<u32>()
        .chain_err(|| ErrorKind::TransportFailure(format!("{} out of range", name)))
}

impl POP3Stat {
    pub fn parse(stat_line: &str) -> Result<POP3Stat> {
        let stat_cap = capture(&STAT_REGEX, stat_line)?;
        Ok(POP3Stat {
            num_mails: number(&stat_cap, "nmsg")?,
            mbox_size: number(&stat_cap, "size")?,
        })
    }
}

impl EmailMetadata {
    pub fn parse(line: &str) -> Result<EmailMetadata> {
        let cap = capture(&STAT_REGEX, line)?;
        Ok(EmailMetadata {
            msg_id: number(&cap, "nmsg")?,
            msg_size: number(&cap, "size")?,
        })
    }
}

impl POP3List {
    pub fn parse(list_data: &[String]) -> Result<POP3List> {
        // The first line is the status line
        let mailbox = list_data.iter()
            .skip(1)
            .map(|line| EmailMetadata::parse(line))
            .collect::<Result<Vec<_>>>()?;
        Ok(POP3List { mailbox: mailbox })
    }
}

impl UidlEntry {
    pub fn parse(line: &str) -> Result<UidlEntry> {
        let cap = capture(&UIDL_REGEX, line)?;
        Ok(UidlEntry {
            msg_id: number(&cap, "nmsg")?,
            uid: cap["uid"].to_string(),
        })
    }
}

impl POP3Uidl {
    pub fn parse(uidl_data: &[String]) -> Result<POP3Uidl> {
        let mailbox = uidl_data.iter()
            .skip(1)
            .map(|line| UidlEntry::parse(line))
            .collect::<Result<Vec<_>>>()?;
        Ok(POP3Uidl { mailbox: mailbox })
    }
}

impl POP3Retr {
    pub fn parse(retr_data: &[Vec<u8>]) -> POP3Retr {
        let mut data = Vec::new();
        for line in retr_data.iter().skip(1) {
            data.extend_from_slice(line);
            data.extend_from_slice(b"\r\n");
        }
        POP3Retr { data: data }
    }

    /// The message decoded as UTF-8, invalid bytes replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}
