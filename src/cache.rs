use std::collections::HashMap;

use crate::errors::*;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct UidMaps {
    seq_to_uid: HashMap<u32, String>,
    uid_to_seq: HashMap<String, u32>,
}

/// Bidirectional message-number/UIDL mapping for one mailbox session.
///
/// Both directions are built and cleared together. A cache must not be
/// shared between sessions, nor used from several threads without a lock
/// around the owning session.
#[derive(Debug, Default)]
pub struct UidCache {
    maps: Option<UidMaps>,
}

impl UidCache {
    pub fn new() -> UidCache {
        UidCache { maps: None }
    }

    pub fn is_built(&self) -> bool {
        self.maps.is_some()
    }

    /// Number of messages with a known UIDL; 0 while the cache is absent.
    pub fn len(&self) -> usize {
        self.maps.as_ref().map_or(0, |m| m.seq_to_uid.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a UIDL. Always `None` while the cache is absent.
    pub fn uid_for(&self, seq: u32) -> Option<&str> {
        self.maps.as_ref()
            .and_then(|m| m.seq_to_uid.get(&seq))
            .map(String::as_str)
    }

    /// Looks up a message number. Always `None` while the cache is absent.
    pub fn sequence_for(&self, uid: &str) -> Option<u32> {
        self.maps.as_ref().and_then(|m| m.uid_to_seq.get(uid).cloned())
    }

    /// Fetches every header through `transport` and records its emulated UIDL.
    ///
    /// Returns `Ok(false)`, leaving the cache absent, for an empty mailbox.
    /// Messages without a header or without a derivable UIDL are left out.
    /// If two messages derive the same UIDL the later message number wins in
    /// the UIDL to number direction.
    pub fn build<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<bool> {
        let count = transport.message_count()?;
        if count == 0 {
            debug!("Mailbox is empty, UIDL cache not built");
            return Ok(false);
        }
        trace!("Building UIDL cache for {} messages", count);

        let mut maps = UidMaps::default();
        for seq in 1..=count {
            let header = match transport.fetch_header(seq)? {
                Some(header) => header,
                None => {
                    debug!("No header for message {}, skipped", seq);
                    continue;
                }
            };
            let uid = match header.uidl() {
                Some(uid) => uid.to_string(),
                None => {
                    debug!("No UIDL derivable for message {}, skipped", seq);
                    continue;
                }
            };
            if let Some(previous) = maps.uid_to_seq.insert(uid.clone(), seq) {
                warn!("UIDL collision: messages {} and {} both map to {}; keeping {}",
                      previous, seq, uid, seq);
            }
            maps.seq_to_uid.insert(seq, uid);
        }
        debug!("UIDL cache built with {} of {} messages", maps.seq_to_uid.len(), count);
        self.maps = Some(maps);
        Ok(true)
    }

    pub fn invalidate(&mut self) {
        if self.maps.take().is_some() {
            debug!("UIDL cache invalidated");
        }
    }
}
