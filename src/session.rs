use crate::cache::UidCache;
use crate::errors::*;
use crate::headerinfo::HeaderInfo;
use crate::transport::Transport;
use crate::utils;

/// A mailbox session: a transport plus the UIDL cache that belongs to it.
///
/// Every operation takes `&mut self`. To share a session between threads,
/// put it behind a `Mutex` so that lookups and invalidation stay ordered.
pub struct Session<T: Transport> {
    transport: T,
    cache: UidCache,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Session<T> {
        Session {
            transport: transport,
            cache: UidCache::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Direct access to the transport. Anything done through it that
    /// renumbers messages must be followed by `invalidate()`.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn is_cache_built(&self) -> bool {
        self.cache.is_built()
    }

    pub fn message_count(&mut self) -> Result<u32> {
        self.transport.message_count()
    }

    pub fn header_info(&mut self, seq: u32) -> Result<Option<HeaderInfo>> {
        check_sequence(seq)?;
        self.transport.fetch_header(seq)
    }

    /// Message number of the message with UIDL `uid`.
    ///
    /// With emulated UIDLs a bare number of up to 10 digits is taken to be a
    /// message number already and is returned as is. Any other UIDL is
    /// looked up in the cache, which is built on first use.
    pub fn resolve_sequence(&mut self, uid: &str) -> Result<Option<u32>> {
        if uid.is_empty() {
            bail!(ErrorKind::InvalidArgument("uid must not be empty".to_string()));
        }
        if self.transport.supports_native_uid() {
            return self.transport.native_sequence(uid);
        }

        if utils::is_sequence_string(uid) {
            let seq = uid.parse::<u32>()
                .chain_err(|| ErrorKind::InvalidArgument(format!("{} is not a message number", uid)))?;
            trace!("UIDL {} taken as message number", uid);
            return Ok(if seq == 0 { None } else { Some(seq) });
        }

        if !self.cache.is_built() && !self.cache.build(&mut self.transport)? {
            return Ok(None);
        }
        Ok(self.cache.sequence_for(uid))
    }

    /// UIDL of message `seq`.
    ///
    /// Without a built cache only the header of `seq` is fetched; the cache
    /// itself is left alone.
    pub fn resolve_uid(&mut self, seq: u32) -> Result<Option<String>> {
        check_sequence(seq)?;
        if self.transport.supports_native_uid() {
            return self.transport.native_uid(seq);
        }

        if self.cache.is_built() {
            return Ok(self.cache.uid_for(seq).map(str::to_string));
        }
        Ok(self.transport.fetch_header(seq)?
            .and_then(|header| header.uidl().map(str::to_string)))
    }

    /// UIDLs of all messages that have one, in message number order.
    pub fn uid_listing(&mut self) -> Result<Vec<(u32, String)>> {
        let count = self.transport.message_count()?;
        // The count comes from the server; allocation follows the replies.
        let mut listing = Vec::new();
        for seq in 1..=count {
            if let Some(uid) = self.resolve_uid(seq)? {
                listing.push((seq, uid));
            }
        }
        Ok(listing)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn expunge(&mut self) -> Result<()> {
        let result = self.transport.expunge();
        self.invalidate();
        result
    }

    pub fn reopen(&mut self) -> Result<()> {
        let result = self.transport.reopen();
        self.invalidate();
        result
    }
}

fn check_sequence(seq: u32) -> Result<()> {
    if seq == 0 {
        bail!(ErrorKind::InvalidArgument("message numbers start at 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn mailbox() -> MockTransport {
        MockTransport::new(vec![
            Some(vec![("message_id", "<1@example.org>"), ("subject", "one")]),
            Some(vec![("toaddress", "b@example.org"), ("subject", "two")]),
            None,
            Some(vec![("Recent", "N")]),
            Some(vec![("message_id", "<5@example.org>"), ("Size", "500")]),
        ])
    }

    #[test]
    fn round_trips_after_build() {
        let mut session = Session::new(mailbox());
        let uid = session.resolve_uid(2).unwrap().unwrap();
        assert_eq!(session.resolve_sequence(&uid).unwrap(), Some(2));
        assert!(session.is_cache_built());

        for seq in &[1, 2, 5] {
            let uid = session.resolve_uid(*seq).unwrap().unwrap();
            assert_eq!(session.resolve_sequence(&uid).unwrap(), Some(*seq));
        }
        // no header, and a header without hashed fields
        assert_eq!(session.resolve_uid(3).unwrap(), None);
        assert_eq!(session.resolve_uid(4).unwrap(), None);
    }

    #[test]
    fn single_uid_lookup_does_not_build_cache() {
        let mut session = Session::new(mailbox());
        let uid = session.resolve_uid(5).unwrap().unwrap();
        assert!(uid.starts_with("<5@example.org>."));
        assert!(!session.is_cache_built());
        assert_eq!(session.transport().fetches, vec![5]);
    }

    #[test]
    fn build_fetches_every_header_once() {
        let mut session = Session::new(mailbox());
        assert_eq!(session.resolve_sequence("<nope>").unwrap(), None);
        assert_eq!(session.transport().fetches, vec![1, 2, 3, 4, 5]);

        let uid = session.resolve_uid(1).unwrap().unwrap();
        assert_eq!(session.resolve_sequence(&uid).unwrap(), Some(1));
        assert_eq!(session.transport().fetches.len(), 5);
    }

    #[test]
    fn digit_strings_are_message_numbers() {
        let mut session = Session::new(mailbox());
        assert_eq!(session.resolve_sequence("42").unwrap(), Some(42));
        assert_eq!(session.resolve_sequence("0").unwrap(), None);
        assert!(session.transport().fetches.is_empty());
        assert!(!session.is_cache_built());

        let err = session.resolve_sequence("9999999999").unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidArgument(_) => {}
            ref other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn invalid_arguments() {
        let mut session = Session::new(mailbox());
        assert!(session.resolve_sequence("").is_err());
        assert!(session.resolve_uid(0).is_err());
        assert!(session.header_info(0).is_err());
    }

    #[test]
    fn empty_mailbox_leaves_cache_absent() {
        let mut session = Session::new(MockTransport::new(Vec::new()));
        assert_eq!(session.resolve_sequence("<1@example.org>.abc").unwrap(), None);
        assert!(!session.is_cache_built());
    }

    #[test]
    fn transport_failure_propagates_and_cache_stays_absent() {
        let mut transport = mailbox();
        transport.fail_on = Some(3);
        let mut session = Session::new(transport);
        assert!(session.resolve_sequence("<x>").is_err());
        assert!(!session.is_cache_built());
    }

    #[test]
    fn expunge_invalidates_stale_entries() {
        let mut session = Session::new(mailbox());
        let second = session.resolve_uid(2).unwrap().unwrap();
        assert_eq!(session.resolve_sequence(&second).unwrap(), Some(2));

        session.transport_mut().pending_delete = vec![1];
        session.expunge().unwrap();
        assert!(!session.is_cache_built());
        assert_eq!(session.resolve_sequence(&second).unwrap(), Some(1));
        assert_eq!(session.resolve_uid(1).unwrap(), Some(second));
    }

    #[test]
    fn reopen_and_invalidate_reflect_new_headers() {
        let mut session = Session::new(mailbox());
        let old = session.resolve_uid(1).unwrap().unwrap();
        assert_eq!(session.resolve_sequence(&old).unwrap(), Some(1));

        session.transport_mut().replace(1, vec![("message_id", "<new@example.org>")]);
        // still served from the cache
        assert_eq!(session.resolve_uid(1).unwrap(), Some(old.clone()));

        session.reopen().unwrap();
        assert_eq!(session.resolve_sequence(&old).unwrap(), None);
        let new = session.resolve_uid(1).unwrap().unwrap();
        assert!(new.starts_with("<new@example.org>."));

        session.transport_mut().replace(1, vec![("subject", "third")]);
        session.invalidate();
        assert_eq!(session.resolve_sequence(&new).unwrap(), None);
    }

    #[test]
    fn colliding_uids_keep_the_later_message() {
        let same = vec![("subject", "dup")];
        let mut session = Session::new(MockTransport::new(vec![Some(same.clone()), Some(same)]));
        let uid = session.resolve_uid(1).unwrap().unwrap();
        assert_eq!(session.resolve_sequence(&uid).unwrap(), Some(2));
        assert_eq!(session.resolve_uid(1).unwrap(), Some(uid.clone()));
        assert_eq!(session.resolve_uid(2).unwrap(), Some(uid));
    }

    #[test]
    fn uid_listing_skips_underivable_messages() {
        let mut session = Session::new(mailbox());
        let listing = session.uid_listing().unwrap();
        let seqs: Vec<u32> = listing.iter().map(|&(seq, _)| seq).collect();
        assert_eq!(seqs, vec![1, 2, 5]);
    }

    #[test]
    fn uid_listing_with_huge_count_fails_on_fetch() {
        let mut transport = mailbox();
        transport.count = Some(u32::MAX);
        transport.fail_on = Some(6);
        let mut session = Session::new(transport);
        let err = session.uid_listing().unwrap_err();
        match *err.kind() {
            ErrorKind::TransportFailure(_) => {}
            ref other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(session.transport().fetches, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn native_uids_are_delegated() {
        let mut transport = mailbox();
        transport.native = true;
        let mut session = Session::new(transport);
        assert_eq!(session.resolve_uid(2).unwrap(), Some("native-2".to_string()));
        assert_eq!(session.resolve_sequence("native-5").unwrap(), Some(5));
        assert_eq!(session.resolve_sequence("42").unwrap(), None);
        assert!(session.transport().fetches.is_empty());
        assert!(!session.is_cache_built());
    }
}
