//! In-memory transport for unit tests.

use std::collections::BTreeMap;

use crate::errors::*;
use crate::headerinfo::{FieldValue, HeaderInfo};
use crate::transport::Transport;

type Fields = Vec<(&'static str, &'static str)>;

pub struct MockTransport {
    pub headers: Vec<Option<Fields>>,
    pub fetches: Vec<u32>,
    pub fail_on: Option<u32>,
    /// Message count reported instead of the number of headers.
    pub count: Option<u32>,
    pub native: bool,
    pub pending_delete: Vec<u32>,
}

impl MockTransport {
    pub fn new(headers: Vec<Option<Fields>>) -> MockTransport {
        MockTransport {
            headers: headers,
            fetches: Vec::new(),
            fail_on: None,
            count: None,
            native: false,
            pending_delete: Vec::new(),
        }
    }

    pub fn replace(&mut self, seq: u32, fields: Fields) {
        self.headers[seq as usize - 1] = Some(fields);
    }
}

impl Transport for MockTransport {
    fn message_count(&mut self) -> Result<u32> {
        Ok(self.count.unwrap_or(self.headers.len() as u32))
    }

    fn fetch_header(&mut self, seq: u32) -> Result<Option<HeaderInfo>> {
        self.fetches.push(seq);
        if self.fail_on == Some(seq) {
            bail!(ErrorKind::TransportFailure(format!("fetch of {} failed", seq)));
        }
        let fields = match self.headers.get(seq as usize - 1) {
            Some(&Some(ref fields)) => fields,
            _ => return Ok(None),
        };
        let map: BTreeMap<String, FieldValue> = fields.iter()
            .map(|&(k, v)| (k.to_string(), FieldValue::from(v)))
            .collect();
        Ok(Some(HeaderInfo::from_fields(map)))
    }

    fn supports_native_uid(&self) -> bool {
        self.native
    }

    fn native_sequence(&mut self, uid: &str) -> Result<Option<u32>> {
        let count = self.headers.len() as u32;
        Ok(uid.trim_start_matches("native-")
            .parse::<u32>()
            .ok()
            .filter(|seq| uid.starts_with("native-") && *seq >= 1 && *seq <= count))
    }

    fn native_uid(&mut self, seq: u32) -> Result<Option<String>> {
        if seq as usize > self.headers.len() {
            return Ok(None);
        }
        Ok(Some(format!("native-{}", seq)))
    }

    fn expunge(&mut self) -> Result<()> {
        let mut deleted = self.pending_delete.split_off(0);
        deleted.sort_unstable_by(|a, b| b.cmp(a));
        for seq in deleted {
            self.headers.remove(seq as usize - 1);
        }
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        Ok(())
    }
}
