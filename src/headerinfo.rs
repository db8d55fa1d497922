//! Read-only view of a message header, as returned by a `TOP n 0` fetch.
//!
//! Field names follow the c-client `headerinfo` vocabulary (`toaddress`,
//! `reply_toaddress`, `message_id`, `Size`, ...) so emulated UIDLs derived
//! from a `HeaderInfo` stay compatible with identifiers persisted elsewhere.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::hash::BuildHasher;

use mailparse::{MailAddr, MailHeader, SingleInfo};
use regex::{Captures, Regex};

use crate::errors::*;
use crate::uidl;

lazy_static! {
    static ref FOLD: Regex = Regex::new(r"\r?\n([ \t])").unwrap();
    static ref QUOTED_OR_COMMENT: Regex = Regex::new(r#""(?:[^"\\]|\\.)*"|\([^()]*\)"#).unwrap();
}

/// One parsed mailbox from an address header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub personal: Option<String>,
    pub mailbox: String,
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Addresses(Vec<Address>),
}

impl FieldValue {
    /// Text rendering of a scalar value. Address lists are not scalar and
    /// yield `None`.
    pub fn as_scalar_text(&self) -> Option<Cow<'_, str>> {
        match *self {
            FieldValue::Text(ref s) => Some(Cow::Borrowed(s)),
            FieldValue::Integer(n) => Some(Cow::Owned(n.to_string())),
            FieldValue::Boolean(true) => Some(Cow::Borrowed("1")),
            FieldValue::Boolean(false) => Some(Cow::Borrowed("")),
            FieldValue::Addresses(_) => None,
        }
    }
}

impl<'a> From<&'a str> for FieldValue {
    fn from(s: &'a str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> FieldValue {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> FieldValue {
        FieldValue::Integer(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> FieldValue {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> FieldValue {
        FieldValue::Boolean(b)
    }
}

impl From<Vec<Address>> for FieldValue {
    fn from(list: Vec<Address>) -> FieldValue {
        FieldValue::Addresses(list)
    }
}

/// Anything that can be looked up by header field name.
pub trait HeaderFields {
    fn field(&self, name: &str) -> Option<&FieldValue>;
}

impl HeaderFields for BTreeMap<String, FieldValue> {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
    }
}

impl<S: BuildHasher> HeaderFields for HashMap<String, FieldValue, S> {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
    }
}

// (header name, scalar field, address list field)
const ADDRESS_HEADERS: [(&str, &str, &str); 7] = [
    ("to", "toaddress", "to"),
    ("from", "fromaddress", "from"),
    ("cc", "ccaddress", "cc"),
    ("bcc", "bccaddress", "bcc"),
    ("reply-to", "reply_toaddress", "reply_to"),
    ("sender", "senderaddress", "sender"),
    ("return-path", "return_pathaddress", "return_path"),
];

#[derive(Debug, Clone)]
pub struct HeaderInfo {
    fields: BTreeMap<String, FieldValue>,
    uidl: OnceCell<Option<String>>,
}

impl HeaderInfo {
    pub fn from_fields(fields: BTreeMap<String, FieldValue>) -> HeaderInfo {
        HeaderInfo {
            fields: fields,
            uidl: OnceCell::new(),
        }
    }

    /// Parses a raw RFC 5322 header block. Parsing stops at the first empty
    /// line; for repeated headers the first occurrence wins. Values are kept
    /// undecoded, as the server sent them, apart from line unfolding.
    pub fn parse(raw: &[u8], size: Option<u32>) -> Result<HeaderInfo> {
        let headers = if raw.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            let (headers, _) = mailparse::parse_headers(raw)?;
            headers.iter().map(|header| (header.get_key().to_ascii_lowercase(), header_text(header))).collect()
        };
        let first = |name: &str| {
            headers.iter()
                .find(|&&(ref k, _)| k == name)
                .map(|&(_, ref v)| v.clone())
        };

        let mut fields = BTreeMap::new();
        for &(header, text_key, list_key) in ADDRESS_HEADERS.iter() {
            if let Some(value) = first(header) {
                fields.insert(list_key.to_string(), FieldValue::Addresses(parse_address_list(&value)));
                fields.insert(text_key.to_string(), FieldValue::Text(value));
            }
        }
        // An envelope without Sender or Reply-To takes them from From.
        if let Some(from) = first("from") {
            for &(text_key, list_key) in [("senderaddress", "sender"), ("reply_toaddress", "reply_to")].iter() {
                if !fields.contains_key(text_key) {
                    fields.insert(list_key.to_string(), FieldValue::Addresses(parse_address_list(&from)));
                    fields.insert(text_key.to_string(), FieldValue::Text(from.clone()));
                }
            }
        }
        if let Some(date) = first("date") {
            fields.insert("Date".to_string(), FieldValue::Text(date.clone()));
            fields.insert("date".to_string(), FieldValue::Text(date));
        }
        if let Some(subject) = first("subject") {
            fields.insert("Subject".to_string(), FieldValue::Text(subject.clone()));
            fields.insert("subject".to_string(), FieldValue::Text(subject));
        }
        for &(header, key) in [("message-id", "message_id"),
                               ("in-reply-to", "in_reply_to"),
                               ("references", "references")].iter() {
            if let Some(value) = first(header) {
                fields.insert(key.to_string(), FieldValue::Text(value));
            }
        }
        if let Some(size) = size {
            fields.insert("Size".to_string(), FieldValue::Text(size.to_string()));
        }
        Ok(HeaderInfo::from_fields(fields))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(&FieldValue::Text(ref s)) => Some(s),
            _ => None,
        }
    }

    fn addresses(&self, name: &str) -> &[Address] {
        match self.fields.get(name) {
            Some(&FieldValue::Addresses(ref list)) => list,
            _ => &[],
        }
    }

    pub fn to_address(&self) -> Option<&str> {
        self.text("toaddress")
    }

    pub fn from_address(&self) -> Option<&str> {
        self.text("fromaddress")
    }

    pub fn cc_address(&self) -> Option<&str> {
        self.text("ccaddress")
    }

    pub fn bcc_address(&self) -> Option<&str> {
        self.text("bccaddress")
    }

    pub fn reply_to_address(&self) -> Option<&str> {
        self.text("reply_toaddress")
    }

    pub fn sender_address(&self) -> Option<&str> {
        self.text("senderaddress")
    }

    pub fn return_path_address(&self) -> Option<&str> {
        self.text("return_pathaddress")
    }

    pub fn date(&self) -> Option<&str> {
        self.text("date")
    }

    pub fn subject(&self) -> Option<&str> {
        self.text("subject")
    }

    pub fn message_id(&self) -> Option<&str> {
        self.text("message_id")
    }

    pub fn size(&self) -> Option<u32> {
        match self.fields.get("Size") {
            Some(&FieldValue::Text(ref s)) => s.trim().parse().ok(),
            Some(&FieldValue::Integer(n)) => u32::try_from(n).ok(),
            _ => None,
        }
    }

    pub fn to(&self) -> &[Address] {
        self.addresses("to")
    }

    pub fn from(&self) -> &[Address] {
        self.addresses("from")
    }

    pub fn cc(&self) -> &[Address] {
        self.addresses("cc")
    }

    pub fn bcc(&self) -> &[Address] {
        self.addresses("bcc")
    }

    pub fn reply_to(&self) -> &[Address] {
        self.addresses("reply_to")
    }

    pub fn sender(&self) -> &[Address] {
        self.addresses("sender")
    }

    pub fn return_path(&self) -> &[Address] {
        self.addresses("return_path")
    }

    /// Emulated UIDL for this header, computed on first use and memoized.
    pub fn uidl(&self) -> Option<&str> {
        self.uidl.get_or_init(|| uidl::derive_uid(self)).as_deref()
    }
}

impl HeaderFields for HeaderInfo {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Unfolded header value. Bytes that are not UTF-8 are read as Latin-1.
fn header_text(header: &MailHeader) -> String {
    let raw = header.get_value_raw();
    let text = match String::from_utf8(raw.to_vec()) {
        Ok(text) => text,
        Err(_) => raw.iter().map(|&b| char::from(b)).collect(),
    };
    FOLD.replace_all(&text, "$1").trim().to_string()
}

fn parse_address_list(value: &str) -> Vec<Address> {
    // Comments are dropped; quoted display names are left alone
    let value = QUOTED_OR_COMMENT.replace_all(value, |caps: &Captures| {
        if caps[0].starts_with('"') { caps[0].to_string() } else { " ".to_string() }
    });
    let list = match mailparse::addrparse(&value) {
        Ok(list) => list,
        Err(e) => {
            debug!("Unparseable address list {:?}: {}", value, e);
            return Vec::new();
        }
    };
    let mut addresses = Vec::new();
    for addr in list.iter() {
        match *addr {
            MailAddr::Single(ref info) => addresses.push(to_address(info)),
            MailAddr::Group(ref group) => addresses.extend(group.addrs.iter().map(to_address)),
        }
    }
    addresses
}

fn to_address(info: &SingleInfo) -> Address {
    let personal = info.display_name.as_ref()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let (mailbox, host) = match info.addr.rfind('@') {
        Some(at) => (info.addr[..at].to_string(), Some(info.addr[at + 1..].to_string())),
        None => (info.addr.clone(), None),
    };
    Address {
        personal: personal,
        mailbox: mailbox,
        host: host,
    }
}
