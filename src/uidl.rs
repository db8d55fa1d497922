//! Emulated POP3 UIDLs.
//!
//! A UIDL is derived from the header fields below, in this exact order. The
//! order, the newline separator and the digests are part of the identifier
//! format: changing any of them changes every UIDL already handed out.
//! MD5 and SHA-1 serve as checksums here, not as security primitives.

use crate::headerinfo::HeaderFields;
use crate::utils::{md5_hex, sha1_hex};

pub const HASHED_FIELDS: [&str; 11] = [
    "toaddress",
    "fromaddress",
    "ccaddress",
    "bccaddress",
    "reply_toaddress",
    "senderaddress",
    "return_pathaddress",
    "date",
    "message_id",
    "subject",
    "Size",
];

/// Derives an emulated UIDL from a message header.
///
/// With a non-empty `message_id` the result is `<message_id>.<md5 hex>`,
/// otherwise it is the SHA-1 hex of the hashed fields. Returns `None` when
/// none of the hashed fields holds a non-empty scalar.
pub fn derive_uid<H: HeaderFields + ?Sized>(header: &H) -> Option<String> {
    let mut hashvars = Vec::with_capacity(HASHED_FIELDS.len());
    let mut message_id = None;
    for &key in HASHED_FIELDS.iter() {
        let value = match header.field(key).and_then(|v| v.as_scalar_text()) {
            Some(ref text) if !text.is_empty() => text.to_string(),
            _ => continue,
        };
        if key == "message_id" {
            message_id = Some(value.clone());
        }
        hashvars.push(value);
    }
    if hashvars.is_empty() {
        return None;
    }

    let joined = hashvars.join("\n");
    let uid = match message_id {
        Some(message_id) => format!("{}.{}", message_id, md5_hex(&joined)),
        None => sha1_hex(&joined),
    };
    trace!("Derived UIDL {} from {} header fields", uid, hashvars.len());
    Some(uid)
}
