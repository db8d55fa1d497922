use md5::Md5;
use regex::Regex;
use sha1::{Digest, Sha1};

lazy_static! {
    static ref SEQUENCE_STRING: Regex = Regex::new(r"^\d{1,10}$").unwrap();
}

pub fn get_apop_digest(timestamp: &str, password: &str) -> String {
    let hasher = Md5::new().chain(timestamp).chain(password);
    format!("{:x}", hasher.result())
}

pub fn md5_hex(data: &str) -> String {
    format!("{:x}", Md5::digest(data.as_bytes()))
}

pub fn sha1_hex(data: &str) -> String {
    format!("{:x}", Sha1::digest(data.as_bytes()))
}

/// Callers sometimes hand over a raw message number where a UID was expected.
pub fn is_sequence_string(uid: &str) -> bool {
    SEQUENCE_STRING.is_match(uid)
}
