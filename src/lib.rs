//! A POP3 client with stable message UIDLs.
//!
//! `POP3Connection` speaks the protocol. `Session` wraps any `Transport`
//! and answers message-number/UIDL lookups, emulating UIDLs from message
//! headers when the transport has none of its own.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

use regex::Regex;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            SslStack(::openssl::error::ErrorStack);
            SslHandshake(::openssl::ssl::HandshakeError<::std::net::TcpStream>);
            MailParse(::mailparse::MailParseError);
            RegexError(::regex::Error);
            Toml(::toml::de::Error);
        }

        errors {
            InvalidArgument(reason: String) {
                description("invalid argument")
                display("invalid argument: {}", reason)
            }
            ServerError(reason: String) {
                description("server replied -ERR")
                display("server replied -ERR: {}", reason)
            }
            InvalidState(reason: String) {
                description("command not allowed in the current POP3 state")
                display("command not allowed: {}", reason)
            }
            TransportFailure(reason: String) {
                description("transport failure")
                display("transport failure: {}", reason)
            }
        }
    }
}
use crate::errors::*;

pub mod cache;
pub mod config;
pub mod headerinfo;
#[cfg(test)]
mod mock;
pub mod pop3result;
mod pop3resultimpl;
pub mod session;
mod tcpstream;
pub mod transport;
pub mod uidl;
mod utils;

pub use crate::cache::UidCache;
pub use crate::config::{AccountConfig, AuthType, UidMode};
pub use crate::headerinfo::{Address, FieldValue, HeaderFields, HeaderInfo};
pub use crate::session::Session;
pub use crate::transport::Transport;
pub use crate::uidl::derive_uid;

use crate::pop3result::{EmailMetadata, POP3List, POP3Retr, POP3Stat, POP3Uidl};
use crate::tcpstream::TCPStreamType;

#[derive(PartialEq)]
#[derive(Debug)]
enum POP3State {
    BEGIN,
    AUTHORIZATION,
    TRANSACTION,
    // UPDATE, // State unused in a Client
    END,
}

pub struct POP3Connection {
    account: AccountConfig,
    stream: TCPStreamType,
    state: POP3State,
    timestamp: String,
}

impl POP3Connection {
    pub fn new(account: AccountConfig) -> Result<POP3Connection> {
        trace!("Initiate POP3 Connection");
        let stream = TCPStreamType::connect(&account.host, account.port, account.auth, account.timeout())?;

        let mut ctx = POP3Connection {
            account: account,
            stream: stream,
            state: POP3State::BEGIN,
            timestamp: String::new(),
        };
        trace!("Connection Established");
        debug!("POP3State::{:?}", ctx.state);
        ctx.read_greeting()?;
        ctx.state = POP3State::AUTHORIZATION;
        debug!("POP3State::{:?}", ctx.state);
        Ok(ctx)
    }

    /// Connects and logs in.
    pub fn open(account: AccountConfig) -> Result<POP3Connection> {
        let mut ctx = POP3Connection::new(account)?;
        ctx.login()?;
        Ok(ctx)
    }

    pub fn account(&self) -> &AccountConfig {
        &self.account
    }

    pub fn login(&mut self) -> Result<()> {
        ensure!(self.state == POP3State::AUTHORIZATION,
                ErrorKind::InvalidState(format!("login in {:?}", self.state)));
        trace!("Attempting to Login");
        let username = self.account.username.clone();
        let auth_response = match self.send_command("USER", Some(&username)) {
            Ok(_) => {
                debug!("Plain USER/PASS authentication");
                let password = self.account.password.clone();
                self.send_command("PASS", Some(&password))
            }
            Err(e) => {
                if self.timestamp.is_empty() {
                    return Err(e);
                }
                debug!("Authenticating using APOP");
                let digest = utils::get_apop_digest(&self.timestamp, &self.account.password);
                let apop_param = format!("{} {}", self.account.username, digest);
                self.send_command("APOP", Some(&apop_param))
            }
        };

        // Switch the current state to TRANSACTION on a successful authentication
        auth_response?;
        self.state = POP3State::TRANSACTION;
        debug!("POP3State::{:?}", self.state);
        Ok(())
    }

    pub fn stat(&mut self) -> Result<POP3Stat> {
        self.ensure_transaction("STAT")?;
        trace!("Cmd: STAT");
        let msg = self.send_command("STAT", None)?;
        POP3Stat::parse(&msg[0])
    }

    pub fn list(&mut self, msgnum: Option<u32>) -> Result<POP3List> {
        self.ensure_transaction("LIST")?;
        trace!("Cmd: LIST");
        match msgnum {
            Some(x) => {
                let msg = self.send_command("LIST", Some(&x.to_string()))?;
                Ok(POP3List { mailbox: vec![EmailMetadata::parse(&msg[0])?] })
            }
            None => {
                let msg = self.send_command("LIST", None)?;
                POP3List::parse(&msg)
            }
        }
    }

    pub fn uidl(&mut self, msgnum: Option<u32>) -> Result<POP3Uidl> {
        self.ensure_transaction("UIDL")?;
        trace!("Cmd: UIDL");
        match msgnum {
            Some(x) => {
                let msg = self.send_command("UIDL", Some(&x.to_string()))?;
                Ok(POP3Uidl { mailbox: vec![pop3result::UidlEntry::parse(&msg[0])?] })
            }
            None => {
                let msg = self.send_command("UIDL", None)?;
                POP3Uidl::parse(&msg)
            }
        }
    }

    pub fn retr(&mut self, msgnum: u32) -> Result<POP3Retr> {
        self.ensure_transaction("RETR")?;
        trace!("Cmd: RETR");
        self.send_command_raw("RETR", Some(&msgnum.to_string()))
            .map(|msg| POP3Retr::parse(&msg))
    }

    /// Headers of `msgnum` followed by the first `lines` lines of its body.
    pub fn top(&mut self, msgnum: u32, lines: u32) -> Result<POP3Retr> {
        self.ensure_transaction("TOP")?;
        trace!("Cmd: TOP");
        self.send_command_raw("TOP", Some(&format!("{} {}", msgnum, lines)))
            .map(|msg| POP3Retr::parse(&msg))
    }

    pub fn dele(&mut self, msgnum: u32) -> Result<()> {
        self.ensure_transaction("DELE")?;
        trace!("Cmd: DELE");
        let _ = self.send_command("DELE", Some(&msgnum.to_string()))?;
        Ok(())
    }

    pub fn noop(&mut self) -> Result<()> {
        self.ensure_transaction("NOOP")?;
        trace!("Cmd: NOOP");
        let _ = self.send_command("NOOP", None)?;
        Ok(())
    }

    pub fn rset(&mut self) -> Result<()> {
        self.ensure_transaction("RSET")?;
        trace!("Cmd: RSET");
        let _ = self.send_command("RSET", None)?;
        Ok(())
    }

    pub fn quit(&mut self) -> Result<()> {
        ensure!(self.state == POP3State::AUTHORIZATION || self.state == POP3State::TRANSACTION,
                ErrorKind::InvalidState(format!("QUIT in {:?}", self.state)));
        trace!("Cmd: QUIT");
        // Whatever the server answers, this session is over
        let response = self.send_command("QUIT", None);
        self.state = POP3State::END;
        debug!("POP3State::{:?}", self.state);
        response.map(|_| ())
    }

    /// Ends the session, committing pending deletions, and logs in again.
    fn reconnect(&mut self) -> Result<()> {
        if self.state != POP3State::END {
            self.quit()?;
        }
        let fresh = POP3Connection::open(self.account.clone())?;
        *self = fresh;
        Ok(())
    }

    fn ensure_transaction(&self, command: &str) -> Result<()> {
        ensure!(self.state == POP3State::TRANSACTION,
                ErrorKind::InvalidState(format!("{} in {:?}", command, self.state)));
        Ok(())
    }

    fn read_greeting(&mut self) -> Result<()> {
        lazy_static! {
            static ref TIMESTAMP: Regex = Regex::new(r"(<[^>]*>)\s*$").unwrap();
        }
        trace!("Reading Greeting from Server");
        let greeting = self.read_response(false)?.remove(0);
        if let Some(cap) = TIMESTAMP.captures(&String::from_utf8_lossy(&greeting)) {
            self.timestamp = cap[1].to_string();
        }
        Ok(())
    }

    fn send_command(&mut self, command: &str, param: Option<&str>) -> Result<Vec<String>> {
        Ok(self.send_command_raw(command, param)?
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect())
    }

    /// Sends a command and returns the reply lines as received, status line
    /// first. After anything but a `-ERR` reply the connection is unusable
    /// and no further command, QUIT included, is sent on it.
    fn send_command_raw(&mut self, command: &str, param: Option<&str>) -> Result<Vec<Vec<u8>>> {
        // Identify if the command is a multiline command
        let is_multiline = match command {
            "LIST" | "UIDL" => param.is_none(),
            "RETR" | "TOP" => true,
            _ => false,
        };

        // Create the actual POP3 Command by appending the parameters
        let command_line = match param {
            Some(x) => format!("{} {}", command, x),
            None => command.to_string(),
        };

        if command == "PASS" {
            info!("C: PASS ****");
        } else {
            info!("C: {}", command_line);
        }
        let response = match self.stream.write_string(&command_line) {
            Ok(()) => self.read_response(is_multiline),
            Err(e) => Err(e.into()),
        };

        if let Err(ref e) = response {
            match *e.kind() {
                ErrorKind::ServerError(_) => {}
                _ => {
                    warn!("Connection unusable after {}: {}", command, e);
                    self.state = POP3State::END;
                    debug!("POP3State::{:?}", self.state);
                }
            }
        }
        response
    }

    fn read_response(&mut self, is_multiline: bool) -> Result<Vec<Vec<u8>>> {
        lazy_static! {
            static ref RESPONSE: Regex =
                Regex::new(r"^(?P<status>\+OK|-ERR)(?: (?P<statustext>.*))?$").unwrap();
        }

        //First read the status line
        let status_line = self.stream.read_line()?;
        let status = String::from_utf8_lossy(&status_line).into_owned();
        info!("S: {}", status);

        // Test if the response is positive. Else exit early.
        {
            let response_groups = RESPONSE.captures(&status)
                .ok_or_else(|| ErrorKind::TransportFailure(format!("Un-parseable Response: {:?}", status)))?;
            if &response_groups["status"] == "-ERR" {
                let text = response_groups.name("statustext").map_or("", |m| m.as_str());
                bail!(ErrorKind::ServerError(text.to_string()));
            }
        }
        let mut response_data = vec![status_line];

        // Lines are kept as bytes so that a reply is always read up to its end
        while is_multiline {
            let line = self.stream.read_line()?;
            if line == b"." {
                break;
            }
            // Don't add the final .CRLF to the response, and undo byte-stuffing
            if line.first() == Some(&b'.') {
                response_data.push(line[1..].to_vec());
            } else {
                response_data.push(line);
            }
        }
        Ok(response_data)
    }
}

impl Drop for POP3Connection {
    // Without `timeout_secs` the QUIT below waits as long as the server takes
    // to answer. A connection that already failed is not sent anything.
    fn drop(&mut self) {
        if self.state == POP3State::AUTHORIZATION || self.state == POP3State::TRANSACTION {
            if let Err(e) = self.quit() {
                warn!("QUIT on drop failed: {}", e);
            }
        }
    }
}

/// A `-ERR` reply to a per-message command means there is no such message.
fn no_such_message<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            if let ErrorKind::ServerError(ref reason) = *e.kind() {
                debug!("No such message: {}", reason);
                return Ok(None);
            }
            Err(e)
        }
    }
}

impl Transport for POP3Connection {
    fn message_count(&mut self) -> Result<u32> {
        Ok(self.stat()?.num_mails)
    }

    fn fetch_header(&mut self, seq: u32) -> Result<Option<HeaderInfo>> {
        let size = match no_such_message(self.list(Some(seq)))? {
            Some(list) => list.mailbox.first().map(|m| m.msg_size),
            None => return Ok(None),
        };
        let top = match no_such_message(self.top(seq, 0))? {
            Some(top) => top,
            None => return Ok(None),
        };
        match HeaderInfo::parse(&top.data, size) {
            Ok(header) => Ok(Some(header)),
            Err(e) => {
                warn!("Skipping message {} with unparseable header: {}", seq, e);
                Ok(None)
            }
        }
    }

    fn supports_native_uid(&self) -> bool {
        self.account.uid_mode == UidMode::Native
    }

    fn native_sequence(&mut self, uid: &str) -> Result<Option<u32>> {
        Ok(self.uidl(None)?
            .mailbox
            .into_iter()
            .find(|entry| entry.uid == uid)
            .map(|entry| entry.msg_id))
    }

    fn native_uid(&mut self, seq: u32) -> Result<Option<String>> {
        Ok(no_such_message(self.uidl(Some(seq)))?
            .and_then(|uidl| uidl.mailbox.into_iter().next())
            .map(|entry| entry.uid))
    }

    fn expunge(&mut self) -> Result<()> {
        debug!("Committing deletions");
        self.reconnect()
    }

    fn reopen(&mut self) -> Result<()> {
        debug!("Reopening mailbox");
        self.reconnect()
    }
}
