use openssl::ssl::{SslConnector, SslMethod, SslStream};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::config::AuthType;
use crate::errors::*;

/// The connection to the server. Reads go through the buffer, writes go
/// straight to the underlying stream.
#[derive(Debug)]
pub enum TCPStreamType {
    Plain(BufReader<TcpStream>),
    SSL(BufReader<SslStream<TcpStream>>),
}

impl TCPStreamType {
    pub fn connect(host: &str, port: u16, auth: AuthType, timeout: Option<Duration>)
                   -> Result<TCPStreamType> {
        let tcp_stream = TcpStream::connect((host, port))?;
        tcp_stream.set_read_timeout(timeout)?;
        tcp_stream.set_write_timeout(timeout)?;
        match auth {
            AuthType::Plain => {
                debug!("Creating a Plain TCP Connection");
                Ok(TCPStreamType::Plain(BufReader::new(tcp_stream)))
            }
            AuthType::SSL => {
                debug!("Creating a SSL Connection");
                let connector = SslConnector::builder(SslMethod::tls())?.build();
                let stream = connector.connect(host, tcp_stream)?;
                Ok(TCPStreamType::SSL(BufReader::new(stream)))
            }
        }
    }

    pub fn read_until(&mut self, byte: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.read_until(byte, buf),
            TCPStreamType::SSL(ref mut stream) => stream.read_until(byte, buf),
        }
    }

    /// Reads one CRLF (or bare LF) terminated line, without the terminator.
    /// The bytes are returned as sent: message headers need not be UTF-8.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        const LF: u8 = 0x0a;
        let mut buff = Vec::new();
        if self.read_until(LF, &mut buff)? == 0 {
            bail!(ErrorKind::TransportFailure("connection closed by server".to_string()));
        }
        while buff.last() == Some(&b'\n') || buff.last() == Some(&b'\r') {
            buff.pop();
        }
        Ok(buff)
    }

    pub fn write_string(&mut self, buf: &str) -> io::Result<()> {
        self.write_all(format!("{}\r\n", buf).as_bytes())?;
        self.flush()
    }
}

impl Write for TCPStreamType {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.get_mut().write(buf),
            TCPStreamType::SSL(ref mut stream) => stream.get_mut().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.get_mut().flush(),
            TCPStreamType::SSL(ref mut stream) => stream.get_mut().flush(),
        }
    }
}
