//-
// Copyright (c) 2020, 2026, Jason Lingle
//
// This file is part of Newsgrab.
//
// Newsgrab is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Newsgrab is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Newsgrab. If not, see <http://www.gnu.org/licenses/>.

//! Establishing the byte stream to the news server.
//!
//! The stream can be a direct TCP connection or one tunnelled through a
//! SOCKS5 proxy, either of which may be wrapped in TLS.
//!
//! TLS certificate verification is off unless explicitly requested. The
//! typical deployment reaches news servers through anonymity networks, where
//! servers rarely present a certificate that would verify and the transport
//! itself is what provides the protection.

use std::io::{self, Read, Write};
use std::mem;
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

use log::debug;
use openssl::ssl::{
    HandshakeError, SslConnector, SslMethod, SslStream, SslVerifyMode,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Proxy connection through {proxy} failed: {error}")]
    Proxy {
        proxy: String,
        #[source]
        error: io::Error,
    },
    #[error(transparent)]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    Handshake(#[from] openssl::ssl::Error),
}

/// Where and how to connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub verify_tls: bool,
    /// A SOCKS5 proxy as `host:port`.
    pub proxy: Option<String>,
    /// Bounds each read during the TLS handshake.
    pub handshake_timeout: Option<Duration>,
}

#[derive(Debug)]
enum Stream {
    Plain(TcpStream),
    Tls(SslStream<TcpStream>),
    Closed,
}

/// A connected duplex stream to the server.
///
/// Reads honour the read deadline, if any. Once the deadline has passed,
/// every read fails with `io::ErrorKind::TimedOut`.
#[derive(Debug)]
pub struct Connection {
    stream: Stream,
    deadline: Option<Instant>,
}

pub fn connect(options: &ConnectOptions) -> Result<Connection, Error> {
    let tcp = match options.proxy {
        Some(ref proxy) => {
            debug!(
                "Connecting to {}:{} through SOCKS5 proxy {}",
                options.host, options.port, proxy
            );
            socks::Socks5Stream::connect(
                proxy.as_str(),
                (options.host.as_str(), options.port),
            )
            .map_err(|error| Error::Proxy {
                proxy: proxy.clone(),
                error,
            })?
            .into_inner()
        }

        None => {
            debug!("Connecting to {}:{}", options.host, options.port);
            TcpStream::connect((options.host.as_str(), options.port))?
        }
    };

    let stream = if options.tls {
        debug!("Starting TLS handshake");
        tcp.set_read_timeout(options.handshake_timeout)?;
        let ssl = start_tls(tcp, &options.host, options.verify_tls)?;
        ssl.get_ref().set_read_timeout(None)?;
        Stream::Tls(ssl)
    } else {
        Stream::Plain(tcp)
    };

    Ok(Connection {
        stream,
        deadline: None,
    })
}

fn start_tls(
    tcp: TcpStream,
    host: &str,
    verify: bool,
) -> Result<SslStream<TcpStream>, Error> {
    let mut connector = SslConnector::builder(SslMethod::tls())?;
    if !verify {
        connector.set_verify(SslVerifyMode::NONE);
    }

    connector
        .build()
        .connect(host, tcp)
        .map_err(|e| match e {
            HandshakeError::SetupFailure(es) => Error::Ssl(es),
            HandshakeError::Failure(f) => Error::Handshake(f.into_error()),
            HandshakeError::WouldBlock(f) => Error::Handshake(f.into_error()),
        })
}

impl Connection {
    /// Abort any read still pending at `deadline`.
    pub fn set_read_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Abort any read still pending `timeout` from now.
    ///
    /// A timeout too large to represent as an `Instant` means no deadline.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.deadline = Instant::now().checked_add(timeout);
    }

    #[cfg(test)]
    pub fn clear_read_deadline(&mut self) {
        self.deadline = None;
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        matches!(self.stream, Stream::Closed)
    }

    /// Shut the connection down.
    ///
    /// Only the first call does anything; later calls, and reads or writes
    /// after closing, are harmless.
    pub fn close(&mut self) {
        match mem::replace(&mut self.stream, Stream::Closed) {
            Stream::Plain(tcp) => {
                let _ = tcp.shutdown(Shutdown::Both);
            }
            Stream::Tls(mut ssl) => {
                let _ = ssl.shutdown();
                let _ = ssl.get_ref().shutdown(Shutdown::Both);
            }
            Stream::Closed => (),
        }
    }

    fn tcp(&self) -> io::Result<&TcpStream> {
        match self.stream {
            Stream::Plain(ref tcp) => Ok(tcp),
            Stream::Tls(ref ssl) => Ok(ssl.get_ref()),
            Stream::Closed => Err(closed()),
        }
    }

    /// Set the socket timeout to whatever remains until the deadline.
    fn arm_deadline(&self) -> io::Result<()> {
        let tcp = self.tcp()?;
        match self.deadline {
            None => tcp.set_read_timeout(None),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(deadline_exceeded());
                }

                tcp.set_read_timeout(Some(deadline - now))
            }
        }
    }
}

impl Read for Connection {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.arm_deadline()?;
        let result = match self.stream {
            Stream::Plain(ref mut tcp) => tcp.read(dst),
            Stream::Tls(ref mut ssl) => ssl.read(dst),
            Stream::Closed => Err(closed()),
        };

        result.map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                deadline_exceeded()
            }
            _ => e,
        })
    }
}

impl Write for Connection {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        match self.stream {
            Stream::Plain(ref mut tcp) => tcp.write(src),
            Stream::Tls(ref mut ssl) => ssl.write(src),
            Stream::Closed => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            Stream::Plain(ref mut tcp) => tcp.flush(),
            Stream::Tls(ref mut ssl) => ssl.flush(),
            Stream::Closed => Err(closed()),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "Connection closed")
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "Read deadline exceeded")
}
