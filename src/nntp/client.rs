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

//! A minimal synchronous NNTP client.
//!
//! This only speaks the handful of commands needed to pull articles out of a
//! group: `AUTHINFO`, `GROUP`, `XOVER`, `ARTICLE` and `QUIT`. Every exchange
//! is strictly request/response; nothing is pipelined.

use std::io::{self, BufRead, Write};

use log::{log_enabled, trace, Level};
use thiserror::Error;

use super::syntax::{self as s, GroupRange, StatusLine};

/// Appended to every reassembled article, regardless of the line endings the
/// server used.
const ARTICLE_TERMINATOR: &[u8] = b".\r\n";

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(io::Error),
    #[error("Timed out waiting for the server")]
    Timeout,
    #[error("Connection closed by server")]
    UnexpectedEof,
    #[error("Unexpected response: {0}")]
    Protocol(String),
    #[error("{0}")]
    Auth(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            // A read timeout on a socket surfaces as WouldBlock on UNIX.
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Error::Timeout
            }
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(e),
        }
    }
}

pub struct Client<R, W> {
    read: R,
    write: W,
    trace: bool,
}

impl<R: BufRead, W: Write> Client<R, W> {
    /// Create a client over the given halves of a connection.
    ///
    /// If `trace` is true, the full conversation (minus passwords) is logged
    /// at trace level.
    pub fn new(read: R, write: W, trace: bool) -> Self {
        Client { read, write, trace }
    }

    /// Send one command line; the CRLF is added here.
    pub fn send_command(&mut self, command: &str) -> Result<(), Error> {
        let mut line = Vec::with_capacity(command.len() + 2);
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(b"\r\n");
        self.trace(">>", &line);
        self.write_line(&line)
    }

    /// Like `send_command`, but `secret` is appended to `command` without
    /// ever appearing in the trace.
    fn send_command_censored(
        &mut self,
        command: &str,
        secret: &str,
    ) -> Result<(), Error> {
        self.trace(">>", format!("{}<censored>\r\n", command).as_bytes());
        let line = format!("{}{}\r\n", command, secret);
        self.write_line(line.as_bytes())
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), Error> {
        self.write.write_all(line)?;
        self.write.flush()?;
        Ok(())
    }

    /// Read one line, including its terminator, into `dst`.
    ///
    /// The line ends at the first LF. Hitting EOF before that is an error.
    pub fn read_line_raw(&mut self, dst: &mut Vec<u8>) -> Result<(), Error> {
        let start = dst.len();
        self.read.read_until(b'\n', dst)?;
        self.trace("<<", &dst[start..]);
        if !dst[start..].ends_with(b"\n") {
            return Err(Error::UnexpectedEof);
        }

        Ok(())
    }

    /// Read a status line and check that its code is one of `expected`.
    ///
    /// Anything else, including a line that is not a status line at all, is
    /// a `Protocol` error carrying the trimmed line.
    pub fn read_status(
        &mut self,
        expected: &[u16],
    ) -> Result<StatusLine, Error> {
        let mut raw = Vec::new();
        self.read_line_raw(&mut raw)?;
        let display = s::display_line(&raw).into_owned();
        match StatusLine::parse(raw) {
            Some(status) if expected.contains(&status.code) => Ok(status),
            _ => Err(Error::Protocol(display)),
        }
    }

    /// Read the body of a multi-line response.
    ///
    /// Lines are returned with their original terminators but with
    /// dot-stuffing undone. The terminating `.` line is consumed and not
    /// returned.
    pub fn read_multiline_body(&mut self) -> Result<Vec<Vec<u8>>, Error> {
        let mut lines = Vec::new();
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            self.read_line_raw(&mut buffer)?;
            if s::is_terminator(&buffer) {
                break;
            }

            lines.push(s::unstuff(&buffer).to_vec());
        }

        Ok(lines)
    }

    /// Read the greeting sent by the server on connect.
    pub fn read_greeting(&mut self) -> Result<StatusLine, Error> {
        self.read_status(&[200, 201])
    }

    /// Log in with `AUTHINFO USER`/`AUTHINFO PASS`.
    ///
    /// The password is only sent once the server has asked for it with
    /// `381`.
    pub fn authenticate(
        &mut self,
        user: &str,
        password: &str,
    ) -> Result<(), Error> {
        self.send_command(&format!("AUTHINFO USER {}", user))?;
        self.read_status(&[381]).map_err(auth_error)?;

        self.send_command_censored("AUTHINFO PASS ", password)?;
        self.read_status(&[281]).map_err(auth_error)?;
        Ok(())
    }

    /// Select `group`, returning its current article range.
    pub fn group(&mut self, group: &str) -> Result<GroupRange, Error> {
        self.send_command(&format!("GROUP {}", group))?;
        let status = self.read_status(&[211])?;
        GroupRange::parse(&status).map_err(Error::Malformed)
    }

    /// List the overview lines for the inclusive range `first..=last`.
    pub fn over(
        &mut self,
        first: u64,
        last: u64,
    ) -> Result<Vec<Vec<u8>>, Error> {
        self.send_command(&format!("XOVER {}-{}", first, last))?;
        self.read_status(&[224])?;
        self.read_multiline_body()
    }

    /// Fetch one article.
    ///
    /// The result is the `220` line verbatim, then the unstuffed body lines,
    /// then a `.` line terminated with CRLF.
    pub fn article(&mut self, number: u64) -> Result<Vec<u8>, Error> {
        self.send_command(&format!("ARTICLE {}", number))?;
        let status = self.read_status(&[220])?;
        let body = self.read_multiline_body()?;

        let mut article = status.raw;
        for line in body {
            article.extend_from_slice(&line);
        }
        article.extend_from_slice(ARTICLE_TERMINATOR);
        Ok(article)
    }

    /// Say goodbye to the server.
    pub fn quit(&mut self) -> Result<(), Error> {
        self.send_command("QUIT")?;
        self.read_status(&[205])?;
        Ok(())
    }

    fn trace(&self, what: &str, data: &[u8]) {
        if !self.trace || !log_enabled!(Level::Trace) {
            return;
        }

        if data.is_empty() {
            trace!("WIRE {} <empty>", what);
            return;
        }

        let mut start = 0;
        for split in memchr::memchr_iter(b'\n', data)
            .chain(std::iter::once(data.len() - 1))
        {
            if split < start {
                continue;
            }

            let data = &data[start..=split];
            start = split + 1;

            let mut vis = String::new();
            for &byte in data {
                match byte {
                    b' '..=b'~' => vis.push(byte as char),
                    b'\n' => vis.push_str("\\n"),
                    b'\r' => vis.push_str("\\r"),
                    b'\t' => vis.push_str("\\t"),
                    b => vis.push_str(&format!("\\x{:02X}", b)),
                }
            }

            trace!("WIRE {} {}", what, vis);
        }
    }
}

#[cfg(test)]
impl<R, W> Client<R, W> {
    pub fn written(&self) -> &W {
        &self.write
    }
}

fn auth_error(e: Error) -> Error {
    match e {
        Error::Protocol(line) => Error::Auth(line),
        e => e,
    }
}
