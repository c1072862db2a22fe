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

//! Parsing of the small subset of NNTP responses the fetcher understands.

use std::borrow::Cow;

use chrono::prelude::*;
use lazy_static::lazy_static;
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::{map_res, opt, rest},
    sequence::{preceded, tuple},
    IResult,
};
use regex::Regex;

lazy_static! {
    static ref ZONE_COMMENT: Regex = Regex::new(r" \(.*$").unwrap();
    static ref WEEKDAY: Regex =
        Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun), ").unwrap();
}

/// The date format used in the `Date` header of news articles, after the
/// weekday.
const ARTICLE_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// The minimum number of tab-separated fields in an `XOVER` line.
const MIN_OVERVIEW_FIELDS: usize = 8;

/// The index of the `Date` field in an `XOVER` line.
const OVERVIEW_DATE_FIELD: usize = 3;

/// A single-line response, or the first line of a multi-line response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    /// Everything after the code and the space following it, without the
    /// line terminator.
    pub text: String,
    /// The line exactly as received, including its terminator.
    pub raw: Vec<u8>,
}

impl StatusLine {
    /// Parse `raw`, which must still carry its line terminator.
    ///
    /// Returns `None` if the line does not start with a three-digit code
    /// followed by a space or the end of the line.
    pub fn parse(raw: Vec<u8>) -> Option<Self> {
        let (code, text) = {
            let line = String::from_utf8_lossy(trim_eol(&raw));
            match status_line(&line) {
                Ok(("", (code, text))) => {
                    (code, text.unwrap_or_default().to_owned())
                }
                _ => return None,
            }
        };

        Some(StatusLine { code, text, raw })
    }
}

fn status_code(i: &str) -> IResult<&str, u16> {
    map_res(take_while_m_n(3, 3, |c: char| c.is_ascii_digit()), |s: &str| {
        s.parse::<u16>()
    })(i)
}

fn status_line(i: &str) -> IResult<&str, (u16, Option<&str>)> {
    tuple((status_code, opt(preceded(char(' '), rest))))(i)
}

/// Render a received line for use in diagnostics.
pub fn display_line(raw: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_owned()),
    }
}

/// Strip a trailing CRLF or bare LF.
pub fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Whether `line` is the end-of-body marker of a multi-line response.
pub fn is_terminator(line: &[u8]) -> bool {
    b".\r\n" == line || b".\n" == line
}

/// Undo the server's dot-stuffing of one body line.
///
/// Only a doubled leading dot is collapsed. A line with a single leading dot
/// is passed through as-is.
pub fn unstuff(line: &[u8]) -> &[u8] {
    if line.starts_with(b"..") {
        &line[1..]
    } else {
        line
    }
}

/// The inclusive article range reported by a `211` response to `GROUP`.
///
/// `first > last` means the group is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupRange {
    pub count: u64,
    pub first: u64,
    pub last: u64,
}

impl GroupRange {
    /// Extract the range from `211 count first last [group]`.
    ///
    /// On failure, the error is the trimmed response line.
    pub fn parse(status: &StatusLine) -> Result<Self, String> {
        let malformed = || display_line(&status.raw).into_owned();

        // The text excludes the code, so count/first/last are fields 0..3.
        let fields = status.text.split_whitespace().collect::<Vec<_>>();
        if fields.len() < 3 {
            return Err(malformed());
        }

        let number = |s: &str| s.parse::<u64>().map_err(|_| malformed());
        Ok(GroupRange {
            count: number(fields[0])?,
            first: number(fields[1])?,
            last: number(fields[2])?,
        })
    }
}

/// The parts of one `XOVER` line the fetcher uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverviewEntry {
    pub number: u64,
    pub date: String,
}

impl OverviewEntry {
    /// Parse one line of an `XOVER` body.
    ///
    /// Returns `None` for lines with fewer than 8 fields or a non-numeric
    /// article number.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let line = String::from_utf8_lossy(trim_eol(line));
        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() < MIN_OVERVIEW_FIELDS {
            return None;
        }

        Some(OverviewEntry {
            number: fields[0].trim().parse().ok()?,
            date: fields[OVERVIEW_DATE_FIELD].to_owned(),
        })
    }

    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        parse_article_date(&self.date)
    }
}

/// Parse an article date such as `Mon, 2 Jan 2006 15:04:05 -0700 (MST)`.
///
/// A trailing parenthesised zone name is ignored. The weekday must be
/// present, but we don't care whether it agrees with the date; plenty of
/// posting software gets it wrong.
pub fn parse_article_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    let s = ZONE_COMMENT.replace(s, "");
    let weekday = WEEKDAY.find(&s)?;
    DateTime::parse_from_str(&s[weekday.end()..], ARTICLE_DATE_FORMAT).ok()
}
