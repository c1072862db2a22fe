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

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The optional configuration file.
///
/// Every value here can also be given on the command line, which takes
/// precedence. Anything left unset in both places falls back to the built-in
/// defaults in `cli::main`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How to reach the news server.
    #[serde(default)]
    pub server: ServerConfig,

    /// What to fetch and how.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// If set, a `log4rs` configuration file to use instead of the default
    /// logging to standard error.
    #[serde(default)]
    pub log_config: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// The host name of the news server.
    pub host: Option<String>,
    /// The port of the news server. Typically 119, or 563 with TLS.
    pub port: Option<u16>,
    /// Whether to wrap the connection in TLS.
    pub tls: Option<bool>,
    /// Whether to verify the server's TLS certificate.
    ///
    /// Off by default. Servers reached over anonymity networks rarely present
    /// a certificate that would verify, and the proxy already authenticates
    /// the path.
    pub verify_tls: Option<bool>,
    /// A SOCKS5 proxy to connect through, as `host:port`.
    pub proxy: Option<String>,
    /// The user name for `AUTHINFO USER`. No authentication is attempted if
    /// this is not set.
    pub user: Option<String>,
    /// The password for `AUTHINFO PASS`.
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// The newsgroup to fetch from.
    pub group: Option<String>,
    /// Only fetch articles from the last this many days; 0 fetches
    /// everything in range.
    pub days: Option<u32>,
    /// The maximum number of articles covered by one `XOVER` command.
    pub batch_size: Option<u64>,
    /// The read deadline for the whole session, in seconds.
    pub timeout_secs: Option<u64>,
    /// Whether to resume from the position recorded by the last run.
    pub resume: Option<bool>,
    /// The directory holding the per-group bookmark files.
    pub state_dir: Option<PathBuf>,
}
