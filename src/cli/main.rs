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

use std::fs;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use crate::nntp::transport::ConnectOptions;
use crate::retrieve::engine::RetrieveOptions;
use crate::support::config::Config;
use crate::support::sysexits::*;

const DEFAULT_HOST: &str = "news.tcpreset.net";
const DEFAULT_PORT: u16 = 119;
const DEFAULT_GROUP: &str = "alt.anonymous.messages";
const DEFAULT_DAYS: u32 = 1;
const DEFAULT_BATCH_SIZE: u64 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 1200;

/// Fetch recent articles from a newsgroup.
///
/// Articles are written to standard output in the order they were fetched,
/// each exactly as the server sent it (minus dot-stuffing) and ending with a
/// line containing only a period. Everything else goes to standard error.
///
/// With --latest, the number of the last article covered is recorded in
/// `<group>.json` in the state directory, and the next run with --latest
/// only looks at newer articles.
///
/// Every option except --config, --verbose and --trace can also be set in the
/// configuration file; the command line takes precedence.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
pub(super) struct Options {
    /// NNTP server address [default: news.tcpreset.net]
    #[structopt(long, short)]
    pub(super) server: Option<String>,
    /// NNTP server port [default: 119]
    #[structopt(long, short)]
    pub(super) port: Option<u16>,
    /// Newsgroup to download from [default: alt.anonymous.messages]
    #[structopt(long, short)]
    pub(super) group: Option<String>,
    /// Download articles from the last N days, 0 for all [default: 1]
    #[structopt(long, short)]
    pub(super) days: Option<u32>,
    /// NNTP user name; no authentication is attempted without one
    #[structopt(long, short)]
    pub(super) user: Option<String>,
    /// NNTP password
    #[structopt(long)]
    pub(super) pass: Option<String>,
    /// Read the NNTP password from the terminal
    #[structopt(long)]
    pub(super) prompt_password: bool,
    /// Use a TLS connection
    #[structopt(long)]
    pub(super) tls: bool,
    /// Verify the server's TLS certificate.
    ///
    /// Verification is off by default since servers reached through
    /// anonymity networks rarely have a certificate that would pass.
    #[structopt(long)]
    pub(super) verify_tls: bool,
    /// SOCKS5 proxy, e.g. 127.0.0.1:9050
    #[structopt(long)]
    pub(super) proxy: Option<String>,
    /// Only fetch articles newer than the last run
    #[structopt(long)]
    pub(super) latest: bool,
    /// Maximum number of articles per XOVER command [default: 500]
    #[structopt(long)]
    pub(super) batch: Option<NonZeroU64>,
    /// Read timeout for the whole session in seconds [default: 1200]
    #[structopt(long)]
    pub(super) timeout: Option<u64>,
    /// Directory holding the bookmark files [default: .]
    #[structopt(long, parse(from_os_str))]
    pub(super) state_dir: Option<PathBuf>,
    /// TOML configuration file
    #[structopt(long, short, parse(from_os_str))]
    pub(super) config: Option<PathBuf>,
    /// log4rs configuration file to use instead of logging to standard error
    #[structopt(long, parse(from_os_str))]
    pub(super) log_config: Option<PathBuf>,
    /// Log debugging information
    #[structopt(long, short)]
    pub(super) verbose: bool,
    /// Dump the NNTP conversation (minus passwords) to the log
    #[structopt(long)]
    pub(super) trace: bool,
}

/// Everything needed for one run, after merging the command line, the
/// configuration file and the defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Settings {
    pub(super) connect: ConnectOptions,
    pub(super) user: Option<String>,
    pub(super) password: Option<String>,
    pub(super) prompt_password: bool,
    pub(super) retrieve: RetrieveOptions,
    pub(super) timeout: Duration,
    pub(super) state_dir: PathBuf,
    pub(super) log_config: Option<PathBuf>,
    pub(super) log_level: log::LevelFilter,
    pub(super) trace: bool,
}

impl Settings {
    /// Merge `options` over `config` over the built-in defaults.
    ///
    /// On failure, returns a description of the invalid setting.
    pub(super) fn resolve(
        options: Options,
        config: Config,
    ) -> Result<Self, String> {
        let server = config.server;
        let fetch = config.fetch;

        let batch_size = match options.batch {
            Some(batch) => batch,
            None => {
                let batch = fetch.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
                NonZeroU64::new(batch).ok_or_else(|| {
                    "batch_size must be at least 1".to_owned()
                })?
            }
        };

        let timeout = Duration::from_secs(
            options
                .timeout
                .or(fetch.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let log_level = if options.trace {
            log::LevelFilter::Trace
        } else if options.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };

        Ok(Settings {
            connect: ConnectOptions {
                host: options
                    .server
                    .or(server.host)
                    .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
                port: options.port.or(server.port).unwrap_or(DEFAULT_PORT),
                tls: options.tls || server.tls.unwrap_or(false),
                verify_tls: options.verify_tls
                    || server.verify_tls.unwrap_or(false),
                proxy: options.proxy.or(server.proxy),
                handshake_timeout: Some(timeout),
            },
            user: options.user.or(server.user),
            password: options.pass.or(server.password),
            prompt_password: options.prompt_password,
            retrieve: RetrieveOptions {
                group: options
                    .group
                    .or(fetch.group)
                    .unwrap_or_else(|| DEFAULT_GROUP.to_owned()),
                days: options.days.or(fetch.days).unwrap_or(DEFAULT_DAYS),
                resume: options.latest || fetch.resume.unwrap_or(false),
                batch_size,
            },
            timeout,
            state_dir: options
                .state_dir
                .or(fetch.state_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            log_config: options.log_config.or(config.log_config),
            log_level,
            trace: options.trace,
        })
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API, and 1 means the fetch failed.
    let options =
        Options::from_clap(&match Options::clap().get_matches_safe() {
            Ok(matches) => matches,
            Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::HelpDisplayed,
                    ..
                },
            )
            | Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::VersionDisplayed,
                    ..
                },
            ) => {
                println!("{}", e.message);
                return;
            }
            Err(e) => {
                eprintln!("{}", e.message);
                EX_USAGE.exit()
            }
        });

    let config = match options.config {
        None => Config::default(),
        Some(ref path) => match fs::read_to_string(path) {
            Err(e) => die!(
                EX_CONFIG,
                "Error reading '{}': {}",
                path.display(),
                e
            ),
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(e) => die!(
                    EX_CONFIG,
                    "Error in config file at '{}': {}",
                    path.display(),
                    e
                ),
            },
        },
    };

    let mut settings = match Settings::resolve(options, config) {
        Ok(settings) => settings,
        Err(e) => die!(EX_CONFIG, "Invalid configuration: {}", e),
    };

    match settings.log_config {
        Some(ref path) => {
            if let Err(e) = log4rs::init_file(
                path,
                log4rs::file::Deserializers::new(),
            ) {
                die!(
                    EX_CONFIG,
                    "Failed to load logging configuration from '{}': {}",
                    path.display(),
                    e
                );
            }
        }
        None => crate::init_simple_log(settings.log_level),
    }

    if settings.prompt_password && settings.password.is_none() {
        match rpassword::read_password_from_tty(Some("Password: ")) {
            Ok(p) => settings.password = Some(p),
            Err(e) => die!(EX_NOINPUT, "Failed to read password: {}", e),
        }
    }

    super::fetch::main(settings);
}
