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

use std::io::{self, BufReader, Write};

use log::{debug, warn};
use thiserror::Error;

use super::main::Settings;
use crate::nntp::client::{self, Client};
use crate::nntp::transport::{self, Connection};
use crate::retrieve::bookmark::FileBookmarkStore;
use crate::retrieve::engine::{self, Retriever};
use crate::support::rcio::RcIo;
use crate::support::sysexits::*;

#[derive(Error, Debug)]
enum Error {
    #[error("Connection failed: {0}")]
    Connect(#[from] transport::Error),
    #[error("Server greeting failed: {0}")]
    Greeting(#[source] client::Error),
    #[error("Authentication failed: {0}")]
    Auth(#[source] client::Error),
    #[error("Error: {0}")]
    Retrieve(#[from] engine::Error),
    #[error("Error writing articles: {0}")]
    Output(#[source] io::Error),
}

pub(super) fn main(settings: Settings) {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    if let Err(e) = main_impl(&settings, &mut stdout) {
        die!(EX_FAILURE, "{}", e);
    }
}

fn main_impl(settings: &Settings, out: &mut impl Write) -> Result<(), Error> {
    let connection = transport::connect(&settings.connect)?;
    debug!(
        "Connected to {}:{}",
        settings.connect.host, settings.connect.port
    );

    let io = RcIo::wrap(connection);
    io.inner().set_read_timeout(settings.timeout);

    let mut client =
        Client::new(BufReader::new(io.clone()), io.clone(), settings.trace);
    let result = session(settings, &mut client, out);

    // Only worth trying if the session itself went well; after a timeout or
    // a broken connection it would just stall or fail again.
    if result.is_ok() {
        if let Err(e) = client.quit() {
            debug!("QUIT failed: {}", e);
        }
    }

    io.inner().close();
    result
}

fn session(
    settings: &Settings,
    client: &mut Client<BufReader<RcIo<Connection>>, RcIo<Connection>>,
    out: &mut impl Write,
) -> Result<(), Error> {
    let greeting = client.read_greeting().map_err(Error::Greeting)?;
    debug!("Server greeting: {}", greeting.text);

    if let Some(ref user) = settings.user {
        let password = settings.password.as_deref().unwrap_or_else(|| {
            warn!("No password given for user {}, sending an empty one", user);
            ""
        });
        client.authenticate(user, password).map_err(Error::Auth)?;
    }

    let store = FileBookmarkStore::new(&settings.state_dir);
    let articles =
        Retriever::new(client, &store).retrieve(&settings.retrieve)?;

    for article in &articles {
        debug!("Writing article {}", article.number);
        out.write_all(&article.text).map_err(Error::Output)?;
    }
    out.flush().map_err(Error::Output)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::num::NonZeroU64;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::nntp::transport::ConnectOptions;
    use crate::retrieve::engine::RetrieveOptions;
    use crate::test_data::*;

    /// Serve one connection, answering each command from `respond`, and
    /// return every command received.
    fn serve(
        greeting: &'static str,
        respond: fn(&str) -> String,
    ) -> (u16, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            let mut write = sock.try_clone().unwrap();
            let mut read = BufReader::new(sock);
            write.write_all(greeting.as_bytes()).unwrap();

            let mut commands = Vec::new();
            let mut line = String::new();
            loop {
                line.clear();
                if 0 == read.read_line(&mut line).unwrap_or(0) {
                    break;
                }
                let command = line.trim_end().to_owned();
                let quit = "QUIT" == command;
                let _ = write.write_all(respond(&command).as_bytes());
                commands.push(command);
                if quit {
                    break;
                }
            }
            commands
        });
        (port, handle)
    }

    fn settings(port: u16, state_dir: PathBuf) -> Settings {
        Settings {
            connect: ConnectOptions {
                host: "127.0.0.1".to_owned(),
                port,
                tls: false,
                verify_tls: false,
                proxy: None,
                handshake_timeout: None,
            },
            user: None,
            password: None,
            prompt_password: false,
            retrieve: RetrieveOptions {
                group: "alt.test".to_owned(),
                days: 0,
                resume: false,
                batch_size: NonZeroU64::new(2).unwrap(),
            },
            timeout: Duration::from_secs(10),
            state_dir,
            log_config: None,
            log_level: log::LevelFilter::Debug,
            trace: true,
        }
    }

    fn news_server(command: &str) -> String {
        match command {
            "AUTHINFO USER azure" => "381 PASS required\r\n".to_owned(),
            "AUTHINFO PASS hunter2" => "281 Ok\r\n".to_owned(),
            "GROUP alt.test" => "211 3 1 3 alt.test\r\n".to_owned(),
            "XOVER 1-2" => format!(
                "224 Overview follows\r\n{}{}.\r\n",
                overview_line(1, "Mon, 1 Jun 2020 12:00:00 +0000"),
                overview_line(2, "Mon, 1 Jun 2020 13:00:00 +0000"),
            ),
            "XOVER 3-3" => format!(
                "224 Overview follows\r\n{}.\r\n",
                overview_line(3, "Mon, 1 Jun 2020 14:00:00 +0000"),
            ),
            "ARTICLE 1" => article_response(1),
            "ARTICLE 2" => article_response(2),
            "ARTICLE 3" => article_response(3),
            "QUIT" => "205 Bye\r\n".to_owned(),
            _ => "500 What?\r\n".to_owned(),
        }
    }

    #[test]
    fn fetches_whole_group() {
        crate::init_test_log();

        let (port, server) =
            serve("200 news.example.invalid ready\r\n", news_server);
        let state = TempDir::new().unwrap();

        let mut settings = settings(port, state.path().to_owned());
        // Too far away to be a deadline at all
        settings.timeout = Duration::from_secs(u64::MAX);

        let mut out = Vec::<u8>::new();
        main_impl(&settings, &mut out).unwrap();

        let expected = format!(
            "{}{}{}",
            article_response(1),
            article_response(2),
            article_response(3),
        );
        assert_eq!(expected, String::from_utf8(out).unwrap());
        assert_eq!(
            vec![
                "GROUP alt.test",
                "XOVER 1-2",
                "ARTICLE 1",
                "ARTICLE 2",
                "XOVER 3-3",
                "ARTICLE 3",
                "QUIT",
            ],
            server.join().unwrap()
        );

        // Not resuming, so nothing was recorded
        assert!(!state.path().join("alt.test.json").exists());
    }

    #[test]
    fn authenticates_and_resumes() {
        crate::init_test_log();

        let state = TempDir::new().unwrap();
        let mut settings = settings(0, state.path().to_owned());
        settings.user = Some("azure".to_owned());
        settings.password = Some("hunter2".to_owned());
        settings.retrieve.resume = true;

        let (port, server) = serve("201 no posting\r\n", news_server);
        settings.connect.port = port;
        let mut out = Vec::<u8>::new();
        main_impl(&settings, &mut out).unwrap();
        assert!(!out.is_empty());
        let commands = server.join().unwrap();
        assert_eq!("AUTHINFO USER azure", commands[0]);
        assert_eq!("AUTHINFO PASS hunter2", commands[1]);
        assert!(state.path().join("alt.test.json").is_file());

        // Second run finds nothing new and succeeds without output
        let (port, server) = serve("200 ready\r\n", news_server);
        settings.connect.port = port;
        let mut out = Vec::<u8>::new();
        main_impl(&settings, &mut out).unwrap();
        assert!(out.is_empty());
        let commands = server.join().unwrap();
        assert!(!commands.iter().any(|c| c.starts_with("XOVER")));
    }

    #[test]
    fn bad_greeting_is_fatal() {
        crate::init_test_log();

        let (port, server) = serve("502 go away\r\n", news_server);
        let state = TempDir::new().unwrap();
        let mut out = Vec::<u8>::new();
        assert_matches!(
            Err(Error::Greeting(_)),
            main_impl(&settings(port, state.path().to_owned()), &mut out)
        );
        assert!(server.join().unwrap().is_empty());
    }

    #[test]
    fn rejected_password_is_fatal() {
        crate::init_test_log();

        let (port, server) = serve("200 ready\r\n", news_server);
        let state = TempDir::new().unwrap();
        let mut settings = settings(port, state.path().to_owned());
        settings.user = Some("azure".to_owned());
        settings.password = Some("wrong".to_owned());

        let mut out = Vec::<u8>::new();
        assert_matches!(
            Err(Error::Auth(client::Error::Auth(_))),
            main_impl(&settings, &mut out)
        );
        server.join().unwrap();
    }
}
