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

//! Walks a group's article range and pulls out the matching articles.
//!
//! One run proceeds as follows:
//!
//! 1. Select the group, learning its current range `first..=last`.
//!
//! 2. In resume mode, move `first` past the last article covered by a
//!    previous run. If nothing newer exists, the run ends with an empty
//!    result.
//!
//! 3. Cover the range in batches of at most `batch_size` articles. For each
//!    batch, list the overview lines, drop any that are malformed or (with an
//!    age limit) too old or undated, and fetch the remaining articles in
//!    listing order. An article which cannot be fetched is skipped.
//!
//! 4. In resume mode, record the end of each batch as the new resume position
//!    once the batch is done, unless the batch ends at the very first article
//!    of the run.
//!
//! 5. If no article at all was fetched, the run fails with
//!    `Error::NoMatchingArticles`.
//!
//! Any other protocol or I/O error aborts the run, discarding what was
//! fetched so far.

use std::io::{BufRead, Write};
use std::num::NonZeroU64;

use chrono::prelude::*;
use log::{debug, info, warn};
use thiserror::Error;

use super::bookmark::{BookmarkStore, Bookmarks, GroupState};
use super::range::{resume_start, Batch, Batches};
use crate::nntp::client::{self, Client};
use crate::nntp::syntax::{display_line, OverviewEntry};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] client::Error),
    #[error("No articles found matching criteria")]
    NoMatchingArticles,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrieveOptions {
    pub group: String,
    /// Only fetch articles dated within this many days. 0 disables the age
    /// check entirely.
    pub days: u32,
    /// Whether to consult and update the bookmark store.
    pub resume: bool,
    pub batch_size: NonZeroU64,
}

/// One fetched article.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Article {
    pub number: u64,
    /// The `220` line, the unstuffed body, and a final `.` line.
    pub text: Vec<u8>,
}

pub struct Retriever<'a, R, W> {
    client: &'a mut Client<R, W>,
    store: &'a dyn BookmarkStore,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, R: BufRead, W: Write> Retriever<'a, R, W> {
    pub fn new(
        client: &'a mut Client<R, W>,
        store: &'a dyn BookmarkStore,
    ) -> Self {
        Retriever {
            client,
            store,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn retrieve(
        &mut self,
        options: &RetrieveOptions,
    ) -> Result<Vec<Article>, Error> {
        let group = options.group.as_str();
        let range = self.client.group(group)?;
        debug!(
            "{}: {} articles, {}..={}",
            group, range.count, range.first, range.last
        );

        let mut bookmarks = if options.resume {
            self.load_bookmarks(group)
        } else {
            Bookmarks::default()
        };

        let mut first = range.first;
        if let Some(saved) = bookmarks.get(group) {
            match resume_start(range.first, range.last, saved.last_article) {
                None => {
                    info!(
                        "No new articles available since last fetch \
                         (last article: {})",
                        saved.last_article
                    );
                    return Ok(Vec::new());
                }
                Some(start) if start != first => {
                    info!(
                        "Resuming from article {} (last fetched was {})",
                        start, saved.last_article
                    );
                    first = start;
                }
                Some(_) => (),
            }
        }

        let cutoff = self.cutoff(options.days);
        let mut articles = Vec::new();
        for batch in Batches::new(first, range.last, options.batch_size) {
            for number in self.list_batch(batch, cutoff)? {
                if let Some(article) = self.fetch(number)? {
                    articles.push(article);
                }
            }

            if options.resume && batch.end > first {
                self.record_progress(&mut bookmarks, group, batch.end);
            }
        }

        if articles.is_empty() {
            return Err(Error::NoMatchingArticles);
        }

        Ok(articles)
    }

    fn load_bookmarks(&self, group: &str) -> Bookmarks {
        match self.store.load(group) {
            Ok(bookmarks) => bookmarks.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load bookmarks for {}: {}", group, e);
                Bookmarks::default()
            }
        }
    }

    /// The oldest acceptable article date, if any.
    fn cutoff(&self, days: u32) -> Option<DateTime<Utc>> {
        if 0 == days {
            return None;
        }

        let now = (self.clock)();
        Some(
            now.checked_sub_signed(chrono::Duration::days(days.into()))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// List `batch` and return the numbers of the articles worth fetching.
    fn list_batch(
        &mut self,
        batch: Batch,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<u64>, Error> {
        let lines = self.client.over(batch.start, batch.end)?;
        let total = lines.len();

        let numbers = lines
            .iter()
            .filter_map(|line| {
                let entry = OverviewEntry::parse(line);
                if entry.is_none() {
                    warn!(
                        "Ignoring malformed overview line: {}",
                        display_line(line)
                    );
                }
                entry
            })
            .filter(|entry| match cutoff {
                None => true,
                Some(cutoff) => entry
                    .date()
                    .map_or(false, |date| date.with_timezone(&Utc) >= cutoff),
            })
            .map(|entry| entry.number)
            .collect::<Vec<_>>();

        debug!(
            "Batch {}-{}: {} of {} listed articles selected",
            batch.start,
            batch.end,
            numbers.len(),
            total
        );
        Ok(numbers)
    }

    /// Fetch one article.
    ///
    /// Failures specific to this article yield `Ok(None)`. A timeout is
    /// fatal to the whole run.
    fn fetch(&mut self, number: u64) -> Result<Option<Article>, Error> {
        match self.client.article(number) {
            Ok(text) => Ok(Some(Article { number, text })),
            Err(client::Error::Timeout) => Err(client::Error::Timeout.into()),
            Err(e) => {
                warn!("Failed to fetch article {}: {}", number, e);
                Ok(None)
            }
        }
    }

    fn record_progress(
        &self,
        bookmarks: &mut Bookmarks,
        group: &str,
        last_article: u64,
    ) {
        bookmarks.insert(
            group,
            GroupState {
                last_article,
                last_fetch: (self.clock)(),
            },
        );

        if let Err(e) = self.store.save(group, bookmarks) {
            warn!("Failed to save bookmarks for {}: {}", group, e);
        }
    }
}
