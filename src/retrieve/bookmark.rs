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

//! Persistent per-group resume positions.
//!
//! Each group's bookmarks live in `<group>.json` in the state directory, as a
//! JSON object mapping group names to their `GroupState`. Nothing here locks
//! the file; two fetchers running against the same group at once may
//! overwrite each other's progress.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::support::file_ops::{self, IgnoreKinds};
use crate::support::safe_name::is_safe_group_name;

/// Bookmark files may reveal what a user reads, so only the owner may access
/// them.
const BOOKMARK_MODE: u32 = 0o600;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsafe group name for a bookmark file: {0:?}")]
    UnsafeName(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    /// The highest article number covered by a completed batch.
    pub last_article: u64,
    pub last_fetch: DateTime<Utc>,
}

/// The content of one bookmark file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmarks(BTreeMap<String, GroupState>);

impl Bookmarks {
    pub fn get(&self, group: &str) -> Option<&GroupState> {
        self.0.get(group)
    }

    pub fn insert(&mut self, group: &str, state: GroupState) {
        self.0.insert(group.to_owned(), state);
    }
}

/// Where bookmarks are kept between runs.
pub trait BookmarkStore {
    /// Load the bookmarks for `group`, or `None` if none have been saved.
    fn load(&self, group: &str) -> Result<Option<Bookmarks>, Error>;
    /// Replace the saved bookmarks for `group`.
    fn save(&self, group: &str, bookmarks: &Bookmarks) -> Result<(), Error>;
}

/// Keeps bookmarks as JSON files in a directory.
#[derive(Clone, Debug)]
pub struct FileBookmarkStore {
    dir: PathBuf,
}

impl FileBookmarkStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FileBookmarkStore {
            dir: dir.as_ref().to_owned(),
        }
    }

    fn path(&self, group: &str) -> Result<PathBuf, Error> {
        if !is_safe_group_name(group) {
            return Err(Error::UnsafeName(group.to_owned()));
        }

        Ok(self.dir.join(format!("{}.json", group)))
    }
}

impl BookmarkStore for FileBookmarkStore {
    fn load(&self, group: &str) -> Result<Option<Bookmarks>, Error> {
        let path = self.path(group)?;
        match fs::read(&path).map(Some).ignore_not_found()? {
            None => Ok(None),
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
        }
    }

    fn save(&self, group: &str, bookmarks: &Bookmarks) -> Result<(), Error> {
        let path = self.path(group)?;
        let data = serde_json::to_vec_pretty(bookmarks)?;
        file_ops::spit(&path, BOOKMARK_MODE, &data)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;
    use crate::support::chronox::*;

    fn state(last_article: u64) -> GroupState {
        GroupState {
            last_article,
            last_fetch: Utc.ymd_hmsx(2024, 3, 15, 8, 30, 0),
        }
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileBookmarkStore::new(dir.path());
        assert_eq!(None, store.load("alt.test").unwrap());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileBookmarkStore::new(dir.path());

        let mut bookmarks = Bookmarks::default();
        bookmarks.insert("alt.test", state(1000));
        store.save("alt.test", &bookmarks).unwrap();

        let loaded = store.load("alt.test").unwrap().unwrap();
        assert_eq!(Some(&state(1000)), loaded.get("alt.test"));
        assert_eq!(None, loaded.get("alt.other"));

        let path = dir.path().join("alt.test.json");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(0o600, mode & 0o777);

        // Other groups get their own files.
        assert_eq!(None, store.load("alt.other").unwrap());
    }

    #[test]
    fn file_format() {
        let dir = TempDir::new().unwrap();
        let store = FileBookmarkStore::new(dir.path());
        fs::write(
            dir.path().join("alt.test.json"),
            r#"{
  "alt.test": {
    "last_article": 1234,
    "last_fetch": "2024-03-15T08:30:00Z"
  }
}"#,
        )
        .unwrap();

        let loaded = store.load("alt.test").unwrap().unwrap();
        assert_eq!(Some(&state(1234)), loaded.get("alt.test"));

        let mut bookmarks = Bookmarks::default();
        bookmarks.insert("alt.test", state(1234));
        store.save("alt.test", &bookmarks).unwrap();
        let json: serde_json::Value = serde_json::from_slice(
            &fs::read(dir.path().join("alt.test.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(1234, json["alt.test"]["last_article"]);
        assert_eq!(
            "2024-03-15T08:30:00Z",
            json["alt.test"]["last_fetch"].as_str().unwrap()
        );
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileBookmarkStore::new(dir.path());
        fs::write(dir.path().join("alt.test.json"), "{ nope").unwrap();
        assert_matches!(Err(Error::Json(_)), store.load("alt.test"));
    }

    #[test]
    fn unsafe_group_names_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileBookmarkStore::new(dir.path());
        assert_matches!(
            Err(Error::UnsafeName(_)),
            store.load("../../etc/passwd")
        );
        assert_matches!(
            Err(Error::UnsafeName(_)),
            store.save("", &Bookmarks::default())
        );
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileBookmarkStore::new(dir.path().join("missing"));
        assert_matches!(
            Err(Error::Io(_)),
            store.save("alt.test", &Bookmarks::default())
        );
    }
}
