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

//! Article range arithmetic.

use std::num::NonZeroU64;

/// Where to start given the group's current range `first..=last` and the last
/// article number recorded by a previous run.
///
/// Returns `None` if nothing newer than `saved_last` exists. A saved position
/// outside the current range (e.g. because the group was renumbered) is
/// ignored.
pub fn resume_start(first: u64, last: u64, saved_last: u64) -> Option<u64> {
    if saved_last >= last {
        None
    } else if saved_last >= first {
        Some(saved_last + 1)
    } else {
        Some(first)
    }
}

/// An inclusive range of article numbers covered by one listing command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batch {
    pub start: u64,
    pub end: u64,
}

/// Splits `first..=last` into contiguous batches of at most `size` articles,
/// in ascending order.
///
/// Yields nothing if `first > last`.
#[derive(Clone, Debug)]
pub struct Batches {
    next: Option<u64>,
    last: u64,
    size: NonZeroU64,
}

impl Batches {
    pub fn new(first: u64, last: u64, size: NonZeroU64) -> Self {
        Batches {
            next: Some(first),
            last,
            size,
        }
    }
}

impl Iterator for Batches {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let start = self.next.filter(|&start| start <= self.last)?;
        let end = start.saturating_add(self.size.get() - 1).min(self.last);
        // None once `last` is u64::MAX and has been covered
        self.next = end.checked_add(1);
        Some(Batch { start, end })
    }
}
