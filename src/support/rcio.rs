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

use std::cell::{RefCell, RefMut};
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Shares one duplex stream between the read and write halves of a client.
///
/// The read half is normally wrapped in a `BufReader`, which takes ownership
/// of what it wraps; the write half and the code that eventually closes the
/// connection each hold another clone. All clones delegate to the same
/// stream.
#[derive(Debug)]
pub struct RcIo<T>(Rc<RefCell<T>>);

impl<T> RcIo<T> {
    pub fn wrap(inner: T) -> Self {
        RcIo(Rc::new(RefCell::new(inner)))
    }

    /// Borrow the underlying stream, e.g. to adjust its read deadline.
    ///
    /// Panics if called while a read or write on another clone is in
    /// progress, which cannot happen in single-threaded use.
    pub fn inner(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }
}

impl<T> Clone for RcIo<T> {
    fn clone(&self) -> Self {
        RcIo(Rc::clone(&self.0))
    }
}

impl<T: Read> Read for RcIo<T> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.0.borrow_mut().read(dst)
    }
}

impl<T: Write> Write for RcIo<T> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(src)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

#[cfg(test)]
mod test {
    use std::io::{BufRead, BufReader, Cursor};

    use super::*;

    #[test]
    fn clones_share_position() {
        let shared = RcIo::wrap(Cursor::new(b"200 hello\r\nrest".to_vec()));
        let mut reader = BufReader::with_capacity(4, shared.clone());

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!("200 hello\r\n", line);

        // The buffered reader consumed whole chunks, so the cursor must be
        // at least past the line it returned.
        assert!(shared.inner().position() >= 11);
    }
}
