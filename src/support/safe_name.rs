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

/// Determine whether the given newsgroup name is safe to use as the stem of a
/// bookmark file name.
///
/// This excludes empty names and patterns that cause directory traversal or
/// hidden files. Whether the result is a valid file name on the local system
/// is left to the OS to decide.
pub fn is_safe_group_name(name: &str) -> bool {
    !name.is_empty() &&
        // Block directory traversal through .. and creation of hidden files on
        // UNIX
        !name.starts_with('.') &&
        !name.contains('/') &&
        // Only a path separator on Windows, but always block since it has high
        // potential of causing problems
        !name.contains('\\') &&
        // Don't allow any ASCII control characters
        !name.contains(|c| c < ' ' || c == '\x7F')
}
