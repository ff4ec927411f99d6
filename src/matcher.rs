// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;

use midly::num::u7;

const STATUS_MASK: u8 = 0xF0;
const NOTE_ON: u8 = 0x90;

/// Gates an action so that it only fires for a Note-On of a single key, on any channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMatcher {
    note: u7,
}

impl NoteMatcher {
    /// Creates a matcher for the given note.
    pub fn new(note: u7) -> NoteMatcher {
        NoteMatcher { note }
    }

    /// The note this matcher fires for.
    pub fn note(&self) -> u7 {
        self.note
    }

    /// Returns true if the raw MIDI message is a Note-On for this matcher's note.
    /// Velocity is not inspected, so a Note-On with velocity 0 also matches.
    pub fn matches(&self, raw: &[u8]) -> bool {
        match raw {
            [status, data1, ..] => {
                status & STATUS_MASK == NOTE_ON && *data1 == self.note.as_int()
            }
            _ => false,
        }
    }
}

/// Renders the matcher as a host matcher expression.
impl fmt::Display for NoteMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "((status & {}) == {} && data1 == {})",
            STATUS_MASK,
            NOTE_ON,
            self.note.as_int()
        )
    }
}

#[cfg(test)]
mod test {
    use midly::num::u7;

    use super::NoteMatcher;

    #[test]
    fn matches_note_on_on_any_channel() {
        let matcher = NoteMatcher::new(u7::from_int_lossy(60));

        assert!(matcher.matches(&[0x90, 60, 100]));
        assert!(matcher.matches(&[0x9F, 60, 1]));
        assert!(matcher.matches(&[0x93, 60, 0]));
    }

    #[test]
    fn ignores_everything_else() {
        let matcher = NoteMatcher::new(u7::from_int_lossy(60));

        assert!(!matcher.matches(&[0x90, 61, 100]));
        assert!(!matcher.matches(&[0x80, 60, 0]));
        assert!(!matcher.matches(&[0xB0, 60, 127]));
        assert!(!matcher.matches(&[0x90]));
        assert!(!matcher.matches(&[]));
    }

    #[test]
    fn renders_host_expression() {
        let matcher = NoteMatcher::new(u7::from_int_lossy(36));
        assert_eq!(
            "((status & 240) == 144 && data1 == 36)",
            matcher.to_string()
        );
    }
}
