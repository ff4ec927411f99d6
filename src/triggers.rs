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

/// The category used to group triggers in the host's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Transport,
    CursorTrack,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Transport => "Transport",
            Category::CursorTrack => "Cursor track",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Host actions a trigger can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Starts the transport.
    Play,

    /// Stops the transport.
    Stop,

    /// Toggles recording.
    Record,

    /// Registers a tempo tap.
    TapTempo,

    /// Toggles record arm on the cursor track.
    ToggleArm,

    /// Toggles solo on the cursor track.
    ToggleSolo,

    /// Toggles mute on the cursor track.
    ToggleMute,

    /// Moves the cursor to the previous track.
    PreviousTrack,

    /// Moves the cursor to the next track.
    NextTrack,
}

/// A static description of a trigger. The manager creates one trigger per definition.
#[derive(Debug, PartialEq, Eq)]
pub struct TriggerDefinition {
    /// Stable identifier, also used as the preferences key.
    pub id: &'static str,
    /// Human readable label.
    pub label: &'static str,
    pub category: Category,
    pub action: ActionKind,
}

impl TriggerDefinition {
    /// Returns true if the given name is this trigger's id, its id without the
    /// common prefix or its label (case insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        let name = name.trim();
        self.id == name
            || self.id.strip_prefix(ID_PREFIX) == Some(name)
            || self.label.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for TriggerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.label, self.category, self.id)
    }
}

const ID_PREFIX: &str = "gknt-";

/// All triggers, in declaration order. Startup walks this list in order.
pub static TRIGGERS: [TriggerDefinition; 9] = [
    TriggerDefinition {
        id: "gknt-play",
        label: "Play",
        category: Category::Transport,
        action: ActionKind::Play,
    },
    TriggerDefinition {
        id: "gknt-stop",
        label: "Stop",
        category: Category::Transport,
        action: ActionKind::Stop,
    },
    TriggerDefinition {
        id: "gknt-record",
        label: "Record",
        category: Category::Transport,
        action: ActionKind::Record,
    },
    TriggerDefinition {
        id: "gknt-tap-tempo",
        label: "Tap tempo",
        category: Category::Transport,
        action: ActionKind::TapTempo,
    },
    TriggerDefinition {
        id: "gknt-track-arm",
        label: "Record arm",
        category: Category::CursorTrack,
        action: ActionKind::ToggleArm,
    },
    TriggerDefinition {
        id: "gknt-track-solo",
        label: "Solo",
        category: Category::CursorTrack,
        action: ActionKind::ToggleSolo,
    },
    TriggerDefinition {
        id: "gknt-track-mute",
        label: "Mute",
        category: Category::CursorTrack,
        action: ActionKind::ToggleMute,
    },
    TriggerDefinition {
        id: "gknt-track-prev",
        label: "Previous track",
        category: Category::CursorTrack,
        action: ActionKind::PreviousTrack,
    },
    TriggerDefinition {
        id: "gknt-track-next",
        label: "Next track",
        category: Category::CursorTrack,
        action: ActionKind::NextTrack,
    },
];

/// Finds a trigger definition by id or label.
pub fn find(name: &str) -> Option<&'static TriggerDefinition> {
    TRIGGERS.iter().find(|definition| definition.is_named(name))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::{find, ActionKind, TRIGGERS};

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<&str> = TRIGGERS.iter().map(|definition| definition.id).collect();
        assert_eq!(TRIGGERS.len(), ids.len());
    }

    #[test]
    fn every_action_is_bound_once() {
        let actions: HashSet<ActionKind> = TRIGGERS
            .iter()
            .map(|definition| definition.action)
            .collect();
        assert_eq!(TRIGGERS.len(), actions.len());
    }

    #[test]
    fn find_by_name() {
        assert_eq!(Some(&TRIGGERS[0]), find("gknt-play"));
        assert_eq!(Some(&TRIGGERS[7]), find("track-prev"));
        assert_eq!(Some(&TRIGGERS[3]), find("tap TEMPO"));
        assert_eq!(None, find("rewind"));
    }
}
