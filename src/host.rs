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
//! The capabilities the extension consumes from its host. The extension never
//! constructs these itself; a host implements the traits and hands them over.

use crate::{keyfilter::KeyTranslationTable, matcher::NoteMatcher, triggers::TriggerDefinition};

pub mod preferences;
pub mod standalone;
pub mod surface;
pub mod transport;

/// A button on the host's hardware surface whose pressed action is bound to a
/// host action (play, stop, ...).
pub trait HardwareButton: Send {
    /// Gates the pressed action with the given matcher, or removes the gate
    /// entirely when given None. An ungated button never fires from MIDI.
    fn set_action_matcher(&mut self, matcher: Option<NoteMatcher>);

    /// Detaches the host action from the pressed action.
    fn clear_bindings(&mut self);
}

/// The note input of the host's MIDI input port.
pub trait NoteInput: Send {
    /// Replaces the active key translation table.
    fn set_key_translation_table(&mut self, table: KeyTranslationTable);
}

/// Describes a numeric user setting as the host presents it.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberSetting {
    pub label: &'static str,
    pub category: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: &'static str,
    pub default: f64,
}

impl NumberSetting {
    /// The note setting of a trigger: -1 (unassigned) to 127 in steps of 1.
    pub fn note(definition: &TriggerDefinition) -> NumberSetting {
        NumberSetting {
            label: definition.label,
            category: definition.category.label(),
            min: -1.0,
            max: 127.0,
            step: 1.0,
            unit: "",
            default: -1.0,
        }
    }

    /// Snaps the raw value to the setting's step and range.
    pub fn clamp(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return self.default;
        }
        let steps = ((raw - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }
}

/// The host runtime as seen by the extension at startup.
pub trait Host {
    type Input: NoteInput;

    /// Creates the note input on the first MIDI input port. The input starts
    /// with the identity translation table.
    fn create_note_input(&mut self) -> Self::Input;

    /// Creates a hardware button for the trigger with its pressed action bound
    /// to the trigger's host action.
    fn create_button(&mut self, definition: &'static TriggerDefinition) -> Box<dyn HardwareButton>;

    /// Registers the number setting and returns its persisted raw value.
    fn number_setting(
        &mut self,
        definition: &'static TriggerDefinition,
        setting: &NumberSetting,
    ) -> f64;

    /// Subscribes to value changes of the trigger's setting. The host delivers
    /// them through `Extension::setting_changed`.
    fn observe_setting(&mut self, definition: &'static TriggerDefinition);
}
