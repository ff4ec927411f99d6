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
use crate::triggers::TriggerDefinition;

use super::{
    preferences::Preferences,
    surface::{HardwareSurface, NoteInputPort},
    transport::Transport,
    HardwareButton, NumberSetting,
};

/// A host made of a hardware surface, a preferences file and a transport.
pub struct Standalone {
    pub surface: HardwareSurface,
    pub preferences: Preferences,
    pub transport: Transport,
}

impl Standalone {
    pub fn new(surface: HardwareSurface, preferences: Preferences, transport: Transport) -> Self {
        Standalone {
            surface,
            preferences,
            transport,
        }
    }
}

impl super::Host for Standalone {
    type Input = NoteInputPort;

    fn create_note_input(&mut self) -> NoteInputPort {
        self.surface.note_input()
    }

    fn create_button(&mut self, definition: &'static TriggerDefinition) -> Box<dyn HardwareButton> {
        Box::new(self.surface.create_button(definition))
    }

    fn number_setting(
        &mut self,
        definition: &'static TriggerDefinition,
        setting: &NumberSetting,
    ) -> f64 {
        self.preferences.number_setting(definition.id, setting)
    }

    fn observe_setting(&mut self, definition: &'static TriggerDefinition) {
        self.preferences.observe(definition.id);
    }
}
