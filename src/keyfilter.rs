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
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::{
    host::{HardwareButton, NoteInput},
    matcher::NoteMatcher,
    triggers::TriggerDefinition,
};

/// The number of MIDI notes, and so of slots in the table.
pub const NOTE_COUNT: usize = 128;

/// The value a key translation table uses for a suppressed note.
const SUPPRESSED: i8 = -1;

/// Identifies a trigger within the key filter that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(usize);

/// A single note slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The note passes through to normal note handling.
    Free,
    /// The note is claimed by a trigger and suppressed.
    Claimed(TriggerId),
}

/// Decides which slot a trigger releases when it moves off a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The previous note's slot is freed even if another trigger claimed it
    /// in the meantime.
    #[default]
    LastWriterWins,
    /// The previous note's slot is only freed while it still points back to
    /// the trigger releasing it.
    OwnerChecked,
}

/// The note translation table the host's note input consumes. Free notes map to
/// themselves, claimed notes map to -1.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyTranslationTable([i8; NOTE_COUNT]);

impl KeyTranslationTable {
    /// A table that passes every note through unchanged.
    pub fn identity() -> KeyTranslationTable {
        let mut table = [0i8; NOTE_COUNT];
        for (note, entry) in table.iter_mut().enumerate() {
            *entry = note as i8;
        }
        KeyTranslationTable(table)
    }

    /// Projects the slots into a table.
    fn from_slots(slots: &[Slot; NOTE_COUNT]) -> KeyTranslationTable {
        let mut table = KeyTranslationTable::identity();
        for (entry, slot) in table.0.iter_mut().zip(slots.iter()) {
            if let Slot::Claimed(_) = slot {
                *entry = SUPPRESSED;
            }
        }
        table
    }

    /// Translates the note, returning None if the note is suppressed.
    pub fn translate(&self, note: u7) -> Option<u7> {
        u7::try_from(u8::try_from(self.0[note.as_int() as usize]).ok()?)
    }

    /// Returns true if the note is suppressed.
    pub fn is_suppressed(&self, note: u7) -> bool {
        self.translate(note).is_none()
    }

    /// The raw table entries.
    pub fn entries(&self) -> &[i8; NOTE_COUNT] {
        &self.0
    }

    /// The suppressed notes, in ascending order.
    pub fn suppressed(&self) -> Vec<u7> {
        (0..NOTE_COUNT as u8)
            .map(u7::from_int_lossy)
            .filter(|note| self.is_suppressed(*note))
            .collect()
    }
}

impl Default for KeyTranslationTable {
    fn default() -> Self {
        KeyTranslationTable::identity()
    }
}

impl fmt::Debug for KeyTranslationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTranslationTable")
            .field(
                "suppressed",
                &self
                    .suppressed()
                    .iter()
                    .map(|note| note.as_int())
                    .collect::<Vec<u8>>(),
            )
            .finish()
    }
}

/// Converts a raw setting value into a note. Raw values are truncated toward
/// zero; anything outside -1..=127 is clamped into range.
pub fn note_from_raw(raw: f64) -> Option<u7> {
    let truncated = raw.trunc();
    if !(-1.0..=127.0).contains(&truncated) {
        warn!(raw, "Note setting out of range, clamping.");
    }
    if truncated.is_nan() || truncated < 0.0 {
        return None;
    }
    Some(u7::from_int_lossy(truncated.min(127.0) as u8))
}

/// Renders a note the way the settings present it, -1 for unassigned.
pub fn note_value(note: Option<u7>) -> i16 {
    note.map_or(-1, |note| i16::from(note.as_int()))
}

/// A trigger owned by the key filter.
pub struct Trigger {
    definition: &'static TriggerDefinition,
    button: Box<dyn HardwareButton>,
    current_note: Option<u7>,
}

impl Trigger {
    pub fn definition(&self) -> &'static TriggerDefinition {
        self.definition
    }

    /// The note the trigger is currently bound to.
    pub fn current_note(&self) -> Option<u7> {
        self.current_note
    }
}

/// Owns the note slots and the triggers that claim them. Assignments mutate the
/// slots only; `publish` hands the resulting table to the host's note input.
pub struct KeyFilter<I: NoteInput> {
    slots: [Slot; NOTE_COUNT],
    triggers: Vec<Trigger>,
    input: I,
    policy: ConflictPolicy,
}

impl<I: NoteInput> KeyFilter<I> {
    /// Creates a key filter with every slot free.
    pub fn new(input: I, policy: ConflictPolicy) -> KeyFilter<I> {
        KeyFilter {
            slots: [Slot::Free; NOTE_COUNT],
            triggers: Vec::new(),
            input,
            policy,
        }
    }

    /// Adds an unassigned trigger.
    pub fn add_trigger(
        &mut self,
        definition: &'static TriggerDefinition,
        button: Box<dyn HardwareButton>,
    ) -> TriggerId {
        self.triggers.push(Trigger {
            definition,
            button,
            current_note: None,
        });
        TriggerId(self.triggers.len() - 1)
    }

    /// Moves the trigger to the given note, or unassigns it when given None.
    /// Returns the trigger's new note. The table is not published.
    pub fn assign_note(&mut self, id: TriggerId, note: Option<u7>) -> Option<u7> {
        let previous = self.triggers[id.0].current_note;
        if previous == note {
            return previous;
        }

        if let Some(previous) = previous {
            self.release(id, previous);
        }

        self.triggers[id.0]
            .button
            .set_action_matcher(note.map(NoteMatcher::new));

        if let Some(note) = note {
            let slot = &mut self.slots[note.as_int() as usize];
            if let Slot::Claimed(owner) = *slot {
                if owner != id {
                    warn!(
                        trigger = self.triggers[id.0].definition.id,
                        owner = self.triggers[owner.0].definition.id,
                        note = note.as_int(),
                        "Note already claimed, taking it over."
                    );
                }
            }
            *slot = Slot::Claimed(id);
        }

        let trigger = &mut self.triggers[id.0];
        trigger.current_note = note;
        debug!(
            trigger = trigger.definition.id,
            from = note_value(previous),
            to = note_value(note),
            "Assigned note."
        );
        note
    }

    /// Assigns the note from a raw setting value.
    pub fn assign_raw(&mut self, id: TriggerId, raw: f64) -> Option<u7> {
        self.assign_note(id, note_from_raw(raw))
    }

    fn release(&mut self, id: TriggerId, note: u7) {
        let slot = &mut self.slots[note.as_int() as usize];
        match (self.policy, *slot) {
            (ConflictPolicy::OwnerChecked, Slot::Claimed(owner)) if owner != id => {
                debug!(
                    trigger = self.triggers[id.0].definition.id,
                    note = note.as_int(),
                    "Slot owned by another trigger, leaving it claimed."
                );
            }
            _ => *slot = Slot::Free,
        }
    }

    /// Hands a snapshot of the slots to the host's note input.
    pub fn publish(&mut self) {
        let table = self.key_translation_table();
        trace!(table = ?table, "Publishing key filter.");
        self.input.set_key_translation_table(table);
    }

    /// Detaches every trigger's action and note matcher.
    pub fn dispose(&mut self) {
        for trigger in self.triggers.iter_mut() {
            trigger.button.clear_bindings();
            trigger.button.set_action_matcher(None);
        }
    }

    /// The table that `publish` would hand to the host.
    pub fn key_translation_table(&self) -> KeyTranslationTable {
        KeyTranslationTable::from_slots(&self.slots)
    }

    /// The slot for the given note.
    pub fn slot(&self, note: u7) -> Slot {
        self.slots[note.as_int() as usize]
    }

    /// The trigger currently claiming the note, if any.
    pub fn owner(&self, note: u7) -> Option<&Trigger> {
        match self.slot(note) {
            Slot::Free => None,
            Slot::Claimed(id) => Some(&self.triggers[id.0]),
        }
    }

    /// The trigger's current note.
    pub fn current_note(&self, id: TriggerId) -> Option<u7> {
        self.triggers[id.0].current_note
    }

    /// Finds a trigger by its definition's id or label.
    pub fn find(&self, name: &str) -> Option<TriggerId> {
        self.triggers
            .iter()
            .position(|trigger| trigger.definition.is_named(name))
            .map(TriggerId)
    }

    pub fn trigger(&self, id: TriggerId) -> &Trigger {
        &self.triggers[id.0]
    }

    /// All triggers in the order they were added.
    pub fn triggers(&self) -> impl Iterator<Item = (TriggerId, &Trigger)> {
        self.triggers
            .iter()
            .enumerate()
            .map(|(index, trigger)| (TriggerId(index), trigger))
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }
}
