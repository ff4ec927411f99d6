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
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use midly::{live::LiveEvent, MidiMessage};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    keyfilter::KeyTranslationTable,
    matcher::NoteMatcher,
    triggers::{ActionKind, TriggerDefinition},
};

struct ButtonState {
    definition: &'static TriggerDefinition,
    matcher: Option<NoteMatcher>,
    bound: bool,
}

/// The standalone host's hardware surface and note input. Buttons and the note
/// input are handles into the surface, so the extension can own them while the
/// surface routes incoming MIDI.
#[derive(Clone)]
pub struct HardwareSurface {
    buttons: Arc<Mutex<Vec<ButtonState>>>,
    table: Arc<RwLock<KeyTranslationTable>>,
    publish_count: Arc<AtomicUsize>,
    consume_events: bool,
}

/// The result of routing one incoming MIDI message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Routed {
    /// Actions of the buttons that fired, in button creation order.
    pub actions: Vec<ActionKind>,
    /// The message to pass on to normal note handling, if any.
    pub forward: Option<Vec<u8>>,
}

impl HardwareSurface {
    /// Creates an empty surface. If consume_events is false, the key translation
    /// table is bypassed and every message is forwarded.
    pub fn new(consume_events: bool) -> HardwareSurface {
        HardwareSurface {
            buttons: Arc::new(Mutex::new(Vec::new())),
            table: Arc::new(RwLock::new(KeyTranslationTable::identity())),
            publish_count: Arc::new(AtomicUsize::new(0)),
            consume_events,
        }
    }

    /// Creates a button bound to the trigger's action, without a matcher.
    pub fn create_button(&self, definition: &'static TriggerDefinition) -> Button {
        let mut buttons = self.buttons.lock();
        buttons.push(ButtonState {
            definition,
            matcher: None,
            bound: true,
        });
        Button {
            index: buttons.len() - 1,
            buttons: self.buttons.clone(),
        }
    }

    /// Gets a handle to the note input.
    pub fn note_input(&self) -> NoteInputPort {
        NoteInputPort {
            table: self.table.clone(),
            publish_count: self.publish_count.clone(),
        }
    }

    /// The active key translation table.
    pub fn key_translation_table(&self) -> KeyTranslationTable {
        *self.table.read()
    }

    /// How many tables have been published to the note input.
    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }

    /// The matcher gating the button with the given trigger id.
    pub fn matcher(&self, id: &str) -> Option<NoteMatcher> {
        self.buttons
            .lock()
            .iter()
            .find(|button| button.definition.id == id)
            .and_then(|button| button.matcher)
    }

    /// Whether the button with the given trigger id is still bound to its action.
    pub fn is_bound(&self, id: &str) -> bool {
        self.buttons
            .lock()
            .iter()
            .any(|button| button.definition.id == id && button.bound)
    }

    /// Routes a raw MIDI message: fires the buttons it matches, then runs note
    /// messages through the key translation table.
    pub fn process(&self, raw: &[u8]) -> Routed {
        let actions = self
            .buttons
            .lock()
            .iter()
            .filter(|button| {
                button.bound
                    && button
                        .matcher
                        .is_some_and(|matcher| matcher.matches(raw))
            })
            .map(|button| button.definition.action)
            .collect();

        let event = match LiveEvent::parse(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(err = format!("{:?}", e), "Error parsing event.");
                return Routed {
                    actions,
                    forward: None,
                };
            }
        };

        if !self.consume_events {
            return Routed {
                actions,
                forward: Some(raw.to_vec()),
            };
        }

        let forward = match event {
            LiveEvent::Midi { channel, message } => {
                let table = self.table.read();
                let message = match message {
                    MidiMessage::NoteOn { key, vel } => {
                        table.translate(key).map(|key| MidiMessage::NoteOn { key, vel })
                    }
                    MidiMessage::NoteOff { key, vel } => table
                        .translate(key)
                        .map(|key| MidiMessage::NoteOff { key, vel }),
                    MidiMessage::Aftertouch { key, vel } => table
                        .translate(key)
                        .map(|key| MidiMessage::Aftertouch { key, vel }),
                    message => Some(message),
                };
                match message {
                    Some(message) => {
                        let mut buf: Vec<u8> = Vec::with_capacity(8);
                        match (LiveEvent::Midi { channel, message }).write(&mut buf) {
                            Ok(()) => Some(buf),
                            Err(e) => {
                                warn!(err = e.to_string(), "Error writing event.");
                                None
                            }
                        }
                    }
                    None => {
                        debug!(raw = ?raw, "Suppressed note.");
                        None
                    }
                }
            }
            _ => Some(raw.to_vec()),
        };

        Routed { actions, forward }
    }
}

/// A handle to a button on the surface.
pub struct Button {
    index: usize,
    buttons: Arc<Mutex<Vec<ButtonState>>>,
}

impl super::HardwareButton for Button {
    fn set_action_matcher(&mut self, matcher: Option<NoteMatcher>) {
        self.buttons.lock()[self.index].matcher = matcher;
    }

    fn clear_bindings(&mut self) {
        self.buttons.lock()[self.index].bound = false;
    }
}

/// A handle to the surface's note input.
pub struct NoteInputPort {
    table: Arc<RwLock<KeyTranslationTable>>,
    publish_count: Arc<AtomicUsize>,
}

impl super::NoteInput for NoteInputPort {
    fn set_key_translation_table(&mut self, table: KeyTranslationTable) {
        *self.table.write() = table;
        self.publish_count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use midly::num::u7;

    use crate::{
        host::{HardwareButton, NoteInput},
        keyfilter::{ConflictPolicy, KeyFilter},
        matcher::NoteMatcher,
        triggers::{ActionKind, TRIGGERS},
    };

    use super::{HardwareSurface, Routed};

    fn surface_with_play_on(note: u8, consume_events: bool) -> HardwareSurface {
        let surface = HardwareSurface::new(consume_events);
        let mut key_filter = KeyFilter::new(surface.note_input(), ConflictPolicy::default());
        for definition in TRIGGERS.iter() {
            key_filter.add_trigger(definition, Box::new(surface.create_button(definition)));
        }
        let play = key_filter.find("gknt-play").expect("play trigger");
        key_filter.assign_note(play, Some(u7::from_int_lossy(note)));
        key_filter.publish();
        surface
    }

    #[test]
    fn claimed_note_fires_and_is_suppressed() {
        let surface = surface_with_play_on(60, true);

        assert_eq!(
            Routed {
                actions: vec![ActionKind::Play],
                forward: None,
            },
            surface.process(&[0x91, 60, 100])
        );

        // The note off is suppressed too, but fires nothing.
        assert_eq!(Routed::default(), surface.process(&[0x81, 60, 0]));
    }

    #[test]
    fn free_notes_and_other_messages_pass_through() {
        let surface = surface_with_play_on(60, true);

        assert_eq!(
            Routed {
                actions: vec![],
                forward: Some(vec![0x90, 61, 100]),
            },
            surface.process(&[0x90, 61, 100])
        );
        assert_eq!(
            Routed {
                actions: vec![],
                forward: Some(vec![0xB0, 60, 127]),
            },
            surface.process(&[0xB0, 60, 127])
        );
        assert_eq!(Routed::default(), surface.process(&[0x01, 0x02]));
    }

    #[test]
    fn debug_mode_forwards_everything() {
        let surface = surface_with_play_on(60, false);

        assert_eq!(
            Routed {
                actions: vec![ActionKind::Play],
                forward: Some(vec![0x90, 60, 100]),
            },
            surface.process(&[0x90, 60, 100])
        );
    }

    #[test]
    fn unbound_buttons_do_not_fire() {
        let surface = HardwareSurface::new(true);
        let mut button = surface.create_button(&TRIGGERS[1]);
        button.set_action_matcher(Some(NoteMatcher::new(u7::from_int_lossy(10))));
        assert_eq!(vec![ActionKind::Stop], surface.process(&[0x90, 10, 1]).actions);

        button.clear_bindings();
        assert!(!surface.is_bound("gknt-stop"));
        assert!(surface.process(&[0x90, 10, 1]).actions.is_empty());
    }

    #[test]
    fn note_input_counts_publishes() {
        let surface = HardwareSurface::new(true);
        let mut input = surface.note_input();
        input.set_key_translation_table(Default::default());
        input.set_key_translation_table(Default::default());
        assert_eq!(2, surface.publish_count());
    }
}
