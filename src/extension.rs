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
use tracing::{info, span, warn, Level};

use crate::{
    host::{Host, NoteInput, NumberSetting},
    keyfilter::{note_value, ConflictPolicy, KeyFilter},
    triggers::TRIGGERS,
};

/// The extension's display name.
pub const NAME: &str = "Generic Keyboard With Note Triggers";
pub const VENDOR: &str = "Generic";
pub const MODEL: &str = "Generic Keyboard With Note Triggers";
pub const ID: &str = "de0ef3ac-799a-4ef5-9b19-91ed5c4a4e24";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIDI_IN_PORTS: usize = 1;
pub const MIDI_OUT_PORTS: usize = 0;

/// A running instance: the key filter with all triggers loaded.
pub struct Session<I: NoteInput> {
    key_filter: KeyFilter<I>,
}

impl<I: NoteInput> Session<I> {
    /// Creates every trigger in declaration order, loads its persisted note and
    /// subscribes to its setting, then publishes the table once.
    fn start<H: Host<Input = I>>(host: &mut H, policy: ConflictPolicy) -> Session<I> {
        let mut key_filter = KeyFilter::new(host.create_note_input(), policy);

        for definition in TRIGGERS.iter() {
            let button = host.create_button(definition);
            let id = key_filter.add_trigger(definition, button);
            let raw = host.number_setting(definition, &NumberSetting::note(definition));
            let note = key_filter.assign_raw(id, raw);
            host.observe_setting(definition);
            info!(
                trigger = definition.id,
                note = note_value(note),
                "Trigger loaded."
            );
        }

        key_filter.publish();
        Session { key_filter }
    }

    /// Applies a setting change and publishes the table. Returns false if no
    /// trigger has the given id.
    fn setting_changed(&mut self, id: &str, raw: f64) -> bool {
        let trigger = match self.key_filter.find(id) {
            Some(trigger) => trigger,
            None => return false,
        };
        let note = self.key_filter.assign_raw(trigger, raw);
        self.key_filter.publish();
        info!(trigger = id, note = note_value(note), "Trigger note changed.");
        true
    }

    fn dispose(mut self) {
        self.key_filter.dispose();
    }

    pub fn key_filter(&self) -> &KeyFilter<I> {
        &self.key_filter
    }

    /// One line per trigger with its current note, -1 when unassigned.
    pub fn trigger_report(&self) -> Vec<String> {
        self.key_filter
            .triggers()
            .map(|(_, trigger)| {
                format!(
                    "{}: {}",
                    trigger.definition(),
                    note_value(trigger.current_note())
                )
            })
            .collect()
    }

    /// One line per suppressed note with the label of the trigger holding it.
    pub fn table_report(&self) -> Vec<String> {
        self.key_filter
            .key_translation_table()
            .suppressed()
            .into_iter()
            .map(|note| {
                let owner = self
                    .key_filter
                    .owner(note)
                    .map_or("?", |trigger| trigger.definition().label);
                format!("{}: {}", note.as_int(), owner)
            })
            .collect()
    }
}

/// The lifecycle facade the host drives: init on start, flush every cycle and
/// exit on stop.
pub struct Extension<I: NoteInput> {
    policy: ConflictPolicy,
    session: Option<Session<I>>,
}

impl<I: NoteInput> Extension<I> {
    pub fn new(policy: ConflictPolicy) -> Extension<I> {
        Extension {
            policy,
            session: None,
        }
    }

    /// Starts a session. Initializing twice is logged and ignored.
    pub fn init<H: Host<Input = I>>(&mut self, host: &mut H) {
        let span = span!(Level::INFO, "init");
        let _enter = span.enter();

        if self.session.is_some() {
            info!("Init: Extension already initialized!");
            return;
        }
        self.session = Some(Session::start(host, self.policy));
        info!(name = NAME, version = VERSION, "Extension initialized.");
    }

    pub fn flush(&self) {
        if self.session.is_none() {
            info!("Flush: Extension inactive. Nothing to do.");
        }
    }

    /// Unbinds every trigger and drops the session.
    pub fn exit(&mut self) {
        match self.session.take() {
            Some(session) => {
                session.dispose();
                info!(name = NAME, "Extension disposed.");
            }
            None => info!("Exit: Extension inactive. Nothing to do."),
        }
    }

    /// Delivers a value change of a trigger's note setting.
    pub fn setting_changed(&mut self, id: &str, raw: f64) {
        match self.session.as_mut() {
            Some(session) => {
                if !session.setting_changed(id, raw) {
                    warn!(setting = id, "Change for unknown setting ignored.");
                }
            }
            None => info!(setting = id, "Setting changed while inactive. Nothing to do."),
        }
    }

    pub fn session(&self) -> Option<&Session<I>> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod test {
    use midly::num::u7;

    use crate::{
        host::{
            preferences::Preferences, standalone::Standalone, surface::HardwareSurface,
            transport::Transport,
        },
        keyfilter::{ConflictPolicy, KeyTranslationTable},
        matcher::NoteMatcher,
        triggers::TRIGGERS,
    };

    use super::Extension;

    fn host() -> Standalone {
        Standalone::new(
            HardwareSurface::new(true),
            Preferences::in_memory(),
            Transport::new(8),
        )
    }

    #[test]
    fn init_with_defaults_publishes_identity_once() {
        let mut host = host();
        let mut extension = Extension::new(ConflictPolicy::default());

        extension.init(&mut host);

        assert!(extension.is_active());
        assert_eq!(1, host.surface.publish_count());
        assert_eq!(
            KeyTranslationTable::identity(),
            host.surface.key_translation_table()
        );
        for definition in TRIGGERS.iter() {
            assert_eq!(None, host.surface.matcher(definition.id));
            assert!(host.surface.is_bound(definition.id));
        }
    }

    #[test]
    fn double_init_is_ignored() {
        let mut host = host();
        let mut extension = Extension::new(ConflictPolicy::default());

        extension.init(&mut host);
        extension.init(&mut host);

        assert_eq!(1, host.surface.publish_count());
    }

    #[test]
    fn persisted_notes_are_loaded() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preferences.yaml");
        std::fs::write(&path, "gknt-play: 36\ngknt-track-next: 43\n")?;

        let mut host = Standalone::new(
            HardwareSurface::new(true),
            Preferences::load(&path)?,
            Transport::new(8),
        );
        let mut extension = Extension::new(ConflictPolicy::default());
        extension.init(&mut host);

        assert_eq!(
            vec![u7::from_int_lossy(36), u7::from_int_lossy(43)],
            host.surface.key_translation_table().suppressed()
        );
        assert_eq!(
            Some(NoteMatcher::new(u7::from_int_lossy(43))),
            host.surface.matcher("gknt-track-next")
        );
        Ok(())
    }

    #[test]
    fn setting_change_assigns_and_publishes() -> Result<(), Box<dyn std::error::Error>> {
        let mut host = host();
        let mut extension = Extension::new(ConflictPolicy::default());
        extension.init(&mut host);

        let change = host
            .preferences
            .set("gknt-track-mute", 50.0)?
            .expect("mute is observed");
        extension.setting_changed(&change.id, change.value);

        assert_eq!(2, host.surface.publish_count());
        assert_eq!(
            vec![u7::from_int_lossy(50)],
            host.surface.key_translation_table().suppressed()
        );

        extension.setting_changed("gknt-track-mute", -1.0);
        assert_eq!(
            KeyTranslationTable::identity(),
            host.surface.key_translation_table()
        );

        // Unknown settings are ignored and do not republish.
        extension.setting_changed("gknt-rewind", 3.0);
        assert_eq!(3, host.surface.publish_count());
        Ok(())
    }

    #[test]
    fn reports_name_owners() {
        let mut host = host();
        let mut extension = Extension::new(ConflictPolicy::default());
        extension.init(&mut host);
        extension.setting_changed("gknt-stop", 48.0);
        extension.setting_changed("gknt-play", 36.0);

        let session = extension.session().expect("session is active");
        assert_eq!(
            vec!["36: Play".to_string(), "48: Stop".to_string()],
            session.table_report()
        );
        let report = session.trigger_report();
        assert_eq!(TRIGGERS.len(), report.len());
        assert_eq!("Play (Transport, gknt-play): 36", report[0]);
        assert_eq!("Record (Transport, gknt-record): -1", report[2]);
    }

    #[test]
    fn exit_unbinds_everything() {
        let mut host = host();
        let mut extension = Extension::new(ConflictPolicy::default());
        extension.init(&mut host);
        extension.setting_changed("gknt-play", 60.0);

        extension.flush();
        let published = host.surface.publish_count();
        extension.exit();

        assert!(!extension.is_active());
        assert_eq!(published, host.surface.publish_count());
        for definition in TRIGGERS.iter() {
            assert_eq!(None, host.surface.matcher(definition.id));
            assert!(!host.surface.is_bound(definition.id));
        }
        assert!(host.surface.process(&[0x90, 60, 100]).actions.is_empty());

        // Exiting or flushing again is a no-op.
        extension.exit();
        extension.flush();
        extension.setting_changed("gknt-play", 61.0);
        assert_eq!(published, host.surface.publish_count());
    }
}
