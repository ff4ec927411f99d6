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
use std::{io, sync::Arc};

use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::{JoinError, JoinHandle},
};
use tracing::{debug, error, info, span, trace, warn, Level};

use crate::{
    extension::Extension,
    host::{standalone::Standalone, surface::NoteInputPort},
    keyfilter::ConflictPolicy,
    midi::Device,
    triggers,
};

pub mod keyboard;
pub mod midi;

/// The size of the event queue shared by all drivers.
const EVENT_QUEUE_SIZE: usize = 64;

/// Events delivered to the controller. They are applied one at a time, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A raw MIDI message from the input device.
    Midi(Vec<u8>),

    /// Changes the note setting of a trigger, named by id or label.
    Set { trigger: String, value: f64 },

    /// Prints the triggers and their notes.
    List,

    /// Prints the suppressed notes.
    Table,

    /// Shuts the extension down and stops the controller.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    /// Starts monitoring and sends events to the given sender until the
    /// source closes.
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;

    /// Stops monitoring, if the driver holds a device.
    fn stop(&self) {}
}

/// Owns the standalone host and the extension and applies events to them.
pub struct Controller {
    events_tx: Sender<Event>,
    handle: JoinHandle<Standalone>,
}

impl Controller {
    /// Starts the drivers and the dispatch task. The extension is initialized
    /// before the first event is handled.
    pub fn new(
        host: Standalone,
        policy: ConflictPolicy,
        drivers: Vec<Arc<dyn Driver>>,
        thru_device: Option<Arc<dyn Device>>,
        debug_midi: bool,
    ) -> Controller {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let driver_handles = drivers
            .iter()
            .map(|driver| driver.monitor_events(events_tx.clone()))
            .collect();

        let dispatcher = Dispatcher {
            host,
            extension: Extension::new(policy),
            thru_device,
            debug_midi,
        };
        Controller {
            events_tx,
            handle: tokio::spawn(dispatcher.run(events_rx, drivers, driver_handles)),
        }
    }

    /// Gets a sender to deliver events to the controller.
    pub fn sender(&self) -> Sender<Event> {
        self.events_tx.clone()
    }

    /// Waits until the controller finishes, returning the host.
    pub async fn join(self) -> Result<Standalone, JoinError> {
        drop(self.events_tx);
        self.handle.await
    }
}

struct Dispatcher {
    host: Standalone,
    extension: Extension<NoteInputPort>,
    thru_device: Option<Arc<dyn Device>>,
    debug_midi: bool,
}

impl Dispatcher {
    async fn run(
        mut self,
        mut events_rx: Receiver<Event>,
        drivers: Vec<Arc<dyn Driver>>,
        driver_handles: Vec<JoinHandle<Result<(), io::Error>>>,
    ) -> Standalone {
        let span = span!(Level::INFO, "controller");
        {
            let _enter = span.enter();
            self.extension.init(&mut self.host);
            info!("Controller started.");
        }

        while let Some(event) = events_rx.recv().await {
            let _enter = span.enter();
            if event == Event::Quit {
                break;
            }
            self.handle(event);
            self.extension.flush();
        }

        {
            let _enter = span.enter();
            info!("Controller closing.");
            self.extension.exit();
            for driver in drivers.iter() {
                driver.stop();
            }
        }
        for handle in driver_handles {
            if !handle.is_finished() {
                // Drivers blocked on input are left behind.
                continue;
            }
            match handle.await {
                Ok(Err(e)) => error!(err = e.to_string(), "Driver failed."),
                Err(e) => error!(err = e.to_string(), "Error waiting for driver to stop."),
                Ok(Ok(())) => {}
            }
        }
        self.host
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Midi(raw) => self.handle_midi(&raw),
            Event::Set { trigger, value } => self.handle_set(&trigger, value),
            Event::List => self.list(),
            Event::Table => self.table(),
            Event::Quit => {}
        }
    }

    fn handle_midi(&mut self, raw: &[u8]) {
        if self.debug_midi {
            trace!(tag = "MIDI IN", "{}", crate::midi::describe(raw));
        }

        let routed = self.host.surface.process(raw);
        for action in routed.actions {
            self.host.transport.perform(action);
        }

        if let Some(forward) = routed.forward {
            match self.thru_device.as_ref() {
                Some(device) => {
                    if let Err(e) = device.emit(&forward) {
                        error!(err = e.to_string(), "Error passing MIDI through.");
                    }
                }
                None => debug!(raw = ?forward, "Note passed through."),
            }
        }
    }

    fn handle_set(&mut self, name: &str, value: f64) {
        let definition = match triggers::find(name) {
            Some(definition) => definition,
            None => {
                warn!(trigger = name, "Unknown trigger.");
                return;
            }
        };

        match self.host.preferences.set(definition.id, value) {
            Ok(Some(change)) => self.extension.setting_changed(&change.id, change.value),
            Ok(None) => debug!(trigger = definition.id, "Setting unchanged."),
            Err(e) => error!(err = e.to_string(), "Error changing setting."),
        }
    }

    fn list(&self) {
        if let Some(session) = self.extension.session() {
            for line in session.trigger_report() {
                println!("- {}", line);
            }
        }
    }

    fn table(&self) {
        if let Some(session) = self.extension.session() {
            let report = session.table_report();
            if report.is_empty() {
                println!("No notes are suppressed.");
            }
            for line in report {
                println!("- {}", line);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, sync::Arc};

    use crate::{
        host::{
            preferences::Preferences, standalone::Standalone, surface::HardwareSurface,
            transport::Transport,
        },
        keyfilter::{ConflictPolicy, KeyTranslationTable},
        midi::{self, Device},
        testutil::eventually,
    };

    use super::{Controller, Driver, Event};

    fn host() -> Standalone {
        Standalone::new(
            HardwareSurface::new(true),
            Preferences::in_memory(),
            Transport::new(4),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let input = midi::get_device("mock-keyboard")?;
        let thru = midi::get_device("mock-thru")?;
        let input_mock = input.to_mock()?;
        let thru_mock = thru.to_mock()?;

        let drivers: Vec<Arc<dyn Driver>> = vec![Arc::new(super::midi::Driver::new(input))];
        let controller = Controller::new(
            host(),
            ConflictPolicy::default(),
            drivers,
            Some(thru),
            true,
        );
        let events = controller.sender();

        eventually(|| input_mock.is_watching(), "MIDI driver never started");

        events
            .send(Event::Set {
                trigger: "play".to_string(),
                value: 60.0,
            })
            .await?;
        events
            .send(Event::Set {
                trigger: "Next track".to_string(),
                value: 62.0,
            })
            .await?;
        events.send(Event::List).await?;
        events.send(Event::Table).await?;

        // Let the settings land before the notes arrive.
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(input_mock.mock_event(&[0x90, 60, 100]));
        assert!(input_mock.mock_event(&[0x90, 61, 100]));
        assert!(input_mock.mock_event(&[0x80, 60, 0]));
        assert!(input_mock.mock_event(&[0x95, 62, 90]));
        assert!(input_mock.mock_event(&[0xB0, 1, 64]));

        eventually(
            || thru_mock.emitted().len() == 2,
            "Free messages never passed through",
        );

        events.send(Event::Quit).await?;
        let host = controller.join().await?;

        assert_eq!(
            vec![vec![0x90, 61, 100], vec![0xB0, 1, 64]],
            thru_mock.emitted()
        );
        assert!(host.transport.is_playing());
        assert_eq!(1, host.transport.cursor());
        assert_eq!(Some(60.0), host.preferences.get("gknt-play"));
        assert!(!input_mock.is_watching());
        assert!(!host.surface.is_bound("gknt-play"));
        assert_eq!(
            vec![60, 62],
            host.surface
                .key_translation_table()
                .suppressed()
                .iter()
                .map(|note| note.as_int())
                .collect::<Vec<u8>>()
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_trigger_is_ignored() -> Result<(), Box<dyn Error>> {
        let controller = Controller::new(host(), ConflictPolicy::default(), vec![], None, false);
        let events = controller.sender();

        events
            .send(Event::Set {
                trigger: "rewind".to_string(),
                value: 60.0,
            })
            .await?;
        events.send(Event::Quit).await?;

        let host = controller.join().await?;
        assert_eq!(
            KeyTranslationTable::identity(),
            host.surface.key_translation_table()
        );
        assert_eq!(1, host.surface.publish_count());
        Ok(())
    }
}
