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
    sync::mpsc::{self, Sender},
    task::JoinHandle,
};
use tracing::{error, info, span, Level};

use crate::midi::Device;

use super::Event;

/// The number of raw MIDI messages buffered between the device and the controller.
const MIDI_QUEUE_SIZE: usize = 64;

/// Feeds raw MIDI input from a device to the controller.
pub struct Driver {
    /// The MIDI input device.
    midi_device: Arc<dyn Device>,
}

impl Driver {
    pub fn new(midi_device: Arc<dyn Device>) -> Driver {
        Driver { midi_device }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let (midi_events_tx, mut midi_events_rx) = mpsc::channel::<Vec<u8>>(MIDI_QUEUE_SIZE);

        {
            let span = span!(Level::INFO, "MIDI driver");
            let _enter = span.enter();

            info!(device = self.midi_device.name(), "MIDI driver started.");

            if let Err(e) = self.midi_device.watch_events(midi_events_tx) {
                error!(err = e.to_string(), "Error watching MIDI events");
            }
        }

        tokio::spawn(async move {
            while let Some(raw_event) = midi_events_rx.recv().await {
                if events_tx.send(Event::Midi(raw_event)).await.is_err() {
                    info!("Controller closed.");
                    return Ok(());
                }
            }
            info!("MIDI watcher closed.");
            Ok(())
        })
    }

    fn stop(&self) {
        self.midi_device.stop_watch_events();
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use tokio::sync::mpsc;

    use crate::{
        controller::{Driver as _, Event},
        midi::{self, Device},
    };

    #[tokio::test(flavor = "multi_thread")]
    async fn forwards_raw_events() -> Result<(), Box<dyn Error>> {
        let device = midi::get_device("mock-midi-device")?;
        let mock = device.to_mock()?;
        let driver = super::Driver::new(device);

        let (events_tx, mut events_rx) = mpsc::channel(4);
        let handle = driver.monitor_events(events_tx);

        assert!(mock.mock_event(&[0x90, 1, 2]));
        assert!(mock.mock_event(&[0x01]));
        assert_eq!(Some(Event::Midi(vec![0x90, 1, 2])), events_rx.recv().await);
        assert_eq!(Some(Event::Midi(vec![0x01])), events_rx.recv().await);

        driver.stop();
        assert!(handle.await?.is_ok());
        Ok(())
    }
}
