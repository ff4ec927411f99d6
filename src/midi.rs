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
use std::{error::Error, fmt, sync::Arc};

use midly::{live::LiveEvent, MidiMessage};
use tokio::sync::mpsc::Sender;

mod midir;
mod mock;

/// A MIDI device that can listen for inputs and pass messages on.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>>;

    /// Stops watching events.
    fn stop_watch_events(&self);

    /// Sends a raw message to the device's output.
    fn emit(&self, raw: &[u8]) -> Result<(), Box<dyn Error>>;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists devices known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    midir::list()
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

/// Describes a raw message for the MIDI input log.
pub fn describe(raw: &[u8]) -> String {
    let (channel, message) = match LiveEvent::parse(raw) {
        Ok(LiveEvent::Midi { channel, message }) => (channel.as_int(), message),
        Ok(event) => return format!("{:?}", event),
        Err(_) => return format!("Unparsable({:02X?})", raw),
    };

    match message {
        MidiMessage::Controller { controller, value } => format!(
            "ControlChange(channel: {}, cc: {}, value: {})",
            channel,
            controller.as_int(),
            value.as_int()
        ),
        MidiMessage::NoteOn { key, vel } => format!(
            "NoteOn(channel: {}, note: {}, velocity: {})",
            channel,
            key.as_int(),
            vel.as_int()
        ),
        MidiMessage::NoteOff { key, vel } => format!(
            "NoteOff(channel: {}, note: {}, release velocity: {})",
            channel,
            key.as_int(),
            vel.as_int()
        ),
        message => format!("{:?}(channel: {})", message, channel),
    }
}
