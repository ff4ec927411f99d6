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
use std::{error::Error, path::Path, sync::Arc};

use tracing::info;

use crate::{
    controller::{keyboard, midi, Controller, Driver},
    host::{
        preferences::Preferences, standalone::Standalone as StandaloneHost,
        surface::HardwareSurface, transport::Transport,
    },
};

mod error;
mod standalone;

pub use self::error::ConfigError;
pub use self::standalone::Standalone;

/// Builds the standalone host from the configuration and starts the controller,
/// which initializes the extension and dispatches events until told to quit.
pub fn init_controller(config: &Standalone) -> Result<Controller, Box<dyn Error>> {
    let input_device = crate::midi::get_device(config.midi_device())?;
    let thru_device = config
        .thru_device()
        .map(crate::midi::get_device)
        .transpose()?;
    let preferences = Preferences::load(&config.preferences())?;
    info!(
        input = input_device.name(),
        thru = ?thru_device.as_ref().map(|device| device.name()),
        preferences = %config.preferences().display(),
        "Starting."
    );

    let host = StandaloneHost::new(
        HardwareSurface::new(config.consume_events()),
        preferences,
        Transport::new(config.tracks()),
    );
    let drivers: Vec<Arc<dyn Driver>> = vec![
        Arc::new(midi::Driver::new(input_device.clone())),
        Arc::new(keyboard::Driver::new()),
    ];

    Ok(Controller::new(
        host,
        config.conflict_policy(),
        drivers,
        thru_device,
        config.debug_midi(),
    ))
}

/// Loads the configuration from the file.
pub fn load(path: &Path) -> Result<Standalone, ConfigError> {
    Standalone::deserialize(path)
}
