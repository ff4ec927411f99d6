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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const SET: &str = "set";
const UNSET: &str = "unset";
const LIST: &str = "list";
const TABLE: &str = "table";
const QUIT: &str = "quit";

/// Lets the user change trigger notes and inspect the key filter from the terminal.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Parses a command line. Trigger names may contain spaces, so the note is
    /// always the last word.
    fn parse(input: &str) -> Result<Option<Event>, String> {
        let input = input.trim();
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "" => Ok(None),
            SET => {
                let (trigger, note) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or_else(|| format!("usage: {} <trigger> <note>", SET))?;
                let value = note
                    .parse::<i16>()
                    .map_err(|e| format!("invalid note {}: {}", note, e))?;
                Ok(Some(Event::Set {
                    trigger: trigger.trim().to_string(),
                    value: f64::from(value),
                }))
            }
            UNSET if !rest.is_empty() => Ok(Some(Event::Set {
                trigger: rest.to_string(),
                value: -1.0,
            })),
            UNSET => Err(format!("usage: {} <trigger>", UNSET)),
            LIST => Ok(Some(Event::List)),
            TABLE => Ok(Some(Event::Table)),
            QUIT => Ok(Some(Event::Quit)),
            _ => Err(format!("unrecognized command {}", command)),
        }
    }

    /// Reads one command. Returns false once the reader is exhausted or the
    /// user quit.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <trigger> <note>, {} <trigger>, {}, {}, {}): ",
            SET, UNSET, LIST, TABLE, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        match Self::parse(&input) {
            Ok(Some(event)) => {
                let quit = event == Event::Quit;
                events_tx.blocking_send(event).map_err(io::Error::other)?;
                Ok(!quit)
            }
            Ok(None) => Ok(true),
            Err(e) => {
                warn!(input = input.trim(), "{}", e);
                Ok(true)
            }
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}
