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
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use notetriggers::{
    config,
    extension::{self, Extension},
    host::{
        preferences::Preferences, standalone::Standalone, surface::HardwareSurface,
        transport::Transport,
    },
    keyfilter::ConflictPolicy,
    logging, midi,
    triggers::TRIGGERS,
};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Binds transport and track triggers to MIDI notes and filters them out of the keyboard input."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI input/output devices.
    MidiDevices {},
    /// Lists the triggers and the extension metadata.
    Triggers {},
    /// Prints the notes the given preferences file would suppress.
    Table {
        /// The path to the preferences file.
        preferences_path: String,
        /// Frees a stolen note only if the releasing trigger still owns it.
        #[arg(short, long)]
        owner_checked: bool,
    },
    /// Starts the standalone host.
    Start {
        /// The path to the standalone config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::MidiDevices {} => {
            logging::init("info")?;
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Triggers {} => {
            println!(
                "{} by {} ({}), version {}",
                extension::NAME,
                extension::VENDOR,
                extension::ID,
                extension::VERSION
            );
            println!("Triggers (count: {}):", TRIGGERS.len());
            for definition in TRIGGERS.iter() {
                println!("- {}", definition);
            }
        }
        Commands::Table {
            preferences_path,
            owner_checked,
        } => {
            logging::init("warn")?;
            let policy = if owner_checked {
                ConflictPolicy::OwnerChecked
            } else {
                ConflictPolicy::LastWriterWins
            };
            let mut host = Standalone::new(
                HardwareSurface::new(true),
                Preferences::load(&PathBuf::from(&preferences_path))?,
                Transport::new(1),
            );
            let mut extension = Extension::new(policy);
            extension.init(&mut host);

            if let Some(session) = extension.session() {
                let report = session.table_report();
                if report.is_empty() {
                    println!("No notes are suppressed.");
                }
                for line in report {
                    println!("- {}", line);
                }
            }
            extension.exit();
        }
        Commands::Start { config_path } => {
            let config = config::load(&PathBuf::from(config_path))?;
            logging::init(config.log_level())?;
            config::init_controller(&config)?.join().await?;
        }
    }

    Ok(())
}
