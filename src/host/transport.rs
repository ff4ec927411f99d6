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
use std::{
    fmt,
    time::{Duration, Instant},
};

use tracing::info;

use crate::triggers::ActionKind;

/// Taps further apart than this start a new measurement.
const TAP_TIMEOUT: Duration = Duration::from_secs(2);
const MIN_TEMPO: f64 = 20.0;
const MAX_TEMPO: f64 = 666.0;
const DEFAULT_TEMPO: f64 = 120.0;

/// The state of a single track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub armed: bool,
    pub solo: bool,
    pub muted: bool,
}

/// The standalone host's transport and cursor track.
pub struct Transport {
    playing: bool,
    recording: bool,
    tempo: f64,
    last_tap: Option<Instant>,
    tracks: Vec<Track>,
    cursor: usize,
}

impl Transport {
    /// Creates a stopped transport with the given number of tracks, the cursor
    /// on the first one.
    pub fn new(track_count: usize) -> Transport {
        Transport {
            playing: false,
            recording: false,
            tempo: DEFAULT_TEMPO,
            last_tap: None,
            tracks: vec![Track::default(); track_count.max(1)],
            cursor: 0,
        }
    }

    /// Performs the action.
    pub fn perform(&mut self, action: ActionKind) {
        self.perform_at(action, Instant::now());
    }

    fn perform_at(&mut self, action: ActionKind, now: Instant) {
        match action {
            ActionKind::Play => self.playing = true,
            ActionKind::Stop => {
                self.playing = false;
                self.recording = false;
            }
            ActionKind::Record => self.recording = !self.recording,
            ActionKind::TapTempo => self.tap(now),
            ActionKind::ToggleArm => {
                let track = &mut self.tracks[self.cursor];
                track.armed = !track.armed;
            }
            ActionKind::ToggleSolo => {
                let track = &mut self.tracks[self.cursor];
                track.solo = !track.solo;
            }
            ActionKind::ToggleMute => {
                let track = &mut self.tracks[self.cursor];
                track.muted = !track.muted;
            }
            ActionKind::PreviousTrack => self.cursor = self.cursor.saturating_sub(1),
            ActionKind::NextTrack => self.cursor = (self.cursor + 1).min(self.tracks.len() - 1),
        }
        info!(action = ?action, state = %self, "Performed action.");
    }

    fn tap(&mut self, now: Instant) {
        if let Some(last_tap) = self.last_tap {
            let interval = now.saturating_duration_since(last_tap);
            if !interval.is_zero() && interval <= TAP_TIMEOUT {
                self.tempo = (60.0 / interval.as_secs_f64()).clamp(MIN_TEMPO, MAX_TEMPO);
            }
        }
        self.last_tap = Some(now);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The tempo in beats per minute.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// The index of the cursor track.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_track(&self) -> &Track {
        &self.tracks[self.cursor]
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let track = self.cursor_track();
        write!(
            f,
            "{}{} {:.1} bpm, track {}{}{}{}",
            if self.playing { "playing" } else { "stopped" },
            if self.recording { " recording" } else { "" },
            self.tempo,
            self.cursor + 1,
            if track.armed { " armed" } else { "" },
            if track.solo { " solo" } else { "" },
            if track.muted { " muted" } else { "" },
        )
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use crate::triggers::ActionKind;

    use super::{Track, Transport};

    #[test]
    fn transport_actions() {
        let mut transport = Transport::new(4);

        transport.perform(ActionKind::Play);
        transport.perform(ActionKind::Record);
        assert!(transport.is_playing());
        assert!(transport.is_recording());

        transport.perform(ActionKind::Stop);
        assert!(!transport.is_playing());
        assert!(!transport.is_recording());
        assert_eq!("stopped 120.0 bpm, track 1", transport.to_string());
    }

    #[test]
    fn cursor_track_actions() {
        let mut transport = Transport::new(3);

        transport.perform(ActionKind::PreviousTrack);
        assert_eq!(0, transport.cursor());

        transport.perform(ActionKind::NextTrack);
        transport.perform(ActionKind::ToggleArm);
        transport.perform(ActionKind::ToggleMute);
        assert_eq!(
            &Track {
                armed: true,
                solo: false,
                muted: true,
            },
            transport.cursor_track()
        );

        transport.perform(ActionKind::NextTrack);
        transport.perform(ActionKind::NextTrack);
        assert_eq!(2, transport.cursor());
        transport.perform(ActionKind::ToggleSolo);
        assert!(transport.cursor_track().solo);
        assert!(!transport.cursor_track().armed);
    }

    #[test]
    fn tap_tempo() {
        let mut transport = Transport::new(1);
        let start = Instant::now();

        transport.perform_at(ActionKind::TapTempo, start);
        assert_eq!(120.0, transport.tempo());

        transport.perform_at(ActionKind::TapTempo, start + Duration::from_millis(500));
        assert!((transport.tempo() - 120.0).abs() < 1e-9);

        transport.perform_at(ActionKind::TapTempo, start + Duration::from_millis(1250));
        assert!((transport.tempo() - 80.0).abs() < 1e-9);

        // Too long since the last tap, the tempo is kept.
        transport.perform_at(ActionKind::TapTempo, start + Duration::from_secs(10));
        assert!((transport.tempo() - 80.0).abs() < 1e-9);

        transport.perform_at(ActionKind::TapTempo, start + Duration::from_millis(10_010));
        assert_eq!(666.0, transport.tempo());
    }
}
