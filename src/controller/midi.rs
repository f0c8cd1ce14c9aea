// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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

use midly::{live::LiveEvent, MidiMessage};
use tokio::{sync::mpsc, sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Level};

use super::Event;
use crate::midi::Device;

/// Bank select is controller 0.
const BANK_SELECT: u8 = 0;

/// A driver that turns incoming MIDI into catalog events: bank select
/// (CC#0) and program change, on any channel.
pub struct Driver {
    /// The MIDI device.
    midi_device: Arc<dyn Device>,
}

impl Driver {
    pub fn new(midi_device: Arc<dyn Device>) -> Driver {
        Driver { midi_device }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let (midi_events_tx, mut midi_events_rx) = mpsc::channel::<Vec<u8>>(10);
        let device = self.midi_device.clone();

        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "MIDI driver");
            let _enter = span.enter();

            info!("MIDI driver started.");

            if let Err(e) = device.watch_events(midi_events_tx) {
                error!(err = e.as_ref(), "Error watching MIDI events");
            }
        });

        let device = self.midi_device.clone();
        tokio::spawn(async move {
            loop {
                let raw_event = match midi_events_rx.recv().await {
                    Some(raw_event) => raw_event,
                    None => {
                        info!("MIDI watcher closed.");
                        device.stop_watch_events();
                        return Ok(());
                    }
                };

                let event = match LiveEvent::parse(&raw_event) {
                    Ok(event) => event,
                    Err(e) => {
                        error!(err = format!("{:?}", e), "Error parsing event.");
                        continue;
                    }
                };

                let event = match event {
                    LiveEvent::Midi { message, .. } => match message {
                        MidiMessage::Controller { controller, value }
                            if controller.as_int() == BANK_SELECT =>
                        {
                            Event::BankSelect(value.as_int())
                        }
                        MidiMessage::ProgramChange { program } => {
                            Event::ProgramChange(program.as_int())
                        }
                        _ => continue,
                    },
                    _ => continue,
                };

                if let Err(e) = events_tx.send(event).await {
                    error!(err = format!("{:?}", e), "Error sending controller event.");
                    return Ok(());
                }
            }
        })
    }
}
