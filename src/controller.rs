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
use std::error::Error;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, warn};

use crate::catalog::Catalog;

pub mod midi;

/// Controller events that drive the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Selects the bank mapped to the given MIDI bank number.
    BankSelect(u8),

    /// Loads the snapshot mapped to the given MIDI program number in the
    /// current bank.
    ProgramChange(u8),
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls a snapshot catalog. Events are applied one at a time: each bank
/// or program change completes fully before the next is handled.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(catalog: Catalog, driver: Arc<dyn Driver>) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(async move { Controller::trigger_events(catalog, driver).await }),
        })
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers catalog events by watching the driver and getting events from it.
    async fn trigger_events(mut catalog: Catalog, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!("Controller started.");

        loop {
            if let Some(event) = events_rx.recv().await {
                info!(event = format!("{:?}", event), "Received event.");

                let result = match event {
                    Event::BankSelect(bank_number) => catalog.bank_change(bank_number.into()),
                    Event::ProgramChange(program_number) => {
                        catalog.program_change(program_number.into())
                    }
                };
                match result {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(event = format!("{:?}", event), "Event did not resolve.")
                    }
                    Err(e) => error!(err = e.as_ref(), "Error talking to catalog."),
                }
            } else {
                info!("Controller closing, saving last state.");
                if let Err(e) = catalog.save_last_state() {
                    error!(err = e.as_ref(), "Error saving last state.");
                }
                if let Err(e) = join_handle.await {
                    error!("Error waiting for event monitor to stop: {}", e);
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io, path::Path, sync::Arc};

    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use crate::{
        catalog::Catalog,
        chains::test::Chains,
        midi::Device,
        storage::{test::Mock, Storage},
        test::eventually,
    };

    use super::{Driver, Event};

    struct TestDriver {
        device: crate::midi::test::Device,
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let driver = super::midi::Driver::new(Arc::new(self.device.clone()));
            driver.monitor_events(events_tx)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let base = Path::new("/data/snapshots");
        mock.create_dir_all(&base.join("000")).expect("create");
        mock.create_dir_all(&base.join("001")).expect("create");
        mock.touch(&base.join("001").join("003-three.zss"));
        let chains = Chains::new(0);

        let catalog = Catalog::new(
            Path::new("/data"),
            Arc::new(mock.clone()),
            Arc::new(chains.clone()),
        )?;

        let device = crate::midi::test::Device::get("mock-controller");
        let mut controller =
            super::Controller::new(catalog, Arc::new(TestDriver { device: device.clone() }))?;

        // Bank select 1 (CC#0), then program change 3 on channel 0.
        device.mock_event(&[0xB0, 0x00, 0x01]);
        device.mock_event(&[0xC0, 0x03]);
        eventually(
            || chains.loaded() == vec![base.join("001").join("003-three.zss")],
            "Snapshot never loaded",
        );

        // An unknown program resolves nothing and loads nothing further.
        device.mock_event(&[0xC0, 0x07]);
        device.mock_event(&[0xC0, 0x03]);
        eventually(|| chains.loaded().len() == 2, "Snapshot never reloaded");

        device.stop_watch_events();
        assert!(
            controller.join().await.is_ok(),
            "Error waiting for controller",
        );

        Ok(())
    }
}
