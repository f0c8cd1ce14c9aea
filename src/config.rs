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
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, File};
use serde::Deserialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::chains::session::Session;
use crate::controller::{midi, Controller};
use crate::storage;

mod error;

pub use error::ConfigError;

/// The appliance settings.
#[derive(Deserialize)]
pub struct Settings {
    /// The directory holding the snapshot tree.
    data_dir: String,
    /// The MIDI input device to listen to.
    midi_device: Option<String>,
    /// The session document representing the currently loaded chains.
    session_file: Option<String>,
}

impl Settings {
    /// Parses settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Settings, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// The directory holding the snapshot tree.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// The MIDI input device to listen to.
    pub fn midi_device(&self) -> Option<&str> {
        self.midi_device.as_deref()
    }

    /// The session document path.
    pub fn session_file(&self) -> Option<PathBuf> {
        self.session_file.as_ref().map(PathBuf::from)
    }
}

/// Initializes the catalog and controller from the given settings file and
/// returns the controller. The controller owns the catalog and can be waited
/// on until it exits. Realistically, the controller is not expected to exit.
pub fn init_controller(path: &Path) -> Result<Controller, Box<dyn Error>> {
    let settings = Settings::deserialize(path)?;
    let midi_device = match settings.midi_device() {
        Some(name) => crate::midi::get_device(name)?,
        None => return Err("no MIDI device configured".into()),
    };

    let session = Arc::new(Session::open(settings.session_file().as_deref())?);
    let mut catalog = Catalog::new(&settings.data_dir(), storage::filesystem(), session)?;
    if catalog.load_last_state()? {
        info!("Restored last state.");
    }
    Controller::new(catalog, Arc::new(midi::Driver::new(midi_device)))
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs};

    use super::Settings;

    #[test]
    fn test_settings() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = tempdir.path().join("zsnap.yaml");
        fs::write(
            &path,
            "data_dir: /var/lib/zsnap\nmidi_device: nanoKONTROL\n",
        )?;

        let settings = Settings::deserialize(&path)?;
        assert_eq!("/var/lib/zsnap", settings.data_dir().to_string_lossy());
        assert_eq!(Some("nanoKONTROL"), settings.midi_device());
        assert_eq!(None, settings.session_file());

        assert!(Settings::deserialize(&tempdir.path().join("missing.yaml")).is_err());

        Ok(())
    }
}
