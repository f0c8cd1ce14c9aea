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
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::info;

/// A chain manager over a JSON session document, the format snapshot files
/// store on disk. Loading a snapshot adopts its document as the current
/// session; saving writes the current document out. When backed by a
/// session file, loads are persisted to it so the current session survives
/// the process.
pub struct Session {
    state: Mutex<Value>,
    backing: Option<PathBuf>,
}

impl Session {
    /// Opens a session. An existing backing file seeds the session; a
    /// missing or absent one starts it empty.
    pub fn open(backing: Option<&Path>) -> Result<Session, Box<dyn Error>> {
        let state = match backing {
            Some(path) if path.is_file() => serde_json::from_str(&fs::read_to_string(path)?)?,
            _ => json!({ "chains": [] }),
        };
        Ok(Session {
            state: Mutex::new(state),
            backing: backing.map(Path::to_path_buf),
        })
    }
}

impl super::ChainManager for Session {
    fn load(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let state: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        if let Some(backing) = &self.backing {
            fs::write(backing, serde_json::to_string_pretty(&state)?)?;
        }
        info!(path = %path.display(), "Loaded snapshot.");
        *self.state.lock() = state;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let state = self.state.lock().clone();
        fs::write(path, serde_json::to_string_pretty(&state)?)?;
        info!(path = %path.display(), "Saved snapshot.");
        Ok(())
    }

    fn chain_count(&self) -> usize {
        self.state
            .lock()
            .get("chains")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
