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
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::storage;

/// A mock chain manager. Records load/save calls and materializes saved
/// snapshots in a mock storage tree so listings can see them.
#[derive(Clone)]
pub struct Chains {
    count: usize,
    storage: Option<storage::test::Mock>,
    loaded: Arc<Mutex<Vec<PathBuf>>>,
    saved: Arc<Mutex<Vec<PathBuf>>>,
}

impl Chains {
    /// Creates a mock with the given number of loaded chains.
    pub fn new(count: usize) -> Chains {
        Chains {
            count,
            storage: None,
            loaded: Arc::new(Mutex::new(Vec::new())),
            saved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a mock whose saves create files in the given storage.
    pub fn with_storage(count: usize, storage: storage::test::Mock) -> Chains {
        Chains {
            count,
            storage: Some(storage),
            loaded: Arc::new(Mutex::new(Vec::new())),
            saved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The snapshots loaded so far, in call order.
    pub fn loaded(&self) -> Vec<PathBuf> {
        self.loaded.lock().clone()
    }

    /// The snapshots saved so far, in call order.
    pub fn saved(&self) -> Vec<PathBuf> {
        self.saved.lock().clone()
    }
}

impl super::ChainManager for Chains {
    fn load(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        self.loaded.lock().push(path.to_path_buf());
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(storage) = &self.storage {
            storage.touch(path);
        }
        self.saved.lock().push(path.to_path_buf());
        Ok(())
    }

    fn chain_count(&self) -> usize {
        self.count
    }
}
