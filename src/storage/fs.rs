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
use std::{error::Error, fs, path::Path};

use tracing::warn;

/// Storage backed by the real filesystem.
pub struct Fs;

impl super::Storage for Fs {
    fn list(&self, dir: &Path) -> Result<Vec<String>, Box<dyn Error>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => {
                    warn!(name = ?name, "Skipping entry with unreadable name.");
                }
            }
        }
        Ok(names)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, dir: &Path) -> Result<(), Box<dyn Error>> {
        Ok(fs::create_dir_all(dir)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), Box<dyn Error>> {
        Ok(fs::rename(from, to)?)
    }

    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        Ok(fs::remove_file(path)?)
    }
}
