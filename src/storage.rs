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
use std::{error::Error, path::Path, sync::Arc};

mod fs;
#[cfg(test)]
mod mock;

/// Directory access for the snapshot tree. The catalog never touches the
/// filesystem directly so that listing and renumbering logic can run against
/// an in-memory tree in tests.
pub trait Storage: Send + Sync {
    /// Returns the names of the entries in the given directory, unsorted.
    fn list(&self, dir: &Path) -> Result<Vec<String>, Box<dyn Error>>;

    /// Returns true if the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns true if the path exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Creates the directory and any missing parents.
    fn create_dir_all(&self, dir: &Path) -> Result<(), Box<dyn Error>>;

    /// Renames a file. An existing destination is overwritten.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), Box<dyn Error>>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn Error>>;
}

/// Gets the real filesystem storage.
pub fn filesystem() -> Arc<dyn Storage> {
    Arc::new(fs::Fs)
}

#[cfg(test)]
pub mod test {
    pub use super::mock::Mock;
}
