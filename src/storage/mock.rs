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
    collections::BTreeSet,
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

/// An in-memory directory tree. Doesn't store file contents, only the
/// structure the catalog scans, and records every rename so tests can verify
/// commit ordering.
#[derive(Clone, Default)]
pub struct Mock {
    files: Arc<Mutex<BTreeSet<PathBuf>>>,
    dirs: Arc<Mutex<BTreeSet<PathBuf>>>,
    renames: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
}

impl Mock {
    pub fn new() -> Mock {
        Mock::default()
    }

    /// Creates an empty file at the given path.
    pub fn touch(&self, path: &Path) {
        self.files.lock().insert(path.to_path_buf());
    }

    /// Creates a directory at the given path.
    pub fn mkdir(&self, path: &Path) {
        self.dirs.lock().insert(path.to_path_buf());
    }

    /// Returns the renames performed so far, in call order.
    pub fn renames(&self) -> Vec<(PathBuf, PathBuf)> {
        self.renames.lock().clone()
    }

    /// Returns all file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.lock().iter().cloned().collect()
    }
}

impl super::Storage for Mock {
    fn list(&self, dir: &Path) -> Result<Vec<String>, Box<dyn Error>> {
        if !self.dirs.lock().contains(dir) {
            return Err(format!("no such directory: {}", dir.display()).into());
        }

        let mut names = Vec::new();
        let files = self.files.lock();
        let dirs = self.dirs.lock();
        for path in files.iter().chain(dirs.iter()) {
            if path.parent() == Some(dir) {
                if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().contains(path)
    }

    fn create_dir_all(&self, dir: &Path) -> Result<(), Box<dyn Error>> {
        let mut dirs = self.dirs.lock();
        let mut current = dir.to_path_buf();
        loop {
            dirs.insert(current.clone());
            match current.parent() {
                Some(parent) if parent != Path::new("") => current = parent.to_path_buf(),
                _ => return Ok(()),
            }
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), Box<dyn Error>> {
        let mut files = self.files.lock();
        if !files.remove(from) {
            return Err(format!("no such file: {}", from.display()).into());
        }
        files.insert(to.to_path_buf());
        self.renames
            .lock()
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if !self.files.lock().remove(path) {
            return Err(format!("no such file: {}", path.display()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use crate::storage::Storage;

    use super::Mock;

    #[test]
    fn test_mock_storage() {
        let mock = Mock::new();
        let base = Path::new("/data/snapshots");
        mock.create_dir_all(base).expect("create should succeed");
        mock.mkdir(&base.join("000"));
        mock.touch(&base.join("000").join("001-one.zss"));

        let names = mock.list(base).expect("list should succeed");
        assert_eq!(vec!["000".to_string()], names);
        assert!(mock.is_dir(&base.join("000")));
        assert!(mock.is_file(&base.join("000").join("001-one.zss")));

        assert!(mock.list(&base.join("missing")).is_err());
        assert!(mock.remove_file(&base.join("missing.zss")).is_err());
    }
}
