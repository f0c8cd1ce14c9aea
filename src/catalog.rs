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
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chains::ChainManager;
use crate::storage::Storage;

pub mod entry;
pub mod parts;
pub mod renumber;

use entry::{Entry, Row};
use parts::SnapshotParts;
use renumber::RenumberPlan;

const DEFAULT_SNAPSHOT: &str = "default.zss";
const LAST_STATE_SNAPSHOT: &str = "last_state.zss";
const FIRST_BANK: &str = "000";

/// The outcome of a rename request.
#[derive(Debug, PartialEq, Eq)]
pub enum Rename {
    /// The new name is the old name.
    Unchanged,
    /// The path being renamed is not a valid snapshot path.
    Invalid,
    /// The rename was applied.
    Done(PathBuf),
    /// The target already exists. The caller must confirm and then apply
    /// the rename explicitly.
    PendingOverwrite { from: PathBuf, to: PathBuf },
}

/// The snapshot catalog: a view over the two-level snapshot directory tree
/// (bank directories containing `.zss` files) with the MIDI bank/program
/// number mappings derived from the filename convention.
///
/// The directory tree is the single source of truth. Every navigation
/// rebuilds the listing and the number maps from a fresh scan; nothing is
/// cached across refreshes.
pub struct Catalog {
    /// The snapshot tree root.
    base_dir: PathBuf,
    /// The selected bank directory name. None means the bank list is being
    /// browsed.
    bank_dir: Option<String>,
    /// The previously selected bank, for restoring after failed bank
    /// changes and for reselecting on return to the bank list.
    last_bank_dir: Option<String>,
    /// Whether the bank level is hidden because at most one bank exists.
    bankless: bool,
    /// The current selection position in the listing.
    index: usize,
    /// The number of synthetic rows before the first real entry.
    index_offset: usize,
    /// MIDI bank number to listing position, rebuilt on every refresh.
    midi_banks: HashMap<u32, usize>,
    /// MIDI program number to listing position, rebuilt on every refresh.
    midi_programs: HashMap<u32, usize>,
    /// The listing rows.
    rows: Vec<Row>,
    /// The most recently loaded or saved snapshot.
    last_snapshot: Option<PathBuf>,
    /// Directory access.
    storage: Arc<dyn Storage>,
    /// The instrument-chain manager.
    chains: Arc<dyn ChainManager>,
}

impl Catalog {
    /// Creates a catalog over `<data_dir>/snapshots`, creating the tree and
    /// the first bank if necessary.
    pub fn new(
        data_dir: &Path,
        storage: Arc<dyn Storage>,
        chains: Arc<dyn ChainManager>,
    ) -> Result<Catalog, Box<dyn Error>> {
        let base_dir = data_dir.join("snapshots");
        storage.create_dir_all(&base_dir)?;

        let mut catalog = Catalog {
            base_dir,
            bank_dir: None,
            last_bank_dir: None,
            bankless: false,
            index: 0,
            index_offset: 0,
            midi_banks: HashMap::new(),
            midi_programs: HashMap::new(),
            rows: Vec::new(),
            last_snapshot: None,
            storage,
            chains,
        };
        catalog.refresh()?;
        Ok(catalog)
    }

    /// Rebuilds the listing from the filesystem: recomputes bankless mode,
    /// then loads either the bank list or the selected bank's snapshot list.
    pub fn refresh(&mut self) -> Result<(), Box<dyn Error>> {
        self.check_bankless()?;

        self.midi_banks.clear();
        self.midi_programs.clear();
        self.rows.clear();

        if self.bank_dir.is_none() {
            self.load_bank_list()
        } else {
            self.load_snapshot_list()
        }
    }

    /// The current listing rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The currently selected bank directory name.
    pub fn bank(&self) -> Option<&str> {
        self.bank_dir.as_deref()
    }

    /// Whether the bank level is currently hidden.
    pub fn bankless(&self) -> bool {
        self.bankless
    }

    /// The current selection position.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The number of synthetic rows before the first real entry.
    pub fn index_offset(&self) -> usize {
        self.index_offset
    }

    /// Finds a snapshot row by display title or filename.
    pub fn find(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|row| {
            if !matches!(row.entry, Entry::Snapshot(_)) {
                return false;
            }
            row.title == name
                || row
                    .entry
                    .path()
                    .and_then(|path| path.file_name())
                    .and_then(|filename| filename.to_str())
                    == Some(name)
        })
    }

    /// The full path for a filename at the current directory level.
    pub fn snapshot_path(&self, filename: &str) -> PathBuf {
        self.current_dir().join(filename)
    }

    /// The path of the default snapshot.
    pub fn default_snapshot_path(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_SNAPSHOT)
    }

    /// The path of the last-state snapshot.
    pub fn last_state_path(&self) -> PathBuf {
        self.base_dir.join(LAST_STATE_SNAPSHOT)
    }

    /// Selects a bank and reloads the listing.
    pub fn select_bank(&mut self, name: &str) -> Result<(), Box<dyn Error>> {
        self.last_bank_dir = self.bank_dir.take();
        self.bank_dir = Some(name.to_string());
        self.refresh()
    }

    /// Returns to the bank list. In bankless mode the single bank is
    /// reselected on refresh.
    pub fn select_parent(&mut self) -> Result<(), Box<dyn Error>> {
        self.last_bank_dir = self.bank_dir.take();
        self.refresh()
    }

    /// Creates the next bank directory and selects it.
    pub fn create_bank(&mut self) -> Result<String, Box<dyn Error>> {
        let name = self.next_bank_name()?;
        self.storage.create_dir_all(&self.base_dir.join(&name))?;
        info!(bank = name, "Created bank.");
        self.last_bank_dir = Some(name.clone());
        self.bank_dir = Some(name.clone());
        self.refresh()?;
        Ok(name)
    }

    /// The next available program number at the current directory level:
    /// the smallest number >= min not already used, scanning filenames in
    /// lexicographic order. None when every number through 127 is taken.
    pub fn next_program(&self, min: u8) -> Result<Option<u8>, Box<dyn Error>> {
        let mut names = self.storage.list(&self.current_dir())?;
        names.sort();

        let mut next = u32::from(min);
        for name in names {
            if next > parts::MAX_PROGRAM {
                return Ok(None);
            }
            let program = match parts::midi_number(&name) {
                Some(program) => program,
                None => continue,
            };
            if program < next {
                continue;
            }
            if program == next {
                next += 1;
            }
        }

        if next > parts::MAX_PROGRAM {
            Ok(None)
        } else {
            Ok(Some(next as u8))
        }
    }

    /// The next unused bank name: one past the highest numeric prefix among
    /// existing bank directories, or "000" when there are none.
    pub fn next_bank_name(&self) -> Result<String, Box<dyn Error>> {
        let mut max: Option<u32> = None;
        for name in self.storage.list(&self.base_dir)? {
            if !self.storage.is_dir(&self.base_dir.join(&name)) {
                continue;
            }
            if let Some(number) = parts::midi_number(&name) {
                max = Some(max.map_or(number, |max| max.max(number)));
            }
        }
        Ok(format!("{:03}", max.map_or(0, |max| max + 1)))
    }

    /// Saves the current session as a new snapshot, assigning the next free
    /// program number when one is available.
    pub fn save_new(&mut self, name: &str) -> Result<PathBuf, Box<dyn Error>> {
        let program = self.next_program(1)?;
        let filename = parts::encode(program.map(u32::from), name);
        let path = self.snapshot_path(&filename);
        self.chains.save(&path)?;
        self.last_snapshot = Some(path.clone());
        self.refresh()?;
        Ok(path)
    }

    /// Overwrites an existing snapshot with the current session. Callers
    /// confirm before invoking this.
    pub fn save_over(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        self.chains.save(path)
    }

    /// Loads a snapshot through the chain manager.
    pub fn load(&mut self, path: &Path) -> Result<(), Box<dyn Error>> {
        self.chains.load(path)?;
        self.last_snapshot = Some(path.to_path_buf());
        Ok(())
    }

    /// Renames a snapshot, keeping its program prefix. When the target
    /// already exists the rename is returned as pending so the caller can
    /// confirm the overwrite and then call [`Catalog::apply_rename`].
    pub fn rename(&mut self, path: &Path, new_name: &str) -> Result<Rename, Box<dyn Error>> {
        let old = match SnapshotParts::from_path(path) {
            Some(old) => old,
            None => {
                warn!(path = %path.display(), "Not a valid snapshot path.");
                return Ok(Rename::Invalid);
            }
        };
        if old.name() == new_name {
            return Ok(Rename::Unchanged);
        }

        let filename = parts::encode(old.program(), parts::strip_suffix(new_name));
        let to = match path.parent() {
            Some(dir) => dir.join(filename),
            None => return Err("snapshot has no parent directory".into()),
        };
        if to == path {
            return Ok(Rename::Unchanged);
        }
        if self.storage.is_file(&to) {
            return Ok(Rename::PendingOverwrite {
                from: path.to_path_buf(),
                to,
            });
        }

        self.apply_rename(path, &to);
        Ok(Rename::Done(to))
    }

    /// Applies a rename. A failure is logged and the listing refreshed;
    /// nothing is propagated.
    pub fn apply_rename(&mut self, from: &Path, to: &Path) {
        if let Err(e) = self.storage.rename(from, to) {
            warn!(
                err = e.as_ref(),
                from = %from.display(),
                to = %to.display(),
                "Failed to rename snapshot."
            );
        }
        if let Err(e) = self.refresh() {
            error!(err = e.as_ref(), "Failed to refresh listing.");
        }
    }

    /// Computes the renumbering plan for assigning a snapshot a new program
    /// number (None removes the prefix). Plans that shift other snapshots
    /// must be confirmed before [`Catalog::commit_renumber`].
    pub fn set_program(
        &self,
        path: &Path,
        program: Option<u8>,
    ) -> Result<RenumberPlan, Box<dyn Error>> {
        let source = SnapshotParts::from_path(path)
            .ok_or_else(|| format!("not a valid snapshot path: {}", path.display()))?;
        let dir = path.parent().ok_or("snapshot has no parent directory")?;
        RenumberPlan::new(self.storage.as_ref(), dir, &source, program.map(u32::from))
    }

    /// Commits a renumbering plan and refreshes the listing.
    pub fn commit_renumber(&mut self, plan: RenumberPlan) -> Result<PathBuf, Box<dyn Error>> {
        let result = plan.commit(self.storage.as_ref());
        if let Err(e) = &result {
            warn!(err = e.as_ref(), "Failed to renumber snapshot.");
        }
        self.refresh()?;
        result
    }

    /// Deletes a snapshot. Failures are logged, never propagated.
    pub fn delete(&mut self, path: &Path) {
        info!(path = %path.display(), "Deleting snapshot.");
        if let Err(e) = self.storage.remove_file(path) {
            error!(err = e.as_ref(), "Failed to delete snapshot.");
        }
        if let Err(e) = self.refresh() {
            error!(err = e.as_ref(), "Failed to refresh listing.");
        }
    }

    /// Saves the current session as the default snapshot.
    pub fn save_default(&mut self) -> Result<(), Box<dyn Error>> {
        let path = self.default_snapshot_path();
        self.chains.save(&path)?;
        self.refresh()
    }

    /// Loads the default snapshot if it exists.
    pub fn load_default(&mut self) -> Result<bool, Box<dyn Error>> {
        let path = self.default_snapshot_path();
        if !self.storage.is_file(&path) {
            return Ok(false);
        }
        self.load(&path)?;
        Ok(true)
    }

    /// Saves the current session as the last-state snapshot.
    pub fn save_last_state(&mut self) -> Result<(), Box<dyn Error>> {
        let path = self.last_state_path();
        self.chains.save(&path)?;
        self.refresh()
    }

    /// Loads the last-state snapshot if it exists.
    pub fn load_last_state(&mut self) -> Result<bool, Box<dyn Error>> {
        let path = self.last_state_path();
        if !self.storage.is_file(&path) {
            return Ok(false);
        }
        self.load(&path)?;
        Ok(true)
    }

    /// Removes the last-state snapshot. A missing file is fine.
    pub fn delete_last_state(&self) {
        let _ = self.storage.remove_file(&self.last_state_path());
    }

    /// Handles a MIDI bank select: reloads the bank list and selects the
    /// bank registered under the given number. When the number is unmapped
    /// the previous bank is restored and false is returned.
    pub fn bank_change(&mut self, bank_number: u32) -> Result<bool, Box<dyn Error>> {
        self.last_bank_dir = self.bank_dir.take();
        self.refresh()?;

        match self.midi_banks.get(&bank_number) {
            Some(&index) => {
                let bank = self.rows[index].title.clone();
                debug!(bank_number, bank, "Bank change.");
                self.bank_dir = Some(bank);
                self.refresh()?;
                Ok(true)
            }
            None => {
                self.bank_dir = self.last_bank_dir.clone();
                self.refresh()?;
                Ok(false)
            }
        }
    }

    /// Moves the current bank number by the given offset and resolves it as
    /// a bank change.
    pub fn bank_change_offset(&mut self, offset: i32) -> Result<bool, Box<dyn Error>> {
        let bank_number = match self.bank_dir.as_deref().and_then(parts::midi_number) {
            Some(bank_number) => bank_number,
            None => {
                warn!(offset, "Cannot change bank by offset without a numbered bank.");
                return Ok(false);
            }
        };
        match u32::try_from(i64::from(bank_number) + i64::from(offset)) {
            Ok(bank_number) => self.bank_change(bank_number),
            Err(_) => Ok(false),
        }
    }

    /// Handles a MIDI program change: resolves the number in the selected
    /// bank's program map and loads the snapshot. With no bank selected the
    /// first bank in lexicographic order is selected first. An unmapped
    /// number returns false and leaves state unchanged.
    pub fn program_change(&mut self, program_number: u32) -> Result<bool, Box<dyn Error>> {
        if self.bank_dir.is_none() {
            self.refresh()?;
            if self.bank_dir.is_none() {
                let first_bank = self.rows.iter().find_map(|row| match &row.entry {
                    Entry::Bank(_) => Some(row.title.clone()),
                    _ => None,
                });
                match first_bank {
                    Some(bank) => {
                        self.last_bank_dir = self.bank_dir.take();
                        self.bank_dir = Some(bank);
                        self.refresh()?;
                    }
                    None => return Ok(false),
                }
            }
        }

        match self.midi_programs.get(&program_number) {
            Some(&index) => {
                let path = match self.rows[index].entry.path() {
                    Some(path) => path.to_path_buf(),
                    None => return Ok(false),
                };
                debug!(program_number, path = %path.display(), "Program change.");
                self.load(&path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves the current program number by the given offset and resolves it
    /// as a program change. The current number comes from the last loaded
    /// snapshot's filename, or 0 when unknown.
    pub fn program_change_offset(&mut self, offset: i32) -> Result<bool, Box<dyn Error>> {
        let program_number = self
            .last_snapshot
            .as_ref()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .and_then(parts::midi_number)
            .map_or(0, |program| i64::from(program) + i64::from(offset));
        match u32::try_from(program_number) {
            Ok(program_number) => self.program_change(program_number),
            Err(_) => Ok(false),
        }
    }

    fn current_dir(&self) -> PathBuf {
        match &self.bank_dir {
            Some(bank) => self.base_dir.join(bank),
            None => self.base_dir.clone(),
        }
    }

    fn check_bankless(&mut self) -> Result<(), Box<dyn Error>> {
        let mut banks: Vec<String> = self
            .storage
            .list(&self.base_dir)?
            .into_iter()
            .filter(|name| self.storage.is_dir(&self.base_dir.join(name)))
            .collect();
        banks.sort();

        match banks.len() {
            0 => {
                self.last_bank_dir = self.bank_dir.take();
                self.bank_dir = Some(FIRST_BANK.to_string());
                self.storage.create_dir_all(&self.base_dir.join(FIRST_BANK))?;
                info!(bank = FIRST_BANK, "No banks found, created the first one.");
                self.bankless = true;
            }
            1 => {
                self.last_bank_dir = self.bank_dir.take();
                self.bank_dir = Some(banks.swap_remove(0));
                self.bankless = true;
            }
            _ => self.bankless = false,
        }
        Ok(())
    }

    fn load_bank_list(&mut self) -> Result<(), Box<dyn Error>> {
        let mut index = 0;

        let default_path = self.default_snapshot_path();
        if self.storage.is_file(&default_path) {
            self.rows
                .push(Row::new(Entry::Snapshot(default_path), index, "Default"));
            index += 1;
        }
        let last_state_path = self.last_state_path();
        if self.storage.is_file(&last_state_path) {
            self.rows
                .push(Row::new(Entry::Snapshot(last_state_path), index, "Last State"));
            index += 1;
        }
        self.rows.push(Row::new(Entry::NewBank, index, "New Bank"));
        index += 1;

        self.change_index_offset(index);

        let mut names = self.storage.list(&self.base_dir)?;
        names.sort();
        for name in names {
            let path = self.base_dir.join(&name);
            if !self.storage.is_dir(&path) {
                continue;
            }
            match parts::midi_number(&name) {
                Some(bank_number) => {
                    self.midi_banks.insert(bank_number, index);
                    debug!(bank = name, bank_number, "Registered bank.");
                }
                None => warn!(bank = name, "Bank has no MIDI bank number."),
            }
            if Some(&name) == self.last_bank_dir.as_ref() {
                self.index = index;
            }
            self.rows.push(Row::new(Entry::Bank(path), index, name));
            index += 1;
        }
        Ok(())
    }

    fn load_snapshot_list(&mut self) -> Result<(), Box<dyn Error>> {
        let bank = match self.bank_dir.clone() {
            Some(bank) => bank,
            None => return Ok(()),
        };
        let mut index = 0;

        if !self.bankless {
            self.rows.push(Row::new(Entry::Parent, index, ".."));
            index += 1;
        }
        if self.chains.chain_count() > 0 {
            self.rows
                .push(Row::new(Entry::SaveNew, index, "Save as new snapshot"));
            index += 1;
        }
        if self.bankless {
            let default_path = self.default_snapshot_path();
            if self.storage.is_file(&default_path) {
                self.rows
                    .push(Row::new(Entry::Snapshot(default_path), index, "Default"));
                index += 1;
            }
            let last_state_path = self.last_state_path();
            if self.storage.is_file(&last_state_path) {
                self.rows
                    .push(Row::new(Entry::Snapshot(last_state_path), index, "Last State"));
                index += 1;
            }
        }

        self.change_index_offset(index);

        let bank_number = parts::midi_number(&bank);
        let dir = self.base_dir.join(&bank);
        let mut names = self.storage.list(&dir)?;
        names.sort();
        for name in names {
            let path = dir.join(&name);
            if !self.storage.is_file(&path) {
                continue;
            }
            let title = match parts::title(&name) {
                Some(title) => title,
                None => continue,
            };
            match parts::midi_number(&title) {
                Some(program_number) => {
                    self.midi_programs.insert(program_number, index);
                    debug!(
                        snapshot = title,
                        bank_number = ?bank_number,
                        program_number,
                        "Registered snapshot."
                    );
                }
                None => warn!(snapshot = title, "Snapshot has no MIDI program number."),
            }
            self.rows.push(Row::new(Entry::Snapshot(path), index, title));
            index += 1;
        }
        Ok(())
    }

    // Keeps the selection stable when the number of synthetic rows changes.
    fn change_index_offset(&mut self, offset: usize) {
        let index = self.index as i64 - self.index_offset as i64 + offset as i64;
        self.index = index.max(0) as usize;
        self.index_offset = offset;
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.bank_dir, self.bankless) {
            (Some(bank), false) => writeln!(f, "Snapshots: {}", bank)?,
            _ => writeln!(f, "Snapshots")?,
        }
        for row in &self.rows {
            writeln!(f, "  {:>3}  {}", row.index, row.title)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, path::Path, sync::Arc};

    use crate::{
        chains::test::Chains,
        storage::{test::Mock, Storage},
    };

    use super::{entry::Entry, Catalog, Rename};

    fn new_catalog(mock: &Mock, chains: &Chains) -> Result<Catalog, Box<dyn Error>> {
        Catalog::new(
            Path::new("/data"),
            Arc::new(mock.clone()),
            Arc::new(chains.clone()),
        )
    }

    fn base() -> &'static Path {
        Path::new("/data/snapshots")
    }

    #[test]
    fn test_auto_creates_first_bank() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let catalog = new_catalog(&mock, &Chains::new(0))?;

        assert!(catalog.bankless());
        assert_eq!(Some("000"), catalog.bank());
        assert!(mock.is_dir(&base().join("000")));

        Ok(())
    }

    #[test]
    fn test_two_banks_are_listed() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("001-stage")).expect("create");
        mock.create_dir_all(&base().join("000-studio")).expect("create");

        let catalog = new_catalog(&mock, &Chains::new(0))?;
        assert!(!catalog.bankless());
        assert_eq!(None, catalog.bank());

        let rows = catalog.rows();
        assert_eq!(3, rows.len());
        assert_eq!(Entry::NewBank, rows[0].entry);
        assert_eq!("000-studio", rows[1].title);
        assert_eq!("001-stage", rows[2].title);
        assert_eq!(1, catalog.index_offset());

        Ok(())
    }

    #[test]
    fn test_bank_list_includes_default_and_last_state() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("000")).expect("create");
        mock.create_dir_all(&base().join("001")).expect("create");
        mock.touch(&base().join("default.zss"));
        mock.touch(&base().join("last_state.zss"));

        let catalog = new_catalog(&mock, &Chains::new(0))?;
        let rows = catalog.rows();
        assert_eq!("Default", rows[0].title);
        assert_eq!("Last State", rows[1].title);
        assert_eq!("New Bank", rows[2].title);
        assert_eq!("000", rows[3].title);
        assert_eq!("001", rows[4].title);
        assert_eq!(3, catalog.index_offset());

        Ok(())
    }

    #[test]
    fn test_bankless_snapshot_list() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("001-one.zss"));
        mock.touch(&bank.join("002-two;layers.zss"));
        mock.touch(&bank.join("notes.txt"));

        let catalog = new_catalog(&mock, &Chains::new(1))?;
        let rows = catalog.rows();

        // Bankless mode has no parent row. One chain is loaded, so the
        // save action leads the list.
        assert_eq!(3, rows.len());
        assert_eq!(Entry::SaveNew, rows[0].entry);
        assert_eq!("001-one", rows[1].title);
        assert_eq!("002-two>layers", rows[2].title);
        assert_eq!(1, catalog.index_offset());

        Ok(())
    }

    #[test]
    fn test_multibank_snapshot_list_has_parent() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("000")).expect("create");
        mock.create_dir_all(&base().join("001")).expect("create");
        mock.touch(&base().join("001").join("005-five.zss"));

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        catalog.select_bank("001")?;

        let rows = catalog.rows();
        assert_eq!(2, rows.len());
        assert_eq!(Entry::Parent, rows[0].entry);
        assert_eq!("005-five", rows[1].title);

        catalog.select_parent()?;
        assert_eq!(None, catalog.bank());
        // The listing reselects the bank we came from.
        assert_eq!("001", catalog.rows()[catalog.index()].title);

        Ok(())
    }

    #[test]
    fn test_next_program() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("001-a.zss"));
        mock.touch(&bank.join("002-b.zss"));
        mock.touch(&bank.join("003-c.zss"));

        let catalog = new_catalog(&mock, &Chains::new(0))?;
        assert_eq!(Some(4), catalog.next_program(1)?);
        assert_eq!(Some(4), catalog.next_program(2)?);
        assert_eq!(Some(10), catalog.next_program(10)?);

        mock.touch(&bank.join("005-e.zss"));
        // The gap at 4 is taken before the block at 5.
        assert_eq!(Some(4), catalog.next_program(1)?);

        Ok(())
    }

    #[test]
    fn test_next_program_exhausted() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("127-last.zss"));

        let catalog = new_catalog(&mock, &Chains::new(0))?;
        assert_eq!(None, catalog.next_program(127)?);
        assert_eq!(Some(126), catalog.next_program(126)?);

        Ok(())
    }

    #[test]
    fn test_next_bank_name() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let catalog = new_catalog(&mock, &Chains::new(0))?;
        // The first bank was auto-created as 000.
        assert_eq!("001", catalog.next_bank_name()?);

        mock.create_dir_all(&base().join("005-live")).expect("create");
        assert_eq!("006", catalog.next_bank_name()?);

        Ok(())
    }

    #[test]
    fn test_create_bank() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("000")).expect("create");
        mock.create_dir_all(&base().join("001")).expect("create");

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        let name = catalog.create_bank()?;
        assert_eq!("002", name);
        assert!(mock.is_dir(&base().join("002")));
        assert_eq!(Some("002"), catalog.bank());

        Ok(())
    }

    #[test]
    fn test_save_new_assigns_next_program() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("001-a.zss"));
        let chains = Chains::with_storage(1, mock.clone());

        let mut catalog = new_catalog(&mock, &chains)?;
        let path = catalog.save_new("My Patch")?;
        assert_eq!(bank.join("002-My Patch.zss"), path);
        assert_eq!(vec![path.clone()], chains.saved());
        assert!(catalog.find("002-My Patch").is_some());

        Ok(())
    }

    #[test]
    fn test_rename_keeps_program_prefix() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("005-old.zss"));

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        let result = catalog.rename(&bank.join("005-old.zss"), "new")?;
        assert_eq!(Rename::Done(bank.join("005-new.zss")), result);
        assert!(mock.is_file(&bank.join("005-new.zss")));
        assert!(!mock.is_file(&bank.join("005-old.zss")));

        Ok(())
    }

    #[test]
    fn test_rename_existing_target_is_pending() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("005-old.zss"));
        mock.touch(&bank.join("005-new.zss"));

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        let result = catalog.rename(&bank.join("005-old.zss"), "new")?;
        assert_eq!(
            Rename::PendingOverwrite {
                from: bank.join("005-old.zss"),
                to: bank.join("005-new.zss"),
            },
            result
        );
        // Nothing moved until the caller confirms and applies.
        assert!(mock.is_file(&bank.join("005-old.zss")));

        catalog.apply_rename(&bank.join("005-old.zss"), &bank.join("005-new.zss"));
        assert!(!mock.is_file(&bank.join("005-old.zss")));
        assert!(mock.is_file(&bank.join("005-new.zss")));

        Ok(())
    }

    #[test]
    fn test_rename_unchanged_and_invalid() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("005-old.zss"));

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        assert_eq!(
            Rename::Unchanged,
            catalog.rename(&bank.join("005-old.zss"), "old")?
        );
        assert_eq!(
            Rename::Invalid,
            catalog.rename(&bank.join("notes.txt"), "new")?
        );

        Ok(())
    }

    #[test]
    fn test_delete_missing_file_is_not_fatal() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        catalog.delete(&base().join("000").join("missing.zss"));
        Ok(())
    }

    #[test]
    fn test_set_program_with_shifts() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        let bank = base().join("000");
        mock.create_dir_all(&bank).expect("create");
        mock.touch(&bank.join("002-b.zss"));
        mock.touch(&bank.join("003-c.zss"));
        mock.touch(&bank.join("004-d.zss"));
        mock.touch(&bank.join("005-a.zss"));

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        let plan = catalog.set_program(&bank.join("005-a.zss"), Some(2))?;
        assert!(plan.needs_confirmation());
        assert_eq!(3, plan.shift_count());

        let target = catalog.commit_renumber(plan)?;
        assert_eq!(bank.join("002-a.zss"), target);
        assert!(catalog.find("002-a").is_some());
        assert!(catalog.find("005-d").is_some());

        Ok(())
    }

    #[test]
    fn test_bank_change() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("000-studio")).expect("create");
        mock.create_dir_all(&base().join("005-stage")).expect("create");

        let mut catalog = new_catalog(&mock, &Chains::new(0))?;
        assert!(catalog.bank_change(5)?);
        assert_eq!(Some("005-stage"), catalog.bank());

        // An unmapped bank number restores the previous selection.
        assert!(!catalog.bank_change(9)?);
        assert_eq!(Some("005-stage"), catalog.bank());

        assert!(catalog.bank_change_offset(-5)?);
        assert_eq!(Some("000-studio"), catalog.bank());

        Ok(())
    }

    #[test]
    fn test_program_change_defaults_to_first_bank() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("000")).expect("create");
        mock.create_dir_all(&base().join("001")).expect("create");
        mock.touch(&base().join("000").join("007-seven.zss"));
        let chains = Chains::new(0);

        let mut catalog = new_catalog(&mock, &chains)?;
        assert_eq!(None, catalog.bank());

        assert!(catalog.program_change(7)?);
        assert_eq!(Some("000"), catalog.bank());
        assert_eq!(vec![base().join("000").join("007-seven.zss")], chains.loaded());

        // An unmapped program leaves state unchanged.
        assert!(!catalog.program_change(9)?);
        assert_eq!(1, chains.loaded().len());

        // The next program change offset is relative to the loaded snapshot.
        assert!(!catalog.program_change_offset(1)?);
        mock.touch(&base().join("000").join("008-eight.zss"));
        catalog.refresh()?;
        assert!(catalog.program_change_offset(1)?);
        assert_eq!(2, chains.loaded().len());

        Ok(())
    }

    #[test]
    fn test_default_and_last_state() -> Result<(), Box<dyn Error>> {
        let mock = Mock::new();
        mock.create_dir_all(&base().join("000")).expect("create");
        let chains = Chains::with_storage(1, mock.clone());

        let mut catalog = new_catalog(&mock, &chains)?;
        assert!(!catalog.load_default()?);

        catalog.save_default()?;
        assert!(catalog.load_default()?);

        catalog.save_last_state()?;
        assert!(catalog.load_last_state()?);
        catalog.delete_last_state();
        assert!(!catalog.load_last_state()?);
        // Deleting again is fine.
        catalog.delete_last_state();

        Ok(())
    }
}
