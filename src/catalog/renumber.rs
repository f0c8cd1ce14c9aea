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
};

use tracing::{error, info};

use crate::storage::Storage;

use super::parts::{self, SnapshotParts};

/// A computed renumbering: the snapshot to move, its destination, and the
/// conflicting snapshots that must shift up one program to make room. A plan
/// with shifts must be confirmed by the caller before committing; one
/// without can be committed directly.
#[derive(Debug)]
pub struct RenumberPlan {
    source: PathBuf,
    target: PathBuf,
    moves: Vec<(PathBuf, PathBuf)>,
}

impl RenumberPlan {
    /// Computes the plan for moving a snapshot to the given program number.
    /// Snapshots at or above the requested number shift up by one, but only
    /// while the numbers are contiguous: the scan stops at the first unused
    /// number above the requested one, and entries beyond that gap are left
    /// alone.
    pub fn new(
        storage: &dyn Storage,
        dir: &Path,
        source: &SnapshotParts,
        program: Option<u32>,
    ) -> Result<RenumberPlan, Box<dyn Error>> {
        let target = dir.join(parts::encode(program, source.name()));
        let mut moves = Vec::new();

        if let Some(program) = program {
            let mut names = storage.list(dir)?;
            names.sort();

            let mut first_gap = program;
            for name in names {
                let path = dir.join(&name);
                let existing = match SnapshotParts::from_path(&path) {
                    Some(existing) => existing,
                    None => continue,
                };
                let number = match existing.program() {
                    Some(number) => number,
                    None => continue,
                };
                if number < program || existing.path() == source.path() {
                    continue;
                }
                if number > first_gap {
                    break;
                }

                first_gap = number + 1;
                moves.push((path, dir.join(parts::encode(Some(first_gap), existing.name()))));
            }
        }

        Ok(RenumberPlan {
            source: source.path().to_path_buf(),
            target,
            moves,
        })
    }

    /// The number of snapshots that would shift to make room.
    pub fn shift_count(&self) -> usize {
        self.moves.len()
    }

    /// True when committing would move other snapshots, which the caller
    /// must confirm first.
    pub fn needs_confirmation(&self) -> bool {
        !self.moves.is_empty()
    }

    /// The destination path of the renumbered snapshot.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Applies the plan. Shifts are committed highest program first so no
    /// rename lands on a name that is still occupied, then the subject
    /// snapshot is renamed last. A failed rename aborts the sequence;
    /// already-applied renames are not undone.
    pub fn commit(self, storage: &dyn Storage) -> Result<PathBuf, Box<dyn Error>> {
        let mut moves = self.moves;
        moves.sort_by(|a, b| b.0.cmp(&a.0));

        for (from, to) in &moves {
            if let Err(e) = storage.rename(from, to) {
                error!(
                    err = e.as_ref(),
                    from = %from.display(),
                    to = %to.display(),
                    "Failed to shift snapshot, aborting renumber."
                );
                return Err(e);
            }
        }

        storage.rename(&self.source, &self.target)?;
        info!(
            from = %self.source.display(),
            to = %self.target.display(),
            "Renumbered snapshot."
        );
        Ok(self.target)
    }
}
