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
use std::path::{Path, PathBuf};

/// Snapshot files always carry this suffix. Matched case-insensitively on
/// read, written lowercase.
pub const SNAPSHOT_SUFFIX: &str = ".zss";

/// The highest MIDI program number that can be encoded in a filename.
pub const MAX_PROGRAM: u32 = 127;

/// The decoded parts of a snapshot filename.
///
/// A snapshot filename is `<ppp>-<name>.zss` where `<ppp>` is an optional
/// zero-padded MIDI program number. Display names may contain `/` and one
/// `>` separator; both are stored as `;` on disk since `/` cannot appear in
/// a filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotParts {
    program: Option<u32>,
    name: String,
    filename: String,
    path: PathBuf,
}

impl SnapshotParts {
    /// Decodes a snapshot path. Returns None for paths without the snapshot
    /// suffix or without a readable filename.
    pub fn from_path(path: &Path) -> Option<SnapshotParts> {
        let filename = path.file_name()?.to_str()?;
        if !has_suffix(filename) {
            return None;
        }

        let stem = &filename[..filename.len() - SNAPSHOT_SUFFIX.len()];
        let mut name = restore_separators(stem);

        // The program prefix is everything before the first dash. A file
        // without a dash has no prefix, even if the stem is numeric.
        let program = filename
            .split('-')
            .next()
            .and_then(|prefix| prefix.parse::<u32>().ok());
        if program.is_some() {
            name = name.splitn(2, '-').nth(1).unwrap_or_default().to_string();
        }

        Some(SnapshotParts {
            program,
            name,
            filename: filename.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// The MIDI program number encoded in the filename, if any.
    pub fn program(&self) -> Option<u32> {
        self.program
    }

    /// The display name with separators restored and the program prefix
    /// stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filename as found on disk.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The full path the parts were decoded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Encodes a program number and display name into a snapshot filename.
/// Programs outside the MIDI range are not encoded.
pub fn encode(program: Option<u32>, name: &str) -> String {
    let mut filename = format!("{}{}", name, SNAPSHOT_SUFFIX);
    if let Some(program) = program {
        if program <= MAX_PROGRAM {
            filename = format!("{:03}-{}", program, filename);
        }
    }
    escape_separators(&filename)
}

/// Parses the numeric prefix before the first dash. None means "unmapped",
/// never a fault.
pub fn midi_number(name: &str) -> Option<u32> {
    name.split('-').next()?.parse::<u32>().ok()
}

/// Returns the display title for a snapshot filename: the stem with
/// separators restored and the program prefix kept. None for files without
/// the snapshot suffix.
pub fn title(filename: &str) -> Option<String> {
    if !has_suffix(filename) {
        return None;
    }
    Some(restore_separators(
        &filename[..filename.len() - SNAPSHOT_SUFFIX.len()],
    ))
}

/// Strips the snapshot suffix, case-insensitively, when present.
pub fn strip_suffix(name: &str) -> &str {
    if has_suffix(name) {
        &name[..name.len() - SNAPSHOT_SUFFIX.len()]
    } else {
        name
    }
}

// Byte-wise so a multibyte character right before the suffix can't land a
// slice on a non-boundary.
fn has_suffix(filename: &str) -> bool {
    let bytes = filename.as_bytes();
    bytes.len() >= SNAPSHOT_SUFFIX.len()
        && bytes[bytes.len() - SNAPSHOT_SUFFIX.len()..]
            .eq_ignore_ascii_case(SNAPSHOT_SUFFIX.as_bytes())
}

// The first ';' was a '>' in the original name, the rest were '/'.
fn restore_separators(stem: &str) -> String {
    match stem.split_once(';') {
        Some((head, tail)) => format!("{}>{}", head, tail.replace(';', "/")),
        None => stem.to_string(),
    }
}

fn escape_separators(name: &str) -> String {
    name.replace('>', ";").replace('/', ";")
}
