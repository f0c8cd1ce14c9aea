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
mod catalog;
mod chains;
mod config;
mod controller;
mod midi;
mod storage;

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};

use catalog::{Catalog, Rename};
use chains::session::Session;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A snapshot bank manager."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the banks in the snapshot tree.
    Banks {
        /// The path to the data directory on disk.
        path: String,
    },
    /// Lists the snapshots in a bank.
    List {
        /// The path to the data directory on disk.
        path: String,
        /// The bank to list. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// The session document representing the currently loaded chains.
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Saves the session as a new snapshot.
    Save {
        /// The path to the data directory on disk.
        path: String,
        /// The display name of the new snapshot.
        name: String,
        /// The bank to save into. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// The session document to snapshot.
        #[arg(short, long)]
        session: String,
    },
    /// Loads a snapshot into the session document. The names "default" and
    /// "last-state" load the well-known root snapshots.
    Load {
        /// The path to the data directory on disk.
        path: String,
        /// The snapshot title or filename.
        snapshot: String,
        /// The bank to load from. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// The session document to load into.
        #[arg(short, long)]
        session: String,
    },
    /// Overwrites an existing snapshot with the session.
    Overwrite {
        /// The path to the data directory on disk.
        path: String,
        /// The snapshot title or filename.
        snapshot: String,
        /// The bank the snapshot is in. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// The session document to snapshot.
        #[arg(short, long)]
        session: String,
        /// Overwrite without confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Saves the session as the default snapshot.
    SaveDefault {
        /// The path to the data directory on disk.
        path: String,
        /// The session document to snapshot.
        #[arg(short, long)]
        session: String,
    },
    /// Renames a snapshot, keeping its program number.
    Rename {
        /// The path to the data directory on disk.
        path: String,
        /// The snapshot title or filename.
        snapshot: String,
        /// The new display name.
        new_name: String,
        /// The bank the snapshot is in. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// Overwrite an existing snapshot without confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Assigns a snapshot a MIDI program number. Snapshots already holding
    /// numbers at or above it shift up to the next gap, after confirmation.
    SetProgram {
        /// The path to the data directory on disk.
        path: String,
        /// The snapshot title or filename.
        snapshot: String,
        /// The program number. Omit to remove the number.
        #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
        program: Option<u8>,
        /// The bank the snapshot is in. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// Apply shifts without confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Deletes a snapshot. The name "last-state" deletes the well-known
    /// root snapshot.
    Delete {
        /// The path to the data directory on disk.
        path: String,
        /// The snapshot title or filename.
        snapshot: String,
        /// The bank the snapshot is in. Unnecessary in bankless mode.
        #[arg(short, long)]
        bank: Option<String>,
        /// Delete without confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Creates the next numbered bank.
    NewBank {
        /// The path to the data directory on disk.
        path: String,
    },
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Starts the MIDI controller loop.
    Start {
        /// The path to the settings file.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Banks { path } => {
            let catalog = open_catalog(&path, None, None)?;
            if catalog.bankless() {
                println!(
                    "Bankless mode: single bank {}.",
                    catalog.bank().unwrap_or_default()
                );
            }
            print!("{}", catalog);
        }
        Commands::List {
            path,
            bank,
            session,
        } => {
            let catalog = open_catalog(&path, bank.as_deref(), session.as_deref())?;
            print!("{}", catalog);
        }
        Commands::Save {
            path,
            name,
            bank,
            session,
        } => {
            let mut catalog = open_snapshot_catalog(&path, bank.as_deref(), Some(&session))?;
            let saved = catalog.save_new(&name)?;
            println!("Saved {}.", saved.display());
        }
        Commands::Load {
            path,
            snapshot,
            bank,
            session,
        } => {
            let mut catalog = open_snapshot_catalog(&path, bank.as_deref(), Some(&session))?;
            match snapshot.as_str() {
                "default" => {
                    if !catalog.load_default()? {
                        return Err("no default snapshot".into());
                    }
                    println!("Loaded {}.", catalog.default_snapshot_path().display());
                }
                "last-state" => {
                    if !catalog.load_last_state()? {
                        return Err("no last-state snapshot".into());
                    }
                    println!("Loaded {}.", catalog.last_state_path().display());
                }
                _ => {
                    let snapshot_path = find_snapshot(&catalog, &snapshot)?;
                    catalog.load(&snapshot_path)?;
                    println!("Loaded {}.", snapshot_path.display());
                }
            }
        }
        Commands::Overwrite {
            path,
            snapshot,
            bank,
            session,
            yes,
        } => {
            let catalog = open_snapshot_catalog(&path, bank.as_deref(), Some(&session))?;
            let snapshot_path = find_snapshot(&catalog, &snapshot)?;
            let prompt = format!(
                "Do you really want to overwrite {} with the current configuration?",
                snapshot
            );
            if confirm(&prompt, yes)? {
                catalog.save_over(&snapshot_path)?;
                println!("Saved {}.", snapshot_path.display());
            }
        }
        Commands::SaveDefault { path, session } => {
            let mut catalog = open_catalog(&path, None, Some(&session))?;
            catalog.save_default()?;
            println!("Saved {}.", catalog.default_snapshot_path().display());
        }
        Commands::Rename {
            path,
            snapshot,
            new_name,
            bank,
            yes,
        } => {
            let mut catalog = open_snapshot_catalog(&path, bank.as_deref(), None)?;
            let snapshot_path = find_snapshot(&catalog, &snapshot)?;
            match catalog.rename(&snapshot_path, &new_name)? {
                Rename::Done(to) => println!("Renamed to {}.", to.display()),
                Rename::Unchanged => println!("Nothing to rename."),
                Rename::Invalid => {
                    return Err(format!("{} is not a snapshot", snapshot_path.display()).into())
                }
                Rename::PendingOverwrite { from, to } => {
                    let prompt =
                        format!("Do you really want to overwrite the snapshot {}?", new_name);
                    if confirm(&prompt, yes)? {
                        catalog.apply_rename(&from, &to);
                        println!("Renamed to {}.", to.display());
                    }
                }
            }
        }
        Commands::SetProgram {
            path,
            snapshot,
            program,
            bank,
            yes,
        } => {
            let mut catalog = open_snapshot_catalog(&path, bank.as_deref(), None)?;
            let snapshot_path = find_snapshot(&catalog, &snapshot)?;
            let plan = catalog.set_program(&snapshot_path, program)?;
            if plan.needs_confirmation() {
                let prompt = format!(
                    "Do you want to move {} snapshots up to the next available program?",
                    plan.shift_count()
                );
                if !confirm(&prompt, yes)? {
                    return Ok(());
                }
            }
            let target = catalog.commit_renumber(plan)?;
            println!("Renumbered to {}.", target.display());
        }
        Commands::Delete {
            path,
            snapshot,
            bank,
            yes,
        } => {
            let mut catalog = open_snapshot_catalog(&path, bank.as_deref(), None)?;
            if snapshot == "last-state" {
                catalog.delete_last_state();
                return Ok(());
            }
            let snapshot_path = find_snapshot(&catalog, &snapshot)?;
            let prompt = format!("Do you really want to delete {}?", snapshot);
            if confirm(&prompt, yes)? {
                catalog.delete(&snapshot_path);
            }
        }
        Commands::NewBank { path } => {
            let mut catalog = open_catalog(&path, None, None)?;
            let name = catalog.create_bank()?;
            println!("Created bank {}.", name);
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start { config_path } => {
            let mut controller = config::init_controller(Path::new(&config_path))?;
            controller.join().await?;
        }
    }

    Ok(())
}

/// Opens the catalog, optionally selecting a bank and seeding the session
/// from a document.
fn open_catalog(
    path: &str,
    bank: Option<&str>,
    session: Option<&str>,
) -> Result<Catalog, Box<dyn Error>> {
    let session = Arc::new(Session::open(session.map(Path::new))?);
    let mut catalog = Catalog::new(Path::new(path), storage::filesystem(), session)?;
    if let Some(bank) = bank {
        if catalog.bankless() {
            if catalog.bank() != Some(bank) {
                return Err(format!("bank {} not found", bank).into());
            }
        } else {
            catalog.select_bank(bank)?;
        }
    }
    Ok(catalog)
}

/// Opens the catalog for snapshot operations, where a bank must be
/// resolvable.
fn open_snapshot_catalog(
    path: &str,
    bank: Option<&str>,
    session: Option<&str>,
) -> Result<Catalog, Box<dyn Error>> {
    let catalog = open_catalog(path, bank, session)?;
    if catalog.bank().is_none() {
        return Err("multiple banks exist, specify one with --bank".into());
    }
    Ok(catalog)
}

/// Finds a snapshot in the current listing by title or filename.
fn find_snapshot(catalog: &Catalog, name: &str) -> Result<PathBuf, Box<dyn Error>> {
    catalog
        .find(name)
        .and_then(|row| row.entry.path())
        .map(Path::to_path_buf)
        .ok_or_else(|| format!("unable to find snapshot {}", name).into())
}

/// Asks for confirmation on stdin unless it was given on the command line.
fn confirm(prompt: &str, yes: bool) -> Result<bool, Box<dyn Error>> {
    if yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let confirmed = matches!(line.trim(), "y" | "Y" | "yes");
    if !confirmed {
        println!("Aborted.");
    }
    Ok(confirmed)
}
