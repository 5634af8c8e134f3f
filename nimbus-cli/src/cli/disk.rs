use clap::{Args, Subcommand};
use nimbus_lib::size::SizeUnit;

use crate::error;
use crate::formatting::{self, Table};

use super::{Session, parse_size_arg, resolve_disk, confirm};

#[derive(Debug, Args)]
pub struct DiskArgs {
    #[command(subcommand)]
    command: DiskCmds
}

#[derive(Debug, Subcommand)]
enum DiskCmds {
    /// creates a new disk
    Create {
        name: String,

        /// capacity of the disk. examples: 500MB, 10GB
        #[arg(value_parser(parse_size_arg))]
        size: (f64, SizeUnit),
    },

    /// changes the capacity of a disk
    Resize {
        disk: String,

        #[arg(value_parser(parse_size_arg))]
        size: (f64, SizeUnit),
    },

    /// renames a disk
    Rename {
        disk: String,
        name: String,
    },

    /// removes every file from a disk
    Format {
        disk: String,

        /// skips the confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// deletes a disk and its files
    Delete {
        disk: String,

        #[arg(short, long)]
        yes: bool,
    },

    /// moves the files of one disk into another and removes the source
    Merge {
        source: String,
        target: String,
    },
}

pub fn handle(session: &Session, args: DiskArgs) -> error::Result {
    let store = &session.store;

    match args.command {
        DiskCmds::Create { name, size: (size, unit) } => {
            let created = session.block_on(store.create_disk(&name, size, unit))?;

            println!("created disk \"{}\" ({})", created.name, created.id);
        },
        DiskCmds::Resize { disk, size: (size, unit) } => {
            let found = resolve_disk(store, &disk)?;
            let resized = session.block_on(store.resize_disk(&found.id, size, unit))?;

            println!("\"{}\" is now {}", resized.name, formatting::bytes_to_unit(resized.total));
        },
        DiskCmds::Rename { disk, name } => {
            let found = resolve_disk(store, &disk)?;
            let renamed = session.block_on(store.rename_disk(&found.id, &name))?;

            println!("renamed \"{}\" to \"{}\"", found.name, renamed.name);
        },
        DiskCmds::Format { disk, yes } => {
            let found = resolve_disk(store, &disk)?;

            if !confirm(yes, format!("remove every file on \"{}\"?", found.name))? {
                return Ok(());
            }

            session.block_on(store.format_disk(&found.id))?;

            println!("formatted \"{}\"", found.name);
        },
        DiskCmds::Delete { disk, yes } => {
            let found = resolve_disk(store, &disk)?;

            if !confirm(yes, format!("delete \"{}\" and all of its files?", found.name))? {
                return Ok(());
            }

            session.block_on(store.delete_disk(&found.id))?;

            println!("deleted \"{}\"", found.name);
        },
        DiskCmds::Merge { source, target } => {
            let source = resolve_disk(store, &source)?;
            let target = resolve_disk(store, &target)?;
            let merged = session.block_on(store.merge_disk(&source.id, &target.id))?;

            println!(
                "merged \"{}\" into \"{}\", {} used",
                source.name,
                merged.name,
                formatting::bytes_to_unit(merged.used)
            );
        }
    }

    Ok(())
}

pub fn list(session: &Session) -> error::Result {
    let store = &session.store;
    let current = store.navigation().disk_id;
    let mut table = Table::new(["", "id", "name", "used", "total", "created"]);

    for disk in store.disks() {
        let marker = if current.as_deref() == Some(disk.id.as_str()) { "*" } else { "" };

        table.row(vec![
            marker.to_owned(),
            disk.id.clone(),
            disk.name.clone(),
            formatting::bytes_to_unit(disk.used),
            formatting::bytes_to_unit(disk.total),
            formatting::datetime(&disk.created_at),
        ]);
    }

    if table.is_empty() {
        println!("no disks");
    } else {
        print!("{}", table.render());
    }

    if let Some(quota) = store.quota() {
        println!(
            "allocated {} of {} quota",
            formatting::bytes_to_unit(quota.allocated),
            formatting::bytes_to_unit(quota.total)
        );
    }

    Ok(())
}

pub fn select(session: &Session, disk: Option<String>) -> error::Result {
    let store = &session.store;

    let Some(given) = disk else {
        session.block_on(store.set_current_disk(None))?;

        return Ok(());
    };

    let found = resolve_disk(store, &given)?;

    session.block_on(store.set_current_disk(Some(&found.id)))?;

    super::files::list(session, None)
}
