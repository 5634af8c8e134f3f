use std::cell::Cell;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use nimbus::config::{Config, ConfigArgs};
use nimbus::store::DiskEntry;
use nimbus::{FileStore, StorageRequests};
use nimbus_api::client::ApiClient;
use nimbus_api::files::FileItem;
use nimbus_lib::ids;
use nimbus_lib::size::{parse_size, SizeUnit};
use tokio::runtime::{Builder, Runtime};

use crate::error::{self, Context};
use crate::input;

mod disk;
mod files;
mod account;

/// a cli for browsing and managing a personal cloud drive.
///
/// every change is sent to the server first and only shows up locally once
/// the server accepted it. if no command is provided then it will enter
/// interactive mode.
#[derive(Debug, Parser)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<BaseCmds>
}

pub struct Session {
    rt: Runtime,
    pub store: FileStore<ApiClient>,
    pub requests: StorageRequests<ApiClient>,
    /// appearance changes that may still be waiting on the debounced sync
    pub settings_changed: Cell<bool>,
}

impl Session {
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: std::future::Future
    {
        self.rt.block_on(future)
    }

    /// pushes settings changes that have not been synced yet so nothing is
    /// lost when the process exits
    fn finish(&self) -> error::Result {
        if self.settings_changed.replace(false) {
            self.block_on(self.store.settings().sync_settings_to_backend_now())?;
        }

        Ok(())
    }
}

pub fn start() -> error::Result {
    let args = Cli::parse();
    let config = Config::from_args(args.config)?;

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let client = Arc::new(config.api_client()?);
    let store = {
        let _entered = rt.enter();

        FileStore::new(client.clone(), config.store_options())
    };
    let session = Session {
        rt,
        store,
        requests: StorageRequests::new(client),
        settings_changed: Cell::new(false),
    };

    if session.block_on(session.store.settings().load_local()) {
        tracing::debug!("loaded settings from {}", config.settings_file().display());
    }

    match args.command {
        Some(cmd) => {
            session.block_on(session.store.fetch_disks())?;

            let result = handle(&session, cmd);

            files::drain_uploads(&session)?;
            session.finish()?;

            result
        },
        None => {
            if let Err(err) = session.block_on(session.store.fetch_disks()) {
                println!("failed to load disks: {}", error::Error::from(err).report());
            }

            Interactive::handle(&session)?;

            files::drain_uploads(&session)?;
            session.finish()
        }
    }
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
enum Interactive {
    #[command(flatten)]
    Base(BaseCmds),
    /// leaves interactive mode
    #[command(alias = "exit")]
    Quit
}

impl Interactive {
    fn handle(session: &Session) -> error::Result {
        loop {
            let prompt = prompt(&session.store);
            let given = input::read_stdin(prompt)?;

            if given.is_empty() {
                break;
            }

            let trimmed = given.trim();

            if trimmed.is_empty() {
                continue;
            }

            let Ok(args_list) = shell_words::split(trimmed) else {
                println!("failed to parse command line args");
                continue;
            };

            let cmd = match Interactive::try_parse_from(args_list) {
                Ok(c) => c,
                Err(err) => {
                    println!("{}", err);
                    continue;
                }
            };

            let result = match cmd {
                Interactive::Base(cmd) => handle(session, cmd),
                Interactive::Quit => break,
            };

            if let Err(err) = result {
                println!("{}", err.report());
            }

            for item in session.store.apply_finished_uploads() {
                println!("upload finished: {}", item.name);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Subcommand)]
enum BaseCmds {
    /// lists disks along with the quota usage
    Disks,

    /// creates and manages disks
    Disk(disk::DiskArgs),

    /// selects the disk to browse, clears the selection if none is given
    Use {
        disk: Option<String>,
    },

    /// lists the active folder or the given one
    Ls {
        folder: Option<String>,
    },

    /// enters a folder of the active folder
    Cd {
        folder: String,
    },

    /// goes up one folder
    Back,

    /// reloads the active folder from the server
    Refresh,

    /// shows file counts and sizes for a folder or the whole disk
    Stats {
        folder: Option<String>,
    },

    /// creates a folder in the active folder
    Mkdir {
        name: String,
    },

    /// creates a text note in the active folder
    Note(files::NoteArgs),

    /// creates a link in the active folder
    Link {
        name: String,
        url: String,
    },

    /// uploads local files into the active folder
    Upload(files::UploadArgs),

    /// waits for uploads to finish
    Wait {
        upload: Option<String>,
    },

    /// lists uploads and their progress
    Uploads {
        /// drops finished uploads from the list
        #[arg(long)]
        clear: bool,
    },

    /// renames a file or folder
    Rename {
        file: String,
        name: String,
    },

    /// deletes files or folders
    Rm(files::RmArgs),

    /// puts files on the clipboard to be copied
    Copy {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// puts files on the clipboard to be moved
    Cut {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// copies or moves the clipboard into the active folder
    Paste,

    /// shows or clears the clipboard
    Clipboard {
        #[arg(long)]
        clear: bool,
    },

    /// pins or unpins a file
    Pin {
        file: String,
    },

    /// lists pinned files
    Pins,

    /// searches every disk by name
    Search {
        query: Vec<String>,
    },

    /// lists, submits and reviews storage quota requests
    Requests(account::RequestsArgs),

    /// shows or changes appearance settings
    Settings(account::SettingsArgs),
}

fn handle(session: &Session, cmd: BaseCmds) -> error::Result {
    match cmd {
        BaseCmds::Disks => disk::list(session),
        BaseCmds::Disk(given) => disk::handle(session, given),
        BaseCmds::Use { disk } => disk::select(session, disk),
        BaseCmds::Ls { folder } => files::list(session, folder),
        BaseCmds::Cd { folder } => files::enter(session, folder),
        BaseCmds::Back => {
            session.store.navigate_back();

            files::list(session, None)
        },
        BaseCmds::Refresh => {
            session.block_on(session.store.refresh(None))?;

            files::list(session, None)
        },
        BaseCmds::Stats { folder } => files::stats(session, folder),
        BaseCmds::Mkdir { name } => files::mkdir(session, name),
        BaseCmds::Note(given) => files::note(session, given),
        BaseCmds::Link { name, url } => files::link(session, name, url),
        BaseCmds::Upload(given) => files::upload(session, given),
        BaseCmds::Wait { upload } => files::wait(session, upload),
        BaseCmds::Uploads { clear } => files::uploads(session, clear),
        BaseCmds::Rename { file, name } => files::rename(session, file, name),
        BaseCmds::Rm(given) => files::remove(session, given),
        BaseCmds::Copy { files: given } => files::clipboard_set(session, given, false),
        BaseCmds::Cut { files: given } => files::clipboard_set(session, given, true),
        BaseCmds::Paste => files::paste(session),
        BaseCmds::Clipboard { clear } => files::clipboard_show(session, clear),
        BaseCmds::Pin { file } => files::pin(session, file),
        BaseCmds::Pins => files::pins(session),
        BaseCmds::Search { query } => files::search(session, query.join(" ")),
        BaseCmds::Requests(given) => account::requests(session, given),
        BaseCmds::Settings(given) => account::settings(session, given),
    }
}

fn prompt(store: &FileStore<ApiClient>) -> String {
    let Some(disk) = store.current_disk() else {
        return String::from("> ");
    };

    let mut path = disk.name;

    for crumb in store.breadcrumbs() {
        path.push('/');
        path.push_str(&crumb.name);
    }

    format!("{path}> ")
}

pub fn parse_size_arg(given: &str) -> Result<(f64, SizeUnit), String> {
    parse_size(given).ok_or_else(|| format!(
        "\"{given}\" is not a size. examples: 500MB, 2.5GB, 1TB"
    ))
}

/// finds a disk by id or by name
pub fn resolve_disk(store: &FileStore<ApiClient>, given: &str) -> error::Result<DiskEntry> {
    if let Some(found) = store.disk(given) {
        return Ok(found);
    }

    let lower = given.to_lowercase();

    store.disks()
        .into_iter()
        .find(|disk| disk.name.to_lowercase() == lower)
        .context(format!("no disk named \"{given}\""))
}

pub fn active_disk(store: &FileStore<ApiClient>) -> error::Result<DiskEntry> {
    store.current_disk()
        .context("no disk selected. pick one with \"use <disk>\"")
}

pub fn active_folder(store: &FileStore<ApiClient>) -> Option<ids::FileId> {
    store.current_path().last().cloned()
}

/// finds an entry by id or by name in the active folder
pub fn resolve_file(store: &FileStore<ApiClient>, given: &str) -> error::Result<FileItem> {
    if let Some(found) = store.file(given) {
        return Ok(found);
    }

    let lower = given.to_lowercase();

    store.current_items()
        .into_iter()
        .find(|item| item.name.to_lowercase() == lower)
        .context(format!("nothing named \"{given}\" in the active folder"))
}

pub fn confirm(yes: bool, question: String) -> error::Result<bool> {
    if yes {
        return Ok(true);
    }

    Ok(input::read_yn(question)?)
}
