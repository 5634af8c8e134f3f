use std::path::PathBuf;

use clap::Args;
use nimbus::upload::{UploadFile, UploadStatus};
use nimbus::store::ClipboardOp;

use crate::error::{self, Context};
use crate::formatting::{self, Table};

use super::{Session, active_disk, active_folder, resolve_file, confirm};

#[derive(Debug, Args)]
pub struct NoteArgs {
    name: String,

    /// text of the note, read from --file when omitted
    content: Option<String>,

    /// local text file to use as the note content
    #[arg(long, conflicts_with = "content")]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// name to use on the server, only valid with a single path
    #[arg(long)]
    name: Option<String>,

    /// waits for the uploads before returning
    #[arg(short, long)]
    wait: bool,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    #[arg(required = true)]
    files: Vec<String>,

    /// skips the confirmation
    #[arg(short, long)]
    yes: bool,
}

pub fn list(session: &Session, folder: Option<String>) -> error::Result {
    let store = &session.store;

    let items = if let Some(given) = folder {
        let found = resolve_file(store, &given)?;

        if !found.is_folder {
            return Err(error::Error::input(format!("\"{}\" is not a folder", found.name)));
        }

        match store.children(&found.id) {
            Some(items) => items,
            None => {
                session.block_on(store.refresh(Some(&found.id)))?;

                store.children(&found.id).unwrap_or_default()
            }
        }
    } else {
        active_disk(store)?;

        store.current_items()
    };

    if items.is_empty() {
        println!("empty");
    } else {
        let table = formatting::file_table(&items, |id| store.is_pinned(id));

        print!("{}", table.render());
    }

    Ok(())
}

pub fn enter(session: &Session, folder: String) -> error::Result {
    let store = &session.store;

    if folder == ".." {
        store.navigate_back();

        return list(session, None);
    }

    let found = resolve_file(store, &folder)?;

    session.block_on(store.navigate_to_folder(&found.id))?;

    list(session, None)
}

pub fn stats(session: &Session, folder: Option<String>) -> error::Result {
    let store = &session.store;

    let (label, stats) = match folder {
        Some(given) => {
            let found = resolve_file(store, &given)?;
            let stats = store.folder_stats(&found.id)
                .context(format!("\"{}\" is not a folder", found.name))?;

            (found.name, stats)
        },
        None => {
            let disk = active_disk(store)?;
            let stats = store.disk_stats(&disk.id)
                .context("disk is not loaded")?;

            (disk.name, stats)
        }
    };

    println!(
        "{label}: {} files, {} folders, {}",
        stats.files,
        stats.folders,
        formatting::bytes_to_unit(stats.bytes)
    );

    if !stats.complete {
        println!("some folders have not been opened yet, counts only cover loaded folders");
    }

    Ok(())
}

pub fn mkdir(session: &Session, name: String) -> error::Result {
    let store = &session.store;
    let disk = active_disk(store)?;
    let parent = active_folder(store);

    let created = session.block_on(store.create_folder(&name, parent.as_deref(), &disk.id))?;

    println!("created folder \"{}\"", created.name);

    Ok(())
}

pub fn note(session: &Session, args: NoteArgs) -> error::Result {
    let store = &session.store;
    let disk = active_disk(store)?;
    let parent = active_folder(store);

    let content = match (args.content, args.file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(&path).context(format!(
            "failed to read \"{}\"", path.display()
        ))?,
        (None, None) => String::new(),
    };

    let created = session.block_on(store.create_note(&args.name, &content, parent.as_deref(), &disk.id))?;

    println!("created note \"{}\"", created.name);

    Ok(())
}

pub fn link(session: &Session, name: String, url: String) -> error::Result {
    let store = &session.store;
    let disk = active_disk(store)?;
    let parent = active_folder(store);

    let created = session.block_on(store.create_url(&name, &url, parent.as_deref(), &disk.id))?;

    println!("created link \"{}\"", created.name);

    Ok(())
}

pub fn upload(session: &Session, args: UploadArgs) -> error::Result {
    let store = &session.store;
    let disk = active_disk(store)?;
    let parent = active_folder(store);

    if args.name.is_some() && args.paths.len() > 1 {
        return Err(error::Error::input("--name can only be used with a single file"));
    }

    let mut started = Vec::with_capacity(args.paths.len());

    for path in args.paths {
        let mut file = session.block_on(UploadFile::from_path(&path))?;

        if let Some(name) = &args.name {
            file = file.rename(name.clone());
        }

        let id = store.upload_file(file, parent.as_deref(), &disk.id)?;

        println!("queued \"{}\" as {id}", path.display());

        started.push(id);
    }

    if args.wait {
        for id in started {
            wait_one(session, &id);
        }
    }

    Ok(())
}

fn wait_one(session: &Session, id: &str) {
    match session.block_on(session.store.wait_upload(id)) {
        Ok(item) => println!("uploaded \"{}\" ({})", item.name, formatting::bytes_to_unit(item.size_bytes())),
        Err(err) => println!("upload {id} failed: {}", error::Error::from(err).report()),
    }
}

pub fn wait(session: &Session, upload: Option<String>) -> error::Result {
    let store = &session.store;

    if let Some(id) = upload {
        wait_one(session, &id);

        return Ok(());
    }

    for item in store.uploads().uploads() {
        if !item.status.is_finished() {
            wait_one(session, &item.id);
        }
    }

    Ok(())
}

/// waits on every running upload so a one shot command does not exit with
/// transfers still in flight
pub fn drain_uploads(session: &Session) -> error::Result {
    if session.store.uploads().active_count() > 0 {
        wait(session, None)?;
    }

    session.store.apply_finished_uploads();

    Ok(())
}

pub fn uploads(session: &Session, clear: bool) -> error::Result {
    let store = &session.store;

    if clear {
        let removed = store.clear_finished_uploads();

        println!("cleared {removed} finished uploads");

        return Ok(());
    }

    let mut table = Table::new(["id", "status", "progress", "speed", "name"]);

    for item in store.uploads().uploads() {
        let status = match item.status {
            UploadStatus::Pending => String::from("pending"),
            UploadStatus::Uploading => String::from("uploading"),
            UploadStatus::Completed => String::from("done"),
            UploadStatus::Error => format!("error: {}", item.message.as_deref().unwrap_or("unknown")),
        };

        table.row(vec![
            item.id.clone(),
            status,
            format!(
                "{:.0}% of {}",
                item.progress(),
                formatting::bytes_to_unit(item.total_bytes())
            ),
            formatting::speed(item.speed()),
            item.file_name.clone(),
        ]);
    }

    if table.is_empty() {
        println!("no uploads");
    } else {
        print!("{}", table.render());
    }

    Ok(())
}

pub fn rename(session: &Session, file: String, name: String) -> error::Result {
    let store = &session.store;
    let found = resolve_file(store, &file)?;
    let renamed = session.block_on(store.rename_file(&found.id, &name))?;

    println!("renamed \"{}\" to \"{}\"", found.name, renamed.name);

    Ok(())
}

pub fn remove(session: &Session, args: RmArgs) -> error::Result {
    let store = &session.store;
    let mut found = Vec::with_capacity(args.files.len());

    for given in &args.files {
        found.push(resolve_file(store, given)?);
    }

    let names: Vec<&str> = found.iter().map(|f| f.name.as_str()).collect();

    if !confirm(args.yes, format!("delete {}?", names.join(", ")))? {
        return Ok(());
    }

    for item in &found {
        session.block_on(store.delete_file(&item.id))?;

        println!("deleted \"{}\"", item.name);
    }

    Ok(())
}

pub fn clipboard_set(session: &Session, files: Vec<String>, cut: bool) -> error::Result {
    let store = &session.store;
    let mut ids = Vec::with_capacity(files.len());

    for given in &files {
        ids.push(resolve_file(store, given)?.id);
    }

    if cut {
        store.cut_files(&ids)?;
    } else {
        store.copy_files(&ids)?;
    }

    clipboard_show(session, false)
}

pub fn clipboard_show(session: &Session, clear: bool) -> error::Result {
    let store = &session.store;

    if clear {
        store.clear_clipboard();
    }

    let clipboard = store.clipboard();

    if clipboard.is_empty() {
        println!("clipboard is empty");

        return Ok(());
    }

    let op = match clipboard.operation {
        Some(ClipboardOp::Cut) => "cut",
        _ => "copy",
    };

    let names: Vec<String> = clipboard.files.iter()
        .map(|id| store.file(id).map(|f| f.name).unwrap_or_else(|| id.clone()))
        .collect();

    println!("{op}: {}", names.join(", "));

    Ok(())
}

pub fn paste(session: &Session) -> error::Result {
    let store = &session.store;
    let disk = active_disk(store)?;
    let parent = active_folder(store);

    let pasted = session.block_on(store.paste_files(parent.as_deref(), &disk.id))?;

    for item in pasted {
        println!("pasted \"{}\"", item.name);
    }

    Ok(())
}

pub fn pin(session: &Session, file: String) -> error::Result {
    let store = &session.store;
    let found = resolve_file(store, &file)?;

    if session.block_on(store.toggle_pin(&found.id))? {
        println!("pinned \"{}\"", found.name);
    } else {
        println!("unpinned \"{}\"", found.name);
    }

    Ok(())
}

pub fn pins(session: &Session) -> error::Result {
    let store = &session.store;
    let pinned = store.pinned_files();

    if pinned.is_empty() {
        println!("nothing pinned");
    } else {
        print!("{}", formatting::file_table(&pinned, |_| true).render());
    }

    Ok(())
}

pub fn search(session: &Session, query: String) -> error::Result {
    let store = &session.store;

    session.block_on(store.search_files_backend(&query))?;

    let state = store.search_state();

    if state.query.is_empty() {
        return Ok(());
    }

    if state.results.is_empty() {
        println!("no matches for \"{}\"", state.query);
    } else {
        print!("{}", formatting::file_table(&state.results, |id| store.is_pinned(id)).render());
    }

    Ok(())
}
